//! Chat assistant command

use crate::chat::{Assistant, ChatTurn};
use crate::config::Config;
use crate::error::Result;
use crate::store::{CatalogDb, ChatMessage, Tool};

/// Run one assistant turn in a session
pub async fn cmd_chat(
    config: &Config,
    db: &CatalogDb,
    session_id: &str,
    user: Option<&str>,
    message: &str,
) -> Result<ChatTurn> {
    let assistant = Assistant::new(config.clone())?;
    assistant.chat(db, session_id, user, message).await
}

/// Session history with recommended tools resolved
pub async fn cmd_chat_history(
    config: &Config,
    db: &CatalogDb,
    session_id: &str,
    limit: usize,
) -> Result<Vec<(ChatMessage, Vec<Tool>)>> {
    let assistant = Assistant::new(config.clone())?;
    assistant.history(db, session_id, limit).await
}

pub fn print_chat_turn(turn: &ChatTurn) {
    println!("{}", turn.response);
    if !turn.recommended.is_empty() {
        println!("\nRecommended tools:");
        for tool in &turn.recommended {
            println!("  {}  {}", tool.name, tool.url);
        }
    }
    if let Some(usage) = &turn.usage {
        println!("\n({} tokens)", usage.total_tokens);
    }
}

pub fn print_chat_history(history: &[(ChatMessage, Vec<Tool>)]) {
    if history.is_empty() {
        println!("No messages in this session.");
        return;
    }
    for (msg, tools) in history {
        println!("> {}", msg.message);
        println!("{}", msg.response);
        if !tools.is_empty() {
            let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
            println!("  (recommended: {})", names.join(", "));
        }
        println!();
    }
}
