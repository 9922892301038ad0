//! Tool-recommendation chat assistant
//!
//! Each turn searches the catalog for tools relevant to the user's message,
//! folds them into the system prompt of an OpenAI-compatible chat-completions
//! request, and appends the exchange to the session history with the ids of
//! the tools that were recommended.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::search::{self, SearchRequest};
use crate::store::{CatalogDb, ChatMessage, TokenUsage, Tool};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Outcome of one assistant turn
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub response: String,
    pub recommended: Vec<Tool>,
    pub usage: Option<TokenUsage>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
}

#[derive(Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
    #[serde(default)]
    total_tokens: i64,
}

/// Chat assistant backed by the catalog search aggregator
pub struct Assistant {
    client: reqwest::Client,
    config: Config,
}

impl Assistant {
    pub fn new(config: Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Chat(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    /// Run one assistant turn and persist it to the session
    pub async fn chat(
        &self,
        db: &CatalogDb,
        session_id: &str,
        user_id: Option<&str>,
        message: &str,
    ) -> Result<ChatTurn> {
        let api_key = self
            .config
            .chat_api_key()
            .ok_or_else(|| Error::Chat(format!("{} is not set", self.config.chat.api_key_env)))?;

        let recommended = self.relevant_tools(db, message, user_id).await?;
        let history = db.session_history(session_id, 10).await?;

        let request = CompletionRequest {
            model: &self.config.chat.model,
            messages: self.build_messages(&history, &recommended, message),
        };

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.config.chat.api_base.trim_end_matches('/')
            ))
            .bearer_auth(&api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Chat(format!(
                "Completion request failed: HTTP {}",
                status
            )));
        }

        let body: CompletionResponse = response.json().await?;
        let reply = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Chat("Completion returned no content".to_string()))?;

        let usage = body.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        let recommended_ids: Vec<String> = recommended.iter().map(|t| t.id.clone()).collect();
        db.append_chat_message(session_id, user_id, message, &reply, &recommended_ids, usage)
            .await?;

        Ok(ChatTurn {
            response: reply,
            recommended,
            usage,
        })
    }

    /// Session history with recommended tool records resolved
    pub async fn history(
        &self,
        db: &CatalogDb,
        session_id: &str,
        limit: usize,
    ) -> Result<Vec<(ChatMessage, Vec<Tool>)>> {
        let messages = db.session_history(session_id, limit).await?;
        let mut out = Vec::with_capacity(messages.len());
        for msg in messages {
            let mut tools = Vec::new();
            for id in msg.recommended_tool_ids() {
                if let Some(tool) = db.get_tool(&id).await? {
                    tools.push(tool);
                }
            }
            out.push((msg, tools));
        }
        Ok(out)
    }

    /// Search the catalog for tools worth recommending for this message
    async fn relevant_tools(
        &self,
        db: &CatalogDb,
        message: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Tool>> {
        let req = SearchRequest {
            query: message.to_string(),
            category: None,
            cursor: None,
            page_size: Some(self.config.chat.recommendation_limit),
        };
        let page = search::search_tools(db, &self.config, &req, user_id).await?;
        debug!("Found {} candidate tools for recommendation", page.page.len());
        Ok(page.page.into_iter().map(|h| h.tool).collect())
    }

    fn build_messages(
        &self,
        history: &[ChatMessage],
        recommended: &[Tool],
        message: &str,
    ) -> Vec<ApiMessage> {
        let mut context = String::from(
            "You are a helpful assistant that recommends digital tools from a catalog. \
             Answer briefly and mention tools by name only when they genuinely fit the request.\n",
        );
        if recommended.is_empty() {
            context.push_str("No catalog tools matched this request.\n");
        } else {
            context.push_str("Catalog tools relevant to this request:\n");
            for tool in recommended {
                context.push_str(&format!(
                    "- {}: {} ({})\n",
                    tool.name,
                    tool.tagline,
                    tool.category.as_deref().unwrap_or("uncategorized")
                ));
            }
        }

        let mut messages = vec![ApiMessage {
            role: "system",
            content: context,
        }];
        for turn in history {
            messages.push(ApiMessage {
                role: "user",
                content: turn.message.clone(),
            });
            messages.push(ApiMessage {
                role: "assistant",
                content: turn.response.clone(),
            });
        }
        messages.push(ApiMessage {
            role: "user",
            content: message.to_string(),
        });
        messages
    }
}
