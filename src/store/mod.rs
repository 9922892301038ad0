//! Catalog storage using SQLite
//!
//! This module handles all record storage:
//! - Tools (cataloged digital tools, with per-field FTS5 search indexes)
//! - Bookmarks (user/tool join entities)
//! - Chat messages (assistant turns, append-only)
//! - Search log (append-only, aggregated for popularity)

mod schema;

pub use schema::*;

use crate::error::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tracing::debug;
use uuid::Uuid;

/// A cataloged tool record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tool {
    pub id: String,
    pub url: String,
    pub name: String,
    pub tagline: String,
    pub summary: String,
    pub descriptor: String,
    pub category: Option<String>,
    pub tags_json: Option<String>,
    pub rating: Option<f64>,
    pub featured: Option<bool>,
    pub screenshot: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Tool {
    pub fn tags(&self) -> Vec<String> {
        self.tags_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default()
    }
}

/// The writable fields of a tool, used for create and update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolFields {
    pub url: String,
    pub name: String,
    pub tagline: String,
    pub summary: String,
    pub descriptor: String,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub rating: Option<f64>,
    pub featured: Option<bool>,
    pub screenshot: Option<String>,
}

impl ToolFields {
    fn tags_json(&self) -> Option<String> {
        self.tags
            .as_ref()
            .map(|t| serde_json::to_string(t).unwrap_or_default())
    }

    fn tags_fts_text(&self) -> String {
        self.tags.as_ref().map(|t| t.join(" ")).unwrap_or_default()
    }
}

/// One chat assistant turn
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub session_id: String,
    pub user_id: Option<String>,
    pub message: String,
    pub response: String,
    pub recommendations_json: Option<String>,
    pub prompt_tokens: Option<i64>,
    pub completion_tokens: Option<i64>,
    pub total_tokens: Option<i64>,
    pub created_at: String,
}

impl ChatMessage {
    pub fn recommended_tool_ids(&self) -> Vec<String> {
        self.recommendations_json
            .as_ref()
            .and_then(|j| serde_json::from_str(j).ok())
            .unwrap_or_default()
    }
}

/// Token usage counters reported by the assistant API
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
}

/// Per-id outcome of a bulk delete
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub id: String,
    pub success: bool,
    pub error: Option<String>,
}

/// Build an FTS5 MATCH expression from free text.
///
/// Each whitespace token is quoted and prefix-matched, so user input can never
/// be interpreted as FTS query syntax. Returns None for blank input.
fn fts_match_expr(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{}\"*", t))
        .collect();
    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

/// Catalog database handle
#[derive(Clone)]
pub struct CatalogDb {
    pool: SqlitePool,
}

impl CatalogDb {
    /// Open (and auto-initialize) the catalog database at the given path
    pub async fn new(db_path: &std::path::Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Open an in-memory database (tests)
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::new().in_memory(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        let db = Self { pool };
        db.init_schema().await?;
        Ok(db)
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    // ===== Tool Operations =====

    /// Insert a new tool, returning its id
    pub async fn create_tool(&self, fields: &ToolFields) -> Result<Tool> {
        let now = Utc::now().to_rfc3339();
        let tool = Tool {
            id: Uuid::new_v4().to_string(),
            url: fields.url.clone(),
            name: fields.name.clone(),
            tagline: fields.tagline.clone(),
            summary: fields.summary.clone(),
            descriptor: fields.descriptor.clone(),
            category: fields.category.clone(),
            tags_json: fields.tags_json(),
            rating: fields.rating,
            featured: fields.featured,
            screenshot: fields.screenshot.clone(),
            created_at: now.clone(),
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO tools (id, url, name, tagline, summary, descriptor, category, tags_json, rating, featured, screenshot, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&tool.id)
        .bind(&tool.url)
        .bind(&tool.name)
        .bind(&tool.tagline)
        .bind(&tool.summary)
        .bind(&tool.descriptor)
        .bind(&tool.category)
        .bind(&tool.tags_json)
        .bind(tool.rating)
        .bind(tool.featured)
        .bind(&tool.screenshot)
        .bind(&tool.created_at)
        .bind(&tool.updated_at)
        .execute(&self.pool)
        .await?;

        self.index_tool(&tool.id, fields).await?;
        Ok(tool)
    }

    /// Update an existing tool in place
    pub async fn update_tool(&self, id: &str, fields: &ToolFields) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE tools SET url = ?, name = ?, tagline = ?, summary = ?, descriptor = ?,
                category = ?, tags_json = ?, rating = ?, featured = ?, screenshot = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.url)
        .bind(&fields.name)
        .bind(&fields.tagline)
        .bind(&fields.summary)
        .bind(&fields.descriptor)
        .bind(&fields.category)
        .bind(fields.tags_json())
        .bind(fields.rating)
        .bind(fields.featured)
        .bind(&fields.screenshot)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.deindex_tool(id).await?;
        self.index_tool(id, fields).await?;
        Ok(())
    }

    async fn index_tool(&self, id: &str, fields: &ToolFields) -> Result<()> {
        sqlx::query("INSERT INTO tools_name_fts (tool_id, name) VALUES (?, ?)")
            .bind(id)
            .bind(&fields.name)
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO tools_descriptor_fts (tool_id, descriptor) VALUES (?, ?)")
            .bind(id)
            .bind(&fields.descriptor)
            .execute(&self.pool)
            .await?;
        sqlx::query("INSERT INTO tools_tags_fts (tool_id, tags) VALUES (?, ?)")
            .bind(id)
            .bind(fields.tags_fts_text())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn deindex_tool(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM tools_name_fts WHERE tool_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM tools_descriptor_fts WHERE tool_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM tools_tags_fts WHERE tool_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Get tool by id
    pub async fn get_tool(&self, id: &str) -> Result<Option<Tool>> {
        let tool = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tool)
    }

    /// Get tool by canonical URL
    pub async fn get_tool_by_url(&self, url: &str) -> Result<Option<Tool>> {
        let tool = sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE url = ?")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(tool)
    }

    /// Get tool by exact name (case-insensitive)
    pub async fn get_tool_by_name(&self, name: &str) -> Result<Option<Tool>> {
        let tool =
            sqlx::query_as::<_, Tool>("SELECT * FROM tools WHERE name = ? COLLATE NOCASE LIMIT 1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(tool)
    }

    /// List featured tools
    pub async fn list_featured(&self, limit: usize) -> Result<Vec<Tool>> {
        let tools = sqlx::query_as::<_, Tool>(
            "SELECT * FROM tools WHERE featured = 1 ORDER BY created_at DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(tools)
    }

    /// List tools newest-first with keyset pagination and optional category filter.
    ///
    /// `before` is the (created_at, id) pair of the last row of the previous page.
    pub async fn list_recent(
        &self,
        category: Option<&str>,
        before: Option<(&str, &str)>,
        limit: usize,
    ) -> Result<Vec<Tool>> {
        let tools = match (category, before) {
            (Some(cat), Some((ts, id))) => {
                sqlx::query_as::<_, Tool>(
                    r#"
                    SELECT * FROM tools
                    WHERE category = ? AND (created_at, id) < (?, ?)
                    ORDER BY created_at DESC, id DESC LIMIT ?
                    "#,
                )
                .bind(cat)
                .bind(ts)
                .bind(id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            (Some(cat), None) => {
                sqlx::query_as::<_, Tool>(
                    "SELECT * FROM tools WHERE category = ? ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(cat)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            (None, Some((ts, id))) => {
                sqlx::query_as::<_, Tool>(
                    r#"
                    SELECT * FROM tools
                    WHERE (created_at, id) < (?, ?)
                    ORDER BY created_at DESC, id DESC LIMIT ?
                    "#,
                )
                .bind(ts)
                .bind(id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
            (None, None) => {
                sqlx::query_as::<_, Tool>(
                    "SELECT * FROM tools ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(tools)
    }

    /// Field search over tool names
    pub async fn search_names(
        &self,
        query: &str,
        category: Option<&str>,
        cap: usize,
    ) -> Result<Vec<Tool>> {
        self.field_search("tools_name_fts", "name", query, category, cap)
            .await
    }

    /// Field search over tool descriptors
    pub async fn search_descriptors(
        &self,
        query: &str,
        category: Option<&str>,
        cap: usize,
    ) -> Result<Vec<Tool>> {
        self.field_search("tools_descriptor_fts", "descriptor", query, category, cap)
            .await
    }

    /// Field search over tool tags
    pub async fn search_tags(
        &self,
        query: &str,
        category: Option<&str>,
        cap: usize,
    ) -> Result<Vec<Tool>> {
        self.field_search("tools_tags_fts", "tags", query, category, cap)
            .await
    }

    async fn field_search(
        &self,
        fts_table: &str,
        fts_column: &str,
        query: &str,
        category: Option<&str>,
        cap: usize,
    ) -> Result<Vec<Tool>> {
        let Some(expr) = fts_match_expr(query) else {
            return Ok(Vec::new());
        };

        // fts_table/fts_column come from the three callers above, never user input
        let sql = if category.is_some() {
            format!(
                r#"
                SELECT t.* FROM {fts} f
                JOIN tools t ON t.id = f.tool_id
                WHERE f.{col} MATCH ? AND t.category = ?
                ORDER BY f.rank LIMIT ?
                "#,
                fts = fts_table,
                col = fts_column,
            )
        } else {
            format!(
                r#"
                SELECT t.* FROM {fts} f
                JOIN tools t ON t.id = f.tool_id
                WHERE f.{col} MATCH ?
                ORDER BY f.rank LIMIT ?
                "#,
                fts = fts_table,
                col = fts_column,
            )
        };

        let mut q = sqlx::query_as::<_, Tool>(&sql).bind(expr);
        if let Some(cat) = category {
            q = q.bind(cat);
        }
        let tools = q.bind(cap as i64).fetch_all(&self.pool).await?;
        Ok(tools)
    }

    /// Distinct categories, sorted
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT category FROM tools WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Delete a tool outright (no soft delete)
    pub async fn delete_tool(&self, id: &str) -> Result<()> {
        self.deindex_tool(id).await?;
        sqlx::query("DELETE FROM bookmarks WHERE tool_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM tools WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Delete several tools, reporting per-id outcomes
    pub async fn delete_tools(&self, ids: &[String]) -> Result<Vec<DeleteOutcome>> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for id in ids {
            match self.delete_tool(id).await {
                Ok(()) => outcomes.push(DeleteOutcome {
                    id: id.clone(),
                    success: true,
                    error: None,
                }),
                Err(e) => outcomes.push(DeleteOutcome {
                    id: id.clone(),
                    success: false,
                    error: Some(e.to_string()),
                }),
            }
        }
        Ok(outcomes)
    }

    // ===== Bookmark Operations =====

    /// Add a bookmark; a second add for the same (user, tool) pair is a no-op
    pub async fn add_bookmark(&self, user_id: &str, tool_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO bookmarks (id, user_id, tool_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(tool_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Remove a bookmark
    pub async fn remove_bookmark(&self, user_id: &str, tool_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM bookmarks WHERE user_id = ? AND tool_id = ?")
            .bind(user_id)
            .bind(tool_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All bookmarked tool ids for a user
    pub async fn bookmarked_tool_ids(&self, user_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT tool_id FROM bookmarks WHERE user_id = ?")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    /// All bookmarked tools for a user, newest bookmark first
    pub async fn list_bookmarked_tools(&self, user_id: &str) -> Result<Vec<Tool>> {
        let tools = sqlx::query_as::<_, Tool>(
            r#"
            SELECT t.* FROM bookmarks b
            JOIN tools t ON t.id = b.tool_id
            WHERE b.user_id = ?
            ORDER BY b.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tools)
    }

    // ===== Chat Operations =====

    /// Append one assistant turn to a session
    pub async fn append_chat_message(
        &self,
        session_id: &str,
        user_id: Option<&str>,
        message: &str,
        response: &str,
        recommended_tool_ids: &[String],
        usage: Option<TokenUsage>,
    ) -> Result<ChatMessage> {
        let msg = ChatMessage {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            user_id: user_id.map(|u| u.to_string()),
            message: message.to_string(),
            response: response.to_string(),
            recommendations_json: Some(serde_json::to_string(recommended_tool_ids)?),
            prompt_tokens: usage.map(|u| u.prompt_tokens),
            completion_tokens: usage.map(|u| u.completion_tokens),
            total_tokens: usage.map(|u| u.total_tokens),
            created_at: Utc::now().to_rfc3339(),
        };

        sqlx::query(
            r#"
            INSERT INTO chat_messages (id, session_id, user_id, message, response, recommendations_json, prompt_tokens, completion_tokens, total_tokens, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&msg.id)
        .bind(&msg.session_id)
        .bind(&msg.user_id)
        .bind(&msg.message)
        .bind(&msg.response)
        .bind(&msg.recommendations_json)
        .bind(msg.prompt_tokens)
        .bind(msg.completion_tokens)
        .bind(msg.total_tokens)
        .bind(&msg.created_at)
        .execute(&self.pool)
        .await?;
        Ok(msg)
    }

    /// Chat history for a session, oldest first
    pub async fn session_history(&self, session_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let messages = sqlx::query_as::<_, ChatMessage>(
            "SELECT * FROM chat_messages WHERE session_id = ? ORDER BY created_at ASC LIMIT ?",
        )
        .bind(session_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    // ===== Search Log Operations =====

    /// Record one search, for popularity ranking
    pub async fn log_search(
        &self,
        user_id: Option<&str>,
        query: &str,
        results_count: usize,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO searches (id, user_id, query, results_count, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(query)
        .bind(results_count as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most frequent query strings
    pub async fn popular_searches(&self, limit: usize) -> Result<Vec<String>> {
        let queries: Vec<String> = sqlx::query_scalar(
            "SELECT query FROM searches GROUP BY query ORDER BY COUNT(*) DESC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(queries)
    }

    /// Total tool count
    pub async fn tool_count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tools")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(url: &str, name: &str) -> ToolFields {
        ToolFields {
            url: url.to_string(),
            name: name.to_string(),
            tagline: format!("{} tagline", name),
            summary: format!("{} summary", name),
            descriptor: format!("{} descriptor", name),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_tool_crud() {
        let db = CatalogDb::in_memory().await.unwrap();

        let tool = db
            .create_tool(&fields("https://canva.com", "Canva"))
            .await
            .unwrap();

        let loaded = db.get_tool(&tool.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Canva");

        let by_url = db.get_tool_by_url("https://canva.com").await.unwrap();
        assert!(by_url.is_some());

        let by_name = db.get_tool_by_name("cAnVa").await.unwrap();
        assert!(by_name.is_some());

        let mut updated = fields("https://canva.com", "Canva");
        updated.tagline = "Design anything".to_string();
        db.update_tool(&tool.id, &updated).await.unwrap();
        let loaded = db.get_tool(&tool.id).await.unwrap().unwrap();
        assert_eq!(loaded.tagline, "Design anything");

        db.delete_tool(&tool.id).await.unwrap();
        assert!(db.get_tool(&tool.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tool_count_tracks_inserts_and_deletes() {
        let db = CatalogDb::in_memory().await.unwrap();
        assert_eq!(db.tool_count().await.unwrap(), 0);

        let tool = db
            .create_tool(&fields("https://canva.com", "Canva"))
            .await
            .unwrap();
        db.create_tool(&fields("https://figma.com", "Figma"))
            .await
            .unwrap();
        assert_eq!(db.tool_count().await.unwrap(), 2);

        db.delete_tool(&tool.id).await.unwrap();
        assert_eq!(db.tool_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_field_search_scoping() {
        let db = CatalogDb::in_memory().await.unwrap();

        let mut canva = fields("https://canva.com", "Canva design studio");
        canva.tags = Some(vec!["graphics".to_string()]);
        db.create_tool(&canva).await.unwrap();

        let mut figma = fields("https://figma.com", "Figma");
        figma.tags = Some(vec!["design".to_string(), "prototyping".to_string()]);
        db.create_tool(&figma).await.unwrap();

        // "design" appears in Canva's name and in Figma's tags
        let name_hits = db.search_names("design", None, 20).await.unwrap();
        assert_eq!(name_hits.len(), 1);
        assert_eq!(name_hits[0].name, "Canva design studio");

        let tag_hits = db.search_tags("design", None, 20).await.unwrap();
        assert_eq!(tag_hits.len(), 1);
        assert_eq!(tag_hits[0].name, "Figma");

        // Blank query matches nothing
        assert!(db.search_names("   ", None, 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_field_search_category_filter() {
        let db = CatalogDb::in_memory().await.unwrap();

        let mut a = fields("https://a.com", "Alpha writer");
        a.category = Some("Writing".to_string());
        db.create_tool(&a).await.unwrap();

        let mut b = fields("https://b.com", "Beta writer");
        b.category = Some("Design".to_string());
        db.create_tool(&b).await.unwrap();

        let hits = db.search_names("writer", Some("Writing"), 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Alpha writer");
    }

    #[tokio::test]
    async fn test_update_reindexes_search() {
        let db = CatalogDb::in_memory().await.unwrap();

        let tool = db
            .create_tool(&fields("https://a.com", "Oldname"))
            .await
            .unwrap();
        assert_eq!(db.search_names("oldname", None, 20).await.unwrap().len(), 1);

        db.update_tool(&tool.id, &fields("https://a.com", "Newname"))
            .await
            .unwrap();
        assert!(db.search_names("oldname", None, 20).await.unwrap().is_empty());
        assert_eq!(db.search_names("newname", None, 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bookmark_uniqueness() {
        let db = CatalogDb::in_memory().await.unwrap();
        let tool = db.create_tool(&fields("https://a.com", "A")).await.unwrap();

        db.add_bookmark("user1", &tool.id).await.unwrap();
        db.add_bookmark("user1", &tool.id).await.unwrap();

        let ids = db.bookmarked_tool_ids("user1").await.unwrap();
        assert_eq!(ids.len(), 1);

        db.remove_bookmark("user1", &tool.id).await.unwrap();
        assert!(db.bookmarked_tool_ids("user1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_popular_searches() {
        let db = CatalogDb::in_memory().await.unwrap();

        db.log_search(None, "design", 3).await.unwrap();
        db.log_search(Some("u1"), "design", 5).await.unwrap();
        db.log_search(None, "writing", 1).await.unwrap();

        let popular = db.popular_searches(10).await.unwrap();
        assert_eq!(popular[0], "design");
        assert_eq!(popular.len(), 2);
    }

    #[tokio::test]
    async fn test_chat_history_order() {
        let db = CatalogDb::in_memory().await.unwrap();

        db.append_chat_message("s1", None, "first", "r1", &[], None)
            .await
            .unwrap();
        db.append_chat_message("s1", Some("u1"), "second", "r2", &["t1".to_string()], None)
            .await
            .unwrap();
        db.append_chat_message("s2", None, "other", "r3", &[], None)
            .await
            .unwrap();

        let history = db.session_history("s1", 50).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "first");
        assert_eq!(history[1].recommended_tool_ids(), vec!["t1".to_string()]);
    }
}
