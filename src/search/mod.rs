//! Search aggregation over the per-field tool indexes
//!
//! Merges three independent field searches (name, descriptor, tags) into one
//! deduplicated, paginated result set, annotated with per-user bookmark flags
//! and normalized screenshot URLs.

use crate::assets::normalize_screenshot;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::store::{CatalogDb, Tool};
use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

/// One search invocation
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub category: Option<String>,
    /// Cursor from the previous page; None for the first page
    pub cursor: Option<String>,
    /// Page size override; falls back to the configured default
    pub page_size: Option<usize>,
}

/// A tool annotated for presentation
#[derive(Debug, Clone, Serialize)]
pub struct ToolHit {
    #[serde(flatten)]
    pub tool: Tool,
    pub is_bookmarked: bool,
}

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub page: Vec<ToolHit>,
    pub is_done: bool,
    /// Opaque cursor for the next page; empty when exhausted
    pub continue_cursor: String,
}

/// Execute a search and return one page.
///
/// A blank query lists tools newest-first with true keyset pagination. A
/// non-blank query unions three capped field searches (name before descriptor
/// before tags), dedupes by tool id, and paginates the merged list by integer
/// offset. Matches beyond 3x the per-field fetch cap are unreachable; the cap
/// is configuration, not a constant.
pub async fn search_tools(
    db: &CatalogDb,
    config: &Config,
    req: &SearchRequest,
    user_id: Option<&str>,
) -> Result<SearchPage> {
    let page_size = req.page_size.unwrap_or(config.search.page_size);
    let category = req.category.as_deref();

    let (tools, is_done, continue_cursor) = if req.query.trim().is_empty() {
        browse_recent(db, category, req.cursor.as_deref(), page_size).await?
    } else {
        let merged = merged_field_results(db, config, req.query.trim(), category).await?;
        paginate_merged(merged, req.cursor.as_deref(), page_size)?
    };

    let page = annotate(db, config, tools, user_id).await?;
    Ok(SearchPage {
        page,
        is_done,
        continue_cursor,
    })
}

/// Featured tools, annotated
pub async fn featured_tools(
    db: &CatalogDb,
    config: &Config,
    user_id: Option<&str>,
) -> Result<Vec<ToolHit>> {
    let tools = db.list_featured(config.search.featured_limit).await?;
    annotate(db, config, tools, user_id).await
}

/// Single tool by id, annotated; None when absent
pub async fn get_tool(
    db: &CatalogDb,
    config: &Config,
    id: &str,
    user_id: Option<&str>,
) -> Result<Option<ToolHit>> {
    let Some(tool) = db.get_tool(id).await? else {
        return Ok(None);
    };
    let mut hits = annotate(db, config, vec![tool], user_id).await?;
    Ok(hits.pop())
}

/// A user's bookmarked tools, annotated (all flags true by construction)
pub async fn bookmarked_tools(
    db: &CatalogDb,
    config: &Config,
    user_id: &str,
) -> Result<Vec<ToolHit>> {
    let tools = db.list_bookmarked_tools(user_id).await?;
    annotate(db, config, tools, Some(user_id)).await
}

async fn browse_recent(
    db: &CatalogDb,
    category: Option<&str>,
    cursor: Option<&str>,
    page_size: usize,
) -> Result<(Vec<Tool>, bool, String)> {
    let before = match cursor.filter(|c| !c.is_empty()) {
        Some(c) => Some(decode_keyset_cursor(c)?),
        None => None,
    };
    let before_ref = before.as_ref().map(|(ts, id)| (ts.as_str(), id.as_str()));

    // One extra row tells us whether another page exists
    let mut tools = db.list_recent(category, before_ref, page_size + 1).await?;
    let is_done = tools.len() <= page_size;
    tools.truncate(page_size);

    let continue_cursor = if is_done {
        String::new()
    } else {
        tools
            .last()
            .map(|t| format!("{}|{}", t.created_at, t.id))
            .unwrap_or_default()
    };
    Ok((tools, is_done, continue_cursor))
}

async fn merged_field_results(
    db: &CatalogDb,
    config: &Config,
    query: &str,
    category: Option<&str>,
) -> Result<Vec<Tool>> {
    let cap = config.search.fetch_cap;

    let name_hits = db.search_names(query, category, cap).await?;
    let descriptor_hits = db.search_descriptors(query, category, cap).await?;
    let tag_hits = db.search_tags(query, category, cap).await?;

    debug!(
        "field hits for {:?}: name={} descriptor={} tags={}",
        query,
        name_hits.len(),
        descriptor_hits.len(),
        tag_hits.len()
    );

    // Union in field order; first occurrence wins, so a tool matched by name
    // outranks the same tool matched by descriptor or tags.
    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    for tool in name_hits
        .into_iter()
        .chain(descriptor_hits)
        .chain(tag_hits)
    {
        if seen.insert(tool.id.clone()) {
            merged.push(tool);
        }
    }
    Ok(merged)
}

fn paginate_merged(
    merged: Vec<Tool>,
    cursor: Option<&str>,
    page_size: usize,
) -> Result<(Vec<Tool>, bool, String)> {
    let start = match cursor.filter(|c| !c.is_empty()) {
        Some(c) => c
            .parse::<usize>()
            .map_err(|_| Error::InvalidCursor(c.to_string()))?,
        None => 0,
    };
    let end = start.saturating_add(page_size).min(merged.len());
    let is_done = end >= merged.len();

    let page = if start >= merged.len() {
        Vec::new()
    } else {
        merged[start..end].to_vec()
    };

    let continue_cursor = if is_done {
        String::new()
    } else {
        end.to_string()
    };
    Ok((page, is_done, continue_cursor))
}

fn decode_keyset_cursor(cursor: &str) -> Result<(String, String)> {
    cursor
        .split_once('|')
        .map(|(ts, id)| (ts.to_string(), id.to_string()))
        .ok_or_else(|| Error::InvalidCursor(cursor.to_string()))
}

async fn annotate(
    db: &CatalogDb,
    config: &Config,
    tools: Vec<Tool>,
    user_id: Option<&str>,
) -> Result<Vec<ToolHit>> {
    let bookmarked: HashSet<String> = match user_id {
        Some(user) => db.bookmarked_tool_ids(user).await?.into_iter().collect(),
        None => HashSet::new(),
    };

    Ok(tools
        .into_iter()
        .map(|mut tool| {
            tool.screenshot = normalize_screenshot(
                tool.screenshot.as_deref(),
                Some(&tool.name),
                &config.site_base_url,
            );
            let is_bookmarked = bookmarked.contains(&tool.id);
            ToolHit {
                tool,
                is_bookmarked,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ToolFields;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.site_base_url = "https://trendi.test".to_string();
        config
    }

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

    async fn seed_design_tools(db: &CatalogDb) {
        // Figma matches "design" only via tags; Canva matches via name.
        // Figma is inserted first so raw index order would put it ahead.
        let mut figma = fields("https://figma.com", "Figma");
        figma.tags = Some(vec!["design".to_string(), "prototyping".to_string()]);
        db.create_tool(&figma).await.unwrap();

        let mut canva = fields("https://canva.com", "Canva design");
        canva.tags = Some(vec!["graphics".to_string()]);
        db.create_tool(&canva).await.unwrap();
    }

    #[tokio::test]
    async fn test_name_hits_rank_before_tag_hits() {
        let db = CatalogDb::in_memory().await.unwrap();
        seed_design_tools(&db).await;

        let req = SearchRequest {
            query: "design".to_string(),
            ..Default::default()
        };
        let page = search_tools(&db, &test_config(), &req, None).await.unwrap();

        assert_eq!(page.page.len(), 2);
        assert_eq!(page.page[0].tool.name, "Canva design");
        assert_eq!(page.page[1].tool.name, "Figma");
        assert!(page.is_done);
        assert!(page.continue_cursor.is_empty());
    }

    #[tokio::test]
    async fn test_merged_results_deduplicated() {
        let db = CatalogDb::in_memory().await.unwrap();

        // Matches in all three fields, must appear exactly once
        let mut t = fields("https://acme.com", "Acme design");
        t.descriptor = "design helper".to_string();
        t.tags = Some(vec!["design".to_string()]);
        db.create_tool(&t).await.unwrap();

        let req = SearchRequest {
            query: "design".to_string(),
            ..Default::default()
        };
        let page = search_tools(&db, &test_config(), &req, None).await.unwrap();
        assert_eq!(page.page.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_exhaustion_covers_merged_set() {
        let db = CatalogDb::in_memory().await.unwrap();
        for i in 0..7 {
            db.create_tool(&fields(
                &format!("https://t{}.com", i),
                &format!("Widget {}", i),
            ))
            .await
            .unwrap();
        }

        let config = test_config();
        let mut cursor: Option<String> = None;
        let mut collected = Vec::new();
        loop {
            let req = SearchRequest {
                query: "widget".to_string(),
                cursor: cursor.clone(),
                page_size: Some(3),
                ..Default::default()
            };
            let page = search_tools(&db, &config, &req, None).await.unwrap();
            collected.extend(page.page.iter().map(|h| h.tool.id.clone()));
            if page.is_done {
                assert!(page.continue_cursor.is_empty());
                break;
            }
            cursor = Some(page.continue_cursor);
        }

        assert_eq!(collected.len(), 7);
        let unique: HashSet<_> = collected.iter().collect();
        assert_eq!(unique.len(), 7);
    }

    #[tokio::test]
    async fn test_browse_recent_keyset_pagination() {
        let db = CatalogDb::in_memory().await.unwrap();
        for i in 0..5 {
            db.create_tool(&fields(
                &format!("https://t{}.com", i),
                &format!("Tool {}", i),
            ))
            .await
            .unwrap();
            // Distinct created_at values keep the recency order deterministic
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }

        let config = test_config();
        let req = SearchRequest {
            query: String::new(),
            page_size: Some(2),
            ..Default::default()
        };
        let first = search_tools(&db, &config, &req, None).await.unwrap();
        assert_eq!(first.page.len(), 2);
        assert!(!first.is_done);
        // Newest first
        assert_eq!(first.page[0].tool.name, "Tool 4");

        let req = SearchRequest {
            query: String::new(),
            cursor: Some(first.continue_cursor),
            page_size: Some(2),
            ..Default::default()
        };
        let second = search_tools(&db, &config, &req, None).await.unwrap();
        assert_eq!(second.page[0].tool.name, "Tool 2");
    }

    #[tokio::test]
    async fn test_anonymous_bookmark_flags_false() {
        let db = CatalogDb::in_memory().await.unwrap();
        seed_design_tools(&db).await;

        let req = SearchRequest {
            query: "design".to_string(),
            ..Default::default()
        };
        let page = search_tools(&db, &test_config(), &req, None).await.unwrap();
        assert!(page.page.iter().all(|h| !h.is_bookmarked));
    }

    #[tokio::test]
    async fn test_bookmark_annotation() {
        let db = CatalogDb::in_memory().await.unwrap();
        seed_design_tools(&db).await;

        let canva = db.get_tool_by_url("https://canva.com").await.unwrap().unwrap();
        db.add_bookmark("user1", &canva.id).await.unwrap();

        let req = SearchRequest {
            query: "design".to_string(),
            ..Default::default()
        };
        let page = search_tools(&db, &test_config(), &req, Some("user1"))
            .await
            .unwrap();
        let flags: Vec<(String, bool)> = page
            .page
            .iter()
            .map(|h| (h.tool.name.clone(), h.is_bookmarked))
            .collect();
        assert!(flags.contains(&("Canva design".to_string(), true)));
        assert!(flags.contains(&("Figma".to_string(), false)));
    }

    #[tokio::test]
    async fn test_screenshot_normalized_on_read() {
        let db = CatalogDb::in_memory().await.unwrap();

        let mut t = fields("https://acme.com", "Acme");
        t.screenshot = Some("kg2abc".to_string());
        db.create_tool(&t).await.unwrap();

        let req = SearchRequest {
            query: "acme".to_string(),
            ..Default::default()
        };
        let page = search_tools(&db, &test_config(), &req, None).await.unwrap();
        assert_eq!(
            page.page[0].tool.screenshot.as_deref(),
            Some("https://trendi.test/images/acme-kg2abc.png")
        );
    }

    #[tokio::test]
    async fn test_invalid_offset_cursor_rejected() {
        let db = CatalogDb::in_memory().await.unwrap();
        seed_design_tools(&db).await;

        let req = SearchRequest {
            query: "design".to_string(),
            cursor: Some("not-a-number".to_string()),
            ..Default::default()
        };
        assert!(search_tools(&db, &test_config(), &req, None).await.is_err());
    }
}
