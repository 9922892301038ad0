//! Tool listing, lookup, and bookmark commands

use crate::config::Config;
use crate::error::{Error, Result};
use crate::search::{self, ToolHit};
use crate::store::{CatalogDb, DeleteOutcome};

/// Featured tools, newest first
pub async fn cmd_featured(
    config: &Config,
    db: &CatalogDb,
    user: Option<&str>,
) -> Result<Vec<ToolHit>> {
    search::featured_tools(db, config, user).await
}

/// Look a tool up by id, falling back to a case-insensitive name match
pub async fn cmd_show_tool(
    config: &Config,
    db: &CatalogDb,
    id_or_name: &str,
    user: Option<&str>,
) -> Result<ToolHit> {
    if let Some(hit) = search::get_tool(db, config, id_or_name, user).await? {
        return Ok(hit);
    }
    if let Some(tool) = db.get_tool_by_name(id_or_name).await? {
        if let Some(hit) = search::get_tool(db, config, &tool.id, user).await? {
            return Ok(hit);
        }
    }
    Err(Error::ToolNotFound(id_or_name.to_string()))
}

/// Most frequent search queries
pub async fn cmd_popular(db: &CatalogDb, limit: usize) -> Result<Vec<String>> {
    db.popular_searches(limit).await
}

/// Distinct categories in the catalog
pub async fn cmd_categories(db: &CatalogDb) -> Result<Vec<String>> {
    db.list_categories().await
}

/// Toggle-style bookmark mutation; returns true when a bookmark now exists
pub async fn cmd_bookmark(
    db: &CatalogDb,
    user: &str,
    tool_id: &str,
    remove: bool,
) -> Result<bool> {
    if db.get_tool(tool_id).await?.is_none() {
        return Err(Error::ToolNotFound(tool_id.to_string()));
    }
    if remove {
        db.remove_bookmark(user, tool_id).await?;
        Ok(false)
    } else {
        db.add_bookmark(user, tool_id).await?;
        Ok(true)
    }
}

/// Delete tools outright, returning a per-id outcome
pub async fn cmd_remove_tools(db: &CatalogDb, ids: &[String]) -> Result<Vec<DeleteOutcome>> {
    db.delete_tools(ids).await
}

/// A user's bookmarked tools
pub async fn cmd_bookmarks(
    config: &Config,
    db: &CatalogDb,
    user: &str,
) -> Result<Vec<ToolHit>> {
    search::bookmarked_tools(db, config, user).await
}

pub fn print_tool_list(hits: &[ToolHit]) {
    if hits.is_empty() {
        println!("No tools.");
        return;
    }
    for hit in hits {
        let marker = if hit.is_bookmarked { "★" } else { " " };
        println!(
            "{} {}  [{}]  {}",
            marker,
            hit.tool.name,
            hit.tool.id,
            hit.tool.category.as_deref().unwrap_or("-")
        );
    }
}

pub fn print_tool_detail(hit: &ToolHit) {
    println!("{}", hit.tool.name);
    println!("  {}", hit.tool.tagline);
    println!();
    println!("{}", hit.tool.summary);
    println!();
    println!("  URL: {}", hit.tool.url);
    if let Some(category) = &hit.tool.category {
        println!("  Category: {}", category);
    }
    let tags = hit.tool.tags();
    if !tags.is_empty() {
        println!("  Tags: {}", tags.join(", "));
    }
    if let Some(rating) = hit.tool.rating {
        println!("  Rating: {:.1}", rating);
    }
    if let Some(screenshot) = &hit.tool.screenshot {
        println!("  Screenshot: {}", screenshot);
    }
    if hit.is_bookmarked {
        println!("  Bookmarked: yes");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ToolFields;

    async fn seeded() -> (Config, CatalogDb, String) {
        let db = CatalogDb::in_memory().await.unwrap();
        let tool = db
            .create_tool(&ToolFields {
                url: "https://canva.com".to_string(),
                name: "Canva".to_string(),
                tagline: "t".to_string(),
                summary: "s".to_string(),
                descriptor: "d".to_string(),
                category: Some("Design".to_string()),
                ..ToolFields::default()
            })
            .await
            .unwrap();
        (Config::default(), db, tool.id)
    }

    #[tokio::test]
    async fn test_show_tool_by_name_fallback() {
        let (config, db, id) = seeded().await;
        let hit = cmd_show_tool(&config, &db, "canva", None).await.unwrap();
        assert_eq!(hit.tool.id, id);

        let err = cmd_show_tool(&config, &db, "nope", None).await.unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }

    #[tokio::test]
    async fn test_bookmark_round_trip() {
        let (config, db, id) = seeded().await;

        assert!(cmd_bookmark(&db, "user-1", &id, false).await.unwrap());
        let list = cmd_bookmarks(&config, &db, "user-1").await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list[0].is_bookmarked);

        assert!(!cmd_bookmark(&db, "user-1", &id, true).await.unwrap());
        assert!(cmd_bookmarks(&config, &db, "user-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bookmark_unknown_tool() {
        let (_, db, _) = seeded().await;
        let err = cmd_bookmark(&db, "user-1", "missing", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ToolNotFound(_)));
    }
}
