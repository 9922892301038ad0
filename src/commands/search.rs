//! Search command implementation

use crate::config::Config;
use crate::error::Result;
use crate::search::{self, SearchPage, SearchRequest};
use crate::store::CatalogDb;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub category: Option<String>,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
    pub user: Option<String>,
}

/// Search the catalog and return one page of results
pub async fn cmd_search(
    config: &Config,
    db: &CatalogDb,
    query: &str,
    options: SearchOptions,
) -> Result<SearchPage> {
    let req = SearchRequest {
        query: query.to_string(),
        category: options.category,
        cursor: options.cursor,
        page_size: options.page_size,
    };

    let page = search::search_tools(db, config, &req, options.user.as_deref()).await?;

    // Blank queries are browsing, not searching; only real queries are logged
    if !query.trim().is_empty() {
        db.log_search(options.user.as_deref(), query.trim(), page.page.len())
            .await?;
    }

    Ok(page)
}

pub fn print_search_page(page: &SearchPage) {
    if page.page.is_empty() {
        println!("No tools found.");
        return;
    }

    for hit in &page.page {
        let marker = if hit.is_bookmarked { "★" } else { " " };
        println!("{} {}  [{}]", marker, hit.tool.name, hit.tool.id);
        println!("    {}", hit.tool.tagline);
        if let Some(category) = &hit.tool.category {
            println!("    Category: {}", category);
        }
        let tags = hit.tool.tags();
        if !tags.is_empty() {
            println!("    Tags: {}", tags.join(", "));
        }
        println!("    {}", hit.tool.url);
    }

    if page.is_done {
        println!("\n{} result(s), no more pages.", page.page.len());
    } else {
        println!(
            "\n{} result(s). Next page: --cursor '{}'",
            page.page.len(),
            page.continue_cursor
        );
    }
}
