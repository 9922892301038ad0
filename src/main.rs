//! trenditools CLI entry point

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use trenditools::{
    commands::{
        cmd_bookmark, cmd_bookmarks, cmd_categories, cmd_chat, cmd_chat_history, cmd_featured,
        cmd_init, cmd_popular, cmd_process, cmd_remove_tools, cmd_search, cmd_show_tool,
        print_chat_history,
        print_chat_turn, print_report, print_search_page, print_tool_detail, print_tool_list,
        ProcessOptions, SearchOptions,
    },
    config::Config,
    error::Result,
    pipeline::RunMode,
    progress::LogWriterFactory,
    store::CatalogDb,
};

#[derive(Parser)]
#[command(name = "trendi")]
#[command(version, about = "Searchable directory of digital tools", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Act as this user (bookmarks, search log, chat)
    #[arg(short, long, global = true, env = "TRENDI_USER")]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize trenditools configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Search the catalog (blank query browses newest first)
    Search {
        /// The search query
        query: Option<String>,

        /// Filter to a category
        #[arg(long)]
        category: Option<String>,

        /// Cursor from a previous page
        #[arg(long)]
        cursor: Option<String>,

        /// Results per page
        #[arg(short, long)]
        page_size: Option<usize>,
    },

    /// Show featured tools
    Featured,

    /// Show one tool by id or name
    Tool {
        /// Tool id or name
        id_or_name: String,
    },

    /// List catalog categories
    Categories,

    /// Show the most popular search queries
    Popular {
        /// Maximum queries to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Bookmark a tool (or remove a bookmark)
    Bookmark {
        /// Tool id
        tool_id: String,

        /// Remove the bookmark instead of adding it
        #[arg(long)]
        remove: bool,
    },

    /// List your bookmarked tools
    Bookmarks,

    /// Delete tools from the catalog
    Remove {
        /// Tool ids to delete
        #[arg(required = true)]
        tool_ids: Vec<String>,
    },

    /// Ask the assistant for tool recommendations
    Chat {
        /// Your message; omit with --history to just read the session
        message: Option<String>,

        /// Session id (continues an existing conversation)
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Print the session history instead of sending a message
        #[arg(long)]
        history: bool,
    },

    /// Enrich a file of URLs into catalog records
    Process {
        /// File with one URL per line
        file: PathBuf,

        /// Validate the pipeline without network calls or writes
        #[arg(short, long)]
        dry_run: bool,

        /// Skip URLs and stages that already completed
        #[arg(short, long)]
        resume: bool,

        /// Reprocess URLs that failed or were never attempted
        #[arg(long = "retry-failed", alias = "retry")]
        retry_failed: bool,

        /// Override the configured batch size
        #[arg(short, long)]
        batch_size: Option<usize>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory::default()))
        .with(filter)
        .init();

    // Init doesn't need an existing config
    if let Commands::Init { force } = cli.command {
        let base_dir = cli.config.as_ref().and_then(|p| {
            if p.extension().map_or(false, |e| e == "toml") {
                p.parent().map(PathBuf::from)
            } else {
                Some(p.clone())
            }
        });
        let config = cmd_init(base_dir, force).await?;
        println!("✓ trenditools initialized");
        println!("  Config:   {}", config.paths.config_file.display());
        println!("  Database: {}", config.paths.db_file.display());
        println!("\nNext steps:");
        println!("  trendi process urls.txt       # Enrich a URL list");
        println!("  trendi search \"design\"        # Search the catalog");
        return Ok(());
    }

    // Completions don't need config or database
    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "trendi", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(cli.config.as_deref())?;
    let db = CatalogDb::new(&config.paths.db_file).await?;
    let user = cli.user.as_deref();

    match cli.command {
        Commands::Init { .. } | Commands::Completions { .. } => unreachable!(),

        Commands::Search {
            query,
            category,
            cursor,
            page_size,
        } => {
            let options = SearchOptions {
                category,
                cursor,
                page_size,
                user: cli.user.clone(),
            };
            let page = cmd_search(&config, &db, query.as_deref().unwrap_or(""), options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_search_page(&page);
            }
        }

        Commands::Featured => {
            let hits = cmd_featured(&config, &db, user).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_tool_list(&hits);
            }
        }

        Commands::Tool { id_or_name } => {
            let hit = cmd_show_tool(&config, &db, &id_or_name, user).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hit)?);
            } else {
                print_tool_detail(&hit);
            }
        }

        Commands::Categories => {
            let categories = cmd_categories(&db).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for category in categories {
                    println!("{}", category);
                }
            }
        }

        Commands::Popular { limit } => {
            let queries = cmd_popular(&db, limit).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&queries)?);
            } else {
                for query in queries {
                    println!("{}", query);
                }
            }
        }

        Commands::Bookmark { tool_id, remove } => {
            let user = require_user(user)?;
            let bookmarked = cmd_bookmark(&db, user, &tool_id, remove).await?;
            if bookmarked {
                println!("✓ Bookmarked {}", tool_id);
            } else {
                println!("✓ Removed bookmark for {}", tool_id);
            }
        }

        Commands::Bookmarks => {
            let user = require_user(user)?;
            let hits = cmd_bookmarks(&config, &db, user).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&hits)?);
            } else {
                print_tool_list(&hits);
            }
        }

        Commands::Remove { tool_ids } => {
            let outcomes = cmd_remove_tools(&db, &tool_ids).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcomes)?);
            } else {
                for outcome in outcomes {
                    if outcome.success {
                        println!("✓ Removed {}", outcome.id);
                    } else {
                        println!(
                            "✗ {}: {}",
                            outcome.id,
                            outcome.error.as_deref().unwrap_or("unknown error")
                        );
                    }
                }
            }
        }

        Commands::Chat {
            message,
            session,
            history,
        } => {
            if history {
                let turns = cmd_chat_history(&config, &db, &session, 50).await?;
                print_chat_history(&turns);
            } else {
                let message = message.ok_or_else(|| {
                    trenditools::Error::Config(
                        "Provide a message, or use --history to read the session".to_string(),
                    )
                })?;
                let turn = cmd_chat(&config, &db, &session, user, &message).await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&turn)?);
                } else {
                    print_chat_turn(&turn);
                }
            }
        }

        Commands::Process {
            file,
            dry_run,
            resume,
            retry_failed,
            batch_size,
        } => {
            let mode = if retry_failed {
                RunMode::RetryFailed
            } else if resume {
                RunMode::Resume
            } else {
                RunMode::Fresh
            };
            let options = ProcessOptions {
                url_file: file,
                mode,
                dry_run,
                batch_size,
            };
            let report = cmd_process(&config, &db, options).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
    }

    Ok(())
}

fn require_user(user: Option<&str>) -> Result<&str> {
    user.ok_or_else(|| {
        trenditools::Error::Config(
            "This command needs a user; pass --user or set TRENDI_USER".to_string(),
        )
    })
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    let config_path = path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_config_path);

    if !config_path.exists() {
        return Err(trenditools::Error::NotInitialized);
    }

    let config = Config::load(&config_path)?;
    if !config.is_initialized() {
        return Err(trenditools::Error::NotInitialized);
    }
    Ok(config)
}
