//! # docqa CLI
//!
//! ```bash
//! docqa --config ./config/docqa.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa init` | Create the SQLite database and run schema migrations |
//! | `docqa serve` | Start the HTTP API |
//! | `docqa user create <username> <email>` | Register a user |
//! | `docqa ingest <file> --user <id>` | Chunk, embed and store a document |
//! | `docqa ask "<question>"` | Answer a question from stored documents |
//! | `docqa select <id>…` | Validate a document selection |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docqa::{catalog, config, context::AppContext, ingest, logging, migrate, qa, server};

/// docqa: retrieval-augmented question answering over your documents.
#[derive(Parser)]
#[command(name = "docqa", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Start the HTTP API on `[server].bind`.
    Serve {
        /// Override the bind address from config.
        #[arg(long)]
        bind: Option<String>,
    },

    /// Manage users.
    User {
        #[command(subcommand)]
        action: UserAction,
    },

    /// Ingest a text file as one document.
    Ingest {
        /// Path to a UTF-8 text file.
        file: PathBuf,

        /// Document title. Defaults to the file stem.
        #[arg(long)]
        title: Option<String>,

        /// Owning user id.
        #[arg(long)]
        user: String,

        /// Extra metadata as `key=value` pairs.
        #[arg(long = "meta", value_parser = parse_key_val)]
        meta: Vec<(String, String)>,
    },

    /// Answer a question.
    Ask {
        question: String,

        /// Restrict retrieval to a document id. Repeatable.
        #[arg(long = "doc")]
        docs: Vec<String>,
    },

    /// Validate that documents exist and optionally record the selection.
    Select {
        #[arg(required = true)]
        document_ids: Vec<String>,

        /// Record the selection for this user.
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Register a user and print its id.
    Create { username: String, email: String },
}

/// Parse a `key=value` pair for `--meta` arguments.
fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{}'", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    if let Commands::Init = cli.command {
        migrate::run_migrations(&cfg).await?;
        println!("Database initialized successfully.");
        return Ok(());
    }

    let ctx = AppContext::from_config(&cfg).await?;

    match cli.command {
        Commands::Init => {}
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| cfg.server.bind.clone());
            server::run_server(ctx, &bind).await?;
        }
        Commands::User {
            action: UserAction::Create { username, email },
        } => {
            let user = catalog::create_user(&ctx.pool, &username, &email)
                .await
                .map_err(|e| anyhow::anyhow!("{:#}", e))?;
            println!("{}", user.id);
        }
        Commands::Ingest {
            file,
            title,
            user,
            meta,
        } => {
            ingest::run_ingest(&ctx, &file, title, user, meta).await?;
        }
        Commands::Ask { question, docs } => {
            qa::run_ask(&ctx, question, docs).await?;
        }
        Commands::Select { document_ids, user } => {
            qa::run_select(&ctx, document_ids, user).await?;
        }
    }

    Ok(())
}
