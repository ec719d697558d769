pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::issue_token;
use crate::config::{config, SecurityConfig, StoreKind};
use crate::database::PgUserStore;

#[derive(Parser)]
#[command(name = "waypostctl")]
#[command(about = "Waypost operator tool - tokens and schema management")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Mint a bearer token signed with the configured secret")]
    Token {
        #[arg(long, help = "User id the token is issued for")]
        user: Uuid,
        #[arg(long, default_value = "user", help = "Access level (\"root\" may read any user's locations)")]
        access: String,
    },

    #[command(about = "Create the PostgreSQL tables if they do not exist")]
    Migrate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Token { user, access } => token(user, &access, &output_format),
        Commands::Migrate => migrate(&output_format).await,
    }
}

fn token(user: Uuid, access: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    let issued = issue_token_payload(user, access, &config().security)?;

    match output_format {
        OutputFormat::Json => utils::output_success(output_format, "Token issued", Some(issued)),
        OutputFormat::Text => {
            println!("{}", issued["token"].as_str().unwrap_or_default());
            Ok(())
        }
    }
}

fn issue_token_payload(user: Uuid, access: &str, security: &SecurityConfig) -> anyhow::Result<Value> {
    if security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET is not set");
    }

    let token = issue_token(user, access, security)?;
    Ok(json!({
        "token": token,
        "user_id": user,
        "access": access,
        "expires_in_hours": security.jwt_expiry_hours,
    }))
}

async fn migrate(output_format: &OutputFormat) -> anyhow::Result<()> {
    let database = &config().database;
    if database.store != StoreKind::Postgres {
        tracing::warn!("WAYPOST_STORE is not postgres; migrating DATABASE_URL anyway");
    }

    let store = PgUserStore::connect(database).await?;
    store.ensure_schema().await?;

    utils::output_success(output_format, "Schema is up to date", None)
}
