use anyhow::Context;
use clap::{Parser, Subcommand};

use recipe_api::{build_app, config::AppConfig, db, serve, AppState};

#[derive(Debug, Parser)]
#[command(name = "recipe-api", version, about = "Recipe management backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Wait for the database, run migrations and serve the HTTP API (default).
    Serve,
    /// Block until the database accepts connections.
    WaitForDb,
    /// Create an account with staff and superuser rights.
    CreateSuperuser {
        #[arg(long, env = "SUPERUSER_EMAIL")]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "recipe_api=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::WaitForDb => db::wait_for_db(&config.database_url, &config.db_wait).await,
        Command::CreateSuperuser { email, password } => {
            db::wait_for_db(&config.database_url, &config.db_wait).await?;
            let pool = db::connect(&config).await?;
            db::run_migrations(&pool).await?;
            let state = AppState::with_pool(config, pool);
            let user = state
                .identity
                .create_superuser(&email, &password)
                .await
                .context("create superuser")?;
            tracing::info!(user_id = user.id, email = %user.email, "superuser created");
            Ok(())
        }
        Command::Serve => {
            db::wait_for_db(&config.database_url, &config.db_wait).await?;
            let pool = db::connect(&config).await?;
            db::run_migrations(&pool).await?;

            let addr = config.bind_addr();
            let app = build_app(AppState::with_pool(config, pool));
            serve(app, &addr).await
        }
    }
}
