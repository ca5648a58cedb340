use clap::Parser;
use tokio::net::TcpListener;

use foodgram::cli::{self, Cli, Command};
use foodgram::config::Config;
use foodgram::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    let config = Config::load();
    let pool = db::init_pool(&config.database_url).await?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let app = foodgram::build_app(pool, &config).await?;
            let listener = TcpListener::bind(&config.bind_addr).await?;

            tracing::info!("listening on {}", config.bind_addr);
            axum::serve(listener, app).await?;
        }
        Command::ImportIngredients { file } => {
            cli::import_ingredients(&pool, &file).await?;
        }
        Command::CreateTag { name, color, slug } => {
            cli::create_tag(&pool, &name, &color, &slug).await?;
        }
    }

    Ok(())
}
