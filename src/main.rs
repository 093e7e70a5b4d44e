use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use opds_reader::app::AppContext;
use opds_reader::cli::commands::{self, CatalogOptions};
use opds_reader::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut ctx = AppContext::new(cli.config, cli.db)?;

    if let Some(url) = &cli.url {
        ctx.config.remember_url(url);
        ctx.save_config()?;
    }
    let url = ctx.config.current_url().to_string();

    match cli.command {
        Commands::Catalogs => {
            commands::list_catalogs(&ctx, &url).await?;
        }
        Commands::Books {
            catalog,
            show_news,
            show_owned,
            no_reconcile,
        } => {
            let options = CatalogOptions {
                catalog,
                hide_newspapers: ctx.config.hide_newspapers && !show_news,
                hide_already_in_library: ctx.config.hide_already_in_library && !show_owned,
                reconcile: !no_reconcile,
            };
            commands::list_books(&ctx, &url, &options).await?;
        }
        Commands::Download { catalog, uuids } => {
            commands::download_books(&ctx, &url, catalog, &uuids).await?;
        }
        Commands::FixTimestamps { catalog, uuids } => {
            commands::fix_timestamps(&ctx, &url, catalog, &uuids).await?;
        }
        Commands::Urls => {
            commands::list_urls(&ctx);
        }
    }

    Ok(())
}
