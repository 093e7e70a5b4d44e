pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "opds-reader")]
#[command(about = "Browse OPDS catalogs and match them against a local library", long_about = None)]
pub struct Cli {
    /// OPDS root URL (default: most recently used)
    #[arg(short, long, global = true)]
    pub url: Option<String>,

    /// Path of the local library database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Path of the configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the catalogs offered by the root feed
    Catalogs,
    /// Download a catalog and list its books
    Books {
        /// Catalog title (default: the first one)
        #[arg(short, long)]
        catalog: Option<String>,

        /// Show entries tagged "News"
        #[arg(long)]
        show_news: bool,

        /// Show books already in the local library
        #[arg(long)]
        show_owned: bool,

        /// Keep the timestamps from the feed, even on calibre servers
        #[arg(long)]
        no_reconcile: bool,
    },
    /// Hand books to the system opener and record them locally
    Download {
        /// Catalog title (default: the first one)
        #[arg(short, long)]
        catalog: Option<String>,

        /// Uuids of the books to download
        #[arg(required = true)]
        uuids: Vec<String>,
    },
    /// Copy catalog timestamps onto identical local books
    FixTimestamps {
        /// Catalog title (default: the first one)
        #[arg(short, long)]
        catalog: Option<String>,

        /// Uuids of the catalog books
        #[arg(required = true)]
        uuids: Vec<String>,
    },
    /// Show the catalog URL history
    Urls,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_books_flags() {
        let cli = Cli::parse_from([
            "opds-reader",
            "--url",
            "http://shelf/opds",
            "books",
            "--catalog",
            "By Newest",
            "--show-news",
        ]);

        assert_eq!(cli.url.as_deref(), Some("http://shelf/opds"));
        match cli.command {
            Commands::Books {
                catalog,
                show_news,
                show_owned,
                no_reconcile,
            } => {
                assert_eq!(catalog.as_deref(), Some("By Newest"));
                assert!(show_news);
                assert!(!show_owned);
                assert!(!no_reconcile);
            }
            _ => panic!("expected books command"),
        }
    }

    #[test]
    fn test_download_requires_uuid() {
        assert!(Cli::try_parse_from(["opds-reader", "download"]).is_err());

        let cli = Cli::try_parse_from(["opds-reader", "fix-timestamps", "a", "b"]).unwrap();
        assert!(matches!(cli.command, Commands::FixTimestamps { ref uuids, .. } if uuids.len() == 2));
    }
}
