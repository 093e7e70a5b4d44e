use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{OpdsError, Result};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::CatalogFetcher;
use crate::library::sqlite::SqliteLibrary;
use crate::normalizer::Normalizer;

pub struct AppContext {
    pub config: Config,
    /// Where `config` is saved back to. `None` for throwaway contexts.
    pub config_path: Option<PathBuf>,
    pub library: Arc<SqliteLibrary>,
    pub fetcher: Arc<dyn CatalogFetcher>,
    pub normalizer: Normalizer,
}

impl AppContext {
    pub fn new(config_path: Option<PathBuf>, db_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(p) => p,
            None => Config::default_config_path()?,
        };
        let config = Config::load(Some(&config_path))?;

        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };
        let library = Arc::new(SqliteLibrary::new(&db_path)?);
        let fetcher = Self::http_fetcher(&config)?;

        Ok(Self {
            normalizer: Normalizer::with_mode(config.timestamps.mode()),
            config,
            config_path: Some(config_path),
            library,
            fetcher,
        })
    }

    /// Context over an in-memory library with the given fetcher.
    pub fn in_memory(config: Config, fetcher: Arc<dyn CatalogFetcher>) -> Result<Self> {
        Ok(Self {
            normalizer: Normalizer::with_mode(config.timestamps.mode()),
            config,
            config_path: None,
            library: Arc::new(SqliteLibrary::in_memory()?),
            fetcher,
        })
    }

    /// An [`HttpFetcher`] honouring the `[fetch]` settings of `config`.
    pub fn http_fetcher(config: &Config) -> Result<Arc<dyn CatalogFetcher>> {
        let fetcher = HttpFetcher::with_settings(config.fetch.timeout(), config.fetch.retry_policy())
            .map_err(|e| OpdsError::Config(format!("Could not build HTTP client: {}", e)))?;
        Ok(Arc::new(fetcher))
    }

    /// Persists the configuration, if it came from a file.
    pub fn save_config(&self) -> Result<()> {
        if let Some(path) = &self.config_path {
            self.config.save(path)?;
        }
        Ok(())
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| OpdsError::Config("Could not find data directory".into()))?;
        let app_dir = data_dir.join("opds-reader");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("library.db"))
    }
}
