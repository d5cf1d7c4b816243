use crate::config::toml_config::{CatalogConfig, EngineConfig};
use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "order-chat")]
#[command(about = "Chat with the ordering assistant from the terminal")]
pub struct CliConfig {
    #[arg(long, short, help = "TOML engine configuration")]
    pub config: Option<String>,

    #[arg(long, help = "CSV menu (id,name,category,price,available); overrides [catalog]")]
    pub catalog: Option<String>,

    #[arg(long, help = "Resume an existing session id")]
    pub session: Option<String>,

    #[arg(long, help = "Table number sent with every turn")]
    pub table: Option<String>,

    #[arg(long, help = "Print the full JSON response for each turn")]
    pub json: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl CliConfig {
    /// Engine configuration from `--config` (defaults when absent) with `--catalog` applied.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let mut config = match &self.config {
            Some(path) => EngineConfig::from_file(path)?,
            None => EngineConfig::default(),
        };

        if let Some(path) = &self.catalog {
            config.catalog = Some(CatalogConfig {
                path: Some(path.clone()),
                endpoint: None,
            });
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        if let Some(path) = &self.catalog {
            validate_path("catalog", path)?;
        }
        if let Some(session) = &self.session {
            validate_non_empty_string("session", session)?;
        }
        Ok(())
    }
}
