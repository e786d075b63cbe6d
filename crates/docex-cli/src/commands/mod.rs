//! CLI subcommands.

pub mod batch;
pub mod config;
pub mod formats;
pub mod process;

use std::path::{Path, PathBuf};

use clap::Args;
use tracing::debug;

use docex_core::DocexConfig;
use docex_llm::Provider;

/// LLM overrides shared by the processing commands.
#[derive(Args, Debug, Default)]
pub struct LlmArgs {
    /// LLM provider (ollama or groq)
    #[arg(long)]
    provider: Option<Provider>,

    /// Model name
    #[arg(long)]
    model: Option<String>,

    /// Provider base URL
    #[arg(long)]
    base_url: Option<String>,

    /// API key for hosted providers
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

impl LlmArgs {
    fn apply(&self, config: &mut DocexConfig) {
        if let Some(provider) = self.provider {
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.llm.base_url = Some(base_url.clone());
        }
        if let Some(api_key) = &self.api_key {
            config.llm.api_key = Some(api_key.clone());
        }
    }
}

/// User configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docex")
        .join("config.json")
}

/// Load configuration from `-c`, else the user config file, else defaults,
/// then apply the LLM overrides.
pub fn load_config(config_path: Option<&str>, llm: &LlmArgs) -> anyhow::Result<DocexConfig> {
    let default_path = default_config_path();

    let mut config = match config_path {
        Some(path) => DocexConfig::from_file(Path::new(path))?,
        None if default_path.exists() => {
            debug!("Using config file {}", default_path.display());
            DocexConfig::from_file(&default_path)?
        }
        None => DocexConfig::default(),
    };

    llm.apply(&mut config);
    config.validate()?;
    Ok(config)
}
