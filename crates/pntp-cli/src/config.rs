//! Runtime configuration: command-line options with environment fallbacks.

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, ValueEnum};
use pntp_store::{AssessmentStore, LocalStore};
use pntp_sync::RemoteStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// JSON files on disk.
    Local,
    /// REST JSON database.
    Remote,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Criteria catalog (JSON).
    #[arg(
        long,
        env = "PNTP_CRITERIA",
        default_value = "catalog/criterios_por_topico.json",
        global = true
    )]
    criteria: PathBuf,

    /// Explanation catalog (JSON). Optional; questions show no help text without it.
    #[arg(
        long,
        env = "PNTP_EXPLANATIONS",
        default_value = "catalog/explicacoes_cartilha.json",
        global = true
    )]
    explanations: PathBuf,

    #[arg(long, env = "PNTP_BACKEND", value_enum, default_value_t = Backend::Local, global = true)]
    backend: Backend,

    /// Directory of the local backend.
    #[arg(long, env = "PNTP_DATA_DIR", default_value = "data/avaliacoes", global = true)]
    data_dir: PathBuf,

    /// Where PDF reports are written.
    #[arg(long, env = "PNTP_REPORTS_DIR", default_value = "relatorios", global = true)]
    reports_dir: PathBuf,

    /// Base URL of the remote database.
    #[arg(long, env = "PNTP_REMOTE_URL", global = true)]
    remote_url: Option<String>,

    /// Access token for the remote database.
    #[arg(long, env = "PNTP_REMOTE_TOKEN", hide_env_values = true, global = true)]
    remote_token: Option<String>,

    /// Fail on a malformed saved assessment instead of starting from an empty one.
    #[arg(long, env = "PNTP_STRICT", global = true)]
    strict: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Local { data_dir: PathBuf },
    Remote { url: String, token: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub criteria_path: PathBuf,
    pub explanations_path: PathBuf,
    pub reports_dir: PathBuf,
    pub strict: bool,
    pub store: StoreConfig,
}

impl ConfigArgs {
    pub fn resolve(self) -> anyhow::Result<AppConfig> {
        let store = match self.backend {
            Backend::Local => StoreConfig::Local {
                data_dir: self.data_dir,
            },
            Backend::Remote => {
                let Some(url) = self.remote_url.filter(|u| !u.trim().is_empty()) else {
                    bail!("the remote backend needs --remote-url (or PNTP_REMOTE_URL)");
                };
                StoreConfig::Remote {
                    url,
                    token: self.remote_token.filter(|t| !t.is_empty()),
                }
            }
        };
        Ok(AppConfig {
            criteria_path: self.criteria,
            explanations_path: self.explanations,
            reports_dir: self.reports_dir,
            strict: self.strict,
            store,
        })
    }
}

impl AppConfig {
    pub fn open_store(&self) -> anyhow::Result<Box<dyn AssessmentStore>> {
        match &self.store {
            StoreConfig::Local { data_dir } => Ok(Box::new(LocalStore::new(data_dir.clone()))),
            StoreConfig::Remote { url, token } => {
                let store = RemoteStore::new(url, token.clone())
                    .with_context(|| format!("configuring remote store at {url}"))?;
                Ok(Box::new(store))
            }
        }
    }
}
