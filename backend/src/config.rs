use clap::Parser;
use std::path::PathBuf;

/// Service configuration. Every flag can also be set through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "melody-backend", version, about = "Melody ownership proofs and registry")]
pub struct Config {
    /// Listen address.
    #[arg(long, env = "BACKEND_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: String,

    /// Local state (SQLite database, default key location).
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory holding `melody_pk.bin` and `melody_vk.bin`. Defaults to `<data_dir>/keys`.
    #[arg(long, env = "KEYS_DIR")]
    pub keys_dir: Option<PathBuf>,

    /// Shared secret for the `X-API-KEY` header on write routes.
    // In production, this should be a strong secret from the environment.
    #[arg(long, env = "API_KEY", default_value = "dev-secret-key", hide_env_values = true)]
    pub api_key: String,

    /// Run a local single-party setup when no key artifacts are found. Development only.
    #[arg(long, env = "DEV_SETUP")]
    pub dev_setup: bool,
}

impl Config {
    pub fn keys_dir(&self) -> PathBuf {
        self.keys_dir.clone().unwrap_or_else(|| self.data_dir.join("keys"))
    }

    pub fn db_url(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.data_dir.join("melodies.sqlite").to_string_lossy())
    }
}
