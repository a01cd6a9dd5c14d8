use crate::db::Db;
use crate::errors::StartupError;
use melody_zk::constants::{PROVING_KEY_FILE, VERIFYING_KEY_FILE};
use melody_zk::error::ArtifactError;
use melody_zk::{KeyMaterial, ZkError};
use rand::rngs::OsRng;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub keys: Arc<KeyMaterial>,
    pub api_key: Arc<str>,
}

impl AppState {
    pub fn new(db: Db, keys: Arc<KeyMaterial>, api_key: &str) -> Self {
        Self {
            db,
            keys,
            api_key: Arc::from(api_key),
        }
    }
}

/// Load the key artifacts from `keys_dir`, once, at startup.
///
/// Missing artifacts are fatal unless `dev_setup` is set, in which case a local
/// single-party setup runs and its artifacts are written to `keys_dir`.
pub async fn load_key_material(keys_dir: PathBuf, dev_setup: bool) -> Result<Arc<KeyMaterial>, StartupError> {
    let keys = tokio::task::spawn_blocking(move || -> Result<KeyMaterial, ZkError> {
        let present = keys_dir.join(PROVING_KEY_FILE).exists() && keys_dir.join(VERIFYING_KEY_FILE).exists();

        if present {
            return KeyMaterial::load_from_dir(&keys_dir);
        }

        if !dev_setup {
            return Err(ArtifactError::Io {
                path: keys_dir.display().to_string(),
                reason: "key artifacts not found (run melody-zk-setup or set DEV_SETUP)".to_string(),
            }
            .into());
        }

        // Trusted setup randomness (development only).
        //
        // IMPORTANT: In production, keys come from an MPC ceremony.
        tracing::warn!(dir = %keys_dir.display(), "DEV_SETUP: generating local groth16 keys; NOT for production");
        let keys = KeyMaterial::generate(&mut OsRng)?;
        keys.write_to_dir(&keys_dir)?;
        Ok(keys)
    })
    .await
    .map_err(|e| StartupError::Io(format!("key loading task failed: {e}")))??;

    Ok(Arc::new(keys))
}
