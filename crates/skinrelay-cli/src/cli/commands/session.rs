//! Config loading and service lifetime for commands that touch the cache.

use std::ops::Deref;
use std::path::Path;

use skinrelay_core::{load_config, SkinConfig, SkinService, DEFAULT_CONFIG_FILE};
use tracing::debug;

use super::super::args::GlobalArgs;

/// `--config`, else `./skinrelay.yaml` when present, else built-in defaults.
/// Environment overrides apply in every case.
pub fn load(global: &GlobalArgs) -> anyhow::Result<SkinConfig> {
    let config = match &global.config {
        Some(path) => load_config(path)?,
        None => {
            let path = Path::new(DEFAULT_CONFIG_FILE);
            if path.exists() {
                load_config(path)?
            } else {
                debug!("no {} in working directory, using defaults", DEFAULT_CONFIG_FILE);
                SkinConfig::default()
            }
        }
    };
    Ok(config.with_env_overrides())
}

/// A service that stops its region threads when the command is done.
pub struct Session {
    service: SkinService,
}

impl Session {
    pub fn open(global: &GlobalArgs) -> anyhow::Result<Self> {
        let config = load(global)?;
        let service = SkinService::builder(config).build()?;
        Ok(Self { service })
    }
}

impl Deref for Session {
    type Target = SkinService;

    fn deref(&self) -> &SkinService {
        &self.service
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.service.shutdown();
    }
}
