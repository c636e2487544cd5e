//! Runtime initialization and setup

use crate::app::{config::AppConfig, logging::init_logging};
use crate::config::{Config, ConfigLoader};
use crate::error::BlockflowError;
use anyhow::Result;

/// Load runtime settings, then start logging at the resulting level
pub fn initialize_app(app: &AppConfig) -> Result<Config> {
    let config = load_config(app)?;
    init_logging(app, &config.log_level);
    Ok(config)
}

pub fn load_config(app: &AppConfig) -> Result<Config> {
    let mut loader = ConfigLoader::new().with_working_dir(&app.working_dir);
    if let Some(path) = &app.config_file {
        loader = loader.with_file(path);
    }
    Ok(loader.load().map_err(BlockflowError::from)?)
}
