//! Configuration file loading.
use std::{env, fs, path::Path};

use schip8::prelude::*;

use crate::error::AppError;

/// Environment variable naming a YAML configuration file.
pub const CONF_ENV: &str = "SCHIP8_CONF";

/// Load the VM configuration named by [`CONF_ENV`], or the defaults when it is unset.
pub fn load_conf() -> Result<Chip8Conf, AppError> {
    match env::var_os(CONF_ENV) {
        Some(filepath) => from_file(filepath.as_ref()),
        None => Ok(Chip8Conf::default()),
    }
}

pub fn from_file(filepath: &Path) -> Result<Chip8Conf, AppError> {
    let file = fs::File::open(filepath)?;
    let conf = parse(file)?;
    log::debug!("loaded configuration from {}: {conf:#?}", filepath.display());
    Ok(conf)
}

fn parse(reader: impl std::io::Read) -> Result<Chip8Conf, AppError> {
    Ok(serde_yaml::from_reader(reader)?)
}
