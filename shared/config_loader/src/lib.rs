//! # Config Loader
//!
//! Locates configuration files on disk and loads them, either as raw text or
//! deserialized into any `serde` type.
//!
//! ```no_run
//! use config_loader::{find_config_file, load_config_file, load_json};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Ports {
//!     rtp: u16,
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let path = find_config_file("rtp.json")?;
//!     let raw = load_config_file(&path)?;
//!     let ports: Ports = load_json(&path)?;
//!     println!("{} bytes, rtp port {}", raw.len(), ports.rtp);
//!     Ok(())
//! }
//! ```

pub mod error;

pub use error::{ConfigError, Result};

use serde::de::DeserializeOwned;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the search for a configuration file.
pub const CONFIG_PATH_ENV: &str = "RTP_CONFIG_PATH";

/// Loads the content of a configuration file.
///
/// The content is returned untouched; parsing is up to the caller.
pub fn load_config_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Ok(fs::read_to_string(path)?)
}

/// Looks for a configuration file in the usual places.
///
/// Search order:
/// 1. `RTP_CONFIG_PATH` environment variable (if set and the path exists)
/// 2. `./config/{filename}`
/// 3. `./{filename}`
pub fn find_config_file(filename: &str) -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let path_buf = PathBuf::from(&path);
        if path_buf.exists() {
            return Ok(path_buf);
        }
    }

    let config_dir = PathBuf::from("./config").join(filename);
    if config_dir.exists() {
        return Ok(config_dir);
    }

    let current_dir = PathBuf::from("./").join(filename);
    if current_dir.exists() {
        return Ok(current_dir);
    }

    Err(ConfigError::FileNotFound(format!(
        "'{filename}' not found. Searched: {CONFIG_PATH_ENV} env var, ./config/{filename}, ./{filename}"
    )))
}

/// Finds and loads a configuration file in one step.
pub fn find_and_load(filename: &str) -> Result<String> {
    let path = find_config_file(filename)?;
    load_config_file(path)
}

/// Loads a JSON file and deserializes it into `T`.
///
/// # Errors
///
/// `FileNotFound`/`ReadError` for I/O problems, `ParseError` if the JSON
/// doesn't match `T`.
pub fn load_json<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let content = load_config_file(path)?;
    Ok(serde_json::from_str(&content)?)
}
