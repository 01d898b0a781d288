//! Path resolution for the persistent store.
//!
//! Everything lives in one small TOML document under the platform
//! config directory:
//!
//! ```text
//! ~/.config/bililink/store.toml   (Linux)
//! ```

use std::path::PathBuf;

use bililink_core::error::{LinkError, Result};

const APP_DIR: &str = "bililink";
const STORE_FILE: &str = "store.toml";

/// Returns the bililink configuration directory.
///
/// # Errors
///
/// `LinkError::Store` when the platform config directory cannot be
/// determined.
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or_else(|| LinkError::store("cannot determine config directory"))
}

/// Returns the path of the persistent store document.
pub fn store_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(STORE_FILE))
}
