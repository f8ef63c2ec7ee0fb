// src/utils/env.rs

use log::{info, warn};
use std::path::Path;

/// Load environment variables from the first .env file found. Missing files
/// are fine; the system environment always wins over file values.
pub fn load_env() {
    let env_paths = [".env", ".env.local", "../.env"];
    for path in env_paths.iter() {
        if Path::new(path).exists() {
            match dotenv::from_path(path) {
                Ok(_) => {
                    info!("Loaded environment variables from {}", path);
                    return;
                }
                Err(e) => warn!("Failed to load environment from {}: {}", path, e),
            }
        }
    }
    info!("No .env file found, using environment variables from system");
}
