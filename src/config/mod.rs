mod device;
mod types;

pub use device::{nearest, parse_bitrate};
pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./tivoshare.toml",
        "~/.config/tivoshare/config.toml",
        "/etc/tivoshare/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    for (name, share) in &config.shares {
        if share.path.as_os_str().is_empty() {
            anyhow::bail!("Share '{}' has no path", name);
        }
        if !share.path.exists() {
            tracing::warn!("Share path does not exist: {:?}", share.path);
        }
    }

    let mut bitrates = vec![
        ("server.audio_br", config.server.audio_br.as_str()),
        ("server.video_br", config.server.video_br.as_str()),
        ("server.max_video_br", config.server.max_video_br.as_str()),
    ];
    for tivo in config.tivos.values() {
        if let Some(br) = tivo.audio_br.as_deref() {
            bitrates.push(("tivos.audio_br", br));
        }
        if let Some(br) = tivo.video_br.as_deref() {
            bitrates.push(("tivos.video_br", br));
        }
    }
    for (key, value) in bitrates {
        if parse_bitrate(value).is_none() {
            anyhow::bail!("Invalid bitrate for {}: {:?}", key, value);
        }
    }

    Ok(())
}
