use std::path::Path;

use tracing::info;

use crate::config::Config;

/// Audit log file for a node, derived from its config path and `--index`
/// alone so logging can start before the config is read.
pub fn audit_log_name(config_path: &str, index: Option<u32>) -> String {
    let path = Path::new(config_path);
    let node = path
        .parent()
        .and_then(|p| p.file_name())
        .or_else(|| path.file_stem())
        .and_then(|s| s.to_str())
        .unwrap_or("node");
    match index {
        Some(index) => format!("logs/audit-{}-{}.log", node, index),
        None => format!("logs/audit-{}.log", node),
    }
}

/// Writes a default config to `path` unless one exists.
pub fn ensure_config(path: &str) -> Result<(), Box<dyn std::error::Error>> {
    if Path::new(path).exists() {
        return Ok(());
    }

    info!("⚠️ No config at {}, writing defaults", path);
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let alias = uuid::Uuid::new_v4().to_string();
    let owner = alias.split('-').next().unwrap_or("concord").to_string();
    let config = Config {
        owner,
        ..Config::default()
    };
    config.save_to_file(path)?;
    info!("✅ Config written for owner {}", config.owner);
    Ok(())
}
