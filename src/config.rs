use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::Path;

/// Default number of concurrent probe workers
pub const DEFAULT_PROBE_WORKERS: usize = 20;

/// Default DNS suffix appended to instance hostnames for resolution checks
pub const DEFAULT_DNS_SUFFIX: &str = ".example.com";

pub struct HyperviewConfig {
    /// Path to the directory holding hyperview's data
    pub data_dir: String,

    /// Path to the instance/hypervisor inventory database (SQLite)
    pub inventory_db: String,

    /// Path to the tenant/project directory database (SQLite)
    pub directory_db: String,

    /// DNS suffix appended to hostnames for forward/reverse checks
    pub dns_suffix: String,

    /// Number of concurrent workers used for network probing
    pub probe_workers: usize,
}

const EMPTY_CONFIG: &str = r#"### hyperview configuration file

### directory for data used by hyperview
# data_dir = "~/.hyperview"

### SQLite database paths
# inventory_db = "~/.hyperview/inventory.sqlite3"
# directory_db = "~/.hyperview/directory.sqlite3"

### DNS suffix appended to instance hostnames for resolution checks
# dns_suffix = ".example.com"

### number of concurrent probe workers
# probe_workers = 20
"#;

impl Default for HyperviewConfig {
    fn default() -> Self {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| ".".to_string());
        let data_dir = format!("{}/.hyperview", home_dir);

        Self {
            inventory_db: format!("{}/inventory.sqlite3", data_dir),
            directory_db: format!("{}/directory.sqlite3", data_dir),
            dns_suffix: DEFAULT_DNS_SUFFIX.to_string(),
            probe_workers: DEFAULT_PROBE_WORKERS,
            data_dir,
        }
    }
}

impl HyperviewConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<HyperviewConfig> {
        let mut builder = Config::builder();

        // By default use $HOME/.hyperview/hyperview.toml as the configuration file path
        let home_dir = dirs::home_dir()
            .ok_or_else(|| anyhow!("Could not find home directory"))?
            .to_str()
            .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
            .to_owned();

        let hyperview_dir = format!("{}/.hyperview", home_dir.as_str());

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                std::fs::create_dir_all(hyperview_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create hyperview directory: {}", e))?;
                let p = format!("{}/hyperview.toml", hyperview_dir.as_str());
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of HYPERVIEW)
        // E.g., `HYPERVIEW_DNS_SUFFIX=.corp.example.net hyperview` overrides the suffix
        builder = builder.add_source(config::Environment::with_prefix("HYPERVIEW"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let config = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        // Parse data directory
        let data_dir = match config.get("data_dir") {
            Some(p) => p.trim_end_matches('/').to_string(),
            None => {
                let dir = format!("{}/.hyperview", home_dir.as_str());
                std::fs::create_dir_all(dir.as_str())
                    .map_err(|e| anyhow!("Unable to create data directory: {}", e))?;
                dir
            }
        };

        let inventory_db = config
            .get("inventory_db")
            .cloned()
            .unwrap_or_else(|| format!("{}/inventory.sqlite3", data_dir));

        let directory_db = config
            .get("directory_db")
            .cloned()
            .unwrap_or_else(|| format!("{}/directory.sqlite3", data_dir));

        let dns_suffix = config
            .get("dns_suffix")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DNS_SUFFIX.to_string());

        let probe_workers = config
            .get("probe_workers")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PROBE_WORKERS);

        Ok(HyperviewConfig {
            data_dir,
            inventory_db,
            directory_db,
            dns_suffix,
            probe_workers,
        })
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let lines = vec![
            format!("Data Directory:   {}", self.data_dir),
            format!("Inventory DB:     {}", self.inventory_db),
            format!("Directory DB:     {}", self.directory_db),
            format!("DNS Suffix:       {}", self.dns_suffix),
            format!("Probe Workers:    {}", self.probe_workers),
        ];
        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.hyperview/hyperview.toml", home_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HyperviewConfig::default();
        assert_eq!(config.dns_suffix, ".example.com");
        assert_eq!(config.probe_workers, 20);
        assert!(config.inventory_db.ends_with("/inventory.sqlite3"));
        assert!(config.directory_db.ends_with("/directory.sqlite3"));
    }

    #[test]
    fn test_summary_mentions_paths() {
        let config = HyperviewConfig {
            data_dir: "/test/dir".to_string(),
            inventory_db: "/test/dir/inventory.sqlite3".to_string(),
            directory_db: "/test/dir/directory.sqlite3".to_string(),
            dns_suffix: ".corp.example.net".to_string(),
            probe_workers: 8,
        };

        let summary = config.summary();
        assert!(summary.contains("/test/dir/inventory.sqlite3"));
        assert!(summary.contains(".corp.example.net"));
        assert!(summary.contains('8'));
    }
}
