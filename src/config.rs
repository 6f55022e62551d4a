use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::aggregate::{IncentiveConfig, MonthlySettlement};
use crate::engine::policy::NegativePolicy;
use crate::engine::RateTable;
use crate::report::Preset;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub rates: RateTable,
    #[serde(default)]
    pub incentive: IncentiveConfig,
    #[serde(default)]
    pub settlement: MonthlySettlement,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub presets: Vec<Preset>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default)]
    pub negative_policy: NegativePolicy,
    #[serde(default = "default_true")]
    pub check_fresh_bag_partitions: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub db_path: Option<String>,
    pub negative_policy: Option<NegativePolicy>,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/courier-ledger/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(db_path) = overrides.db_path {
            self.storage.db_path = db_path;
        }
        if let Some(policy) = overrides.negative_policy {
            self.engine.negative_policy = policy;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn default_template() -> String {
        let template = r#"# Unit pay per assigned item
[rates]
route_203d = 850
route_206a = 750
fb_general = 100
fb_standalone = 200

# Period bonus when the weighted fresh-bag rate reaches the threshold
[incentive.general]
threshold = 0.90
bonus_per_delivery = 30

[incentive.standalone]
threshold = 0.70
bonus_per_delivery = 20

[settlement]
start_day = 1

[storage]
db_path = "~/.local/share/courier-ledger/ledger.db"

[engine]
# "preserve" keeps negative derived values, "clamp" floors them at zero
negative_policy = "preserve"
check_fresh_bag_partitions = true

# [[presets]]
# name = "203d-week"
# route = "203D"
# metrics = ["gift_total", "fresh_bag_rate", "income_gift"]
# period = { preset = "week" }
"#;
        template.to_string()
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            negative_policy: NegativePolicy::default(),
            check_fresh_bag_partitions: default_true(),
        }
    }
}

fn default_db_path() -> String {
    "~/.local/share/courier-ledger/ledger.db".to_string()
}

fn default_true() -> bool {
    true
}
