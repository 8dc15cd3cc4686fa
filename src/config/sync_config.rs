use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_non_empty_list, validate_path, validate_range, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_VAR: &str = "WARRANTY_SYNC_CONFIG";

/// Manufacturer identifiers of the Dell company records in the reference CMDB.
pub const DEFAULT_MANUFACTURER_IDS: [&str; 5] = [
    "0d0a10d0fc93f800546bb8590e0b58b7", // Dell
    "8edce90a414589409cf642b322142a1e", // Dell
    "ab0c823c989738004675224672b91bcb", // Dell Inc
    "b7e7d7d8c0a8016900a5d7f291acce5c", // Dell Inc.
    "a8f99c90fc93f800546bb8590e0b58fe", // Dell Incorporated
];

pub const DEFAULT_LOOKUP_CAP: usize = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub vendor: VendorConfig,
    pub api: ApiConfig,
    #[serde(default)]
    pub sync: RunConfig,
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorConfig {
    #[serde(default = "default_manufacturer_ids")]
    pub manufacturer_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default = "default_service_tag_param")]
    pub service_tag_param: String,
    #[serde(default = "default_api_key_param")]
    pub api_key_param: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_lookup_cap")]
    pub lookup_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

fn default_manufacturer_ids() -> Vec<String> {
    DEFAULT_MANUFACTURER_IDS.iter().map(|id| id.to_string()).collect()
}

fn default_service_tag_param() -> String {
    "svctags".to_string()
}

fn default_api_key_param() -> String {
    "apikey".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_lookup_cap() -> usize {
    DEFAULT_LOOKUP_CAP
}

fn default_store_path() -> String {
    "./data/warranty.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for VendorConfig {
    fn default() -> Self {
        Self {
            manufacturer_ids: default_manufacturer_ids(),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookup_cap: default_lookup_cap(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

impl SyncConfig {
    /// Reads the file named by `WARRANTY_SYNC_CONFIG`, or falls back to
    /// `WARRANTY_*` environment variables when it is unset.
    pub fn load() -> Result<Self> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path),
            Err(_) => Self::from_env(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SyncError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SyncError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value. Unset variables are left
    /// in place so validation can report them.
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SyncError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Builds the config from `WARRANTY_*` variables supplied by `var`.
    pub fn from_vars<F>(var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            var(name).ok_or_else(|| SyncError::MissingConfigError {
                field: name.to_string(),
            })
        };

        let manufacturer_ids = match var("WARRANTY_VENDOR_IDS") {
            Some(list) => list
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect(),
            None => default_manufacturer_ids(),
        };

        let method = match var("WARRANTY_API_METHOD").as_deref() {
            None => HttpMethod::Get,
            Some(m) if m.eq_ignore_ascii_case("get") => HttpMethod::Get,
            Some(m) if m.eq_ignore_ascii_case("post") => HttpMethod::Post,
            Some(other) => {
                return Err(SyncError::InvalidConfigValueError {
                    field: "WARRANTY_API_METHOD".to_string(),
                    value: other.to_string(),
                    reason: "Expected GET or POST".to_string(),
                })
            }
        };

        let format = match var("WARRANTY_LOG_FORMAT").as_deref() {
            None => LogFormat::Compact,
            Some(f) if f.eq_ignore_ascii_case("compact") => LogFormat::Compact,
            Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
            Some(other) => {
                return Err(SyncError::InvalidConfigValueError {
                    field: "WARRANTY_LOG_FORMAT".to_string(),
                    value: other.to_string(),
                    reason: "Expected compact or json".to_string(),
                })
            }
        };

        Ok(Self {
            vendor: VendorConfig { manufacturer_ids },
            api: ApiConfig {
                endpoint: required("WARRANTY_API_ENDPOINT")?,
                api_key: var("WARRANTY_API_KEY"),
                method,
                service_tag_param: default_service_tag_param(),
                api_key_param: default_api_key_param(),
                timeout_seconds: parse_var(&var, "WARRANTY_API_TIMEOUT_SECONDS", default_timeout_seconds())?,
                headers: HashMap::new(),
            },
            sync: RunConfig {
                lookup_cap: parse_var(&var, "WARRANTY_LOOKUP_CAP", DEFAULT_LOOKUP_CAP)?,
            },
            inventory: InventoryConfig {
                path: required("WARRANTY_INVENTORY_PATH")?,
            },
            store: StoreConfig {
                path: var("WARRANTY_STORE_PATH").unwrap_or_else(default_store_path),
            },
            logging: LoggingConfig {
                level: var("WARRANTY_LOG_LEVEL").unwrap_or_else(default_log_level),
                format,
            },
        })
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_url("api.endpoint", &self.api.endpoint)?;
        validate_non_empty_list("vendor.manufacturer_ids", &self.vendor.manufacturer_ids)?;
        validate_path("inventory.path", &self.inventory.path)?;
        validate_path("store.path", &self.store.path)?;
        validate_range("api.timeout_seconds", self.api.timeout_seconds, 1, 600)?;
        validate_range("sync.lookup_cap", self.sync.lookup_cap, 1, 1_000_000)?;

        if let Some(key) = &self.api.api_key {
            if key.contains("${") {
                return Err(SyncError::ConfigValidationError {
                    field: "api.api_key".to_string(),
                    message: format!("unresolved environment placeholder {}", key),
                });
            }
        }

        Ok(())
    }
}

fn parse_var<F, T>(var: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| SyncError::InvalidConfigValueError {
                field: name.to_string(),
                value: raw.clone(),
                reason: "Expected a non-negative integer".to_string(),
            }),
    }
}

impl Validate for SyncConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
