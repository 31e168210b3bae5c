use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub images: ImageHostConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Where documents live. An empty `data_dir` keeps every collection in memory.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { data_dir: default_data_dir() }
    }
}

/// Image host account used for uploads (and, on paid plans, deletions).
#[derive(Debug, Clone, Deserialize)]
pub struct ImageHostConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default)]
    pub cloud_name: String,
    #[serde(default)]
    pub upload_preset: String,
    #[serde(default = "default_folder")]
    pub default_folder: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// The free plan rejects API deletions; keep this off unless the account allows it.
    #[serde(default)]
    pub deletion_enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_secret: Option<String>,
}

impl Default for ImageHostConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            cloud_name: String::new(),
            upload_preset: String::new(),
            default_folder: default_folder(),
            timeout_secs: default_timeout(),
            deletion_enabled: false,
            api_key: None,
            api_secret: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Delete a vehicle's service records together with the vehicle.
    #[serde(default)]
    pub cascade_service_records: bool,
    /// Best-effort delete images already uploaded when a later step of the same mutation fails.
    #[serde(default = "default_true")]
    pub rollback_partial_uploads: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { cascade_service_records: false, rollback_partial_uploads: true }
    }
}

fn default_data_dir() -> String { "data".to_string() }
fn default_api_base_url() -> String { "https://api.cloudinary.com/v1_1".to_string() }
fn default_folder() -> String { "car-service-tracker".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_true() -> bool { true }

pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_from_file(&path)
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load the TOML file and fill the gaps from the process environment.
    pub fn load_and_validate() -> Result<Self> {
        let mut cfg = load_default()?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Defaults plus environment, for runs without a config file.
    pub fn from_env() -> Result<Self> {
        let mut cfg = AppConfig::default();
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.normalize_with(&|key| std::env::var(key).ok());
        self.validate()
    }

    /// Fill empty values from `lookup` (environment variables in production).
    pub fn normalize_with(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        self.store.normalize_with(lookup);
        self.images.normalize_with(lookup);
    }

    pub fn validate(&self) -> Result<()> {
        self.images.validate()
    }
}

impl StoreConfig {
    fn normalize_with(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("FIXO_DATA_DIR") {
            self.data_dir = dir;
        }
        self.data_dir = self.data_dir.trim().to_string();
    }

    /// `None` when the store should stay in memory.
    pub fn data_dir(&self) -> Option<&str> {
        if self.data_dir.is_empty() { None } else { Some(&self.data_dir) }
    }
}

impl ImageHostConfig {
    fn normalize_with(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        fill(&mut self.cloud_name, lookup("CLOUDINARY_CLOUD_NAME"));
        fill(&mut self.upload_preset, lookup("CLOUDINARY_UPLOAD_PRESET"));
        if self.api_key.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.api_key = lookup("CLOUDINARY_API_KEY");
        }
        if self.api_secret.as_deref().map_or(true, |k| k.trim().is_empty()) {
            self.api_secret = lookup("CLOUDINARY_API_SECRET");
        }
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
        if self.default_folder.trim().is_empty() {
            self.default_folder = default_folder();
        }
        if self.timeout_secs == 0 {
            self.timeout_secs = default_timeout();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let lower = self.api_base_url.to_lowercase();
        if !(lower.starts_with("http://") || lower.starts_with("https://")) {
            return Err(anyhow!("images.api_base_url must start with http:// or https://"));
        }
        if self.cloud_name.trim().is_empty() {
            return Err(anyhow!("images.cloud_name is empty; set it in config.toml or CLOUDINARY_CLOUD_NAME"));
        }
        if self.upload_preset.trim().is_empty() {
            return Err(anyhow!("images.upload_preset is empty; set it in config.toml or CLOUDINARY_UPLOAD_PRESET"));
        }
        if self.deletion_enabled && (self.api_key.is_none() || self.api_secret.is_none()) {
            return Err(anyhow!("images.deletion_enabled requires api_key and api_secret"));
        }
        Ok(())
    }

    pub fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.api_base_url, self.cloud_name)
    }

    pub fn destroy_url(&self) -> String {
        format!("{}/{}/image/destroy", self.api_base_url, self.cloud_name)
    }
}

fn fill(target: &mut String, value: Option<String>) {
    if target.trim().is_empty() {
        if let Some(v) = value {
            *target = v.trim().to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_sections_with_defaults() {
        let cfg = parse(
            r#"
            [images]
            cloud_name = "demo"
            upload_preset = "tracker"

            [policy]
            cascade_service_records = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.store.data_dir, "data");
        assert_eq!(cfg.images.default_folder, "car-service-tracker");
        assert_eq!(cfg.images.timeout_secs, 30);
        assert!(!cfg.images.deletion_enabled);
        assert!(cfg.policy.cascade_service_records);
        assert!(cfg.policy.rollback_partial_uploads);
        assert_eq!(cfg.images.upload_url(), "https://api.cloudinary.com/v1_1/demo/image/upload");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn environment_fills_missing_credentials() {
        let mut cfg = AppConfig::default();
        cfg.normalize_with(&env(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_UPLOAD_PRESET", "tracker"),
            ("FIXO_DATA_DIR", "/tmp/fixo"),
        ]));
        assert_eq!(cfg.images.cloud_name, "demo");
        assert_eq!(cfg.store.data_dir(), Some("/tmp/fixo"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn file_values_win_over_environment() {
        let mut cfg = parse("[images]\ncloud_name = \"from-file\"\nupload_preset = \"p\"").unwrap();
        cfg.normalize_with(&env(&[("CLOUDINARY_CLOUD_NAME", "from-env")]));
        assert_eq!(cfg.images.cloud_name, "from-file");
    }

    #[test]
    fn rejects_incomplete_image_host() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_err());

        let mut cfg = parse("[images]\ncloud_name = \"demo\"\nupload_preset = \"p\"\ndeletion_enabled = true").unwrap();
        cfg.normalize_with(&env(&[]));
        assert!(cfg.validate().is_err());

        let mut cfg = parse("[images]\napi_base_url = \"ftp://x\"\ncloud_name = \"demo\"\nupload_preset = \"p\"").unwrap();
        cfg.normalize_with(&env(&[]));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_data_dir_means_memory() {
        let mut cfg = parse("[store]\ndata_dir = \"  \"\n").unwrap();
        cfg.normalize_with(&env(&[]));
        assert_eq!(cfg.store.data_dir(), None);
    }

    #[test]
    fn load_from_missing_file_fails() {
        let path = std::env::temp_dir().join(format!("fixo_cfg_{}.toml", uuid::Uuid::new_v4()));
        assert!(load_from_file(&path.to_string_lossy()).is_err());
    }
}
