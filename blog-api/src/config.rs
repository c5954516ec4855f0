use serde::Deserialize;

use blog_shared::clients::email::RESEND_API_URL;
use blog_shared::clients::storage::StorageSettings;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_env")]
    pub env: String,

    // Required secrets
    pub database_url: String,
    pub jwt_secret: String,
    pub otp_secret: String,
    pub resend_api_key: String,
    pub storage_access_key: String,
    pub storage_secret_key: String,

    #[serde(default = "default_db_pool_size")]
    pub db_pool_size: u32,

    // Tokens (seconds)
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl: i64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl: i64,

    // Rate limiting
    #[serde(default = "default_api_window")]
    pub api_rate_limit_window_ms: u64,
    #[serde(default = "default_api_max")]
    pub api_rate_limit_max: u64,
    #[serde(default = "default_otp_window")]
    pub otp_rate_limit_window_ms: u64,
    #[serde(default = "default_otp_max")]
    pub otp_rate_limit_max: u64,
    #[serde(default = "default_otp_cooldown")]
    pub otp_cooldown_seconds: u64,

    // OTP
    #[serde(default = "default_otp_expiry")]
    pub otp_expiry_minutes: u64,
    #[serde(default = "default_otp_max_attempts")]
    pub otp_max_attempts: i32,

    // Media ceilings (MB)
    #[serde(default = "default_image_max")]
    pub image_max_size_mb: u64,
    #[serde(default = "default_audio_max")]
    pub audio_max_size_mb: u64,
    #[serde(default = "default_video_max")]
    pub video_max_size_mb: u64,

    // Object storage
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,
    #[serde(default = "default_storage_region")]
    pub storage_region: String,
    #[serde(default = "default_storage_bucket")]
    pub storage_bucket: String,
    #[serde(default = "default_storage_public_url")]
    pub storage_public_url: String,

    // Email
    #[serde(default = "default_email_api_url")]
    pub email_api_url: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Comma separated list of browser origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: String,

    /// Reverse proxies in front of the service whose `X-Forwarded-For`
    /// entries are believed. 0 uses the socket address only.
    #[serde(default = "default_trusted_proxy_hops")]
    pub trusted_proxy_hops: usize,
}

fn default_port() -> u16 { 5000 }
fn default_env() -> String { "development".into() }
fn default_db_pool_size() -> u32 { 10 }
fn default_access_ttl() -> i64 { 900 }
fn default_refresh_ttl() -> i64 { 604_800 }
fn default_api_window() -> u64 { 900_000 }
fn default_api_max() -> u64 { 300 }
fn default_otp_window() -> u64 { 600_000 }
fn default_otp_max() -> u64 { 5 }
fn default_otp_cooldown() -> u64 { 60 }
fn default_otp_expiry() -> u64 { 5 }
fn default_otp_max_attempts() -> i32 { 5 }
fn default_image_max() -> u64 { 5 }
fn default_audio_max() -> u64 { 10 }
fn default_video_max() -> u64 { 50 }
fn default_storage_endpoint() -> String { "http://localhost:9000".into() }
fn default_storage_region() -> String { "us-east-1".into() }
fn default_storage_bucket() -> String { "blog-media".into() }
fn default_storage_public_url() -> String { "http://localhost:9000".into() }
fn default_email_api_url() -> String { RESEND_API_URL.into() }
fn default_from_email() -> String { "onboarding@resend.dev".into() }
fn default_from_name() -> String { "Blog Auth".into() }
fn default_allowed_origins() -> String { "http://localhost:5173,http://localhost:4173".into() }
fn default_trusted_proxy_hops() -> usize { 1 }

fn env_source() -> config::Environment {
    config::Environment::with_prefix("BLOG")
        .prefix_separator("_")
        .separator("__")
}

impl AppConfig {
    /// Load from `BLOG_*` environment variables (e.g. `BLOG_JWT_SECRET`).
    /// Missing secrets abort startup.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(env_source())
    }

    fn load_from(source: config::Environment) -> anyhow::Result<Self> {
        let config = config::Config::builder().add_source(source).build()?;
        Self::from_config(config)
    }

    pub fn from_config(config: config::Config) -> anyhow::Result<Self> {
        let parsed: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let secrets = [
            ("database_url", &self.database_url),
            ("jwt_secret", &self.jwt_secret),
            ("otp_secret", &self.otp_secret),
            ("resend_api_key", &self.resend_api_key),
            ("storage_access_key", &self.storage_access_key),
            ("storage_secret_key", &self.storage_secret_key),
        ];
        let blank: Vec<&str> = secrets
            .iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| *k)
            .collect();
        if !blank.is_empty() {
            anyhow::bail!("missing required settings: {}", blank.join(", "));
        }

        let limits = [
            ("access_token_ttl", self.access_token_ttl.max(0) as u64),
            ("refresh_token_ttl", self.refresh_token_ttl.max(0) as u64),
            ("api_rate_limit_window_ms", self.api_rate_limit_window_ms),
            ("api_rate_limit_max", self.api_rate_limit_max),
            ("otp_rate_limit_window_ms", self.otp_rate_limit_window_ms),
            ("otp_rate_limit_max", self.otp_rate_limit_max),
            ("otp_expiry_minutes", self.otp_expiry_minutes),
            ("otp_max_attempts", self.otp_max_attempts.max(0) as u64),
            ("image_max_size_mb", self.image_max_size_mb),
            ("audio_max_size_mb", self.audio_max_size_mb),
            ("video_max_size_mb", self.video_max_size_mb),
            ("db_pool_size", u64::from(self.db_pool_size)),
        ];
        if let Some((name, _)) = limits.iter().find(|(_, v)| *v == 0) {
            anyhow::bail!("{name} must be greater than zero");
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn storage_settings(&self) -> StorageSettings {
        StorageSettings {
            endpoint: self.storage_endpoint.clone(),
            region: self.storage_region.clone(),
            access_key: self.storage_access_key.clone(),
            secret_key: self.storage_secret_key.clone(),
            bucket: self.storage_bucket.clone(),
            public_url: self.storage_public_url.clone(),
        }
    }

    pub fn allowed_origins(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_secrets() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .set_override("database_url", "postgres://localhost/blog").unwrap()
            .set_override("jwt_secret", "jwt").unwrap()
            .set_override("otp_secret", "otp").unwrap()
            .set_override("resend_api_key", "re_key").unwrap()
            .set_override("storage_access_key", "ak").unwrap()
            .set_override("storage_secret_key", "sk").unwrap()
    }

    #[test]
    fn defaults_fill_tunables() {
        let cfg = AppConfig::from_config(with_secrets().build().unwrap()).unwrap();
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.otp_expiry_minutes, 5);
        assert_eq!(cfg.video_max_size_mb, 50);
        assert_eq!(cfg.allowed_origins(), vec!["http://localhost:5173", "http://localhost:4173"]);
        assert!(!cfg.is_production());
    }

    #[test]
    fn missing_secret_fails() {
        let built = config::Config::builder()
            .set_override("database_url", "postgres://localhost/blog").unwrap()
            .build()
            .unwrap();
        assert!(AppConfig::from_config(built).is_err());
    }

    #[test]
    fn blank_secret_is_named() {
        let built = with_secrets().set_override("jwt_secret", " ").unwrap().build().unwrap();
        let err = AppConfig::from_config(built).unwrap_err().to_string();
        assert!(err.contains("jwt_secret"), "{err}");
    }

    #[test]
    fn zero_limit_rejected() {
        let built = with_secrets().set_override("otp_rate_limit_max", 0).unwrap().build().unwrap();
        let err = AppConfig::from_config(built).unwrap_err().to_string();
        assert!(err.contains("otp_rate_limit_max"), "{err}");
    }

    #[test]
    fn loads_single_underscore_env_names() {
        let vars: config::Map<String, String> = [
            ("BLOG_DATABASE_URL", "postgres://localhost/blog"),
            ("BLOG_JWT_SECRET", "jwt"),
            ("BLOG_OTP_SECRET", "otp"),
            ("BLOG_RESEND_API_KEY", "re_key"),
            ("BLOG_STORAGE_ACCESS_KEY", "ak"),
            ("BLOG_STORAGE_SECRET_KEY", "sk"),
            ("BLOG_ENV", "production"),
            ("BLOG_OTP_EXPIRY_MINUTES", "7"),
            ("OTHER_JWT_SECRET", "ignored"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let cfg = AppConfig::load_from(env_source().source(Some(vars))).unwrap();
        assert_eq!(cfg.database_url, "postgres://localhost/blog");
        assert_eq!(cfg.jwt_secret, "jwt");
        assert_eq!(cfg.otp_expiry_minutes, 7);
        assert!(cfg.is_production());
        assert_eq!(cfg.trusted_proxy_hops, 1);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let built = with_secrets().set_override("otp_cooldown_seconds", "90").unwrap().build().unwrap();
        let cfg = AppConfig::from_config(built).unwrap();
        assert_eq!(cfg.otp_cooldown_seconds, 90);
    }
}
