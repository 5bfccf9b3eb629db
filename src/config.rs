use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::engine::batch::BatchPolicy;
use crate::error::AppError;

pub const DEFAULT_GENERATOR_URL: &str = "https://image.pollinations.ai";
pub const DEFAULT_IMAGE_SIZE: u32 = 1024;
pub const DEFAULT_OUTPUT_DIR: &str = "logos";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Which batch policy preset to run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PolicyKind {
    /// Two teams in flight, single attempt each
    #[default]
    Window,
    /// One team at a time, three attempts with linear backoff
    Sequential,
}

impl PolicyKind {
    pub fn policy(self) -> BatchPolicy {
        match self {
            PolicyKind::Window => BatchPolicy::window(),
            PolicyKind::Sequential => BatchPolicy::sequential_with_retry(),
        }
    }
}

impl FromStr for PolicyKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "window" => Ok(PolicyKind::Window),
            "sequential" => Ok(PolicyKind::Sequential),
            other => Err(AppError::Validation(format!("unknown batch policy '{other}'"))),
        }
    }
}

/// Runtime configuration, resolved from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub generator_url: String,
    pub image_size: u32,
    pub league_import_url: Option<String>,
    pub output_dir: PathBuf,
    /// `None` disables the request timeout.
    pub http_timeout: Option<Duration>,
    pub policy: PolicyKind,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generator_url: DEFAULT_GENERATOR_URL.into(),
            image_size: DEFAULT_IMAGE_SIZE,
            league_import_url: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            http_timeout: Some(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)),
            policy: PolicyKind::default(),
        }
    }
}

/// Return the first non-empty value from the given environment variable keys.
pub fn env_var_first_nonempty(keys: &[&str]) -> Option<String> {
    for key in keys {
        if let Ok(value) = std::env::var(key) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }
    None
}

impl AppConfig {
    /// Load `.env` (if present) into the process environment, then read config.
    pub fn load() -> Result<Self, AppError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env"),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env"),
        }
        Self::from_lookup(|key| env_var_first_nonempty(&[key]))
    }

    /// Build config from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut cfg = Self::default();

        if let Some(url) = lookup("LOGO_GENERATOR_URL") {
            cfg.generator_url = url;
        }
        if let Some(size) = lookup("LOGO_IMAGE_SIZE") {
            cfg.image_size = size
                .parse::<u32>()
                .ok()
                .filter(|s| (64..=4096).contains(s))
                .ok_or_else(|| AppError::Validation(format!("LOGO_IMAGE_SIZE must be 64..=4096, got '{size}'")))?;
        }
        cfg.league_import_url = lookup("LEAGUE_IMPORT_URL");
        if let Some(dir) = lookup("LOGO_OUTPUT_DIR") {
            cfg.output_dir = PathBuf::from(dir);
        }
        if let Some(secs) = lookup("LOGO_HTTP_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .map_err(|_| AppError::Validation(format!("LOGO_HTTP_TIMEOUT_SECS must be a number, got '{secs}'")))?;
            cfg.http_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(policy) = lookup("LOGO_BATCH_POLICY") {
            cfg.policy = policy.parse()?;
        }

        Ok(cfg)
    }
}
