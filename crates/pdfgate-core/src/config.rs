//! Configuration module
//!
//! Settings are read once at startup into an immutable [`Config`] and handed to each
//! component as constructor parameters.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::DEFAULT_QUEUE_NAME;
use crate::models::SourceFormat;
use crate::storage_types::StorageBackend;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379/0";
const DEFAULT_JOB_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;
const DEFAULT_MAX_QUEUE_DEPTH: usize = 1000;
const DEFAULT_SYNC_MAX_HTML_BYTES: usize = 1024 * 1024;
const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 15;
const DEFAULT_WORKER_CONCURRENCY: usize = 2;
const DEFAULT_DEQUEUE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CONVERT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_LEASE_GRACE_SECS: u64 = 30;
const DEFAULT_REAP_INTERVAL_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Submission limits and TTL.
#[derive(Clone, Debug)]
pub struct JobLimits {
    pub max_file_size: usize,
    pub job_ttl: Duration,
    /// Submissions are refused once this many items are waiting. 0 = unbounded.
    pub max_queue_depth: usize,
    pub allowed_formats: Vec<SourceFormat>,
    pub sync_max_html_bytes: usize,
    pub sync_timeout: Duration,
}

impl JobLimits {
    pub fn is_allowed(&self, format: SourceFormat) -> bool {
        self.allowed_formats.contains(&format)
    }
}

impl Default for JobLimits {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            job_ttl: Duration::from_secs(DEFAULT_JOB_TTL_SECS),
            max_queue_depth: DEFAULT_MAX_QUEUE_DEPTH,
            allowed_formats: SourceFormat::ALL.to_vec(),
            sync_max_html_bytes: DEFAULT_SYNC_MAX_HTML_BYTES,
            sync_timeout: Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECS),
        }
    }
}

/// Worker pool, lease, and sweeper settings.
#[derive(Clone, Debug)]
pub struct WorkerSettings {
    /// Run the pool inside the API process.
    pub embedded: bool,
    pub concurrency: usize,
    pub dequeue_timeout: Duration,
    pub convert_timeout: Duration,
    pub lease_grace: Duration,
    /// Interval between lease reaper runs. Zero disables the reaper.
    pub reap_interval: Duration,
    pub max_attempts: u32,
    /// Interval between expiry sweeps. Zero disables the sweeper.
    pub sweep_interval: Duration,
}

impl WorkerSettings {
    /// How long a `processing` record stays owned before the reaper may take it back.
    pub fn lease(&self) -> Duration {
        self.convert_timeout + self.lease_grace
    }
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            embedded: true,
            concurrency: DEFAULT_WORKER_CONCURRENCY,
            dequeue_timeout: Duration::from_secs(DEFAULT_DEQUEUE_TIMEOUT_SECS),
            convert_timeout: Duration::from_secs(DEFAULT_CONVERT_TIMEOUT_SECS),
            lease_grace: Duration::from_secs(DEFAULT_LEASE_GRACE_SECS),
            reap_interval: Duration::from_secs(DEFAULT_REAP_INTERVAL_SECS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
        }
    }
}

/// External rendering binaries.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub weasyprint_path: String,
    pub libreoffice_path: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weasyprint_path: "weasyprint".to_string(),
            libreoffice_path: "soffice".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub storage_backend: StorageBackend,
    pub redis_url: String,
    pub queue_name: String,
    pub log_format: String,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    pub limits: JobLimits,
    pub worker: WorkerSettings,
    pub engines: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            environment: "development".to_string(),
            storage_backend: StorageBackend::Memory,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            log_format: "pretty".to_string(),
            cors_origins: vec!["*".to_string()],
            limits: JobLimits::default(),
            worker: WorkerSettings::default(),
            engines: EngineConfig::default(),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring unparseable setting, using default");
            default
        }
    }
}

fn secs_or(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Duration {
    Duration::from_secs(parse_or(lookup, key, default))
}

fn parse_formats(raw: &str) -> Result<Vec<SourceFormat>, anyhow::Error> {
    let mut formats = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let format: SourceFormat = part.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

impl Config {
    /// Load configuration from the process environment (and `.env`, when present).
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, anyhow::Error> {
        let storage_backend = match lookup("STORAGE_BACKEND") {
            Some(raw) => raw.parse()?,
            None => StorageBackend::Memory,
        };

        let allowed_formats = match lookup("ALLOWED_FORMATS") {
            Some(raw) => parse_formats(&raw)?,
            None => SourceFormat::ALL.to_vec(),
        };

        let config = Config {
            server_port: parse_or(&lookup, "PORT", DEFAULT_PORT),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            storage_backend,
            redis_url: lookup("REDIS_URL").unwrap_or_else(|| DEFAULT_REDIS_URL.to_string()),
            queue_name: lookup("QUEUE_NAME").unwrap_or_else(|| DEFAULT_QUEUE_NAME.to_string()),
            log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "pretty".to_string()),
            cors_origins: lookup("CORS_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["*".to_string()]),
            limits: JobLimits {
                max_file_size: parse_or(&lookup, "MAX_FILE_SIZE", DEFAULT_MAX_FILE_SIZE),
                job_ttl: secs_or(&lookup, "JOB_TTL_SECONDS", DEFAULT_JOB_TTL_SECS),
                max_queue_depth: parse_or(&lookup, "MAX_QUEUE_DEPTH", DEFAULT_MAX_QUEUE_DEPTH),
                allowed_formats,
                sync_max_html_bytes: parse_or(
                    &lookup,
                    "SYNC_MAX_HTML_BYTES",
                    DEFAULT_SYNC_MAX_HTML_BYTES,
                ),
                sync_timeout: secs_or(&lookup, "SYNC_TIMEOUT_SECONDS", DEFAULT_SYNC_TIMEOUT_SECS),
            },
            worker: WorkerSettings {
                embedded: parse_or(&lookup, "WORKER_EMBEDDED", true),
                concurrency: parse_or(&lookup, "WORKER_CONCURRENCY", DEFAULT_WORKER_CONCURRENCY),
                dequeue_timeout: secs_or(
                    &lookup,
                    "WORKER_DEQUEUE_TIMEOUT_SECONDS",
                    DEFAULT_DEQUEUE_TIMEOUT_SECS,
                ),
                convert_timeout: secs_or(
                    &lookup,
                    "CONVERT_TIMEOUT_SECONDS",
                    DEFAULT_CONVERT_TIMEOUT_SECS,
                ),
                lease_grace: secs_or(&lookup, "LEASE_GRACE_SECONDS", DEFAULT_LEASE_GRACE_SECS),
                reap_interval: secs_or(
                    &lookup,
                    "REAP_INTERVAL_SECONDS",
                    DEFAULT_REAP_INTERVAL_SECS,
                ),
                max_attempts: parse_or(&lookup, "MAX_ATTEMPTS", DEFAULT_MAX_ATTEMPTS),
                sweep_interval: secs_or(
                    &lookup,
                    "EXPIRY_SWEEP_INTERVAL_SECONDS",
                    DEFAULT_SWEEP_INTERVAL_SECS,
                ),
            },
            engines: EngineConfig {
                weasyprint_path: lookup("WEASYPRINT_PATH")
                    .unwrap_or_else(|| "weasyprint".to_string()),
                libreoffice_path: lookup("LIBREOFFICE_PATH")
                    .unwrap_or_else(|| "soffice".to_string()),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.limits.job_ttl.is_zero() {
            return Err(anyhow::anyhow!("JOB_TTL_SECONDS must be greater than 0"));
        }

        if self.limits.max_file_size == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE must be greater than 0"));
        }

        if self.limits.allowed_formats.is_empty() {
            return Err(anyhow::anyhow!(
                "ALLOWED_FORMATS must list at least one format"
            ));
        }

        if self.worker.concurrency == 0 {
            return Err(anyhow::anyhow!("WORKER_CONCURRENCY must be greater than 0"));
        }

        if self.worker.convert_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "CONVERT_TIMEOUT_SECONDS must be greater than 0"
            ));
        }

        if self.limits.sync_timeout.is_zero() {
            return Err(anyhow::anyhow!("SYNC_TIMEOUT_SECONDS must be greater than 0"));
        }

        // A zero timeout blocks forever on Redis and spins on the memory queue.
        if self.worker.dequeue_timeout.is_zero() {
            return Err(anyhow::anyhow!(
                "WORKER_DEQUEUE_TIMEOUT_SECONDS must be greater than 0"
            ));
        }

        if self.worker.max_attempts == 0 {
            return Err(anyhow::anyhow!("MAX_ATTEMPTS must be greater than 0"));
        }

        if self.queue_name.trim().is_empty() {
            return Err(anyhow::anyhow!("QUEUE_NAME must not be empty"));
        }

        match self.storage_backend {
            StorageBackend::Redis => {
                if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://")
                {
                    return Err(anyhow::anyhow!(
                        "REDIS_URL must be a redis:// or rediss:// URL when using the redis backend"
                    ));
                }
            }
            StorageBackend::Memory => {
                // Nothing outside this process can see an in-memory queue.
                if !self.worker.embedded {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=memory requires WORKER_EMBEDDED=true"
                    ));
                }
            }
        }

        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn uses_json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}
