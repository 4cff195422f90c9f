use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use std::{env, str::FromStr, time::Duration};

/// Which `BlobStore` implementation backs the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// SQLite metadata + payload files on local disk.
    Disk,
    /// Process memory; contents are lost on exit.
    Memory,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "disk" => Ok(Backend::Disk),
            "memory" => Ok(Backend::Memory),
            other => bail!("unknown backend `{}` (expected `disk` or `memory`)", other),
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub backend: Backend,
    pub storage_dir: String,
    pub database_url: String,
    pub listing_cache: bool,
    pub cache_ttl: Duration,
    pub upload_path: String,
    pub flush_path: String,
    pub max_body_bytes: usize,
    /// Comma-separated allowed origins; `None` allows any origin.
    pub cors_origins: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            backend: Backend::Disk,
            storage_dir: "./data/objects".into(),
            database_url: "sqlite://./data/meta/gateway.db".into(),
            listing_cache: true,
            cache_ttl: Duration::from_secs(604_800),
            upload_path: "/upload".into(),
            flush_path: "/dump-cache".into(),
            max_body_bytes: 100 * 1024 * 1024,
            cors_origins: None,
        }
    }
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "WebDAV-style file gateway over a blob store")]
pub struct Args {
    /// Host to bind to (overrides BLOB_GATEWAY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides BLOB_GATEWAY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Blob store backend (overrides BLOB_GATEWAY_BACKEND)
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Directory where object payloads are stored (overrides BLOB_GATEWAY_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Metadata database URL (overrides BLOB_GATEWAY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Disable the directory listing cache
    #[arg(long)]
    pub no_listing_cache: bool,

    /// Listing cache TTL in seconds (overrides BLOB_GATEWAY_CACHE_TTL_SECS)
    #[arg(long)]
    pub cache_ttl_secs: Option<u64>,

    /// Path of the multi-file upload endpoint
    #[arg(long)]
    pub upload_path: Option<String>,

    /// Path of the cache flush endpoint
    #[arg(long)]
    pub flush_path: Option<String>,

    /// Largest accepted request body in bytes
    #[arg(long)]
    pub max_body_bytes: Option<usize>,

    /// Comma-separated CORS origins (overrides BLOB_GATEWAY_CORS_ORIGINS)
    #[arg(long)]
    pub cors_origins: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        let args = Args::parse();
        let defaults = Self::default();

        // --- Environment fallback ---
        let env_host = env::var("BLOB_GATEWAY_HOST").unwrap_or(defaults.host);
        let env_port = env_parse("BLOB_GATEWAY_PORT")?.unwrap_or(defaults.port);
        let env_backend = env_parse("BLOB_GATEWAY_BACKEND")?.unwrap_or(defaults.backend);
        let env_storage = env::var("BLOB_GATEWAY_STORAGE_DIR").unwrap_or(defaults.storage_dir);
        let env_db = env::var("BLOB_GATEWAY_DATABASE_URL").unwrap_or(defaults.database_url);
        let env_ttl = env_parse::<u64>("BLOB_GATEWAY_CACHE_TTL_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.cache_ttl);
        let env_cache = env_parse::<bool>("BLOB_GATEWAY_LISTING_CACHE")?
            .unwrap_or(defaults.listing_cache);
        let env_cors = env::var("BLOB_GATEWAY_CORS_ORIGINS").ok();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            backend: args.backend.unwrap_or(env_backend),
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            listing_cache: env_cache && !args.no_listing_cache,
            cache_ttl: args.cache_ttl_secs.map(Duration::from_secs).unwrap_or(env_ttl),
            upload_path: normalize_route(args.upload_path.unwrap_or(defaults.upload_path)),
            flush_path: normalize_route(args.flush_path.unwrap_or(defaults.flush_path)),
            max_body_bytes: args.max_body_bytes.unwrap_or(defaults.max_body_bytes),
            cors_origins: args.cors_origins.or(env_cors),
        };

        if cfg.upload_path == cfg.flush_path {
            bail!("upload and flush endpoints must differ ({})", cfg.upload_path);
        }

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Read and parse an optional environment variable.
fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(value) => value
            .parse::<T>()
            .map(Some)
            .map_err(|err| anyhow::anyhow!("{}", err))
            .with_context(|| format!("parsing {} value `{}`", name, value)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(err).with_context(|| format!("reading {}", name)),
    }
}

fn normalize_route(path: String) -> String {
    if path.starts_with('/') {
        path
    } else {
        format!("/{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Memory".parse::<Backend>().unwrap(), Backend::Memory);
        assert_eq!("disk".parse::<Backend>().unwrap(), Backend::Disk);
        assert!("s3".parse::<Backend>().is_err());
    }

    #[test]
    fn routes_gain_a_leading_slash() {
        assert_eq!(normalize_route("upload".into()), "/upload");
        assert_eq!(normalize_route("/dump-cache".into()), "/dump-cache");
    }

    #[test]
    fn defaults_keep_a_week_long_listing_ttl() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.cache_ttl, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(cfg.addr(), "0.0.0.0:3000");
    }
}
