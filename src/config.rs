use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub s3_bucket: String,
    pub aws_region: String,
    pub s3_endpoint_url: Option<String>,
    pub s3_force_path_style: bool,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Client registration API")]
pub struct Args {
    /// Host to bind to (overrides CLIENT_REGISTRY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CLIENT_REGISTRY_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Database URL (overrides CLIENT_REGISTRY_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// S3 bucket for client pictures (overrides S3_BUCKET_NAME)
    #[arg(long)]
    pub s3_bucket: Option<String>,

    /// AWS region (overrides AWS_REGION)
    #[arg(long)]
    pub region: Option<String>,

    /// Custom S3 endpoint, e.g. a local MinIO (overrides S3_ENDPOINT_URL)
    #[arg(long)]
    pub endpoint_url: Option<String>,

    /// Use path-style S3 addressing (required for MinIO)
    #[arg(long)]
    pub force_path_style: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig.
    pub fn from_env_and_args() -> Result<Self> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("CLIENT_REGISTRY_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("CLIENT_REGISTRY_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CLIENT_REGISTRY_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 5000,
            Err(err) => return Err(err).context("reading CLIENT_REGISTRY_PORT"),
        };
        let env_db = env::var("CLIENT_REGISTRY_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/client_registry.db".into());
        let env_bucket = env::var("S3_BUCKET_NAME").unwrap_or_else(|_| "client-pictures".into());
        let env_region = env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".into());
        let env_endpoint = env::var("S3_ENDPOINT_URL").ok();
        let env_path_style = env::var("S3_FORCE_PATH_STYLE")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        // --- Merge ---
        Ok(Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            database_url: args.database_url.unwrap_or(env_db),
            s3_bucket: args.s3_bucket.unwrap_or(env_bucket),
            aws_region: args.region.unwrap_or(env_region),
            s3_endpoint_url: args.endpoint_url.or(env_endpoint),
            s3_force_path_style: args.force_path_style || env_path_style,
        })
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
