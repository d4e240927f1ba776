pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "payunlock")]
#[command(about = "Seal, hand off and open PayUnlock listing secrets")]
#[command(version)]
pub struct Args {
    /// Path to the payunlock config directory (defaults to ~/.payunlock)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Override the CDN listing documents are read from
    #[arg(long, global = true)]
    pub cdn_url: Option<Url>,

    /// Override the upload service listing documents are written through
    #[arg(long, global = true)]
    pub upload_url: Option<Url>,

    /// Override the JSON-RPC relay escrow calls go through
    #[arg(long, global = true)]
    pub rpc_url: Option<Url>,

    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: tracing::Level,

    /// Also write daily rolling logs to this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: crate::Command,
}
