//! Server configuration

use clap::Parser;
use std::net::SocketAddr;

#[derive(Parser, Debug, Clone)]
#[command(name = "accessctl")]
#[command(about = "accessctl server - resource ownership and access control declarations")]
#[command(version)]
pub struct ServerConfig {
    /// SQLite connection string
    #[arg(long, env = "ACCESSCTL_DATABASE_URL", default_value = "sqlite:accessctl.db?mode=rwc")]
    pub database_url: String,

    /// Address to listen on
    #[arg(long, env = "ACCESSCTL_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Maximum pooled database connections
    #[arg(long, env = "ACCESSCTL_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Tracing filter used when RUST_LOG is unset
    #[arg(long, default_value = "accessctl=debug,tower_http=debug")]
    pub log_filter: String,
}
