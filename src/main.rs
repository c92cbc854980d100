//! edge-gateway binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                      EDGE GATEWAY                        │
//!                  │                                                          │
//!   Client ───────▶│  listener ──▶ Dispatcher ──▶ Matcher (RoutingTable)      │
//!   (HTTP/HTTPS)   │  (axum-server)     │                                     │
//!                  │                    ▼                                     │
//!                  │   ip filter → security headers → https redirect →        │
//!                  │   access log → compression → cache → rate limit →        │
//!                  │   header injection                                       │
//!                  │                    │                                     │
//!                  │                    ▼                                     │
//!   Client ◀───────│           proxy | static | 404 ────────────────────────┼──▶ Backend
//!                  │                                                          │
//!                  │  config + reload (SIGHUP, watcher, admin) ─▶ ArcSwap     │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use edge_gateway::config::{load_config, ConfigError, ConfigSource, GatewayConfig};
use edge_gateway::lifecycle::startup;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(version, about = "HTTP edge gateway: TLS termination, static files and reverse proxy", long_about = None)]
struct Cli {
    /// Main configuration file
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Directory of additional *.toml files (domains are appended)
    #[arg(long, default_value = "conf.d")]
    conf_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gateway (default)
    Run,
    /// Validate the configuration and exit
    Check,
    /// Ask a running gateway to reload its configuration
    Reload,
    /// Show the status of a running gateway
    Status,
}

fn conf_dir(path: PathBuf) -> Option<PathBuf> {
    path.is_dir().then_some(path)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let source = ConfigSource::new(cli.config, conf_dir(cli.conf_dir));

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => match startup::run(source).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "Gateway failed");
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Check => check(&source),
        Commands::Reload => admin_call(&source, reqwest::Method::POST, "/admin/reload").await,
        Commands::Status => admin_call(&source, reqwest::Method::GET, "/admin/status").await,
    }
}

fn check(source: &ConfigSource) -> ExitCode {
    match load_config(&source.main, source.conf_dir.as_deref()) {
        Ok(config) => {
            let routes: usize = config.domains.iter().map(|d| d.proxy_routes.len()).sum();
            println!(
                "Configuration OK: {} domain(s), {} proxy route(s)",
                config.domains.len(),
                routes
            );
            ExitCode::SUCCESS
        }
        Err(ConfigError::Validation(errors)) => {
            eprintln!("Configuration invalid:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Base URL of the admin API of the gateway described by `config`.
fn admin_url(config: &GatewayConfig) -> Option<String> {
    let mut address: SocketAddr = config.server.admin_address.as_deref()?.parse().ok()?;
    if address.ip().is_unspecified() {
        address.set_ip(Ipv4Addr::LOCALHOST.into());
    }
    Some(format!("http://{}", address))
}

async fn admin_call(source: &ConfigSource, method: reqwest::Method, path: &str) -> ExitCode {
    let config = match source.load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let Some(base) = admin_url(&config) else {
        eprintln!("Error: server.admin_address is not configured");
        return ExitCode::FAILURE;
    };

    let mut headers = HeaderMap::new();
    if let Some(key) = &config.server.admin_api_key {
        match HeaderValue::from_str(&format!("Bearer {}", key)) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(e) => {
                eprintln!("Error: invalid admin_api_key: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let result = reqwest::Client::new()
        .request(method, format!("{}{}", base, path))
        .headers(headers)
        .send()
        .await;

    match result {
        Ok(res) => {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            let pretty = serde_json::from_str::<serde_json::Value>(&body)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or(body);
            if status.is_success() {
                println!("{}", pretty);
                ExitCode::SUCCESS
            } else {
                eprintln!("Error: Admin API returned status {}", status);
                eprintln!("{}", pretty);
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: cannot reach admin API at {}: {}", base, e);
            ExitCode::FAILURE
        }
    }
}
