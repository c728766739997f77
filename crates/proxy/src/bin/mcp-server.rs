//! `mcp-server` — runs the MCP JSON-RPC bridge (spec §4.7, §6) over this
//! process's own stdin/stdout, exposing every operation of a proxy service
//! built from a config file (spec §4.7 "Proxy service") as a callable tool.
//!
//! Configuration is a `clap`-derived `Args` struct, as `connector_proxy::Args`
//! does (spec §1 "AMBIENT STACK" — binaries take config from `clap`, library
//! crates never read the environment directly).

use std::sync::Arc;

use clap::Parser;
use cli_common::{init_logging, LogArgs, OrBail};

#[derive(Debug, Parser)]
#[command(name = "mcp-server", about = "Exposes a modeled service's operations as MCP tools over stdio")]
struct Args {
    #[command(flatten)]
    log: LogArgs,

    /// Path to the proxy config JSON file describing the service, its
    /// shapes, operations, and upstream endpoint.
    #[arg(long = "config")]
    config: std::path::PathBuf,

    /// Name reported in the `initialize` response's `serverInfo.name`.
    #[arg(long, default_value = "mcp-server")]
    server_name: String,

    /// Version reported in the `initialize` response's `serverInfo.version`.
    #[arg(long, default_value_t = env!("CARGO_PKG_VERSION").to_string())]
    server_version: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log);

    let raw = std::fs::read_to_string(&args.config).or_bail("failed to read proxy config file");
    let config: proxy::ProxyConfig = serde_json::from_str(&raw).or_bail("failed to parse proxy config file");

    let (registry, service_id, operations, protocol) = proxy::load_proxy_config(&config).or_bail("failed to load proxy config");

    let upstream = config.upstream.parse::<http::Uri>().or_bail("invalid upstream URI");
    let endpoint_resolver = Arc::new(client::StaticEndpointResolver::new(upstream));
    let transport = Arc::new(client::ReqwestTransport::default());

    let (service, _pipeline) = proxy::build_proxy_service(registry, service_id, operations, endpoint_resolver, transport, protocol);

    let mcp = proxy::McpServer::new(args.server_name, args.server_version, vec![service]);

    tracing::info!("mcp-server starting, reading JSON-RPC requests from stdin");
    mcp.run(tokio::io::stdin(), tokio::io::stdout())
        .await
        .or_bail("mcp server loop exited with an error");
}
