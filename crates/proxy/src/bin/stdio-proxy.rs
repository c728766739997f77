//! `stdio-proxy` — a companion process runner (spec §4.7 "Stdio proxy")
//! that forwards bytes bidirectionally between its own stdin/stdout and a
//! spawned child process's, used to adapt a third-party MCP server that
//! only knows how to speak over its own stdio.

use clap::Parser;
use cli_common::{init_logging, LogArgs, OrBail};

#[derive(Debug, Parser)]
#[command(name = "stdio-proxy", about = "Forwards stdio bytes to and from a spawned child process")]
struct Args {
    #[command(flatten)]
    log: LogArgs,

    /// The child process to spawn.
    entrypoint: String,

    /// Arguments passed through to the child process.
    #[arg(trailing_var_arg = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(&args.log);

    tracing::info!(entrypoint = %args.entrypoint, "stdio-proxy forwarding stdin/stdout to child process");
    proxy::run_stdio_bridge(args.entrypoint, args.args)
        .await
        .or_bail("stdio proxy exited with an error");
}
