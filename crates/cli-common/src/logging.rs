//! Shared logging setup for the two runtime binaries (`mcp-server`,
//! `stdio-proxy`), grounded on `flow_cli_common::logging`: a `LogArgs`
//! clap fragment plus `init_logging`, generalized with one constraint the
//! teacher's version didn't need — the MCP server's own stdout is a
//! JSON-RPC transport (spec §4.7, §6), so logs MUST always go to stderr,
//! never stdout, regardless of format.

/// Log verbosity and format, meant to be `#[clap(flatten)]`ed into a
/// binary's top-level `Args` struct.
#[derive(Debug, clap::Args)]
pub struct LogArgs {
    /// The log verbosity. Can be one of trace|debug|info|warn|error|off.
    #[arg(
        long = "log.level",
        default_value_t = LogLevel::Warn,
        group = "logging",
        ignore_case = true,
        value_enum,
        global = true
    )]
    pub level: LogLevel,

    /// The log output format. Defaults to JSON when stderr isn't a
    /// terminal, color text otherwise.
    #[arg(long = "log.format", value_enum, global = true, group = "logging")]
    pub format: Option<LogFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

/// The format for logs. Every variant writes to stderr — stdout is
/// reserved for a binary's own wire protocol (MCP JSON-RPC, the stdio
/// proxy's forwarded bytes).
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum LogFormat {
    /// JSON Lines on stderr; the format non-interactive supervisors expect.
    Json,
    /// Plain text, no colors.
    Text,
    /// Plain text with ANSI colors, for an interactive terminal.
    Color,
}

fn default_log_format() -> LogFormat {
    use std::io::IsTerminal;
    if std::io::stderr().is_terminal() {
        LogFormat::Color
    } else {
        LogFormat::Json
    }
}

/// Initializes the global `tracing` subscriber. Panics if called twice, as
/// `tracing_subscriber`'s `init()` does.
pub fn init_logging(args: &LogArgs) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(args.level.to_string())
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(false);

    match args.format.unwrap_or_else(default_log_format) {
        LogFormat::Json => {
            builder.json().flatten_event(true).with_current_span(true).with_span_list(false).init();
        }
        LogFormat::Text => {
            builder.compact().with_ansi(false).init();
        }
        LogFormat::Color => {
            builder.compact().with_ansi(true).init();
        }
    }
}
