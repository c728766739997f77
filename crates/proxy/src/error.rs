//! The proxy crate's single flat error enum, grounded on
//! `connector_proxy::errors::Error` (spec §7's single-flat-enum convention,
//! carried into every crate of this workspace).

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("upstream call failed: {0}")]
    Upstream(#[from] client::CallError),

    #[error(transparent)]
    Serialization(#[from] codec::SerializationException),

    #[error("entrypoint is an empty argument list")]
    EmptyEntrypoint,

    #[error("missing child process {0} pipe")]
    MissingChildPipe(&'static str),

    #[error("failed to spawn child process: {0}")]
    Spawn(std::io::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json-rpc decode error: {0}")]
    JsonRpcDecode(#[from] serde_json::Error),

    #[error("line framing error: {0}")]
    LineCodec(#[from] transport::stdio::LineCodecError),

    #[error("unknown tool '{0}'")]
    UnknownTool(String),

    #[error("signal error: {0}")]
    Signal(#[from] nix::Error),

    #[error("invalid proxy configuration: {0}")]
    Config(String),

    #[error("invalid upstream URI: {0}")]
    InvalidUri(#[from] http::uri::InvalidUri),
}
