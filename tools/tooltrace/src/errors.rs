use thiserror::Error;

#[derive(Debug, Error)]
pub enum TooltraceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("cli error: {0}")]
    Cli(String),
}
