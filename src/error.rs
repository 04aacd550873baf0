use thiserror::Error;

pub type Result<T> = std::result::Result<T, DistcopyError>;

#[derive(Error, Debug)]
pub enum DistcopyError {
    /// Wrong source/destination counts or an unreadable row set.
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Invalid token")]
    Authentication,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    /// A copy or move operation exited with non-zero status.
    #[error("Transfer failed: {0}")]
    Transfer(String),
    /// A listing, existence, line count, or disk space query failed.
    #[error("Query failed: {0}")]
    Query(String),
    #[error("Failed to connect SSH session or execute SSH command: {0}")]
    Ssh(#[from] openssh::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed message: {0}")]
    Protocol(#[from] serde_json::Error),
    #[error("Failed to parse CSV row set: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to parse YAML row set: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid command template: {0}")]
    Template(#[from] Box<handlebars::TemplateError>),
    #[error("Failed to render remote command: {0}")]
    Render(#[from] handlebars::RenderError),
}
