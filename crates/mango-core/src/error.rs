use thiserror::Error;

#[derive(Debug, Error)]
pub enum MangoError {
    #[error("Invalid command: {0}. Please use a valid command.")]
    InvalidCommand(String),

    #[error("missing environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<String>),

    #[error("invalid TAGS_JSON: {0}")]
    InvalidTags(String),

    #[error("parameter store error for '{name}': {detail}")]
    ParameterStore { name: String, detail: String },

    #[error("git {op} failed:\n{stderr}")]
    Git { op: String, stderr: String },

    #[error("terraform {op} failed:\n{stderr}")]
    Terraform { op: String, stderr: String },

    #[error("{0} binary not found on PATH")]
    BinaryNotFound(&'static str),

    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, MangoError>;
