use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("chat API error ({status}): {detail}")]
    Chat { status: u16, detail: String },

    #[error("message {0} no longer exists")]
    MessageNotFound(u64),

    #[error("command API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error(transparent)]
    Core(#[from] mango_core::MangoError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RelayError>;
