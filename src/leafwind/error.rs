use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeafwindError {
    #[error("Entry {index} is missing a \"content\" field")]
    MissingContent { index: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid TID: {0}")]
    InvalidTid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Publish error: {0}")]
    Publish(String),
}

pub type Result<T> = std::result::Result<T, LeafwindError>;
