#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("genesis validators root mismatch: stored {stored}, incoming {incoming}")]
    GenesisValidatorsRootMismatch { stored: String, incoming: String },
    #[error("genesis validators root is not yet set")]
    GenesisValidatorsRootUnset,
    #[error("invalid public key hex: {0}")]
    InvalidPublicKey(String),
    #[error("invalid interchange document: {0}")]
    InvalidInterchange(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
