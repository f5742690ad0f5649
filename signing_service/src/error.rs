//! The top-level error sum every binary-crate code path folds into
//! (`SPEC_FULL.md` §7): one `thiserror` enum with a `From` impl per
//! crate-local error type, printed to stderr with a non-zero exit.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid hex value for {field}: {source}")]
    InvalidHex {
        field: &'static str,
        #[source]
        source: hex::FromHexError,
    },
    #[error("slashing-protection database error: {0}")]
    SlashingProtection(#[from] slashing_protection::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("interchange JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(String),
    #[error("{0}")]
    Usage(String),
}
