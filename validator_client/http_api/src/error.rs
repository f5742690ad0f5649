//! The unified error sum every handler folds its failures into, and the
//! single place that maps them onto HTTP status codes (`spec.md` §7,
//! `SPEC_FULL.md` §7 "a single `impl_into_http_response` conversion used
//! by every `http_api` handler").

use serde::Serialize;
use slashing_protection::RejectReason;
use warp::http::StatusCode;
use warp::{Rejection, Reply};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found")]
    NotFound,
    #[error("signer unavailable: {0}")]
    SignerUnavailable(String),
    #[error("slashing protection rejected the request: {0}")]
    SlashingRejected(RejectReason),
    #[error("storage failure: {0}")]
    StorageFailure(String),
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("keystore decrypt error: {0}")]
    KeystoreDecryptError(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::SlashingRejected(_) => StatusCode::PRECONDITION_FAILED,
            Error::SignerUnavailable(_)
            | Error::StorageFailure(_)
            | Error::BackendUnavailable(_)
            | Error::KeystoreDecryptError(_)
            | Error::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<slashing_protection::Error> for Error {
    fn from(e: slashing_protection::Error) -> Self {
        Error::StorageFailure(e.to_string())
    }
}

impl From<signing_method::Error> for Error {
    fn from(e: signing_method::Error) -> Self {
        match e {
            signing_method::Error::BackendUnavailable(msg) => Error::BackendUnavailable(msg),
            other => Error::SignerUnavailable(other.to_string()),
        }
    }
}

impl From<eth2_keystore::Error> for Error {
    fn from(e: eth2_keystore::Error) -> Self {
        Error::KeystoreDecryptError(e.to_string())
    }
}

impl From<validator_dir::Error> for Error {
    fn from(e: validator_dir::Error) -> Self {
        Error::InternalError(e.to_string())
    }
}

impl From<initialized_validators::MetadataError> for Error {
    fn from(e: initialized_validators::MetadataError) -> Self {
        Error::InternalError(e.to_string())
    }
}

impl From<validator_manager::AddError> for Error {
    fn from(e: validator_manager::AddError) -> Self {
        match e {
            validator_manager::AddError::InvalidSecpKey(msg) => Error::BadRequest(msg),
            validator_manager::AddError::Keystore(inner) => Error::from(inner),
            validator_manager::AddError::Files(inner) => Error::from(inner),
            validator_manager::AddError::Metadata(inner) => Error::from(inner),
            validator_manager::AddError::Slashing(inner) => Error::from(inner),
        }
    }
}

impl From<commit_boost::Error> for Error {
    fn from(e: commit_boost::Error) -> Self {
        match e {
            commit_boost::Error::NotFound => Error::NotFound,
            commit_boost::Error::UnsupportedConsensusKeyType => Error::BadRequest(e.to_string()),
            commit_boost::Error::Keystore(inner) => Error::from(inner),
            commit_boost::Error::Io(inner) => Error::from(inner),
            commit_boost::Error::Signing(inner) => Error::from(inner),
        }
    }
}

/// Wraps an [`Error`] so it can travel through `warp`'s rejection
/// machinery; recovered by [`recover`].
#[derive(Debug)]
pub struct Rejected(pub Error);

impl warp::reject::Reject for Rejected {}

pub fn reject(e: impl Into<Error>) -> Rejection {
    warp::reject::custom(Rejected(e.into()))
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

/// The shared recovery filter composed once at route-build time
/// (`SPEC_FULL.md` §7), rather than every handler hand-rolling a status
/// code.
pub async fn recover(rejection: Rejection) -> Result<impl Reply, std::convert::Infallible> {
    let (status, message) = if let Some(Rejected(err)) = rejection.find::<Rejected>() {
        (err.status(), err.to_string())
    } else if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if rejection.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "malformed request body".to_string())
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal error".to_string(),
        )
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ErrorBody { message }),
        status,
    ))
}
