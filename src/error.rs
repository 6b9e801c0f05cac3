use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

/// Stable numeric error codes exposed by the JSON api.
pub mod code {
    pub const NO_METHOD: u16 = 0x00;
    pub const INVALID_METHOD: u16 = 0x01;
    pub const INVALID_ARGUMENTS: u16 = 0x02;
    pub const OAUTH_ERROR: u16 = 0x03;
    pub const PERMISSION_ERROR: u16 = 0x04;
    pub const OWNER_REQUIRED: u16 = 0x05;
    pub const PRIVACY_ERROR: u16 = 0x06;
    pub const NOT_FOUND: u16 = 0x07;
    pub const ALREADY_EXISTS: u16 = 0x08;
    pub const ALREADY_IN_USE: u16 = 0x09;
    pub const VALIDATION_ERROR: u16 = 0x0a;
    pub const API_ERROR: u16 = 0x0b;
    pub const INTERNAL_ERROR: u16 = 0xff;
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is not a valid nick")]
    Nick(String),
    #[error("{0} is not a valid email address")]
    Email(String),
    #[error("{0} is not a valid mobile number")]
    Mobile(String),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("{0} is not a valid access level")]
    AccessLevel(String),
    #[error("{0} is not a valid privacy setting")]
    Privacy(String),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OAuthError {
    #[error("missing oauth parameter: {0}")]
    MissingParameter(&'static str),
    #[error("malformed Authorization header")]
    MalformedHeader,
    #[error("unsupported signature method: {0}")]
    UnsupportedSignatureMethod(String),
    #[error("signature method {0} is not allowed for these credentials")]
    SignatureMethodNotAllowed(&'static str),
    #[error("invalid consumer: {0}")]
    InvalidConsumer(String),
    #[error("invalid access token: {0}")]
    InvalidToken(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("expired timestamp")]
    ExpiredTimestamp,
    #[error("nonce already used")]
    NonceReused,
}

#[derive(thiserror::Error)]
pub enum ApiError {
    #[error("no method specified")]
    NoMethod,
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    OAuth(#[from] OAuthError),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("actor does not own {0}")]
    OwnerRequired(String),
    #[error("not allowed to view {0}")]
    Privacy(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("already in use: {0}")]
    AlreadyInUse(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Rejected(String),
    #[error("Something went wrong.")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ApiError {
    pub fn code(&self) -> u16 {
        match self {
            ApiError::NoMethod => code::NO_METHOD,
            ApiError::InvalidMethod(_) => code::INVALID_METHOD,
            ApiError::InvalidArguments(_) => code::INVALID_ARGUMENTS,
            ApiError::OAuth(_) => code::OAUTH_ERROR,
            ApiError::PermissionDenied(_) => code::PERMISSION_ERROR,
            ApiError::OwnerRequired(_) => code::OWNER_REQUIRED,
            ApiError::Privacy(_) => code::PRIVACY_ERROR,
            ApiError::NotFound(_) => code::NOT_FOUND,
            ApiError::AlreadyExists(_) => code::ALREADY_EXISTS,
            ApiError::AlreadyInUse(_) => code::ALREADY_IN_USE,
            ApiError::Validation(_) => code::VALIDATION_ERROR,
            ApiError::Rejected(_) => code::API_ERROR,
            ApiError::UnexpectedError(_) => code::INTERNAL_ERROR,
        }
    }
}

impl std::fmt::Debug for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

#[derive(serde::Serialize)]
struct ErrorBody<'a> {
    status: &'static str,
    code: u16,
    message: &'a str,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoMethod
            | ApiError::InvalidMethod(_)
            | ApiError::InvalidArguments(_)
            | ApiError::Validation(_)
            | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::OAuth(_) => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_)
            | ApiError::OwnerRequired(_)
            | ApiError::Privacy(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) | ApiError::AlreadyInUse(_) => {
                StatusCode::CONFLICT
            }
            ApiError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        HttpResponse::build(self.status_code()).json(ErrorBody {
            status: "error",
            code: self.code(),
            message: &message,
        })
    }
}

pub fn error_chain_fmt(
    e: &impl std::error::Error,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    let mut current = e.source();
    while let Some(cause) = current {
        writeln!(f, "Caused by:\n\t{}", cause)?;
        current = cause.source();
    }
    Ok(())
}
