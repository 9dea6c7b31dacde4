//! Failure taxonomy of the ingestion pipeline.
//!
//! Every stage that cannot continue reports one [`BodyError`]. The variant decides
//! the HTTP status and the stable `code` a downstream error handler renders.

use http::StatusCode;
use micro_ingest_http::protocol::ParseError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("{0}")]
    BadDigest(String),

    #[error("{0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    InvalidContent(String),

    #[error("{0}")]
    InvalidHeader(String),

    #[error("{0}")]
    RequestExpired(String),

    #[error("{0}")]
    GatewayTimeout(String),

    #[error("{0}")]
    NotAcceptable(String),

    #[error(transparent)]
    FieldedText(#[from] csv::Error),

    #[error(transparent)]
    Transport(#[from] ParseError),
}

impl BodyError {
    pub fn payload_too_large(max_body_size: u64) -> Self {
        Self::PayloadTooLarge(format!("Request body size exceeds {max_body_size}"))
    }

    pub fn invalid_content<S: ToString>(str: S) -> Self {
        Self::InvalidContent(str.to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
            Self::BadDigest(_)
            | Self::InvalidContent(_)
            | Self::InvalidHeader(_)
            | Self::RequestExpired(_)
            | Self::FieldedText(_)
            | Self::Transport(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable machine readable name of the failure class.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge(_) => "PayloadTooLarge",
            Self::BadDigest(_) => "BadDigest",
            Self::UnsupportedMediaType(_) => "UnsupportedMediaType",
            Self::InvalidContent(_) | Self::FieldedText(_) => "InvalidContent",
            Self::InvalidHeader(_) => "InvalidHeader",
            Self::RequestExpired(_) => "RequestExpired",
            Self::GatewayTimeout(_) => "GatewayTimeout",
            Self::NotAcceptable(_) => "NotAcceptable",
            Self::Transport(_) => "BadRequest",
        }
    }
}
