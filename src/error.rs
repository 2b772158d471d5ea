use std::path::PathBuf;

use lettre::address::AddressError;
use thiserror::Error;

pub type MailResult<T> = Result<T, MailError>;

/// Everything that can go wrong while opening a session, composing or sending
#[derive(Debug, Error)]
pub enum MailError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("failed to connect to the smtp server")]
    Connection(#[source] lettre::transport::smtp::Error),

    #[error("timed out connecting to the smtp server")]
    Timeout(#[source] lettre::transport::smtp::Error),

    #[error("smtp server rejected the credentials")]
    Authentication(#[source] lettre::transport::smtp::Error),

    #[error("failed to read attachment {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to build message")]
    Compose(#[from] lettre::error::Error),

    #[error("smtp transaction failed")]
    Smtp(#[source] lettre::transport::smtp::Error),
}

/// Bad input caught before any file or network access
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("contact address must not be empty")]
    EmptyAddress,

    #[error("invalid contact address {address:?}")]
    InvalidAddress {
        address: String,
        #[source]
        source: AddressError,
    },

    #[error("attachment path must not be empty")]
    EmptyPath,

    #[error("unknown body type {0:?}, expected one of plain, html, base64")]
    UnknownBodyType(String),

    #[error("unknown encoding {0:?}, expected utf-8")]
    UnknownEncoding(String),

    #[error("no sender set")]
    MissingSender,

    #[error("no recipients set in To, Cc or Bcc")]
    NoRecipients,

    #[error("timeout must be at least one second")]
    ZeroTimeout,

    #[error("invalid content type {0:?}")]
    ContentType(String),
}
