use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("header length {0} exceeds sanity limit")]
    HeaderTooLarge(usize),

    #[error("no GeneratedByEngineVersion attribute in header")]
    NoVersion,

    #[error("invalid version string: {0}")]
    InvalidVersion(String),

    #[error("unsupported engine version: {0}")]
    UnsupportedVersion(u8),

    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("header-section encryption is set but unsupported (requires a registration key)")]
    Decryption,

    #[error("invalid compression method: {0}")]
    InvalidCompressMethod(u32),

    #[error("malformed block: {0}")]
    MalformedBlock(&'static str),

    #[error("number field does not fit in 32 bits")]
    NumberOverflow,

    #[error("keyword not found")]
    NotFound,

    #[error("@@@LINK= chain exceeded depth limit")]
    LinkCycle,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
