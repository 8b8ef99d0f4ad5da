use thiserror::Error;

/// Per-record problems. These are logged and the record is skipped; they never abort a run.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record has no `data` object")]
    MissingData,
    #[error("missing or empty field `{0}`")]
    MissingField(&'static str),
    #[error("malformed crosspost_parent token {0:?}")]
    BadParentToken(String),
    #[error("id {0:?} contains the event id separator")]
    AmbiguousId(String),
    #[error("malformed crosspost_parent_list entry: {0}")]
    BadParentEntry(Box<RecordError>),
}

/// Startup configuration problems. Always fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; graph store credentials have no default")]
    MissingCredential(&'static str),
    #[error("invalid store URI {0:?}")]
    InvalidUri(String),
}
