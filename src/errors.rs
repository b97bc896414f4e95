use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unknown destination zone: {0}")]
    InvalidZone(String),

    #[error("Trip list is empty")]
    EmptyLedger,

    #[error("No claimant selected")]
    NoClaimant,

    #[error("Trip index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A user named {0:?} already exists")]
    DuplicateUser(String),

    #[error("No user named {0:?}")]
    UnknownUser(String),

    #[error("Output file {0:?} is open in another program")]
    ResourceBusy(PathBuf),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
}

impl Error {
    /// True for errors the caller can fix by correcting its input. None of
    /// these are returned after file I/O has started.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidDate(_)
                | Error::InvalidZone(_)
                | Error::EmptyLedger
                | Error::NoClaimant
                | Error::IndexOutOfRange { .. }
                | Error::DuplicateUser(_)
                | Error::UnknownUser(_)
        )
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
