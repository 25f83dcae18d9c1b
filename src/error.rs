use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Failed to connect to Chrome: {0}")]
    ConnectionFailed(String),

    #[error("Failed to launch Chrome: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    #[error("Timed out after {waited:?} waiting for {what}")]
    Timeout { what: String, waited: Duration },

    #[error("Stale element reference")]
    StaleElement,

    #[error("Jurisdiction filter could not be applied: {0}")]
    JurisdictionRequired(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Workbook write error: {0}")]
    Workbook(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook read error: {0}")]
    WorkbookRead(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ScrapeError {
    /// True when the error means a DOM node we held went away between lookup
    /// and read (the table was re-rendered under us).
    pub fn is_stale(&self) -> bool {
        match self {
            ScrapeError::StaleElement => true,
            ScrapeError::Cdp(e) => is_stale_message(&e.to_string()),
            _ => false,
        }
    }
}

fn is_stale_message(msg: &str) -> bool {
    let msg = msg.to_ascii_lowercase();
    msg.contains("no node with given id")
        || msg.contains("could not find node with given id")
        || msg.contains("node with given id does not belong to the document")
        || msg.contains("cannot find context with specified id")
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
