//! Run configuration
//!
//! Every literal the scraper depends on (search URL, class range, page cap,
//! waits, output naming, column widths) is defined here. `ScrapeConfig::default()`
//! reproduces the fixed behaviour; the CLI only overrides individual fields.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

/// Search URL with the query baked in: empty text, harmonised terms only,
/// prefix matching, relevance ordering.
pub const SEARCH_URL: &str = "https://euipo.europa.eu/ec2/search/find?language=en&text=&niceClass=1&size=25&page=1&harmonised=true&searchMode=WORDSPREFIX&sortBy=relevance";

pub const FIRST_CLASS: u8 = 1;
pub const LAST_CLASS: u8 = 10;
pub const MAX_PAGES: u32 = 10;

pub const OUTPUT_PREFIX: &str = "Indian_Trademark_Class";
pub const OUTPUT_EXTENSION: &str = "xlsx";

/// Header -> column width, in Excel character units.
pub const COLUMN_WIDTHS: [(&str, f64); 9] = [
    ("Class", 10.0),
    ("Term", 120.0),
    ("Harmonised", 15.0),
    ("CGPDTM", 15.0),
    ("Harm", 10.0),
    ("Nice", 10.0),
    ("IDli", 10.0),
    ("Grou", 10.0),
    ("MGS", 10.0),
];

/// Looks up the configured width for a header cell.
pub fn column_width(header: &str) -> Option<f64> {
    COLUMN_WIDTHS
        .iter()
        .find(|(name, _)| *name == header)
        .map(|(_, width)| *width)
}

/// What to do when the jurisdiction checkbox cannot be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JurisdictionPolicy {
    /// Log a warning and scrape without the filter.
    #[default]
    WarnAndContinue,
    /// Abort the run before any category is scraped.
    FailFast,
}

/// Every pause and bounded wait used while driving the portal.
#[derive(Debug, Clone)]
pub struct Timings {
    pub disclaimer_wait: Duration,
    /// Pause before looking for the disclaimer and again after closing it.
    pub modal_settle: Duration,
    pub jurisdiction_wait: Duration,
    /// Wait for the category input and the search button.
    pub control_wait: Duration,
    /// First-attempt wait for the table and page indicator.
    pub page_wait: Duration,
    /// Second-attempt wait, after `retry_backoff`.
    pub retry_page_wait: Duration,
    pub retry_backoff: Duration,
    /// Pause after submitting a search or clicking "next" so the old table is
    /// replaced before polling starts.
    pub settle: Duration,
    pub poll_interval: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            disclaimer_wait: Duration::from_secs(5),
            modal_settle: Duration::from_secs(1),
            jurisdiction_wait: Duration::from_secs(10),
            control_wait: Duration::from_secs(10),
            page_wait: Duration::from_secs(20),
            retry_page_wait: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(5),
            settle: Duration::from_secs(2),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl Timings {
    /// Zero pauses and short waits, for driving fakes and fixture pages.
    pub fn immediate() -> Self {
        Self {
            disclaimer_wait: Duration::from_millis(50),
            modal_settle: Duration::ZERO,
            jurisdiction_wait: Duration::from_millis(50),
            control_wait: Duration::from_millis(50),
            page_wait: Duration::from_millis(50),
            retry_page_wait: Duration::from_millis(50),
            retry_backoff: Duration::ZERO,
            settle: Duration::ZERO,
            poll_interval: Duration::from_millis(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: String,
    pub classes: RangeInclusive<u8>,
    pub max_pages: u32,
    pub output_dir: PathBuf,
    pub jurisdiction: JurisdictionPolicy,
    pub timings: Timings,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: SEARCH_URL.to_string(),
            classes: FIRST_CLASS..=LAST_CLASS,
            max_pages: MAX_PAGES,
            output_dir: PathBuf::from("."),
            jurisdiction: JurisdictionPolicy::default(),
            timings: Timings::default(),
        }
    }
}
