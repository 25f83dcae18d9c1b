pub mod browser;
pub mod config;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod portal;
pub mod record;

//  Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ConnectionMode};
pub use browser::euipo::EuipoPortal;
pub use config::{JurisdictionPolicy, ScrapeConfig, Timings};
pub use error::{Result, ScrapeError};
pub use pipeline::{CategoryBatch, CategoryOutcome, RunSummary, StopReason};
pub use portal::{PageRead, SearchPortal};
pub use record::{RawCell, Record, COLUMNS, TICK_SENTINEL};
