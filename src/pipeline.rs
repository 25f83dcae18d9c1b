//! Scrape driver
//!
//! Session bootstrap, then for each class: set the filter, submit, walk the
//! result pages, and write whatever was collected. Every failure inside the
//! class and page loops is logged and contained; the run always moves on.

use crate::browser::chrome::{ChromeDriver, ConnectionMode};
use crate::browser::euipo::EuipoPortal;
use crate::browser::wait::pause;
use crate::config::{JurisdictionPolicy, ScrapeConfig};
use crate::error::{Result, ScrapeError};
use crate::export;
use crate::portal::{PageRead, SearchPortal};
use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Why a class's page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The class filter or search button could not be used; nothing was read.
    ControlsUnavailable,
    /// Page cap reached.
    PageCap,
    /// Next control disabled or without a link.
    NoNextPage,
    /// Next control missing or the click failed.
    NextFailed,
    /// A page failed to load or read twice in a row.
    ExtractionFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutcome {
    pub class: u8,
    pub rows: usize,
    pub pages_read: u32,
    pub stop: StopReason,
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CategoryOutcome>,
    pub widths_updated: Vec<PathBuf>,
}

impl RunSummary {
    pub fn total_rows(&self) -> usize {
        self.outcomes.iter().map(|o| o.rows).sum()
    }

    pub fn files_written(&self) -> usize {
        self.outcomes.iter().filter(|o| o.file.is_some()).count()
    }
}

/// Which wait budget an extraction attempt gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    Retry,
}

enum PageState {
    Loading(Attempt),
    Extracting(Attempt),
    Paginating,
    Done(StopReason),
}

/// Records and stop reason for one class, before export.
#[derive(Debug, Clone)]
pub struct CategoryBatch {
    pub class: u8,
    pub records: Vec<Record>,
    pub pages_read: u32,
    pub stop: StopReason,
}

/// Close the disclaimer and apply the jurisdiction filter.
///
/// A missing disclaimer is never an error. A jurisdiction failure is only
/// returned under [`JurisdictionPolicy::FailFast`].
pub async fn bootstrap<P: SearchPortal>(portal: &P, cfg: &ScrapeConfig) -> Result<()> {
    let t = &cfg.timings;

    pause(t.modal_settle).await;
    match portal.dismiss_disclaimer(t.disclaimer_wait).await {
        Ok(()) => log::info!("Disclaimer modal closed automatically."),
        Err(e) => {
            log::info!("No disclaimer modal to close or already closed.");
            log::debug!("disclaimer: {}", e);
        }
    }
    pause(t.modal_settle).await;
    log::info!("Proceeding with extraction...");

    match portal.select_jurisdiction(t.jurisdiction_wait).await {
        Ok(()) => {
            log::info!("India (CGPDTM) checkbox selected.");
            Ok(())
        }
        Err(e) => match cfg.jurisdiction {
            JurisdictionPolicy::WarnAndContinue => {
                log::warn!("Could not select India checkbox: {}", e);
                Ok(())
            }
            JurisdictionPolicy::FailFast => Err(ScrapeError::JurisdictionRequired(e.to_string())),
        },
    }
}

/// Set the class filter, search, and walk up to `cfg.max_pages` result pages.
pub async fn scrape_category<P: SearchPortal>(
    portal: &P,
    class: u8,
    cfg: &ScrapeConfig,
) -> CategoryBatch {
    let t = &cfg.timings;
    let mut batch = CategoryBatch {
        class,
        records: Vec::new(),
        pages_read: 0,
        stop: StopReason::ControlsUnavailable,
    };

    if let Err(e) = portal.set_category(class, t.control_wait).await {
        log::warn!("Could not set Nice Class: {}", e);
        return batch;
    }
    log::info!("Set Nice Class to {}", class);

    if let Err(e) = portal.submit_search(t.control_wait).await {
        log::warn!("Could not click Search button: {}", e);
        return batch;
    }
    log::info!("Search button clicked.");
    pause(t.settle).await;

    log::info!("Extraction started for Nice Class {}.", class);
    batch.stop = walk_pages(portal, class, cfg, &mut batch.records, &mut batch.pages_read).await;
    batch
}

async fn walk_pages<P: SearchPortal>(
    portal: &P,
    class: u8,
    cfg: &ScrapeConfig,
    records: &mut Vec<Record>,
    pages_read: &mut u32,
) -> StopReason {
    let t = &cfg.timings;
    let mut current_page: u32 = 1;

    let mut state = if cfg.max_pages == 0 {
        PageState::Done(StopReason::PageCap)
    } else {
        PageState::Loading(Attempt::First)
    };

    loop {
        state = match state {
            PageState::Loading(attempt) => {
                let wait = match attempt {
                    Attempt::First => t.page_wait,
                    Attempt::Retry => t.retry_page_wait,
                };
                match portal.wait_for_page(current_page, wait).await {
                    Ok(()) => PageState::Extracting(attempt),
                    Err(e) => attempt_failed(attempt, current_page, e, t.retry_backoff).await,
                }
            }
            PageState::Extracting(attempt) => match portal.read_current_page().await {
                Ok(read) => {
                    commit_page(records, read, current_page, attempt);
                    *pages_read += 1;
                    if current_page >= cfg.max_pages {
                        log::info!(
                            "Reached max page limit ({}) for Nice Class {}. Extraction complete.",
                            cfg.max_pages,
                            class
                        );
                        PageState::Done(StopReason::PageCap)
                    } else {
                        PageState::Paginating
                    }
                }
                Err(e) => attempt_failed(attempt, current_page, e, t.retry_backoff).await,
            },
            PageState::Paginating => match portal.has_next_page().await {
                Ok(false) => {
                    log::info!("Next button disabled. Extraction complete.");
                    PageState::Done(StopReason::NoNextPage)
                }
                Ok(true) => match portal.go_to_next_page().await {
                    Ok(()) => {
                        log::info!("Next page ({}) clicked.", current_page + 1);
                        current_page += 1;
                        pause(t.settle).await;
                        PageState::Loading(Attempt::First)
                    }
                    Err(e) => {
                        log::info!("Unable to click Next button ({}). Extraction complete.", e);
                        PageState::Done(StopReason::NextFailed)
                    }
                },
                Err(e) => {
                    log::info!("No Next button found ({}). Extraction complete.", e);
                    PageState::Done(StopReason::NextFailed)
                }
            },
            PageState::Done(reason) => return reason,
        };
    }
}

/// First failure backs off and retries the whole wait-and-read; a second
/// failure abandons the remaining pages.
async fn attempt_failed(
    attempt: Attempt,
    page: u32,
    err: ScrapeError,
    backoff: Duration,
) -> PageState {
    match attempt {
        Attempt::First => {
            log::warn!("Could not extract table data: {}", err);
            pause(backoff).await;
            PageState::Loading(Attempt::Retry)
        }
        Attempt::Retry => {
            log::warn!("Retry failed on page {}: {}", page, err);
            PageState::Done(StopReason::ExtractionFailed)
        }
    }
}

fn commit_page(records: &mut Vec<Record>, read: PageRead, page: u32, attempt: Attempt) {
    records.extend(read.records);
    let prefix = match attempt {
        Attempt::First => "",
        Attempt::Retry => "Retry: ",
    };
    log::info!(
        "{}Extracted {} rows from page {}. Total so far: {}",
        prefix,
        read.rows_seen,
        page,
        records.len()
    );
    if read.stale_skipped > 0 {
        log::warn!("{} stale rows skipped on page {}", read.stale_skipped, page);
    }
}

/// Write a class batch; an empty batch writes nothing.
pub fn export_batch(batch: CategoryBatch, cfg: &ScrapeConfig) -> CategoryOutcome {
    let rows = batch.records.len();
    let file = if batch.records.is_empty() {
        log::warn!("No data extracted for Nice Class {}.", batch.class);
        None
    } else {
        match export::write_batch(&batch.records, &cfg.output_dir, batch.class) {
            Ok(path) => {
                log::info!("Data saved to {}", path.display());
                Some(path)
            }
            Err(e) => {
                log::warn!("Could not save data for Nice Class {}: {}", batch.class, e);
                None
            }
        }
    };

    CategoryOutcome {
        class: batch.class,
        rows,
        pages_read: batch.pages_read,
        stop: batch.stop,
        file,
    }
}

/// Every configured class, in order, each scraped then exported.
pub async fn scrape_all<P: SearchPortal>(portal: &P, cfg: &ScrapeConfig) -> Vec<CategoryOutcome> {
    let mut outcomes = Vec::new();
    for class in cfg.classes.clone() {
        let batch = scrape_category(portal, class, cfg).await;
        outcomes.push(export_batch(batch, cfg));
    }
    outcomes
}

/// Full run: launch Chrome, open the search page, scrape every class, close
/// the browser, then fix column widths in the output directory.
pub async fn run(mode: ConnectionMode, cfg: &ScrapeConfig) -> Result<RunSummary> {
    let started_at = Utc::now();

    let driver = ChromeDriver::new(mode).await?;
    let page = match driver.navigate(&cfg.search_url).await {
        Ok(page) => page,
        Err(e) => {
            close_driver(driver).await;
            return Err(e);
        }
    };
    let portal = EuipoPortal::new(page, cfg.timings.poll_interval);

    if let Err(e) = bootstrap(&portal, cfg).await {
        close_driver(driver).await;
        return Err(e);
    }

    let outcomes = scrape_all(&portal, cfg).await;
    close_driver(driver).await;

    let widths_updated = export::post_process_dir(&cfg.output_dir)?;

    Ok(RunSummary {
        started_at,
        finished_at: Utc::now(),
        outcomes,
        widths_updated,
    })
}

async fn close_driver(driver: ChromeDriver) {
    if let Err(e) = driver.close().await {
        log::warn!("Failed to close browser: {}", e);
    }
}
