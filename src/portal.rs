//! Page-object seam between the scraping loop and the search page markup.
//!
//! The pipeline only speaks in these semantic operations; everything that
//! knows element ids, CSS classes, or icon paths lives in the implementation
//! (`browser::euipo::EuipoPortal`). Tests drive the pipeline with fakes.

use crate::error::Result;
use crate::record::{RawCell, Record};
use std::time::Duration;

/// Rows taken from one results page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageRead {
    pub records: Vec<Record>,
    /// `<tr>` elements seen, including short and stale ones.
    pub rows_seen: usize,
    pub stale_skipped: usize,
}

impl PageRead {
    /// Fold one row read into the page. Short rows are counted but produce no
    /// record; a stale row is skipped; any other error fails the whole page.
    pub fn push_row(&mut self, row: Result<Option<Vec<RawCell>>>) -> Result<()> {
        self.rows_seen += 1;
        match row {
            Ok(Some(cells)) => {
                if let Some(record) = Record::from_cells(&cells) {
                    self.records.push(record);
                }
            }
            Ok(None) => {}
            Err(e) if e.is_stale() => {
                log::warn!("Stale row detected, skipping row.");
                self.stale_skipped += 1;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}

/// Fold every row read of a page, stopping at the first non-stale error.
pub fn collect_rows<I>(rows: I) -> Result<PageRead>
where
    I: IntoIterator<Item = Result<Option<Vec<RawCell>>>>,
{
    let mut read = PageRead::default();
    for row in rows {
        read.push_row(row)?;
    }
    Ok(read)
}

#[allow(async_fn_in_trait)]
pub trait SearchPortal {
    /// Close the disclaimer modal if it shows up within `timeout`.
    async fn dismiss_disclaimer(&self, timeout: Duration) -> Result<()>;

    /// Tick the jurisdiction office checkbox (no-op when already ticked).
    async fn select_jurisdiction(&self, timeout: Duration) -> Result<()>;

    /// Replace the class filter input with `class`.
    async fn set_category(&self, class: u8, timeout: Duration) -> Result<()>;

    async fn submit_search(&self, timeout: Duration) -> Result<()>;

    /// Wait for the results table and for the indicator to read `Page {page} of`.
    async fn wait_for_page(&self, page: u32, timeout: Duration) -> Result<()>;

    async fn read_current_page(&self) -> Result<PageRead>;

    /// `Ok(false)` when the next control is present but disabled or has no link.
    async fn has_next_page(&self) -> Result<bool>;

    async fn go_to_next_page(&self) -> Result<()>;
}

/// Text the page indicator must contain before page `page` is trusted.
pub fn page_marker(page: u32) -> String {
    format!("Page {} of", page)
}

pub fn indicator_matches(indicator: &str, page: u32) -> bool {
    indicator.contains(&page_marker(page))
}

/// The next control counts as usable only with a link and without a
/// `disabled` class.
pub fn next_available(link_count: usize, class_attr: Option<&str>) -> bool {
    link_count > 0 && !class_attr.is_some_and(|c| c.contains("disabled"))
}
