//! `SearchPortal` over the EUIPO harmonised-terms search page.
//!
//! All selector strings and the page-indicator script live here.

use super::wait::poll_until;
use crate::error::{Result, ScrapeError};
use crate::portal::{indicator_matches, next_available, page_marker, PageRead, SearchPortal};
use crate::record::{RawCell, MIN_CELLS};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use std::time::Duration;

const DISCLAIMER_BUTTON: &str = "button.btn-primary";
const DISCLAIMER_LABEL: &str = "Close";
const JURISDICTION_CHECKBOX: &str = "#id_officeIN";
const CLASS_INPUT: &str = "#niceClass";
const SEARCH_BUTTON: &str = "#proceed";
const RESULTS_TABLE: &str = "#advancedsearch_table";
const RESULT_ROWS: &str = "tbody > tr";
const NEXT_CONTROL: &str = "#listSource_table_next";

/// Text of the first paragraph that starts with "Page ", or null.
const PAGE_INDICATOR_JS: &str = r#"(() => {
    for (const p of document.querySelectorAll('p')) {
        const text = p.textContent || '';
        if (text.startsWith('Page ')) {
            return text;
        }
    }
    return null;
})()"#;

/// The close button is matched on its exact text, surrounding whitespace included.
fn is_disclaimer_label(label: &str) -> bool {
    label == DISCLAIMER_LABEL
}

pub struct EuipoPortal {
    page: Page,
    poll_interval: Duration,
}

impl EuipoPortal {
    pub fn new(page: Page, poll_interval: Duration) -> Self {
        Self {
            page,
            poll_interval,
        }
    }

    async fn wait_for_element(&self, selector: &str, timeout: Duration) -> Result<Element> {
        poll_until(selector, timeout, self.poll_interval, || async {
            Ok(self.page.find_element(selector).await.ok())
        })
        .await
    }

    async fn find_disclaimer_button(&self) -> Result<Option<Element>> {
        for el in self.page.find_elements(DISCLAIMER_BUTTON).await? {
            let label = el.inner_text().await?.unwrap_or_default();
            if is_disclaimer_label(&label) {
                return Ok(Some(el));
            }
        }
        Ok(None)
    }

    async fn indicator_shows(&self, page: u32) -> Result<Option<()>> {
        Ok(self
            .page_indicator()
            .await?
            .filter(|text| indicator_matches(text, page))
            .map(|_| ()))
    }

    async fn page_indicator(&self) -> Result<Option<String>> {
        let result = self.page.evaluate(PAGE_INDICATOR_JS).await?;
        result
            .into_value::<Option<String>>()
            .map_err(|e| ScrapeError::Other(format!("Unexpected page indicator value: {}", e)))
    }

    async fn read_row(row: &Element) -> Result<Option<Vec<RawCell>>> {
        let tds = row.find_elements("td").await?;
        if tds.len() < MIN_CELLS {
            return Ok(None);
        }

        let mut cells = Vec::with_capacity(tds.len());
        for td in &tds {
            let text = td.inner_text().await?.unwrap_or_default();
            let html = td.inner_html().await?.unwrap_or_default();
            cells.push(RawCell::new(text, html));
        }
        Ok(Some(cells))
    }
}

impl SearchPortal for EuipoPortal {
    async fn dismiss_disclaimer(&self, timeout: Duration) -> Result<()> {
        let button = poll_until("disclaimer Close button", timeout, self.poll_interval, || {
            self.find_disclaimer_button()
        })
        .await?;

        button
            .click()
            .await
            .map_err(|_| ScrapeError::NotInteractable(DISCLAIMER_BUTTON.to_string()))?;
        Ok(())
    }

    async fn select_jurisdiction(&self, timeout: Duration) -> Result<()> {
        let checkbox = self.wait_for_element(JURISDICTION_CHECKBOX, timeout).await?;

        let checked = checkbox
            .property("checked")
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        if !checked {
            checkbox
                .click()
                .await
                .map_err(|_| ScrapeError::NotInteractable(JURISDICTION_CHECKBOX.to_string()))?;
        }
        Ok(())
    }

    async fn set_category(&self, class: u8, timeout: Duration) -> Result<()> {
        let input = self.wait_for_element(CLASS_INPUT, timeout).await?;

        input
            .call_js_fn("function() { this.value = ''; }", false)
            .await?;
        input
            .focus()
            .await
            .map_err(|_| ScrapeError::NotInteractable(CLASS_INPUT.to_string()))?;
        input
            .type_str(class.to_string())
            .await
            .map_err(|_| ScrapeError::NotInteractable(CLASS_INPUT.to_string()))?;
        Ok(())
    }

    async fn submit_search(&self, timeout: Duration) -> Result<()> {
        let button = self.wait_for_element(SEARCH_BUTTON, timeout).await?;
        button
            .click()
            .await
            .map_err(|_| ScrapeError::NotInteractable(SEARCH_BUTTON.to_string()))?;
        Ok(())
    }

    async fn wait_for_page(&self, page: u32, timeout: Duration) -> Result<()> {
        self.wait_for_element(RESULTS_TABLE, timeout).await?;

        let marker = page_marker(page);
        poll_until(&marker, timeout, self.poll_interval, || self.indicator_shows(page)).await
    }

    async fn read_current_page(&self) -> Result<PageRead> {
        let table = self
            .page
            .find_element(RESULTS_TABLE)
            .await
            .map_err(|_| ScrapeError::ElementNotFound(RESULTS_TABLE.to_string()))?;
        let rows = table.find_elements(RESULT_ROWS).await?;

        let mut read = PageRead::default();
        for row in &rows {
            read.push_row(Self::read_row(row).await)?;
        }

        Ok(read)
    }

    async fn has_next_page(&self) -> Result<bool> {
        let control = self
            .page
            .find_element(NEXT_CONTROL)
            .await
            .map_err(|_| ScrapeError::ElementNotFound(NEXT_CONTROL.to_string()))?;
        let links = control.find_elements("a").await?;
        let class_attr = control.attribute("class").await?;

        Ok(next_available(links.len(), class_attr.as_deref()))
    }

    async fn go_to_next_page(&self) -> Result<()> {
        let control = self
            .page
            .find_element(NEXT_CONTROL)
            .await
            .map_err(|_| ScrapeError::ElementNotFound(NEXT_CONTROL.to_string()))?;
        let link = control
            .find_elements("a")
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScrapeError::ElementNotFound(format!("{} a", NEXT_CONTROL)))?;

        link.click()
            .await
            .map_err(|_| ScrapeError::NotInteractable(format!("{} a", NEXT_CONTROL)))?;
        Ok(())
    }
}
