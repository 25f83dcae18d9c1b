//! Scraped term rows
//!
//! A results-table row is read as raw cells (visible text plus inner markup)
//! and mapped to a [`Record`] by fixed column index.

use serde::Serialize;

/// Substituted for a cell's text when the cell renders the tick icon.
pub const TICK_SENTINEL: &str = "✓";

/// Image path the portal uses for the tick icon.
pub const TICK_ICON_PATH: &str = "/ec2/static/images/tick.png";

/// Output column order.
pub const COLUMNS: [&str; 9] = [
    "Class",
    "Term",
    "Harmonised",
    "CGPDTM",
    "Harm",
    "Nice",
    "IDli",
    "Grou",
    "MGS",
];

/// Rows with fewer cells are layout rows (headers, "no results" banners).
pub const MIN_CELLS: usize = 10;

/// One `<td>` as read from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCell {
    pub text: String,
    pub html: String,
}

impl RawCell {
    pub fn new(text: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            html: html.into(),
        }
    }

    /// Plain-text cell whose markup is the text itself.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            html: text.clone(),
            text,
        }
    }

    fn trimmed(&self) -> String {
        self.text.trim().to_string()
    }

    /// Tick sentinel if the markup references the tick icon, else the trimmed text.
    fn tick_or_text(&self) -> String {
        if self.html.contains(TICK_ICON_PATH) {
            TICK_SENTINEL.to_string()
        } else {
            self.trimmed()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    pub class: String,
    pub term: String,
    pub harmonised: String,
    #[serde(rename = "CGPDTM")]
    pub cgpdtm: String,
    pub harm: String,
    pub nice: String,
    #[serde(rename = "IDli")]
    pub idli: String,
    pub grou: String,
    #[serde(rename = "MGS")]
    pub mgs: String,
}

impl Record {
    /// Maps a results row. Cell 0 is the row selector column and is ignored.
    pub fn from_cells(cells: &[RawCell]) -> Option<Self> {
        if cells.len() < MIN_CELLS {
            return None;
        }

        Some(Self {
            class: cells[1].trimmed(),
            term: cells[2].trimmed(),
            harmonised: cells[3].tick_or_text(),
            cgpdtm: cells[4].tick_or_text(),
            harm: cells[5].trimmed(),
            nice: cells[6].trimmed(),
            idli: cells[7].trimmed(),
            grou: cells[8].trimmed(),
            mgs: cells[9].trimmed(),
        })
    }

    /// Field values in [`COLUMNS`] order.
    pub fn values(&self) -> [&str; 9] {
        [
            &self.class,
            &self.term,
            &self.harmonised,
            &self.cgpdtm,
            &self.harm,
            &self.nice,
            &self.idli,
            &self.grou,
            &self.mgs,
        ]
    }
}
