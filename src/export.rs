//! Spreadsheet output
//!
//! One xlsx file per class, plus a second pass that reopens every output file
//! in a directory and sets column widths by header text.

use crate::config::{column_width, OUTPUT_EXTENSION, OUTPUT_PREFIX};
use crate::error::{Result, ScrapeError};
use crate::record::{Record, COLUMNS};
use calamine::{open_workbook, Data, Range, Reader, Xlsx};
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const DEFAULT_SHEET: &str = "Sheet1";

/// `Indian_Trademark_Class{class}.xlsx`
pub fn output_file_name(class: u8) -> String {
    format!("{}{}.{}", OUTPUT_PREFIX, class, OUTPUT_EXTENSION)
}

pub fn is_output_file_name(name: &str) -> bool {
    name.starts_with(OUTPUT_PREFIX) && name.ends_with(&format!(".{}", OUTPUT_EXTENSION))
}

/// Write `records` under `dir` as the file for `class`, replacing any
/// previous file of that name.
pub fn write_batch(records: &[Record], dir: &Path, class: u8) -> Result<PathBuf> {
    let path = dir.join(output_file_name(class));

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(DEFAULT_SHEET)?;

    for (col, header) in COLUMNS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as ColNum, *header, &header_format)?;
    }

    for (i, record) in records.iter().enumerate() {
        let row = (i + 1) as RowNum;
        for (col, value) in record.values().iter().enumerate() {
            worksheet.write_string(row, col as ColNum, *value)?;
        }
    }

    workbook.save(&path)?;
    Ok(path)
}

/// Columns (zero-based) whose header has a configured width.
pub fn plan_column_widths<S: AsRef<str>>(headers: &[S]) -> Vec<(ColNum, f64)> {
    headers
        .iter()
        .enumerate()
        .filter_map(|(col, header)| column_width(header.as_ref()).map(|w| (col as ColNum, w)))
        .collect()
}

/// Rewrite the file at `path` in place with the width table applied to its
/// first sheet. Cell values and the sheet name are carried over unchanged.
pub fn apply_column_widths(path: &Path) -> Result<Vec<(ColNum, f64)>> {
    let (sheet_name, range) = read_first_sheet(path)?;
    let (first_row, first_col) = range.start().unwrap_or((0, 0));

    let headers: Vec<String> = range
        .rows()
        .next()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .unwrap_or_default();

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&sheet_name)?;

    for (r, row) in range.rows().enumerate() {
        let row_num = first_row + r as RowNum;
        for (c, cell) in row.iter().enumerate() {
            let col_num = (first_col as usize + c) as ColNum;
            let format = (r == 0).then_some(&header_format);
            write_cell(worksheet, row_num, col_num, cell, format)?;
        }
    }

    let widths: Vec<(ColNum, f64)> = plan_column_widths(&headers)
        .into_iter()
        .map(|(col, width)| (col + first_col as ColNum, width))
        .collect();
    for (col, width) in &widths {
        worksheet.set_column_width(*col, *width)?;
    }

    workbook.save(path)?;
    Ok(widths)
}

/// Apply column widths to every output file directly inside `dir`.
/// Returns the files updated, in name order.
pub fn post_process_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_output_file_name))
        .map(|entry| entry.into_path())
        .collect();

    for path in &files {
        apply_column_widths(path)?;
        log::info!(
            "Updated column widths in {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );
    }

    Ok(files)
}

/// Header row and data of the first worksheet, as written by `write_batch`.
pub fn read_first_sheet(path: &Path) -> Result<(String, Range<Data>)> {
    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| ScrapeError::WorkbookRead(format!("{}: {}", path.display(), e)))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .unwrap_or_else(|| DEFAULT_SHEET.to_string());

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ScrapeError::WorkbookRead(format!("{}: no worksheets", path.display())))?
        .map_err(|e| ScrapeError::WorkbookRead(format!("{}: {}", path.display(), e)))?;

    Ok((sheet_name, range))
}

fn write_cell(
    worksheet: &mut Worksheet,
    row: RowNum,
    col: ColNum,
    cell: &Data,
    format: Option<&Format>,
) -> Result<()> {
    match (cell, format) {
        (Data::Empty, _) => {}
        (Data::String(s), Some(f)) => {
            worksheet.write_string_with_format(row, col, s.as_str(), f)?;
        }
        (Data::String(s), None) => {
            worksheet.write_string(row, col, s.as_str())?;
        }
        (Data::Float(n), _) => {
            worksheet.write_number(row, col, *n)?;
        }
        (Data::Int(n), _) => {
            worksheet.write_number(row, col, *n as f64)?;
        }
        (Data::Bool(b), _) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        (other, _) => {
            worksheet.write_string(row, col, other.to_string())?;
        }
    }
    Ok(())
}
