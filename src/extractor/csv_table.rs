// CSV files rendered as an aligned text table with a row index column

use anyhow::{Context, Result, bail};
use std::path::Path;

const COLUMN_GAP: &str = "  ";

/// Parse a CSV file whose first row is the header.
///
/// Short rows are padded with empty cells. A row with more fields than the
/// header is rejected.
pub(super) fn extract_csv(path: &Path) -> Result<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context("Failed to open CSV file")?;

    let headers: Vec<String> = reader
        .headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.context("Malformed CSV row")?;
        if record.len() > headers.len() {
            bail!(
                "CSV row {} has {} fields, but the header has {}",
                rows.len(),
                record.len(),
                headers.len()
            );
        }
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    Ok(render_table(&headers, &rows))
}

/// Header line, then one line per row prefixed by its zero-based index.
/// The index is left aligned, every other column right aligned.
pub(super) fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    if headers.is_empty() {
        return String::new();
    }

    let index_width = rows.len().saturating_sub(1).to_string().len();
    let index_width = if rows.is_empty() { 0 } else { index_width };

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(column, header)| {
            rows.iter()
                .filter_map(|row| row.get(column))
                .map(|cell| cell.chars().count())
                .chain(std::iter::once(header.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut lines = Vec::with_capacity(rows.len() + 1);

    let header_cells = std::iter::once(" ".repeat(index_width)).chain(
        headers
            .iter()
            .zip(&widths)
            .map(|(header, width)| format!("{:>width$}", header, width = *width)),
    );
    lines.push(header_cells.collect::<Vec<_>>().join(COLUMN_GAP).trim_end().to_string());

    for (index, row) in rows.iter().enumerate() {
        let cells = std::iter::once(format!("{:<width$}", index, width = index_width)).chain(
            widths.iter().enumerate().map(|(column, width)| {
                let cell = row.get(column).map_or("", String::as_str);
                format!("{:>width$}", cell, width = *width)
            }),
        );
        lines.push(cells.collect::<Vec<_>>().join(COLUMN_GAP).trim_end().to_string());
    }

    lines.join("\n")
}
