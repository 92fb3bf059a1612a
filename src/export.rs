//! Downloadable reports over the export set.
//!
//! Exports always cover the full filtered collection, never the page
//! slice currently displayed. Column order and headers are fixed per
//! entity (`Entity::export_columns`). Missing fields become empty CSV
//! cells or placeholder PDF cells.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tracing::info;

use crate::models::Record;

/// Supported report formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Pdf,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Pdf => "pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_str()
    }
}

/// Write the export set as CSV with the screen's fixed columns.
pub fn write_csv<W: Write>(
    writer: W,
    columns: &[(&str, &str)],
    records: &[Record],
) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer.write_record(columns.iter().map(|(_, header)| *header))?;
    for record in records {
        csv_writer.write_record(
            columns
                .iter()
                .map(|(field, _)| record.text(field).unwrap_or_default()),
        )?;
    }
    csv_writer.flush()?;
    Ok(())
}

// A4 layout constants for the PDF table report.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const LINE_HEIGHT: i64 = 14;
const ROWS_PER_PAGE: usize = 52;

/// Write the export set as a PDF table report: a title, a header row, and
/// one row per record, split across pages as needed.
pub fn write_pdf(
    path: &Path,
    title: &str,
    columns: &[(&str, &str)],
    records: &[Record],
) -> Result<()> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let header_line = columns
        .iter()
        .map(|(_, header)| *header)
        .collect::<Vec<_>>()
        .join(" | ");
    let rows: Vec<String> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|(field, _)| record.display(field))
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect();

    let mut kids = Vec::new();
    let empty: &[String] = &[];
    let chunks: Vec<&[String]> = if rows.is_empty() {
        vec![empty]
    } else {
        rows.chunks(ROWS_PER_PAGE).collect()
    };

    for (page_index, chunk) in chunks.iter().enumerate() {
        let mut operations = Vec::new();
        let mut y = PAGE_HEIGHT - MARGIN;

        if page_index == 0 {
            operations.extend(text_line(title, 14, MARGIN, y));
            y -= 2 * LINE_HEIGHT;
        }
        operations.extend(text_line(&header_line, 10, MARGIN, y));
        y -= LINE_HEIGHT;

        for row in chunk.iter() {
            operations.extend(text_line(row, 9, MARGIN, y));
            y -= LINE_HEIGHT;
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().context("Failed to encode PDF page content")?,
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();
    doc.save(path)
        .with_context(|| format!("Failed to write PDF report: {}", path.display()))?;
    Ok(())
}

fn text_line(text: &str, size: i64, x: i64, y: i64) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// Write the export set to `path` in the requested format.
pub fn export_to_path(
    format: ExportFormat,
    path: &Path,
    title: &str,
    columns: &[(&str, &str)],
    records: &[Record],
) -> Result<()> {
    match format {
        ExportFormat::Csv => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Cannot create export file: {}", path.display()))?;
            write_csv(file, columns, records)?;
        }
        ExportFormat::Pdf => write_pdf(path, title, columns, records)?,
    }
    info!("Exported {} records to {}", records.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const COLUMNS: &[(&str, &str)] = &[
        ("name", "Name"),
        ("email", "Email"),
        ("state", "State"),
    ];

    fn records() -> Vec<Record> {
        vec![
            Record::from_value(json!({
                "name": "Asha",
                "email": "asha@example.com",
                "state": "UP",
            }))
            .unwrap(),
            Record::from_value(json!({ "name": "Ravi", "email": null })).unwrap(),
        ]
    }

    #[test]
    fn test_csv_has_fixed_headers_and_blank_missing_cells() {
        let mut output = Vec::new();
        write_csv(&mut output, COLUMNS, &records()).unwrap();
        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Name,Email,State");
        assert_eq!(lines[1], "Asha,asha@example.com,UP");
        assert_eq!(lines[2], "Ravi,,");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_csv_of_empty_export_set_is_header_only() {
        let mut output = Vec::new();
        write_csv(&mut output, COLUMNS, &[]).unwrap();
        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn test_pdf_report_is_loadable_and_paged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("leads.pdf");

        let many: Vec<Record> = (0..120)
            .map(|i| Record::from_value(json!({ "name": format!("r{}", i) })).unwrap())
            .collect();
        write_pdf(&path, "Admission Leads", COLUMNS, &many).unwrap();

        let doc = Document::load(&path).unwrap();
        assert!(doc.get_pages().len() >= 2);
    }

    #[test]
    fn test_pdf_of_empty_export_set_still_has_one_page() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.pdf");
        write_pdf(&path, "Enquiries", COLUMNS, &[]).unwrap();

        let doc = Document::load(&path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }
}
