//! Catalog CSV decoding. The invoice feeds are semicolon-delimited and
//! arrive in a legacy single-byte encoding; rows that fail to parse are
//! collected into a load report instead of failing the batch.

use std::path::Path;

use chrono::NaiveDateTime;
use serde::Serialize;

use warrec_recon::catalog::Catalog;
use warrec_recon::config::CatalogColumns;
use warrec_recon::model::{CatalogSource, PriceCatalogEntry};
use warrec_recon::money;

use crate::error::IoError;

const CATALOG_DELIMITER: u8 = b';';

/// One rejected row: its physical line number and why it was dropped.
#[derive(Debug, Clone, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

/// Row-level outcome of one catalog load. Rejects are operator-facing
/// diagnostics, not failures.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogLoadReport {
    pub source: CatalogSource,
    pub loaded: usize,
    pub rejected: Vec<RowError>,
}

impl CatalogLoadReport {
    pub fn has_rejects(&self) -> bool {
        !self.rejected.is_empty()
    }
}

/// Decode raw catalog bytes as UTF-8, falling back to Windows-1252 (the
/// feeds are exported from a legacy system). Strips a UTF-8 BOM, including
/// the `ï»¿` mojibake a BOM turns into under the single-byte fallback.
pub fn decode_bytes(bytes: &[u8]) -> String {
    let text = match String::from_utf8(bytes.to_vec()) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    text.trim_start_matches('\u{feff}')
        .trim_start_matches("ï»¿")
        .to_string()
}

/// The two date shapes the feeds use: full timestamps and bare dates.
fn parse_catalog_date(value: &str) -> Result<NaiveDateTime, String> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(|d| d.and_hms_opt(0, 0, 0).expect("midnight"))
        })
        .map_err(|_| format!("cannot parse date '{value}'"))
}

/// Parse one decoded catalog table into a [`Catalog`] plus its load report.
/// A missing required column is fatal; a bad row is not.
pub fn parse_catalog(
    source: CatalogSource,
    columns: &CatalogColumns,
    text: &str,
) -> Result<(Catalog, CatalogLoadReport), IoError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(CATALOG_DELIMITER)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, IoError> {
        headers
            .iter()
            .position(|h| h == name.trim())
            .ok_or_else(|| IoError::MissingColumn {
                table: source.to_string(),
                column: name.into(),
            })
    };

    let part_idx = idx(&columns.part_number)?;
    let price_idx = idx(&columns.price)?;
    let date_idx = idx(&columns.date)?;

    let mut entries = Vec::new();
    let mut rejected = Vec::new();

    for (i, record) in reader.records().enumerate() {
        // Physical line number: 1-based, after the header row
        let row = i + 2;

        let record = match record {
            Ok(r) => r,
            Err(e) => {
                rejected.push(RowError { row, reason: e.to_string() });
                continue;
            }
        };

        let part_number = record.get(part_idx).unwrap_or("").trim().to_string();
        if part_number.is_empty() {
            rejected.push(RowError { row, reason: "missing part number".into() });
            continue;
        }

        let fob_cents = match money::parse_cents(record.get(price_idx).unwrap_or("")) {
            Ok(cents) => cents,
            Err(reason) => {
                rejected.push(RowError { row, reason: format!("price: {reason}") });
                continue;
            }
        };

        let as_of = match parse_catalog_date(record.get(date_idx).unwrap_or("")) {
            Ok(dt) => dt,
            Err(reason) => {
                rejected.push(RowError { row, reason });
                continue;
            }
        };

        entries.push(PriceCatalogEntry { part_number, fob_cents, as_of, source });
    }

    if !rejected.is_empty() {
        log::warn!(
            "{source}: rejected {} of {} row(s) during load",
            rejected.len(),
            rejected.len() + entries.len()
        );
    }

    let report = CatalogLoadReport { source, loaded: entries.len(), rejected };
    Ok((Catalog::new(source, entries), report))
}

/// Read, decode, and parse a catalog from a local file.
pub fn load_catalog_file(
    path: &Path,
    source: CatalogSource,
    columns: &CatalogColumns,
) -> Result<(Catalog, CatalogLoadReport), IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::File {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_catalog(source, columns, &decode_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> CatalogColumns {
        CatalogColumns {
            part_number: "NP".into(),
            price: "FOB".into(),
            date: "Fecha".into(),
        }
    }

    #[test]
    fn parse_basic_catalog() {
        let text = "\
NP;FOB;Fecha
P1;10.00;2024-01-01
P1;12.50;2024-01-10 08:30:00
P2;5.25;2024-01-05
";
        let (catalog, report) = parse_catalog(CatalogSource::CatalogA, &columns(), text).unwrap();
        assert_eq!(catalog.entries.len(), 3);
        assert_eq!(report.loaded, 3);
        assert!(!report.has_rejects());

        // Dedup happens at query time: latest revision of P1 wins
        let index = catalog.latest_per_part();
        assert_eq!(index.get("P1").unwrap().fob_cents, 1250);
        assert_eq!(index.get("P2").unwrap().fob_cents, 525);
    }

    #[test]
    fn bad_date_rejects_row_not_batch() {
        let text = "\
NP;FOB;Fecha
P1;10.00;2024-01-01
P2;5.00;01/02/2024
P3;7.00;not-a-date
";
        let (catalog, report) = parse_catalog(CatalogSource::CatalogB, &columns(), text).unwrap();
        assert_eq!(catalog.entries.len(), 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].row, 3);
        assert!(report.rejected[0].reason.contains("01/02/2024"));
    }

    #[test]
    fn bad_price_and_missing_part_reject() {
        let text = "\
NP;FOB;Fecha
;10.00;2024-01-01
P2;abc;2024-01-05
";
        let (catalog, report) = parse_catalog(CatalogSource::CatalogA, &columns(), text).unwrap();
        assert!(catalog.entries.is_empty());
        assert_eq!(report.rejected.len(), 2);
        assert!(report.rejected[0].reason.contains("missing part number"));
        assert!(report.rejected[1].reason.contains("price"));
    }

    #[test]
    fn missing_column_is_fatal() {
        let text = "NP;Fecha\nP1;2024-01-01\n";
        let err = parse_catalog(CatalogSource::CatalogA, &columns(), text).unwrap_err();
        assert!(err.to_string().contains("'FOB'"));
    }

    #[test]
    fn decode_windows_1252_fallback() {
        // "año" in Windows-1252: 0xF1 is not valid UTF-8
        let bytes = b"NP;FOB;Fecha\na\xF1o;1.00;2024-01-01\n";
        let text = decode_bytes(bytes);
        assert!(text.contains("año"));

        let (catalog, _) = parse_catalog(CatalogSource::CatalogA, &columns(), &text).unwrap();
        assert_eq!(catalog.entries[0].part_number, "año");
    }

    #[test]
    fn decode_strips_bom() {
        let bytes = b"\xEF\xBB\xBFNP;FOB;Fecha\nP1;1.00;2024-01-01\n";
        let text = decode_bytes(bytes);
        assert!(text.starts_with("NP;"));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.csv");
        std::fs::write(&path, "NP;FOB;Fecha\nP1;3.00;2024-02-01\n").unwrap();

        let (catalog, report) =
            load_catalog_file(&path, CatalogSource::CatalogA, &columns()).unwrap();
        assert_eq!(report.loaded, 1);
        assert_eq!(catalog.entries[0].fob_cents, 300);
    }

    #[test]
    fn thousands_separators_in_prices() {
        let text = "NP;FOB;Fecha\nP1;1,234.56;2024-01-01\n";
        let (catalog, _) = parse_catalog(CatalogSource::CatalogA, &columns(), text).unwrap();
        assert_eq!(catalog.entries[0].fob_cents, 123456);
    }
}
