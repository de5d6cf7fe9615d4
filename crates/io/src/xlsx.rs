//! Claim-extract import and report export.
//!
//! The monthly extract is a spreadsheet with a fixed template: a named
//! worksheet, the header on the second physical row, data from the seventh,
//! and three leading non-data columns. All of that lives in
//! [`ExtractLayout`] — the importer knows nothing about the template beyond
//! what the descriptor says. Header names are matched after whitespace
//! normalization because the template wraps some captions across lines.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::NaiveDate;

use warrec_recon::config::{DealerGroupRules, ExtractLayout};
use warrec_recon::model::{
    AmountSet, ClaimRecord, EvaluationStatus, OperationSlot, PartSlot, ResolvedPartLineItem,
    SettlementReport,
};
use warrec_recon::money;

use crate::csv::RowError;
use crate::error::IoError;

static EMPTY_CELL: Data = Data::Empty;

/// Result of one claim-extract import: the typed wide rows plus the rows
/// that were dropped with a reason.
#[derive(Debug)]
pub struct ExtractImport {
    pub claims: Vec<ClaimRecord>,
    pub skipped_rows: Vec<RowError>,
}

pub fn import_claims(
    path: &Path,
    layout: &ExtractLayout,
    groups: &DealerGroupRules,
) -> Result<ExtractImport, IoError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range(&layout.sheet)
        .map_err(|_| IoError::SheetNotFound(layout.sheet.clone()))?;
    import_from_range(&range, layout, groups)
}

fn normalize_header(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Absolute-column cell access within one data row of the sheet range.
fn cell_at<'r>(row: &'r [Data], start_col: usize, col: usize) -> &'r Data {
    col.checked_sub(start_col)
        .and_then(|i| row.get(i))
        .unwrap_or(&EMPTY_CELL)
}

/// Resolved absolute column indices for every configured column.
struct ResolvedColumns {
    dealer_code: usize,
    claim_no: usize,
    vin: usize,
    model: usize,
    date_sold: usize,
    date_repaired: usize,
    mileage: usize,
    status: usize,
    claimed: [usize; 4],
    remitted: [usize; 4],
    part_slots: Vec<(usize, usize, Option<usize>)>,
    operation_slots: Vec<(usize, usize)>,
    sublets: Vec<usize>,
}

fn import_from_range(
    range: &Range<Data>,
    layout: &ExtractLayout,
    groups: &DealerGroupRules,
) -> Result<ExtractImport, IoError> {
    let (start_row, start_col) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    // First pass: locate the header row and the data region
    let mut header_index: HashMap<String, usize> = HashMap::new();
    let mut data_rows: Vec<(usize, &[Data])> = Vec::new();

    for (i, row) in range.rows().enumerate() {
        let abs = start_row + i;
        if abs == layout.header_row {
            for (j, cell) in row.iter().enumerate() {
                let col = start_col + j;
                if col < layout.skip_columns {
                    continue;
                }
                if let Data::String(s) = cell {
                    let name = normalize_header(s);
                    if !name.is_empty() {
                        // First occurrence wins on duplicate captions
                        header_index.entry(name).or_insert(col);
                    }
                }
            }
        } else if abs >= layout.data_start_row {
            data_rows.push((abs, row));
        }
    }

    if header_index.is_empty() {
        return Err(IoError::Schema(format!(
            "no headers found on row {} of sheet '{}'",
            layout.header_row + 1,
            layout.sheet
        )));
    }

    let cols = resolve_columns(&header_index, layout)?;

    // Second pass: typed rows. A row missing a required field is dropped
    // and reported; the batch carries on.
    let mut claims = Vec::new();
    let mut skipped_rows = Vec::new();

    for (abs, row) in data_rows {
        let cell = |col: usize| cell_at(row, start_col, col);

        // Trailing padding rows are normal in exported workbooks
        let key_cells = [cols.dealer_code, cols.claim_no, cols.date_repaired, cols.status];
        if key_cells.iter().all(|&c| matches!(cell(c), Data::Empty)) {
            continue;
        }

        // 1-based physical row for the operator
        let row_no = abs + 1;
        let mut skip = |reason: &str| {
            skipped_rows.push(RowError { row: row_no, reason: reason.into() });
        };

        let Some(dealer_code) = data_string(cell(cols.dealer_code)) else {
            skip("missing dealer code");
            continue;
        };
        let Some(claim_no) = data_string(cell(cols.claim_no)) else {
            skip("missing claim number");
            continue;
        };
        let Some(date_repaired) = data_date(cell(cols.date_repaired)) else {
            skip("cannot parse repair date");
            continue;
        };
        let Some(status_code) = data_string(cell(cols.status)) else {
            skip("missing evaluation status");
            continue;
        };

        let parts = cols
            .part_slots
            .iter()
            .map(|&(np, qty, price)| PartSlot {
                part_number: data_string(cell(np)),
                quantity: data_int(cell(qty)),
                price_total_cents: price.and_then(|c| data_money_cents(cell(c))),
            })
            .collect();

        let operations = cols
            .operation_slots
            .iter()
            .map(|&(code, hours)| OperationSlot {
                code: data_string(cell(code)),
                hours: data_f64(cell(hours)),
            })
            .collect();

        let sublet_amounts_cents = cols
            .sublets
            .iter()
            .map(|&c| data_money_cents(cell(c)).unwrap_or(0))
            .collect();

        let amounts = |idx: &[usize; 4]| AmountSet {
            parts_cents: data_money_cents(cell(idx[0])).unwrap_or(0),
            labor_cents: data_money_cents(cell(idx[1])).unwrap_or(0),
            sublet_cents: data_money_cents(cell(idx[2])).unwrap_or(0),
            total_cents: data_money_cents(cell(idx[3])).unwrap_or(0),
        };

        claims.push(ClaimRecord {
            dealer_group: groups.classify(&dealer_code),
            dealer_code,
            claim_no,
            vin: data_string(cell(cols.vin)).unwrap_or_default(),
            model: data_string(cell(cols.model)).unwrap_or_default(),
            date_sold: data_date(cell(cols.date_sold)),
            date_repaired,
            mileage: data_int(cell(cols.mileage)),
            status: EvaluationStatus::from_code(&status_code),
            parts,
            operations,
            sublet_amounts_cents,
            claimed: amounts(&cols.claimed),
            remitted: amounts(&cols.remitted),
        });
    }

    if !skipped_rows.is_empty() {
        log::warn!(
            "claim extract: dropped {} of {} data row(s)",
            skipped_rows.len(),
            skipped_rows.len() + claims.len()
        );
    }

    Ok(ExtractImport { claims, skipped_rows })
}

fn resolve_columns(
    header_index: &HashMap<String, usize>,
    layout: &ExtractLayout,
) -> Result<ResolvedColumns, IoError> {
    let col = |name: &str| -> Result<usize, IoError> {
        header_index
            .get(&normalize_header(name))
            .copied()
            .ok_or_else(|| IoError::MissingColumn {
                table: "claim extract".into(),
                column: name.into(),
            })
    };

    let c = &layout.columns;
    Ok(ResolvedColumns {
        dealer_code: col(&c.dealer_code)?,
        claim_no: col(&c.claim_no)?,
        vin: col(&c.vin)?,
        model: col(&c.model)?,
        date_sold: col(&c.date_sold)?,
        date_repaired: col(&c.date_repaired)?,
        mileage: col(&c.mileage)?,
        status: col(&c.status)?,
        claimed: [
            col(&c.claimed_parts)?,
            col(&c.claimed_labor)?,
            col(&c.claimed_sublet)?,
            col(&c.claimed_total)?,
        ],
        remitted: [
            col(&c.remitted_parts)?,
            col(&c.remitted_labor)?,
            col(&c.remitted_sublet)?,
            col(&c.remitted_total)?,
        ],
        part_slots: layout
            .part_slots
            .iter()
            .map(|slot| {
                Ok((
                    col(&slot.part_number)?,
                    col(&slot.quantity)?,
                    slot.price_total.as_deref().map(col).transpose()?,
                ))
            })
            .collect::<Result<_, IoError>>()?,
        operation_slots: layout
            .operation_slots
            .iter()
            .map(|slot| Ok((col(&slot.code)?, col(&slot.hours)?)))
            .collect::<Result<_, IoError>>()?,
        sublets: layout
            .sublet_columns
            .iter()
            .map(|name| col(name))
            .collect::<Result<_, IoError>>()?,
    })
}

// ── Cell coercion ───────────────────────────────────────────────────

fn data_string(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        }
        Data::Float(f) if f.fract() == 0.0 => Some(format!("{}", *f as i64)),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        _ => None,
    }
}

/// Whole-number coercion; fractional and unparseable values become missing.
fn data_int(cell: &Data) -> Option<i64> {
    match cell {
        Data::Int(i) => Some(*i),
        Data::Float(f) if f.fract() == 0.0 => Some(*f as i64),
        Data::String(s) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        }
        _ => None,
    }
}

fn data_f64(cell: &Data) -> Option<f64> {
    match cell {
        Data::Float(f) => Some(*f),
        Data::Int(i) => Some(*i as f64),
        Data::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn data_money_cents(cell: &Data) -> Option<i64> {
    match cell {
        Data::Float(f) => Some((f * 100.0).round() as i64),
        Data::Int(i) => Some(i * 100),
        Data::String(s) => money::parse_cents(s).ok(),
        _ => None,
    }
}

/// Repair/sold dates arrive as `YYYYMMDD` strings or numbers, occasionally
/// as real date cells.
fn data_date(cell: &Data) -> Option<NaiveDate> {
    match cell {
        Data::String(s) => parse_compact_date(s.trim()),
        Data::Int(i) => parse_compact_date(&i.to_string()),
        Data::Float(f) if f.fract() == 0.0 => parse_compact_date(&format!("{}", *f as i64)),
        Data::DateTime(dt) => {
            // Excel serial date: days since 1899-12-30
            let days = dt.as_f64().floor() as i64;
            NaiveDate::from_ymd_opt(1899, 12, 30)
                .and_then(|base| base.checked_add_signed(chrono::Duration::days(days)))
        }
        Data::DateTimeIso(s) => NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn parse_compact_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

// ── Report export ───────────────────────────────────────────────────

/// Write the parts-differences workbook: the full resolved parts ledger on
/// a single sheet, amounts in decimal units.
pub fn export_parts_differences(
    path: &Path,
    lines: &[ResolvedPartLineItem],
) -> Result<(), IoError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Parts Differences")?;

    let headers = [
        "Dealer Group",
        "Dealer Code",
        "Claim No.",
        "VIN",
        "NP",
        "Quantity",
        "FOB",
        "Parts Claim Amount",
        "Resolved",
    ];
    for (c, h) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *h)?;
    }

    for (r, item) in lines.iter().enumerate() {
        let row = r as u32 + 1;
        sheet.write_string(row, 0, item.line.dealer_group.to_string().as_str())?;
        sheet.write_string(row, 1, item.line.dealer_code.as_str())?;
        sheet.write_string(row, 2, item.line.claim_no.as_str())?;
        sheet.write_string(row, 3, item.line.vin.as_str())?;
        sheet.write_string(row, 4, item.line.part_number.as_str())?;
        sheet.write_number(row, 5, item.line.quantity as f64)?;
        sheet.write_number(row, 6, item.fob_cents as f64 / 100.0)?;
        sheet.write_number(row, 7, item.claim_amount_cents as f64 / 100.0)?;
        sheet.write_boolean(row, 8, item.resolved)?;
    }

    workbook.save(path)?;
    Ok(())
}

/// Write the settlement-payment workbook: one sheet of payable lines.
pub fn export_settlement(path: &Path, report: &SettlementReport) -> Result<(), IoError> {
    let mut workbook = rust_xlsxwriter::Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Settlement Payment")?;

    let headers = [
        "Dealer Code",
        "Claim No.",
        "VIN",
        "Parts Claim Amount",
        "Labor Remittance (50%)",
        "Sublet Remittance",
        "Total Claim Amount",
    ];
    for (c, h) in headers.iter().enumerate() {
        sheet.write_string(0, c as u16, *h)?;
    }

    for (r, line) in report.lines.iter().enumerate() {
        let row = r as u32 + 1;
        sheet.write_string(row, 0, line.dealer_code.as_str())?;
        sheet.write_string(row, 1, line.claim_no.as_str())?;
        sheet.write_string(row, 2, line.vin.as_str())?;
        sheet.write_number(row, 3, line.resolved_parts_cents as f64 / 100.0)?;
        sheet.write_number(row, 4, line.labor_half_cents as f64 / 100.0)?;
        sheet.write_number(row, 5, line.sublet_cents as f64 / 100.0)?;
        sheet.write_number(row, 6, line.total_payable_cents as f64 / 100.0)?;
    }

    workbook.save(path)?;
    Ok(())
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use warrec_recon::config::{ClaimColumns, OperationColumns, SlotColumns};
    use warrec_recon::model::{DealerGroup, PartLineItem, SettlementLine};

    /// Compact two-slot layout used by the tests: junk title row, header on
    /// row 1, a note row, data from row 3, one leading non-data column.
    fn test_layout() -> ExtractLayout {
        ExtractLayout {
            sheet: "Claims".into(),
            header_row: 1,
            data_start_row: 3,
            skip_columns: 1,
            columns: ClaimColumns {
                dealer_code: "Dealer".into(),
                claim_no: "Claim".into(),
                vin: "VIN".into(),
                model: "Model".into(),
                date_sold: "Sold".into(),
                date_repaired: "Repaired".into(),
                mileage: "Mileage".into(),
                status: "Status".into(),
                claimed_parts: "Cl Parts".into(),
                claimed_labor: "Cl Labor".into(),
                claimed_sublet: "Cl Sublet".into(),
                claimed_total: "Cl Total".into(),
                remitted_parts: "Rm Parts".into(),
                remitted_labor: "Rm Labor".into(),
                remitted_sublet: "Rm Sublet".into(),
                remitted_total: "Rm Total".into(),
            },
            part_slots: vec![
                SlotColumns {
                    part_number: "NP (A)".into(),
                    quantity: "Qty (A)".into(),
                    price_total: None,
                },
                SlotColumns {
                    part_number: "NP (B)".into(),
                    quantity: "Qty (B)".into(),
                    price_total: None,
                },
            ],
            operation_slots: vec![OperationColumns {
                code: "Op Code".into(),
                hours: "Op Hours".into(),
            }],
            sublet_columns: vec!["Sublet A".into()],
        }
    }

    const TEST_HEADERS: [&str; 23] = [
        "Dealer", "Claim", "VIN", "Model", "Sold", "Repaired", "Mileage", "Status", "Cl Parts",
        "Cl Labor", "Cl Sublet", "Cl Total", "Rm Parts", "Rm Labor", "Rm Sublet", "Rm Total",
        "NP (A)", "Qty (A)", "NP (B)", "Qty (B)", "Op Code", "Op Hours", "Sublet A",
    ];

    fn write_test_extract(path: &Path) {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Claims").unwrap();

        sheet.write_string(0, 0, "MONTHLY WARRANTY EXTRACT").unwrap();
        for (i, h) in TEST_HEADERS.iter().enumerate() {
            // One leading non-data column, then the mapped columns
            sheet.write_string(1, (i + 1) as u16, *h).unwrap();
        }
        sheet.write_string(2, 1, "do not fill below this line").unwrap();

        // Data row: header captions wrap in the real template, so exercise
        // the whitespace-normalized matching with a multi-line caption too.
        let row = 3u32;
        sheet.write_string(row, 1, "2041N").unwrap();
        sheet.write_string(row, 2, "C1").unwrap();
        sheet.write_string(row, 3, "VIN001").unwrap();
        sheet.write_string(row, 4, "MX5").unwrap();
        sheet.write_string(row, 5, "20231101").unwrap();
        sheet.write_number(row, 6, 20240315.0).unwrap();
        sheet.write_number(row, 7, 12000.0).unwrap();
        sheet.write_string(row, 8, "4").unwrap();
        sheet.write_number(row, 9, 100.50).unwrap(); // claimed parts
        sheet.write_number(row, 10, 40.0).unwrap();
        sheet.write_number(row, 11, 0.0).unwrap();
        sheet.write_number(row, 12, 140.50).unwrap();
        sheet.write_number(row, 13, 95.0).unwrap(); // remitted parts
        sheet.write_number(row, 14, 40.0).unwrap();
        sheet.write_number(row, 15, 0.0).unwrap();
        sheet.write_number(row, 16, 135.0).unwrap();
        sheet.write_string(row, 17, "P1").unwrap();
        sheet.write_number(row, 18, 2.0).unwrap();
        sheet.write_string(row, 19, "P2").unwrap();
        sheet.write_string(row, 20, "n/a").unwrap(); // unparseable quantity
        sheet.write_string(row, 21, "OP1").unwrap();
        sheet.write_number(row, 22, 1.5).unwrap();
        sheet.write_number(row, 23, 10.0).unwrap();

        // Row with a claim number but no repair date: dropped with a reason
        sheet.write_string(4, 1, "3010C").unwrap();
        sheet.write_string(4, 2, "C2").unwrap();
        sheet.write_string(4, 6, "??").unwrap();
        sheet.write_string(4, 8, "3").unwrap();

        workbook.save(path).unwrap();
    }

    #[test]
    fn import_typed_claims() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.xlsx");
        write_test_extract(&path);

        let import =
            import_claims(&path, &test_layout(), &DealerGroupRules::default()).unwrap();
        assert_eq!(import.claims.len(), 1);
        assert_eq!(import.skipped_rows.len(), 1);
        assert_eq!(import.skipped_rows[0].row, 5);
        assert!(import.skipped_rows[0].reason.contains("repair date"));

        let claim = &import.claims[0];
        assert_eq!(claim.dealer_code, "2041N");
        assert_eq!(claim.dealer_group, DealerGroup::Group1);
        assert_eq!(claim.claim_no, "C1");
        assert_eq!(
            claim.date_repaired,
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
        );
        assert_eq!(claim.date_sold, Some(NaiveDate::from_ymd_opt(2023, 11, 1).unwrap()));
        assert_eq!(claim.mileage, Some(12000));
        assert_eq!(claim.status, EvaluationStatus::Approve);
        assert_eq!(claim.claimed.parts_cents, 10050);
        assert_eq!(claim.claimed.total_cents, 14050);
        assert_eq!(claim.remitted.parts_cents, 9500);

        assert_eq!(claim.parts.len(), 2);
        assert_eq!(claim.parts[0].part_number.as_deref(), Some("P1"));
        assert_eq!(claim.parts[0].quantity, Some(2));
        // "n/a" quantity coerces to missing, not an error
        assert_eq!(claim.parts[1].part_number.as_deref(), Some("P2"));
        assert_eq!(claim.parts[1].quantity, None);

        assert_eq!(claim.operations[0].code.as_deref(), Some("OP1"));
        assert_eq!(claim.operations[0].hours, Some(1.5));
        assert_eq!(claim.sublet_amounts_cents, vec![1000]);
    }

    #[test]
    fn missing_required_column_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.xlsx");
        write_test_extract(&path);

        let mut layout = test_layout();
        layout.columns.status = "Evaluation Results*".into();
        let err = import_claims(&path, &layout, &DealerGroupRules::default()).unwrap_err();
        match err {
            IoError::MissingColumn { column, .. } => {
                assert_eq!(column, "Evaluation Results*");
            }
            other => panic!("expected MissingColumn, got: {other}"),
        }
    }

    #[test]
    fn unknown_sheet_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("extract.xlsx");
        write_test_extract(&path);

        let mut layout = test_layout();
        layout.sheet = "NoSuchSheet".into();
        let err = import_claims(&path, &layout, &DealerGroupRules::default()).unwrap_err();
        assert!(matches!(err, IoError::SheetNotFound(_)));
    }

    #[test]
    fn header_normalization_handles_wrapped_captions() {
        assert_eq!(normalize_header("Parts Price\nTotal (A)"), "Parts Price Total (A)");
        assert_eq!(normalize_header("Part  No. (A)"), "Part No. (A)");
        assert_eq!(normalize_header("  VIN  "), "VIN");
    }

    #[test]
    fn export_settlement_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settlement.xlsx");

        let report = SettlementReport {
            dealer_group: DealerGroup::Group1,
            lines: vec![SettlementLine {
                dealer_code: "2041N".into(),
                claim_no: "C1".into(),
                vin: "VIN001".into(),
                resolved_parts_cents: 28_000,
                labor_half_cents: 5_000,
                sublet_cents: 2_500,
                total_payable_cents: 35_500,
            }],
            total_payable_cents: 35_500,
            amount_recognized_cents: 40_000,
        };
        export_settlement(&path, &report).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Settlement Payment").unwrap();
        assert_eq!(
            range.get_value((0, 0)),
            Some(&Data::String("Dealer Code".into()))
        );
        assert_eq!(range.get_value((1, 1)), Some(&Data::String("C1".into())));
        assert_eq!(range.get_value((1, 6)), Some(&Data::Float(355.0)));
    }

    #[test]
    fn export_parts_differences_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("differences.xlsx");

        let lines = vec![ResolvedPartLineItem {
            line: PartLineItem {
                dealer_code: "2041N".into(),
                dealer_group: DealerGroup::Group1,
                claim_no: "C1".into(),
                vin: "VIN001".into(),
                part_number: "P1".into(),
                quantity: 3,
            },
            resolved: true,
            source: Some(warrec_recon::model::CatalogSource::CatalogB),
            fob_cents: 1_200,
            claim_amount_cents: 3_600,
        }];
        export_parts_differences(&path, &lines).unwrap();

        let mut workbook = open_workbook_auto(&path).unwrap();
        let range = workbook.worksheet_range("Parts Differences").unwrap();
        assert_eq!(range.get_value((1, 4)), Some(&Data::String("P1".into())));
        assert_eq!(range.get_value((1, 6)), Some(&Data::Float(12.0)));
        assert_eq!(range.get_value((1, 8)), Some(&Data::Bool(true)));
    }
}
