//! Price resolution — assigns each part line its reference (FOB) price
//! from the two catalog windows, with dealer-group-dependent priority.

use crate::catalog::PriceIndex;
use crate::model::{CatalogSource, DealerGroup, PartLineItem, ResolvedPartLineItem};

/// Resolve one part number against both catalog windows.
///
/// Group1 line items prefer CatalogB and fall back to CatalogA; every other
/// group prefers CatalogA and falls back to CatalogB. Returns the winning
/// source and price, or `None` when the part is absent from both windows.
pub fn resolve_price(
    part_number: &str,
    dealer_group: DealerGroup,
    catalog_a: &PriceIndex,
    catalog_b: &PriceIndex,
) -> Option<(CatalogSource, i64)> {
    let (first, second) = if dealer_group == DealerGroup::Group1 {
        (catalog_b, catalog_a)
    } else {
        (catalog_a, catalog_b)
    };

    first
        .get(part_number)
        .or_else(|| second.get(part_number))
        .map(|entry| (entry.source, entry.fob_cents))
}

/// Price the whole ledger. Unresolved parts keep the line with price 0 and
/// an explicit `resolved: false` — a pricing gap is a policy outcome to
/// review, not a row to lose.
pub fn resolve_lines(
    lines: Vec<PartLineItem>,
    catalog_a: &PriceIndex,
    catalog_b: &PriceIndex,
) -> Vec<ResolvedPartLineItem> {
    lines
        .into_iter()
        .map(|line| match resolve_price(&line.part_number, line.dealer_group, catalog_a, catalog_b) {
            Some((source, fob_cents)) => ResolvedPartLineItem {
                claim_amount_cents: line.quantity * fob_cents,
                line,
                resolved: true,
                source: Some(source),
                fob_cents,
            },
            None => {
                log::warn!(
                    "part '{}' (claim {}) not in either catalog window; priced at 0",
                    line.part_number,
                    line.claim_no
                );
                ResolvedPartLineItem {
                    line,
                    resolved: false,
                    source: None,
                    fob_cents: 0,
                    claim_amount_cents: 0,
                }
            }
        })
        .collect()
}
