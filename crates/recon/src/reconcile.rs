//! Parts-level reconciliation — bottom-up resolved parts totals per claim
//! against the payer's stated parts remittance.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    ClaimKey, ClaimPartsDifference, ClaimRecord, PartsReconciliation, ResolvedPartLineItem,
};

/// Compare, per approved claim, the sum of resolved part-line amounts with
/// the claim's reported Parts Remittance Amount.
///
/// Claims enter the comparison only when they contributed at least one part
/// line; a claim with no surviving part slots has nothing to reconcile
/// bottom-up. The detail drill-down carries the part lines of every claim
/// whose difference is non-zero — a diagnostic view, not a filter applied
/// anywhere else.
pub fn parts_reconciliation(
    claims: &[ClaimRecord],
    resolved: &[ResolvedPartLineItem],
) -> PartsReconciliation {
    // Bottom-up: resolved parts total per owning claim
    let mut resolved_totals: BTreeMap<ClaimKey, i64> = BTreeMap::new();
    for item in resolved {
        let key = ClaimKey {
            dealer_code: item.line.dealer_code.clone(),
            claim_no: item.line.claim_no.clone(),
        };
        *resolved_totals.entry(key).or_insert(0) += item.claim_amount_cents;
    }

    // Top-down: the claim's own reported figure, joined on (dealer, claim_no)
    let claims_by_key: BTreeMap<ClaimKey, &ClaimRecord> =
        claims.iter().map(|c| (c.key(), c)).collect();

    let mut rows = Vec::new();
    let mut total_difference = 0i64;
    let mut off_claims: BTreeSet<ClaimKey> = BTreeSet::new();

    for (key, resolved_cents) in &resolved_totals {
        let Some(claim) = claims_by_key.get(key) else {
            // Resolved lines always come from this batch's claims; an
            // orphan here would be an engine bug worth failing loudly in
            // debug builds.
            debug_assert!(false, "resolved line without owning claim: {key:?}");
            continue;
        };
        let reported_cents = claim.remitted.parts_cents;
        let difference_cents = reported_cents - resolved_cents;
        total_difference += difference_cents;
        if difference_cents != 0 {
            off_claims.insert(key.clone());
        }
        rows.push(ClaimPartsDifference {
            dealer_code: claim.dealer_code.clone(),
            dealer_group: claim.dealer_group,
            claim_no: claim.claim_no.clone(),
            vin: claim.vin.clone(),
            resolved_parts_cents: *resolved_cents,
            reported_parts_cents: reported_cents,
            difference_cents,
        });
    }

    let detail: Vec<ResolvedPartLineItem> = resolved
        .iter()
        .filter(|item| {
            off_claims.contains(&ClaimKey {
                dealer_code: item.line.dealer_code.clone(),
                claim_no: item.line.claim_no.clone(),
            })
        })
        .cloned()
        .collect();

    PartsReconciliation {
        claims: rows,
        total_difference_cents: total_difference,
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AmountSet, DealerGroup, EvaluationStatus, PartLineItem};
    use chrono::NaiveDate;

    fn claim(dealer: &str, claim_no: &str, remitted_parts: i64) -> ClaimRecord {
        ClaimRecord {
            dealer_code: dealer.into(),
            dealer_group: DealerGroup::Group1,
            claim_no: claim_no.into(),
            vin: format!("VIN{claim_no}"),
            model: "MX5".into(),
            date_sold: None,
            date_repaired: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            mileage: None,
            status: EvaluationStatus::Approve,
            parts: vec![],
            operations: vec![],
            sublet_amounts_cents: vec![],
            claimed: AmountSet::default(),
            remitted: AmountSet {
                parts_cents: remitted_parts,
                ..AmountSet::default()
            },
        }
    }

    fn resolved_line(dealer: &str, claim_no: &str, part: &str, amount: i64) -> ResolvedPartLineItem {
        ResolvedPartLineItem {
            line: PartLineItem {
                dealer_code: dealer.into(),
                dealer_group: DealerGroup::Group1,
                claim_no: claim_no.into(),
                vin: format!("VIN{claim_no}"),
                part_number: part.into(),
                quantity: 1,
            },
            resolved: amount != 0,
            source: None,
            fob_cents: amount,
            claim_amount_cents: amount,
        }
    }

    #[test]
    fn difference_is_reported_minus_resolved() {
        let claims = vec![claim("2041N", "C1", 30_000)];
        let resolved = vec![
            resolved_line("2041N", "C1", "P1", 20_000),
            resolved_line("2041N", "C1", "P2", 8_000),
        ];
        let recon = parts_reconciliation(&claims, &resolved);
        assert_eq!(recon.claims.len(), 1);
        assert_eq!(recon.claims[0].resolved_parts_cents, 28_000);
        assert_eq!(recon.claims[0].reported_parts_cents, 30_000);
        assert_eq!(recon.claims[0].difference_cents, 2_000);
        assert_eq!(recon.total_difference_cents, 2_000);
    }

    #[test]
    fn detail_restricted_to_nonzero_difference_claims() {
        let claims = vec![claim("2041N", "C1", 10_000), claim("2041N", "C2", 5_000)];
        let resolved = vec![
            resolved_line("2041N", "C1", "P1", 10_000), // exact: stays out of detail
            resolved_line("2041N", "C2", "P2", 4_000),
            resolved_line("2041N", "C2", "P3", 500),
        ];
        let recon = parts_reconciliation(&claims, &resolved);
        assert_eq!(recon.detail.len(), 2);
        assert!(recon.detail.iter().all(|i| i.line.claim_no == "C2"));
    }

    #[test]
    fn same_claim_no_across_dealers_does_not_merge() {
        let claims = vec![claim("2041N", "W-1", 1_000), claim("3010C", "W-1", 2_000)];
        let resolved = vec![
            resolved_line("2041N", "W-1", "P1", 1_000),
            resolved_line("3010C", "W-1", "P1", 1_500),
        ];
        let recon = parts_reconciliation(&claims, &resolved);
        assert_eq!(recon.claims.len(), 2);

        let n = recon.claims.iter().find(|r| r.dealer_code == "2041N").unwrap();
        assert_eq!(n.difference_cents, 0);
        let c = recon.claims.iter().find(|r| r.dealer_code == "3010C").unwrap();
        assert_eq!(c.difference_cents, 500);
    }

    #[test]
    fn claims_without_part_lines_are_absent() {
        let claims = vec![claim("2041N", "C1", 1_000), claim("2041N", "C9", 9_999)];
        let resolved = vec![resolved_line("2041N", "C1", "P1", 1_000)];
        let recon = parts_reconciliation(&claims, &resolved);
        assert_eq!(recon.claims.len(), 1);
        assert_eq!(recon.claims[0].claim_no, "C1");
    }

    #[test]
    fn unresolved_zero_priced_lines_count_toward_difference() {
        let claims = vec![claim("2041N", "C1", 5_000)];
        let resolved = vec![resolved_line("2041N", "C1", "P404", 0)];
        let recon = parts_reconciliation(&claims, &resolved);
        assert_eq!(recon.claims[0].resolved_parts_cents, 0);
        assert_eq!(recon.claims[0].difference_cents, 5_000);
        assert_eq!(recon.detail.len(), 1);
    }
}
