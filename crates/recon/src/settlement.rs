//! Settlement report builder — the payable report for the partner dealer
//! network. Fixed business formula: parts at resolved price, half the
//! reported labor remittance, the full sublet remittance.

use std::collections::BTreeMap;

use crate::model::{
    ClaimKey, ClaimRecord, DealerGroup, EvaluationStatus, ResolvedPartLineItem, SettlementLine,
    SettlementReport,
};

/// Build the settlement report over Approve-status claims of one dealer
/// group. Missing addends default to 0 before summation; a scoped claim
/// with no surviving part lines still gets a line (parts at 0).
pub fn build_settlement(
    claims: &[ClaimRecord],
    resolved: &[ResolvedPartLineItem],
    dealer_group: DealerGroup,
) -> SettlementReport {
    // Resolved parts totals, restricted to the scoped group's lines
    let mut parts_by_claim: BTreeMap<ClaimKey, i64> = BTreeMap::new();
    for item in resolved {
        if item.line.dealer_group != dealer_group {
            continue;
        }
        let key = ClaimKey {
            dealer_code: item.line.dealer_code.clone(),
            claim_no: item.line.claim_no.clone(),
        };
        *parts_by_claim.entry(key).or_insert(0) += item.claim_amount_cents;
    }

    let mut lines = Vec::new();
    let mut total_payable = 0i64;
    let mut amount_recognized = 0i64;

    for claim in claims {
        if claim.status != EvaluationStatus::Approve || claim.dealer_group != dealer_group {
            continue;
        }

        amount_recognized += claim.remitted.total_cents;

        let resolved_parts_cents = parts_by_claim.get(&claim.key()).copied().unwrap_or(0);
        // Truncating division; the odd cent stays with the payer.
        let labor_half_cents = claim.remitted.labor_cents / 2;
        let sublet_cents = claim.remitted.sublet_cents;
        let total_payable_cents = resolved_parts_cents + labor_half_cents + sublet_cents;
        total_payable += total_payable_cents;

        lines.push(SettlementLine {
            dealer_code: claim.dealer_code.clone(),
            claim_no: claim.claim_no.clone(),
            vin: claim.vin.clone(),
            resolved_parts_cents,
            labor_half_cents,
            sublet_cents,
            total_payable_cents,
        });
    }

    SettlementReport {
        dealer_group,
        lines,
        total_payable_cents: total_payable,
        amount_recognized_cents: amount_recognized,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AmountSet, PartLineItem};
    use chrono::NaiveDate;

    fn claim(
        dealer: &str,
        group: DealerGroup,
        claim_no: &str,
        status: EvaluationStatus,
        remitted: AmountSet,
    ) -> ClaimRecord {
        ClaimRecord {
            dealer_code: dealer.into(),
            dealer_group: group,
            claim_no: claim_no.into(),
            vin: format!("VIN{claim_no}"),
            model: "MX5".into(),
            date_sold: None,
            date_repaired: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            mileage: None,
            status,
            parts: vec![],
            operations: vec![],
            sublet_amounts_cents: vec![],
            claimed: AmountSet::default(),
            remitted,
        }
    }

    fn resolved_line(dealer: &str, group: DealerGroup, claim_no: &str, amount: i64) -> ResolvedPartLineItem {
        ResolvedPartLineItem {
            line: PartLineItem {
                dealer_code: dealer.into(),
                dealer_group: group,
                claim_no: claim_no.into(),
                vin: format!("VIN{claim_no}"),
                part_number: "P1".into(),
                quantity: 1,
            },
            resolved: true,
            source: None,
            fob_cents: amount,
            claim_amount_cents: amount,
        }
    }

    fn remitted(labor: i64, sublet: i64, total: i64) -> AmountSet {
        AmountSet {
            parts_cents: 0,
            labor_cents: labor,
            sublet_cents: sublet,
            total_cents: total,
        }
    }

    #[test]
    fn payable_formula() {
        let claims = vec![claim(
            "2041N",
            DealerGroup::Group1,
            "C1",
            EvaluationStatus::Approve,
            remitted(10_000, 2_500, 40_000),
        )];
        let resolved = vec![resolved_line("2041N", DealerGroup::Group1, "C1", 28_000)];
        let report = build_settlement(&claims, &resolved, DealerGroup::Group1);

        assert_eq!(report.lines.len(), 1);
        let line = &report.lines[0];
        assert_eq!(line.resolved_parts_cents, 28_000);
        assert_eq!(line.labor_half_cents, 5_000);
        assert_eq!(line.sublet_cents, 2_500);
        assert_eq!(line.total_payable_cents, 35_500);
        assert_eq!(report.total_payable_cents, 35_500);
        assert_eq!(report.amount_recognized_cents, 40_000);
    }

    #[test]
    fn only_approved_scoped_claims_appear() {
        let claims = vec![
            claim("2041N", DealerGroup::Group1, "C1", EvaluationStatus::Approve, remitted(0, 0, 100)),
            claim("2042N", DealerGroup::Group1, "C2", EvaluationStatus::Pending, remitted(0, 0, 999)),
            claim("2043N", DealerGroup::Group1, "C3", EvaluationStatus::Reject, remitted(0, 0, 999)),
            claim("3010C", DealerGroup::Group2, "C4", EvaluationStatus::Approve, remitted(0, 0, 999)),
        ];
        let report = build_settlement(&claims, &[], DealerGroup::Group1);
        assert_eq!(report.lines.len(), 1);
        assert_eq!(report.lines[0].claim_no, "C1");
        assert_eq!(report.amount_recognized_cents, 100);
    }

    #[test]
    fn claim_without_part_lines_gets_zero_parts() {
        let claims = vec![claim(
            "2041N",
            DealerGroup::Group1,
            "C1",
            EvaluationStatus::Approve,
            remitted(3_000, 0, 0),
        )];
        let report = build_settlement(&claims, &[], DealerGroup::Group1);
        assert_eq!(report.lines[0].resolved_parts_cents, 0);
        assert_eq!(report.lines[0].total_payable_cents, 1_500);
    }

    #[test]
    fn other_group_lines_do_not_leak_into_parts_sum() {
        let claims = vec![claim(
            "2041N",
            DealerGroup::Group1,
            "C1",
            EvaluationStatus::Approve,
            remitted(0, 0, 0),
        )];
        let resolved = vec![
            resolved_line("2041N", DealerGroup::Group1, "C1", 1_000),
            resolved_line("3010C", DealerGroup::Group2, "C1", 9_000),
        ];
        let report = build_settlement(&claims, &resolved, DealerGroup::Group1);
        assert_eq!(report.lines[0].resolved_parts_cents, 1_000);
    }

    #[test]
    fn odd_labor_cents_truncate() {
        let claims = vec![claim(
            "2041N",
            DealerGroup::Group1,
            "C1",
            EvaluationStatus::Approve,
            remitted(101, 0, 0),
        )];
        let report = build_settlement(&claims, &[], DealerGroup::Group1);
        assert_eq!(report.lines[0].labor_half_cents, 50);
    }
}
