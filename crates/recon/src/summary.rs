//! Claim-level aggregation — per-status amount summaries and the
//! approved-only difference analysis.

use std::collections::BTreeMap;

use crate::model::{
    AmountSet, AmountSummaryRow, ApprovedDifferences, ClaimDifferenceRow, ClaimRecord,
    EvaluationStatus,
};

/// Sum of claimed amounts per evaluation status, across all claims.
pub fn status_summary(claims: &[ClaimRecord]) -> Vec<AmountSummaryRow> {
    summarize(claims, |c| &c.claimed)
}

/// Sum of reported remittance amounts per evaluation status.
pub fn remittance_summary(claims: &[ClaimRecord]) -> Vec<AmountSummaryRow> {
    summarize(claims, |c| &c.remitted)
}

fn summarize<'a>(
    claims: &'a [ClaimRecord],
    amounts: impl Fn(&'a ClaimRecord) -> &'a AmountSet,
) -> Vec<AmountSummaryRow> {
    let mut groups: BTreeMap<EvaluationStatus, (usize, AmountSet)> = BTreeMap::new();
    for claim in claims {
        let entry = groups.entry(claim.status.clone()).or_default();
        entry.0 += 1;
        entry.1.add(amounts(claim));
    }

    groups
        .into_iter()
        .map(|(status, (claim_count, amounts))| AmountSummaryRow {
            status,
            claim_count,
            amounts,
        })
        .collect()
}

/// Evaluation-status filter query: the subset of claims in one status.
pub fn filter_by_status<'a>(
    claims: &'a [ClaimRecord],
    status: &EvaluationStatus,
) -> Vec<&'a ClaimRecord> {
    claims.iter().filter(|c| &c.status == status).collect()
}

/// Approved-only difference analysis: `remittance − claimed` per component,
/// per claim and in aggregate.
pub fn approved_differences(claims: &[ClaimRecord]) -> ApprovedDifferences {
    let mut rows = Vec::new();
    let mut totals = AmountSet::default();

    for claim in claims {
        if claim.status != EvaluationStatus::Approve {
            continue;
        }
        let difference = claim.remitted.minus(&claim.claimed);
        totals.add(&difference);
        rows.push(ClaimDifferenceRow {
            dealer_code: claim.dealer_code.clone(),
            dealer_group: claim.dealer_group,
            claim_no: claim.claim_no.clone(),
            vin: claim.vin.clone(),
            difference,
        });
    }

    ApprovedDifferences { rows, totals }
}
