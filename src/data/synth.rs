//! Synthetic monthly snapshot generation from a baseline profile.
//!
//! Each step raises living costs and income and pays down debt by a fixed
//! amount. The output is a pure function of its inputs.

use crate::domain::{DebtPolicy, EconomicProfile, Snapshot, SnapshotBatch};

/// Per-step increments applied to the baseline.
const FOOD_STEP: f64 = 10.0;
const RENT_STEP: f64 = 10.0;
const ENERGY_STEP: f64 = 5.0;
const TRANSPORT_STEP: f64 = 5.0;
const DEBT_STEP: f64 = -10.0;
const INCOME_STEP: f64 = 50.0;

/// Synthesize `step_count` snapshots; debt passes through even when negative.
pub fn synthesize(baseline: &EconomicProfile, step_count: usize) -> SnapshotBatch {
    synthesize_with(baseline, step_count, DebtPolicy::PassThrough)
}

/// Synthesize `step_count` snapshots with an explicit debt policy.
pub fn synthesize_with(
    baseline: &EconomicProfile,
    step_count: usize,
    debt_policy: DebtPolicy,
) -> SnapshotBatch {
    let snapshots = (0..step_count)
        .map(|i| snapshot_at(baseline, i, debt_policy))
        .collect();
    SnapshotBatch::new(snapshots)
}

fn snapshot_at(baseline: &EconomicProfile, step: usize, debt_policy: DebtPolicy) -> Snapshot {
    let i = step as f64;
    let debt = baseline.debt + i * DEBT_STEP;
    let debt = match debt_policy {
        DebtPolicy::PassThrough => debt,
        DebtPolicy::Clamp => debt.max(0.0),
    };

    Snapshot {
        food: baseline.food + i * FOOD_STEP,
        rent: baseline.rent + i * RENT_STEP,
        energy: baseline.energy + i * ENERGY_STEP,
        transport: baseline.transport + i * TRANSPORT_STEP,
        debt,
        income: baseline.income + i * INCOME_STEP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::presets::{PRESETS, lookup};
    use crate::domain::FORECAST_HORIZON;

    #[test]
    fn finland_step_two_matches_expected_profile() {
        let baseline = lookup("Finland").unwrap();
        let batch = synthesize(&baseline, FORECAST_HORIZON);
        assert_eq!(batch.len(), 6);
        assert_eq!(
            batch.snapshots()[2],
            EconomicProfile {
                food: 340.0,
                rent: 870.0,
                energy: 170.0,
                transport: 150.0,
                debt: 180.0,
                income: 3500.0,
            }
        );
    }

    #[test]
    fn every_step_follows_the_increments() {
        for preset in PRESETS {
            let b = preset.profile;
            let batch = synthesize(&b, 6);
            assert_eq!(batch.len(), 6);
            for (i, s) in batch.snapshots().iter().enumerate() {
                let i = i as f64;
                assert_eq!(s.food, b.food + i * 10.0);
                assert_eq!(s.rent, b.rent + i * 10.0);
                assert_eq!(s.energy, b.energy + i * 5.0);
                assert_eq!(s.transport, b.transport + i * 5.0);
                assert_eq!(s.debt, b.debt - i * 10.0);
                assert_eq!(s.income, b.income + i * 50.0);
            }
        }
    }

    #[test]
    fn first_snapshot_is_the_baseline() {
        let b = lookup("USA").unwrap();
        assert_eq!(synthesize(&b, 6).snapshots()[0], b);
    }

    #[test]
    fn negative_debt_passes_through_or_clamps() {
        let mut b = lookup("Romania").unwrap();
        b.debt = 20.0;

        let raw = synthesize(&b, 6);
        assert_eq!(raw.snapshots()[5].debt, -30.0);

        let clamped = synthesize_with(&b, 6, DebtPolicy::Clamp);
        let debts: Vec<f64> = clamped.snapshots().iter().map(|s| s.debt).collect();
        assert_eq!(debts, vec![20.0, 10.0, 0.0, 0.0, 0.0, 0.0]);
        // Clamping only touches debt.
        assert_eq!(clamped.snapshots()[5].income, raw.snapshots()[5].income);
    }

    #[test]
    fn synthesis_is_deterministic() {
        let b = lookup("Germany").unwrap();
        assert_eq!(synthesize(&b, 6), synthesize(&b, 6));
        assert!(synthesize(&b, 0).is_empty());
        assert_eq!(synthesize(&b, 12).len(), 12);
    }
}
