//! Composite-status reduction over every small combination of statuses.
//!
//! The exhaustive sweep covers all singles, pairs and triples of the twelve
//! statuses under both composition strategies; the property tests check the
//! precedence rules on larger random sets.

use proptest::prelude::*;
use recstream_kernel::{
    HandlingStatus, HandlingStatusCompositionStrategy, reduce_to_composite_handling_status,
};

fn strategies() -> [HandlingStatusCompositionStrategy; 2] {
    [
        HandlingStatusCompositionStrategy::default(),
        HandlingStatusCompositionStrategy::ignoring_cancel(),
    ]
}

fn combinations() -> Vec<Vec<HandlingStatus>> {
    let all = HandlingStatus::ALL;
    let mut sets = Vec::new();
    for a in all {
        sets.push(vec![a]);
        for b in all {
            sets.push(vec![a, b]);
            for c in all {
                sets.push(vec![a, b, c]);
            }
        }
    }
    sets
}

#[test]
fn every_small_combination_reduces() {
    for strategy in strategies() {
        for statuses in combinations() {
            let reduced = reduce_to_composite_handling_status(&statuses, strategy);
            assert!(
                reduced.is_ok(),
                "{statuses:?} under {strategy:?} failed: {reduced:?}"
            );
        }
    }
}

#[test]
fn reduction_ignores_order() {
    for strategy in strategies() {
        for statuses in combinations() {
            let mut reversed = statuses.clone();
            reversed.reverse();
            assert_eq!(
                reduce_to_composite_handling_status(&statuses, strategy),
                reduce_to_composite_handling_status(&reversed, strategy),
                "order changed the result for {statuses:?}"
            );
        }
    }
}

#[test]
fn composite_is_always_one_of_the_summary_statuses() {
    use HandlingStatus as S;
    let summaries = [
        S::None,
        S::Blocked,
        S::Failed,
        S::Running,
        S::Canceled,
        S::SelfCanceledRunning,
        S::Unknown,
        S::Requested,
        S::Completed,
    ];
    for strategy in strategies() {
        for statuses in combinations() {
            let reduced = reduce_to_composite_handling_status(&statuses, strategy)
                .expect("small combinations reduce");
            assert!(summaries.contains(&reduced), "{statuses:?} -> {reduced:?}");
        }
    }
}

fn arb_status() -> impl Strategy<Value = HandlingStatus> {
    prop::sample::select(HandlingStatus::ALL.to_vec())
}

proptest! {
    #[test]
    fn blocked_dominates(mut statuses in prop::collection::vec(arb_status(), 0..12)) {
        statuses.push(HandlingStatus::Blocked);
        for strategy in strategies() {
            prop_assert_eq!(
                reduce_to_composite_handling_status(&statuses, strategy),
                Ok(HandlingStatus::Blocked)
            );
        }
    }

    #[test]
    fn failed_dominates_without_block(
        mut statuses in prop::collection::vec(arb_status(), 0..12)
    ) {
        statuses.retain(|s| *s != HandlingStatus::Blocked);
        statuses.push(HandlingStatus::Failed);
        for strategy in strategies() {
            prop_assert_eq!(
                reduce_to_composite_handling_status(&statuses, strategy),
                Ok(HandlingStatus::Failed)
            );
        }
    }

    #[test]
    fn ignoring_cancel_never_reports_canceled(
        statuses in prop::collection::vec(arb_status(), 0..12)
    ) {
        let reduced = reduce_to_composite_handling_status(
            &statuses,
            HandlingStatusCompositionStrategy::ignoring_cancel(),
        );
        prop_assert_ne!(reduced, Ok(HandlingStatus::Canceled));
    }

    #[test]
    fn reclaimable_work_never_reads_as_completed(
        mut statuses in prop::collection::vec(arb_status(), 0..12)
    ) {
        statuses.push(HandlingStatus::CanceledRunning);
        for strategy in strategies() {
            prop_assert_ne!(
                reduce_to_composite_handling_status(&statuses, strategy),
                Ok(HandlingStatus::Completed)
            );
        }
    }
}
