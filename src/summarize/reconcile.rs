//! 状态汇总：每个检查项在其角色名册上的观测结果 → 单一最终状态
//!
//! Rules, evaluated once per check after every host is ingested:
//!   - forced not-applicable wins and is never reconsidered;
//!   - no observations: the load-time disposition decides (skip, otherwise not-applicable);
//!   - one state reported by every roster host: that state;
//!   - one state reported by only part of the roster: mixed, deviating = hosts that did not report,
//!     counted as warn if the state was warn, fail otherwise;
//!   - several states: mixed, deviating = every host in a non-pass bucket, counted as fail.

use std::collections::BTreeSet;

use crate::summarize::catalog::Catalog;
use crate::summarize::overrides::Disposition;
use crate::summarize::record::{CheckRecord, HostRoster, StateBuckets, Summary};
use crate::utils::{CheckState, ObservedState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub state: CheckState,
    pub deviating_nodes: Vec<String>,
    /// Summary counter the check contributes to.
    pub counted_as: ObservedState,
}

impl Verdict {
    fn uniform(state: ObservedState) -> Self {
        Self { state: state.into(), deviating_nodes: Vec::new(), counted_as: state }
    }

    fn mixed(deviating_nodes: Vec<String>, counted_as: ObservedState) -> Self {
        Self { state: CheckState::Mixed, deviating_nodes, counted_as }
    }
}

pub fn evaluate(
    observations: &StateBuckets,
    disposition: &Disposition,
    roster: &BTreeSet<String>,
) -> Verdict {
    if disposition.is_not_applicable() {
        return Verdict::uniform(ObservedState::NotApplicable);
    }

    match observations.present_states().as_slice() {
        [] => match disposition {
            Disposition::Skip { .. } => Verdict::uniform(ObservedState::Skip),
            _ => Verdict::uniform(ObservedState::NotApplicable),
        },
        [only] => {
            let reported = observations.get(*only);
            let missing: Vec<String> = roster.difference(reported).cloned().collect();
            if missing.is_empty() {
                Verdict::uniform(*only)
            } else if *only == ObservedState::Warn {
                Verdict::mixed(missing, ObservedState::Warn)
            } else {
                Verdict::mixed(missing, ObservedState::Fail)
            }
        }
        _ => {
            let deviating = observations.non_passing().into_iter().map(String::from).collect();
            Verdict::mixed(deviating, ObservedState::Fail)
        }
    }
}

pub fn reconcile_check(record: &mut CheckRecord, roster: &HostRoster) -> Verdict {
    let hosts = roster.hosts_for(&record.roles);
    let verdict = evaluate(&record.observations, &record.disposition, &hosts);
    log::debug!(
        "id: {} nodeCount: {} state: {} deviating: {:?}",
        record.id, hosts.len(), verdict.state, verdict.deviating_nodes
    );
    record.state = Some(verdict.state);
    record.deviating_nodes = verdict.deviating_nodes.clone();
    verdict
}

/// Sets the final state of every check and accumulates the summary counters.
pub fn reconcile(catalog: &mut Catalog, roster: &HostRoster, summary: &mut Summary) {
    log::debug!("running final pass");
    for record in catalog.checks_mut() {
        let verdict = reconcile_check(record, roster);
        summary.record(verdict.counted_as);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hosts(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn buckets(entries: &[(ObservedState, &str)]) -> StateBuckets {
        let mut b = StateBuckets::default();
        for (state, host) in entries {
            b.insert(*state, host);
        }
        b
    }

    #[test]
    fn all_roster_hosts_pass() {
        let b = buckets(&[
            (ObservedState::Pass, "a"),
            (ObservedState::Pass, "b"),
            (ObservedState::Pass, "c"),
        ]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b", "c"]));
        assert_eq!(v.state, CheckState::Pass);
        assert!(v.deviating_nodes.is_empty());
        assert_eq!(v.counted_as, ObservedState::Pass);
    }

    #[test]
    fn one_failing_host_makes_mixed() {
        let b = buckets(&[
            (ObservedState::Fail, "a"),
            (ObservedState::Pass, "b"),
            (ObservedState::Pass, "c"),
        ]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b", "c"]));
        assert_eq!(v.state, CheckState::Mixed);
        assert_eq!(v.deviating_nodes, ["a"]);
        assert_eq!(v.counted_as, ObservedState::Fail);
    }

    #[test]
    fn partial_pass_lists_hosts_that_never_reported() {
        let b = buckets(&[(ObservedState::Pass, "a"), (ObservedState::Pass, "b")]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b", "c"]));
        assert_eq!(v.state, CheckState::Mixed);
        assert_eq!(v.deviating_nodes, ["c"]);
        assert_eq!(v.counted_as, ObservedState::Fail);
    }

    #[test]
    fn partial_warn_counts_as_warn() {
        let b = buckets(&[(ObservedState::Warn, "a")]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b"]));
        assert_eq!(v.state, CheckState::Mixed);
        assert_eq!(v.counted_as, ObservedState::Warn);
    }

    #[test]
    fn uniform_fail_is_fail_with_no_deviating_hosts() {
        let b = buckets(&[(ObservedState::Fail, "a"), (ObservedState::Fail, "b")]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b"]));
        assert_eq!(v, Verdict::uniform(ObservedState::Fail));
    }

    #[test]
    fn several_states_list_every_non_passing_host() {
        let b = buckets(&[
            (ObservedState::Pass, "a"),
            (ObservedState::Warn, "b"),
            (ObservedState::Fail, "c"),
            (ObservedState::Skip, "d"),
        ]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["a", "b", "c", "d"]));
        assert_eq!(v.state, CheckState::Mixed);
        assert_eq!(v.deviating_nodes, ["b", "c", "d"]);
        assert_eq!(v.counted_as, ObservedState::Fail);
    }

    #[test]
    fn host_in_pass_and_fail_buckets_still_deviates() {
        let b = buckets(&[
            (ObservedState::Pass, "h1"),
            (ObservedState::Fail, "h1"),
            (ObservedState::Pass, "h2"),
        ]);
        let v = evaluate(&b, &Disposition::Observed, &hosts(&["h1", "h2"]));
        assert_eq!(v.state, CheckState::Mixed);
        assert_eq!(v.deviating_nodes, ["h1"]);
        assert_eq!(v.counted_as, ObservedState::Fail);
    }

    #[test]
    fn forced_not_applicable_ignores_roster_counts() {
        let b = buckets(&[(ObservedState::Fail, "a")]);
        let d = Disposition::NotApplicable { remediation: Some("n/a".to_string()) };
        let v = evaluate(&b, &d, &hosts(&["a", "b", "c"]));
        assert_eq!(v, Verdict::uniform(ObservedState::NotApplicable));
    }

    #[test]
    fn unobserved_checks_follow_disposition() {
        let empty = StateBuckets::default();
        let roster = hosts(&["a"]);
        assert_eq!(
            evaluate(&empty, &Disposition::Observed, &roster).counted_as,
            ObservedState::NotApplicable
        );
        let skip = Disposition::Skip { remediation: None };
        assert_eq!(evaluate(&empty, &skip, &roster).state, CheckState::Skip);
    }

    #[test]
    fn verdict_does_not_depend_on_insertion_order() {
        let roster = hosts(&["a", "b", "c"]);
        let forward = buckets(&[
            (ObservedState::Fail, "a"),
            (ObservedState::Pass, "b"),
            (ObservedState::Warn, "c"),
        ]);
        let backward = buckets(&[
            (ObservedState::Warn, "c"),
            (ObservedState::Pass, "b"),
            (ObservedState::Fail, "a"),
        ]);
        assert_eq!(
            evaluate(&forward, &Disposition::Observed, &roster),
            evaluate(&backward, &Disposition::Observed, &roster)
        );
    }
}
