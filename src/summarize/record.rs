//! 报告实体：CheckRecord / GroupRecord / HostRoster / Summary

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::summarize::overrides::Disposition;
use crate::utils::{CheckState, ObservedState, Role};

// ── 观测桶 ──────────────────────────────────────────────────────────────────

/// Hosts that reported each state for one check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateBuckets {
    pass: BTreeSet<String>,
    fail: BTreeSet<String>,
    warn: BTreeSet<String>,
    skip: BTreeSet<String>,
    not_applicable: BTreeSet<String>,
}

impl StateBuckets {
    pub fn get(&self, state: ObservedState) -> &BTreeSet<String> {
        match state {
            ObservedState::Pass => &self.pass,
            ObservedState::Fail => &self.fail,
            ObservedState::Warn => &self.warn,
            ObservedState::Skip => &self.skip,
            ObservedState::NotApplicable => &self.not_applicable,
        }
    }

    fn get_mut(&mut self, state: ObservedState) -> &mut BTreeSet<String> {
        match state {
            ObservedState::Pass => &mut self.pass,
            ObservedState::Fail => &mut self.fail,
            ObservedState::Warn => &mut self.warn,
            ObservedState::Skip => &mut self.skip,
            ObservedState::NotApplicable => &mut self.not_applicable,
        }
    }

    /// Returns false if the host was already in that bucket.
    pub fn insert(&mut self, state: ObservedState, host: &str) -> bool {
        self.get_mut(state).insert(host.to_string())
    }

    /// States with at least one host, in `ObservedState::ALL` order.
    pub fn present_states(&self) -> Vec<ObservedState> {
        ObservedState::ALL
            .into_iter()
            .filter(|s| !self.get(*s).is_empty())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.present_states().is_empty()
    }

    /// Hosts in any bucket other than pass, even if the same host also passed.
    pub fn non_passing(&self) -> BTreeSet<&str> {
        ObservedState::ALL
            .into_iter()
            .filter(|s| *s != ObservedState::Pass)
            .flat_map(|s| self.get(s).iter().map(String::as_str))
            .collect()
    }
}

// ── 检查项 / 分组 ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckRecord {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub remediation: String,
    #[serde(default)]
    pub state: Option<CheckState>,
    #[serde(default)]
    pub scored: bool,
    #[serde(default)]
    pub test_type: String,
    #[serde(default)]
    pub roles: Vec<Role>,
    /// Hosts that did not match the consensus. Empty unless `state` is mixed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deviating_nodes: Vec<String>,
    #[serde(default)]
    pub audit: String,
    #[serde(default)]
    pub expected_result: String,
    /// host → raw actual value. Moved into the diagnostic blob before the report is written.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub actual_value_per_node: BTreeMap<String, String>,
    #[serde(skip)]
    pub observations: StateBuckets,
    #[serde(skip)]
    pub disposition: Disposition,
}

impl CheckRecord {
    /// Adds a role, ignoring duplicates.
    pub fn add_role(&mut self, role: Role) {
        if !self.roles.contains(&role) {
            self.roles.push(role);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub checks: Vec<CheckRecord>,
}

// ── 主机名册 ────────────────────────────────────────────────────────────────

/// Distinct hosts seen per role during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostRoster {
    hosts: BTreeMap<Role, BTreeSet<String>>,
}

impl HostRoster {
    /// Returns true the first time `host` is seen for `role`.
    pub fn add(&mut self, role: Role, host: &str) -> bool {
        self.hosts.entry(role).or_default().insert(host.to_string())
    }

    pub fn get(&self, role: Role) -> Option<&BTreeSet<String>> {
        self.hosts.get(&role)
    }

    /// Union of the rosters of `roles`.
    pub fn hosts_for(&self, roles: &[Role]) -> BTreeSet<String> {
        roles
            .iter()
            .filter_map(|r| self.hosts.get(r))
            .flat_map(|hosts| hosts.iter().cloned())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Role, &BTreeSet<String>)> {
        self.hosts.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.values().all(BTreeSet::is_empty)
    }
}

// ── 计数 ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub warn: usize,
    pub skip: usize,
    pub not_applicable: usize,
}

impl Summary {
    pub fn new(total: usize) -> Self {
        Self { total, ..Self::default() }
    }

    /// Counts one check towards `counter`. Mixed checks are counted as fail or warn.
    pub fn record(&mut self, counter: ObservedState) {
        match counter {
            ObservedState::Pass => self.pass += 1,
            ObservedState::Fail => self.fail += 1,
            ObservedState::Warn => self.warn += 1,
            ObservedState::Skip => self.skip += 1,
            ObservedState::NotApplicable => self.not_applicable += 1,
        }
    }

    pub fn counted(&self) -> usize {
        self.pass + self.fail + self.warn + self.skip + self.not_applicable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_insert_is_idempotent() {
        let mut b = StateBuckets::default();
        assert!(b.insert(ObservedState::Pass, "a"));
        assert!(!b.insert(ObservedState::Pass, "a"));
        assert!(b.insert(ObservedState::Fail, "b"));
        assert!(b.insert(ObservedState::Warn, "a"));
        assert_eq!(
            b.present_states(),
            vec![ObservedState::Pass, ObservedState::Fail, ObservedState::Warn]
        );
        assert_eq!(b.non_passing().into_iter().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn roster_unions_roles() {
        let mut r = HostRoster::default();
        assert!(r.add(Role::Worker, "w1"));
        assert!(!r.add(Role::Worker, "w1"));
        r.add(Role::ControlPlane, "cp1");
        r.add(Role::Etcd, "cp1");
        let all = r.hosts_for(&[Role::ControlPlane, Role::Etcd, Role::Worker]);
        assert_eq!(all.len(), 2);
        assert!(r.hosts_for(&[Role::Etcd]).contains("cp1"));
    }

    #[test]
    fn roster_serializes_by_role_name() {
        let mut r = HostRoster::default();
        r.add(Role::ControlPlane, "cp1");
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, r#"{"control-plane":["cp1"]}"#);
        let back: HostRoster = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }

    #[test]
    fn empty_actual_values_are_not_serialized() {
        let rec = CheckRecord { id: "1.1.1".to_string(), ..CheckRecord::default() };
        let json = serde_json::to_value(&rec).unwrap();
        assert!(json.get("actual_value_per_node").is_none());
        assert!(json.get("deviating_nodes").is_none());
        assert!(json.get("observations").is_none());
    }
}
