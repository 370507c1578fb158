use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Node role a check applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    ControlPlane,
    Etcd,
    Worker,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::ControlPlane, Role::Etcd, Role::Worker];

    /// Role for a catalog target name. Anything that is not a node-level
    /// target (`controlplane`, `policies`, ...) is evaluated on control-plane hosts.
    pub fn from_target(target: &str) -> Role {
        match target {
            "etcd" => Role::Etcd,
            "node" => Role::Worker,
            _      => Role::ControlPlane,
        }
    }

    /// Role for a per-host result file name, `None` if the name is not recognized.
    pub fn from_result_file(file_name: &str) -> Option<Role> {
        match file_name {
            "master.json" | "controlplane.json" | "policies.json" => Some(Role::ControlPlane),
            "etcd.json" => Some(Role::Etcd),
            "node.json" => Some(Role::Worker),
            _ => None,
        }
    }

    /// Name used by the legacy report shape.
    pub fn legacy_name(&self) -> &'static str {
        match self {
            Role::ControlPlane => "master",
            Role::Etcd         => "etcd",
            Role::Worker       => "node",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::ControlPlane => write!(f, "control-plane"),
            Role::Etcd => write!(f, "etcd"),
            Role::Worker => write!(f, "worker"),
        }
    }
}

/// State reported by one host for one check, after overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedState {
    Pass,
    Fail,
    Warn,
    Skip,
    NotApplicable,
}

impl ObservedState {
    pub const ALL: [ObservedState; 5] = [
        ObservedState::Pass,
        ObservedState::Fail,
        ObservedState::Warn,
        ObservedState::Skip,
        ObservedState::NotApplicable,
    ];
}

impl FromStr for ObservedState {
    type Err = String;

    /// Parses a scanner status label. `INFO` results need manual review and count as warnings.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PASS" => Ok(ObservedState::Pass),
            "FAIL" => Ok(ObservedState::Fail),
            "WARN" | "INFO" => Ok(ObservedState::Warn),
            "SKIP" => Ok(ObservedState::Skip),
            "NA" => Ok(ObservedState::NotApplicable),
            other => Err(format!("unknown check status {:?}", other)),
        }
    }
}

impl std::fmt::Display for ObservedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        CheckState::from(*self).fmt(f)
    }
}

/// Reconciled verdict for a check across every roster host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckState {
    Pass,
    Fail,
    Warn,
    Skip,
    NotApplicable,
    Mixed,
}

impl From<ObservedState> for CheckState {
    fn from(state: ObservedState) -> Self {
        match state {
            ObservedState::Pass => CheckState::Pass,
            ObservedState::Fail => CheckState::Fail,
            ObservedState::Warn => CheckState::Warn,
            ObservedState::Skip => CheckState::Skip,
            ObservedState::NotApplicable => CheckState::NotApplicable,
        }
    }
}

impl std::fmt::Display for CheckState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckState::Pass => write!(f, "pass"),
            CheckState::Fail => write!(f, "fail"),
            CheckState::Warn => write!(f, "warn"),
            CheckState::Skip => write!(f, "skip"),
            CheckState::NotApplicable => write!(f, "notApplicable"),
            CheckState::Mixed => write!(f, "mixed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_parse() {
        assert_eq!("PASS".parse::<ObservedState>(), Ok(ObservedState::Pass));
        assert_eq!("NA".parse::<ObservedState>(), Ok(ObservedState::NotApplicable));
        assert_eq!("INFO".parse::<ObservedState>(), Ok(ObservedState::Warn));
        assert!("pass".parse::<ObservedState>().is_err());
    }

    #[test]
    fn result_files_map_to_roles() {
        assert_eq!(Role::from_result_file("master.json"), Some(Role::ControlPlane));
        assert_eq!(Role::from_result_file("policies.json"), Some(Role::ControlPlane));
        assert_eq!(Role::from_result_file("node.json"), Some(Role::Worker));
        assert_eq!(Role::from_result_file("summary.json"), None);
        assert_eq!(Role::from_target("policies"), Role::ControlPlane);
    }

    #[test]
    fn check_state_serializes_camel_case() {
        let json = serde_json::to_string(&CheckState::NotApplicable).unwrap();
        assert_eq!(json, "\"notApplicable\"");
        assert_eq!(CheckState::Mixed.to_string(), "mixed");
    }
}
