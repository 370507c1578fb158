//! 顶层报告结构体与落盘

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::ReportEncoding;
use crate::summarize::diagnostics;
use crate::summarize::record::{GroupRecord, HostRoster, Summary};
use crate::utils::{Result, SummarizerError};

pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: u32,
    /// Benchmark version the catalog was loaded for.
    pub version: String,
    pub summary: Summary,
    pub nodes: HostRoster,
    pub groups: Vec<GroupRecord>,
    /// base64(gzip(json)) of every check's per-host actual values.
    #[serde(default)]
    pub actual_value_map_data: String,
}

impl Report {
    pub fn check_count(&self) -> usize {
        self.groups.iter().map(|g| g.checks.len()).sum()
    }
}

/// Orders groups by id, moves actual values into the diagnostic blob and builds the report.
/// Check order inside a group stays catalog order.
pub fn assemble(
    version: &str,
    summary: Summary,
    roster: HostRoster,
    mut groups: Vec<GroupRecord>,
) -> Result<Report> {
    groups.sort_by(|a, b| a.id.cmp(&b.id));
    let actual_value_map_data = diagnostics::encode(&mut groups)?;

    Ok(Report {
        schema_version: SCHEMA_VERSION,
        version: version.to_string(),
        summary,
        nodes: roster,
        groups,
        actual_value_map_data,
    })
}

pub fn to_bytes(report: &Report, encoding: ReportEncoding) -> Result<Vec<u8>> {
    let bytes = match encoding {
        ReportEncoding::Pretty  => serde_json::to_vec_pretty(report),
        ReportEncoding::Compact => serde_json::to_vec(report),
    };
    bytes.map_err(|e| SummarizerError::Encode(format!("encoding report: {}", e)))
}

/// Writes the report, creating the output directory if needed.
pub fn save(report: &Report, path: &Path, encoding: ReportEncoding) -> Result<()> {
    let bytes = to_bytes(report, encoding)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, bytes)?;
    log::info!("successfully saved report file: {}", path.display());
    Ok(())
}

pub fn load(path: &Path) -> Result<Report> {
    let data = fs::read(path)?;
    serde_json::from_slice(&data).map_err(|e| {
        SummarizerError::Configuration(format!("reading report {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::record::CheckRecord;
    use crate::utils::{CheckState, Role};

    fn group(id: &str, checks: &[&str]) -> GroupRecord {
        GroupRecord {
            id: id.to_string(),
            description: format!("group {}", id),
            checks: checks
                .iter()
                .map(|c| CheckRecord {
                    id: c.to_string(),
                    state: Some(CheckState::Pass),
                    actual_value_per_node: [("h1".to_string(), format!("value of {}", c))].into(),
                    ..CheckRecord::default()
                })
                .collect(),
        }
    }

    #[test]
    fn groups_are_sorted_checks_keep_order() {
        let groups = vec![group("4.1", &["4.1.2", "4.1.1"]), group("1.2", &["1.2.1"]), group("1.1", &["1.1.9", "1.1.10"])];
        let report = assemble("cis-1.23", Summary::new(5), HostRoster::default(), groups).unwrap();

        let ids: Vec<_> = report.groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["1.1", "1.2", "4.1"]);
        let checks: Vec<_> = report.groups[2].checks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(checks, ["4.1.2", "4.1.1"]);
        assert_eq!(report.check_count(), 5);
        assert_eq!(report.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn actual_values_live_only_in_the_blob() {
        let report = assemble("v", Summary::new(1), HostRoster::default(), vec![group("1.1", &["1.1.1"])]).unwrap();
        assert!(report.groups[0].checks[0].actual_value_per_node.is_empty());

        let tree = diagnostics::decode(&report.actual_value_map_data).unwrap();
        assert_eq!(tree[0].checks[0].actual_values["h1"], "value of 1.1.1");
    }

    #[test]
    fn compact_and_pretty_carry_the_same_document() {
        let mut roster = HostRoster::default();
        roster.add(Role::Worker, "w1");
        let report = assemble("v", Summary::new(1), roster, vec![group("1.1", &["1.1.1"])]).unwrap();

        let pretty: serde_json::Value = serde_json::from_slice(&to_bytes(&report, ReportEncoding::Pretty).unwrap()).unwrap();
        let compact_bytes = to_bytes(&report, ReportEncoding::Compact).unwrap();
        let compact: serde_json::Value = serde_json::from_slice(&compact_bytes).unwrap();
        assert_eq!(pretty, compact);
        assert!(!compact_bytes.contains(&b'\n'));
        assert_eq!(compact["nodes"]["worker"][0], "w1");
        assert_eq!(compact["groups"][0]["checks"][0]["state"], "pass");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.json");
        let report = assemble("cis-1.23", Summary::new(0), HostRoster::default(), Vec::new()).unwrap();

        save(&report, &path, ReportEncoding::Pretty).unwrap();
        let back = load(&path).unwrap();
        assert_eq!(back.version, "cis-1.23");
        assert_eq!(back.summary, report.summary);
    }
}
