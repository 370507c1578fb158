//! 节点结果采集
//! 来源：<input-dir>/<hostname>/<role>.json，以及可选的 <input-dir>/<hostname>/error.log

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::summarize::catalog::Catalog;
use crate::summarize::overrides::OverrideResolver;
use crate::summarize::record::HostRoster;
use crate::utils::{ObservedState, Result, Role, SummarizerError};

pub const ERROR_LOG_FILENAME: &str = "error.log";

/// Evaluated against control-plane checks, but never put their host on a roster.
pub const ROSTERLESS_RESULT_FILES: [&str; 2] = ["controlplane.json", "policies.json"];

// ── 文件格式 ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawOverallControls {
    #[serde(rename = "Controls", default)]
    controls: Option<Vec<RawResultControls>>,
}

#[derive(Debug, Deserialize)]
struct RawResultControls {
    #[serde(default)]
    tests: Option<Vec<RawResultGroup>>,
}

#[derive(Debug, Deserialize)]
struct RawResultGroup {
    #[serde(default)]
    results: Option<Vec<RawResultCheck>>,
}

#[derive(Debug, Deserialize)]
struct RawResultCheck {
    test_number: String,
    status: String,
    #[serde(default)]
    actual_value: String,
    #[serde(default)]
    expected_result: String,
}

/// One validated (check id, state, actual value) line from a result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub check_id: String,
    pub state: ObservedState,
    pub actual_value: String,
    pub expected_result: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub hosts: usize,
    pub files: usize,
    pub observations: usize,
    pub unknown_checks: usize,
    pub out_of_role: usize,
}

// ── 采集入口 ────────────────────────────────────────────────────────────────

/// Walks every host directory under `input_dir` in name order.
/// Any malformed file or non-empty error log aborts the whole run.
pub fn ingest_all(
    input_dir: &Path,
    catalog: &mut Catalog,
    resolver: &OverrideResolver,
    roster: &mut HostRoster,
) -> Result<IngestStats> {
    let mut stats = IngestStats::default();

    for host in list_host_dirs(input_dir)? {
        log::debug!("hostDir: {}", host);
        let host_dir = input_dir.join(&host);
        check_error_log(&host_dir, &host)?;
        ingest_host(&host_dir, &host, catalog, resolver, roster, &mut stats)?;
        stats.hosts += 1;
    }

    log::info!(
        "ingested {} hosts, {} files, {} observations ({} unknown checks, {} outside role dropped)",
        stats.hosts, stats.files, stats.observations, stats.unknown_checks, stats.out_of_role
    );
    Ok(stats)
}

pub fn ingest_host(
    host_dir: &Path,
    host: &str,
    catalog: &mut Catalog,
    resolver: &OverrideResolver,
    roster: &mut HostRoster,
    stats: &mut IngestStats,
) -> Result<()> {
    for (path, file_name) in list_result_files(host_dir, host)? {
        let Some(role) = Role::from_result_file(&file_name) else {
            log::error!("unknown result file found: {}", path.display());
            continue;
        };
        log::debug!("host: {} resultFile: {}", host, file_name);

        let observations = parse_result_file(&path, host)?;
        if !ROSTERLESS_RESULT_FILES.contains(&file_name.as_str()) {
            roster.add(role, host);
        }
        merge_observations(catalog, resolver, host, role, observations, stats);
        stats.files += 1;
    }
    Ok(())
}

/// A non-empty error log carries the scanner's failure for this host.
pub fn check_error_log(host_dir: &Path, host: &str) -> Result<()> {
    let path = host_dir.join(ERROR_LOG_FILENAME);
    let data = match fs::read(&path) {
        Ok(d) => String::from_utf8_lossy(&d).into_owned(),
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(SummarizerError::ingest(
                host,
                format!("reading {}: {}", path.display(), e),
            ))
        }
    };

    // error.log is created by shell redirection, so an empty one is normal
    if data.is_empty() {
        log::info!("found empty {} for host {}, ignoring", ERROR_LOG_FILENAME, host);
        return Ok(());
    }
    log::info!("found error file for host {}", host);
    Err(SummarizerError::ingest(host, data.trim_end().to_string()))
}

/// Parses and validates a whole file before anything is merged.
pub fn parse_result_file(path: &Path, host: &str) -> Result<Vec<Observation>> {
    let contents = fs::read(path).map_err(|e| {
        SummarizerError::ingest(host, format!("reading file {}: {}", path.display(), e))
    })?;
    parse_results(&contents).map_err(|msg| {
        SummarizerError::ingest(host, format!("parsing {}: {}", path.display(), msg))
    })
}

pub fn parse_results(contents: &[u8]) -> std::result::Result<Vec<Observation>, String> {
    let overall: RawOverallControls =
        serde_json::from_slice(contents).map_err(|e| format!("unmarshalling: {}", e))?;

    let mut observations = Vec::new();
    for controls in overall.controls.unwrap_or_default() {
        for group in controls.tests.unwrap_or_default() {
            for check in group.results.unwrap_or_default() {
                let state = check.status.parse::<ObservedState>()
                    .map_err(|e| format!("check {}: {}", check.test_number, e))?;
                observations.push(Observation {
                    check_id:        check.test_number,
                    state,
                    actual_value:    check.actual_value,
                    expected_result: check.expected_result,
                });
            }
        }
    }
    Ok(observations)
}

/// Adds one file's observations to the catalog records.
pub fn merge_observations(
    catalog: &mut Catalog,
    resolver: &OverrideResolver,
    host: &str,
    role: Role,
    observations: Vec<Observation>,
    stats: &mut IngestStats,
) {
    for obs in observations {
        log::debug!("host: {} id: {} {}", host, obs.check_id, obs.state);

        let Some(record) = catalog.get_mut(&obs.check_id) else {
            log::warn!("check {} found in results but not in catalog", obs.check_id);
            stats.unknown_checks += 1;
            continue;
        };
        if !record.roles.contains(&role) {
            log::warn!(
                "check {} reported by {} as {} but only applies to {:?}, dropping",
                obs.check_id, host, role, record.roles
            );
            stats.out_of_role += 1;
            continue;
        }

        let state = resolver.apply(&record.id, &record.test_type, obs.state);
        record.observations.insert(state, host);
        record.actual_value_per_node.insert(host.to_string(), obs.actual_value);
        if record.expected_result.is_empty() {
            record.expected_result = obs.expected_result;
        }
        stats.observations += 1;
    }
}

// ── 目录遍历 ────────────────────────────────────────────────────────────────

fn list_host_dirs(input_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(input_dir).map_err(|e| {
        SummarizerError::ingest("-", format!("listing directory {}: {}", input_dir.display(), e))
    })?;

    let mut hosts = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            hosts.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    hosts.sort();
    Ok(hosts)
}

fn list_result_files(host_dir: &Path, host: &str) -> Result<Vec<(PathBuf, String)>> {
    let entries = fs::read_dir(host_dir).map_err(|e| {
        SummarizerError::ingest(host, format!("listing directory {}: {}", host_dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        files.push((path, name));
    }
    files.sort_by(|a, b| a.1.cmp(&b.1));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summarize::catalog::RawControls;
    use std::collections::{BTreeMap, BTreeSet};

    const RESULTS: &str = r#"{
  "Controls": [{
    "id": "4", "text": "Worker Node Security Configuration", "node_type": "node",
    "tests": [{
      "section": "4.1", "desc": "Worker Node Configuration Files",
      "results": [
        {"test_number": "4.1.1", "test_desc": "kubelet service file permissions", "status": "PASS", "actual_value": "permissions=600", "expected_result": "permissions <= 600"},
        {"test_number": "4.1.2", "test_desc": "kubelet service file ownership", "status": "FAIL", "actual_value": "root:admin"},
        {"test_number": "9.9.9", "test_desc": "not in catalog", "status": "PASS", "actual_value": ""}
      ]
    }]
  }],
  "Totals": {"total_pass": 2, "total_fail": 1, "total_warn": 0, "total_info": 0}
}"#;

    const WORKER: &str = r#"
groups:
  - id: "4.1"
    text: "Worker Node Configuration Files"
    checks:
      - id: 4.1.1
        text: "kubelet service file permissions"
      - id: 4.1.2
        text: "kubelet service file ownership"
"#;

    fn worker_catalog(resolver: &OverrideResolver) -> Catalog {
        let mut catalog = Catalog::new();
        let controls: RawControls = serde_yaml::from_str(WORKER).unwrap();
        catalog.merge(controls, Role::Worker, resolver);
        catalog
    }

    #[test]
    fn parses_scanner_output() {
        let obs = parse_results(RESULTS.as_bytes()).unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].state, ObservedState::Pass);
        assert_eq!(obs[1].actual_value, "root:admin");
        assert_eq!(obs[0].expected_result, "permissions <= 600");
    }

    #[test]
    fn unknown_status_makes_file_malformed() {
        let bad = r#"{"Controls":[{"tests":[{"results":[{"test_number":"1","status":"MAYBE"}]}]}]}"#;
        let err = parse_results(bad.as_bytes()).unwrap_err();
        assert!(err.contains("MAYBE"));
        assert!(parse_results(b"{\"Controls\": [").is_err());
    }

    #[test]
    fn unknown_checks_are_dropped_others_merged() {
        let resolver = OverrideResolver::default();
        let mut catalog = worker_catalog(&resolver);
        let mut stats = IngestStats::default();
        let obs = parse_results(RESULTS.as_bytes()).unwrap();

        merge_observations(&mut catalog, &resolver, "w1", Role::Worker, obs, &mut stats);

        assert_eq!(stats.unknown_checks, 1);
        assert_eq!(stats.observations, 2);
        let c = catalog.get("4.1.2").unwrap();
        assert!(c.observations.get(ObservedState::Fail).contains("w1"));
        assert_eq!(c.actual_value_per_node["w1"], "root:admin");
    }

    #[test]
    fn overrides_replace_observed_state() {
        let resolver = OverrideResolver::new(
            BTreeMap::new(),
            BTreeMap::new(),
            BTreeSet::from(["4.1.2".to_string()]),
        );
        let mut catalog = worker_catalog(&resolver);
        let mut stats = IngestStats::default();
        let obs = parse_results(RESULTS.as_bytes()).unwrap();
        merge_observations(&mut catalog, &resolver, "w1", Role::Worker, obs, &mut stats);

        let c = catalog.get("4.1.2").unwrap();
        assert!(c.observations.get(ObservedState::Fail).is_empty());
        assert!(c.observations.get(ObservedState::Skip).contains("w1"));
        // actual value is kept whatever the state
        assert_eq!(c.actual_value_per_node["w1"], "root:admin");
    }

    #[test]
    fn observations_outside_check_roles_are_dropped() {
        let resolver = OverrideResolver::default();
        let mut catalog = worker_catalog(&resolver);
        let mut stats = IngestStats::default();
        let obs = parse_results(RESULTS.as_bytes()).unwrap();
        merge_observations(&mut catalog, &resolver, "cp1", Role::ControlPlane, obs, &mut stats);

        assert_eq!(stats.out_of_role, 2);
        assert!(catalog.get("4.1.1").unwrap().observations.is_empty());
    }

    #[test]
    fn error_log_handling() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_error_log(dir.path(), "h1").is_ok());

        fs::write(dir.path().join(ERROR_LOG_FILENAME), "").unwrap();
        assert!(check_error_log(dir.path(), "h1").is_ok());

        fs::write(dir.path().join(ERROR_LOG_FILENAME), "kube-bench: cannot find config\n").unwrap();
        match check_error_log(dir.path(), "h1") {
            Err(SummarizerError::Ingest { host, message }) => {
                assert_eq!(host, "h1");
                assert_eq!(message, "kube-bench: cannot find config");
            }
            other => panic!("expected ingest error, got {:?}", other),
        }
    }

    #[test]
    fn error_log_with_invalid_utf8_still_reports_contents() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(ERROR_LOG_FILENAME), b"scan failed: \xff\xfe bad bytes\n").unwrap();
        match check_error_log(dir.path(), "h1") {
            Err(SummarizerError::Ingest { message, .. }) => {
                assert!(message.starts_with("scan failed: "));
                assert!(message.ends_with(" bad bytes"));
            }
            other => panic!("expected ingest error, got {:?}", other),
        }
    }

    #[test]
    fn policies_results_merge_without_joining_roster() {
        let master = r#"
groups:
  - id: "5.1"
    text: "RBAC and Service Accounts"
    checks:
      - id: "5.1.1"
        text: "cluster-admin role is only used where required"
"#;
        let results = r#"{"Controls":[{"tests":[{"results":[
            {"test_number":"5.1.1","status":"WARN","actual_value":"2 bindings"}
        ]}]}]}"#;
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("cp1")).unwrap();
        fs::write(dir.path().join("cp1/policies.json"), results).unwrap();

        let resolver = OverrideResolver::default();
        let mut catalog = Catalog::new();
        let controls: RawControls = serde_yaml::from_str(master).unwrap();
        catalog.merge(controls, Role::ControlPlane, &resolver);
        let mut roster = HostRoster::default();
        let stats = ingest_all(dir.path(), &mut catalog, &resolver, &mut roster).unwrap();

        assert_eq!(stats.files, 1);
        assert!(roster.is_empty());
        let c = catalog.get("5.1.1").unwrap();
        assert!(c.observations.get(ObservedState::Warn).contains("cp1"));
    }

    #[test]
    fn host_roster_is_built_from_files_read() {
        let dir = tempfile::tempdir().unwrap();
        let host_dir = dir.path().join("w1");
        fs::create_dir_all(&host_dir).unwrap();
        fs::write(host_dir.join("node.json"), RESULTS).unwrap();
        fs::write(host_dir.join("notes.json"), "{}").unwrap();

        let resolver = OverrideResolver::default();
        let mut catalog = worker_catalog(&resolver);
        let mut roster = HostRoster::default();
        let stats = ingest_all(dir.path(), &mut catalog, &resolver, &mut roster).unwrap();

        assert_eq!(stats.hosts, 1);
        assert_eq!(stats.files, 1);
        assert!(roster.get(Role::Worker).unwrap().contains("w1"));
        assert!(roster.get(Role::ControlPlane).is_none());
    }
}
