//! 旧版公开报告格式转换（纯结构映射，无判定逻辑）
//! The diagnostic blob is re-encoded with the legacy key names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::summarize::diagnostics::{self, DiagnosticGroup};
use crate::summarize::record::{CheckRecord, GroupRecord};
use crate::summarize::report::Report;
use crate::utils::{CheckState, Result, SummarizerError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyCheck {
    pub id: String,
    pub description: String,
    pub remediation: String,
    pub state: CheckState,
    pub node_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    pub audit: String,
    pub actual_value_per_node: BTreeMap<String, String>,
    pub expected_result: String,
    pub test_type: String,
    pub scored: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyGroup {
    pub id: String,
    pub description: String,
    pub checks: Vec<LegacyCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyReport {
    pub version: String,
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub warn: usize,
    pub not_applicable: usize,
    pub nodes: BTreeMap<String, Vec<String>>,
    pub results: Vec<LegacyGroup>,
    #[serde(rename = "actual_value_map_data")]
    pub actual_value_map_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyActualValueGroup {
    pub id: String,
    pub description: String,
    pub actual_value_checks: Vec<LegacyActualValueCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyActualValueCheck {
    pub id: String,
    pub description: String,
    pub actual_value_node_map: BTreeMap<String, String>,
}

fn map_actual_values(tree: Vec<DiagnosticGroup>) -> Vec<LegacyActualValueGroup> {
    tree.into_iter()
        .map(|g| LegacyActualValueGroup {
            id: g.id,
            description: g.description,
            actual_value_checks: g
                .checks
                .into_iter()
                .map(|c| LegacyActualValueCheck {
                    id: c.id,
                    description: c.description,
                    actual_value_node_map: c.actual_values,
                })
                .collect(),
        })
        .collect()
}

/// Empty stays empty.
fn legacy_blob(blob: &str) -> Result<String> {
    if blob.is_empty() {
        return Ok(String::new());
    }
    diagnostics::compress_json(&map_actual_values(diagnostics::decode(blob)?))
}

fn map_check(check: &CheckRecord) -> LegacyCheck {
    LegacyCheck {
        id:                    check.id.clone(),
        description:           check.description.clone(),
        remediation:           check.remediation.clone(),
        state:                 check.state.unwrap_or(CheckState::NotApplicable),
        node_type:             check.roles.iter().map(|r| r.legacy_name().to_string()).collect(),
        nodes:                 check.deviating_nodes.clone(),
        audit:                 check.audit.clone(),
        actual_value_per_node: check.actual_value_per_node.clone(),
        expected_result:       check.expected_result.clone(),
        test_type:             check.test_type.clone(),
        scored:                check.scored,
    }
}

fn map_group(group: &GroupRecord) -> LegacyGroup {
    LegacyGroup {
        id: group.id.clone(),
        description: group.description.clone(),
        checks: group.checks.iter().map(map_check).collect(),
    }
}

pub fn translate(report: &Report) -> Result<LegacyReport> {
    let mut results: Vec<LegacyGroup> = report.groups.iter().map(map_group).collect();
    results.sort_by(|a, b| a.id.cmp(&b.id));

    let nodes: BTreeMap<String, Vec<String>> = report
        .nodes
        .iter()
        .map(|(role, hosts)| (role.legacy_name().to_string(), hosts.iter().cloned().collect::<Vec<_>>()))
        .collect();

    let s = &report.summary;
    Ok(LegacyReport {
        version: report.version.clone(),
        total: s.total,
        pass: s.pass,
        fail: s.fail,
        skip: s.skip,
        warn: s.warn,
        not_applicable: s.not_applicable,
        nodes,
        results,
        actual_value_map_data: legacy_blob(&report.actual_value_map_data)?,
    })
}

/// Report JSON in, legacy JSON out.
pub fn translate_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let report: Report = serde_json::from_slice(data)
        .map_err(|e| SummarizerError::Encode(format!("unmarshalling report: {}", e)))?;
    log::debug!("translating report {} with {} checks", report.version, report.check_count());
    serde_json::to_vec(&translate(&report)?)
        .map_err(|e| SummarizerError::Encode(format!("marshalling legacy report: {}", e)))
}
