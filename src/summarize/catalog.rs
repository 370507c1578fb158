//! 检查项目录加载
//! 来源：<controls-dir>/<benchmark>/<target>.yaml，按 target_mapping 顺序

use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;

use crate::config::CatalogFile;
use crate::summarize::overrides::OverrideResolver;
use crate::summarize::record::{CheckRecord, GroupRecord};
use crate::utils::{Result, Role, SummarizerError};

// ── 文件格式 ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RawControls {
    #[serde(default)]
    pub groups: Option<Vec<RawGroup>>,
}

#[derive(Debug, Deserialize)]
pub struct RawGroup {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub checks: Option<Vec<RawCheck>>,
}

#[derive(Debug, Deserialize)]
pub struct RawCheck {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "type")]
    pub check_type: String,
    #[serde(default)]
    pub remediation: String,
    #[serde(default)]
    pub scored: bool,
    #[serde(default)]
    pub audit: String,
}

// ── Catalog ─────────────────────────────────────────────────────────────────

/// Groups and checks of one benchmark version, indexed by check id.
#[derive(Debug, Default)]
pub struct Catalog {
    groups: Vec<GroupRecord>,
    group_index: HashMap<String, usize>,
    check_index: HashMap<String, (usize, usize)>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct check ids.
    pub fn len(&self) -> usize {
        self.check_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.check_index.is_empty()
    }

    pub fn get(&self, check_id: &str) -> Option<&CheckRecord> {
        let &(g, c) = self.check_index.get(check_id)?;
        self.groups.get(g)?.checks.get(c)
    }

    pub fn get_mut(&mut self, check_id: &str) -> Option<&mut CheckRecord> {
        let &(g, c) = self.check_index.get(check_id)?;
        self.groups.get_mut(g)?.checks.get_mut(c)
    }

    pub fn groups(&self) -> &[GroupRecord] {
        &self.groups
    }

    pub fn checks_mut(&mut self) -> impl Iterator<Item = &mut CheckRecord> {
        self.groups.iter_mut().flat_map(|g| g.checks.iter_mut())
    }

    pub fn into_groups(self) -> Vec<GroupRecord> {
        self.groups
    }

    /// Merges one parsed file. Checks already present only gain `role`.
    pub fn merge(&mut self, controls: RawControls, role: Role, resolver: &OverrideResolver) {
        for group in controls.groups.unwrap_or_default() {
            let g = match self.group_index.get(&group.id) {
                Some(&g) => g,
                None => {
                    self.groups.push(GroupRecord {
                        id: group.id.clone(),
                        description: group.text.clone(),
                        checks: Vec::new(),
                    });
                    self.group_index.insert(group.id.clone(), self.groups.len() - 1);
                    self.groups.len() - 1
                }
            };

            for check in group.checks.unwrap_or_default() {
                if let Some(existing) = self.get_mut(&check.id) {
                    existing.add_role(role);
                    continue;
                }
                let record = new_record(check, role, resolver);
                let checks = &mut self.groups[g].checks;
                self.check_index.insert(record.id.clone(), (g, checks.len()));
                checks.push(record);
            }
        }
    }
}

fn new_record(check: RawCheck, role: Role, resolver: &OverrideResolver) -> CheckRecord {
    let disposition = resolver.resolve(&check.id, &check.check_type);
    let remediation = disposition
        .remediation()
        .map(str::to_string)
        .unwrap_or(check.remediation);

    CheckRecord {
        id:          check.id,
        description: check.text,
        remediation,
        scored:      check.scored,
        test_type:   check.check_type,
        roles:       vec![role],
        audit:       check.audit,
        disposition,
        ..CheckRecord::default()
    }
}

// ── 加载入口 ────────────────────────────────────────────────────────────────

/// Loads every file in order. A missing file is skipped; unreadable or malformed files fail the run.
pub fn load(files: &[CatalogFile], resolver: &OverrideResolver) -> Result<Catalog> {
    let mut catalog = Catalog::new();

    for file in files {
        match load_file(file)? {
            Some(controls) => catalog.merge(controls, file.role, resolver),
            None => log::warn!(
                "controls file {} for target {} not found, skipping",
                file.path.display(),
                file.target
            ),
        }
    }

    log::debug!("total groups loaded: {}", catalog.groups.len());
    log::debug!("total controls loaded: {}", catalog.len());
    Ok(catalog)
}

/// `Ok(None)` when the file does not exist.
pub fn load_file(file: &CatalogFile) -> Result<Option<RawControls>> {
    let content = match fs::read_to_string(&file.path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SummarizerError::catalog(&file.path, format!("reading file: {}", e))),
    };
    if content.trim().is_empty() {
        log::warn!("controls file {} is empty", file.path.display());
        return Ok(Some(RawControls { groups: None }));
    }

    let controls = serde_yaml::from_str(&content)
        .map_err(|e| SummarizerError::catalog(&file.path, format!("parsing controls: {}", e)))?;
    Ok(Some(controls))
}
