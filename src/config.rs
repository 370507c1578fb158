//! 运行配置
//! 来源：命令行参数 / 环境变量、<controls-dir>/config.yaml、三个可选的 override JSON 文件

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::{Result, Role, SummarizerError};

pub const DEFAULT_OUTPUT_FILENAME: &str = "report.json";
pub const DEFAULT_CONTROLS_DIR: &str = "/etc/kube-bench/cfg";
pub const CATALOG_CONFIG_FILENAME: &str = "config.yaml";
pub const CURRENT_BENCHMARK_KEY: &str = "current";

// ── 运行配置 ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportEncoding {
    /// Indented JSON
    #[default]
    Pretty,
    /// Minified JSON, same schema
    Compact,
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub k8s_version: Option<String>,
    pub benchmark_version: Option<String>,
    pub controls_dir: PathBuf,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_filename: String,
    pub user_skip_file: Option<PathBuf>,
    pub default_skip_file: Option<PathBuf>,
    pub not_applicable_file: Option<PathBuf>,
    /// Extra user-skip ids given directly on the command line.
    pub skip: Vec<String>,
    pub encoding: ReportEncoding,
}

impl SummarizerConfig {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            k8s_version: None,
            benchmark_version: None,
            controls_dir: PathBuf::from(DEFAULT_CONTROLS_DIR),
            input_dir: input_dir.into(),
            output_dir: output_dir.into(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            user_skip_file: None,
            default_skip_file: None,
            not_applicable_file: None,
            skip: Vec::new(),
            encoding: ReportEncoding::default(),
        }
    }

    /// Rejects missing or contradictory inputs before anything is read.
    pub fn validate(&self) -> Result<()> {
        if self.input_dir.as_os_str().is_empty() {
            return Err(SummarizerError::Configuration("input-dir not specified".to_string()));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(SummarizerError::Configuration("output-dir not specified".to_string()));
        }
        if is_blank(&self.k8s_version) && is_blank(&self.benchmark_version) {
            return Err(SummarizerError::Configuration(
                "one of k8s-version or benchmark-version must be specified".to_string(),
            ));
        }
        if !self.input_dir.is_dir() {
            return Err(SummarizerError::Configuration(format!(
                "input directory does not exist: {}",
                self.input_dir.display()
            )));
        }
        if self.output_filename.is_empty()
            || self.output_filename.contains('/')
            || self.output_filename.contains('\\')
        {
            return Err(SummarizerError::Configuration(format!(
                "invalid output filename: {:?}",
                self.output_filename
            )));
        }
        Ok(())
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_filename)
    }
}

fn is_blank(v: &Option<String>) -> bool {
    v.as_deref().map(str::trim).map_or(true, str::is_empty)
}

// ── config.yaml ─────────────────────────────────────────────────────────────

/// One check-definition file of the selected benchmark and the role it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogFile {
    pub target: String,
    pub path: PathBuf,
    pub role: Role,
}

#[derive(Debug, Clone, Default)]
pub struct CatalogConfig {
    /// k8s version → benchmark version
    pub version_mapping: BTreeMap<String, String>,
    /// benchmark version → ordered target names
    pub target_mapping: BTreeMap<String, Vec<String>>,
}

/// Keys and values are read as text so unquoted versions such as `1.20` keep their digits.
#[derive(Deserialize)]
struct RawCatalogConfig {
    #[serde(default)]
    version_mapping: BTreeMap<String, String>,
    #[serde(default)]
    target_mapping: BTreeMap<String, Vec<String>>,
}

impl CatalogConfig {
    pub fn load(controls_dir: &Path) -> Result<Self> {
        let path = controls_dir.join(CATALOG_CONFIG_FILENAME);
        let content = fs::read_to_string(&path)
            .map_err(|e| SummarizerError::catalog(&path, format!("reading config: {}", e)))?;
        Self::parse(&content).map_err(|msg| SummarizerError::catalog(&path, msg))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, String> {
        let RawCatalogConfig { version_mapping, target_mapping } = serde_yaml::from_str(content)
            .map_err(|e| format!("parsing config: {}", e))?;

        if version_mapping.is_empty() {
            return Err("config file is missing 'version_mapping' section".to_string());
        }
        if target_mapping.is_empty() {
            return Err("config file is missing 'target_mapping' section".to_string());
        }
        Ok(Self { version_mapping, target_mapping })
    }

    /// An explicit benchmark version wins over the k8s version lookup.
    pub fn resolve_benchmark(
        &self,
        k8s_version: Option<&str>,
        benchmark_version: Option<&str>,
    ) -> Result<String> {
        if let Some(b) = benchmark_version.map(str::trim).filter(|b| !b.is_empty()) {
            return Ok(b.to_string());
        }
        let k8s = k8s_version.map(str::trim).filter(|k| !k.is_empty()).ok_or_else(|| {
            SummarizerError::Configuration("no k8s version or benchmark version given".to_string())
        })?;
        self.version_mapping.get(k8s).cloned().ok_or_else(|| {
            SummarizerError::Configuration(format!("k8s version {} not supported", k8s))
        })
    }

    /// Check-definition files for `benchmark`, in `target_mapping` order.
    pub fn catalog_files(&self, controls_dir: &Path, benchmark: &str) -> Result<Vec<CatalogFile>> {
        let targets = self.target_mapping.get(benchmark).ok_or_else(|| {
            SummarizerError::Configuration(format!(
                "benchmark version {} has no target mapping",
                benchmark
            ))
        })?;
        Ok(targets
            .iter()
            .map(|t| CatalogFile {
                target: t.clone(),
                path: controls_dir.join(benchmark).join(format!("{}.yaml", t)),
                role: Role::from_target(t),
            })
            .collect())
    }
}

// ── override 文件 ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
struct UserSkipFile {
    #[serde(default)]
    skip: UserSkipEntries,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserSkipEntries {
    PerBenchmark(BTreeMap<String, Vec<String>>),
    Flat(Vec<String>),
}

impl Default for UserSkipEntries {
    fn default() -> Self {
        UserSkipEntries::PerBenchmark(BTreeMap::new())
    }
}

/// User-skip ids for `benchmark`, falling back to the `current` list.
pub fn load_user_skip(path: Option<&Path>, benchmark: &str) -> Result<BTreeSet<String>> {
    let Some(path) = path else {
        return Ok(BTreeSet::new());
    };
    let data = read_override_file(path)?;
    if data.trim().is_empty() {
        return Ok(BTreeSet::new());
    }
    let file: UserSkipFile = serde_json::from_str(&data).map_err(|e| {
        SummarizerError::Configuration(format!("parsing skip config {}: {}", path.display(), e))
    })?;

    let ids = match file.skip {
        UserSkipEntries::Flat(ids) => ids,
        UserSkipEntries::PerBenchmark(mut by_benchmark) => by_benchmark
            .remove(benchmark)
            .or_else(|| by_benchmark.remove(CURRENT_BENCHMARK_KEY))
            .unwrap_or_default(),
    };
    let skip: BTreeSet<String> = ids.into_iter().filter(|id| !id.is_empty()).collect();
    log::debug!("user skip for {}: {:?}", benchmark, skip);
    Ok(skip)
}

/// check id → replacement remediation text. An empty file is an empty map.
pub fn load_checks_map(path: Option<&Path>) -> Result<BTreeMap<String, String>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    log::info!("loading checks from config file: {}", path.display());
    let data = read_override_file(path)?;
    if data.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(&data).map_err(|e| {
        SummarizerError::Configuration(format!("parsing config file {}: {}", path.display(), e))
    })
}

/// Comma separated ids from `--skip` / `SKIP`.
pub fn parse_skip_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn read_override_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        SummarizerError::Configuration(format!("reading file {}: {}", path.display(), e))
    })
}
