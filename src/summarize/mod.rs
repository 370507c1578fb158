pub mod catalog;
pub mod diagnostics;
pub mod ingest;
pub mod legacy;
pub mod output;
pub mod overrides;
pub mod reconcile;
pub mod record;
pub mod report;

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{self, CatalogConfig, SummarizerConfig};
use crate::utils::Result;
use catalog::Catalog;
use overrides::OverrideResolver;
use record::{HostRoster, Summary};
use report::Report;

/// Working state of one summarization run. Built fresh per run and consumed by `summarize`.
#[derive(Debug)]
pub struct Summarizer {
    benchmark_version: String,
    input_dir: PathBuf,
    catalog: Catalog,
    resolver: OverrideResolver,
    roster: HostRoster,
}

impl Summarizer {
    /// Validates the config, resolves the benchmark, loads overrides, then the catalog.
    pub fn new(config: &SummarizerConfig) -> Result<Self> {
        config.validate()?;

        let catalog_config = CatalogConfig::load(&config.controls_dir)?;
        log::debug!("version_mapping: {:?}", catalog_config.version_mapping);
        log::debug!("target_mapping: {:?}", catalog_config.target_mapping);

        let benchmark = catalog_config.resolve_benchmark(
            config.k8s_version.as_deref(),
            config.benchmark_version.as_deref(),
        )?;
        log::info!("benchmark version: {}", benchmark);
        let files = catalog_config.catalog_files(&config.controls_dir, &benchmark)?;

        let mut user_skip: BTreeSet<String> =
            config::load_user_skip(config.user_skip_file.as_deref(), &benchmark)?;
        user_skip.extend(config.skip.iter().cloned());
        let resolver = OverrideResolver::new(
            config::load_checks_map(config.not_applicable_file.as_deref())?,
            config::load_checks_map(config.default_skip_file.as_deref())?,
            user_skip,
        );

        let catalog = catalog::load(&files, &resolver)?;
        Ok(Self::from_parts(&benchmark, &config.input_dir, catalog, resolver))
    }

    pub fn from_parts(
        benchmark_version: &str,
        input_dir: &Path,
        catalog: Catalog,
        resolver: OverrideResolver,
    ) -> Self {
        Self {
            benchmark_version: benchmark_version.to_string(),
            input_dir: input_dir.to_path_buf(),
            catalog,
            resolver,
            roster: HostRoster::default(),
        }
    }

    pub fn benchmark_version(&self) -> &str {
        &self.benchmark_version
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Ingest → reconcile → assemble. Any error aborts with no report.
    pub fn summarize(mut self) -> Result<Report> {
        log::info!("summarize");
        let mut summary = Summary::new(self.catalog.len());

        ingest::ingest_all(&self.input_dir, &mut self.catalog, &self.resolver, &mut self.roster)?;
        reconcile::reconcile(&mut self.catalog, &self.roster, &mut summary);
        log::debug!("summary after final pass: {:?}", summary);

        report::assemble(&self.benchmark_version, summary, self.roster, self.catalog.into_groups())
    }
}

// ── 命令入口 ────────────────────────────────────────────────────────────────

/// Builds the report and writes it; returns the written path.
pub fn run_summarize(config: &SummarizerConfig) -> Result<PathBuf> {
    log::info!("Running Summarizer");
    let report = Summarizer::new(config)?.summarize()?;
    let path = config.output_path();
    report::save(&report, &path, config.encoding)?;
    Ok(path)
}

/// Rewrites a report in the legacy public shape, to `output` or stdout.
pub fn run_translate(input: &Path, output: Option<&Path>) -> Result<()> {
    let data = fs::read(input)?;
    let legacy = legacy::translate_bytes(&data)?;
    match output {
        Some(path) => {
            fs::write(path, &legacy)?;
            log::info!("wrote legacy report: {}", path.display());
        }
        None => println!("{}", String::from_utf8_lossy(&legacy)),
    }
    Ok(())
}

pub fn run_inspect(input: &Path, format: &str, show_diagnostics: bool) -> Result<()> {
    let report = report::load(input)?;
    let tree = if show_diagnostics {
        Some(diagnostics::decode(&report.actual_value_map_data)?)
    } else {
        None
    };
    output::display(&report, format, tree.as_deref())
}
