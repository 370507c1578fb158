use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use bench_summarizer::config::{self, ReportEncoding, SummarizerConfig};

#[derive(Parser)]
#[command(name = "bench-summarizer")]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (built ", env!("BUILD_TIME"), ")"))]
#[command(about = "Aggregates per-node security benchmark results into one cluster report", long_about = None)]
pub struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Merge per-host result files into one report
    Summarize(SummarizeArgs),

    /// Rewrite a report in the legacy public JSON shape
    #[command(arg_required_else_help = true)]
    Translate {
        /// Report produced by `summarize`
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print a report as text or json
    #[command(arg_required_else_help = true)]
    Inspect {
        /// Report produced by `summarize`
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (text or json)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Decode and show per-host actual values
        #[arg(short, long)]
        diagnostics: bool,
    },
}

#[derive(Args)]
pub struct SummarizeArgs {
    /// Kubernetes version, mapped to a benchmark through config.yaml
    #[arg(long, env = "K8S_VERSION")]
    pub k8s_version: Option<String>,

    /// Benchmark version, overrides --k8s-version
    #[arg(long, env = "BENCHMARK_VERSION")]
    pub benchmark_version: Option<String>,

    /// Directory holding config.yaml and <benchmark>/<target>.yaml
    #[arg(long, env = "CONTROLS_DIR", default_value = config::DEFAULT_CONTROLS_DIR)]
    pub controls_dir: PathBuf,

    /// Directory with one sub-directory of result files per host
    #[arg(long, env = "INPUT_DIR")]
    pub input_dir: PathBuf,

    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: PathBuf,

    #[arg(long, env = "OUTPUT_FILENAME", default_value = config::DEFAULT_OUTPUT_FILENAME)]
    pub output_filename: String,

    /// JSON: {"skip": {"<benchmark>"|"current": [ids]}}
    #[arg(long, env = "USER_SKIP_CONFIG_FILE")]
    pub user_skip_config_file: Option<PathBuf>,

    /// JSON: {"<id>": "<remediation>"}
    #[arg(long, env = "DEFAULT_SKIP_CONFIG_FILE")]
    pub default_skip_config_file: Option<PathBuf>,

    /// JSON: {"<id>": "<remediation>"}
    #[arg(long, env = "NOT_APPLICABLE_CONFIG_FILE")]
    pub not_applicable_config_file: Option<PathBuf>,

    /// Comma separated check ids to skip
    #[arg(long, env = "SKIP")]
    pub skip: Option<String>,

    #[arg(long, value_enum, default_value_t = ReportEncoding::Pretty)]
    pub encoding: ReportEncoding,
}

impl SummarizeArgs {
    pub fn into_config(self) -> SummarizerConfig {
        SummarizerConfig {
            k8s_version:         self.k8s_version,
            benchmark_version:   self.benchmark_version,
            controls_dir:        self.controls_dir,
            input_dir:           self.input_dir,
            output_dir:          self.output_dir,
            output_filename:     self.output_filename,
            user_skip_file:      self.user_skip_config_file,
            default_skip_file:   self.default_skip_config_file,
            not_applicable_file: self.not_applicable_config_file,
            skip:                self.skip.as_deref().map(config::parse_skip_list).unwrap_or_default(),
            encoding:            self.encoding,
        }
    }
}
