mod cli;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};

use bench_summarizer::utils::logging;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli.command) {
        log::error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Summarize(args) => {
            let config = args.into_config();
            let path = bench_summarizer::run_summarize(&config).context("error summarizing")?;
            println!("{}", path.display());
        }
        Commands::Translate { input, output } => {
            bench_summarizer::run_translate(&input, output.as_deref())
                .with_context(|| format!("error translating {}", input.display()))?;
        }
        Commands::Inspect { input, format, diagnostics } => {
            bench_summarizer::run_inspect(&input, &format, diagnostics)
                .with_context(|| format!("error inspecting {}", input.display()))?;
        }
    }
    Ok(())
}
