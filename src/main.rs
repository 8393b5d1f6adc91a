// Entrypoint for the CLI application.
// - Keeps `main` small: parse arguments, build the client, resolve inputs
//   and hand everything to the batch runner.
// - Returns `anyhow::Result` so setup failures print with context.

use anyhow::Context;
use clap::Parser;
use tracing::warn;

use tinyshrink::api::ShrinkClient;
use tinyshrink::batch::run_batch;
use tinyshrink::cli::Cli;
use tinyshrink::config::{ClientSettings, MaxRatio, DEFAULT_MAX_RATIO};
use tinyshrink::error::InputError;
use tinyshrink::inputs;
use tinyshrink::interrupt::Interrupt;
use tinyshrink::logging::setup_logging;
use tinyshrink::ui::Console;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose, cli.log_json)?;

    if cli.recursive && !MaxRatio::is_valid(cli.max) {
        warn!(max = cli.max, "Max ratio must be within 0-100, using {}", DEFAULT_MAX_RATIO);
    }

    let files = match inputs::resolve(&cli.path) {
        Ok(files) => files,
        Err(e @ InputError::NothingFound(_)) => {
            println!("{}", e);
            return Ok(());
        }
        Err(e) => return Err(e).context("Failed to resolve input path"),
    };

    // Endpoint, timeout and user agent come from `TINYSHRINK_*` variables.
    // See `config::ClientSettings::from_env`.
    let mut settings = ClientSettings::from_env();
    settings.show_progress = !cli.quiet;
    let client = ShrinkClient::new(&settings).context("Failed to build HTTP client")?;

    let interrupt = Interrupt::new();
    interrupt
        .install()
        .context("Failed to install Ctrl+C handler")?;

    let console = Console::new(cli.quiet);
    let config = cli.run_config();
    let summary = run_batch(&client, &config, &console, &interrupt, &files);

    if !summary.is_success() {
        anyhow::bail!(
            "{} of {} files failed",
            summary.failures.len(),
            files.len()
        );
    }
    Ok(())
}
