use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use clap::Parser;
use tracing::{error, info};

use matrix_harvest::bing::{BingClient, BingConfig, DEFAULT_BASE_URL};
use matrix_harvest::config::{DEFAULT_CELL_LIMIT, RunConfig, parse_timezone};
use matrix_harvest::error::HarvestError;
use matrix_harvest::logging::init_logging;
use matrix_harvest::run::{Harvester, RunOutcome};

/// Collect pairwise travel times for a coordinate set, resuming where the
/// last run stopped.
#[derive(Debug, Parser)]
#[command(name = "matrix-harvest", version)]
struct Cli {
    /// Coordinates, one `identifier latitude longitude` per line.
    #[arg(long, default_value = "sample-input.txt")]
    coords: PathBuf,
    /// Times of day, one per line.
    #[arg(long, default_value = "times.txt")]
    times: PathBuf,
    /// API keys in rotation order, one per line.
    #[arg(long, default_value = "keys.txt")]
    keys: PathBuf,
    /// Saved progress; removed once everything is done.
    #[arg(long, default_value = "state.txt")]
    state: PathBuf,
    #[arg(long, default_value = "output.txt")]
    output: PathBuf,
    /// Date to request travel times for (YYYY-MM-DD).
    #[arg(long, default_value = "2019-08-05")]
    date: NaiveDate,
    /// UTC offset appended to each start time.
    #[arg(long, default_value = "-07:00", value_parser = parse_timezone, allow_hyphen_values = true)]
    timezone: String,
    /// Origins per request.
    #[arg(long, default_value_t = 1)]
    row_width: usize,
    /// Destinations per request.
    #[arg(long, default_value_t = 9)]
    col_width: usize,
    /// Maximum origins x destinations per request.
    #[arg(long, default_value_t = DEFAULT_CELL_LIMIT)]
    cell_limit: usize,
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
    #[arg(long, default_value = "mi")]
    distance_unit: String,
    #[arg(long, default_value = "driving")]
    travel_mode: String,
    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> RunConfig {
        RunConfig {
            coords_path: self.coords,
            times_path: self.times,
            keys_path: self.keys,
            state_path: self.state,
            output_path: self.output,
            date: self.date,
            timezone: self.timezone,
            row_width: self.row_width,
            col_width: self.col_width,
            cell_limit: self.cell_limit,
            provider: BingConfig {
                base_url: self.base_url,
                distance_unit: self.distance_unit,
                travel_mode: self.travel_mode,
                timeout_secs: self.timeout_secs,
            },
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.into_config()) {
        Ok(RunOutcome::Finished { batches }) => {
            info!(batches, "done");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Suspended { cursor }) => {
            eprintln!(
                "All API keys are returning errors; saved progress at time {} origin {} destination {}. Re-run once quotas reset.",
                cursor.time_index, cursor.row_position, cursor.col_position
            );
            ExitCode::from(2)
        }
        Ok(RunOutcome::Interrupted { cursor }) => {
            eprintln!(
                "Interrupted; saved progress at time {} origin {} destination {}.",
                cursor.time_index, cursor.row_position, cursor.col_position
            );
            ExitCode::from(130)
        }
        Err(err) => {
            error!(error = %err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: RunConfig) -> Result<RunOutcome, HarvestError> {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();
    if let Err(err) = ctrlc::set_handler(move || {
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        error!(error = %err, "failed to install interrupt handler");
    }

    let client = BingClient::new(config.provider.clone())?;
    let harvester = Harvester::load(config)?.with_shutdown(shutdown);
    harvester.run(&client)
}
