use clap::Parser;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use wldrive_rs::driver::DriverConfig;
use wldrive_rs::kernel::{DryRunKernelManager, KernelSessionManager};
use wldrive_rs::sim::SimDuration;
use wldrive_rs::workload::{WorkloadManager, WorkloadSpec, WorkloadState};

#[derive(Debug, Parser)]
#[command(
    name = "workload-drive",
    about = "Replay a workload.json trace against a (dry-run) kernel cluster"
)]
struct Args {
    /// Path to workload.json
    #[arg(long)]
    spec: PathBuf,

    /// Workload name; defaults to the spec's name or the file stem
    #[arg(long)]
    name: Option<String>,

    /// Override tick duration in simulated seconds
    #[arg(long)]
    tick_seconds: Option<u64>,

    /// Wall-clock pacing factor (1.0 = real time, 0 = as fast as possible)
    #[arg(long)]
    timescale: Option<f64>,

    /// Abort the workload after serving this many ticks in one run
    #[arg(long)]
    max_ticks: Option<u64>,

    /// Write the final workload snapshot as JSON to this file
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();

    let raw = match fs::read_to_string(&args.spec) {
        Ok(raw) => raw,
        Err(err) => {
            eprintln!("failed to read {}: {err}", args.spec.display());
            return ExitCode::FAILURE;
        }
    };
    let spec: WorkloadSpec = match serde_json::from_str(&raw) {
        Ok(spec) => spec,
        Err(err) => {
            eprintln!("failed to parse {}: {err}", args.spec.display());
            return ExitCode::FAILURE;
        }
    };

    let name = args
        .name
        .clone()
        .or_else(|| spec.name.clone())
        .or_else(|| {
            args.spec
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
        })
        .unwrap_or_else(|| "workload".to_string());

    let config = DriverConfig {
        tick_duration: SimDuration::from_secs(args.tick_seconds.or(spec.tick_seconds).unwrap_or(60)),
        timescale: args.timescale.or(spec.timescale).unwrap_or(1.0),
        max_ticks_per_run: args.max_ticks,
    };

    let kernel_manager = Arc::new(DryRunKernelManager::new());
    let manager = WorkloadManager::new();
    let workload = manager.register_workload(
        name,
        spec,
        config,
        Arc::clone(&kernel_manager) as Arc<dyn KernelSessionManager>,
    );

    let driver = manager
        .driver(&workload.id)
        .expect("driver registered just above");
    if let Err(err) = manager.start_workload(&workload.id) {
        eprintln!("failed to start workload: {err}");
        return ExitCode::FAILURE;
    }
    driver.join();

    let finished = driver.workload();
    println!("workload_state {}", finished.state);
    println!("ticks_handled {}", finished.ticks_handled);
    println!("events_processed {}", finished.num_events_processed);
    println!("sessions_created {}", finished.num_sessions_created);
    println!("sessions_stopped {}", finished.num_sessions_stopped);
    println!("trainings_started {}", finished.num_training_started);
    println!("trainings_stopped {}", finished.num_training_stopped);
    println!("kernel_executes {}", kernel_manager.executes());
    if let Some(error_message) = &finished.error_message {
        println!("error_message {error_message}");
    }

    if let Some(path) = &args.summary_json {
        let payload = match serde_json::to_string_pretty(&finished) {
            Ok(payload) => payload,
            Err(err) => {
                eprintln!("failed to serialize summary: {err}");
                return ExitCode::FAILURE;
            }
        };
        if let Err(err) = fs::write(path, payload) {
            eprintln!("failed to write {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    }

    match finished.state {
        WorkloadState::Finished => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
