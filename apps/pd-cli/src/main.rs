use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use pd_app::run_service::RunTimingSummary;
use pd_app::{
    AppError, AppResult, RunOptions, RunProgressEvent, RunRequest, RunStage, project_service,
    query, run_service, sweep,
};
use pd_results::RunStore;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdsim")]
#[command(about = "Scroll compressor cycle simulator", long_about = None)]
struct Cli {
    /// Run store directory
    #[arg(long, global = true, default_value = ".pdsim/runs")]
    runs_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a project file and check that it compiles
    Validate {
        /// Path to the project YAML or JSON file
        project_path: PathBuf,
    },
    /// Solve a project to cyclic steady state
    Run {
        project_path: PathBuf,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
        /// Store this run under another directory
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List cached runs
    Runs,
    /// Show details of a cached run
    ShowRun {
        /// Run ID or unique prefix
        run_id: String,
    },
    /// Export one dataset of a run as CSV
    ExportSeries {
        run_id: String,
        /// Dataset path, e.g. /p, /forces/tau, /losses/crank_bearing
        dataset: String,
        /// Only this chamber's row of a per-chamber dataset
        #[arg(long)]
        chamber: Option<String>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short = 'o', long = "out")]
        output: Option<PathBuf>,
    },
    /// Solve a project at several shaft speeds in parallel
    Sweep {
        project_path: PathBuf,
        /// Comma-separated shaft speeds [rad/s]
        #[arg(long, value_delimiter = ',', required = true)]
        omega: Vec<f64>,
        #[arg(long)]
        no_cache: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let runs_dir = cli.runs_dir;

    match cli.command {
        Commands::Validate { project_path } => cmd_validate(&project_path),
        Commands::Run {
            project_path,
            no_cache,
            out,
        } => cmd_run(&project_path, out.unwrap_or(runs_dir), !no_cache),
        Commands::Runs => cmd_runs(&runs_dir),
        Commands::ShowRun { run_id } => cmd_show_run(&runs_dir, &run_id),
        Commands::ExportSeries {
            run_id,
            dataset,
            chamber,
            output,
        } => cmd_export_series(
            &runs_dir,
            &run_id,
            &dataset,
            chamber.as_deref(),
            output.as_deref(),
        ),
        Commands::Sweep {
            project_path,
            omega,
            no_cache,
        } => cmd_sweep(&project_path, &runs_dir, &omega, !no_cache),
    }
}

fn cmd_validate(project_path: &Path) -> AppResult<()> {
    println!("Validating project: {}", project_path.display());
    let project = project_service::load_project(project_path)?;
    project_service::validate_project(&project)?;
    println!("✓ Project is valid");
    Ok(())
}

fn cmd_run(project_path: &Path, runs_dir: PathBuf, use_cache: bool) -> AppResult<()> {
    println!("Running project: {}", project_path.display());

    let request = RunRequest {
        project_path,
        options: RunOptions {
            use_cache,
            runs_dir: Some(runs_dir),
            ..RunOptions::default()
        },
    };

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let response = run_service::ensure_run_with_progress(
        &request,
        Some(&mut |event| {
            let emit_now = last_stage != Some(event.stage) || last_emit.elapsed().as_millis() >= 100;
            if emit_now {
                render_cli_progress(&event);
                last_stage = Some(event.stage);
                last_emit = Instant::now();
            }
        }),
    )?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Simulation completed: {}", response.run_id);
    }
    print_timing_summary(&response.timing);

    println!("\nOutputs:");
    for (name, value) in response.manifest.outputs.pairs() {
        println!("  {name:<22} {value:.6}");
    }
    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
    let mut line = format!(
        "\r{} {}  elapsed={:.2}s",
        spinner[spin_idx],
        event.stage.label(),
        event.elapsed_wall_s
    );
    if let Some(msg) = &event.message {
        line.push_str(&format!("  {}", msg));
    }
    if event.stage == RunStage::Completed {
        line.push('\n');
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_timing_summary(timing: &RunTimingSummary) {
    let total = timing.total_time_s.max(1.0e-12);
    println!("\nTiming summary:");
    if timing.load_cache_time_s > 0.0 {
        println!("  Cache load: {:.3}s", timing.load_cache_time_s);
    } else {
        println!(
            "  Compile: {:.3}s ({:.1}%)",
            timing.compile_time_s,
            100.0 * timing.compile_time_s / total
        );
        println!(
            "  Solve:   {:.3}s ({:.1}%)",
            timing.solve_time_s,
            100.0 * timing.solve_time_s / total
        );
        println!(
            "  Save:    {:.3}s ({:.1}%)",
            timing.save_time_s,
            100.0 * timing.save_time_s / total
        );
    }
    println!("  Total:   {:.3}s", timing.total_time_s);
}

fn open_store(runs_dir: &Path) -> AppResult<RunStore> {
    Ok(RunStore::new(runs_dir.to_path_buf())?)
}

fn cmd_runs(runs_dir: &Path) -> AppResult<()> {
    let runs = run_service::list_runs(&open_store(runs_dir)?)?;
    if runs.is_empty() {
        println!("No cached runs in {}", runs_dir.display());
    } else {
        println!("Cached runs in {}:", runs_dir.display());
        for manifest in runs {
            println!(
                "  {}  {}  ({})",
                &manifest.run_id[..manifest.run_id.len().min(12)],
                manifest.project_name,
                manifest.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_run(runs_dir: &Path, run_id: &str) -> AppResult<()> {
    let (manifest, record) = run_service::load_run(&open_store(runs_dir)?, run_id)?;
    let summary = query::get_run_summary(&manifest, &record);

    println!("Run {}", summary.run_id);
    println!("  Project: {}", summary.project_name);
    println!("  Created: {}", summary.timestamp);
    println!("  Engine:  {}", summary.engine_version);
    println!(
        "  Samples: {} over θ = {:.3} .. {:.3} rad",
        summary.sample_count, summary.theta_range.0, summary.theta_range.1
    );

    println!("\nOutputs:");
    for (name, value) in &summary.outputs {
        println!("  {name:<22} {value:.6}");
    }
    println!("\nChambers:");
    for key in &summary.chamber_keys {
        println!("  {key}");
    }
    println!("\nDatasets:");
    for path in record.dataset_paths() {
        println!("  {path}");
    }
    Ok(())
}

fn cmd_export_series(
    runs_dir: &Path,
    run_id: &str,
    dataset: &str,
    chamber: Option<&str>,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, record) = run_service::load_run(&open_store(runs_dir)?, run_id)?;

    let csv = match chamber {
        Some(key) => {
            let mut csv = format!("theta,{key}\n");
            for (t, v) in query::chamber_series(&record, dataset, key)? {
                csv.push_str(&format!("{},{}\n", t, v));
            }
            csv
        }
        None => query::dataset_to_csv(&record, dataset)?,
    };

    if let Some(path) = output {
        std::fs::write(path, &csv)?;
        println!(
            "✓ Exported {} rows to {}",
            csv.lines().count().saturating_sub(1),
            path.display()
        );
    } else {
        print!("{}", csv);
    }
    Ok(())
}

fn cmd_sweep(project_path: &Path, runs_dir: &Path, omegas: &[f64], use_cache: bool) -> AppResult<()> {
    let project = project_service::load_project(project_path)?;
    let store = open_store(runs_dir)?;
    let options = RunOptions {
        use_cache,
        runs_dir: Some(runs_dir.to_path_buf()),
        ..RunOptions::default()
    };
    println!("Sweeping {} shaft speeds for {}", omegas.len(), project.name);

    let points = sweep::sweep_omega(&project, omegas, &store, &options);
    println!(
        "\n{:>12}  {:>10}  {:>12}  {:>12}  {:>8}  run",
        "omega", "eta_oi", "mdot_kg_s", "wdot_el_w", "cycles"
    );
    let mut failures = 0;
    for point in &points {
        match &point.result {
            Ok(r) => {
                let o = &r.manifest.outputs;
                println!(
                    "{:>12.3}  {:>10.4}  {:>12.6}  {:>12.2}  {:>8}  {}",
                    point.omega_rad_s,
                    o.eta_oi,
                    o.mdot_kg_s,
                    o.wdot_el_w,
                    o.cycles,
                    &r.run_id[..r.run_id.len().min(12)]
                );
            }
            Err(e) => {
                failures += 1;
                println!("{:>12.3}  failed: {}", point.omega_rad_s, e);
            }
        }
    }
    if failures > 0 {
        return Err(AppError::Simulation(format!(
            "{failures} of {} sweep points failed",
            points.len()
        )));
    }
    Ok(())
}
