use clap::{Args, Parser, Subcommand};
use mt_core::timing::{self, PerfStats};
use mt_core::{Real, RegionId};
use mt_geometry::GeometryError;
use mt_solver::{
    CmfdOptions, MocSolver, SolveProgressEvent, SolverError, SolverOptions, SourceMode,
};
use mt_xs::XsError;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use tracing::Level;

mod problems;

use problems::Problem;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid options file: {0}")]
    Options(#[from] serde_yaml::Error),

    #[error("JSON output error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    CrossSections(#[from] XsError),

    #[error(transparent)]
    Solver(#[from] SolverError),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "mt-cli")]
#[command(about = "moctrace CLI - 2D method of characteristics neutron transport", long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Two-group pin cell eigenvalue problem with reflective sides
    PinCell {
        /// Angular sectors in the fuel
        #[arg(long, default_value_t = 1)]
        fuel_sectors: u32,
        /// Angular sectors in the moderator
        #[arg(long, default_value_t = 1)]
        water_sectors: u32,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Fixed-source lattice with a central source cell and vacuum sides
    Lattice {
        /// Lattice positions per side
        #[arg(long, default_value_t = 5)]
        size: usize,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Repeat the pin cell with doubling sector counts
    Sectors {
        /// Largest sector count to try
        #[arg(long, default_value_t = 8)]
        max_sectors: u32,
        #[command(flatten)]
        solve: SolveArgs,
    },
    /// Print the default solver options as YAML
    DefaultOptions,
}

#[derive(Args)]
struct SolveArgs {
    /// YAML file with solver options (missing fields keep their defaults)
    #[arg(long)]
    options: Option<PathBuf>,
    /// Azimuthal angles over 2π (multiple of 4)
    #[arg(long)]
    num_azim: Option<usize>,
    /// Track spacing in cm
    #[arg(long)]
    spacing: Option<Real>,
    /// Polar angles over the sphere (even)
    #[arg(long)]
    num_polar: Option<usize>,
    /// Sweep threads
    #[arg(long)]
    threads: Option<usize>,
    /// Convergence tolerance
    #[arg(long)]
    tolerance: Option<Real>,
    /// Iteration cap
    #[arg(long)]
    max_iterations: Option<usize>,
    /// Use linear sources
    #[arg(long)]
    linear: bool,
    /// Accelerate with CMFD on a mesh of one cell per lattice position
    #[arg(long)]
    cmfd: bool,
    /// Print a JSON summary instead of text
    #[arg(long)]
    json: bool,
    /// Report phase timings
    #[arg(long)]
    timing: bool,
}

#[derive(Serialize)]
struct ZoneSummary {
    name: String,
    volume: Real,
    flux: Vec<Real>,
}

#[derive(Serialize)]
struct RunSummary {
    problem: String,
    regions: usize,
    groups: usize,
    tracks: usize,
    segments: usize,
    iterations: usize,
    converged: bool,
    residual: Real,
    k_eff: Option<Real>,
    leakage: Real,
    generation_time_s: f64,
    solve_time_s: f64,
    zones: Vec<ZoneSummary>,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Commands::PinCell {
            fuel_sectors,
            water_sectors,
            solve,
        } => cmd_single(problems::pin_cell(fuel_sectors, water_sectors)?, &solve),
        Commands::Lattice { size, solve } => cmd_single(problems::source_lattice(size)?, &solve),
        Commands::Sectors { max_sectors, solve } => cmd_sectors(max_sectors, &solve),
        Commands::DefaultOptions => {
            print!("{}", serde_yaml::to_string(&SolverOptions::default())?);
            Ok(())
        }
    }
}

fn solver_options(args: &SolveArgs, problem: &Problem) -> CliResult<SolverOptions> {
    let mut opts: SolverOptions = match &args.options {
        Some(path) => serde_yaml::from_str(&std::fs::read_to_string(path)?)?,
        None => SolverOptions::default(),
    };
    if let Some(v) = args.num_azim {
        opts.num_azim = v;
    }
    if let Some(v) = args.spacing {
        opts.track_spacing = v;
    }
    if let Some(v) = args.num_polar {
        opts.num_polar = v;
    }
    if let Some(v) = args.threads {
        opts.num_threads = v;
    }
    if let Some(v) = args.tolerance {
        opts.tolerance = v;
    }
    if let Some(v) = args.max_iterations {
        opts.max_iterations = v;
    }
    if args.linear {
        opts.source_mode = SourceMode::Linear;
    }
    if args.cmfd {
        opts.cmfd = Some(CmfdOptions {
            mesh: [problem.geometry.num_x(), problem.geometry.num_y()],
            ..opts.cmfd.unwrap_or_default()
        });
    }
    opts.mode = problem.mode;
    Ok(opts)
}

fn cmd_single(problem: Problem, args: &SolveArgs) -> CliResult<()> {
    if args.timing {
        timing::enable_timing();
    }
    let opts = solver_options(args, &problem)?;
    if !args.json {
        println!("Running {}", problem.name);
    }

    let (summary, stats) = run_problem(&problem, opts, !args.json)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }
    stats.print_summary();
    Ok(())
}

fn cmd_sectors(max_sectors: u32, args: &SolveArgs) -> CliResult<()> {
    if args.timing {
        timing::enable_timing();
    }
    let mut sectors = 1;
    let mut summaries = Vec::new();
    while sectors <= max_sectors.max(1) {
        let problem = problems::pin_cell(sectors, 2 * sectors)?;
        let opts = solver_options(args, &problem)?;
        let (summary, _) = run_problem(&problem, opts, false)?;
        summaries.push(summary);
        sectors *= 2;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }
    println!(
        "{:>8} {:>10} {:>10} {:>10} {:>12}",
        "regions", "segments", "iters", "k_eff", "fuel/water"
    );
    for s in &summaries {
        let ratio = match (s.zones.first(), s.zones.get(1)) {
            (Some(fuel), Some(water)) if water.flux[1] > 0.0 => fuel.flux[1] / water.flux[1],
            _ => Real::NAN,
        };
        println!(
            "{:>8} {:>10} {:>10} {:>10.6} {:>12.5}",
            s.regions,
            s.segments,
            s.iterations,
            s.k_eff.unwrap_or(Real::NAN),
            ratio
        );
    }
    Ok(())
}

fn run_problem(
    problem: &Problem,
    opts: SolverOptions,
    show_progress: bool,
) -> CliResult<(RunSummary, PerfStats)> {
    let mut solver = MocSolver::new(&problem.geometry, &problem.library, opts)?;

    let started = Instant::now();
    solver.generate_tracks()?;
    let generation_time_s = started.elapsed().as_secs_f64();

    for source in &problem.sources {
        solver.set_fixed_source_in(
            source.regions.clone().map(RegionId::from_usize),
            source.group,
            source.strength,
        )?;
    }

    let started = Instant::now();
    let mut last_emit = Instant::now();
    let solution = solver.solve_with_progress(|event| {
        if show_progress && last_emit.elapsed().as_millis() >= 100 {
            render_cli_progress(event, started.elapsed().as_secs_f64());
            last_emit = Instant::now();
        }
    })?;
    let solve_time_s = started.elapsed().as_secs_f64();
    if show_progress {
        clear_progress_line();
    }

    let groups = solver.num_groups();
    let zones = match solver.fsr_table() {
        Some(fsr) => problem
            .zones
            .iter()
            .map(|zone| {
                let volume: Real = zone.regions.iter().map(|&r| fsr.volume(r)).sum();
                let flux = (0..groups)
                    .map(|g| {
                        let total: Real = zone
                            .regions
                            .iter()
                            .map(|&r| fsr.volume(r) * solution.flux(RegionId::from_usize(r), g))
                            .sum();
                        if volume > 0.0 { total / volume } else { 0.0 }
                    })
                    .collect();
                ZoneSummary {
                    name: zone.name.clone(),
                    volume,
                    flux,
                }
            })
            .collect(),
        None => Vec::new(),
    };

    let stats = PerfStats {
        generation_time_s,
        solve_time_s,
        iterations: solution.iterations,
        num_tracks: solver.num_tracks(),
        num_segments: solver.num_segments(),
    };
    let summary = RunSummary {
        problem: problem.name.clone(),
        regions: solver.num_regions(),
        groups,
        tracks: solver.num_tracks(),
        segments: solver.num_segments(),
        iterations: solution.iterations,
        converged: solution.converged,
        residual: solution.residual,
        k_eff: solution.k_eff,
        leakage: solution.leakage,
        generation_time_s,
        solve_time_s,
        zones,
    };
    Ok((summary, stats))
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(100));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &SolveProgressEvent, elapsed_s: f64) {
    let spinner = ['|', '/', '-', '\\'];
    let spin_idx = event.iteration % spinner.len();
    let mut line = format!(
        "\r{} iter={}  elapsed={:.2}s",
        spinner[spin_idx], event.iteration, elapsed_s
    );
    if event.residual.is_finite() {
        line.push_str(&format!("  residual={:.3e}", event.residual));
    }
    if let Some(k) = event.k_eff {
        line.push_str(&format!("  k={:.6}", k));
    }
    print!("{}", line);
    let _ = io::stdout().flush();
}

fn print_summary(summary: &RunSummary) {
    if summary.converged {
        println!("✓ Converged in {} iterations", summary.iterations);
    } else {
        println!(
            "✗ Not converged after {} iterations (residual {:.3e})",
            summary.iterations, summary.residual
        );
    }
    println!(
        "  Regions: {}  Groups: {}  Tracks: {}  Segments: {}",
        summary.regions, summary.groups, summary.tracks, summary.segments
    );
    if let Some(k) = summary.k_eff {
        println!("  k_eff: {:.6}", k);
    }
    if summary.leakage > 0.0 {
        println!("  Leakage: {:.6e}", summary.leakage);
    }
    println!(
        "  Generation: {:.3}s  Solve: {:.3}s",
        summary.generation_time_s, summary.solve_time_s
    );

    println!("\nZone-averaged flux:");
    for zone in &summary.zones {
        let values: Vec<String> = zone.flux.iter().map(|v| format!("{:.5e}", v)).collect();
        println!("  {:<12} {}", zone.name, values.join("  "));
    }
}
