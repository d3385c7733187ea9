//! kolam CLI: analyze dot-grid drawings and re-render them on clean grids.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use kolam::{GridSize, KolamAnalysis, KolamError, KolamParams, KolamPipeline};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "kolam")]
#[command(about = "Reconstruct hand-drawn dot-grid drawings into clean canonical renderings")]
#[command(version)]
struct Cli {
    /// Print debug logs (otherwise the level comes from KOLAM_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect dots and strokes, estimate the grid and write the renderings.
    Analyze(AnalyzeArgs),

    /// Re-render the traced strokes on an explicit rows x cols grid.
    CustomGrid(CustomGridArgs),
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// Input photo or scan (PNG/JPEG).
    image: PathBuf,

    /// Color theme: traditional, colorful, golden, ocean, sunset, forest.
    #[arg(long)]
    theme: Option<String>,

    /// JSON file overriding pipeline parameters.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Directory for annotated.png, digitized.png and analysis.json.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also print the analysis report to stdout.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct CustomGridArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Grid rows, 3 to 15.
    #[arg(long)]
    rows: u32,

    /// Grid columns, 3 to 15.
    #[arg(long)]
    cols: u32,

    /// Output PNG path.
    #[arg(long, default_value = "custom_grid.png")]
    out: PathBuf,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => run_analyze(&args),
        Commands::CustomGrid(args) => run_custom_grid(&args),
    }
}

#[cfg(feature = "tracing")]
fn init_logging(_verbose: bool) {
    let _ = tracing_log::LogTracer::init();
    kolam::core::init_tracing(false);
}

#[cfg(not(feature = "tracing"))]
fn init_logging(verbose: bool) {
    let _ = if verbose {
        kolam::core::init_with_level(log::LevelFilter::Debug)
    } else {
        kolam::core::init_from_env(log::LevelFilter::Info)
    };
}

fn load_params(config: Option<&Path>) -> CliResult<KolamParams> {
    match config {
        Some(path) => {
            log::info!("loading config {}", path.display());
            Ok(KolamParams::load_json(path)?)
        }
        None => Ok(KolamParams::default()),
    }
}

fn analyze(common: &CommonArgs) -> CliResult<(KolamPipeline, KolamAnalysis)> {
    let params = load_params(common.config.as_deref())?;
    let bytes = fs::read(&common.image)?;
    log::info!("loaded {} ({} bytes)", common.image.display(), bytes.len());
    let pipeline = KolamPipeline::new(params);
    let analysis = pipeline.analyze_bytes(&bytes)?;
    Ok((pipeline, analysis))
}

fn run_analyze(args: &AnalyzeArgs) -> CliResult<()> {
    let (pipeline, analysis) = analyze(&args.common)?;
    let theme = args.common.theme.as_deref();

    fs::create_dir_all(&args.out_dir)?;
    let annotated = args.out_dir.join("annotated.png");
    fs::write(&annotated, analysis.annotated_png()?)?;
    let digitized = args.out_dir.join("digitized.png");
    fs::write(&digitized, analysis.digitized(&pipeline.digitizer(), theme)?.encode_png()?)?;

    let report = serde_json::to_string_pretty(&analysis.report())?;
    let report_path = args.out_dir.join("analysis.json");
    fs::write(&report_path, &report)?;
    if args.json {
        println!("{report}");
    }

    log::info!(
        "grid {} with {} dots and {} paths; wrote {}, {}, {}",
        analysis.grid_size().get(),
        analysis.dots.len(),
        analysis.paths.len(),
        annotated.display(),
        digitized.display(),
        report_path.display()
    );
    Ok(())
}

fn run_custom_grid(args: &CustomGridArgs) -> CliResult<()> {
    if GridSize::new(args.rows).is_none() || GridSize::new(args.cols).is_none() {
        return Err(KolamError::InvalidGrid {
            rows: args.rows,
            cols: args.cols,
            min: GridSize::MIN,
            max: GridSize::MAX,
        }
        .into());
    }
    let (pipeline, analysis) = analyze(&args.common)?;
    let rendered = analysis.custom_grid(
        &pipeline.digitizer(),
        args.rows,
        args.cols,
        args.common.theme.as_deref(),
    )?;
    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&args.out, rendered.encode_png()?)?;
    log::info!(
        "rendered {} paths on a {}x{} grid to {}",
        rendered.mapped_paths.len(),
        args.rows,
        args.cols,
        args.out.display()
    );
    Ok(())
}
