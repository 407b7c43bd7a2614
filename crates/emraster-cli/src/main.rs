//! emraster CLI: create file rasters, run block-streamed arithmetic, inspect plans.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use emraster_core::config::EngineConfig;
use emraster_core::geometry::{Extent, Geometry};
use emraster_exec::{Engine, Operand};
use emraster_io::{Destination, Raster, WriteOptions};
use emraster_operators::ArithOp;
use emraster_sched::{plan_for, validate_plan};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "emraster")]
#[command(about = "Block-streaming raster arithmetic under a hard memory cap", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a file raster filled with a constant or a repeated value sequence
    Create {
        /// Output data file (geometry goes to `<out>.json`)
        #[arg(short, long)]
        out: PathBuf,

        #[arg(long)]
        rows: usize,

        #[arg(long)]
        cols: usize,

        #[arg(long, default_value_t = 1)]
        layers: usize,

        /// Comma-separated cell values, recycled over all cells; `NA` is missing
        #[arg(long, default_value = "0")]
        values: String,

        /// Extent as `xmin,xmax,ymin,ymax` (defaults to one unit per cell)
        #[arg(long)]
        extent: Option<String>,

        #[arg(long, default_value = "")]
        crs: String,

        #[arg(long)]
        overwrite: bool,
    },

    /// Apply an arithmetic or comparison operator cell by cell
    Arith {
        /// Left-hand raster file
        #[arg(long)]
        lhs: PathBuf,

        /// Right-hand raster file
        #[arg(long, conflicts_with_all = ["scalar", "vector"])]
        rhs: Option<PathBuf>,

        /// Right-hand scalar
        #[arg(long, allow_hyphen_values = true, conflicts_with = "vector")]
        scalar: Option<f64>,

        /// Right-hand per-layer values, comma-separated
        #[arg(long, allow_hyphen_values = true)]
        vector: Option<String>,

        /// One of + - * / % ^ == != > < >= <=
        #[arg(long, allow_hyphen_values = true)]
        op: String,

        /// Put the scalar/vector operand on the left
        #[arg(long)]
        reverse: bool,

        /// Output data file
        #[arg(short, long)]
        out: PathBuf,

        /// Memory cap in bytes (overrides EMRASTER_MEM_CAP_BYTES)
        #[arg(long)]
        memory_cap: Option<usize>,

        /// Rows per block (overrides EMRASTER_BLOCK_ROWS)
        #[arg(long)]
        block_rows: Option<usize>,

        #[arg(long)]
        overwrite: bool,
    },

    /// Show the block plan a raster would stream with (EXPLAIN)
    Explain {
        #[arg(short, long)]
        input: PathBuf,

        /// Memory cap in bytes (for planning)
        #[arg(long, default_value = "268435456")] // 256MB default
        memory_cap: usize,

        #[arg(long)]
        block_rows: Option<usize>,

        /// Plan for raster-with-raster arithmetic (two live buffers)
        #[arg(long)]
        pairwise: bool,
    },

    /// Print geometry and a per-layer value summary
    Info {
        #[arg(short, long)]
        input: PathBuf,
    },
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Create {
            out,
            rows,
            cols,
            layers,
            values,
            extent,
            crs,
            overwrite,
        } => create(&out, rows, cols, layers, &values, extent.as_deref(), &crs, overwrite),
        Commands::Arith {
            lhs,
            rhs,
            scalar,
            vector,
            op,
            reverse,
            out,
            memory_cap,
            block_rows,
            overwrite,
        } => {
            let mut config = EngineConfig::from_env();
            apply_overrides(&mut config, memory_cap, block_rows, overwrite);
            arith(&lhs, rhs, scalar, vector, &op, reverse, &out, config)
        }
        Commands::Explain {
            input,
            memory_cap,
            block_rows,
            pairwise,
        } => explain(&input, memory_cap, block_rows, pairwise),
        Commands::Info { input } => info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}

/// CLI flags win over the environment.
fn apply_overrides(
    cfg: &mut EngineConfig,
    memory_cap: Option<usize>,
    block_rows: Option<usize>,
    overwrite: bool,
) {
    if let Some(cap) = memory_cap {
        cfg.mem_cap_bytes = cap;
    }
    if let Some(rows) = block_rows {
        cfg.block_rows_hint = Some(rows);
    }
    if overwrite {
        cfg.overwrite = true;
    }
}

/// Comma-separated numbers; `NA`/`NaN` (any case) is a missing value.
fn parse_values(s: &str) -> CliResult<Vec<f64>> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| {
            if t.eq_ignore_ascii_case("na") || t.eq_ignore_ascii_case("nan") {
                Ok(f64::NAN)
            } else {
                t.parse::<f64>()
                    .map_err(|e| -> Box<dyn Error> { format!("bad value '{t}': {e}").into() })
            }
        })
        .collect()
}

fn parse_extent(s: &str) -> CliResult<Extent> {
    match parse_values(s)?.as_slice() {
        [xmin, xmax, ymin, ymax] if [xmin, xmax, ymin, ymax].iter().all(|v| v.is_finite()) => {
            Ok(Extent::new(*xmin, *xmax, *ymin, *ymax))
        }
        _ => Err(format!("extent must be four finite numbers, got '{s}'").into()),
    }
}

#[allow(clippy::too_many_arguments)]
fn create(
    out: &Path,
    rows: usize,
    cols: usize,
    layers: usize,
    values: &str,
    extent: Option<&str>,
    crs: &str,
    overwrite: bool,
) -> CliResult<()> {
    let values = parse_values(values)?;
    if values.is_empty() {
        return Err("no values to fill with".into());
    }
    let mut geometry = Geometry::grid(rows, cols);
    if let Some(e) = extent {
        geometry.extent = parse_extent(e)?;
    }
    geometry.crs = crs.to_string();

    let mut cfg = EngineConfig::from_env();
    cfg.overwrite |= overwrite;
    let opts = WriteOptions::from_config(&cfg).with_destination(Destination::File(out.to_path_buf()));
    let raster = write_filled(geometry, layers, &values, &opts)?;

    println!("✓ Created {}", out.display());
    println!(
        "  {} rows x {} cols x {} layers",
        raster.nrow(),
        raster.ncol(),
        raster.nlyr()
    );
    Ok(())
}

/// Stream `values`, recycled in layer-major cell order, into a new raster.
fn write_filled(
    geometry: Geometry,
    nlyr: usize,
    values: &[f64],
    opts: &WriteOptions,
) -> CliResult<Raster> {
    let mut raster = Raster::empty(geometry, nlyr);
    let ncol = raster.ncol();
    let ncell = raster.ncell();
    {
        let mut writer = raster.write_start(opts)?;
        let plan = writer.plan().clone();
        for (i, block) in plan.iter().enumerate() {
            let mut cells = Vec::with_capacity(block.ncells(ncol, nlyr));
            for layer in 0..nlyr {
                let from = layer * ncell + block.start_row * ncol;
                let to = from + block.nrows * ncol;
                cells.extend((from..to).map(|k| values[k % values.len()]));
            }
            writer.write_block(i, &cells)?;
        }
        writer.finish()?;
    }
    Ok(raster)
}

#[allow(clippy::too_many_arguments)]
fn arith(
    lhs: &Path,
    rhs: Option<PathBuf>,
    scalar: Option<f64>,
    vector: Option<String>,
    op: &str,
    reverse: bool,
    out: &Path,
    config: EngineConfig,
) -> CliResult<()> {
    let engine = Engine::try_new(config)?;
    let lhs = Raster::open(lhs)?;
    let rhs_raster = rhs.map(Raster::open).transpose()?;

    let operand = match (&rhs_raster, scalar, vector) {
        (Some(r), _, _) => Operand::Raster(r),
        (None, Some(x), _) => Operand::Scalar(x),
        (None, None, Some(v)) => Operand::PerLayer(parse_values(&v)?),
        (None, None, None) => return Err("one of --rhs, --scalar or --vector is required".into()),
    };

    let opts = engine
        .write_options()
        .with_destination(Destination::File(out.to_path_buf()));
    let result = engine.arith_with(&lhs, operand, op, reverse, &opts);
    if let Some(e) = result.error() {
        return Err(e.clone().into());
    }

    println!("✓ Wrote {}", out.display());
    if let Some(manifest) = result.manifest() {
        println!("  Duration: {}ms", manifest.duration_ms());
        println!("  Blocks: {}", manifest.blocks_written);
        println!("  Peak bytes: {}", manifest.peak_bytes);
        println!("  Plan hash: {}", manifest.plan_hash);
        println!("{}", serde_json::to_string_pretty(manifest)?);
    }
    Ok(())
}

fn explain(
    input: &Path,
    memory_cap: usize,
    block_rows: Option<usize>,
    pairwise: bool,
) -> CliResult<()> {
    let raster = Raster::open(input)?;
    let layers = if pairwise {
        vec![raster.nlyr(), raster.nlyr()]
    } else {
        vec![raster.nlyr()]
    };
    let plan = plan_for(raster.nrow(), raster.ncol(), &layers, memory_cap, block_rows);
    validate_plan(&plan, raster.nrow())?;

    println!("Block Plan");
    println!("==========");
    println!();
    println!(
        "Memory Cap: {} bytes ({:.2} MB)",
        memory_cap,
        memory_cap as f64 / 1_048_576.0
    );
    println!(
        "Grid: {} rows x {} cols x {} layers",
        raster.nrow(),
        raster.ncol(),
        raster.nlyr()
    );
    println!("Live buffers: {}", layers.len());
    println!("  Rows per block: {}", plan.max_rows());
    println!("  Total blocks: {}", plan.len());
    println!();
    for (i, block) in plan.iter().enumerate() {
        println!(
            "  {}. rows {}..{} ({} rows)",
            i + 1,
            block.start_row,
            block.end_row(),
            block.nrows
        );
    }
    println!();
    let symbols: Vec<&str> = ArithOp::ALL.iter().map(|op| op.symbol()).collect();
    println!("Operators: {}", symbols.join(" "));
    Ok(())
}

/// Per-layer value summary.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LayerSummary {
    cells: usize,
    na: usize,
    min: f64,
    max: f64,
    sum: f64,
}

impl Default for LayerSummary {
    fn default() -> Self {
        Self {
            cells: 0,
            na: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }
}

impl LayerSummary {
    fn add(&mut self, cells: &[f64]) {
        for &v in cells {
            self.cells += 1;
            if v.is_nan() {
                self.na += 1;
            } else {
                self.min = self.min.min(v);
                self.max = self.max.max(v);
                self.sum += v;
            }
        }
    }

    fn mean(&self) -> Option<f64> {
        let n = self.cells - self.na;
        (n > 0).then(|| self.sum / n as f64)
    }
}

/// Stream the raster block by block and summarize each layer.
fn summarize(raster: &Raster, mem_cap: usize) -> CliResult<Vec<LayerSummary>> {
    let plan = plan_for(raster.nrow(), raster.ncol(), &[raster.nlyr()], mem_cap, None);
    let reader = raster.read_start()?;
    let mut out = vec![LayerSummary::default(); raster.nlyr()];
    let mut cells = Vec::new();
    for (i, block) in plan.iter().enumerate() {
        cells.clear();
        reader.read_block_into(&plan, i, &mut cells)?;
        let layer_len = block.ncells(raster.ncol(), 1);
        if layer_len == 0 {
            continue;
        }
        for (summary, chunk) in out.iter_mut().zip(cells.chunks(layer_len)) {
            summary.add(chunk);
        }
    }
    reader.close()?;
    Ok(out)
}

fn info(input: &Path) -> CliResult<()> {
    let raster = Raster::open(input)?;
    let g = raster.geometry();
    println!("Raster {}", input.display());
    println!("  Dimensions: {} rows x {} cols x {} layers", g.nrow, g.ncol, raster.nlyr());
    println!(
        "  Extent: {} {} {} {}",
        g.extent.xmin, g.extent.xmax, g.extent.ymin, g.extent.ymax
    );
    println!("  Resolution: {} x {}", g.xres(), g.yres());
    if !g.crs.is_empty() {
        println!("  CRS: {}", g.crs);
    }
    let cfg = EngineConfig::from_env();
    for (l, s) in summarize(&raster, cfg.mem_cap_bytes)?.iter().enumerate() {
        match s.mean() {
            Some(mean) => println!(
                "  Layer {}: min {} max {} mean {:.4} ({} NA of {})",
                l, s.min, s.max, mean, s.na, s.cells
            ),
            None => println!("  Layer {}: all {} cells NA", l, s.cells),
        }
    }
    Ok(())
}
