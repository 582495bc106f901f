use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use schemlogica::config::{BoundingCube, OnUnroutable, SynthesisConfig};
use schemlogica::error::CoreError;
use schemlogica::library::{builtin_gate_library, InstanceLibrary};
use schemlogica::{codec, frontend};

#[derive(Parser)]
#[command(name = "schemlogica", version, about = "Redstone placement-and-routing engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnUnroutableArg {
    Skip,
    Abort,
}

impl From<OnUnroutableArg> for OnUnroutable {
    fn from(v: OnUnroutableArg) -> Self {
        match v {
            OnUnroutableArg::Skip => OnUnroutable::Skip,
            OnUnroutableArg::Abort => OnUnroutable::Abort,
        }
    }
}

#[derive(clap::Args)]
struct SynthesisArgs {
    /// HDL source (boolean-expression subset; see `frontend`).
    input: PathBuf,
    /// Output `.litematic` path.
    output: PathBuf,
    /// Directory of on-disk library tiles; falls back to the built-in gate
    /// set when omitted.
    #[arg(long)]
    library: Option<PathBuf>,
    /// Optional TOML config file (spec §6); CLI flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    alpha: Option<f64>,
    #[arg(long)]
    steps: Option<u64>,
    #[arg(long, value_enum)]
    on_unroutable: Option<OnUnroutableArg>,
    #[arg(long)]
    bounding_cube: Option<i32>,
}

impl SynthesisArgs {
    fn config(&self) -> Result<SynthesisConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                SynthesisConfig::from_toml_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => SynthesisConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(t0) = self.temperature {
            config.temperature = t0;
        }
        if let Some(alpha) = self.alpha {
            config.alpha = alpha;
        }
        if let Some(steps) = self.steps {
            config.max_steps = steps;
        }
        if let Some(policy) = self.on_unroutable {
            config.on_unroutable = policy.into();
        }
        if let Some(size) = self.bounding_cube {
            config.bounding_cube = BoundingCube { size };
        }
        Ok(config)
    }

    fn library(&self) -> Result<InstanceLibrary> {
        match &self.library {
            Some(dir) => InstanceLibrary::load_dir(dir).map_err(|e| anyhow::anyhow!(e)),
            None => Ok(builtin_gate_library()),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Compile an HDL source to a routed `.litematic` schematic.
    Synthesize(SynthesisArgs),
    /// Print summary stats for an existing `.litematic`.
    Display {
        input: PathBuf,
    },
    /// Run placement and routing without writing output; report per-network
    /// bus lengths and failures (spec §6's debugging entry point).
    DebugBussing(SynthesisArgs),
}

fn exit_code_for(err: &CoreError) -> u8 {
    match err {
        CoreError::BadNetlist { .. } | CoreError::BadTile { .. } => 2,
        CoreError::Infeasible(_) => 3,
        CoreError::Unroutable(_) | CoreError::NoPath { .. } => 4,
        CoreError::OverBudget { .. } | CoreError::Internal(_) => 1,
    }
}

fn run_synthesize(args: &SynthesisArgs) -> Result<std::result::Result<(), CoreError>> {
    let code = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading HDL source {}", args.input.display()))?;
    let library = args.library()?;
    let config = args.config()?;

    let netlist = match frontend::compile_source(&code, &library) {
        Ok(n) => n,
        Err(e) => return Ok(Err(CoreError::BadNetlist { kind: "frontend", details: e.to_string() })),
    };

    match schemlogica::synthesize(&netlist, &library, &config) {
        Ok(assembly) => {
            codec::write_schematic(&assembly.voxels, &args.output)
                .with_context(|| format!("writing {}", args.output.display()))?;
            tracing::info!(path = %args.output.display(), "synthesis complete");
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

fn run_debug_bussing(args: &SynthesisArgs) -> Result<std::result::Result<(), CoreError>> {
    let code = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading HDL source {}", args.input.display()))?;
    let library = args.library()?;
    let config = args.config()?;

    let netlist = match frontend::compile_source(&code, &library) {
        Ok(n) => n,
        Err(e) => return Ok(Err(CoreError::BadNetlist { kind: "frontend", details: e.to_string() })),
    };

    match schemlogica::synthesize(&netlist, &library, &config) {
        Ok(assembly) => {
            for (network_id, bus) in &assembly.busses {
                println!("{network_id}: {} voxels", bus.footprint.len());
            }
            println!("{} of {} networks routed", assembly.busses.len(), netlist.networks.len());
            Ok(Ok(()))
        }
        Err(e) => Ok(Err(e)),
    }
}

fn run_display(path: &PathBuf) -> Result<()> {
    let schematic = codec::read_schematic(path).with_context(|| format!("reading {}", path.display()))?;
    println!("{} blocks", schematic.len());
    if let Some(region) = schematic.bbox_region() {
        let bbox = region.bbox();
        println!("bbox {:?} .. {:?}", bbox.min, bbox.max);
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let outcome = match &cli.command {
        Command::Synthesize(args) => run_synthesize(args),
        Command::DebugBussing(args) => run_debug_bussing(args),
        Command::Display { input } => run_display(input).map(Ok),
    };

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(core_err)) => {
            tracing::error!(error = %core_err, "synthesis failed");
            ExitCode::from(exit_code_for(&core_err))
        }
        Err(e) => {
            tracing::error!(error = %e, "internal error");
            ExitCode::from(1)
        }
    }
}
