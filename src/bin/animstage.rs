use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use animstage::{
    Engine, EngineDocument, Outcome, Registry, RendererDef, SystemClock,
};

#[derive(Parser, Debug)]
#[command(name = "animstage", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a document's pipelines headless and print the final settings as JSON.
    Run(RunArgs),
    /// Load a document, checking dependencies and pipeline definitions, then exit.
    Check(CheckArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Input engine document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Wall-clock seconds to run for.
    #[arg(long, default_value_t = 1.0)]
    seconds: f64,

    /// Extra pipelines to start after loading (repeatable).
    #[arg(long = "start")]
    start: Vec<String>,
}

#[derive(Parser, Debug)]
struct CheckArgs {
    /// Input engine document JSON.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Check(args) => cmd_check(args),
    }
}

fn read_document(path: &Path) -> anyhow::Result<EngineDocument> {
    let f = File::open(path).with_context(|| format!("open document '{}'", path.display()))?;
    let r = BufReader::new(f);
    let doc: EngineDocument = serde_json::from_reader(r).with_context(|| "parse document JSON")?;
    Ok(doc)
}

fn make_registry() -> anyhow::Result<Arc<Registry>> {
    let mut registry = Registry::standard()?;
    registry.add_renderer(RendererDef::new("trace", |_, call| {
        tracing::info!(
            pipeline = call.pipeline.unwrap_or("-"),
            source = call.source.as_ref().map(|s| s.name()).unwrap_or("-"),
            destination = call.destination.as_ref().map(|s| s.name()).unwrap_or("-"),
            settings = %serde_json::Value::from(&call.settings),
            "trace render"
        );
        Ok(Outcome::Done)
    }))?;
    Ok(Arc::new(registry))
}

fn load(path: &Path) -> anyhow::Result<Engine> {
    let doc = read_document(path)?;
    let mut engine = Engine::with_clock(
        make_registry()?,
        doc.config.clone(),
        Arc::new(SystemClock::new()),
    )?;
    engine
        .load_document(&doc)
        .with_context(|| format!("load document '{}'", path.display()))?;
    Ok(engine)
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let mut engine = load(&args.in_path)?;
    for name in &args.start {
        engine.start_pipeline(name)?;
    }
    let ticks = engine.run_for(args.seconds.max(0.0) * 1000.0);
    eprintln!(
        "ran {ticks} ticks across {} running pipelines",
        engine.running_pipelines().len()
    );
    println!("{}", serde_json::to_string_pretty(&engine.settings().root().to_json())?);
    Ok(())
}

fn cmd_check(args: CheckArgs) -> anyhow::Result<()> {
    let engine = load(&args.in_path)?;
    eprintln!(
        "ok: {} pipelines, {} running",
        engine.pipeline_names().len(),
        engine.running_pipelines().len()
    );
    Ok(())
}
