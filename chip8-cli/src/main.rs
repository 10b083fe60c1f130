//! Entrypoint for CLI
use std::{error::Error, fs};

#[macro_use]
extern crate slog;
use chip8_cpu::{prelude::*, IMPL_VERSION};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use slog::Drain;

mod app;
mod config;
mod error;

use self::{app::Chip8App, config::RunConfig, error::AppError};

/// Number of frames to run when neither the command line nor the config sets it.
const DEFAULT_FRAMES: u64 = 600;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless Chip-8 interpreter")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the target ROM file
    Run(RunArgs),
    /// Disassemble the target ROM into readable assembly
    Dis {
        /// Path to the ROM file
        rom: String,
    },
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Path to the ROM file
    rom: String,

    /// YAML file with VM settings and scripted key events
    #[arg(short, long)]
    config: Option<String>,

    /// Number of 60 Hz frames to run
    #[arg(short, long)]
    frames: Option<u64>,

    /// Instructions executed per frame
    #[arg(short, long)]
    speed: Option<usize>,

    /// Seed for the random number generator
    #[arg(long)]
    seed: Option<u64>,

    /// Pace frames to wall clock time
    #[arg(short, long, default_value_t = false)]
    realtime: bool,
}

fn run_rom(args: RunArgs) -> Result<(), AppError> {
    let mut conf = match &args.config {
        Some(filepath) => RunConfig::from_file(filepath)?,
        None => RunConfig::default(),
    };

    // Command line overrides the config file.
    if let Some(speed) = args.speed {
        conf.vm.speed = speed;
    }
    if args.seed.is_some() {
        conf.vm.seed = args.seed;
    }
    let frames = args.frames.or(conf.frames).unwrap_or(DEFAULT_FRAMES);

    let mut app = Chip8App::new(conf.vm, conf.keys);
    app.load_rom(&args.rom)?;

    let result = app.run(frames, args.realtime);
    println!("{}", app.report()?);

    result
}

fn disassemble_rom(filepath: &str) -> Result<(), AppError> {
    let bytecode = fs::read(filepath)?;
    let listing = Disassembler::new(&bytecode).listing()?;
    print!("{listing}");
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let decorator = slog_term::PlainDecorator::new(std::io::stderr());
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    let logger = slog::Logger::root(drain, o!("version" => IMPL_VERSION));

    let scope_guard = slog_scope::set_global_logger(logger);
    slog_stdlog::init_with_level(log::Level::Info)?;

    let result = match cli.command {
        Command::Run(args) => run_rom(args),
        Command::Dis { rom } => disassemble_rom(&rom),
    };

    if let Err(err) = result {
        error!("{err}");
        // Process exit skips destructors, so the async drain is flushed first.
        drop(scope_guard);
        std::process::exit(1);
    }

    info!("done");

    Ok(())
}
