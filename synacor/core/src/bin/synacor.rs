use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use synacor_core::{
    disasm, load_snapshot, save_snapshot, Console, MemoryImage, RunOutcome, Runtime, StdConsole,
    StreamConsole, Word,
};
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "synacor",
    about = "Run or disassemble program images for the 15-bit Synacor machine."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a program image until it halts.
    Run(RunArgs),
    /// Print a disassembly listing of a program image.
    Dump(DumpArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Program image (little-endian 16-bit words).
    #[arg(value_name = "IMAGE", required_unless_present = "load_snapshot")]
    image: Option<PathBuf>,

    /// Stop after this many instructions instead of running to HALT.
    #[arg(long)]
    steps: Option<u64>,

    /// Read IN characters from this file instead of stdin.
    #[arg(long, value_name = "PATH")]
    input: Option<PathBuf>,

    /// Resume from a snapshot instead of loading IMAGE.
    #[arg(long, value_name = "PATH", conflicts_with = "image")]
    load_snapshot: Option<PathBuf>,

    /// Write a snapshot when the run stops (halt or step limit).
    #[arg(long, value_name = "PATH")]
    save_snapshot: Option<PathBuf>,

    /// Print an instruction-count summary to stderr.
    #[arg(long)]
    stats: bool,
}

#[derive(Args, Debug)]
struct DumpArgs {
    /// Program image (little-endian 16-bit words).
    #[arg(value_name = "IMAGE")]
    image: PathBuf,

    /// Address to start the listing at.
    #[arg(long, default_value_t = 0)]
    start: Word,

    /// Maximum number of entries to print.
    #[arg(long)]
    count: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => match args.input.as_deref() {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("open input script {}", path.display()))?;
                run(&args, StreamConsole::new(BufReader::new(file), io::stdout()))
            }
            None => run(&args, StdConsole::stdio()),
        },
        Command::Dump(args) => dump(&args),
    }
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read program image {}", path.display()))
}

fn run<C: Console>(args: &RunArgs, console: C) -> Result<()> {
    let mut rt = match (&args.load_snapshot, &args.image) {
        (Some(path), _) => {
            let snapshot = load_snapshot(path)
                .with_context(|| format!("load snapshot {}", path.display()))?;
            Runtime::restore(&snapshot, console)?
        }
        (None, Some(path)) => Runtime::from_image(&read_image(path)?, console)
            .with_context(|| format!("load program image {}", path.display()))?,
        (None, None) => anyhow::bail!("either IMAGE or --load-snapshot is required"),
    };

    let result = match args.steps {
        Some(steps) => rt.run_for(steps),
        None => rt.run(),
    };
    io::stdout().flush().ok();

    let outcome = result.with_context(|| {
        format!(
            "execution stopped at pc {} after {} instructions",
            rt.pc(),
            rt.instruction_count()
        )
    })?;

    if let Some(path) = &args.save_snapshot {
        save_snapshot(path, &rt.snapshot())
            .with_context(|| format!("save snapshot {}", path.display()))?;
    }
    if args.stats {
        let label = match outcome {
            RunOutcome::Halted => "halted",
            RunOutcome::StepLimit => "step limit reached",
        };
        eprintln!(
            "[synacor] {label} after {} instructions (pc={})",
            rt.instruction_count(),
            rt.pc()
        );
    }
    Ok(())
}

fn dump(args: &DumpArgs) -> Result<()> {
    let mut memory = MemoryImage::new();
    memory
        .load(&read_image(&args.image)?)
        .with_context(|| format!("load program image {}", args.image.display()))?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let listing = disasm::iter_from(&memory, args.start).take(args.count.unwrap_or(usize::MAX));
    for decoded in listing {
        writeln!(out, "{decoded}")?;
    }
    Ok(())
}
