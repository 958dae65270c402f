//! Synacor VM - CLI Entry Point
//!
//! Commands:
//! - `synacor-vm run <image>` - Run a program image until it halts

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::Level;

#[derive(Parser)]
#[command(name = "synacor-vm")]
#[command(version)]
#[command(about = "A virtual machine for the Synacor 16-bit instruction set")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program image until it halts
    Run {
        /// Path to the binary image to execute
        image: String,
        /// Address of the first instruction
        #[arg(short, long, default_value = "0")]
        start: u16,
        /// Print the final machine state as JSON on stderr
        #[arg(long)]
        dump_state: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Run { image, start, dump_state }) => run_image(&image, start, dump_state),
        None => {
            println!("Synacor VM v{}", env!("CARGO_PKG_VERSION"));
            println!("A virtual machine for the Synacor 16-bit instruction set");
            println!();
            println!("Use --help for available commands");
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_image(path: &str, start: u16, dump_state: bool) -> ExitCode {
    use synacor::{load_image, Machine, MachineState, StdConsole};

    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("failed to load image: {}", e);
            return ExitCode::from(2);
        }
    };

    let mut machine = match Machine::with_image(&image) {
        Ok(machine) => machine,
        Err(e) => {
            eprintln!("failed to load image: {}", e);
            return ExitCode::from(2);
        }
    };

    tracing::info!(path, words = image.len(), start, "running program");
    let mut console = StdConsole::stdio();
    let report = machine.run(start, &mut console);
    tracing::info!(state = ?report.state, cycles = report.cycles, "program finished");

    if dump_state {
        match serde_json::to_string_pretty(&machine.snapshot()) {
            Ok(json) => eprintln!("{}", json),
            Err(e) => tracing::warn!(error = %e, "could not serialize machine state"),
        }
    }

    match report.state {
        MachineState::Halted => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}
