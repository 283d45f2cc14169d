use anyhow::Result;
use chtl_cli::{EmitMode, build_cmd, scan_cmd};
use chtl_compiler::CompileOptions;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "chtl", version, about = "CHTL compiler")]
struct Cli {
    /// Log pipeline detail to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a .chtl file into HTML, CSS and script.
    Build {
        /// Path to the .chtl file
        input: PathBuf,
        /// Output directory (default: target/chtl-out)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// What to emit: one assembled document or separate parts
        #[arg(long, value_enum, default_value_t = EmitMode::Document)]
        emit: EmitMode,
        /// Emit markup and CSS without indentation
        #[arg(long)]
        minify: bool,
        /// Fail on any error diagnostic
        #[arg(long)]
        strict: bool,
        /// Log a summary per compiled file, as DEBUG_MODE does
        #[arg(long)]
        debug: bool,
    },
    /// Print the fragments the boundary scanner finds in a file.
    Scan {
        /// Path to the .chtl file
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Build {
            input,
            out_dir,
            emit,
            minify,
            strict,
            debug,
        } => {
            let options = CompileOptions { pretty: !minify, strict, debug };
            build_cmd(&input, out_dir.as_deref(), emit, options)?;
        }
        Commands::Scan { input } => {
            scan_cmd(&input)?;
        }
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::new();
    if verbose {
        builder.filter_level(LevelFilter::Debug);
    } else {
        builder
            .filter_level(LevelFilter::Warn)
            .filter_module("chtl::compiler", LevelFilter::Info);
    }
    builder.format_timestamp(None).parse_default_env().init();
}
