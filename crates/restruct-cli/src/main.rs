use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use restruct_core::ir::verify::validate_function;
use restruct_core::ir::Module;
use restruct_core::pipeline::{DebugConfig, Pipeline, Preset, VALID_PASS_NAMES};
use simplelog::{Config, WriteLogger};

#[derive(Parser)]
#[command(name = "restruct", about = "Rebuild structured control flow from a CFG")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Structure every function of a JSON module and print the result.
    Structurize {
        /// Path to a JSON module file.
        file: PathBuf,
        /// Pass preset: "literal" (no cleanup) or "optimized" (default).
        #[arg(long, default_value = "optimized")]
        preset: String,
        /// Cleanup passes to skip on top of the preset.
        #[arg(long = "skip-pass")]
        skip_passes: Vec<String>,
        /// Dump each input CFG to stderr.
        #[arg(long)]
        dump_cfg: bool,
        /// Dump the raw tree to stderr before cleanup passes.
        #[arg(long)]
        dump_tree: bool,
        /// Filter dumps to functions whose name contains this substring.
        #[arg(long = "dump-function")]
        dump_function: Option<String>,
        /// Only structure this function.
        #[arg(long)]
        function: Option<String>,
        /// Print the trees as JSON instead of pseudo-code.
        #[arg(long)]
        json: bool,
    },
    /// Print a JSON module's CFGs in human-readable form.
    PrintCfg {
        /// Path to a JSON module file.
        file: PathBuf,
    },
    /// Validate every function of a JSON module without structuring it.
    Check {
        /// Path to a JSON module file.
        file: PathBuf,
    },
}

fn load_module(file: &Path) -> Result<Module> {
    let f = File::open(file).with_context(|| format!("failed to open module: {}", file.display()))?;
    Module::from_reader(BufReader::new(f))
        .with_context(|| format!("failed to parse module: {}", file.display()))
}

struct StructurizeArgs<'a> {
    preset: &'a str,
    skip_passes: &'a [String],
    function: Option<&'a str>,
    json: bool,
}

fn cmd_structurize(file: &Path, args: &StructurizeArgs<'_>, debug: DebugConfig) -> Result<()> {
    let mut module = load_module(file)?;
    if let Some(name) = args.function {
        module.functions.retain(|f| f.name == name);
        if module.functions.is_empty() {
            bail!("no function named {name:?} in {}", file.display());
        }
    }

    let skip_refs: Vec<&str> = args.skip_passes.iter().map(|s| s.as_str()).collect();
    let config = Preset::resolve(args.preset, &skip_refs).with_context(|| {
        format!(
            "valid presets: {}; valid passes: {}",
            Preset::NAMES.join(", "),
            VALID_PASS_NAMES.join(", ")
        )
    })?;
    let pipeline = Pipeline::new(&config, debug);
    let functions = pipeline.run(&module)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&functions)?);
    } else {
        for func in &functions {
            println!("{func}");
        }
    }
    Ok(())
}

fn cmd_print_cfg(file: &Path) -> Result<()> {
    let module = load_module(file)?;
    for func in &module.functions {
        println!("{func}");
    }
    Ok(())
}

fn cmd_check(file: &Path) -> Result<()> {
    let module = load_module(file)?;
    let mut failures = 0usize;
    for func in &module.functions {
        match validate_function(func) {
            Ok(_) => println!("ok    {}", func.name),
            Err(e) => {
                println!("error {e}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} functions failed validation", module.functions.len());
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    WriteLogger::init(level, Config::default(), std::io::stderr()).context("failed to install logger")?;

    match &cli.command {
        Command::Structurize {
            file,
            preset,
            skip_passes,
            dump_cfg,
            dump_tree,
            dump_function,
            function,
            json,
        } => {
            let debug = DebugConfig {
                dump_cfg: *dump_cfg,
                dump_tree: *dump_tree,
                function_filter: dump_function.clone(),
            };
            let args = StructurizeArgs {
                preset,
                skip_passes,
                function: function.as_deref(),
                json: *json,
            };
            cmd_structurize(file, &args, debug)
        }
        Command::PrintCfg { file } => cmd_print_cfg(file),
        Command::Check { file } => cmd_check(file),
    }
}
