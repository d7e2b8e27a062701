//! Rulebook CLI entry point.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use rulebook_engine::{BuildMode, KnowledgeBuilder};
use rulebook_language::Dialect;
use rulebook_runtime::{Repl, SessionConfig};
use tracing_subscriber::EnvFilter;

/// CLI configuration parsed from arguments.
#[derive(Default)]
struct CliConfig {
    files: Vec<PathBuf>,
    batch_mode: bool,
    show_help: bool,
    show_version: bool,
    compiled: bool,
    mvel: bool,
    max_firings: Option<usize>,
    no_property_reactive: bool,
    dump_facts: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {e}\x1b[0m");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: Vec<String>) -> Result<CliConfig, Box<dyn std::error::Error>> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-b" | "--batch" => config.batch_mode = true,
            "--compiled" => config.compiled = true,
            "--mvel" => config.mvel = true,
            "--no-property-reactive" => config.no_property_reactive = true,
            "--dump-facts" => config.dump_facts = true,
            "--max-firings" => {
                i += 1;
                if i >= args.len() {
                    return Err("--max-firings requires a value".into());
                }
                config.max_firings = Some(
                    args[i]
                        .parse()
                        .map_err(|_| format!("invalid --max-firings value: {}", args[i]))?,
                );
            }
            arg if arg.starts_with('-') => {
                return Err(format!("unknown option: {arg}").into());
            }
            path => config.files.push(PathBuf::from(path)),
        }
        i += 1;
    }

    Ok(config)
}

fn run(args: Vec<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = parse_args(args)?;

    if config.show_help {
        print_help();
        return Ok(());
    }

    if config.show_version {
        println!("rulebook {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let builder = KnowledgeBuilder::new()
        .with_mode(if config.compiled {
            BuildMode::Compiled
        } else {
            BuildMode::Interpreted
        })
        .with_dialect(if config.mvel { Dialect::Mvel } else { Dialect::Java });
    let mut session_config =
        SessionConfig::new().with_property_reactive(!config.no_property_reactive);
    if let Some(limit) = config.max_firings {
        session_config = session_config.with_max_firings(limit);
    }

    let mut repl = Repl::new(builder, session_config)?;

    for file in &config.files {
        repl.eval_file(file)?;
    }

    if config.batch_mode {
        for line in repl.eval(":fire")? {
            println!("{line}");
        }
        if config.dump_facts {
            for line in repl.eval(":facts")? {
                println!("{line}");
            }
        }
        return Ok(());
    }

    if !config.files.is_empty() {
        repl = repl.without_banner();
    }

    repl.run()?;
    Ok(())
}

fn print_help() {
    println!(
        "\x1b[1mRulebook\x1b[0m - Incremental production rule engine

\x1b[1mUSAGE:\x1b[0m
    rulebook [OPTIONS] [FILES...]

\x1b[1mARGUMENTS:\x1b[0m
    [FILES...]    Rule files to load before starting the REPL

\x1b[1mOPTIONS:\x1b[0m
    -h, --help                Print help information
    -V, --version             Print version information
    -b, --batch               Load files, fire all rules, and exit
    --compiled                Compile rules into closures instead of interpreting
    --mvel                    Use the MVEL dialect where a file names none
    --max-firings N           Stop with an error after N firings per run
    --no-property-reactive    Re-propagate every update
    --dump-facts              Print working memory after a batch run

\x1b[1mENVIRONMENT:\x1b[0m
    RUST_LOG                  Log filter, e.g. rulebook_engine=trace

\x1b[1mEXAMPLES:\x1b[0m
    rulebook                          Start the REPL
    rulebook rules.drl                Load rules.drl, then start the REPL
    rulebook -b --compiled rules.drl  Run rules.drl to completion

\x1b[1mREPL COMMANDS:\x1b[0m
    :help                Show all commands
    :insert Person(\"Ann\", 30)
    :fire                Fire all activations
    Ctrl+D               Exit"
    );
}
