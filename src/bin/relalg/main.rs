//! Command-line front end for the relalg query engine.
#![forbid(unsafe_code)]

mod ui;

use std::error::Error;
use std::fs;
use std::io;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use relalg::{
    config::EngineConfig, logging::init_logging, optimize_program, optimize_tree, parse, split,
    Environment,
};
use tracing::info;

use crate::ui::Ui;

#[derive(Parser, Debug)]
#[command(
    name = "relalg",
    version,
    about = "Evaluate, optimize and split relational algebra queries",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "RELALG_CONFIG",
        value_name = "PATH",
        help = "Configuration file (defaults to <config dir>/relalg/config.toml)"
    )]
    config: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        env = "RELALG_LOG",
        value_name = "LEVEL",
        help = "Log filter, e.g. debug or relalg::query=trace"
    )]
    log_level: Option<String>,

    #[arg(
        long,
        global = true,
        value_name = "DIR",
        help = "Directory of .csv/.json relations to preload"
    )]
    data_dir: Option<PathBuf>,

    #[arg(
        long = "load",
        global = true,
        value_name = "NAME=PATH",
        action = ArgAction::Append,
        value_parser = parse_binding,
        help = "Load one relation file under NAME (repeatable)"
    )]
    load: Vec<(String, PathBuf)>,

    #[arg(long, global = true, help = "Never colorize output")]
    plain: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Evaluate a query and print or save the result")]
    Eval {
        query: String,

        #[arg(long, help = "Optimize the query before evaluating it")]
        optimize: bool,

        #[arg(
            long,
            value_name = "PATH",
            help = "Save the result (.csv or .json) instead of printing it"
        )]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    #[command(about = "Print the optimized form of a query")]
    Optimize {
        query: String,

        #[arg(long, conflicts_with = "specific_only", help = "Only schema-independent rules")]
        general_only: bool,

        #[arg(long, help = "Only rules that consult relation schemas")]
        specific_only: bool,

        #[arg(long, help = "Print the tree after every rule application")]
        trace: bool,
    },

    #[command(about = "Split a query into named steps")]
    Split {
        query: String,

        #[arg(long, help = "Split the query as written")]
        no_optimize: bool,
    },

    #[command(about = "Optimize a program of assignments and split the result")]
    Program {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    #[command(about = "Show the evaluation plan of a query")]
    Explain { query: String },

    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Csv,
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if let Command::Completions { shell } = &cli.command {
        generate(*shell, &mut Cli::command(), "relalg", &mut io::stdout());
        return Ok(());
    }

    let config = EngineConfig::load(cli.config.clone())?;
    init_logging(cli.log_level.as_deref().unwrap_or(config.log_level()))?;
    let env = build_environment(&cli, &config)?;
    info!(relations = env.len(), "environment ready");
    let ui = Ui::new(cli.plain);

    match cli.command {
        Command::Eval {
            query,
            optimize,
            output,
            format,
        } => {
            let mut tree = parse(&query)?;
            if optimize {
                tree = optimize_tree(&tree, &env, config.optimizer())?.tree;
            }
            let result = tree.compile(&env)?;
            info!(rows = result.len(), "query evaluated");
            match (output, format) {
                (Some(path), _) => {
                    result.save(&path)?;
                    ui.success(format!("saved {} rows to {}", result.len(), path.display()));
                }
                (None, OutputFormat::Text) => ui.relation(&result),
                (None, OutputFormat::Csv) => result.write_csv(io::stdout().lock())?,
                (None, OutputFormat::Json) => println!("{}", result.to_json()?),
            }
        }
        Command::Optimize {
            query,
            general_only,
            specific_only,
            trace,
        } => {
            let mut settings = config.optimizer();
            settings.specific &= !general_only;
            settings.general &= !specific_only;
            settings.trace |= trace;
            let optimized = optimize_tree(&parse(&query)?, &env, settings)?;
            info!(
                changes = optimized.changes,
                passes = optimized.passes,
                "query optimized"
            );
            ui.trace(&optimized.trace);
            println!("{}", optimized.tree);
        }
        Command::Split { query, no_optimize } => {
            let mut tree = parse(&query)?;
            if !no_optimize {
                tree = optimize_tree(&tree, &env, config.optimizer())?.tree;
            }
            println!("{}", split(&tree, &env));
        }
        Command::Program { file } => {
            let code = fs::read_to_string(&file)?;
            println!("{}", optimize_program(&code, &env)?);
        }
        Command::Explain { query } => {
            print!("{}", parse(&query)?.explain()?);
        }
        Command::Completions { .. } => {}
    }

    Ok(())
}

fn build_environment(cli: &Cli, config: &EngineConfig) -> Result<Environment, Box<dyn Error>> {
    let mut env = Environment::new();
    if let Some(dir) = cli.data_dir.as_deref().or(config.data_dir()) {
        let loaded = env.load_dir(dir)?;
        info!(dir = %dir.display(), relations = loaded.len(), "preloaded relations");
    }
    for (name, path) in &cli.load {
        env.load(name, path)?;
    }
    Ok(env)
}

fn parse_binding(raw: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{raw}'"))?;
    if name.trim().is_empty() || path.trim().is_empty() {
        return Err(format!("expected NAME=PATH, got '{raw}'"));
    }
    Ok((name.trim().to_owned(), PathBuf::from(path.trim())))
}
