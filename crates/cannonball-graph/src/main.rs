//! `cannonball` command-line tool

use anyhow::{Context, Result};
use cannonball_graph::{GraphManager, ManagerError};
use cannonball_markdown::{Codec, CodecConfig};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "CANNONBALL_LOG";
const DEFAULT_CONFIG: &str = "cannonball.toml";

fn file_arg() -> Arg {
    Arg::new("file")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Outline markdown file")
}

fn cli() -> Command {
    Command::new("cannonball")
        .version(cannonball_graph::VERSION)
        .about("Typed markdown outlines with derived statuses")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Codec configuration file (default: ./cannonball.toml if present)"),
        )
        .subcommand(
            Command::new("check")
                .about("Parse an outline and print every node with its effective status")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("fmt")
                .about("Rewrite an outline in canonical form")
                .arg(file_arg())
                .arg(
                    Arg::new("write")
                        .long("write")
                        .action(ArgAction::SetTrue)
                        .help("Write the result back instead of printing it"),
                ),
        )
        .subcommand(
            Command::new("actionable")
                .about("List work items that can be started now")
                .arg(file_arg()),
        )
        .subcommand(
            Command::new("export")
                .about("Print the outline as a JSON snapshot")
                .arg(file_arg()),
        )
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(matches: &ArgMatches) -> Result<CodecConfig> {
    let explicit = matches.get_one::<PathBuf>("config");
    let mut config = match explicit {
        Some(path) => CodecConfig::load(path)?,
        None if Path::new(DEFAULT_CONFIG).is_file() => CodecConfig::load(Path::new(DEFAULT_CONFIG))?,
        None => CodecConfig::default(),
    };
    config.apply_env_overrides()?;
    Ok(config)
}

fn open(codec: &Codec, args: &ArgMatches) -> Result<(PathBuf, GraphManager)> {
    let path = args
        .get_one::<PathBuf>("file")
        .cloned()
        .context("missing outline file")?;
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let manager = GraphManager::with_codec(codec.clone());
    manager
        .replace_markdown(&text)
        .map_err(|e| describe(&path, e))?;
    Ok((path, manager))
}

fn describe(path: &Path, err: ManagerError) -> anyhow::Error {
    match err.as_graph() {
        Some(graph) => anyhow::anyhow!("{}: {:?} error: {graph}", path.display(), graph.category()),
        None => anyhow::Error::new(err).context(path.display().to_string()),
    }
}

fn run(matches: &ArgMatches) -> Result<()> {
    let codec = Codec::new(load_config(matches)?)?;

    match matches.subcommand() {
        Some(("check", args)) => {
            let (path, manager) = open(&codec, args)?;
            for view in manager.nodes() {
                println!("{}", view.summary());
            }
            let blocking = manager.blocking_nodes().len();
            println!();
            println!(
                "{}: {} nodes, {blocking} blocking",
                path.display(),
                manager.node_count()
            );
        }
        Some(("fmt", args)) => {
            let (path, manager) = open(&codec, args)?;
            let text = manager.save();
            if args.get_flag("write") {
                fs::write(&path, text)
                    .with_context(|| format!("failed to write {}", path.display()))?;
            } else {
                print!("{text}");
            }
        }
        Some(("actionable", args)) => {
            let (_, manager) = open(&codec, args)?;
            for view in manager.actionable_tasks() {
                println!("{}", view.summary().trim_start());
            }
        }
        Some(("export", args)) => {
            let (_, manager) = open(&codec, args)?;
            println!("{}", manager.export_json()?);
        }
        _ => {}
    }
    Ok(())
}

fn main() {
    init_tracing();
    let matches = cli().get_matches();
    if let Err(err) = run(&matches) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
