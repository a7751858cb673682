//! `swapops` - offline station console
//!
//! Runs the reconciliation core against JSON dumps of backend responses.

mod commands;
mod logging;

use anyhow::{anyhow, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use swapops_core::{ConsoleConfig, StationId};

fn file_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(help)
}

fn station_arg() -> Arg {
    Arg::new("station")
        .long("station")
        .required(true)
        .help("Station id")
}

fn cli() -> Command {
    Command::new("swapops")
        .version(swapops_core::VERSION)
        .about("Battery-swap station console: staff reconciliation and slot grids")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML configuration file"),
        )
        .arg(
            Arg::new("log")
                .long("log")
                .global(true)
                .help("Log filter, used when RUST_LOG is unset"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("normalize")
                .about("Normalize a staff listing into canonical records")
                .arg(file_arg("staff", "JSON staff listing"))
                .arg(
                    Arg::new("include-unresolved")
                        .long("include-unresolved")
                        .action(ArgAction::SetTrue)
                        .help("Also list records without a resolvable staff id"),
                ),
        )
        .subcommand(
            Command::new("candidates")
                .about("List staff that may be added to a station")
                .arg(file_arg("staff", "JSON staff listing"))
                .arg(Arg::new("station").long("station").help("Target station id"))
                .arg(
                    Arg::new("station-staff")
                        .long("station-staff")
                        .value_parser(value_parser!(PathBuf))
                        .help("JSON listing of the station's current staff"),
                )
                .arg(
                    Arg::new("exclude")
                        .long("exclude")
                        .action(ArgAction::Append)
                        .help("Staff id to exclude; repeatable"),
                )
                .arg(
                    Arg::new("search")
                        .long("search")
                        .help("Name, username, email or phone filter"),
                ),
        )
        .subcommand(
            Command::new("grid")
                .about("Render the 5x6 slot grid of a station detail")
                .arg(file_arg("detail", "JSON station detail")),
        )
        .subcommand(
            Command::new("station")
                .about("Load a station through the coordinator")
                .arg(file_arg("snapshot", "JSON backend snapshot"))
                .arg(station_arg()),
        )
        .subcommand(
            Command::new("remove-battery")
                .about("Remove a battery and show the reconciled grid")
                .arg(file_arg("snapshot", "JSON backend snapshot"))
                .arg(station_arg())
                .arg(
                    Arg::new("battery")
                        .long("battery")
                        .required(true)
                        .help("Battery id"),
                ),
        )
}

fn path_of<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a PathBuf> {
    args.get_one::<PathBuf>(name)
        .ok_or_else(|| anyhow!("--{name} is required"))
}

fn text_of<'a>(args: &'a ArgMatches, name: &str) -> Result<&'a str> {
    args.get_one::<String>(name)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("--{name} is required"))
}

fn station_of(args: &ArgMatches) -> Result<Option<StationId>> {
    match args.get_one::<String>("station") {
        Some(raw) => StationId::new(raw)
            .map(Some)
            .ok_or_else(|| anyhow!("--station must not be blank")),
        None => Ok(None),
    }
}

async fn run(matches: &ArgMatches, config: &ConsoleConfig) -> Result<String> {
    match matches.subcommand() {
        Some(("normalize", args)) => {
            commands::normalize(path_of(args, "staff")?, args.get_flag("include-unresolved"))
        }
        Some(("candidates", args)) => {
            let exclude: Vec<String> = args
                .get_many::<String>("exclude")
                .map(|ids| ids.cloned().collect())
                .unwrap_or_default();
            commands::candidates(
                path_of(args, "staff")?,
                station_of(args)?.as_ref(),
                args.get_one::<PathBuf>("station-staff").map(PathBuf::as_path),
                &exclude,
                args.get_one::<String>("search").map(String::as_str),
                config,
            )
        }
        Some(("grid", args)) => commands::grid(path_of(args, "detail")?),
        Some(("station", args)) => {
            let station = station_of(args)?.ok_or_else(|| anyhow!("--station is required"))?;
            commands::station(path_of(args, "snapshot")?, &station, config).await
        }
        Some(("remove-battery", args)) => {
            commands::remove_battery(
                path_of(args, "snapshot")?,
                text_of(args, "station")?,
                text_of(args, "battery")?,
                config,
            )
            .await
        }
        Some((other, _)) => Err(anyhow!("unknown command: {other}")),
        None => Err(anyhow!("no command given")),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ConsoleConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ConsoleConfig::default(),
    };
    logging::init(
        matches.get_one::<String>("log").map(String::as_str),
        &config,
        matches.get_flag("json-logs"),
    );

    let output = run(&matches, &config).await?;
    println!("{output}");
    Ok(())
}
