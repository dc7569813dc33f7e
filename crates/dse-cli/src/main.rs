//! `dse` command line tool

mod commands;

use anyhow::Result;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dse_analysis::WorkflowOptions;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    let problem_arg = Arg::new("problem")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Saved problem or analysis (JSON variant)");
    let json_arg = Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON");

    Command::new("dse")
        .version(dse_analysis::VERSION)
        .about("Design space exploration for building energy models")
        .subcommand_required(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log debug output"),
        )
        .subcommand(
            Command::new("inspect")
                .about("Summarize a problem and classify its variables")
                .arg(problem_arg.clone())
                .arg(
                    Arg::new("continuous-only")
                        .long("continuous-only")
                        .action(ArgAction::SetTrue)
                        .help("Classify for an algorithm that only takes continuous variables"),
                )
                .arg(
                    Arg::new("sample-uncertain")
                        .long("sample-uncertain")
                        .action(ArgAction::SetTrue)
                        .help("Treat variables with an uncertainty description as uncertain"),
                )
                .arg(json_arg.clone()),
        )
        .subcommand(
            Command::new("workflow")
                .about("Expand one data point into its job workflow")
                .arg(problem_arg)
                .arg(
                    Arg::new("values")
                        .long("values")
                        .required(true)
                        .allow_hyphen_values(true)
                        .help("Comma separated values, one per variable"),
                )
                .arg(
                    Arg::new("nested")
                        .long("nested")
                        .action(ArgAction::SetTrue)
                        .help("Keep one output directory per job instead of a flat one"),
                )
                .arg(
                    Arg::new("include-dir")
                        .long("include-dir")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory added to the load path of Ruby jobs"),
                )
                .arg(json_arg),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn problem_path(args: &ArgMatches) -> PathBuf {
    args.get_one::<PathBuf>("problem").cloned().unwrap_or_default()
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("inspect", args)) => {
            let problem = commands::load_problem(&problem_path(args))?;
            let algorithm = commands::algorithm(args.get_flag("continuous-only"), args.get_flag("sample-uncertain"));
            let report = commands::inspect(&problem, &algorithm);
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", commands::render_inspection(&report));
            }
        }
        Some(("workflow", args)) => {
            let problem = commands::load_problem(&problem_path(args))?;
            let raw = args.get_one::<String>("values").map(String::as_str).unwrap_or_default();
            let values = commands::parse_values(&problem, raw)?;

            let mut options = WorkflowOptions::new().with_flat_output_directory(!args.get_flag("nested"));
            if let Some(dir) = args.get_one::<PathBuf>("include-dir") {
                options = options.with_ruby_include_dir(dir);
            }
            let workflow = commands::expand(&problem, values, &options)?;
            if args.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&workflow)?);
            } else {
                print!("{}", commands::render_workflow(&workflow));
            }
        }
        _ => {}
    }
    Ok(())
}

fn main() {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));

    if let Err(e) = run(&matches) {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
