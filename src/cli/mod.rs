use std::path::PathBuf;
use std::process;

use clap::AppSettings;
use structopt::StructOpt;

use crate::driver::{Driver, Options};
use crate::logger;

mod check;
mod graph;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "bindgraph",
    about = "Resolves and validates dependency-injection binding graphs",
    global_settings = &[AppSettings::ColoredHelp, AppSettings::VersionlessSubcommands]
)]
pub struct Cli {
    #[structopt(
        long, env = "LOG_LEVEL",
        help = "Sets the log level",
        default_value = "info",
        possible_values = &["off", "error", "warn", "info", "debug", "trace"],
        global = true
    )]
    log_level: log::LevelFilter,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
pub enum Command {
    /// Resolves every root component and reports defects
    Check(CheckOptions),
    /// Prints the exported binding graph of every root component
    Graph(GraphOptions),
}

#[derive(Debug, StructOpt)]
pub struct CheckOptions {
    #[structopt(name = "MANIFEST", help = "JSON declaration manifest", parse(from_os_str))]
    pub manifest: PathBuf,

    #[structopt(flatten)]
    pub options: Options,
}

#[derive(Debug, StructOpt)]
pub struct GraphOptions {
    #[structopt(name = "MANIFEST", help = "JSON declaration manifest", parse(from_os_str))]
    pub manifest: PathBuf,

    #[structopt(long, help = "Print Graphviz dot instead of a listing")]
    pub dot: bool,

    #[structopt(flatten)]
    pub options: Options,
}

pub fn run() {
    let cli = Cli::from_args();
    if let Err(err) = logger::init(cli.log_level) {
        eprintln!("could not set up logging: {}", err);
    }

    let ok = match cli.cmd {
        Command::Check(opts) => {
            let mut driver = Driver::new(opts.options);
            check::action(&mut driver, &opts.manifest)
        }
        Command::Graph(opts) => {
            let mut driver = Driver::new(opts.options);
            graph::action(&mut driver, &opts.manifest, opts.dot)
        }
    };

    if !ok {
        process::exit(1);
    }
}
