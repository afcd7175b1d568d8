use camino::Utf8PathBuf;
use clap::Parser;

use crate::config::{load_config_from_path, Config};

mod dev_command;
mod graph_command;
mod prod_command;
mod tasks_command;

#[derive(Parser)]
#[clap(version, about = "Builds, serves and watches front-end assets")]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Option<Command>,
}

#[derive(Parser)]
pub enum Command {
    /// Builds into the development output, then serves it and rebuilds on changes.
    ///
    /// This is what runs when no command is given.
    Dev(dev_command::DevOpts),
    /// Builds an optimised copy of the site into the production output
    Prod(prod_command::ProdOpts),
    /// Prints the inputs and output of each asset step
    Tasks(tasks_command::TasksOpts),
    /// Prints the build graph in dot format
    Graph(graph_command::GraphOpts),
}

pub fn run() -> miette::Result<()> {
    tracing_subscriber::fmt::init();

    let opts = Cli::parse();
    let config = load_config()?;

    match opts.command.unwrap_or_default() {
        Command::Dev(command_opts) => dev_command::run(config, command_opts),
        Command::Prod(command_opts) => prod_command::run(config, command_opts),
        Command::Tasks(command_opts) => tasks_command::run(config, command_opts),
        Command::Graph(command_opts) => graph_command::run(config, command_opts),
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::Dev(dev_command::DevOpts::default())
    }
}

fn load_config() -> Result<Config, miette::Report> {
    let current_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Couldn't determine the current directory: {e}"))?;
    let current_dir = Utf8PathBuf::try_from(current_dir)
        .map_err(|e| miette::miette!("The current directory isn't valid UTF-8: {e}"))?;

    load_config_from_path(current_dir)
}
