use miette::IntoDiagnostic;
use tabled::{Table, Tabled};

use crate::{
    config::{Config, Glob},
    pipeline::{task_definitions, BuildMode, TaskDefinition},
};

#[derive(clap::Parser)]
pub struct TasksOpts {
    /// The build mode to describe, one of dev or prod
    #[clap(long, default_value_t = BuildMode::Development)]
    pub mode: BuildMode,

    /// The format to output.
    ///
    /// Can be one of auto, plain, table, json.
    ///
    /// Defaults to showing a table if running interactively, plain otherwise.
    #[clap(long, default_value_t = Format::Auto)]
    pub format: Format,
}

pub fn run(config: Config, opts: TasksOpts) -> miette::Result<()> {
    let outputs = task_definitions(&config, opts.mode)
        .into_diagnostic()?
        .into_iter()
        .map(Output::from);

    match opts.format.actual_format() {
        ActualFormat::Plain => {
            for task in outputs {
                println!("{}: {} -> {}", task.name, task.inputs, task.output)
            }
        }
        ActualFormat::Table => {
            println!("{}", Table::new(outputs));
        }
        ActualFormat::Json => {
            let outputs = outputs.collect::<Vec<_>>();
            println!("{}", serde_json::to_string(&outputs).into_diagnostic()?)
        }
    }

    Ok(())
}

#[derive(serde::Serialize, Tabled)]
pub struct Output {
    name: &'static str,
    inputs: String,
    excluding: String,
    output: String,
}

impl From<TaskDefinition> for Output {
    fn from(task: TaskDefinition) -> Self {
        let join = |globs: &[Glob]| {
            globs
                .iter()
                .map(Glob::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        Output {
            name: task.kind.as_str(),
            inputs: join(task.inputs.include()),
            excluding: join(task.inputs.exclude()),
            output: task.output.to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Format {
    Auto,
    Plain,
    Table,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActualFormat {
    Plain,
    Table,
    Json,
}

impl Format {
    pub fn actual_format(self) -> ActualFormat {
        match self {
            Format::Auto if atty::is(atty::Stream::Stdout) => ActualFormat::Table,
            Format::Auto => ActualFormat::Plain,
            Format::Plain => ActualFormat::Plain,
            Format::Table => ActualFormat::Table,
            Format::Json => ActualFormat::Json,
        }
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Auto => write!(f, "auto"),
            Format::Plain => write!(f, "plain"),
            Format::Table => write!(f, "table"),
            Format::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "auto" => Format::Auto,
            "plain" => Format::Plain,
            "table" => Format::Table,
            "json" => Format::Json,
            _ => miette::bail!("Unknown format: {s}.  Expected one of auto, plain, table, json"),
        })
    }
}
