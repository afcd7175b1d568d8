//! The build orchestration: named steps, the graph between them, and the
//! runner that executes that graph.

use std::{fmt, str::FromStr};

use async_trait::async_trait;
use camino::Utf8PathBuf;

use crate::transform::TransformError;

mod clean;
mod executor;
mod graph;
mod inputs;
mod output;
mod runner;
mod tasks;

pub use self::{
    clean::clean_dir,
    executor::AssetPipeline,
    graph::{GraphError, TaskGraph},
    inputs::InputSet,
    output::{notice, StepOutput},
    runner::run_graph,
    tasks::{task_definitions, TaskDefinition},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuildMode {
    Development,
    Production,
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => write!(f, "dev"),
            BuildMode::Production => write!(f, "prod"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown build mode: {0}.  Expected one of dev, prod")]
pub struct UnknownBuildMode(String);

impl FromStr for BuildMode {
    type Err = UnknownBuildMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "dev" | "development" => BuildMode::Development,
            "prod" | "production" => BuildMode::Production,
            _ => return Err(UnknownBuildMode(s.to_owned())),
        })
    }
}

/// The asset types, each of which has its own transformer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetKind {
    Styles,
    Scripts,
    Images,
    Markup,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Styles,
        AssetKind::Scripts,
        AssetKind::Images,
        AssetKind::Markup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Styles => "styles",
            AssetKind::Scripts => "scripts",
            AssetKind::Images => "images",
            AssetKind::Markup => "markup",
        }
    }
}

/// A node in the task graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepName {
    Clean,
    Asset(AssetKind),
    Finish,
}

impl StepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Clean => "clean",
            StepName::Asset(kind) => kind.as_str(),
            StepName::Finish => "finish",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Does the actual work for a step.
///
/// The runner and the watcher only ever talk to steps through this.
#[async_trait]
pub trait StepExecutor: Send + Sync + 'static {
    async fn execute(&self, step: StepName, output: &mut StepOutput) -> Result<(), StepError>;
}

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum StepError {
    #[error("Couldn't clean {path}: {source}")]
    Clean {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error("The {0} step panicked: {1}")]
    Panicked(StepName, String),
}

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
#[error("The {mode} build failed")]
#[diagnostic(help("fix the errors reported above and run the build again"))]
pub struct BuildError {
    pub mode: BuildMode,
    #[related]
    pub failures: Vec<StepFailure>,
}

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
#[error("{step}: {error}")]
pub struct StepFailure {
    pub step: StepName,
    pub error: StepError,
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("dev", BuildMode::Development)]
    #[case("development", BuildMode::Development)]
    #[case("PROD", BuildMode::Production)]
    fn test_parsing_build_modes(#[case] input: &str, #[case] expected: BuildMode) {
        assert_eq!(input.parse::<BuildMode>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_build_mode() {
        assert!("staging".parse::<BuildMode>().is_err());
    }

    #[test]
    fn test_step_names() {
        assert_eq!(StepName::Clean.to_string(), "clean");
        assert_eq!(StepName::Asset(AssetKind::Markup).to_string(), "markup");
    }
}
