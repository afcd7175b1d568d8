//! The transformers that turn source assets into output assets.
//!
//! Each one is synchronous and is run on the blocking pool by the pipeline.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};

use crate::{
    config::Config,
    pipeline::{AssetKind, BuildMode, TaskDefinition},
};

mod images;
mod markup;
mod purge;
mod scripts;
mod styles;

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum TransformError {
    #[error("Invalid input pattern")]
    Pattern(#[from] globset::Error),
    #[error("Couldn't read {path}")]
    Read {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Couldn't write {path}")]
    Write {
        path: Utf8PathBuf,
        source: std::io::Error,
    },
    #[error("Sass error in {path}:\n{message}")]
    #[diagnostic(help("the stylesheet failed to compile"))]
    Sass { path: Utf8PathBuf, message: String },
    #[error("CSS error in {path}: {message}")]
    Css { path: Utf8PathBuf, message: String },
    #[error("Script error in {path}: {message}")]
    Script { path: Utf8PathBuf, message: String },
    #[error("Couldn't optimise {path}")]
    Image {
        path: Utf8PathBuf,
        source: image::ImageError,
    },
    #[error("{} files failed", .errors.len())]
    Many {
        #[related]
        errors: Vec<TransformError>,
    },
}

impl From<Vec<TransformError>> for TransformError {
    fn from(mut errors: Vec<TransformError>) -> Self {
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }
        TransformError::Many { errors }
    }
}

/// How much work a transformer did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformSummary {
    pub read: usize,
    pub written: usize,
    pub output: Utf8PathBuf,
}

impl fmt::Display for TransformSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        write!(
            f,
            "Read {} file{}, wrote {} file{} to {}",
            self.read,
            plural(self.read),
            self.written,
            plural(self.written),
            self.output
        )
    }
}

/// Runs the transformer for `kind` over the project described by `config`.
#[tracing::instrument(skip(config), fields(root = %config.root))]
pub fn run(
    kind: AssetKind,
    config: &Config,
    mode: BuildMode,
) -> Result<TransformSummary, TransformError> {
    let task = TaskDefinition::new(config, mode, kind)?;
    let inputs = task.inputs.collect(&config.root);
    tracing::debug!(count = inputs.len(), "Collected inputs");

    let written = match kind {
        AssetKind::Styles => styles::build(config, &task, &inputs)?,
        AssetKind::Scripts => scripts::build(config, &task, &inputs)?,
        AssetKind::Images => images::build(config, &task, &inputs)?,
        AssetKind::Markup => markup::build(config, &task, &inputs)?,
    };

    Ok(TransformSummary {
        read: inputs.len(),
        written,
        output: task.output,
    })
}

fn read_to_string(path: &Utf8Path) -> Result<String, TransformError> {
    std::fs::read_to_string(path).map_err(|source| TransformError::Read {
        path: path.to_owned(),
        source,
    })
}

fn read_bytes(path: &Utf8Path) -> Result<Vec<u8>, TransformError> {
    std::fs::read(path).map_err(|source| TransformError::Read {
        path: path.to_owned(),
        source,
    })
}

/// Writes a file, creating any missing parent directories
fn write_output(path: &Utf8Path, contents: impl AsRef<[u8]>) -> Result<(), TransformError> {
    let write = || {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)
    };

    write().map_err(|source| TransformError::Write {
        path: path.to_owned(),
        source,
    })
}

/// Works out where a per-file output goes, keeping its path under the source dir
fn mirrored_output(task: &TaskDefinition, input: &Utf8Path) -> Utf8PathBuf {
    let relative = input.strip_prefix(&task.source_dir).unwrap_or(input);
    task.output.join(relative)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = TransformSummary {
            read: 3,
            written: 1,
            output: "dist/js".into(),
        };

        assert_eq!(summary.to_string(), "Read 3 files, wrote 1 file to dist/js");
    }

    #[test]
    fn test_single_errors_are_not_wrapped() {
        let error = TransformError::from(vec![TransformError::Script {
            path: "a.js".into(),
            message: "bad".into(),
        }]);

        assert!(matches!(error, TransformError::Script { .. }));
    }

    #[test]
    fn test_mirrored_output() {
        let config = Config::with_defaults("/project".into());
        let task = TaskDefinition::new(&config, BuildMode::Production, AssetKind::Images).unwrap();

        assert_eq!(
            mirrored_output(&task, Utf8Path::new("src/img/icons/logo.png")),
            "build/img/icons/logo.png"
        );
    }
}
