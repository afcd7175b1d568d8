use camino::{Utf8Path, Utf8PathBuf};
use minify_js::{minify, Session, TopLevelMode};

use crate::{
    config::Config,
    diagnostics::CollectResults,
    pipeline::{BuildMode, TaskDefinition},
};

use super::{read_to_string, write_output, TransformError};

pub(super) const OUTPUT_FILE: &str = "scripts.js";

pub(super) fn build(
    config: &Config,
    task: &TaskDefinition,
    inputs: &[Utf8PathBuf],
) -> Result<usize, TransformError> {
    let sources = inputs
        .iter()
        .map(|input| read_to_string(&config.resolve(input)))
        .collect_results()?;

    let mut script = concat(&sources);
    if task.mode == BuildMode::Production && !script.is_empty() {
        script = minify_script(&script, &task.output.join(OUTPUT_FILE))?;
    }

    write_output(&config.resolve(&task.output).join(OUTPUT_FILE), script)?;
    Ok(1)
}

pub(super) fn concat(sources: &[String]) -> String {
    sources.join("\n")
}

fn minify_script(source: &str, filename: &Utf8Path) -> Result<String, TransformError> {
    let session = Session::new();
    let mut out = Vec::new();

    minify(&session, TopLevelMode::Global, source.as_bytes(), &mut out).map_err(|e| {
        TransformError::Script {
            path: filename.to_owned(),
            message: format!("{e:?}"),
        }
    })?;

    String::from_utf8(out).map_err(|e| TransformError::Script {
        path: filename.to_owned(),
        message: e.to_string(),
    })
}
