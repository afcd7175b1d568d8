use camino::Utf8PathBuf;

use crate::config::{Config, Glob};

use super::{AssetKind, BuildMode, InputSet};

/// What one asset step reads and where it writes, for a given mode.
#[derive(Debug, Clone)]
pub struct TaskDefinition {
    pub kind: AssetKind,
    pub mode: BuildMode,
    /// The directory output paths are made relative to
    pub source_dir: Utf8PathBuf,
    pub inputs: InputSet,
    pub output: Utf8PathBuf,
}

impl TaskDefinition {
    pub fn new(
        config: &Config,
        mode: BuildMode,
        kind: AssetKind,
    ) -> Result<TaskDefinition, globset::Error> {
        let src = &config.paths.src;
        let out = config.paths.output(mode);

        let (source_dir, include, exclude, output) = match kind {
            AssetKind::Styles => (
                &src.css,
                vec![Glob::in_dir(&src.css, "**/*.scss")?],
                vec![],
                &out.css,
            ),
            AssetKind::Scripts => (
                &src.js,
                vec![
                    Glob::in_dir(&src.js, "libs/**/*.js")?,
                    Glob::in_dir(&src.js, "**/*.js")?,
                ],
                vec![Glob::in_dir(&src.js, "**/external/*")?],
                &out.js,
            ),
            AssetKind::Images => (
                &src.img,
                vec![Glob::in_dir(&src.img, "**/*")?],
                vec![],
                &out.img,
            ),
            AssetKind::Markup => (
                &src.base,
                vec![Glob::in_dir(&src.base, "**/*.html")?],
                vec![],
                &out.base,
            ),
        };

        Ok(TaskDefinition {
            kind,
            mode,
            source_dir: source_dir.clone(),
            inputs: InputSet::new(include, exclude)?,
            output: output.clone(),
        })
    }
}

pub fn task_definitions(
    config: &Config,
    mode: BuildMode,
) -> Result<Vec<TaskDefinition>, globset::Error> {
    AssetKind::ALL
        .into_iter()
        .map(|kind| TaskDefinition::new(config, mode, kind))
        .collect()
}
