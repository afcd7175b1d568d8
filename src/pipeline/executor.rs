use std::sync::Arc;

use async_trait::async_trait;

use crate::{config::Config, transform};

use super::{clean_dir, notice, BuildMode, StepError, StepExecutor, StepName, StepOutput};

/// Runs the real clean, transform and finish steps against a project on disk.
#[derive(Debug, Clone)]
pub struct AssetPipeline {
    config: Arc<Config>,
    mode: BuildMode,
}

impl AssetPipeline {
    pub fn new(config: Arc<Config>, mode: BuildMode) -> AssetPipeline {
        AssetPipeline { config, mode }
    }
}

#[async_trait]
impl StepExecutor for AssetPipeline {
    #[tracing::instrument(skip(self, output), fields(mode = %self.mode))]
    async fn execute(&self, step: StepName, output: &mut StepOutput) -> Result<(), StepError> {
        match step {
            StepName::Clean => {
                let dir = &self.config.paths.output(self.mode).base;
                notice(format!("Cleaning {dir} folder for fresh start."));

                let path = self.config.resolve(dir);
                clean_dir(&path)
                    .await
                    .map_err(|source| StepError::Clean { path, source })
            }
            StepName::Asset(kind) => {
                let config = Arc::clone(&self.config);
                let mode = self.mode;

                let summary =
                    tokio::task::spawn_blocking(move || transform::run(kind, &config, mode))
                        .await
                        .map_err(|e| StepError::Panicked(step, e.to_string()))??;

                output.line(summary);
                Ok(())
            }
            StepName::Finish => {
                notice(format!(
                    "Production build is complete. Files are located at {}",
                    self.config.paths.build.base
                ));
                Ok(())
            }
        }
    }
}
