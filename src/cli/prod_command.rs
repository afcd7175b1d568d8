use std::sync::Arc;

use miette::IntoDiagnostic;

use crate::{
    config::Config,
    pipeline::{run_graph, AssetPipeline, BuildMode, TaskGraph},
};

#[derive(clap::Parser, Default)]
pub struct ProdOpts {}

pub fn run(config: Config, _opts: ProdOpts) -> miette::Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let mode = BuildMode::Production;

    runtime.block_on(async move {
        let graph = TaskGraph::for_mode(mode);
        let pipeline = Arc::new(AssetPipeline::new(Arc::new(config), mode));

        let report = run_graph(&graph, pipeline).await?;
        report.into_result(mode)?;

        Ok::<_, miette::Report>(())
    })
}
