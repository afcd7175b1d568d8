use std::sync::Arc;

use miette::IntoDiagnostic;

use crate::{
    config::Config,
    pipeline::{notice, run_graph, AssetPipeline, BuildMode, TaskGraph},
    preview::PreviewServer,
    watch::{watch, DispatchTable, Dispatcher},
};

#[derive(clap::Parser, Default)]
pub struct DevOpts {
    /// The port to serve the preview on, overriding the config file
    #[clap(long, short)]
    pub port: Option<u16>,
}

pub fn run(config: Config, opts: DevOpts) -> miette::Result<()> {
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let mode = BuildMode::Development;

    runtime.block_on(async move {
        let config = Arc::new(config);
        let pipeline = Arc::new(AssetPipeline::new(Arc::clone(&config), mode));

        let report = run_graph(&TaskGraph::for_mode(mode), Arc::clone(&pipeline)).await?;
        report.into_result(mode)?;

        let server = PreviewServer::bind(
            opts.port.unwrap_or(config.port),
            config.resolve(&config.paths.dist.base),
        )
        .await?;
        if let Some(url) = server.url() {
            notice(format!("Previewing {} at {url}", config.paths.dist.base));
        }

        let dispatcher = Dispatcher::new(
            DispatchTable::for_config(&config)?,
            pipeline,
            Arc::new(server.reload_handle()),
        );
        notice("Watching for changes. Press Ctrl+C to stop.");

        tokio::select! {
            result = server.serve() => result?,
            result = watch(&config.root, dispatcher) => result?,
        }

        Ok::<_, miette::Report>(())
    })
}
