use crate::{
    config::Config,
    pipeline::{BuildMode, TaskGraph},
};

#[derive(clap::Parser)]
pub struct GraphOpts {
    /// The build mode to show the graph for, one of dev or prod
    #[clap(long, default_value_t = BuildMode::Development)]
    pub mode: BuildMode,
}

pub fn run(_config: Config, opts: GraphOpts) -> miette::Result<()> {
    let graph = TaskGraph::for_mode(opts.mode);
    graph.topsort()?;

    println!("{}", graph.dot());

    Ok(())
}
