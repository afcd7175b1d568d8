use std::collections::{HashMap, HashSet};

use petgraph::{dot::Dot, stable_graph::NodeIndex, Direction};

use super::{AssetKind, BuildMode, StepName};

type Graph = petgraph::Graph<StepName, StepEdge>;

/// A directed acyclic graph of build steps.
///
/// Edges run from a step to the steps it unblocks.
#[derive(Debug, Default)]
pub struct TaskGraph {
    graph: Graph,
    indices: HashMap<StepName, NodeIndex>,
}

#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum GraphError {
    #[error("The task graph has a cycle involving {0}")]
    Cycle(StepName),
}

impl TaskGraph {
    pub fn new() -> Self {
        TaskGraph::default()
    }

    /// The standard graph: clean, then every asset step in parallel, then
    /// (for production builds) finish.
    pub fn for_mode(mode: BuildMode) -> Self {
        let mut graph = TaskGraph::new();
        graph.add_step(StepName::Clean);

        for kind in AssetKind::ALL {
            graph.add_dependency(StepName::Asset(kind), StepName::Clean);
            if mode == BuildMode::Production {
                graph.add_dependency(StepName::Finish, StepName::Asset(kind));
            }
        }

        graph
    }

    pub fn add_step(&mut self, step: StepName) -> NodeIndex {
        if let Some(index) = self.indices.get(&step) {
            return *index;
        }
        let index = self.graph.add_node(step);
        self.indices.insert(step, index);
        index
    }

    /// Makes `step` wait for `depends_on`, adding either if they're missing.
    pub fn add_dependency(&mut self, step: StepName, depends_on: StepName) {
        let step_index = self.add_step(step);
        let dependency_index = self.add_step(depends_on);
        if step_index != dependency_index {
            self.graph
                .update_edge(dependency_index, step_index, StepEdge::Unblocks);
        }
    }

    #[cfg(test)]
    pub fn steps(&self) -> impl Iterator<Item = StepName> + '_ {
        self.graph.node_weights().copied()
    }

    /// The steps in an order where every step comes after its dependencies
    pub fn topsort(&self) -> Result<Vec<StepName>, GraphError> {
        petgraph::algo::toposort(&self.graph, None)
            .map_err(|cycle| GraphError::Cycle(self.graph[cycle.node_id()]))
            .map(|order| order.into_iter().map(|index| self.graph[index]).collect())
    }

    pub fn direct_dependencies(&self, step: StepName) -> HashSet<StepName> {
        self.neighbours(step, Direction::Incoming).collect()
    }

    pub fn dependants(&self, step: StepName) -> Vec<StepName> {
        let mut dependants = self
            .neighbours(step, Direction::Outgoing)
            .collect::<Vec<_>>();
        dependants.sort();
        dependants
    }

    fn neighbours(
        &self,
        step: StepName,
        direction: Direction,
    ) -> impl Iterator<Item = StepName> + '_ {
        self.indices
            .get(&step)
            .into_iter()
            .flat_map(move |index| self.graph.neighbors_directed(*index, direction))
            .map(|index| self.graph[index])
    }

    pub fn dot(&self) -> Dot<'_, &Graph> {
        Dot::new(&self.graph)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum StepEdge {
    Unblocks,
}

impl std::fmt::Display for StepEdge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepEdge::Unblocks => write!(f, "unblocks"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use maplit::hashset;
    use similar_asserts::assert_eq;

    use super::*;

    const STYLES: StepName = StepName::Asset(AssetKind::Styles);
    const SCRIPTS: StepName = StepName::Asset(AssetKind::Scripts);
    const IMAGES: StepName = StepName::Asset(AssetKind::Images);
    const MARKUP: StepName = StepName::Asset(AssetKind::Markup);

    #[test]
    fn test_production_graph_order() {
        let graph = TaskGraph::for_mode(BuildMode::Production);

        let order = graph.topsort().unwrap();

        assert_eq!(order.len(), 6);
        assert_eq!(order.first(), Some(&StepName::Clean));
        assert_eq!(order.last(), Some(&StepName::Finish));
    }

    #[test]
    fn test_development_graph_has_no_finish() {
        let graph = TaskGraph::for_mode(BuildMode::Development);

        assert_eq!(
            graph.steps().collect::<HashSet<_>>(),
            hashset! { StepName::Clean, STYLES, SCRIPTS, IMAGES, MARKUP }
        );
    }

    #[test]
    fn test_direct_dependencies() {
        let graph = TaskGraph::for_mode(BuildMode::Production);

        assert_eq!(
            graph.direct_dependencies(StepName::Finish),
            hashset! { STYLES, SCRIPTS, IMAGES, MARKUP }
        );
        assert_eq!(graph.direct_dependencies(SCRIPTS), hashset! { StepName::Clean });
        assert!(graph.direct_dependencies(StepName::Clean).is_empty());
    }

    #[test]
    fn test_dependants() {
        let graph = TaskGraph::for_mode(BuildMode::Production);

        assert_eq!(
            graph.dependants(StepName::Clean),
            vec![STYLES, SCRIPTS, IMAGES, MARKUP]
        );
        assert_eq!(graph.dependants(MARKUP), vec![StepName::Finish]);
        assert!(graph.dependants(StepName::Finish).is_empty());
    }

    #[test]
    fn test_duplicate_dependencies_are_ignored() {
        let mut graph = TaskGraph::new();
        graph.add_dependency(STYLES, StepName::Clean);
        graph.add_dependency(STYLES, StepName::Clean);

        assert_eq!(graph.dependants(StepName::Clean), vec![STYLES]);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let mut graph = TaskGraph::new();
        graph.add_dependency(STYLES, StepName::Clean);
        graph.add_dependency(StepName::Clean, STYLES);

        assert_matches!(graph.topsort(), Err(GraphError::Cycle(_)));
    }

    #[test]
    fn test_dot_output_names_every_step() {
        let dot = format!("{}", TaskGraph::for_mode(BuildMode::Production).dot());

        for step in ["clean", "styles", "scripts", "images", "markup", "finish"] {
            assert!(dot.contains(step), "{dot}");
        }
    }
}
