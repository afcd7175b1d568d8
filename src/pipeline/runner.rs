use std::{collections::HashMap, sync::Arc};

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};

use super::{
    output::build_step_outputs, BuildError, BuildMode, GraphError, StepError, StepExecutor,
    StepFailure, StepName, StepOutput, TaskGraph,
};

#[derive(Debug)]
pub enum StepOutcome {
    Succeeded,
    Failed(StepError),
    /// One of the step's dependencies failed, so it was never started
    NotRun,
}

/// What happened to each step of a run, in the order the steps finished.
#[derive(Debug, Default)]
pub struct RunReport {
    outcomes: Vec<(StepName, StepOutcome)>,
}

impl RunReport {
    #[cfg(test)]
    pub fn outcomes(&self) -> &[(StepName, StepOutcome)] {
        &self.outcomes
    }

    #[cfg(test)]
    pub fn outcome(&self, step: StepName) -> Option<&StepOutcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| *name == step)
            .map(|(_, outcome)| outcome)
    }

    #[cfg(test)]
    pub fn succeeded(&self) -> bool {
        self.outcomes
            .iter()
            .all(|(_, outcome)| matches!(outcome, StepOutcome::Succeeded))
    }

    pub fn into_result(self, mode: BuildMode) -> Result<(), BuildError> {
        let failures = self
            .outcomes
            .into_iter()
            .filter_map(|(step, outcome)| match outcome {
                StepOutcome::Failed(error) => Some(StepFailure { step, error }),
                StepOutcome::Succeeded | StepOutcome::NotRun => None,
            })
            .collect::<Vec<_>>();

        if failures.is_empty() {
            return Ok(());
        }

        Err(BuildError { mode, failures })
    }

    fn record(&mut self, step: StepName, outcome: StepOutcome) {
        self.outcomes.push((step, outcome));
    }

    fn contains(&self, step: StepName) -> bool {
        self.outcomes.iter().any(|(name, _)| *name == step)
    }
}

struct FinishedStep {
    step: StepName,
    result: Result<(), StepError>,
}

struct StepRunner<E> {
    currently_running: FuturesUnordered<BoxFuture<'static, FinishedStep>>,
    executor: Arc<E>,
    outputs: HashMap<StepName, StepOutput>,
}

impl<E> StepRunner<E>
where
    E: StepExecutor,
{
    fn new(executor: Arc<E>, outputs: HashMap<StepName, StepOutput>) -> StepRunner<E> {
        StepRunner {
            currently_running: FuturesUnordered::new(),
            executor,
            outputs,
        }
    }

    #[tracing::instrument(skip(self))]
    fn start_step(&mut self, step: StepName) {
        let executor = Arc::clone(&self.executor);
        let mut output = self
            .outputs
            .remove(&step)
            .unwrap_or_else(|| StepOutput::standalone(step));

        let handle = tokio::spawn(async move {
            let result = executor.execute(step, &mut output).await;
            if let Err(e) = &result {
                output.error(e);
            }
            result
        });

        self.currently_running.push(
            async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(join_error) => Err(StepError::Panicked(step, join_error.to_string())),
                };
                FinishedStep { step, result }
            }
            .boxed(),
        );
    }

    async fn next_finished(&mut self) -> Option<FinishedStep> {
        self.currently_running.next().await
    }
}

/// Runs every step of `graph`, starting each one as soon as all of its
/// dependencies have succeeded.
///
/// When a step fails nothing new is started, but steps that are already running
/// are left to finish.
#[tracing::instrument(skip_all)]
pub async fn run_graph<E>(graph: &TaskGraph, executor: Arc<E>) -> Result<RunReport, GraphError>
where
    E: StepExecutor,
{
    let order = graph.topsort()?;
    let outputs = build_step_outputs(&order);

    let mut waiting = order
        .iter()
        .map(|step| (*step, graph.direct_dependencies(*step).len()))
        .collect::<HashMap<_, _>>();

    let mut runner = StepRunner::new(executor, outputs);
    for step in &order {
        if waiting[step] == 0 {
            waiting.remove(step);
            runner.start_step(*step);
        }
    }

    let mut report = RunReport::default();
    while let Some(FinishedStep { step, result }) = runner.next_finished().await {
        match result {
            Ok(()) => {
                tracing::debug!(%step, "Step finished");
                report.record(step, StepOutcome::Succeeded);

                for dependant in graph.dependants(step) {
                    let Some(waiting_for) = waiting.get_mut(&dependant) else {
                        continue;
                    };
                    *waiting_for -= 1;
                    if *waiting_for == 0 {
                        waiting.remove(&dependant);
                        runner.start_step(dependant);
                    }
                }
            }
            Err(error) => {
                tracing::error!(%step, "Step failed: {error}");
                report.record(step, StepOutcome::Failed(error));
                waiting.clear();
            }
        }
    }

    for step in order {
        if !report.contains(step) {
            report.record(step, StepOutcome::NotRun);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::{sync::Mutex, time::Duration};

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use camino::Utf8PathBuf;

    use crate::pipeline::AssetKind;

    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        events: Mutex<Vec<String>>,
        failing: Option<StepName>,
    }

    #[async_trait]
    impl StepExecutor for RecordingExecutor {
        async fn execute(&self, step: StepName, _output: &mut StepOutput) -> Result<(), StepError> {
            self.events.lock().unwrap().push(format!("start {step}"));
            if step == StepName::Asset(AssetKind::Images) {
                // Make sure siblings overlap with a slow step
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            self.events.lock().unwrap().push(format!("end {step}"));

            if Some(step) == self.failing {
                return Err(StepError::Clean {
                    path: Utf8PathBuf::from("dist"),
                    source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope"),
                });
            }
            Ok(())
        }
    }

    impl RecordingExecutor {
        fn position(&self, event: &str) -> usize {
            self.events
                .lock()
                .unwrap()
                .iter()
                .position(|e| e == event)
                .unwrap_or_else(|| panic!("no {event} event"))
        }

        fn saw(&self, event: &str) -> bool {
            self.events.lock().unwrap().iter().any(|e| e == event)
        }
    }

    #[tokio::test]
    async fn test_steps_run_after_their_dependencies() {
        let executor = Arc::new(RecordingExecutor::default());

        let report = run_graph(
            &TaskGraph::for_mode(BuildMode::Production),
            Arc::clone(&executor),
        )
        .await
        .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.outcomes().len(), 6);

        let clean_end = executor.position("end clean");
        let finish_start = executor.position("start finish");
        for kind in AssetKind::ALL {
            let step = StepName::Asset(kind);
            assert!(executor.position(&format!("start {step}")) > clean_end);
            assert!(executor.position(&format!("end {step}")) < finish_start);
        }
    }

    #[tokio::test]
    async fn test_asset_steps_run_in_parallel() {
        let executor = Arc::new(RecordingExecutor::default());

        run_graph(
            &TaskGraph::for_mode(BuildMode::Development),
            Arc::clone(&executor),
        )
        .await
        .unwrap();

        // The slow images step is still going when the others start
        assert!(executor.position("start markup") < executor.position("end images"));
        assert!(executor.position("start styles") < executor.position("end images"));
    }

    #[tokio::test]
    async fn test_failure_stops_later_steps_but_not_siblings() {
        let executor = Arc::new(RecordingExecutor {
            failing: Some(StepName::Asset(AssetKind::Styles)),
            ..RecordingExecutor::default()
        });

        let report = run_graph(
            &TaskGraph::for_mode(BuildMode::Production),
            Arc::clone(&executor),
        )
        .await
        .unwrap();

        assert!(!report.succeeded());
        assert!(executor.saw("end images"));
        assert!(executor.saw("end scripts"));
        assert!(!executor.saw("start finish"));

        assert_matches!(
            report.outcome(StepName::Asset(AssetKind::Styles)),
            Some(StepOutcome::Failed(_))
        );
        assert_matches!(
            report.outcome(StepName::Asset(AssetKind::Images)),
            Some(StepOutcome::Succeeded)
        );
        assert_matches!(report.outcome(StepName::Finish), Some(StepOutcome::NotRun));

        let error = report.into_result(BuildMode::Production).unwrap_err();
        assert_eq!(error.failures.len(), 1);
        assert_eq!(error.failures[0].step, StepName::Asset(AssetKind::Styles));
    }

    #[tokio::test]
    async fn test_failed_clean_runs_nothing_else() {
        let executor = Arc::new(RecordingExecutor {
            failing: Some(StepName::Clean),
            ..RecordingExecutor::default()
        });

        let report = run_graph(
            &TaskGraph::for_mode(BuildMode::Development),
            Arc::clone(&executor),
        )
        .await
        .unwrap();

        assert_eq!(executor.events.lock().unwrap().len(), 2);
        assert!(report
            .outcomes()
            .iter()
            .filter(|(step, _)| *step != StepName::Clean)
            .all(|(_, outcome)| matches!(outcome, StepOutcome::NotRun)));
    }
}
