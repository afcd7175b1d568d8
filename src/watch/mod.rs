//! Re-running asset steps when their sources change.

use std::{sync::Arc, time::Duration};

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
    config::{Config, Glob},
    pipeline::{AssetKind, InputSet, StepExecutor, StepName, StepOutput},
    preview::Reload,
};

const DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(thiserror::Error, miette::Diagnostic, Debug)]
pub enum WatchError {
    #[error("Couldn't start watching for file changes")]
    Init(#[source] notify::Error),
    #[error("Couldn't watch {path}")]
    Path {
        path: Utf8PathBuf,
        source: notify::Error,
    },
    #[error("Invalid watch pattern")]
    Pattern(#[from] globset::Error),
    #[error("The file watcher stopped unexpectedly")]
    Stopped,
}

/// A source pattern and the steps to re-run when something matching it changes.
#[derive(Debug)]
pub struct WatchRule {
    pub inputs: InputSet,
    pub actions: Vec<AssetKind>,
}

#[derive(Debug)]
pub struct DispatchTable {
    rules: Vec<WatchRule>,
}

impl DispatchTable {
    pub fn for_config(config: &Config) -> Result<DispatchTable, WatchError> {
        let src = &config.paths.src;
        let rule = |dir: &Utf8Path, pattern: &str, actions: Vec<AssetKind>| {
            Ok::<_, globset::Error>(WatchRule {
                inputs: InputSet::new(vec![Glob::in_dir(dir, pattern)?], vec![])?,
                actions,
            })
        };

        Ok(DispatchTable {
            rules: vec![
                rule(
                    &src.base,
                    "**/*.html",
                    vec![AssetKind::Markup, AssetKind::Styles],
                )?,
                rule(&src.css, "**/*.scss", vec![AssetKind::Styles])?,
                rule(&src.js, "**/*.js", vec![AssetKind::Scripts])?,
                rule(&src.img, "**/*", vec![AssetKind::Images])?,
            ],
        })
    }

    /// The indices of every rule matching at least one of `paths`, each once.
    ///
    /// Paths are relative to the project root.
    pub fn resolve(&self, paths: &[Utf8PathBuf]) -> Vec<usize> {
        self.rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| paths.iter().any(|path| rule.inputs.matches(path)))
            .map(|(index, _)| index)
            .collect()
    }

    /// The smallest set of existing directories that covers every rule
    pub fn watch_roots(&self, root: &Utf8Path) -> Vec<Utf8PathBuf> {
        let mut dirs = self
            .rules
            .iter()
            .flat_map(|rule| rule.inputs.include())
            .map(|glob| root.join(glob.literal_prefix()))
            .filter(|dir| dir.is_dir())
            .collect::<Vec<_>>();
        dirs.sort();
        dirs.dedup();

        let mut roots: Vec<Utf8PathBuf> = Vec::new();
        for dir in dirs {
            if !roots.iter().any(|root| dir.starts_with(root)) {
                roots.push(dir);
            }
        }
        roots
    }
}

/// Runs the actions of matched rules, then triggers a reload.
pub struct Dispatcher<E, R> {
    table: Arc<DispatchTable>,
    executor: Arc<E>,
    reload: Arc<R>,
    locks: Vec<Arc<Mutex<()>>>,
}

impl<E, R> Dispatcher<E, R>
where
    E: StepExecutor,
    R: Reload,
{
    pub fn new(table: DispatchTable, executor: Arc<E>, reload: Arc<R>) -> Dispatcher<E, R> {
        Dispatcher {
            locks: table.rules.iter().map(|_| Arc::default()).collect(),
            table: Arc::new(table),
            executor,
            reload,
        }
    }

    /// Starts every rule that matches a batch of changed paths.
    ///
    /// Each handle resolves to whether its rule succeeded and sent a reload.
    pub fn dispatch(&self, paths: &[Utf8PathBuf]) -> Vec<JoinHandle<bool>> {
        self.table
            .resolve(paths)
            .into_iter()
            .map(|index| {
                let table = Arc::clone(&self.table);
                let executor = Arc::clone(&self.executor);
                let reload = Arc::clone(&self.reload);
                let lock = Arc::clone(&self.locks[index]);

                tokio::spawn(async move {
                    let _guard = lock.lock().await;
                    let rule = &table.rules[index];
                    run_rule(rule, executor.as_ref(), reload.as_ref()).await
                })
            })
            .collect()
    }
}

async fn run_rule<E, R>(rule: &WatchRule, executor: &E, reload: &R) -> bool
where
    E: StepExecutor,
    R: Reload,
{
    for kind in &rule.actions {
        let step = StepName::Asset(*kind);
        let mut output = StepOutput::standalone(step);
        if let Err(e) = executor.execute(step, &mut output).await {
            output.error(&e);
            tracing::warn!(%step, "Rebuild failed, still watching: {e}");
            return false;
        }
    }

    reload.reload().await;
    true
}

/// Watches the project sources and dispatches every debounced batch of changes.
///
/// Only returns if the watcher itself fails.
#[tracing::instrument(skip_all, fields(root = %root))]
pub async fn watch<E, R>(root: &Utf8Path, dispatcher: Dispatcher<E, R>) -> Result<(), WatchError>
where
    E: StepExecutor,
    R: Reload,
{
    let (sender, mut receiver) = tokio::sync::mpsc::unbounded_channel();
    let mut debouncer = new_debouncer(DEBOUNCE, move |result: DebounceEventResult| {
        // The receiver only goes away when we stop watching
        let _ = sender.send(result);
    })
    .map_err(WatchError::Init)?;

    for path in dispatcher.table.watch_roots(root) {
        tracing::debug!(%path, "Watching");
        debouncer
            .watcher()
            .watch(path.as_std_path(), RecursiveMode::Recursive)
            .map_err(|source| WatchError::Path { path, source })?;
    }

    while let Some(result) = receiver.recv().await {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::warn!("Watch error: {e}");
                continue;
            }
        };

        let paths = events
            .into_iter()
            .filter_map(|event| Utf8PathBuf::try_from(event.path).ok())
            .filter_map(|path| path.strip_prefix(root).map(Utf8Path::to_owned).ok())
            .collect::<Vec<_>>();
        tracing::debug!(?paths, "Files changed");

        // Rules report their own failures, so the handles aren't awaited here
        drop(dispatcher.dispatch(&paths));
    }

    Err(WatchError::Stopped)
}
