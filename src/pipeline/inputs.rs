use std::collections::HashSet;

use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

use crate::config::Glob;

/// An ordered set of include patterns with exclusions.
///
/// Files are produced in the order of the first include pattern that matches
/// them, sorted by path within each pattern.
#[derive(Debug, Clone)]
pub struct InputSet {
    include: Vec<Glob>,
    exclude: Vec<Glob>,
    matchers: Vec<globset::GlobMatcher>,
    exclusions: GlobSet,
}

impl InputSet {
    pub fn new(include: Vec<Glob>, exclude: Vec<Glob>) -> Result<InputSet, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for glob in &exclude {
            builder.add(glob.clone().into_inner());
        }

        Ok(InputSet {
            matchers: include.iter().map(Glob::compile_matcher).collect(),
            exclusions: builder.build()?,
            include,
            exclude,
        })
    }

    pub fn include(&self) -> &[Glob] {
        &self.include
    }

    pub fn exclude(&self) -> &[Glob] {
        &self.exclude
    }

    /// Checks a path relative to the project root against the set
    pub fn matches(&self, path: &Utf8Path) -> bool {
        !self.exclusions.is_match(path) && self.matchers.iter().any(|m| m.is_match(path))
    }

    /// Finds every file under `root` in the set, as paths relative to `root`.
    ///
    /// Patterns that match nothing (or point at missing directories) simply
    /// contribute no files.
    pub fn collect(&self, root: &Utf8Path) -> Vec<Utf8PathBuf> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for (glob, matcher) in self.include.iter().zip(&self.matchers) {
            let walk_root = root.join(glob.literal_prefix());
            if !walk_root.is_dir() {
                continue;
            }

            let mut matched = WalkBuilder::new(&walk_root)
                .hidden(false)
                .build()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or_default())
                .filter_map(|entry| {
                    let path = Utf8PathBuf::try_from(entry.into_path())
                        .map_err(|e| tracing::warn!("Skipping non UTF-8 path: {e}"))
                        .ok()?;
                    path.strip_prefix(root).map(Utf8Path::to_owned).ok()
                })
                .filter(|path| matcher.is_match(path) && !self.exclusions.is_match(path))
                .filter(|path| !seen.contains(path))
                .collect::<Vec<_>>();

            matched.sort();
            seen.extend(matched.iter().cloned());
            files.extend(matched);
        }

        files
    }
}
