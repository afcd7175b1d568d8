mod file;
mod glob;
mod loader;

use camino::{Utf8Path, Utf8PathBuf};

use crate::pipeline::BuildMode;

use self::file::{ConfigFile, DirSet};
pub use self::{glob::Glob, loader::load_config_from_path};


pub const CONFIG_FILE_NAME: &str = "kiln.kdl";

/// The port used when no config file exists.
pub const DEFAULT_PORT: u16 = 3001;

/// The port used when a config file exists but doesn't set one.
pub const FALLBACK_PORT: u16 = 5000;

/// Everything a build needs to know, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path that every other path is relative to
    pub root: Utf8PathBuf,
    pub port: u16,
    pub paths: PathConfig,
    pub purge: PurgeOptions,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathConfig {
    pub src: AssetDirs,
    pub dist: AssetDirs,
    pub build: AssetDirs,
}

/// The directory for each asset type within one of the `src`, `dist` or `build` trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDirs {
    pub base: Utf8PathBuf,
    pub css: Utf8PathBuf,
    pub js: Utf8PathBuf,
    pub img: Utf8PathBuf,
}

#[derive(Debug, Clone)]
pub struct PurgeOptions {
    /// Files scanned for class names that are in use
    pub content: Vec<Glob>,
    /// Class names that are never purged
    pub safelist: Vec<String>,
}

impl Config {
    pub fn with_defaults(root: Utf8PathBuf) -> Config {
        Config {
            root,
            port: DEFAULT_PORT,
            paths: PathConfig::default(),
            purge: PurgeOptions::scanning(Utf8Path::new("src")),
        }
    }

    pub(super) fn from_file(config_dir: &Utf8Path, file: ConfigFile) -> Config {
        let root = match &file.paths.root {
            Some(root) => clean(&config_dir.join(root)),
            None => config_dir.to_owned(),
        };

        let defaults = PathConfig::default();
        let paths = PathConfig {
            src: AssetDirs::from_file(file.paths.src, defaults.src),
            dist: AssetDirs::from_file(file.paths.dist, defaults.dist),
            build: AssetDirs::from_file(file.paths.build, defaults.build),
        };

        let defaults = PurgeOptions::scanning(&paths.src.base);
        let purge = match file.purge {
            Some(purge) if purge.content.is_empty() => PurgeOptions {
                safelist: purge.safelist,
                ..defaults
            },
            Some(purge) => PurgeOptions {
                content: purge.content,
                safelist: purge.safelist,
            },
            None => defaults,
        };

        Config {
            root,
            port: file.port.unwrap_or(FALLBACK_PORT),
            paths,
            purge,
        }
    }

    /// Turns a path from the config into an absolute one
    pub fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        self.root.join(path)
    }
}

impl PathConfig {
    pub fn output(&self, mode: BuildMode) -> &AssetDirs {
        match mode {
            BuildMode::Development => &self.dist,
            BuildMode::Production => &self.build,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        PathConfig {
            src: AssetDirs::under("src"),
            dist: AssetDirs::under("dist"),
            build: AssetDirs::under("build"),
        }
    }
}

impl AssetDirs {
    fn under(base: &str) -> AssetDirs {
        let base = Utf8PathBuf::from(base);
        AssetDirs {
            css: base.join("css"),
            js: base.join("js"),
            img: base.join("img"),
            base,
        }
    }

    /// Fills in a `DirSet` from the config file.
    ///
    /// Missing subdirectories are placed under the base, which itself falls back
    /// to the default tree.
    fn from_file(dirs: Option<DirSet>, defaults: AssetDirs) -> AssetDirs {
        let Some(dirs) = dirs else {
            return defaults;
        };

        let base = dirs
            .base
            .map(|base| clean(Utf8Path::new(&base)))
            .unwrap_or(defaults.base);
        let sub = |dir: Option<String>, name: &str| match dir {
            Some(dir) => clean(Utf8Path::new(&dir)),
            None => clean(&base.join(name)),
        };

        AssetDirs {
            css: sub(dirs.css, "css"),
            js: sub(dirs.js, "js"),
            img: sub(dirs.img, "img"),
            base,
        }
    }
}

impl PurgeOptions {
    /// Scans the markup and scripts under the source tree, with nothing safelisted
    fn scanning(src_base: &Utf8Path) -> PurgeOptions {
        let content = match Glob::in_dir(src_base, "**/*.{html,js}") {
            Ok(glob) => vec![glob],
            Err(e) => {
                tracing::warn!("Can't scan {src_base} for used classes: {e}");
                Vec::new()
            }
        };

        PurgeOptions {
            content,
            safelist: Vec::new(),
        }
    }
}

fn clean(path: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(path_clean::clean(path.as_str()))
}
