use camino::Utf8PathBuf;

use super::{file::parse_config_file, Config, CONFIG_FILE_NAME};

#[derive(Debug, miette::Diagnostic, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("Couldn't resolve the current directory {0}")]
    CurrentDirectory(Utf8PathBuf, #[source] std::io::Error),
    #[error("Couldn't read {0}")]
    #[diagnostic(help("make sure kiln.kdl is readable"))]
    Read(Utf8PathBuf, #[source] std::io::Error),
}

/// Loads the config for a build run from `current_path`.
///
/// The nearest `kiln.kdl` in `current_path` or one of its parents is used.
/// Without one, the defaults apply with `current_path` as the root.
pub fn load_config_from_path(current_path: Utf8PathBuf) -> Result<Config, miette::Report> {
    let current_path = current_path
        .canonicalize_utf8()
        .map_err(|e| ConfigLoadError::CurrentDirectory(current_path, e))?;

    let Some(config_path) = find_config_file(current_path.clone()) else {
        tracing::debug!(root = %current_path, "No {CONFIG_FILE_NAME} found, using defaults");
        return Ok(Config::with_defaults(current_path));
    };

    tracing::debug!(path = %config_path, "Loading config");

    let text = std::fs::read_to_string(&config_path)
        .map_err(|e| ConfigLoadError::Read(config_path.clone(), e))?;

    let file = parse_config_file(config_path.as_str(), &text).map_err(miette::Report::new)?;

    let config_dir = config_path.parent().unwrap_or(&current_path);

    Ok(Config::from_file(config_dir, file))
}

fn find_config_file(mut current_path: Utf8PathBuf) -> Option<Utf8PathBuf> {
    loop {
        current_path.push(CONFIG_FILE_NAME);
        if current_path.is_file() {
            return Some(current_path);
        }
        current_path.pop();
        if !current_path.pop() {
            return None;
        }
    }
}
