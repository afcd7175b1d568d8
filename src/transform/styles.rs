use std::{borrow::Cow, collections::HashSet};

use camino::{Utf8Path, Utf8PathBuf};
use lightningcss::{
    stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet},
    targets::{Browsers, Targets},
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    config::Config,
    pipeline::{BuildMode, TaskDefinition},
};

use super::{purge, write_output, TransformError};

pub(super) const OUTPUT_FILE: &str = "style.css";

static IMPORT_RULE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^@import\s+(?:url\([^)]*\)|"[^"]*"|'[^']*')[^;]*;[ \t]*\n?"#)
        .expect("import pattern to be valid")
});

/// The browsers vendor prefixes are generated for
fn browser_targets() -> Targets {
    let version = |major: u32| Some(major << 16);
    Targets::from(Browsers {
        chrome: version(87),
        edge: version(88),
        firefox: version(78),
        safari: version(13),
        ios_saf: version(13),
        samsung: version(14),
        ..Browsers::default()
    })
}

pub(super) fn build(
    config: &Config,
    task: &TaskDefinition,
    inputs: &[Utf8PathBuf],
) -> Result<usize, TransformError> {
    let mut compiled = Vec::new();
    for input in inputs.iter().filter(|path| !is_partial(path)) {
        let path = config.resolve(input);
        let css = grass::from_path(&path, &grass::Options::default()).map_err(|e| {
            TransformError::Sass {
                path: input.clone(),
                message: e.to_string(),
            }
        })?;
        compiled.push(css);
    }

    let output = config.resolve(&task.output).join(OUTPUT_FILE);
    if compiled.is_empty() {
        write_output(&output, "")?;
        return Ok(1);
    }

    let used = match task.mode {
        BuildMode::Production => Some(purge::used_tokens(config)?),
        BuildMode::Development => None,
    };

    let css = process_css(&concat(&compiled), &task.output.join(OUTPUT_FILE), task.mode, used)?;
    write_output(&output, css)?;

    Ok(1)
}

/// Prefixes the concatenated stylesheet, and in production purges and minifies it.
///
/// `used` is the set of tokens found in content; every class outside it is dropped.
pub(super) fn process_css(
    css: &str,
    filename: &Utf8Path,
    mode: BuildMode,
    used: Option<HashSet<String>>,
) -> Result<String, TransformError> {
    let css_error = |message: String| TransformError::Css {
        path: filename.to_owned(),
        message,
    };

    let mut sheet = StyleSheet::parse(
        css,
        ParserOptions {
            filename: filename.to_string(),
            ..ParserOptions::default()
        },
    )
    .map_err(|e| css_error(e.to_string()))?;

    let unused_symbols = match &used {
        Some(used) => purge::unused_classes(&sheet, used),
        None => HashSet::new(),
    };
    tracing::debug!(count = unused_symbols.len(), "Purging unused classes");

    sheet
        .minify(MinifyOptions {
            targets: browser_targets(),
            unused_symbols,
        })
        .map_err(|e| css_error(e.to_string()))?;

    let result = sheet
        .to_css(PrinterOptions {
            minify: mode == BuildMode::Production,
            targets: browser_targets(),
            ..PrinterOptions::default()
        })
        .map_err(|e| css_error(e.to_string()))?;

    Ok(result.code)
}

/// Joins compiled sheets with `\n`.
///
/// Top level `@import` rules are only valid before any other rule, so every
/// sheet's imports are moved ahead of the first sheet's body.
fn concat(sheets: &[String]) -> String {
    let mut imports = Vec::new();
    let mut bodies = Vec::new();
    for sheet in sheets {
        imports.extend(
            IMPORT_RULE
                .find_iter(sheet)
                .map(|m| Cow::Borrowed(m.as_str().trim_end())),
        );
        bodies.push(IMPORT_RULE.replace_all(sheet, ""));
    }

    imports.into_iter().chain(bodies).collect::<Vec<_>>().join("\n")
}

fn is_partial(path: &Utf8Path) -> bool {
    path.file_name()
        .map(|name| name.starts_with('_'))
        .unwrap_or_default()
}
