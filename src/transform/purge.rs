use std::collections::{BTreeSet, HashSet};

use lightningcss::{
    rules::{keyframes::KeyframesName, CssRule, CssRuleList},
    selector::{Component, Selector},
    stylesheet::StyleSheet,
};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::{config::Config, pipeline::InputSet};

use super::{read_to_string, TransformError};

static BROAD_TOKENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[^<>"'`\s]*[^<>"'`\s:]"#).expect("token pattern to be valid"));

static INNER_TOKENS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[^<>"'`\s.()]*[^<>"'`\s.():]"#).expect("token pattern to be valid")
});

/// Pulls every candidate class name out of some content.
pub fn extract_tokens(content: &str, tokens: &mut HashSet<String>) {
    for pattern in [&*BROAD_TOKENS, &*INNER_TOKENS] {
        tokens.extend(pattern.find_iter(content).map(|m| m.as_str().to_owned()));
    }
}

/// Scans every file matched by the purge content globs for tokens
pub(super) fn used_tokens(config: &Config) -> Result<HashSet<String>, TransformError> {
    let inputs = InputSet::new(config.purge.content.clone(), vec![])?;

    let mut tokens = config.purge.safelist.iter().cloned().collect::<HashSet<_>>();
    for path in inputs.collect(&config.root) {
        extract_tokens(&read_to_string(&config.resolve(&path))?, &mut tokens);
    }

    Ok(tokens)
}

/// Every class name that appears in a selector anywhere in the stylesheet
pub fn collect_classes(sheet: &StyleSheet) -> BTreeSet<String> {
    let mut symbols = Symbols::default();
    symbols.collect_from_rules(&sheet.rules);
    symbols.classes
}

/// The classes in the stylesheet that none of the tokens mention.
///
/// lightningcss matches unused symbols against ids and `@keyframes` names as
/// well as classes, so a class sharing a name with either is never reported.
pub fn unused_classes(sheet: &StyleSheet, tokens: &HashSet<String>) -> HashSet<String> {
    let mut symbols = Symbols::default();
    symbols.collect_from_rules(&sheet.rules);

    symbols
        .classes
        .into_iter()
        .filter(|class| !tokens.contains(class) && !symbols.other_names.contains(class))
        .collect()
}

#[derive(Default)]
struct Symbols {
    classes: BTreeSet<String>,
    /// Ids and keyframes names
    other_names: BTreeSet<String>,
}

impl Symbols {
    fn collect_from_rules(&mut self, rules: &CssRuleList) {
        for rule in &rules.0 {
            match rule {
                CssRule::Style(style) => {
                    for selector in &style.selectors.0 {
                        self.collect_from_selector(selector);
                    }
                    self.collect_from_rules(&style.rules);
                }
                CssRule::Media(media) => self.collect_from_rules(&media.rules),
                CssRule::Supports(supports) => self.collect_from_rules(&supports.rules),
                CssRule::LayerBlock(layer) => self.collect_from_rules(&layer.rules),
                CssRule::Keyframes(keyframes) => {
                    let name = match &keyframes.name {
                        KeyframesName::Ident(ident) => ident.0.to_string(),
                        KeyframesName::Custom(name) => name.to_string(),
                    };
                    self.other_names.insert(name);
                }
                _ => {}
            }
        }
    }

    fn collect_from_selector(&mut self, selector: &Selector) {
        for component in selector.iter_raw_match_order() {
            match component {
                Component::Class(name) => {
                    self.classes.insert(name.0.to_string());
                }
                Component::ID(name) => {
                    self.other_names.insert(name.0.to_string());
                }
                // :not(.x) doesn't need .x to exist, so it can't make a rule unused
                Component::Is(inner) | Component::Where(inner) => {
                    for selector in inner.iter() {
                        self.collect_from_selector(selector);
                    }
                }
                _ => {}
            }
        }
    }
}
