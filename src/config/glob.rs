use camino::{Utf8Path, Utf8PathBuf};
use knuffel::{
    ast::Literal, decode::Kind, errors::DecodeError, span::Spanned, traits::ErrorSpan, DecodeScalar,
};

/// A path pattern relative to the project root.
///
/// `*` never crosses a `/`; use `**` for that.
#[derive(Debug, Clone)]
pub struct Glob(globset::Glob);

impl Glob {
    pub fn new(pattern: &str) -> Result<Glob, globset::Error> {
        globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map(Glob)
    }

    /// Builds a pattern for `suffix` underneath `dir`
    pub fn in_dir(dir: &Utf8Path, suffix: &str) -> Result<Glob, globset::Error> {
        if dir.as_str().is_empty() || dir.as_str() == "." {
            return Glob::new(suffix);
        }
        Glob::new(&format!("{}/{suffix}", dir.as_str().trim_end_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        self.0.glob()
    }

    /// The leading directories of the pattern that contain no wildcards.
    ///
    /// Anything the pattern can match lives underneath this directory.
    pub fn literal_prefix(&self) -> Utf8PathBuf {
        let mut prefix = Utf8PathBuf::new();
        let mut components = self.as_str().split('/').peekable();
        while let Some(component) = components.next() {
            if components.peek().is_none() || component.contains(['*', '?', '[', '{']) {
                break;
            }
            prefix.push(component);
        }
        prefix
    }

    pub fn compile_matcher(&self) -> globset::GlobMatcher {
        self.0.compile_matcher()
    }

    pub fn into_inner(self) -> globset::Glob {
        self.0
    }
}

impl std::fmt::Display for Glob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<S> DecodeScalar<S> for Glob
where
    S: ErrorSpan,
{
    fn type_check(
        _type_name: &Option<knuffel::span::Spanned<knuffel::ast::TypeName, S>>,
        _ctx: &mut knuffel::decode::Context<S>,
    ) {
        // Not bothering with types for now...
    }

    fn raw_decode(
        value: &Spanned<Literal, S>,
        _ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let Literal::String(s) = &**value else {
            let found = match **value {
                Literal::Null => Kind::Null,
                Literal::Bool(_) => Kind::Bool,
                Literal::Int(_) => Kind::Int,
                Literal::Decimal(_) => Kind::Decimal,
                Literal::String(_) => unreachable!("strings are handled above"),
            };
            return Err(DecodeError::ScalarKind {
                span: value.span().to_owned(),
                expected: Kind::String.into(),
                found,
            });
        };

        Glob::new(s.as_ref()).map_err(|error| DecodeError::Conversion {
            span: value.span().to_owned(),
            source: Box::new(error),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[derive(knuffel::Decode, Debug)]
    pub struct TestStruct {
        #[knuffel(children(name = "content"), unwrap(argument))]
        pub content: Vec<Glob>,
    }

    #[test]
    fn test_decoding_globs() {
        let result = knuffel::parse::<TestStruct>(
            "kiln.kdl",
            r#"
        content "src/**/*.{html,js}"
        content "**"
        content "a_file.txt"
        "#,
        )
        .unwrap();

        let patterns = result
            .content
            .iter()
            .map(Glob::as_str)
            .collect::<Vec<_>>();
        assert_eq!(patterns, vec!["src/**/*.{html,js}", "**", "a_file.txt"]);
    }

    #[test]
    fn test_decoding_a_malformed_glob() {
        let result = knuffel::parse::<TestStruct>("kiln.kdl", r#"content "src/{html""#);

        assert!(result.is_err());
    }

    #[rstest]
    #[case("src/**/*.{html,js}", "src")]
    #[case("src/css/**/*.scss", "src/css")]
    #[case("**/*.html", "")]
    #[case("index.html", "")]
    #[case("src/js/libs/**/*.js", "src/js/libs")]
    fn test_literal_prefix(#[case] pattern: &str, #[case] expected: &str) {
        assert_eq!(Glob::new(pattern).unwrap().literal_prefix().as_str(), expected);
    }

    #[test]
    fn test_star_does_not_cross_directories() {
        let matcher = Glob::new("src/js/*.js").unwrap().compile_matcher();

        assert!(matcher.is_match("src/js/app.js"));
        assert!(!matcher.is_match("src/js/libs/lib.js"));
    }

    #[test]
    fn test_in_dir_with_the_root() {
        assert_eq!(
            Glob::in_dir(Utf8Path::new("."), "**/*.html").unwrap().as_str(),
            "**/*.html"
        );
        assert_eq!(
            Glob::in_dir(Utf8Path::new("src/"), "**/*.html")
                .unwrap()
                .as_str(),
            "src/**/*.html"
        );
    }
}
