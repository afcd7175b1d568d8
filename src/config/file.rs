//! The raw shape of a `kiln.kdl` file, before defaults are applied.

use super::Glob;

#[derive(knuffel::Decode, Debug, Default)]
pub struct ConfigFile {
    #[knuffel(child, unwrap(argument))]
    pub port: Option<u16>,

    #[knuffel(child, default)]
    pub paths: PathsBlock,

    #[knuffel(child)]
    pub purge: Option<PurgeBlock>,
}

#[derive(knuffel::Decode, Debug, Default)]
pub struct PathsBlock {
    #[knuffel(child, unwrap(argument))]
    pub root: Option<String>,

    #[knuffel(child)]
    pub src: Option<DirSet>,

    #[knuffel(child)]
    pub dist: Option<DirSet>,

    #[knuffel(child)]
    pub build: Option<DirSet>,
}

/// One of the `src`, `dist` or `build` nodes.
#[derive(knuffel::Decode, Debug, Default)]
pub struct DirSet {
    #[knuffel(property)]
    pub base: Option<String>,

    #[knuffel(property)]
    pub css: Option<String>,

    #[knuffel(property)]
    pub js: Option<String>,

    #[knuffel(property)]
    pub img: Option<String>,
}

#[derive(knuffel::Decode, Debug, Default)]
pub struct PurgeBlock {
    #[knuffel(children(name = "content"), unwrap(argument))]
    pub content: Vec<Glob>,

    #[knuffel(children(name = "safelist"), unwrap(argument))]
    pub safelist: Vec<String>,
}

pub fn parse_config_file(filename: &str, text: &str) -> Result<ConfigFile, knuffel::Error> {
    knuffel::parse::<ConfigFile>(filename, text)
}
