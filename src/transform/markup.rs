use camino::Utf8PathBuf;

use crate::{config::Config, pipeline::TaskDefinition};

use super::{mirrored_output, read_bytes, write_output, TransformError};

pub(super) fn build(
    config: &Config,
    task: &TaskDefinition,
    inputs: &[Utf8PathBuf],
) -> Result<usize, TransformError> {
    for input in inputs {
        let contents = read_bytes(&config.resolve(input))?;
        write_output(&config.resolve(&mirrored_output(task, input)), contents)?;
    }
    Ok(inputs.len())
}

#[cfg(test)]
mod tests {
    use crate::{
        pipeline::{AssetKind, BuildMode},
        test_files::TestFiles,
    };

    use super::*;

    #[test]
    fn test_copies_html_keeping_structure() {
        let test_files = TestFiles::new()
            .with_file("src/index.html", "<h1>Home</h1>")
            .with_file("src/about/index.html", "<h1>About</h1>")
            .with_file("src/css/site.scss", ".a {}");
        let config = Config::with_defaults(test_files.root());
        let task = TaskDefinition::new(&config, BuildMode::Production, AssetKind::Markup).unwrap();
        let inputs = task.inputs.collect(&config.root);

        assert_eq!(build(&config, &task, &inputs).unwrap(), 2);

        assert_eq!(test_files.read("build/index.html"), "<h1>Home</h1>");
        assert_eq!(test_files.read("build/about/index.html"), "<h1>About</h1>");
        assert!(!test_files.root().join("build/css/site.scss").exists());
    }
}
