use std::io::Cursor;

use camino::{Utf8Path, Utf8PathBuf};
use image::{
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType, PngEncoder},
    },
    ColorType, ImageEncoder, ImageFormat,
};
use rayon::prelude::*;

use crate::{
    config::Config,
    diagnostics::CollectResults,
    pipeline::{BuildMode, TaskDefinition},
};

use super::{mirrored_output, read_bytes, write_output, TransformError};

const JPEG_QUALITY: u8 = 80;

pub(super) fn build(
    config: &Config,
    task: &TaskDefinition,
    inputs: &[Utf8PathBuf],
) -> Result<usize, TransformError> {
    inputs
        .par_iter()
        .map(|input| process_image(config, task, input))
        .collect::<Vec<_>>()
        .collect_results()?;

    Ok(inputs.len())
}

fn process_image(
    config: &Config,
    task: &TaskDefinition,
    input: &Utf8Path,
) -> Result<(), TransformError> {
    let original = read_bytes(&config.resolve(input))?;

    let contents = match task.mode {
        BuildMode::Development => original,
        BuildMode::Production => {
            let optimised = optimise(input, &original)?;
            match optimised {
                Some(smaller) if smaller.len() < original.len() => smaller,
                _ => original,
            }
        }
    };

    write_output(&config.resolve(&mirrored_output(task, input)), contents)
}

/// Re-encodes PNGs losslessly and JPEGs at a fixed quality.
///
/// Returns `None` for formats that are copied as they are.
fn optimise(path: &Utf8Path, original: &[u8]) -> Result<Option<Vec<u8>>, TransformError> {
    let image_error = |source| TransformError::Image {
        path: path.to_owned(),
        source,
    };

    let format = match ImageFormat::from_path(path) {
        Ok(format @ (ImageFormat::Png | ImageFormat::Jpeg)) => format,
        _ => return Ok(None),
    };

    let image = image::load_from_memory_with_format(original, format).map_err(image_error)?;
    let mut out = Cursor::new(Vec::new());

    match format {
        ImageFormat::Png => PngEncoder::new_with_quality(
            &mut out,
            CompressionType::Best,
            FilterType::Adaptive,
        )
        .write_image(
            image.as_bytes(),
            image.width(),
            image.height(),
            image.color(),
        )
        .map_err(image_error)?,
        _ => {
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY)
                .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
                .map_err(image_error)?
        }
    }

    Ok(Some(out.into_inner()))
}

#[cfg(test)]
mod tests {
    use image::{ImageBuffer, Rgb};

    use crate::{pipeline::AssetKind, test_files::TestFiles};

    use super::*;

    fn encode(format: ImageFormat) -> Vec<u8> {
        let image = ImageBuffer::from_fn(64, 64, |x, y| Rgb([(x * 4) as u8, (y * 4) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        image.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    fn run_images(test_files: &TestFiles, mode: BuildMode) -> usize {
        let config = Config::with_defaults(test_files.root());
        let task = TaskDefinition::new(&config, mode, AssetKind::Images).unwrap();
        let inputs = task.inputs.collect(&config.root);
        build(&config, &task, &inputs).unwrap()
    }

    #[test]
    fn test_development_copies_images() {
        let png = encode(ImageFormat::Png);
        let test_files = TestFiles::new()
            .with_bytes("src/img/icons/logo.png", &png)
            .with_file("src/img/shape.svg", "<svg></svg>");

        assert_eq!(run_images(&test_files, BuildMode::Development), 2);

        let copied = std::fs::read(test_files.root().join("dist/img/icons/logo.png")).unwrap();
        assert_eq!(copied, png);
        assert_eq!(test_files.read("dist/img/shape.svg"), "<svg></svg>");
    }

    #[test]
    fn test_production_never_grows_images() {
        let png = encode(ImageFormat::Png);
        let jpeg = encode(ImageFormat::Jpeg);
        let test_files = TestFiles::new()
            .with_bytes("src/img/logo.png", &png)
            .with_bytes("src/img/photo.jpg", &jpeg)
            .with_file("src/img/shape.svg", "<svg></svg>");

        run_images(&test_files, BuildMode::Production);

        let root = test_files.root();
        let png_out = std::fs::read(root.join("build/img/logo.png")).unwrap();
        let jpeg_out = std::fs::read(root.join("build/img/photo.jpg")).unwrap();
        assert!(png_out.len() <= png.len());
        assert!(jpeg_out.len() <= jpeg.len());
        assert!(image::load_from_memory(&png_out).is_ok());
        assert_eq!(test_files.read("build/img/shape.svg"), "<svg></svg>");
    }

    #[test]
    fn test_corrupt_images_fail() {
        let test_files = TestFiles::new()
            .with_bytes("src/img/a.png", b"not a png")
            .with_bytes("src/img/b.png", b"not a png either");
        let config = Config::with_defaults(test_files.root());
        let task = TaskDefinition::new(&config, BuildMode::Production, AssetKind::Images).unwrap();
        let inputs = task.inputs.collect(&config.root);

        let error = build(&config, &task, &inputs).unwrap_err();

        assert!(
            matches!(&error, TransformError::Many { errors } if errors.len() == 2),
            "{error:?}"
        );
    }
}
