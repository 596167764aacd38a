use std::path::Path;

use anyhow::Context;
use image::{DynamicImage, GenericImageView};
use ndarray::Array3;

use crate::Image;

/// Enumeration of image formats supported by this library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ImageFormat {
    /// Portable anymap: PBM, PGM or PPM, ASCII or binary.
    Pnm,
    /// Portable Network Graphics.
    Png,
    /// JFIF JPEG.
    Jpeg,
}

impl ImageFormat {
    pub fn from_extension(path: &Path) -> anyhow::Result<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("pnm" | "pbm" | "pgm" | "ppm") => Ok(Self::Pnm),
            Some("png") => Ok(Self::Png),
            Some("jpg" | "jpeg") => Ok(Self::Jpeg),
            _ => anyhow::bail!(
                "invalid image path '{}' (must have one of the supported extensions)",
                path.display()
            ),
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            Self::Pnm => image::ImageFormat::Pnm,
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

/// Image decoding and loading.
impl Image {
    /// Loads an image from the filesystem.
    ///
    /// The path must have a supported file extension (`pgm`, `ppm`, `pnm`, `pbm`, `png`, `jpg`
    /// or `jpeg`). Greyscale files produce a single-channel image, everything else is converted
    /// to 3-channel RGB. Samples are normalized to `[0, 1]`.
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let format = ImageFormat::from_extension(path)?;
        let data = std::fs::read(path)
            .with_context(|| format!("failed to read image file '{}'", path.display()))?;
        let image = Self::decode(&data, format)
            .with_context(|| format!("failed to decode image file '{}'", path.display()))?;
        log::trace!(
            "loaded {}x{}x{} image from '{}'",
            image.width(),
            image.height(),
            image.depth(),
            path.display()
        );
        Ok(image)
    }

    /// Decodes an encoded image from a byte slice.
    pub fn decode(data: &[u8], format: ImageFormat) -> anyhow::Result<Self> {
        let decoded = image::load_from_memory_with_format(data, format.codec())?;
        Ok(Self::from_dynamic(&decoded))
    }

    fn from_dynamic(decoded: &DynamicImage) -> Self {
        let (width, height) = decoded.dimensions();
        let (width, height) = (width as usize, height as usize);
        // 16-bit conversion covers both 8-bit and 16-bit sources without losing precision.
        if decoded.color().has_color() {
            from_samples(width, height, 3, decoded.to_rgb16().as_raw())
        } else {
            from_samples(width, height, 1, decoded.to_luma16().as_raw())
        }
    }
}

fn from_samples(width: usize, height: usize, depth: usize, samples: &[u16]) -> Image {
    assert_eq!(
        samples.len(),
        width * height * depth,
        "incorrect buffer size {} for {width}x{height}x{depth} image",
        samples.len(),
    );

    let max = f32::from(u16::MAX);
    Image::from_array(Array3::from_shape_fn((height, width, depth), |(y, x, c)| {
        f32::from(samples[(y * width + x) * depth + c]) / max
    }))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            ImageFormat::from_extension(Path::new("a/frame.pgm")).unwrap(),
            ImageFormat::Pnm
        );
        assert_eq!(
            ImageFormat::from_extension(Path::new("frame.jpeg")).unwrap(),
            ImageFormat::Jpeg
        );
        assert!(ImageFormat::from_extension(Path::new("frame.tiff")).is_err());
        assert!(ImageFormat::from_extension(Path::new("frame")).is_err());
    }

    #[test]
    fn decode_binary_pgm() {
        let mut pgm = b"P5\n2 1\n255\n".to_vec();
        pgm.extend([255, 0]);

        let image = Image::decode(&pgm, ImageFormat::Pnm).unwrap();
        assert_eq!((image.width(), image.height(), image.depth()), (2, 1, 1));
        assert_eq!(image.get(0, 0, 0), 1.0);
        assert_eq!(image.get(1, 0, 0), 0.0);
    }

    #[test]
    fn decode_binary_ppm() {
        let mut ppm = b"P6\n1 1\n255\n".to_vec();
        ppm.extend([255, 0, 255]);

        let image = Image::decode(&ppm, ImageFormat::Pnm).unwrap();
        assert_eq!(image.depth(), 3);
        assert_eq!(image.get(0, 0, 0), 1.0);
        assert_eq!(image.get(0, 0, 1), 0.0);
        assert_eq!(image.get(0, 0, 2), 1.0);
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Image::load(dir.path().join("missing.pgm")).unwrap_err();
        assert!(err.to_string().contains("missing.pgm"), "{err}");
    }

    #[test]
    fn load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pgm");
        fs::write(&path, b"not an image").unwrap();
        assert!(Image::load(&path).is_err());
    }
}
