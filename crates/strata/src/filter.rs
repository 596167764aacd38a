//! Image filters used as the stages of a [`FilteredImageSequence`].
//!
//! [`FilteredImageSequence`]: crate::sequence::FilteredImageSequence

use strata_image::{convolve, Image};

/// A pure transformation from one image to another.
///
/// Filters hold only their own parameters. They never modify the source image and always
/// allocate a fresh result.
pub trait Filter {
    /// Computes the filtered version of `source`.
    fn filter(&self, source: &Image) -> Image;

    /// A short description used in log messages and errors.
    fn name(&self) -> &str {
        "filter"
    }
}

impl<F: Fn(&Image) -> Image> Filter for F {
    fn filter(&self, source: &Image) -> Image {
        self(source)
    }
}

/// Blurs the first channel with a Gaussian and computes its x and y derivatives.
///
/// Produces 3-channel images: blurred intensity, d/dx, d/dy.
#[derive(Debug, Clone, Copy)]
pub struct BlurAndDerivatives {
    sigma: f32,
}

impl BlurAndDerivatives {
    /// # Panics
    ///
    /// This method will panic if `sigma` is not positive.
    pub fn new(sigma: f32) -> Self {
        assert!(sigma > 0.0, "blur sigma must be positive, got {sigma}");
        Self { sigma }
    }

    pub fn sigma(&self) -> f32 {
        self.sigma
    }
}

impl Filter for BlurAndDerivatives {
    fn filter(&self, source: &Image) -> Image {
        convolve::blurred_image_and_derivatives_channels(source, self.sigma)
    }

    fn name(&self) -> &str {
        "blur and derivatives"
    }
}

/// Halves width and height by averaging 2x2 pixel blocks in every channel.
#[derive(Debug, Clone, Copy)]
pub struct DownsampleBy2;

impl Filter for DownsampleBy2 {
    fn filter(&self, source: &Image) -> Image {
        convolve::downsample_channels_by_2(source)
    }

    fn name(&self) -> &str {
        "downsample by 2"
    }
}

/// Blurs every channel with a Gaussian.
#[derive(Debug, Clone, Copy)]
pub struct GaussianBlur {
    sigma: f32,
}

impl GaussianBlur {
    /// # Panics
    ///
    /// This method will panic if `sigma` is not positive.
    pub fn new(sigma: f32) -> Self {
        assert!(sigma > 0.0, "blur sigma must be positive, got {sigma}");
        Self { sigma }
    }
}

impl Filter for GaussianBlur {
    fn filter(&self, source: &Image) -> Image {
        convolve::convolve_gaussian(source, self.sigma)
    }

    fn name(&self) -> &str {
        "gaussian blur"
    }
}

/// Averages every channel over a `(2 * radius + 1)` pixel square.
#[derive(Debug, Clone, Copy)]
pub struct BoxBlur {
    pub radius: usize,
}

impl Filter for BoxBlur {
    fn filter(&self, source: &Image) -> Image {
        convolve::box_filter(source, self.radius)
    }

    fn name(&self) -> &str {
        "box blur"
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn closures_are_filters() {
        let negate = |image: &Image| Image::from_array(-image.as_array());
        let out = negate.filter(&Image::filled(1, 1, 1, 2.0));
        assert_eq!(out.get(0, 0, 0), -2.0);
        assert_eq!(negate.name(), "filter");
    }

    #[test]
    fn filter_shapes() {
        let source = Image::filled(6, 4, 1, 0.5);

        let derived = BlurAndDerivatives::new(0.9).filter(&source);
        assert_eq!((derived.width(), derived.height(), derived.depth()), (6, 4, 3));

        let down = DownsampleBy2.filter(&derived);
        assert_eq!((down.width(), down.height(), down.depth()), (3, 2, 3));

        let blurred = GaussianBlur::new(2.0).filter(&source);
        let boxed = BoxBlur { radius: 2 }.filter(&source);
        for image in [&blurred, &boxed] {
            assert_eq!(image.as_array().dim(), source.as_array().dim());
            for &v in image.as_array() {
                assert_relative_eq!(v, 0.5, epsilon = 1e-6);
            }
        }
    }

    #[test]
    #[should_panic(expected = "sigma must be positive")]
    fn negative_sigma() {
        BlurAndDerivatives::new(-1.0);
    }
}
