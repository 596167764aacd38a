//! Multi-scale Gaussian image pyramids over image sequences.
//!
//! Level 0 of a pyramid is the blurred base image with x and y derivative channels (see
//! [`BlurAndDerivatives`][crate::filter::BlurAndDerivatives]). Every further level is the
//! previous level downsampled by 2, then blurred and differentiated again with the same sigma.
//!
//! Two [`PyramidSequence`] implementations are provided:
//!
//! - [`ConcretePyramidSequence`] builds one filtered sequence per level, so every level is cached
//!   and shared through the source's [`ImageCache`][crate::sequence::ImageCache].
//! - [`SimpleConcretePyramidSequence`] computes whole pyramids in one go and keeps them in a
//!   separate cache of its own.

mod concrete;
mod simple;

use std::{mem, rc::Rc};

use strata_image::{convolve, Image};

pub use concrete::{ConcretePyramidSequence, ImageSequenceBackedImagePyramid};
pub use simple::SimpleConcretePyramidSequence;

/// An ordered list of progressively smaller images.
pub trait ImagePyramid {
    /// Returns level `level`, where level 0 has the highest resolution.
    ///
    /// # Panics
    ///
    /// Implementations panic if `level` is not less than [`ImagePyramid::num_levels`].
    fn level(&self, level: usize) -> &Image;

    fn num_levels(&self) -> usize;
}

/// A sequence of [`ImagePyramid`]s, one per frame of an image sequence.
pub trait PyramidSequence {
    /// Returns the pyramid of frame `frame`, computing it if necessary.
    ///
    /// Errors loading the source frame are propagated.
    ///
    /// # Panics
    ///
    /// Implementations panic if `frame` is not less than [`PyramidSequence::len`].
    fn pyramid(&self, frame: usize) -> anyhow::Result<Rc<dyn ImagePyramid>>;

    /// Returns the number of frames.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of levels of every pyramid in this sequence.
    fn num_levels(&self) -> usize;
}

/// Pyramid construction parameters.
#[derive(Debug, Clone, Copy)]
pub struct PyramidOptions {
    levels: usize,
    sigma: f32,
}

impl Default for PyramidOptions {
    fn default() -> Self {
        Self {
            levels: 3,
            sigma: 0.9,
        }
    }
}

impl PyramidOptions {
    /// Sets the number of pyramid levels.
    ///
    /// # Panics
    ///
    /// This method will panic if `levels` is 0.
    #[inline]
    pub fn levels(mut self, levels: usize) -> Self {
        assert!(levels > 0, "a pyramid needs at least one level");
        self.levels = levels;
        self
    }

    /// Sets the standard deviation of the Gaussian applied at every level.
    ///
    /// # Panics
    ///
    /// This method will panic if `sigma` is not positive.
    #[inline]
    pub fn sigma(mut self, sigma: f32) -> Self {
        assert!(sigma > 0.0, "blur sigma must be positive, got {sigma}");
        self.sigma = sigma;
        self
    }

    #[inline]
    pub fn num_levels(&self) -> usize {
        self.levels
    }

    #[inline]
    pub fn blur_sigma(&self) -> f32 {
        self.sigma
    }
}

/// An [`ImagePyramid`] that owns its levels.
#[derive(Debug, Clone)]
pub struct ConcreteImagePyramid {
    levels: Vec<Image>,
}

impl ConcreteImagePyramid {
    /// Computes the pyramid of `image`.
    pub fn new(image: &Image, options: PyramidOptions) -> Self {
        let mut levels = Vec::with_capacity(options.levels);
        levels.push(convolve::blurred_image_and_derivatives_channels(
            image,
            options.sigma,
        ));
        for level in 1..options.levels {
            let downsampled = convolve::downsample_channels_by_2(&levels[level - 1]);
            levels.push(convolve::blurred_image_and_derivatives_channels(
                &downsampled,
                options.sigma,
            ));
        }
        Self { levels }
    }

    /// Returns the number of bytes occupied by all levels.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>() + self.levels.iter().map(Image::memory_size).sum::<usize>()
    }
}

impl ImagePyramid for ConcreteImagePyramid {
    #[track_caller]
    fn level(&self, level: usize) -> &Image {
        &self.levels[level]
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn constant_image_pyramid() {
        let image = Image::filled(13, 8, 1, 0.25);
        let pyramid = ConcreteImagePyramid::new(&image, PyramidOptions::default().levels(4));
        assert_eq!(pyramid.num_levels(), 4);

        let sizes = (0..4)
            .map(|i| (pyramid.level(i).width(), pyramid.level(i).height()))
            .collect::<Vec<_>>();
        assert_eq!(sizes, [(13, 8), (6, 4), (3, 2), (1, 1)]);

        for i in 0..4 {
            let level = pyramid.level(i);
            assert_eq!(level.depth(), 3);
            for y in 0..level.height() {
                for x in 0..level.width() {
                    assert_relative_eq!(level.get(x, y, 0), 0.25, epsilon = 1e-5);
                    assert_relative_eq!(level.get(x, y, 1), 0.0, epsilon = 1e-5);
                    assert_relative_eq!(level.get(x, y, 2), 0.0, epsilon = 1e-5);
                }
            }
        }
    }

    #[test]
    fn memory_size_covers_levels() {
        let pyramid = ConcreteImagePyramid::new(&Image::new(8, 8, 1), PyramidOptions::default());
        let samples = (64 + 16 + 4) * 3;
        assert!(pyramid.memory_size() >= samples * mem::size_of::<f32>());
    }

    #[test]
    #[should_panic(expected = "at least one level")]
    fn zero_levels() {
        PyramidOptions::default().levels(0);
    }
}
