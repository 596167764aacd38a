use std::mem;

use ndarray::{Array3, ArrayView2, ArrayViewMut2, Axis};

/// A multi-channel floating-point image.
///
/// Samples are stored in a `height x width x depth` array, so `get(x, y, c)` addresses row `y`,
/// column `x` and channel `c`.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array3<f32>,
}

impl Image {
    /// Creates an [`Image`] of the given dimensions with every sample set to zero.
    pub fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            data: Array3::zeros((height, width, depth)),
        }
    }

    /// Returns a new [`Image`] of the given dimensions, with every sample initialized to `value`.
    pub fn filled(width: usize, height: usize, depth: usize, value: f32) -> Self {
        Self {
            data: Array3::from_elem((height, width, depth), value),
        }
    }

    /// Wraps an existing `height x width x depth` array.
    pub fn from_array(data: Array3<f32>) -> Self {
        Self { data }
    }

    /// Returns the width of this image, in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// Returns the height of this image, in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Returns the number of channels per pixel.
    #[inline]
    pub fn depth(&self) -> usize {
        self.data.dim().2
    }

    /// Returns `true` if this image contains no samples.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Gets the sample at the given pixel coordinates and channel.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y, channel)` is outside the bounds of this image.
    #[inline]
    #[track_caller]
    pub fn get(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.data[[y, x, channel]]
    }

    /// Sets the sample at the given pixel coordinates and channel.
    ///
    /// # Panics
    ///
    /// This will panic if `(x, y, channel)` is outside the bounds of this image.
    #[inline]
    #[track_caller]
    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        self.data[[y, x, channel]] = value;
    }

    /// Sets every sample in the image to `value`.
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Changes the dimensions of this image.
    ///
    /// If the dimensions differ from the current ones, the image is reallocated and zeroed.
    /// Otherwise its contents are left untouched.
    pub fn resize(&mut self, width: usize, height: usize, depth: usize) {
        if self.data.dim() != (height, width, depth) {
            self.data = Array3::zeros((height, width, depth));
        }
    }

    /// Returns a 2D `height x width` view of one channel.
    #[track_caller]
    pub fn channel(&self, channel: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(2), channel)
    }

    /// Returns a mutable 2D `height x width` view of one channel.
    #[track_caller]
    pub fn channel_mut(&mut self, channel: usize) -> ArrayViewMut2<'_, f32> {
        self.data.index_axis_mut(Axis(2), channel)
    }

    /// Returns the number of bytes this image occupies in memory, including its header.
    ///
    /// This is the size reported to caches holding the image.
    pub fn memory_size(&self) -> usize {
        mem::size_of::<Self>() + self.data.len() * mem::size_of::<f32>()
    }

    #[inline]
    pub fn as_array(&self) -> &Array3<f32> {
        &self.data
    }

    #[inline]
    pub fn as_array_mut(&mut self) -> &mut Array3<f32> {
        &mut self.data
    }

    pub fn into_array(self) -> Array3<f32> {
        self.data
    }
}

impl From<Array3<f32>> for Image {
    fn from(data: Array3<f32>) -> Self {
        Self::from_array(data)
    }
}
