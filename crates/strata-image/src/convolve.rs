//! Separable convolution, Gaussian derivatives and downsampling.
//!
//! Every function here samples outside the image by replicating the nearest edge pixel, so a
//! constant image stays constant under blurring and has zero derivatives everywhere.

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::Image;

/// A sampled 1D Gaussian and its first derivative.
///
/// Both kernels have odd length `2 * radius + 1` and are centered on the middle tap.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    /// Gaussian weights, normalized to sum to 1.
    pub kernel: Vec<f32>,
    /// Derivative weights, normalized so that correlating with a unit ramp yields 1.
    pub derivative: Vec<f32>,
}

impl GaussianKernel {
    #[inline]
    pub fn radius(&self) -> usize {
        self.kernel.len() / 2
    }
}

/// Samples a Gaussian of standard deviation `sigma` and its derivative.
///
/// The kernels are truncated at `ceil(3 * sigma)` taps on either side of the center.
///
/// # Panics
///
/// This function will panic if `sigma` is not positive.
pub fn gaussian_kernel(sigma: f32) -> GaussianKernel {
    assert!(sigma > 0.0, "gaussian sigma must be positive, got {sigma}");

    let radius = (3.0 * sigma).ceil().max(1.0) as isize;
    let offsets = || (-radius..=radius).map(|x| x as f32);

    let mut kernel = offsets()
        .map(|x| (-x * x / (2.0 * sigma * sigma)).exp())
        .collect::<Vec<_>>();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);

    let mut derivative = offsets()
        .zip(&kernel)
        .map(|(x, g)| x * g)
        .collect::<Vec<_>>();
    let moment: f32 = offsets().zip(&derivative).map(|(x, d)| x * d).sum();
    derivative.iter_mut().for_each(|w| *w /= moment);

    GaussianKernel { kernel, derivative }
}

/// Correlates every row of `input` with `kernel`.
///
/// The output has the same shape as the input. Tap `k` of the kernel is applied to the pixel at
/// horizontal offset `k - kernel.len() / 2`.
///
/// # Panics
///
/// This function will panic if `kernel` has even length.
pub fn convolve_horizontal(input: ArrayView2<'_, f32>, kernel: &[f32]) -> Array2<f32> {
    assert!(
        kernel.len() % 2 == 1,
        "convolution kernel must have odd length, got {}",
        kernel.len()
    );

    let radius = kernel.len() / 2;
    let (height, width) = input.dim();
    let mut output = Array2::zeros((height, width));
    if width == 0 {
        return output;
    }

    for ((y, x), out) in output.indexed_iter_mut() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(k, w)| {
                let sx = (x + k).saturating_sub(radius).min(width - 1);
                w * input[[y, sx]]
            })
            .sum();
    }
    output
}

/// Correlates every column of `input` with `kernel`.
///
/// # Panics
///
/// This function will panic if `kernel` has even length.
pub fn convolve_vertical(input: ArrayView2<'_, f32>, kernel: &[f32]) -> Array2<f32> {
    convolve_horizontal(input.t(), kernel).reversed_axes()
}

/// Averages every pixel with its `radius` horizontal neighbours on each side.
pub fn box_filter_horizontal(input: ArrayView2<'_, f32>, radius: usize) -> Array2<f32> {
    convolve_horizontal(input, &box_kernel(radius))
}

/// Averages every pixel with its `radius` vertical neighbours on each side.
pub fn box_filter_vertical(input: ArrayView2<'_, f32>, radius: usize) -> Array2<f32> {
    convolve_vertical(input, &box_kernel(radius))
}

fn box_kernel(radius: usize) -> Vec<f32> {
    let len = 2 * radius + 1;
    vec![1.0 / len as f32; len]
}

/// Blurs every channel of `image` with a Gaussian of standard deviation `sigma`.
pub fn convolve_gaussian(image: &Image, sigma: f32) -> Image {
    let gauss = gaussian_kernel(sigma);
    map_channels(image, |channel| {
        let blurred_x = convolve_horizontal(channel, &gauss.kernel);
        convolve_vertical(blurred_x.view(), &gauss.kernel)
    })
}

/// Applies a separable box filter of the given radius to every channel of `image`.
pub fn box_filter(image: &Image, radius: usize) -> Image {
    map_channels(image, |channel| {
        let filtered_x = box_filter_horizontal(channel, radius);
        box_filter_vertical(filtered_x.view(), radius)
    })
}

/// Blurs the first channel of `image` and computes its x and y derivatives.
///
/// The result has 3 channels: the blurred intensity, its derivative along x (increasing column)
/// and its derivative along y (increasing row). Any further channels of the input are ignored,
/// which makes the output of this function a valid input for itself.
///
/// # Panics
///
/// This function will panic if `image` has no channels or `sigma` is not positive.
pub fn blurred_image_and_derivatives_channels(image: &Image, sigma: f32) -> Image {
    assert!(image.depth() >= 1, "cannot blur an image without channels");

    let gauss = gaussian_kernel(sigma);
    let intensity = image.channel(0);

    let blurred_x = convolve_horizontal(intensity, &gauss.kernel);
    let blurred = convolve_vertical(blurred_x.view(), &gauss.kernel);
    let dy = convolve_vertical(blurred_x.view(), &gauss.derivative);
    let derived_x = convolve_horizontal(intensity, &gauss.derivative);
    let dx = convolve_vertical(derived_x.view(), &gauss.kernel);

    let channels = [&blurred, &dx, &dy];
    Image::from_array(Array3::from_shape_fn(
        (image.height(), image.width(), channels.len()),
        |(y, x, c)| channels[c][[y, x]],
    ))
}

/// Halves the width and height of `image` by averaging 2x2 blocks in every channel.
///
/// Odd trailing rows and columns are dropped.
pub fn downsample_channels_by_2(image: &Image) -> Image {
    let src = image.as_array();
    let dim = (image.height() / 2, image.width() / 2, image.depth());
    Image::from_array(Array3::from_shape_fn(dim, |(y, x, c)| {
        let (sy, sx) = (2 * y, 2 * x);
        0.25 * (src[[sy, sx, c]]
            + src[[sy, sx + 1, c]]
            + src[[sy + 1, sx, c]]
            + src[[sy + 1, sx + 1, c]])
    }))
}

fn map_channels(image: &Image, mut f: impl FnMut(ArrayView2<'_, f32>) -> Array2<f32>) -> Image {
    let mut output = Array3::zeros((image.height(), image.width(), image.depth()));
    for (c, mut out) in output.axis_iter_mut(Axis(2)).enumerate() {
        out.assign(&f(image.channel(c)));
    }
    Image::from_array(output)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use ndarray::array;

    use super::*;

    #[test]
    fn kernel_normalization() {
        let gauss = gaussian_kernel(0.9);
        assert_eq!(gauss.radius(), 3);
        assert_eq!(gauss.kernel.len(), 7);
        assert_eq!(gauss.derivative.len(), 7);

        assert_relative_eq!(gauss.kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(gauss.derivative.iter().sum::<f32>(), 0.0, epsilon = 1e-6);
        // Symmetric kernel, antisymmetric derivative.
        assert_eq!(gauss.kernel[0], gauss.kernel[6]);
        assert_eq!(gauss.derivative[0], -gauss.derivative[6]);
        assert!(gauss.derivative[6] > 0.0);
    }

    #[test]
    #[should_panic(expected = "sigma must be positive")]
    fn kernel_rejects_zero_sigma() {
        gaussian_kernel(0.0);
    }

    #[test]
    fn horizontal_replicates_borders() {
        let input: Array2<f32> = array![[1.0, 2.0, 3.0]];
        let output = convolve_horizontal(input.view(), &[1.0, 0.0, 0.0]);
        // Tap 0 reads the left neighbour, clamped at the left edge.
        let expected: Array2<f32> = array![[1.0, 1.0, 2.0]];
        assert_eq!(output, expected);
    }

    #[test]
    fn vertical_matches_transposed_horizontal() {
        let input: Array2<f32> = array![[1.0, 5.0], [2.0, 6.0], [3.0, 7.0]];
        let output = convolve_vertical(input.view(), &[0.0, 0.0, 1.0]);
        let expected: Array2<f32> = array![[2.0, 6.0], [3.0, 7.0], [3.0, 7.0]];
        assert_eq!(output, expected);
    }

    #[test]
    fn box_filter_averages() {
        let input: Array2<f32> = array![[0.0, 3.0, 6.0, 9.0]];
        let output = box_filter_horizontal(input.view(), 1);
        assert_relative_eq!(output[[0, 1]], 3.0, epsilon = 1e-6);
        assert_relative_eq!(output[[0, 2]], 6.0, epsilon = 1e-6);
        assert_relative_eq!(output[[0, 0]], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn derivative_of_ramp() {
        let mut image = Image::new(16, 16, 1);
        for y in 0..16 {
            for x in 0..16 {
                image.set(x, y, 0, x as f32 * 2.0 + y as f32);
            }
        }

        let out = blurred_image_and_derivatives_channels(&image, 0.9);
        assert_eq!(out.depth(), 3);
        // Away from the borders, the blurred ramp is unchanged and derivatives are exact.
        for y in 4..12 {
            for x in 4..12 {
                assert_relative_eq!(out.get(x, y, 0), image.get(x, y, 0), epsilon = 1e-3);
                assert_relative_eq!(out.get(x, y, 1), 2.0, epsilon = 1e-3);
                assert_relative_eq!(out.get(x, y, 2), 1.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn constant_image_has_no_derivatives() {
        let image = Image::filled(5, 3, 1, 4.0);
        let out = blurred_image_and_derivatives_channels(&image, 1.5);
        for y in 0..3 {
            for x in 0..5 {
                assert_relative_eq!(out.get(x, y, 0), 4.0, epsilon = 1e-5);
                assert_relative_eq!(out.get(x, y, 1), 0.0, epsilon = 1e-5);
                assert_relative_eq!(out.get(x, y, 2), 0.0, epsilon = 1e-5);
            }
        }

        let blurred = convolve_gaussian(&Image::filled(4, 4, 2, 3.0), 0.9);
        assert!(blurred.as_array().iter().all(|v| (v - 3.0).abs() < 1e-5));
    }

    #[test]
    fn downsample_averages_blocks() {
        let mut image = Image::new(5, 3, 2);
        for (i, v) in image.as_array_mut().iter_mut().enumerate() {
            *v = i as f32;
        }

        let out = downsample_channels_by_2(&image);
        assert_eq!((out.width(), out.height(), out.depth()), (2, 1, 2));
        let expected = 0.25
            * (image.get(2, 0, 1) + image.get(3, 0, 1) + image.get(2, 1, 1) + image.get(3, 1, 1));
        assert_eq!(out.get(1, 0, 1), expected);
    }

    #[test]
    fn empty_images() {
        let tiny = Image::filled(1, 1, 3, 1.0);
        let empty = downsample_channels_by_2(&tiny);
        assert_eq!((empty.width(), empty.height(), empty.depth()), (0, 0, 3));
        assert!(empty.is_empty());

        let blurred = blurred_image_and_derivatives_channels(&empty, 0.9);
        assert_eq!((blurred.width(), blurred.height(), blurred.depth()), (0, 0, 3));
        assert!(convolve_gaussian(&empty, 0.9).is_empty());
    }
}
