//! Floating-point images and the filter kernels the strata pipeline is built from.
//!
//! # Overview
//!
//! ## Images
//!
//! [`Image`] is an owned `height x width x depth` array of `f32` samples, backed by
//! [`ndarray::Array3`]. Single-channel images hold intensities, while derived images (such as
//! the output of [`convolve::blurred_image_and_derivatives_channels`]) carry one channel per
//! quantity. Images loaded from disk are normalized to the range `[0, 1]`.
//!
//! ## Kernels
//!
//! The [`convolve`] module contains the separable filters used to build image pyramids:
//! Gaussian blurs and their derivatives, box filters, and 2x downsampling. All of them are pure
//! functions that allocate a fresh output and never modify their input.

pub mod convolve;

mod decode;
mod image;

pub use decode::ImageFormat;
pub use image::*;
