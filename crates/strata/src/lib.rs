//! Cached image sequences, filter chains and image pyramids for structure-from-motion.
//!
//! # Overview
//!
//! Tracking and matching algorithms look at the same frames many times, at several scales. This
//! crate produces those frames lazily and keeps a bounded amount of them in memory:
//!
//! - [`cache`] provides pin-counted caches with a size budget. A pinned entry is never evicted;
//!   unpinned entries are evicted least-recently-unpinned first.
//! - [`sequence`] provides [`ImageSequence`][sequence::ImageSequence]s: numbered frames that are
//!   loaded on demand (from files, from memory, or by filtering another sequence) and cached in
//!   an [`ImageCache`][sequence::ImageCache] that all stages of a pipeline share.
//! - [`filter`] provides the image transformations used as pipeline stages.
//! - [`pyramid`] builds multi-scale Gaussian pyramids over a sequence.
//!
//! Everything in this crate is single-threaded: sequences and caches are shared through [`Rc`]
//! and [`RefCell`].
//!
//! # Environment Variables
//!
//! * `RUST_LOG`: Overrides the log filter installed by [`init_logger!`].
//!
//! [`Rc`]: std::rc::Rc
//! [`RefCell`]: std::cell::RefCell

use log::LevelFilter;

pub mod cache;
pub mod filter;
pub mod pyramid;
pub mod sequence;
pub mod timer;

pub use strata_image as image;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and strata will log at *trace* level.
/// Otherwise, they will log at *debug* level. `RUST_LOG` takes precedence over both.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
