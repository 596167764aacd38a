//! Numbered image sequences backed by a shared, pin-counted image cache.
//!
//! An [`ImageSequence`] hands out frames by index. Fetching a frame pins it in the sequence's
//! cache, and the caller has to release that pin again once it is done with the frame. The
//! [`ImageSequenceExt::get_float_image`] guard does this automatically; [`ImageSequence::get_image`]
//! and [`ImageSequence::unpin`] are available for pins that have to outlive a lexical scope.
//!
//! Sequences compose: a [`FilteredImageSequence`] pulls frames from another sequence, transforms
//! them and caches the result in the *same* [`ImageCache`] as its source, so one memory budget
//! bounds the whole pipeline.

mod cached;
mod file;
mod filtered;
mod memory;

use std::{
    cell::RefCell,
    fmt,
    ops::Deref,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use strata_image::Image;

use crate::cache::LruCache;

pub use cached::{CachedImageSequence, LoadImage};
pub use file::{
    FileLoader, ImageSequenceFromFiles, LazyImageSequenceFromFiles, FILE_SEQUENCE_CACHE_BYTES,
};
pub use filtered::{
    blur_sequence_and_take_derivatives, downsample_sequence_by_2, FilterStage,
    FilteredImageSequence,
};
pub use memory::{InMemoryImageSequence, MemoryLoader};

/// Default budget of caches created when none is supplied (10 MiB).
pub const DEFAULT_CACHE_BYTES: usize = 10 * 1024 * 1024;

/// Identifies one sequence for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SequenceId(u64);

impl SequenceId {
    /// Returns an ID that has not been handed out before.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Key of one frame produced by one sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    pub sequence: SequenceId,
    pub frame: usize,
}

impl CacheKey {
    #[inline]
    pub fn new(sequence: SequenceId, frame: usize) -> Self {
        Self { sequence, frame }
    }
}

/// Cache of sequence frames, sized in bytes.
pub type ImageCache = LruCache<CacheKey, Rc<Image>>;

/// An [`ImageCache`] shared between several sequences.
///
/// The cache lives as long as the longest-lived sequence referring to it.
pub type SharedImageCache = Rc<RefCell<ImageCache>>;

/// Creates an empty [`SharedImageCache`] with a budget of `max_bytes`.
pub fn shared_cache(max_bytes: usize) -> SharedImageCache {
    Rc::new(RefCell::new(ImageCache::new(max_bytes)))
}

/// A fixed-length sequence of images.
pub trait ImageSequence {
    /// Fetches frame `frame` and pins it.
    ///
    /// Every successful call has to be balanced by exactly one call to [`ImageSequence::unpin`]
    /// with the same frame index. A failed call pins nothing.
    ///
    /// # Panics
    ///
    /// Implementations panic if `frame` is not less than [`ImageSequence::len`].
    fn get_image(&self, frame: usize) -> anyhow::Result<Rc<Image>>;

    /// Releases a pin acquired by [`ImageSequence::get_image`].
    ///
    /// # Panics
    ///
    /// Implementations panic if `frame` is not pinned.
    fn unpin(&self, frame: usize);

    /// Returns the number of frames. It never changes.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cache this sequence stores its frames in, if it uses one.
    ///
    /// Sequences built on top of this one share it, so all stages of a pipeline draw from a
    /// single budget.
    fn cache(&self) -> Option<SharedImageCache>;
}

/// Scoped frame access for every [`ImageSequence`].
pub trait ImageSequenceExt: ImageSequence {
    /// Fetches frame `frame` and pins it until the returned guard is dropped.
    fn get_float_image(&self, frame: usize) -> anyhow::Result<PinnedImage<'_, Self>> {
        let image = self.get_image(frame)?;
        Ok(PinnedImage {
            sequence: self,
            frame,
            image,
        })
    }
}

impl<S: ImageSequence + ?Sized> ImageSequenceExt for S {}

/// A frame pinned in its sequence, unpinned on drop.
///
/// Returned by [`ImageSequenceExt::get_float_image`].
pub struct PinnedImage<'a, S: ImageSequence + ?Sized> {
    sequence: &'a S,
    frame: usize,
    image: Rc<Image>,
}

impl<S: ImageSequence + ?Sized> PinnedImage<'_, S> {
    #[inline]
    pub fn frame(&self) -> usize {
        self.frame
    }
}

impl<S: ImageSequence + ?Sized> Deref for PinnedImage<'_, S> {
    type Target = Image;

    fn deref(&self) -> &Image {
        &self.image
    }
}

impl<S: ImageSequence + ?Sized> Drop for PinnedImage<'_, S> {
    fn drop(&mut self) {
        self.sequence.unpin(self.frame);
    }
}

/// A frame pinned in a shared sequence, unpinned on drop.
///
/// Unlike [`PinnedImage`], this keeps its sequence alive, so it can be stored alongside it.
pub struct OwnedPinnedImage {
    sequence: Rc<dyn ImageSequence>,
    frame: usize,
    image: Rc<Image>,
}

impl OwnedPinnedImage {
    /// Fetches frame `frame` of `sequence` and pins it for the lifetime of the returned value.
    pub fn pin(sequence: Rc<dyn ImageSequence>, frame: usize) -> anyhow::Result<Self> {
        let image = sequence.get_image(frame)?;
        Ok(Self {
            sequence,
            frame,
            image,
        })
    }

    #[inline]
    pub fn frame(&self) -> usize {
        self.frame
    }
}

impl Deref for OwnedPinnedImage {
    type Target = Image;

    fn deref(&self) -> &Image {
        &self.image
    }
}

impl Drop for OwnedPinnedImage {
    fn drop(&mut self) {
        self.sequence.unpin(self.frame);
    }
}

#[track_caller]
pub(crate) fn check_frame(frame: usize, len: usize) {
    assert!(
        frame < len,
        "frame index {frame} out of range for sequence of length {len}"
    );
}
