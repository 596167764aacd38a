use std::rc::Rc;

use anyhow::Context;
use strata_image::Image;

use crate::{cache::Cache, timer::Timer};

use super::{check_frame, shared_cache, CacheKey, ImageSequence, SequenceId, SharedImageCache};

/// Produces the frames of a [`CachedImageSequence`].
pub trait LoadImage {
    /// Produces frame `frame`.
    ///
    /// This is only called on a cache miss. Implementations may fetch frames from other
    /// sequences sharing the same cache.
    fn load_image(&self, frame: usize) -> anyhow::Result<Image>;

    /// Returns the number of frames this loader can produce.
    fn len(&self) -> usize;

    /// A short description used in log messages and errors.
    fn name(&self) -> &str;
}

/// An [`ImageSequence`] that caches the frames produced by a [`LoadImage`] implementation.
///
/// Frames are stored in a [`SharedImageCache`] under a key made of this sequence's
/// [`SequenceId`] and the frame index, sized by [`Image::memory_size`].
pub struct CachedImageSequence<L> {
    id: SequenceId,
    loader: L,
    cache: SharedImageCache,
    load_timer: Timer,
}

impl<L: LoadImage> CachedImageSequence<L> {
    /// Creates a sequence that stores its frames in an existing, possibly shared, cache.
    pub fn with_cache(loader: L, cache: SharedImageCache) -> Self {
        let id = SequenceId::next();
        log::debug!(
            "created {} {id} with {} frames",
            loader.name(),
            loader.len()
        );
        Self {
            id,
            loader,
            cache,
            load_timer: Timer::new("load"),
        }
    }

    /// Creates a sequence with its own cache holding up to `max_bytes` of frames.
    pub fn with_private_cache(loader: L, max_bytes: usize) -> Self {
        Self::with_cache(loader, shared_cache(max_bytes))
    }

    #[inline]
    pub fn id(&self) -> SequenceId {
        self.id
    }

    #[inline]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Returns the timer measuring calls to [`LoadImage::load_image`].
    #[inline]
    pub fn load_timer(&self) -> &Timer {
        &self.load_timer
    }

    fn key(&self, frame: usize) -> CacheKey {
        CacheKey::new(self.id, frame)
    }
}

impl<L: LoadImage> ImageSequence for CachedImageSequence<L> {
    #[track_caller]
    fn get_image(&self, frame: usize) -> anyhow::Result<Rc<Image>> {
        check_frame(frame, self.len());
        let key = self.key(frame);

        // The cache must not stay borrowed while loading, since the loader may recurse into it.
        let hit = self.cache.borrow_mut().fetch_and_pin(&key).cloned();
        if let Some(image) = hit {
            log::trace!("cache hit: frame {frame} of {} {}", self.loader.name(), self.id);
            return Ok(image);
        }

        let image = self
            .load_timer
            .time(|| self.loader.load_image(frame))
            .with_context(|| {
                format!(
                    "failed to load frame {frame} of {} {}",
                    self.loader.name(),
                    self.id
                )
            })?;
        let size = image.memory_size();
        log::trace!(
            "cache miss: loaded frame {frame} of {} {} ({size} bytes)",
            self.loader.name(),
            self.id
        );

        let image = Rc::new(image);
        self.cache
            .borrow_mut()
            .store_and_pin_sized(key, Rc::clone(&image), size);
        Ok(image)
    }

    #[track_caller]
    fn unpin(&self, frame: usize) {
        self.cache.borrow_mut().unpin(&self.key(frame));
    }

    fn len(&self) -> usize {
        self.loader.len()
    }

    fn cache(&self) -> Option<SharedImageCache> {
        Some(Rc::clone(&self.cache))
    }
}
