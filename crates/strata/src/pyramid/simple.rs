use std::{cell::RefCell, rc::Rc};

use anyhow::Context;

use crate::{
    cache::{Cache, CacheStats, LruCache},
    sequence::{check_frame, ImageSequence, ImageSequenceExt, DEFAULT_CACHE_BYTES},
};

use super::{ConcreteImagePyramid, ImagePyramid, PyramidOptions, PyramidSequence};

/// A [`PyramidSequence`] that computes each pyramid in one go from its source frame.
///
/// Whole pyramids are cached by frame index in a cache of their own, separate from the source's.
/// A returned pyramid stays valid for as long as the caller holds on to it, but its cache entry
/// is unpinned immediately, so the next request for the same frame may have to recompute it.
pub struct SimpleConcretePyramidSequence {
    source: Rc<dyn ImageSequence>,
    options: PyramidOptions,
    cache: RefCell<LruCache<usize, Rc<ConcreteImagePyramid>>>,
}

impl SimpleConcretePyramidSequence {
    /// Creates a pyramid sequence caching up to [`DEFAULT_CACHE_BYTES`] of pyramids.
    pub fn new(source: Rc<dyn ImageSequence>, options: PyramidOptions) -> Self {
        Self::with_budget(source, options, DEFAULT_CACHE_BYTES)
    }

    /// Creates a pyramid sequence caching up to `max_bytes` of pyramids.
    pub fn with_budget(
        source: Rc<dyn ImageSequence>,
        options: PyramidOptions,
        max_bytes: usize,
    ) -> Self {
        log::debug!(
            "built simple pyramid sequence with {} levels over {} frames",
            options.levels,
            source.len()
        );
        Self {
            source,
            options,
            cache: RefCell::new(LruCache::new(max_bytes)),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.borrow().stats()
    }
}

impl PyramidSequence for SimpleConcretePyramidSequence {
    #[track_caller]
    fn pyramid(&self, frame: usize) -> anyhow::Result<Rc<dyn ImagePyramid>> {
        check_frame(frame, self.len());

        let hit = self.cache.borrow_mut().fetch_and_pin(&frame).cloned();
        let pyramid: Rc<dyn ImagePyramid> = match hit {
            Some(pyramid) => pyramid,
            None => {
                let source = self
                    .source
                    .get_float_image(frame)
                    .with_context(|| format!("failed to build pyramid of frame {frame}"))?;
                let pyramid = Rc::new(ConcreteImagePyramid::new(&source, self.options));
                drop(source);

                let size = pyramid.memory_size();
                log::trace!("computed pyramid of frame {frame} ({size} bytes)");
                self.cache
                    .borrow_mut()
                    .store_and_pin_sized(frame, Rc::clone(&pyramid), size);
                pyramid
            }
        };
        self.cache.borrow_mut().unpin(&frame);
        Ok(pyramid)
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    fn num_levels(&self) -> usize {
        self.options.levels
    }
}
