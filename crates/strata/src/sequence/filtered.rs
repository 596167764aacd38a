use std::rc::Rc;

use strata_image::Image;

use crate::filter::{BlurAndDerivatives, DownsampleBy2, Filter};

use super::{
    shared_cache, CachedImageSequence, ImageSequence, ImageSequenceExt, LoadImage,
    SharedImageCache, DEFAULT_CACHE_BYTES,
};

/// Produces frames by running a [`Filter`] over the frames of another sequence.
pub struct FilterStage {
    source: Rc<dyn ImageSequence>,
    filter: Box<dyn Filter>,
}

impl LoadImage for FilterStage {
    fn load_image(&self, frame: usize) -> anyhow::Result<Image> {
        let source = self.source.get_float_image(frame)?;
        let filtered = self.filter.filter(&source);
        // Release the source frame before the result is stored, so it can be evicted to make
        // room for it.
        drop(source);
        Ok(filtered)
    }

    fn len(&self) -> usize {
        self.source.len()
    }

    fn name(&self) -> &str {
        self.filter.name()
    }
}

/// A sequence whose frames are the frames of a source sequence, passed through a [`Filter`].
///
/// The filtered frames are stored in the source's cache, so every stage of a filter chain
/// competes for the same memory budget. If the source has no cache, [`FilteredImageSequence::new`]
/// creates a private one of [`DEFAULT_CACHE_BYTES`]; use [`FilteredImageSequence::new_in`] to
/// put several stages over an uncached source into one cache instead.
pub type FilteredImageSequence = CachedImageSequence<FilterStage>;

impl FilteredImageSequence {
    pub fn new(source: Rc<dyn ImageSequence>, filter: impl Filter + 'static) -> Self {
        let cache = source.cache().unwrap_or_else(|| {
            log::debug!("source of {} has no cache, creating one", filter.name());
            shared_cache(DEFAULT_CACHE_BYTES)
        });
        Self::new_in(source, filter, cache)
    }

    /// Creates a filtered sequence that stores its frames in `cache`, whatever cache the source
    /// uses.
    pub fn new_in(
        source: Rc<dyn ImageSequence>,
        filter: impl Filter + 'static,
        cache: SharedImageCache,
    ) -> Self {
        Self::with_cache(
            FilterStage {
                source,
                filter: Box::new(filter),
            },
            cache,
        )
    }

    /// Returns the sequence this one pulls its frames from.
    pub fn source(&self) -> &Rc<dyn ImageSequence> {
        &self.loader().source
    }

    pub fn filter(&self) -> &dyn Filter {
        &*self.loader().filter
    }
}

/// Builds a sequence of blurred frames with x and y derivative channels.
///
/// See [`BlurAndDerivatives`].
pub fn blur_sequence_and_take_derivatives(
    source: Rc<dyn ImageSequence>,
    sigma: f32,
) -> Rc<dyn ImageSequence> {
    Rc::new(FilteredImageSequence::new(
        source,
        BlurAndDerivatives::new(sigma),
    ))
}

/// Builds a sequence of frames downsampled by a factor of 2 in each dimension.
pub fn downsample_sequence_by_2(source: Rc<dyn ImageSequence>) -> Rc<dyn ImageSequence> {
    Rc::new(FilteredImageSequence::new(source, DownsampleBy2))
}
