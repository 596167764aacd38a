use strata_image::Image;

use super::{CachedImageSequence, LoadImage, SharedImageCache};

/// Produces frames by copying images held in memory.
#[derive(Debug, Clone)]
pub struct MemoryLoader {
    frames: Vec<Image>,
}

impl LoadImage for MemoryLoader {
    fn load_image(&self, frame: usize) -> anyhow::Result<Image> {
        Ok(self.frames[frame].clone())
    }

    fn len(&self) -> usize {
        self.frames.len()
    }

    fn name(&self) -> &str {
        "in-memory sequence"
    }
}

/// A cached sequence over images that are already in memory.
///
/// Useful as the source of a pipeline fed with synthetic or externally decoded images.
pub type InMemoryImageSequence = CachedImageSequence<MemoryLoader>;

impl InMemoryImageSequence {
    pub fn new(frames: Vec<Image>, cache: SharedImageCache) -> Self {
        Self::with_cache(MemoryLoader { frames }, cache)
    }
}
