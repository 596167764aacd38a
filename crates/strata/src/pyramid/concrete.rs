use std::{cell::RefCell, collections::BTreeMap, rc::Rc};

use anyhow::Context;
use strata_image::Image;

use crate::sequence::{
    blur_sequence_and_take_derivatives, check_frame, downsample_sequence_by_2, ImageSequence,
    OwnedPinnedImage,
};

use super::{ImagePyramid, PyramidOptions, PyramidSequence};

/// A pyramid whose levels are frames pinned in per-level image sequences.
///
/// Every level stays pinned until the pyramid is dropped.
pub struct ImageSequenceBackedImagePyramid {
    levels: Vec<OwnedPinnedImage>,
}

impl ImageSequenceBackedImagePyramid {
    /// Fetches and pins frame `frame` of every level sequence.
    ///
    /// If any level fails to load, the levels pinned so far are released again.
    pub fn new(level_sequences: &[Rc<dyn ImageSequence>], frame: usize) -> anyhow::Result<Self> {
        let levels = level_sequences
            .iter()
            .enumerate()
            .map(|(level, sequence)| {
                OwnedPinnedImage::pin(Rc::clone(sequence), frame)
                    .with_context(|| format!("failed to build pyramid level {level}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { levels })
    }
}

impl ImagePyramid for ImageSequenceBackedImagePyramid {
    #[track_caller]
    fn level(&self, level: usize) -> &Image {
        &self.levels[level]
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }
}

/// A [`PyramidSequence`] with one cached, filtered image sequence per level.
///
/// Level sequences are chained: level `n + 1` is computed from the cached frames of level `n`,
/// and all of them store their frames in the source's cache. Pyramids are assembled on first
/// request and kept (with all their levels pinned) until [`ConcretePyramidSequence::release`]
/// is called or the pyramid sequence is dropped.
pub struct ConcretePyramidSequence {
    levels: Vec<Rc<dyn ImageSequence>>,
    pyramids: RefCell<BTreeMap<usize, Rc<ImageSequenceBackedImagePyramid>>>,
    len: usize,
}

impl ConcretePyramidSequence {
    pub fn new(source: Rc<dyn ImageSequence>, options: PyramidOptions) -> Self {
        let len = source.len();
        let mut levels = Vec::with_capacity(options.levels);
        let mut current = source;
        for level in 0..options.levels {
            if level > 0 {
                current = downsample_sequence_by_2(current);
            }
            current = blur_sequence_and_take_derivatives(current, options.sigma);
            levels.push(Rc::clone(&current));
        }
        log::debug!(
            "built pyramid sequence with {} levels over {len} frames",
            levels.len()
        );

        Self {
            levels,
            pyramids: RefCell::new(BTreeMap::new()),
            len,
        }
    }

    /// Returns the image sequence holding level `level` of every pyramid.
    #[track_caller]
    pub fn level_sequence(&self, level: usize) -> &Rc<dyn ImageSequence> {
        &self.levels[level]
    }

    /// Forgets the pyramid of `frame`, releasing its pins once no outside handle to it remains.
    ///
    /// Returns whether a pyramid had been built for `frame`.
    pub fn release(&self, frame: usize) -> bool {
        self.pyramids.borrow_mut().remove(&frame).is_some()
    }
}

impl PyramidSequence for ConcretePyramidSequence {
    #[track_caller]
    fn pyramid(&self, frame: usize) -> anyhow::Result<Rc<dyn ImagePyramid>> {
        check_frame(frame, self.len);

        let existing = self.pyramids.borrow().get(&frame).cloned();
        let pyramid: Rc<dyn ImagePyramid> = match existing {
            Some(pyramid) => pyramid,
            None => {
                let pyramid = Rc::new(
                    ImageSequenceBackedImagePyramid::new(&self.levels, frame)
                        .with_context(|| format!("failed to build pyramid of frame {frame}"))?,
                );
                self.pyramids
                    .borrow_mut()
                    .insert(frame, Rc::clone(&pyramid));
                pyramid
            }
        };
        Ok(pyramid)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }
}
