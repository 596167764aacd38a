use std::{
    cell::RefCell,
    collections::BTreeMap,
    path::{Path, PathBuf},
    rc::Rc,
};

use anyhow::Context;
use strata_image::Image;

use super::{
    check_frame, CachedImageSequence, ImageSequence, LoadImage, SharedImageCache,
};

/// Budget of the private cache used by [`ImageSequenceFromFiles::open`] (4 MiB).
pub const FILE_SEQUENCE_CACHE_BYTES: usize = 4 * 1024 * 1024;

/// Loads frames from a list of image files, one file per frame.
#[derive(Debug, Clone)]
pub struct FileLoader {
    paths: Vec<PathBuf>,
}

impl FileLoader {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl LoadImage for FileLoader {
    fn load_image(&self, frame: usize) -> anyhow::Result<Image> {
        Image::load(&self.paths[frame])
    }

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn name(&self) -> &str {
        "file sequence"
    }
}

/// A cached sequence of image files.
///
/// Files are read lazily, the first time their frame is requested, and read again if their frame
/// has been evicted in the meantime. See [`strata_image::Image::load`] for supported formats.
pub type ImageSequenceFromFiles = CachedImageSequence<FileLoader>;

impl ImageSequenceFromFiles {
    /// Creates a file sequence storing its frames in `cache`.
    pub fn new<I, P>(paths: I, cache: SharedImageCache) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_cache(FileLoader::new(paths), cache)
    }

    /// Creates a file sequence with a private cache of [`FILE_SEQUENCE_CACHE_BYTES`].
    pub fn open<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::with_private_cache(FileLoader::new(paths), FILE_SEQUENCE_CACHE_BYTES)
    }

    pub fn paths(&self) -> &[PathBuf] {
        self.loader().paths()
    }
}

/// An uncached sequence of image files.
///
/// A frame is read from disk when it is fetched while not pinned, and dropped as soon as its last
/// pin is released. Since nothing is cached, [`ImageSequence::cache`] returns [`None`], and every
/// [`FilteredImageSequence::new`] stage built directly on this sequence allocates a separate
/// cache with its own budget. Build such stages with [`FilteredImageSequence::new_in`] to have
/// them share one.
///
/// [`FilteredImageSequence::new`]: super::FilteredImageSequence::new
/// [`FilteredImageSequence::new_in`]: super::FilteredImageSequence::new_in
#[derive(Debug)]
pub struct LazyImageSequenceFromFiles {
    paths: Vec<PathBuf>,
    /// Currently pinned frames and their pin counts.
    pinned: RefCell<BTreeMap<usize, (Rc<Image>, usize)>>,
}

impl LazyImageSequenceFromFiles {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            pinned: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn path(&self, frame: usize) -> &Path {
        &self.paths[frame]
    }
}

impl ImageSequence for LazyImageSequenceFromFiles {
    #[track_caller]
    fn get_image(&self, frame: usize) -> anyhow::Result<Rc<Image>> {
        check_frame(frame, self.len());

        if let Some((image, pins)) = self.pinned.borrow_mut().get_mut(&frame) {
            *pins += 1;
            return Ok(Rc::clone(image));
        }

        let image = Image::load(&self.paths[frame])
            .with_context(|| format!("failed to load frame {frame} of lazy file sequence"))?;
        log::trace!("read frame {frame} from '{}'", self.paths[frame].display());

        let image = Rc::new(image);
        self.pinned
            .borrow_mut()
            .insert(frame, (Rc::clone(&image), 1));
        Ok(image)
    }

    #[track_caller]
    fn unpin(&self, frame: usize) {
        let mut pinned = self.pinned.borrow_mut();
        let Some((_, pins)) = pinned.get_mut(&frame) else {
            panic!("unpinned frame {frame}, which is not pinned");
        };
        *pins -= 1;
        if *pins == 0 {
            pinned.remove(&frame);
        }
    }

    fn len(&self) -> usize {
        self.paths.len()
    }

    fn cache(&self) -> Option<SharedImageCache> {
        None
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn write_pgm(dir: &Path, name: &str, pixels: &[u8]) -> PathBuf {
        let mut data = format!("P5\n{} 1\n255\n", pixels.len()).into_bytes();
        data.extend(pixels);
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn lazy_sequence_drops_unpinned_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_pgm(dir.path(), "a.pgm", &[255, 0]);
        let sequence = LazyImageSequenceFromFiles::new([&path]);
        assert!(sequence.cache().is_none());
        assert_eq!(sequence.path(0), path);

        let first = sequence.get_image(0).unwrap();
        let second = sequence.get_image(0).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.get(0, 0, 0), 1.0);

        sequence.unpin(0);
        sequence.unpin(0);
        assert!(sequence.pinned.borrow().is_empty());

        // The file is read again once nothing holds the frame.
        fs::remove_file(&path).unwrap();
        assert!(sequence.get_image(0).is_err());
        assert!(sequence.pinned.borrow().is_empty());
    }

    #[test]
    #[should_panic(expected = "not pinned")]
    fn lazy_sequence_unbalanced_unpin() {
        let sequence = LazyImageSequenceFromFiles::new(["missing.pgm"]);
        sequence.unpin(0);
    }

    #[test]
    fn open_uses_private_cache() {
        let sequence = ImageSequenceFromFiles::open(["x.pgm", "y.pgm"]);
        assert_eq!(sequence.len(), 2);
        assert_eq!(sequence.paths()[1], Path::new("y.pgm"));
        let cache = sequence.cache().unwrap();
        assert_eq!(
            crate::cache::Cache::max_size(&*cache.borrow()),
            FILE_SEQUENCE_CACHE_BYTES
        );
    }
}
