//! Builds image pyramids over the image files given on the command line and logs their shapes
//! together with cache statistics.

use std::{env, rc::Rc};

use strata::{
    pyramid::{
        ConcretePyramidSequence, PyramidOptions, PyramidSequence, SimpleConcretePyramidSequence,
    },
    sequence::{shared_cache, ImageSequence, ImageSequenceFromFiles, DEFAULT_CACHE_BYTES},
};

fn main() -> anyhow::Result<()> {
    strata::init_logger!();

    let paths = env::args_os().skip(1).collect::<Vec<_>>();
    if paths.is_empty() {
        anyhow::bail!("usage: pyramid_stats <image>...");
    }

    let cache = shared_cache(DEFAULT_CACHE_BYTES);
    let files = Rc::new(ImageSequenceFromFiles::new(paths, cache.clone()));
    let source: Rc<dyn ImageSequence> = files.clone();
    let options = PyramidOptions::default().levels(4);

    let eager = ConcretePyramidSequence::new(source.clone(), options);
    let simple = SimpleConcretePyramidSequence::new(source, options);

    for frame in 0..eager.len() {
        let pyramid = eager.pyramid(frame)?;
        let shapes = (0..pyramid.num_levels())
            .map(|level| {
                let image = pyramid.level(level);
                format!("{}x{}x{}", image.width(), image.height(), image.depth())
            })
            .collect::<Vec<_>>();
        log::info!("frame {frame}: {}", shapes.join(" -> "));

        simple.pyramid(frame)?;
        eager.release(frame);
    }

    log::info!("{}", files.load_timer());
    log::info!("shared cache: {:?}", cache.borrow().stats());
    log::info!("pyramid cache: {:?}", simple.cache_stats());
    Ok(())
}
