use rand::Rng;

use crate::error::{Error, Result};

/// Promotion threshold for a fresh 16-bit draw, i.e. P = 0.25.
const P_THRESHOLD: u16 = (0.25 * 0xFFFF as f64) as u16;

/// Where new node levels come from: the built-in geometric draw, or a
/// user-supplied hook called with the maximum level.
pub(crate) enum LevelSource {
    Geometric,
    Custom(Box<dyn FnMut(usize) -> i64>),
}

impl LevelSource {
    /// Returns a level in [1, maxlevel]. A custom hook result outside that
    /// range fails validation; the caller must not have mutated anything yet.
    pub(crate) fn draw(&mut self, maxlevel: usize) -> Result<usize> {
        match self {
            LevelSource::Geometric => Ok(random_level(maxlevel)),
            LevelSource::Custom(f) => {
                let given = f(maxlevel);
                if given < 1 || given > maxlevel as i64 {
                    return Err(Error::BadLevel { given, maxlevel });
                }
                Ok(given as usize)
            }
        }
    }
}

/// The probability of stepping upward is 1/4.
pub(crate) fn random_level(maxlevel: usize) -> usize {
    let mut rand_gen = rand::thread_rng();
    let mut level = 1;
    while level < maxlevel && rand_gen.gen::<u16>() < P_THRESHOLD {
        level += 1;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_level_bounds_test() {
        for _ in 0..10_000 {
            let level = random_level(32);
            assert!((1..=32).contains(&level));
        }
        for _ in 0..100 {
            assert_eq!(random_level(1), 1);
        }
    }

    #[test]
    fn custom_source_test() {
        let mut src = LevelSource::Custom(Box::new(|maxlevel| maxlevel as i64));
        assert_eq!(src.draw(4).unwrap(), 4);

        let mut src = LevelSource::Custom(Box::new(|_| 33));
        assert_eq!(
            src.draw(32),
            Err(Error::BadLevel { given: 33, maxlevel: 32 })
        );

        let mut src = LevelSource::Custom(Box::new(|_| 0));
        assert!(src.draw(32).is_err());

        let mut src = LevelSource::Custom(Box::new(|_| -7));
        assert!(src.draw(32).is_err());
    }

    #[test]
    fn geometric_source_test() {
        let mut src = LevelSource::Geometric;
        for _ in 0..1000 {
            let level = src.draw(8).unwrap();
            assert!((1..=8).contains(&level));
        }
    }
}
