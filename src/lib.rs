//! A probabilistic data structure which provides lookups in logarithmic
//! time: a dictionary keyed by arbitrary hashable keys whose entries are
//! simultaneously ordered by a numeric score.
//!
//! [`ScoreDict`] pairs a hash map with an indexable skip list. Membership
//! and score lookups by key run in O(1) expected time; insertion,
//! deletion, rank queries and positional access run in O(log n) expected
//! time; score-range iteration costs O(log n + k).

pub mod dict;
pub mod error;
pub mod iter;
mod level;
mod skiplist;

pub use dict::ScoreDict;
pub use error::{Error, Result};
pub use iter::{Items, Keys, Values};
