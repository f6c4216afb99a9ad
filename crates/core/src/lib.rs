//! Domain logic shared by every bedtime crate.
//!
//! Zero internal dependencies: lifecycle states, retry policy, remix seeds,
//! similarity rank reconstruction, and schedule math.

pub mod error;
pub mod media;
pub mod schedule;
pub mod similarity;
pub mod story;
pub mod types;
