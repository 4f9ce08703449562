//! Threshold decision over a classifier score.

pub mod verdict;

pub use verdict::{decide, Label, Verdict, LICIT_THRESHOLD};
