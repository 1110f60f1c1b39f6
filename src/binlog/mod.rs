pub mod normalizer;
pub mod source;
pub mod types;

#[cfg(test)]
mod normalizer_tests;

pub use normalizer::{coerce, normalize, ChangeRecords};
pub use source::{EventHandler, LogSource, NdjsonSource};
pub use types::*;
