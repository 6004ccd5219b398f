//! Approximate token counting
//!
//! No real tokenizer is involved: counts come from fixed character/byte
//! ratios, which keeps them cheap, deterministic and locale independent.
//!
//! | Heuristic | Formula               | Use                           |
//! |-----------|-----------------------|-------------------------------|
//! | `chars`   | ceil(chars / 4)       | mixed prose and code (default)|
//! | `code`    | ceil(UTF-8 bytes / 3) | dense code, errs on the high side |
//!
//! Both are zero for empty text and never decrease as text grows.

use clap::ValueEnum;
use strum::{Display, EnumIter, EnumString};

/// Interface for token estimators
pub trait TokenEstimator: Send + Sync {
    /// Estimated token count of `text`
    fn estimate(&self, text: &str) -> usize;
}

/// Built-in estimation heuristics
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, ValueEnum,
)]
#[strum(serialize_all = "lowercase")]
pub enum Heuristic {
    /// About four characters per token
    #[default]
    Chars,
    /// About three bytes per token
    Code,
}

impl Heuristic {
    const CHARS_PER_TOKEN: usize = 4;
    const BYTES_PER_TOKEN: usize = 3;

    /// Estimate from precomputed character and UTF-8 byte counts
    pub fn estimate_counts(&self, chars: usize, bytes: usize) -> usize {
        match self {
            Heuristic::Chars => chars.div_ceil(Self::CHARS_PER_TOKEN),
            Heuristic::Code => bytes.div_ceil(Self::BYTES_PER_TOKEN),
        }
    }
}

impl TokenEstimator for Heuristic {
    fn estimate(&self, text: &str) -> usize {
        self.estimate_counts(text.chars().count(), text.len())
    }
}

/// Estimate tokens with the default heuristic
pub fn estimate(text: &str) -> usize {
    Heuristic::default().estimate(text)
}
