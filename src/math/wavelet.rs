//! Dyadic Haar decomposition.
//!
//! The input is zero-padded to the next power of two. Each level replaces the current
//! approximation by pairwise averages `(a + b) / 2` and records pairwise half-differences
//! `(a - b) / 2` as that level's details, until a single approximation coefficient remains.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HaarDecomposition {
    /// Final single-coefficient approximation (the padded mean).
    pub approximation: f64,
    /// `details[0]` is the finest level (length `padded_len / 2`).
    pub details: Vec<Vec<f64>>,
    pub padded_len: usize,
}

impl HaarDecomposition {
    pub fn levels(&self) -> usize {
        self.details.len()
    }

    /// Detail coefficients at `level` (1 = finest).
    pub fn detail(&self, level: usize) -> Option<&[f64]> {
        level
            .checked_sub(1)
            .and_then(|i| self.details.get(i))
            .map(Vec::as_slice)
    }
}

pub fn haar_decompose(data: &[f64]) -> HaarDecomposition {
    let padded_len = data.len().max(1).next_power_of_two();
    let mut approx = data.to_vec();
    approx.resize(padded_len, 0.0);

    let mut details = Vec::new();
    while approx.len() > 1 {
        let (next, detail): (Vec<f64>, Vec<f64>) = approx
            .chunks_exact(2)
            .map(|p| (0.5 * (p[0] + p[1]), 0.5 * (p[0] - p[1])))
            .unzip();
        details.push(detail);
        approx = next;
    }

    HaarDecomposition {
        approximation: approx.first().copied().unwrap_or(0.0),
        details,
        padded_len,
    }
}

/// Inverts [`haar_decompose`], returning the zero-padded input.
pub fn haar_reconstruct(decomposition: &HaarDecomposition) -> Vec<f64> {
    let mut approx = vec![decomposition.approximation];
    for detail in decomposition.details.iter().rev() {
        approx = approx
            .iter()
            .zip(detail)
            .flat_map(|(a, d)| [a + d, a - d])
            .collect();
    }
    approx
}
