//! Stance bins and binning schemes.
//!
//! Stance is a continuous score in [-1, 1]. Classification-style metrics
//! work on an ordered set of discrete bins derived from that score. The
//! same [`BinScheme`] value must bin gold labels and predictions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest valid stance score.
pub const STANCE_MIN: f64 = -1.0;
/// Highest valid stance score.
pub const STANCE_MAX: f64 = 1.0;

/// Whether `score` is a finite value inside the stance range.
pub fn in_stance_range(score: f64) -> bool {
    score.is_finite() && (STANCE_MIN..=STANCE_MAX).contains(&score)
}

/// A discrete stance category, ordered from opposing to supporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StanceBin {
    StronglyOpposing,
    Opposing,
    Neutral,
    Supporting,
    StronglySupporting,
    /// A score indistinguishable from zero under the fine-grained scheme.
    Irrelevant,
}

impl StanceBin {
    /// Human-readable label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            StanceBin::StronglyOpposing => "Strongly Opposing",
            StanceBin::Opposing => "Opposing",
            StanceBin::Neutral => "Neutral",
            StanceBin::Supporting => "Supporting",
            StanceBin::StronglySupporting => "Strongly Supporting",
            StanceBin::Irrelevant => "Irrelevant",
        }
    }
}

impl fmt::Display for StanceBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixed thresholds mapping a score to a [`StanceBin`].
///
/// Thresholds are configuration, never learned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum BinScheme {
    /// `Opposing` below `lower`, `Supporting` above `upper`, `Neutral` otherwise.
    /// Both comparisons are strict, so a score equal to a threshold is neutral.
    ThreeWay {
        #[serde(default = "default_lower")]
        lower: f64,
        #[serde(default = "default_upper")]
        upper: f64,
    },
    /// Five ordered bins with inclusive lower cut points:
    /// `<= strong_lower`, `<= lower`, `< upper`, `< strong_upper`, rest.
    ///
    /// Scores with `|score| < irrelevant_epsilon` go to `Irrelevant` before
    /// any cut point is checked. An epsilon of 0 disables that bin.
    FiveWay {
        #[serde(default = "default_strong_lower")]
        strong_lower: f64,
        #[serde(default = "default_five_lower")]
        lower: f64,
        #[serde(default = "default_five_upper")]
        upper: f64,
        #[serde(default = "default_strong_upper")]
        strong_upper: f64,
        #[serde(default = "default_irrelevant_epsilon")]
        irrelevant_epsilon: f64,
    },
}

fn default_lower() -> f64 {
    -0.3
}

fn default_upper() -> f64 {
    0.3
}

fn default_strong_lower() -> f64 {
    -0.75
}

fn default_five_lower() -> f64 {
    -0.25
}

fn default_five_upper() -> f64 {
    0.25
}

fn default_strong_upper() -> f64 {
    0.75
}

fn default_irrelevant_epsilon() -> f64 {
    1e-9
}

const THREE_BINS: &[StanceBin] = &[
    StanceBin::Opposing,
    StanceBin::Neutral,
    StanceBin::Supporting,
];

const FIVE_BINS: &[StanceBin] = &[
    StanceBin::StronglyOpposing,
    StanceBin::Opposing,
    StanceBin::Neutral,
    StanceBin::Supporting,
    StanceBin::StronglySupporting,
];

const SIX_BINS: &[StanceBin] = &[
    StanceBin::StronglyOpposing,
    StanceBin::Opposing,
    StanceBin::Neutral,
    StanceBin::Supporting,
    StanceBin::StronglySupporting,
    StanceBin::Irrelevant,
];

impl Default for BinScheme {
    fn default() -> Self {
        Self::three_way()
    }
}

impl BinScheme {
    /// Three bins with thresholds at ±0.3.
    pub fn three_way() -> Self {
        BinScheme::ThreeWay {
            lower: default_lower(),
            upper: default_upper(),
        }
    }

    /// Five bins with cut points at ±0.25 and ±0.75, plus `Irrelevant`
    /// for scores within 1e-9 of zero.
    pub fn five_way() -> Self {
        BinScheme::FiveWay {
            strong_lower: default_strong_lower(),
            lower: default_five_lower(),
            upper: default_five_upper(),
            strong_upper: default_strong_upper(),
            irrelevant_epsilon: default_irrelevant_epsilon(),
        }
    }

    /// Map a continuous score to its bin. Pure; depends only on `score`.
    pub fn bin(&self, score: f64) -> StanceBin {
        match *self {
            BinScheme::ThreeWay { lower, upper } => {
                if score < lower {
                    StanceBin::Opposing
                } else if score > upper {
                    StanceBin::Supporting
                } else {
                    StanceBin::Neutral
                }
            }
            BinScheme::FiveWay {
                strong_lower,
                lower,
                upper,
                strong_upper,
                irrelevant_epsilon,
            } => {
                if score.abs() < irrelevant_epsilon {
                    StanceBin::Irrelevant
                } else if score <= strong_lower {
                    StanceBin::StronglyOpposing
                } else if score <= lower {
                    StanceBin::Opposing
                } else if score < upper {
                    StanceBin::Neutral
                } else if score < strong_upper {
                    StanceBin::Supporting
                } else {
                    StanceBin::StronglySupporting
                }
            }
        }
    }

    /// The bins this scheme can produce, in order.
    pub fn bins(&self) -> &'static [StanceBin] {
        match *self {
            BinScheme::ThreeWay { .. } => THREE_BINS,
            BinScheme::FiveWay {
                irrelevant_epsilon, ..
            } if irrelevant_epsilon > 0.0 => SIX_BINS,
            BinScheme::FiveWay { .. } => FIVE_BINS,
        }
    }

    /// Check that thresholds are finite and increasing.
    pub fn validate(&self) -> crate::Result<()> {
        let cuts: Vec<f64> = match *self {
            BinScheme::ThreeWay { lower, upper } => vec![lower, upper],
            BinScheme::FiveWay {
                strong_lower,
                lower,
                upper,
                strong_upper,
                irrelevant_epsilon,
            } => {
                if !(irrelevant_epsilon.is_finite() && irrelevant_epsilon >= 0.0) {
                    return Err(crate::StanceError::Configuration(format!(
                        "irrelevant_epsilon must be finite and non-negative, got {irrelevant_epsilon}"
                    )));
                }
                vec![strong_lower, lower, upper, strong_upper]
            }
        };
        let ordered = cuts.windows(2).all(|w| w[0] < w[1]);
        if cuts.iter().all(|c| c.is_finite()) && ordered {
            Ok(())
        } else {
            Err(crate::StanceError::Configuration(format!(
                "bin thresholds must be finite and increasing, got {cuts:?}"
            )))
        }
    }
}
