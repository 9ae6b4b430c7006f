//! The fixed four-metal universe and per-metal constant tables.

use std::fmt;

/// One of the four precious metals this daemon tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metal {
    Xau,
    Xag,
    Xpt,
    Xpd,
}

/// Stable iteration order used everywhere "for each metal" applies.
pub const ALL_METALS: [Metal; 4] = [Metal::Xau, Metal::Xag, Metal::Xpt, Metal::Xpd];

impl Metal {
    /// Position in the fixed four-slot arrays used by [`crate::volatility::VolatilityMap`]
    /// and [`crate::weights::WeightVector`].
    pub fn index(&self) -> usize {
        match self {
            Metal::Xau => 0,
            Metal::Xag => 1,
            Metal::Xpt => 2,
            Metal::Xpd => 3,
        }
    }

    /// Ticker as used by the quote source path (`/api/{METAL}/USD`).
    pub fn ticker(&self) -> &'static str {
        match self {
            Metal::Xau => "XAU",
            Metal::Xag => "XAG",
            Metal::Xpt => "XPT",
            Metal::Xpd => "XPD",
        }
    }

    /// Band the target/smoothed weight for this metal must stay within.
    pub fn weight_bounds(&self) -> (f64, f64) {
        match self {
            Metal::Xau => (0.35, 0.55),
            Metal::Xag => (0.15, 0.30),
            Metal::Xpt => (0.10, 0.25),
            Metal::Xpd => (0.05, 0.15),
        }
    }

    /// Seed weight before any tick has run.
    pub fn initial_weight(&self) -> f64 {
        match self {
            Metal::Xau => 0.45,
            Metal::Xag => 0.22,
            Metal::Xpt => 0.18,
            Metal::Xpd => 0.15,
        }
    }

    /// Domain-default annualized volatility, used when history is too sparse.
    pub fn default_volatility(&self) -> f64 {
        match self {
            Metal::Xau => 0.12,
            Metal::Xag => 0.22,
            Metal::Xpt => 0.18,
            Metal::Xpd => 0.30,
        }
    }

    /// Weight of this metal's volatility in the aggregate daily-scale figure
    /// the Regime Classifier consumes.
    pub fn regime_weight(&self) -> f64 {
        match self {
            Metal::Xau => 0.5,
            Metal::Xag => 0.2,
            Metal::Xpt => 0.2,
            Metal::Xpd => 0.1,
        }
    }
}

impl fmt::Display for Metal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker())
    }
}

/// Conversion factor from troy ounce to gram; quotes arrive per ounce, the
/// index is carried per gram throughout the pipeline.
pub const OUNCE_TO_GRAM: f64 = 31.1035;
