use serde::{Deserialize, Serialize};

/// Scores strictly above this are licit; exactly 0.5 is illicit.
pub const LICIT_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Licit,
    Illicit,
}

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Licit => "Licit",
            Label::Illicit => "Illicit",
        }
    }
}

/// Outcome of thresholding one classifier score.
///
/// Invariant: `label == Licit` iff `raw_score > 0.5`; `confidence` is the
/// probability of the chosen label and so lies in [0.5, 1.0].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub label: Label,
    pub is_licit: bool,
    pub confidence: f64,
    pub raw_score: f64,
}

/// Pure decision over a score in [0, 1] (P(licit)).
pub fn decide(score: f64) -> Verdict {
    let is_licit = score > LICIT_THRESHOLD;
    Verdict {
        label: if is_licit { Label::Licit } else { Label::Illicit },
        is_licit,
        confidence: if is_licit { score } else { 1.0 - score },
        raw_score: score,
    }
}
