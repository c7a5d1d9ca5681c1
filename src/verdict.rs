//! Bespoke scoring heuristic for the retrained five-category classifier.
//!
//! This is deliberately isolated behind `judge` so the rest of the pipeline
//! never sees the category arithmetic; swapping the policy touches only this
//! module.

use std::fmt;

pub const HANDSOME_LABEL: &str = "shuaige";
pub const UGLY_MALE_LABEL: &str = "chounan";
pub const PRETTY_LABEL: &str = "meinv";
pub const UGLY_FEMALE_LABEL: &str = "chounv";
pub const SEXY_LABEL: &str = "xinggan";

/// Score above which the verdict drops the hedge word.
const CONFIDENT_THRESHOLD: f32 = 0.3;
/// Sexy score above which the female branch gets the extra qualifier.
const SEXY_THRESHOLD: f32 = 0.1;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceScores {
    pub handsome: f32,
    pub ugly_male: f32,
    pub pretty: f32,
    pub ugly_female: f32,
    pub sexy: f32,
}

impl FaceScores {
    /// Gathers the five category scores out of a flat-label prediction.
    /// Returns `None` unless all five labels are present, which keeps the
    /// heuristic silent on models it was never trained for.
    pub fn from_labels(labels: &[String], probs: &[f32]) -> Option<Self> {
        let score_of = |name: &str| -> Option<f32> {
            let index = labels.iter().position(|label| label == name)?;
            probs.get(index).copied()
        };
        Some(Self {
            handsome: score_of(HANDSOME_LABEL)?,
            ugly_male: score_of(UGLY_MALE_LABEL)?,
            pretty: score_of(PRETTY_LABEL)?,
            ugly_female: score_of(UGLY_FEMALE_LABEL)?,
            sexy: score_of(SEXY_LABEL)?,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Verdict {
    pub gender: Gender,
    /// Percentage in [0, 100], the dominant score against its ugly
    /// counterpart.
    pub confidence: f32,
    /// True when the dominant score stayed under the confident threshold.
    pub hedged: bool,
    pub sexy: bool,
}

/// The weighted comparison: male when the male pair outweighs the female
/// pair and the sexy score does not beat the stronger male category,
/// female otherwise.
pub fn judge(scores: &FaceScores) -> Verdict {
    let male_total = scores.handsome + scores.ugly_male;
    let female_total = scores.pretty + scores.ugly_female;
    let strongest_male = scores.handsome.max(scores.ugly_male);

    if male_total > female_total && scores.sexy < strongest_male {
        Verdict {
            gender: Gender::Male,
            confidence: ratio_percent(scores.handsome, male_total),
            hedged: scores.handsome <= CONFIDENT_THRESHOLD,
            sexy: false,
        }
    } else {
        Verdict {
            gender: Gender::Female,
            confidence: ratio_percent(scores.pretty, female_total),
            hedged: scores.pretty <= CONFIDENT_THRESHOLD,
            sexy: scores.sexy > SEXY_THRESHOLD,
        }
    }
}

fn ratio_percent(part: f32, total: f32) -> f32 {
    if total > 0.0 { 100.0 * part / total } else { 0.0 }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hedge = if self.hedged { "possibly" } else { "probably" };
        let subject = match (self.gender, self.sexy) {
            (Gender::Male, _) => "male",
            (Gender::Female, true) => "sexy female",
            (Gender::Female, false) => "female",
        };
        write!(f, "{hedge} {subject} (confidence = {:.2}%)", self.confidence)
    }
}
