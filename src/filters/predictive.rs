use crate::types::*;
use std::collections::BTreeSet;

/// SIFT scores at or below this value are deleterious.
pub const SIFT_DELETERIOUS_THRESHOLD: f64 = 0.05;

/// PolyPhen scores at or above this value are damaging.
pub const POLYPHEN_DAMAGING_THRESHOLD: f64 = 0.85;

/// In-silico pathogenicity predictors reported by VEP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    /// Lower is more deleterious
    Sift,
    /// Higher is more damaging
    PolyPhen,
}

impl Predictor {
    pub fn is_deleterious(&self, score: f64) -> bool {
        match self {
            Predictor::Sift => score <= SIFT_DELETERIOUS_THRESHOLD,
            Predictor::PolyPhen => score >= POLYPHEN_DAMAGING_THRESHOLD,
        }
    }

    /// Least severe score across transcripts.
    pub fn least_severe(&self, predictions: &BTreeSet<String>) -> Option<f64> {
        let scores = predictions
            .iter()
            .flat_map(|p| p.split(','))
            .filter_map(extract_prediction_score);
        match self {
            Predictor::Sift => scores.reduce(f64::max),
            Predictor::PolyPhen => scores.reduce(f64::min),
        }
    }
}

/// Extract the number from a VEP prediction such as `deleterious(0.01)`.
/// A bare number is accepted as well.
pub fn extract_prediction_score(prediction: &str) -> Option<f64> {
    let prediction = prediction.trim();
    if prediction.is_empty() {
        return None;
    }

    let number = match prediction.split_once('(') {
        Some((_, rest)) => rest.split(')').next().unwrap_or(rest),
        None => prediction,
    };

    match number.trim().parse::<f64>() {
        Ok(score) if score.is_finite() => Some(score),
        _ => {
            log::warn!("Ignoring unparsable prediction '{}'", prediction);
            None
        }
    }
}

/// `+1` when the available predictors agree the variant is deleterious.
pub fn pathogenicity_prediction_score(effect: &EffectFields) -> i32 {
    let sift = Predictor::Sift.least_severe(&effect.sift);
    let polyphen = Predictor::PolyPhen.least_severe(&effect.polyphen);

    let deleterious = match (sift, polyphen) {
        (None, None) => false,
        (Some(sift), None) => Predictor::Sift.is_deleterious(sift),
        (None, Some(polyphen)) => Predictor::PolyPhen.is_deleterious(polyphen),
        (Some(sift), Some(polyphen)) => {
            Predictor::Sift.is_deleterious(sift) && Predictor::PolyPhen.is_deleterious(polyphen)
        }
    };

    if deleterious {
        1
    } else {
        0
    }
}
