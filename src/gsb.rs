//! Good/Same/Bad comparison scores.
//!
//! A GSB verdict compares a candidate value against a reference: `G` when
//! the candidate is greater, `B` when it is smaller and `S` otherwise. The
//! integer form is `1`, `0` and `-1`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{DmError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gsb {
    Good,
    Same,
    Bad,
}

impl Gsb {
    pub fn to_int(self) -> i8 {
        match self {
            Gsb::Good => 1,
            Gsb::Same => 0,
            Gsb::Bad => -1,
        }
    }

    pub fn from_int(n: i64) -> Result<Self> {
        match n {
            1 => Ok(Gsb::Good),
            0 => Ok(Gsb::Same),
            -1 => Ok(Gsb::Bad),
            other => Err(DmError::InvalidArgument(format!(
                "GSB integer must be -1, 0 or 1, got {other}"
            ))),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Gsb::Good => 'G',
            Gsb::Same => 'S',
            Gsb::Bad => 'B',
        }
    }

    /// A verdict that is not `Same`.
    pub fn is_decisive(self) -> bool {
        self != Gsb::Same
    }
}

impl FromStr for Gsb {
    type Err = DmError;

    /// Parse a GSB letter, ignoring case.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "G" => Ok(Gsb::Good),
            "S" => Ok(Gsb::Same),
            "B" => Ok(Gsb::Bad),
            other => Err(DmError::InvalidArgument(format!(
                "GSB letter must be G, S or B, got {other}"
            ))),
        }
    }
}

impl fmt::Display for Gsb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl From<Gsb> for Value {
    fn from(gsb: Gsb) -> Self {
        Value::String(gsb.to_string())
    }
}

/// Compare `value` against `reference`.
///
/// Unordered inputs (NaN) count as `Same`.
pub fn calc_gsb(reference: f64, value: f64) -> Gsb {
    if value > reference {
        Gsb::Good
    } else if value < reference {
        Gsb::Bad
    } else {
        Gsb::Same
    }
}

/// [`calc_gsb`] over JSON values. Both must be numbers.
pub fn calc_gsb_value(reference: &Value, value: &Value) -> Result<Gsb> {
    let number = |v: &Value| {
        v.as_f64()
            .ok_or_else(|| DmError::InvalidArgument(format!("GSB operand {v} is not a number")))
    };
    Ok(calc_gsb(number(reference)?, number(value)?))
}

/// Verdicts for every pair `(scores[i], scores[j])` with `i < j`, in
/// lexicographic pair order. The earlier score is the reference.
pub fn pairwise_gsb(scores: &[f64]) -> Vec<Gsb> {
    let mut out = Vec::with_capacity(scores.len() * scores.len().saturating_sub(1) / 2);
    for (i, &reference) in scores.iter().enumerate() {
        for &value in &scores[i + 1..] {
            out.push(calc_gsb(reference, value));
        }
    }
    out
}

/// [`pairwise_gsb`] applied to each row of a score matrix.
pub fn gsb_matrix<R: AsRef<[f64]>>(rows: &[R]) -> Vec<Vec<Gsb>> {
    rows.iter().map(|row| pairwise_gsb(row.as_ref())).collect()
}

/// Fraction of predictions equal to the truth.
pub fn gsb_accuracy(pred: &[Gsb], truth: &[Gsb]) -> Result<f64> {
    check_aligned(pred, truth)?;
    let hits = pred.iter().zip(truth).filter(|(p, t)| p == t).count();
    Ok(hits as f64 / pred.len() as f64)
}

/// Like [`gsb_accuracy`], counting only pairs where both the prediction and
/// the truth are decisive.
pub fn gb_accuracy(pred: &[Gsb], truth: &[Gsb]) -> Result<f64> {
    check_aligned(pred, truth)?;
    let (hits, total) = pred
        .iter()
        .zip(truth)
        .filter(|(p, t)| p.is_decisive() && t.is_decisive())
        .fold((0usize, 0usize), |(hits, total), (p, t)| {
            (hits + usize::from(p == t), total + 1)
        });
    if total == 0 {
        return Err(DmError::InvalidArgument(
            "no pair is decisive in both prediction and truth".to_string(),
        ));
    }
    Ok(hits as f64 / total as f64)
}

fn check_aligned(pred: &[Gsb], truth: &[Gsb]) -> Result<()> {
    if pred.len() != truth.len() {
        return Err(DmError::LengthMismatch {
            left: pred.len(),
            right: truth.len(),
        });
    }
    if pred.is_empty() {
        return Err(DmError::empty("prediction"));
    }
    Ok(())
}
