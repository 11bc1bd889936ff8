use crate::error::{CamToolError, CamToolResult};
use serde::{Deserialize, Serialize};

/// Depth ladder for multi-pass cutting.
///
/// Depths are positive distances below the zeroed surface; the emitted Z
/// value is the negated depth. The ladder is validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCutProfile")]
pub struct CutProfile {
    start: f64,
    end: f64,
    step: f64,
}

#[derive(Deserialize)]
struct RawCutProfile {
    start: f64,
    end: f64,
    step: f64,
}

impl TryFrom<RawCutProfile> for CutProfile {
    type Error = CamToolError;

    fn try_from(raw: RawCutProfile) -> Result<Self, Self::Error> {
        CutProfile::new(raw.start, raw.end, raw.step)
    }
}

impl CutProfile {
    pub fn new(start: f64, end: f64, step: f64) -> CamToolResult<Self> {
        let valid = start.is_finite() && end.is_finite() && step.is_finite();
        if !valid || step <= 0.0 || end < start {
            return Err(CamToolError::InvalidCutProfile { start, end, step });
        }
        Ok(Self { start, end, step })
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    /// `ceil((end - start) / step)`, ignoring floating point noise.
    pub fn passes(&self) -> usize {
        let ratio = (self.end - self.start) / self.step;
        (ratio - 1e-9).ceil().max(0.0) as usize
    }

    /// Depth of pass `k` (1-based), clamped to the end depth.
    pub fn pass_depth(&self, k: usize) -> f64 {
        (self.start + self.step * k as f64).min(self.end)
    }

    pub fn pass_depths(&self) -> Vec<f64> {
        let passes = self.passes();
        (1..=passes)
            .map(|k| if k == passes { self.end } else { self.pass_depth(k) })
            .collect()
    }
}
