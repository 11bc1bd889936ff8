//! Motion vocabulary: the subset of G/M codes the generators emit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Spindle rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpindleDirection {
    #[default]
    Clockwise,
    CounterClockwise,
}

impl fmt::Display for SpindleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clockwise => write!(f, "clockwise"),
            Self::CounterClockwise => write!(f, "counter-clockwise"),
        }
    }
}

/// Optional axis values carried by a move or position declaration.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axes {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub e: Option<f64>,
}

impl Axes {
    pub fn xy(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn z(z: f64) -> Self {
        Self {
            z: Some(z),
            ..Default::default()
        }
    }

    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
            e: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.z.is_none() && self.e.is_none()
    }

    /// `(letter, value)` pairs in X, Y, Z, E order.
    pub fn words(&self) -> impl Iterator<Item = (char, f64)> {
        [('X', self.x), ('Y', self.y), ('Z', self.z), ('E', self.e)]
            .into_iter()
            .filter_map(|(axis, v)| v.map(|v| (axis, v)))
    }
}

/// One line of machine program.
#[derive(Debug, Clone, PartialEq)]
pub enum MotionCommand {
    /// `; text`
    Comment(String),
    /// `G0`: travel move.
    Rapid { axes: Axes, feed: Option<f64> },
    /// `G1`: tool-engaged move.
    Linear { axes: Axes, feed: Option<f64> },
    /// `G90`
    SetAbsolute,
    /// `G91`
    SetRelative,
    /// `G92`: declare the current position.
    SetPosition(Axes),
    /// `M3`/`M4`
    SpindleOn { direction: SpindleDirection, rpm: f64 },
    /// `M5`
    SpindleOff,
    /// `G4 S<seconds>`
    Dwell { seconds: f64 },
    /// `M400`: wait for queued moves to finish.
    FinishMoves,
    /// `M746 S1`
    ProbeEnable,
    /// `M746 S0`
    ProbeDisable,
    /// `G38`: probe down until contact.
    ProbeZero,
    /// `G28`
    Home,
}

/// Round `value` to `decimals` fractional digits.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

/// Shortest decimal representation, without trailing zeros or `-0`.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

fn write_axes(f: &mut fmt::Formatter<'_>, axes: &Axes, feed: Option<f64>) -> fmt::Result {
    for (letter, value) in axes.words() {
        write!(f, " {}{}", letter, format_number(value))?;
    }
    if let Some(feed) = feed {
        write!(f, " F{}", format_number(feed))?;
    }
    Ok(())
}

impl fmt::Display for MotionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comment(text) => write!(f, "; {}", text),
            Self::Rapid { axes, feed } => {
                write!(f, "G0")?;
                write_axes(f, axes, *feed)
            }
            Self::Linear { axes, feed } => {
                write!(f, "G1")?;
                write_axes(f, axes, *feed)
            }
            Self::SetAbsolute => write!(f, "G90"),
            Self::SetRelative => write!(f, "G91"),
            Self::SetPosition(axes) => {
                write!(f, "G92")?;
                write_axes(f, axes, None)
            }
            Self::SpindleOn { direction, rpm } => match direction {
                SpindleDirection::Clockwise => write!(f, "M3 S{}", format_number(*rpm)),
                SpindleDirection::CounterClockwise => write!(f, "M4 S{}", format_number(*rpm)),
            },
            Self::SpindleOff => write!(f, "M5"),
            Self::Dwell { seconds } => write!(f, "G4 S{}", format_number(*seconds)),
            Self::FinishMoves => write!(f, "M400"),
            Self::ProbeEnable => write!(f, "M746 S1"),
            Self::ProbeDisable => write!(f, "M746 S0"),
            Self::ProbeZero => write!(f, "G38"),
            Self::Home => write!(f, "G28"),
        }
    }
}
