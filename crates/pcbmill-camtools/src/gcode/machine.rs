//! Stateful G-code emitter.
//!
//! [`MachineState`] remembers the last commanded position, the coordinate
//! mode and the last feed rate so that every emitted line carries only
//! what changed. Targets are always given in absolute job coordinates; in
//! relative mode they are converted to deltas before emission.

use super::command::{format_number, round_to, Axes, MotionCommand, SpindleDirection};
use super::profile::CutProfile;
use super::sink::CommandSink;
use crate::error::{CamToolResult, MotionError, MotionResult, ParameterError, ParameterResult};
use pcbmill_core::{GeometryBackend, GeometryError, KernelBackend, Path, Point};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Coordinate interpretation of emitted moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    Absolute,
    #[default]
    Relative,
}

impl fmt::Display for CoordinateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absolute => write!(f, "absolute"),
            Self::Relative => write!(f, "relative"),
        }
    }
}

/// Immutable machine parameters for one output stream.
///
/// Heights and depths are positive distances: `travel_height` above the
/// zeroed surface, the depths below it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    pub travel_height: f64,
    pub plunge_depth: f64,
    pub drill_depth: f64,
    pub travel_xy_feed: f64,
    pub travel_z_feed: f64,
    pub mill_xy_feed: f64,
    pub cut_xy_feed: f64,
    /// Feed for every tool-engaged Z move (milling, cutting, drilling).
    pub plunge_z_feed: f64,
    pub spindle_rpm: f64,
    pub spindle_direction: SpindleDirection,
    pub spindle_settle_seconds: f64,
    /// Simplification tolerance applied to paths before emission.
    pub min_xy_step: f64,
    pub decimals: u32,
    pub coordinate_mode: CoordinateMode,
    pub use_probe: bool,
    pub zero_origin_at_start: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            travel_height: 5.0,
            plunge_depth: 0.1,
            drill_depth: 2.0,
            travel_xy_feed: 1000.0,
            travel_z_feed: 1000.0,
            mill_xy_feed: 100.0,
            cut_xy_feed: 100.0,
            plunge_z_feed: 50.0,
            spindle_rpm: 10000.0,
            spindle_direction: SpindleDirection::Clockwise,
            spindle_settle_seconds: 3.0,
            min_xy_step: 0.01,
            decimals: 5,
            coordinate_mode: CoordinateMode::Absolute,
            use_probe: false,
            zero_origin_at_start: true,
        }
    }
}

impl MachineConfig {
    pub fn validate(&self) -> ParameterResult<()> {
        let positive = [
            ("travel_height", self.travel_height),
            ("travel_xy_feed", self.travel_xy_feed),
            ("travel_z_feed", self.travel_z_feed),
            ("mill_xy_feed", self.mill_xy_feed),
            ("cut_xy_feed", self.cut_xy_feed),
            ("plunge_z_feed", self.plunge_z_feed),
            ("spindle_rpm", self.spindle_rpm),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParameterError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("must be positive, got {}", value),
                });
            }
        }
        let non_negative = [
            ("plunge_depth", self.plunge_depth),
            ("drill_depth", self.drill_depth),
            ("spindle_settle_seconds", self.spindle_settle_seconds),
            ("min_xy_step", self.min_xy_step),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ParameterError::InvalidValue {
                    name: name.to_string(),
                    reason: format!("must not be negative, got {}", value),
                });
            }
        }
        if self.decimals > 9 {
            return Err(ParameterError::OutOfRange {
                name: "decimals".to_string(),
                value: self.decimals as f64,
                min: 0.0,
                max: 9.0,
            });
        }
        if self.coordinate_mode == CoordinateMode::Relative && !self.zero_origin_at_start {
            return Err(ParameterError::Incompatible(
                "relative coordinates need a zeroed origin at program start".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MoveKind {
    Rapid,
    Linear,
}

/// Position, mode and feed bookkeeping over a [`CommandSink`].
pub struct MachineState<S: CommandSink> {
    config: MachineConfig,
    sink: S,
    backend: Box<dyn GeometryBackend>,
    position: Axes,
    mode: CoordinateMode,
    mode_pending: bool,
    stored_mode: Option<CoordinateMode>,
    feed: Option<f64>,
    emitted: usize,
}

impl<S: CommandSink> MachineState<S> {
    /// The configured coordinate mode is declared before the first move.
    pub fn new(config: MachineConfig, sink: S) -> Self {
        let mode = config.coordinate_mode;
        Self {
            config,
            sink,
            backend: Box::new(KernelBackend::default()),
            position: Axes::default(),
            mode,
            mode_pending: true,
            stored_mode: None,
            feed: None,
            emitted: 0,
        }
    }

    pub fn with_backend(mut self, backend: Box<dyn GeometryBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Last commanded absolute position; unknown axes are `None`.
    pub fn position(&self) -> Axes {
        self.position
    }

    pub fn mode(&self) -> CoordinateMode {
        self.mode
    }

    pub fn feed(&self) -> Option<f64> {
        self.feed
    }

    /// Number of commands written so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    fn emit(&mut self, command: MotionCommand) -> MotionResult<()> {
        self.sink.emit(&command)?;
        self.emitted += 1;
        Ok(())
    }

    fn round(&self, value: f64) -> f64 {
        round_to(value, self.config.decimals)
    }

    pub fn comment(&mut self, text: impl Into<String>) -> MotionResult<()> {
        self.emit(MotionCommand::Comment(text.into()))
    }

    pub fn flush(&mut self) -> MotionResult<()> {
        self.sink.flush()?;
        Ok(())
    }

    pub fn set_absolute(&mut self) -> MotionResult<()> {
        self.set_mode(CoordinateMode::Absolute)
    }

    pub fn set_relative(&mut self) -> MotionResult<()> {
        self.set_mode(CoordinateMode::Relative)
    }

    pub fn set_mode(&mut self, mode: CoordinateMode) -> MotionResult<()> {
        if self.mode != mode || self.mode_pending {
            self.mode = mode;
            self.mode_pending = false;
            self.emit(match mode {
                CoordinateMode::Absolute => MotionCommand::SetAbsolute,
                CoordinateMode::Relative => MotionCommand::SetRelative,
            })?;
        }
        Ok(())
    }

    fn ensure_mode(&mut self) -> MotionResult<()> {
        if self.mode_pending {
            self.set_mode(self.mode)?;
        }
        Ok(())
    }

    pub fn store_mode(&mut self) {
        self.stored_mode = Some(self.mode);
    }

    /// Return to the stored mode; the declaration is re-emitted before the next move.
    pub fn restore_mode(&mut self) {
        if let Some(stored) = self.stored_mode {
            if stored != self.mode {
                self.mode_pending = true;
            }
            self.mode = stored;
        }
    }

    /// `G92 X0 Y0 Z0`: the current location becomes the job origin.
    pub fn zero_all(&mut self) -> MotionResult<()> {
        self.emit(MotionCommand::SetPosition(Axes::xyz(0.0, 0.0, 0.0)))?;
        self.position = Axes {
            e: Some(0.0),
            ..Axes::xyz(0.0, 0.0, 0.0)
        };
        Ok(())
    }

    pub fn zero_z(&mut self) -> MotionResult<()> {
        self.emit(MotionCommand::SetPosition(Axes::z(0.0)))?;
        self.position.z = Some(0.0);
        Ok(())
    }

    pub fn home(&mut self) -> MotionResult<()> {
        self.emit(MotionCommand::Home)?;
        self.position.x = Some(0.0);
        self.position.y = Some(0.0);
        self.position.z = Some(0.0);
        Ok(())
    }

    /// Probe down to the copper surface with the continuity probe and zero Z there.
    pub fn probe_zero(&mut self) -> MotionResult<()> {
        self.comment("Enable continuity probe")?;
        self.emit(MotionCommand::ProbeEnable)?;
        self.emit(MotionCommand::ProbeZero)?;
        self.comment("Set zero Z to current position")?;
        self.emit(MotionCommand::SetPosition(Axes::z(0.0)))?;
        self.position.z = Some(0.0);
        self.emit(MotionCommand::ProbeDisable)?;
        self.comment("Disable continuity probe")
    }

    /// Tool-engaged move. Returns `false` when nothing had to be emitted.
    pub fn move_to(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        feed: Option<f64>,
    ) -> MotionResult<bool> {
        self.move_axes(MoveKind::Linear, Axes { x, y, z, e: None }, feed)
    }

    /// Same as [`move_to`](Self::move_to) but emitted as a travel move.
    pub fn rapid_to(
        &mut self,
        x: Option<f64>,
        y: Option<f64>,
        z: Option<f64>,
        feed: Option<f64>,
    ) -> MotionResult<bool> {
        self.move_axes(MoveKind::Rapid, Axes { x, y, z, e: None }, feed)
    }

    pub fn move_e(&mut self, e: f64, feed: Option<f64>) -> MotionResult<bool> {
        self.move_axes(
            MoveKind::Linear,
            Axes {
                e: Some(e),
                ..Default::default()
            },
            feed,
        )
    }

    fn move_axes(&mut self, kind: MoveKind, target: Axes, feed: Option<f64>) -> MotionResult<bool> {
        let decimals = self.config.decimals;
        let current = self.position;
        let changed = |t: Option<f64>, c: Option<f64>| -> Option<f64> {
            let t = round_to(t?, decimals);
            (c != Some(t)).then_some(t)
        };
        let next = Axes {
            x: changed(target.x, current.x),
            y: changed(target.y, current.y),
            z: changed(target.z, current.z),
            e: changed(target.e, current.e),
        };
        if next.is_empty() {
            return Ok(false);
        }

        let words = match self.mode {
            CoordinateMode::Absolute => next,
            CoordinateMode::Relative => {
                let delta = |axis: char, t: Option<f64>, c: Option<f64>| match (t, c) {
                    (None, _) => Ok(None),
                    (Some(t), Some(c)) => Ok(Some(round_to(t - c, decimals))),
                    (Some(_), None) => Err(MotionError::UnknownPosition { axis }),
                };
                Axes {
                    x: delta('X', next.x, current.x)?,
                    y: delta('Y', next.y, current.y)?,
                    z: delta('Z', next.z, current.z)?,
                    e: delta('E', next.e, current.e)?,
                }
            }
        };

        self.ensure_mode()?;

        let feed = match feed {
            Some(f) if self.feed != Some(f) => {
                self.feed = Some(f);
                Some(f)
            }
            _ => None,
        };

        self.emit(match kind {
            MoveKind::Rapid => MotionCommand::Rapid { axes: words, feed },
            MoveKind::Linear => MotionCommand::Linear { axes: words, feed },
        })?;

        self.position = Axes {
            x: next.x.or(current.x),
            y: next.y.or(current.y),
            z: next.z.or(current.z),
            e: next.e.or(current.e),
        };
        Ok(true)
    }

    pub fn move_to_travel_z(&mut self) -> MotionResult<bool> {
        let (z, feed) = (self.config.travel_height, self.config.travel_z_feed);
        self.rapid_to(None, None, Some(z), Some(feed))
    }

    fn move_to_depth(&mut self, depth: f64) -> MotionResult<bool> {
        let feed = self.config.plunge_z_feed;
        self.move_to(None, None, Some(-depth), Some(feed))
    }

    /// Lift to travel height, then move in XY.
    pub fn travel_to(&mut self, x: f64, y: f64) -> MotionResult<()> {
        self.move_to_travel_z()?;
        let feed = self.config.travel_xy_feed;
        self.rapid_to(Some(x), Some(y), None, Some(feed))?;
        Ok(())
    }

    /// Descend to the milling depth, then move in XY.
    pub fn mill_to(&mut self, x: f64, y: f64) -> MotionResult<()> {
        let feed = self.config.mill_xy_feed;
        self.mill_to_with_feed(x, y, feed)
    }

    fn mill_to_with_feed(&mut self, x: f64, y: f64, feed: f64) -> MotionResult<()> {
        self.move_to_depth(self.config.plunge_depth)?;
        self.move_to(Some(x), Some(y), None, Some(feed))?;
        Ok(())
    }

    /// Descend to `depth`, then move in XY.
    pub fn cut_to(&mut self, x: f64, y: f64, depth: f64) -> MotionResult<()> {
        self.move_to_depth(depth)?;
        let feed = self.config.cut_xy_feed;
        self.move_to(Some(x), Some(y), None, Some(feed))?;
        Ok(())
    }

    /// Travel over the hole, drill to `depth` (default: configured drill depth) and retract.
    pub fn drill_at(&mut self, x: f64, y: f64, depth: Option<f64>) -> MotionResult<()> {
        self.travel_to(x, y)?;
        self.move_to_depth(depth.unwrap_or(self.config.drill_depth))?;
        self.move_to_travel_z()?;
        Ok(())
    }

    pub fn stop_milling(&mut self) -> MotionResult<()> {
        self.move_to_travel_z()?;
        Ok(())
    }

    pub fn spindle_on(&mut self) -> MotionResult<()> {
        self.move_to_travel_z()?;
        self.comment("Finish all moves")?;
        self.emit(MotionCommand::FinishMoves)?;
        self.comment("Turning spindle on")?;
        self.emit(MotionCommand::SpindleOn {
            direction: self.config.spindle_direction,
            rpm: self.config.spindle_rpm,
        })?;
        self.emit(MotionCommand::Dwell {
            seconds: self.config.spindle_settle_seconds,
        })?;
        let rpm = format_number(self.config.spindle_rpm);
        self.comment(format!("Spindle is on @ {} rpm", rpm))
    }

    pub fn spindle_off(&mut self) -> MotionResult<()> {
        self.move_to_travel_z()?;
        self.comment("Finish all moves")?;
        self.emit(MotionCommand::FinishMoves)?;
        self.comment("Turning spindle off")?;
        self.emit(MotionCommand::SpindleOff)?;
        self.emit(MotionCommand::Dwell {
            seconds: self.config.spindle_settle_seconds,
        })?;
        self.comment("Spindle is off")
    }

    fn prepare_points(&self, path: &Path) -> CamToolResult<Vec<Point>> {
        let simplified = self.backend.simplify(path, self.config.min_xy_step)?;
        if simplified.is_empty() && !path.is_empty() {
            return Err(GeometryError::UnsupportedGeometry(format!(
                "simplifying a {} point path produced nothing",
                path.len()
            ))
            .into());
        }
        Ok(simplified.into_points())
    }

    /// Travel to the start of `path` and mill along it at the plunge depth.
    pub fn mill_path(&mut self, path: &Path, feed: Option<f64>, reverse: bool) -> CamToolResult<()> {
        let mut points = self.prepare_points(path)?;
        if reverse {
            points.reverse();
        }
        let feed = feed.unwrap_or(self.config.mill_xy_feed);
        let mut iter = points.into_iter();
        if let Some(first) = iter.next() {
            self.travel_to(first.x, first.y)?;
        }
        for p in iter {
            self.mill_to_with_feed(p.x, p.y, feed)?;
        }
        Ok(())
    }

    /// Cut along `path` once per pass of `profile`.
    ///
    /// The start point is reached once; afterwards an open path is
    /// traversed back and forth so each pass starts where the last ended.
    pub fn cut_path(&mut self, path: &Path, profile: &CutProfile) -> CamToolResult<()> {
        let mut points = self.prepare_points(path)?;
        let Some(&first) = points.first() else {
            return Ok(());
        };
        let depths = profile.pass_depths();
        debug!("Cutting {} points in {} pass(es)", points.len(), depths.len());

        let mut need_travel = true;
        for depth in depths {
            self.comment(format!("Cut-Depth: {}", format_number(self.round(depth))))?;
            if need_travel {
                self.travel_to(first.x, first.y)?;
                need_travel = false;
            }
            for p in &points {
                self.cut_to(p.x, p.y, depth)?;
            }
            let (start, end) = (points[0], points[points.len() - 1]);
            if !start.approx_eq(&end, 1e-9) {
                self.comment("Reversing movement")?;
                points.reverse();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absolute() -> MachineState<Vec<String>> {
        MachineState::new(MachineConfig::default(), Vec::new())
    }

    fn relative() -> MachineState<Vec<String>> {
        let config = MachineConfig {
            coordinate_mode: CoordinateMode::Relative,
            ..MachineConfig::default()
        };
        MachineState::new(config, Vec::new())
    }

    #[test]
    fn test_first_move_declares_mode() {
        let mut m = absolute();
        assert!(m.move_to(Some(1.0), None, None, None).unwrap());
        assert_eq!(m.sink(), &vec!["G90".to_string(), "G1 X1".to_string()]);
    }

    #[test]
    fn test_mode_switch_is_emitted_once() {
        let mut m = absolute();
        m.set_absolute().unwrap();
        m.set_absolute().unwrap();
        m.set_relative().unwrap();
        m.set_relative().unwrap();
        assert_eq!(m.sink(), &vec!["G90".to_string(), "G91".to_string()]);
    }

    #[test]
    fn test_restore_mode_redeclares() {
        let mut m = absolute();
        m.set_absolute().unwrap();
        m.store_mode();
        m.set_relative().unwrap();
        m.restore_mode();
        assert_eq!(m.mode(), CoordinateMode::Absolute);
        m.zero_all().unwrap();
        m.move_to(Some(1.0), None, None, None).unwrap();
        assert_eq!(m.sink()[3], "G90");
        assert_eq!(m.sink()[4], "G1 X1");
    }

    #[test]
    fn test_absolute_round_trip() {
        let mut m = absolute();
        m.move_to(Some(10.0), Some(10.0), Some(-0.1), None).unwrap();
        let pos = m.position();
        assert_eq!((pos.x, pos.y, pos.z), (Some(10.0), Some(10.0), Some(-0.1)));
        assert_eq!(m.sink().last().unwrap(), "G1 X10 Y10 Z-0.1");
    }

    #[test]
    fn test_relative_emits_deltas() {
        let mut m = relative();
        m.zero_all().unwrap();
        m.move_to(Some(4.0), Some(2.0), Some(1.0), None).unwrap();
        m.move_to(Some(10.0), Some(10.0), Some(-0.1), None).unwrap();
        let pos = m.position();
        assert_eq!((pos.x, pos.y, pos.z), (Some(10.0), Some(10.0), Some(-0.1)));
        assert_eq!(m.sink().last().unwrap(), "G1 X6 Y8 Z-1.1");
    }

    #[test]
    fn test_relative_move_needs_known_position() {
        let mut m = relative();
        let err = m.move_to(Some(1.0), None, None, None).unwrap_err();
        assert!(matches!(err, MotionError::UnknownPosition { axis: 'X' }));
        assert!(m.sink().is_empty());
    }

    #[test]
    fn test_unchanged_axes_and_feed_are_omitted() {
        let mut m = absolute();
        m.move_to(Some(1.0), Some(2.0), None, Some(100.0)).unwrap();
        m.move_to(Some(1.0), Some(3.0), None, Some(100.0)).unwrap();
        m.move_to(Some(1.0), Some(3.0), None, Some(200.0)).unwrap();
        assert_eq!(
            m.sink(),
            &vec![
                "G90".to_string(),
                "G1 X1 Y2 F100".to_string(),
                "G1 Y3".to_string(),
            ]
        );
        // feed is only recorded when a line is written
        assert_eq!(m.feed(), Some(100.0));
    }

    #[test]
    fn test_empty_move_is_noop() {
        let mut m = absolute();
        assert!(!m.move_to(None, None, None, Some(10.0)).unwrap());
        assert!(m.sink().is_empty());
    }

    #[test]
    fn test_rounding_suppresses_tiny_changes() {
        let mut m = absolute();
        m.move_to(Some(1.0), None, None, None).unwrap();
        assert!(!m.move_to(Some(1.000001), None, None, None).unwrap());
        assert_eq!(m.emitted(), 2);
    }

    #[test]
    fn test_travel_to_is_idempotent() {
        let mut m = absolute();
        m.zero_all().unwrap();
        m.travel_to(5.0, 5.0).unwrap();
        let after_first = m.sink().len();
        m.travel_to(5.0, 5.0).unwrap();
        assert_eq!(m.sink().len(), after_first);
        assert_eq!(m.sink()[2], "G0 Z5 F1000");
        assert_eq!(m.sink()[3], "G0 X5 Y5");
    }

    #[test]
    fn test_drill_at_returns_to_travel_height() {
        let mut m = absolute();
        m.zero_all().unwrap();
        m.drill_at(3.0, 4.0, None).unwrap();
        assert_eq!(
            &m.sink()[2..],
            &[
                "G0 Z5 F1000".to_string(),
                "G0 X3 Y4".to_string(),
                "G1 Z-2 F50".to_string(),
                "G0 Z5 F1000".to_string(),
            ]
        );
    }

    #[test]
    fn test_probe_zero_sequence() {
        let mut m = absolute();
        m.probe_zero().unwrap();
        assert_eq!(
            m.sink(),
            &vec![
                "; Enable continuity probe".to_string(),
                "M746 S1".to_string(),
                "G38".to_string(),
                "; Set zero Z to current position".to_string(),
                "G92 Z0".to_string(),
                "M746 S0".to_string(),
                "; Disable continuity probe".to_string(),
            ]
        );
        assert_eq!(m.position().z, Some(0.0));
    }

    #[test]
    fn test_home_makes_position_known() {
        let mut m = relative();
        m.home().unwrap();
        m.move_to(Some(2.0), Some(3.0), None, None).unwrap();
        assert_eq!(
            m.sink(),
            &vec!["G28".to_string(), "G91".to_string(), "G1 X2 Y3".to_string()]
        );
    }

    #[test]
    fn test_move_e_tracks_extra_axis() {
        let mut m = relative();
        m.zero_all().unwrap();
        assert!(m.move_e(1.5, Some(30.0)).unwrap());
        assert!(m.move_e(4.0, None).unwrap());
        assert!(!m.move_e(4.0, None).unwrap());
        assert_eq!(m.sink()[2], "G1 E1.5 F30");
        assert_eq!(m.sink()[3], "G1 E2.5");
        assert_eq!(m.position().e, Some(4.0));
    }

    #[test]
    fn test_spindle_on_lifts_first() {
        let mut m = absolute();
        m.zero_all().unwrap();
        m.spindle_on().unwrap();
        let lines = m.sink();
        assert_eq!(lines[2], "G0 Z5 F1000");
        assert!(lines.contains(&"M3 S10000".to_string()));
        assert!(lines.contains(&"G4 S3".to_string()));
        assert_eq!(lines.last().unwrap(), "; Spindle is on @ 10000 rpm");
    }

    #[test]
    fn test_config_validation() {
        assert!(MachineConfig::default().validate().is_ok());
        let config = MachineConfig {
            travel_height: 0.0,
            ..MachineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = MachineConfig {
            coordinate_mode: CoordinateMode::Relative,
            zero_origin_at_start: false,
            ..MachineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParameterError::Incompatible(_))
        ));
    }
}
