//! Whole-operation sequencing on top of [`MachineState`].
//!
//! One [`CutOrchestrator`] drives one output stream. Every executed
//! [`Operation`] is wrapped in the same preamble (origin, probe, mode,
//! spindle on) and epilogue (travel height, spindle off), and the sink is
//! flushed on every exit path, including failures.

use crate::error::CamToolResult;
use crate::gcode::command::format_number;
use crate::gcode::{CommandSink, CutProfile, MachineConfig, MachineState};
use crate::toolpath::ordering::order_drills;
use pcbmill_core::{DrillHit, Path, Point};
use tracing::{debug, error, info, warn};

/// A unit of work emitted between one spindle-on and spindle-off.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Isolation milling at the plunge depth.
    Mill(Vec<Path>),
    /// Drill every hit of one diameter.
    Drill { diameter: f64, hits: Vec<DrillHit> },
    /// Multi-pass cutting along `profile`.
    Cut { paths: Vec<Path>, profile: CutProfile },
    /// Outline cut that leaves holding tabs: `outline` is cut down to the
    /// top of the tab band with `profile`, then the `holders` paths (gapped
    /// exteriors and whole cutouts) are cut through the band with
    /// `holder_profile`.
    CutWithHolders {
        outline: Vec<Path>,
        holders: Vec<Path>,
        profile: CutProfile,
        holder_profile: CutProfile,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mill(_) => "mill",
            Self::Drill { .. } => "drill",
            Self::Cut { .. } => "cut",
            Self::CutWithHolders { .. } => "cut-with-holders",
        }
    }

    /// True when there is nothing to emit.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Mill(paths) | Self::Cut { paths, .. } => paths.is_empty(),
            Self::Drill { hits, .. } => hits.is_empty(),
            Self::CutWithHolders {
                outline, holders, ..
            } => outline.is_empty() && holders.is_empty(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationOutcome {
    /// Number of paths (or holes) emitted.
    Completed { paths: usize },
    Skipped,
}

pub struct CutOrchestrator<S: CommandSink> {
    machine: MachineState<S>,
}

impl<S: CommandSink> CutOrchestrator<S> {
    pub fn new(machine: MachineState<S>) -> Self {
        Self { machine }
    }

    pub fn from_config(config: MachineConfig, sink: S) -> CamToolResult<Self> {
        config.validate()?;
        Ok(Self::new(MachineState::new(config, sink)))
    }

    pub fn machine(&self) -> &MachineState<S> {
        &self.machine
    }

    pub fn into_sink(self) -> S {
        self.machine.into_sink()
    }

    /// Emit `operation` framed by the preamble and epilogue.
    ///
    /// Empty operations are skipped without touching the sink. When the
    /// body fails, the machine is still lifted and the spindle stopped
    /// before the error is returned.
    pub fn execute(&mut self, operation: &Operation) -> CamToolResult<OperationOutcome> {
        if operation.is_empty() {
            warn!("Skipping empty {} operation", operation.name());
            return Ok(OperationOutcome::Skipped);
        }

        let result = self.begin().and_then(|_| self.run_body(operation));
        match result {
            Ok(count) => {
                let finished = self.end();
                let flushed = self.machine.flush();
                finished?;
                flushed?;
                info!("Completed {} operation with {} item(s)", operation.name(), count);
                Ok(OperationOutcome::Completed { paths: count })
            }
            Err(err) => {
                error!("{} operation failed: {}", operation.name(), err);
                if let Err(end_err) = self.end() {
                    warn!("Could not reach a safe state: {}", end_err);
                }
                if let Err(flush_err) = self.machine.flush() {
                    warn!("Could not flush output: {}", flush_err);
                }
                Err(err)
            }
        }
    }

    /// Origin, optional probe, coordinate mode and spindle start.
    pub fn begin(&mut self) -> CamToolResult<()> {
        let config = self.machine.config().clone();
        if config.zero_origin_at_start {
            self.machine.zero_all()?;
        }
        if config.use_probe {
            self.machine.probe_zero()?;
        }
        self.machine.set_mode(config.coordinate_mode)?;
        self.machine.spindle_on()?;
        Ok(())
    }

    pub fn end(&mut self) -> CamToolResult<()> {
        self.machine.stop_milling()?;
        self.machine.spindle_off()?;
        Ok(())
    }

    fn run_body(&mut self, operation: &Operation) -> CamToolResult<usize> {
        match operation {
            Operation::Mill(paths) => self.mill(paths),
            Operation::Drill { diameter, hits } => self.drill(*diameter, hits),
            Operation::Cut { paths, profile } => self.cut(paths, profile),
            Operation::CutWithHolders {
                outline,
                holders,
                profile,
                holder_profile,
            } => {
                self.machine.comment("Cutting")?;
                let mut count = self.cut(outline, profile)?;
                self.machine.comment("Cutting Holders")?;
                count += self.cut(holders, holder_profile)?;
                Ok(count)
            }
        }
    }

    fn mill(&mut self, paths: &[Path]) -> CamToolResult<usize> {
        for (i, path) in paths.iter().enumerate() {
            self.machine.comment(format!("Path #{}", i + 1))?;
            self.machine.mill_path(path, None, false)?;
        }
        Ok(paths.len())
    }

    fn cut(&mut self, paths: &[Path], profile: &CutProfile) -> CamToolResult<usize> {
        debug!(
            "Cutting {} path(s) from {} to {} in steps of {}",
            paths.len(),
            profile.start(),
            profile.end(),
            profile.step()
        );
        for (i, path) in paths.iter().enumerate() {
            self.machine.comment(format!("Path #{}", i + 1))?;
            self.machine.cut_path(path, profile)?;
        }
        Ok(paths.len())
    }

    fn drill(&mut self, diameter: f64, hits: &[DrillHit]) -> CamToolResult<usize> {
        self.machine
            .comment(format!("Drill {}mm", format_number(diameter)))?;
        let position = self.machine.position();
        let start = Point::new(position.x.unwrap_or(0.0), position.y.unwrap_or(0.0));
        let ordered = order_drills(hits.to_vec(), start);
        for hit in &ordered {
            self.machine
                .drill_at(hit.position.x, hit.position.y, None)?;
        }
        Ok(ordered.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::CoordinateMode;
    use pcbmill_core::Ring;

    fn config() -> MachineConfig {
        MachineConfig {
            coordinate_mode: CoordinateMode::Absolute,
            ..MachineConfig::default()
        }
    }

    fn orchestrator(config: MachineConfig) -> CutOrchestrator<Vec<String>> {
        CutOrchestrator::from_config(config, Vec::new()).unwrap()
    }

    fn square(x: f64, y: f64, size: f64) -> Path {
        Ring::rectangle(Point::new(x, y), Point::new(x + size, y + size)).to_path()
    }

    #[test]
    fn test_empty_operation_is_skipped() {
        let mut o = orchestrator(config());
        let outcome = o.execute(&Operation::Mill(Vec::new())).unwrap();
        assert_eq!(outcome, OperationOutcome::Skipped);
        assert!(o.into_sink().is_empty());
    }

    #[test]
    fn test_preamble_and_epilogue() {
        let mut o = orchestrator(config());
        let outcome = o
            .execute(&Operation::Mill(vec![square(0.0, 0.0, 1.0)]))
            .unwrap();
        assert_eq!(outcome, OperationOutcome::Completed { paths: 1 });

        let lines = o.into_sink();
        assert_eq!(lines[0], "G92 X0 Y0 Z0");
        assert_eq!(lines[1], "G90");
        assert_eq!(lines[2], "G0 Z5 F1000");
        assert_eq!(lines[3], "; Finish all moves");
        assert_eq!(lines[4], "M400");
        assert!(lines.contains(&"M3 S10000".to_string()));
        assert!(lines.contains(&"; Path #1".to_string()));

        let tail: Vec<&str> = lines[lines.len() - 4..].iter().map(String::as_str).collect();
        assert_eq!(tail, vec!["; Turning spindle off", "M5", "G4 S3", "; Spindle is off"]);
    }

    #[test]
    fn test_probe_runs_before_spindle() {
        let mut o = orchestrator(MachineConfig {
            use_probe: true,
            ..config()
        });
        o.execute(&Operation::Mill(vec![square(0.0, 0.0, 1.0)]))
            .unwrap();
        let lines = o.into_sink();
        let probe = lines.iter().position(|l| l == "G38").unwrap();
        let spindle = lines.iter().position(|l| l.starts_with("M3")).unwrap();
        assert!(probe < spindle);
        assert!(lines.contains(&"M746 S1".to_string()));
        assert!(lines.contains(&"M746 S0".to_string()));
    }

    #[test]
    fn test_drill_orders_hits_and_comments_diameter() {
        let mut o = orchestrator(config());
        let hits = vec![
            DrillHit::new(10.0, 2.0, 0.8),
            DrillHit::new(1.0, 3.0, 0.8),
        ];
        let outcome = o
            .execute(&Operation::Drill {
                diameter: 0.8,
                hits,
            })
            .unwrap();
        assert_eq!(outcome, OperationOutcome::Completed { paths: 2 });

        let lines = o.into_sink();
        assert!(lines.contains(&"; Drill 0.8mm".to_string()));
        let first = lines.iter().position(|l| l == "G0 X1 Y3").unwrap();
        let second = lines.iter().position(|l| l.starts_with("G0 X10 Y2")).unwrap();
        assert!(first < second);
        // spindle start lift plus one retract per hole
        assert_eq!(lines.iter().filter(|l| l.as_str() == "G1 Z-2 F50").count(), 2);
        assert_eq!(lines.iter().filter(|l| l.as_str() == "G0 Z5 F1000").count(), 3);
    }

    #[test]
    fn test_holders_band_follows_outline_cut() {
        let mut o = orchestrator(config());
        let outline = vec![square(0.0, 0.0, 10.0)];
        let holders = vec![Path::new(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)])];
        let op = Operation::CutWithHolders {
            outline,
            holders,
            profile: CutProfile::new(0.0, 0.8, 0.4).unwrap(),
            holder_profile: CutProfile::new(0.8, 1.6, 0.4).unwrap(),
        };
        assert_eq!(o.execute(&op).unwrap(), OperationOutcome::Completed { paths: 2 });

        let lines = o.into_sink();
        let cutting = lines.iter().position(|l| l == "; Cutting").unwrap();
        let holders = lines.iter().position(|l| l == "; Cutting Holders").unwrap();
        assert!(cutting < holders);
        let depths: Vec<&str> = lines
            .iter()
            .filter(|l| l.starts_with("; Cut-Depth"))
            .map(String::as_str)
            .collect();
        assert_eq!(
            depths,
            vec![
                "; Cut-Depth: 0.4",
                "; Cut-Depth: 0.8",
                "; Cut-Depth: 1.2",
                "; Cut-Depth: 1.6"
            ]
        );
        // the outline never reaches the tab band
        let before_holders = &lines[..holders];
        assert!(!before_holders.iter().any(|l| l.contains("Z-1.2")));
    }

    #[test]
    fn test_failure_still_stops_spindle() {
        let mut o = orchestrator(config());
        let bad = Path::new(vec![Point::new(f64::NAN, 0.0), Point::new(1.0, 1.0)]);
        let result = o.execute(&Operation::Mill(vec![bad]));
        assert!(result.is_err());
        let lines = o.into_sink();
        assert!(lines.contains(&"M3 S10000".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("; Spindle is off"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = MachineConfig {
            travel_height: -1.0,
            ..config()
        };
        assert!(CutOrchestrator::from_config(config, Vec::<String>::new()).is_err());
    }
}
