//! Job configuration for PCBMill
//!
//! A [`JobConfig`] holds every tunable of a board job: heights and depths,
//! bit diameters, feed rates, spindle and probe settings, and the holder
//! (tab) geometry for outline cutting. Files are JSON or TOML, chosen by
//! extension, with kebab-case keys. Missing keys take their defaults.

use crate::error::{SettingsError, SettingsResult};
use pcbmill_camtools::{
    CoordinateMode, CutProfile, GeneratorSettings, HoldersToolpath, MachineConfig,
    SpindleDirection,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Complete job configuration.
///
/// Heights and depths are positive millimetres; speeds are mm/min.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct JobConfig {
    /// Safe Z height above the board for travel moves
    pub travel_height: f64,
    /// Final depth of outline cutting
    pub cut_depth: f64,
    /// Depth increment per cutting pass
    pub cut_step: f64,
    /// Milling depth for isolation routing
    pub plunge_depth: f64,
    pub drill_depth: f64,
    /// Isolation tool diameter
    pub mill_bit_diameter: f64,
    /// Outline cutting tool diameter
    pub cut_bit_diameter: f64,
    pub spindle_speed: f64,
    pub spindle_direction: SpindleDirection,
    pub spindle_settle_seconds: f64,
    pub milling_xy_speed: f64,
    pub cutting_xy_speed: f64,
    /// Z feed for plunges and drilling
    pub drilling_z_speed: f64,
    pub travel_xy_speed: f64,
    pub travel_z_speed: f64,
    /// Zero Z on the copper with the continuity probe before each file
    pub use_continuity_probe: bool,
    /// Leave tabs when cutting the outline
    pub use_holders: bool,
    /// Width of the tab left in the material
    pub holder_size: f64,
    /// Thickness of the tab, measured from the bottom of the board
    pub holder_height: f64,
    /// Outline edges shorter than this get no tab
    pub holder_min_length: f64,
    pub pcb_thickness: f64,
    /// Simplification tolerance applied before emission
    pub min_xy_step: f64,
    pub decimals: u32,
    pub coordinate_mode: CoordinateMode,
    /// Bridge neighbouring isolation paths into fewer passes
    pub connect_paths: bool,
    /// Nearest-neighbour ordering of generated paths
    pub order_paths: bool,
    /// Emit `G92 X0 Y0 Z0` so the start position becomes the job origin
    pub zero_origin_at_start: bool,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            travel_height: 2.0,
            cut_depth: 1.65,
            cut_step: 0.2,
            plunge_depth: 0.25,
            drill_depth: 2.0,
            mill_bit_diameter: 0.4,
            cut_bit_diameter: 2.1,
            spindle_speed: 15000.0,
            spindle_direction: SpindleDirection::Clockwise,
            spindle_settle_seconds: 3.0,
            milling_xy_speed: 80.0,
            cutting_xy_speed: 150.0,
            drilling_z_speed: 50.0,
            travel_xy_speed: 5000.0,
            travel_z_speed: 1000.0,
            use_continuity_probe: true,
            use_holders: true,
            holder_size: 2.0,
            holder_height: 0.8,
            holder_min_length: 10.0,
            pcb_thickness: 1.6,
            min_xy_step: 0.01,
            decimals: 5,
            coordinate_mode: CoordinateMode::Relative,
            connect_paths: false,
            order_paths: false,
            zero_origin_at_start: true,
        }
    }
}

enum Format {
    Json,
    Toml,
}

fn format_of(path: &Path) -> SettingsResult<Format> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(Format::Json),
        Some("toml") => Ok(Format::Toml),
        other => Err(SettingsError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<config dir>/pcbmill/config.toml`, falling back to the home directory.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("pcbmill");
        path.push("config.toml");
        path
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = format_of(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config: Self = match format {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        info!("Loaded job configuration from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match format_of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        debug!("Saved job configuration to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        let positive = [
            ("cut-depth", self.cut_depth),
            ("cut-step", self.cut_step),
            ("mill-bit-diameter", self.mill_bit_diameter),
            ("cut-bit-diameter", self.cut_bit_diameter),
            ("pcb-thickness", self.pcb_thickness),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::invalid(
                    key,
                    format!("must be > 0, got {}", value),
                ));
            }
        }

        if self.use_holders {
            if !(self.holder_size.is_finite() && self.holder_size >= 0.0) {
                return Err(SettingsError::invalid(
                    "holder-size",
                    "must not be negative",
                ));
            }
            if !(self.holder_min_length.is_finite() && self.holder_min_length >= 0.0) {
                return Err(SettingsError::invalid(
                    "holder-min-length",
                    "must not be negative",
                ));
            }
            if !(self.holder_height > 0.0 && self.holder_height < self.pcb_thickness) {
                return Err(SettingsError::invalid(
                    "holder-height",
                    format!(
                        "must lie between 0 and pcb-thickness ({}), got {}",
                        self.pcb_thickness, self.holder_height
                    ),
                ));
            }
            if self.pcb_thickness - self.holder_height > self.cut_depth {
                return Err(SettingsError::invalid(
                    "cut-depth",
                    "does not reach the top of the holders",
                ));
            }
        }

        self.machine_config().validate()?;
        self.cut_profiles()?;
        Ok(())
    }

    /// Machine settings for one output file.
    pub fn machine_config(&self) -> MachineConfig {
        MachineConfig {
            travel_height: self.travel_height,
            plunge_depth: self.plunge_depth,
            drill_depth: self.drill_depth,
            travel_xy_feed: self.travel_xy_speed,
            travel_z_feed: self.travel_z_speed,
            mill_xy_feed: self.milling_xy_speed,
            cut_xy_feed: self.cutting_xy_speed,
            plunge_z_feed: self.drilling_z_speed,
            spindle_rpm: self.spindle_speed,
            spindle_direction: self.spindle_direction,
            spindle_settle_seconds: self.spindle_settle_seconds,
            min_xy_step: self.min_xy_step,
            decimals: self.decimals,
            coordinate_mode: self.coordinate_mode,
            use_probe: self.use_continuity_probe,
            zero_origin_at_start: self.zero_origin_at_start,
        }
    }

    /// Depth ladders for outline cutting.
    ///
    /// With holders the outline is cut down to the top of the tabs and the
    /// second profile covers the tab band down to `cut-depth`.
    pub fn cut_profiles(&self) -> SettingsResult<(CutProfile, Option<CutProfile>)> {
        let profile = |start: f64, end: f64| {
            CutProfile::new(start, end, self.cut_step)
                .map_err(|e| SettingsError::invalid("cut-step", e.to_string()))
        };
        if self.use_holders {
            let holder_top = self.pcb_thickness - self.holder_height;
            Ok((
                profile(0.0, holder_top)?,
                Some(profile(holder_top, self.cut_depth)?),
            ))
        } else {
            Ok((profile(0.0, self.cut_depth)?, None))
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            connect: self.connect_paths,
            order: self.order_paths,
        }
    }

    pub fn holders_toolpath(&self) -> HoldersToolpath {
        HoldersToolpath::new(self.holder_size, self.holder_min_length)
    }
}
