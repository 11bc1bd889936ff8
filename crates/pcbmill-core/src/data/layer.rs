use crate::error::LoadError;
use crate::geometry::{Point, Shape};
use nalgebra::{Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path as FsPath, PathBuf};
use tracing::{debug, info};

/// What a layer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerClass {
    /// Top copper, isolation milled
    Top,
    /// Bottom copper, isolation milled after mirroring
    Bottom,
    /// Board outline, cut through with holders
    Outline,
    /// Drill hits
    Drill,
}

impl fmt::Display for LayerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
            Self::Outline => write!(f, "outline"),
            Self::Drill => write!(f, "drill"),
        }
    }
}

/// A single drill hole.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrillHit {
    pub position: Point,
    pub diameter: f64,
}

impl DrillHit {
    pub fn new(x: f64, y: f64, diameter: f64) -> Self {
        Self {
            position: Point::new(x, y),
            diameter,
        }
    }
}

/// One layer of a board as delivered by a loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub class: LayerClass,
    #[serde(default)]
    pub shapes: Vec<Shape>,
    #[serde(default)]
    pub drills: Vec<DrillHit>,
    /// Mirror about the Y axis (x -> -x); bottom layers default to mirrored.
    #[serde(default)]
    pub mirror_x: Option<bool>,
    /// Counter-clockwise rotation about the origin, applied before mirroring.
    #[serde(default)]
    pub rotation_deg: f64,
}

impl Layer {
    pub fn new(name: impl Into<String>, class: LayerClass) -> Self {
        Self {
            name: name.into(),
            class,
            shapes: Vec::new(),
            drills: Vec::new(),
            mirror_x: None,
            rotation_deg: 0.0,
        }
    }

    pub fn with_shapes(mut self, shapes: Vec<Shape>) -> Self {
        self.shapes = shapes;
        self
    }

    pub fn with_drills(mut self, drills: Vec<DrillHit>) -> Self {
        self.drills = drills;
        self
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirror_x.unwrap_or(self.class == LayerClass::Bottom)
    }

    fn transform(&self) -> Matrix3<f64> {
        let rotation = Matrix3::new_rotation(self.rotation_deg.to_radians());
        if self.is_mirrored() {
            Matrix3::new_nonuniform_scaling(&Vector2::new(-1.0, 1.0)) * rotation
        } else {
            rotation
        }
    }

    /// Shapes with rotation and mirroring applied, re-normalised.
    pub fn transformed_shapes(&self) -> Vec<Shape> {
        let m = self.transform();
        let apply = move |p: Point| {
            let q = m.transform_point(&Point2::new(p.x, p.y));
            Point::new(q.x, q.y)
        };
        self.shapes
            .iter()
            .map(|s| s.map_points(apply).normalized())
            .collect()
    }

    pub fn transformed_drills(&self) -> Vec<DrillHit> {
        let m = self.transform();
        self.drills
            .iter()
            .map(|hit| {
                let q = m.transform_point(&Point2::new(hit.position.x, hit.position.y));
                DrillHit::new(q.x, q.y, hit.diameter)
            })
            .collect()
    }

    /// Distinct drill diameters in ascending order.
    pub fn drill_diameters(&self) -> Vec<f64> {
        let mut diameters: Vec<f64> = self.drills.iter().map(|d| d.diameter).collect();
        diameters.sort_by(f64::total_cmp);
        diameters.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        diameters
    }

    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::InvalidLayer {
            layer: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("layer name is empty".to_string()));
        }
        if !self.rotation_deg.is_finite() {
            return Err(invalid("rotation is not finite".to_string()));
        }
        if let Some(hit) = self
            .drills
            .iter()
            .find(|d| d.diameter.is_nan() || d.diameter <= 0.0 || !d.position.is_finite())
        {
            return Err(invalid(format!(
                "drill at ({}, {}) has diameter {}",
                hit.position.x, hit.position.y, hit.diameter
            )));
        }
        if let Some(i) = self.shapes.iter().position(|s| !s.exterior.is_valid()) {
            return Err(invalid(format!("shape {} has a degenerate exterior", i)));
        }
        Ok(())
    }
}

/// Whole-board description: every layer of one design.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoardDescription {
    #[serde(default)]
    pub name: String,
    pub layers: Vec<Layer>,
}

/// Something that yields board layers.
pub trait LayerSource {
    fn load_layers(&self) -> Result<Vec<Layer>, LoadError>;
}

/// Loads a [`BoardDescription`] written as JSON by an external converter.
#[derive(Debug, Clone)]
pub struct JsonBoardLoader {
    path: PathBuf,
}

impl JsonBoardLoader {
    pub fn new(path: impl AsRef<FsPath>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn parse(content: &str) -> Result<BoardDescription, LoadError> {
        let board: BoardDescription = serde_json::from_str(content)?;
        for layer in &board.layers {
            layer.validate()?;
        }
        Ok(board)
    }

    pub fn load_board(&self) -> Result<BoardDescription, LoadError> {
        let content = fs::read_to_string(&self.path)?;
        let board = Self::parse(&content)?;
        info!(
            "Loaded board '{}' with {} layer(s) from {:?}",
            board.name,
            board.layers.len(),
            self.path
        );
        Ok(board)
    }
}

impl LayerSource for JsonBoardLoader {
    fn load_layers(&self) -> Result<Vec<Layer>, LoadError> {
        let board = self.load_board()?;
        for layer in &board.layers {
            debug!(
                "Layer '{}' ({}): {} shape(s), {} drill(s)",
                layer.name,
                layer.class,
                layer.shapes.len(),
                layer.drills.len()
            );
        }
        Ok(board.layers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Ring;

    fn unit_square_at(x: f64, y: f64) -> Shape {
        Shape::new(Ring::rectangle(
            Point::new(x, y),
            Point::new(x + 1.0, y + 1.0),
        ))
    }

    #[test]
    fn test_bottom_layer_mirrors_by_default() {
        let layer = Layer::new("bottom", LayerClass::Bottom).with_shapes(vec![unit_square_at(2.0, 0.0)]);
        assert!(layer.is_mirrored());
        let shapes = layer.transformed_shapes();
        let xs: Vec<f64> = shapes[0].exterior.points().iter().map(|p| p.x).collect();
        assert!(xs.iter().all(|x| *x <= -2.0 + 1e-12 && *x >= -3.0 - 1e-12));
        // orientation is restored after mirroring
        assert!(!shapes[0].exterior.is_clockwise());
    }

    #[test]
    fn test_mirror_override() {
        let mut layer = Layer::new("bottom", LayerClass::Bottom);
        layer.mirror_x = Some(false);
        assert!(!layer.is_mirrored());
        assert!(!Layer::new("top", LayerClass::Top).is_mirrored());
    }

    #[test]
    fn test_rotation_applies_to_drills() {
        let mut layer = Layer::new("drill", LayerClass::Drill)
            .with_drills(vec![DrillHit::new(1.0, 0.0, 0.8)]);
        layer.rotation_deg = 90.0;
        let hits = layer.transformed_drills();
        assert!(hits[0].position.approx_eq(&Point::new(0.0, 1.0), 1e-12));
        assert_eq!(hits[0].diameter, 0.8);
    }

    #[test]
    fn test_drill_diameters_are_distinct_and_sorted() {
        let layer = Layer::new("drill", LayerClass::Drill).with_drills(vec![
            DrillHit::new(0.0, 0.0, 1.0),
            DrillHit::new(1.0, 0.0, 0.8),
            DrillHit::new(2.0, 0.0, 1.0),
        ]);
        assert_eq!(layer.drill_diameters(), vec![0.8, 1.0]);
    }

    #[test]
    fn test_validate_rejects_bad_drill() {
        let layer = Layer::new("drill", LayerClass::Drill)
            .with_drills(vec![DrillHit::new(0.0, 0.0, 0.0)]);
        assert!(matches!(
            layer.validate(),
            Err(LoadError::InvalidLayer { .. })
        ));
    }

    #[test]
    fn test_parse_board_json() {
        let json = r#"{
            "name": "blinky",
            "layers": [
                {
                    "name": "top",
                    "class": "top",
                    "shapes": [
                        { "exterior": [ {"x": 0, "y": 0}, {"x": 4, "y": 0}, {"x": 4, "y": 1} ] }
                    ]
                },
                {
                    "name": "drill",
                    "class": "drill",
                    "drills": [ { "position": {"x": 1, "y": 1}, "diameter": 0.8 } ]
                }
            ]
        }"#;
        let board = JsonBoardLoader::parse(json).unwrap();
        assert_eq!(board.name, "blinky");
        assert_eq!(board.layers.len(), 2);
        assert_eq!(board.layers[0].shapes[0].exterior.len(), 3);
        assert_eq!(board.layers[1].class, LayerClass::Drill);
    }

    #[test]
    fn test_load_layers_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");
        let board = BoardDescription {
            name: "test".to_string(),
            layers: vec![Layer::new("outline", LayerClass::Outline)
                .with_shapes(vec![unit_square_at(0.0, 0.0)])],
        };
        fs::write(&path, serde_json::to_string(&board).unwrap()).unwrap();

        let layers = JsonBoardLoader::new(&path).load_layers().unwrap();
        assert_eq!(layers, board.layers);
    }
}
