//! Board data produced by design-file loaders
//!
//! This module provides:
//! - Layer classification (top/bottom copper, outline, drill)
//! - Layer transforms (rotation and mirroring for bottom-side work)
//! - The loader capability and a JSON board loader

mod layer;

pub use layer::{BoardDescription, DrillHit, JsonBoardLoader, Layer, LayerClass, LayerSource};
