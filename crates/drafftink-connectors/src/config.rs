//! Binding and routing configuration.
//!
//! Everything the interaction layer knows about the current gesture is
//! passed in explicitly through these values.

use crate::shapes::{ElementId, Roundness};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Gap between a shape outline and an orbiting endpoint.
pub const FIXED_BINDING_DISTANCE: f64 = 5.0;

/// Hover distance for binding at zoom 1.
pub const BASE_BINDING_DISTANCE: f64 = 15.0;

/// Padding kept around shapes by elbow routes.
pub const BASE_PADDING: f64 = 40.0;

/// Points closer than this are merged.
pub const DEDUP_THRESHOLD: f64 = 1.0;

/// Coordinates beyond this magnitude are clamped.
pub const MAX_POS: f64 = 1e6;

/// Shortest two-point arrow between two shapes before it counts as nested.
pub const MIN_SIMPLE_ARROW_LENGTH: f64 = 40.0;

/// Fixed-point ratios closer than this to 0.5 are nudged off center.
pub const FIXED_POINT_EPSILON: f64 = 1e-4;

pub const DEFAULT_ADAPTIVE_RADIUS: f64 = Roundness::DEFAULT_ADAPTIVE_RADIUS;
pub const DEFAULT_PROPORTIONAL_RADIUS: f64 = Roundness::DEFAULT_PROPORTIONAL_RADIUS;

/// Hover distance for binding at a given zoom level.
pub fn max_binding_distance(zoom: f64) -> f64 {
    let zoom = if zoom > 0.0 { zoom.min(1.0) } else { 1.0 };
    (BASE_BINDING_DISTANCE / (zoom * 1.5)).clamp(BASE_BINDING_DISTANCE, 2.0 * BASE_BINDING_DISTANCE)
}

/// Global bind mode chosen by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlobalBindMode {
    /// Binding disabled.
    Off,
    /// Always bind inside the hovered shape.
    Inside,
    /// Bind onto the outline.
    #[default]
    Orbit,
    /// Like `Inside`, used while the user holds the skip modifier.
    Skip,
}

impl GlobalBindMode {
    pub fn forces_inside(self) -> bool {
        matches!(self, GlobalBindMode::Inside | GlobalBindMode::Skip)
    }
}

/// Read-only slice of application state the resolver needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    pub bind_mode: GlobalBindMode,
    pub zoom: f64,
    /// Scene point where the current drag started.
    pub drag_origin: Option<Point>,
    /// The new connector's start point was placed inside its shape.
    pub start_is_inside: bool,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            bind_mode: GlobalBindMode::default(),
            zoom: 1.0,
            drag_origin: None,
            start_is_inside: false,
        }
    }
}

impl BindingConfig {
    pub fn with_mode(bind_mode: GlobalBindMode) -> Self {
        Self {
            bind_mode,
            ..Default::default()
        }
    }

    pub fn max_binding_distance(&self) -> f64 {
        max_binding_distance(self.zoom)
    }
}

/// Gesture flags for strategy resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingOptions {
    /// The connector is being created by this drag.
    pub new_arrow: bool,
    /// The pointer was released.
    pub finalize: bool,
    /// Alt held: bind inside without snapping.
    pub alt_key: bool,
}

/// Options for the elbow engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteOptions {
    /// Endpoints follow the pointer; hover targets are hit-tested live.
    pub is_dragging: bool,
    pub zoom: f64,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            is_dragging: false,
            zoom: 1.0,
        }
    }
}

/// Options for propagating a shape move to its connectors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagateOptions {
    /// Elements moved in the same gesture; their connectors are left alone.
    pub simultaneously_updated: HashSet<ElementId>,
    /// New size of the moved shape when it is being resized.
    pub new_size: Option<(f64, f64)>,
    pub zoom: Option<f64>,
}
