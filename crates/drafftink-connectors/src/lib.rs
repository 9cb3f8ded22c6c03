//! DrafftInk Connectors
//!
//! Binding connector ends to shapes and routing orthogonal (elbow)
//! connectors around them.
//!
//! The entry points are [`resolve_binding_strategy`] and
//! [`apply_binding_strategy`] for endpoint drags, [`recompute_elbow_route`]
//! for elbow geometry, and [`propagate_shape_move`] for keeping bound ends
//! attached when a shape moves. Everything reads through
//! [`scene::ElementsMap`] and writes through [`scene::MutableScene`].

pub mod binding;
pub mod collision;
pub mod config;
pub mod distance;
pub mod elbow;
pub mod error;
pub mod geometry;
pub mod heading;
pub mod math;
pub mod scene;
pub mod shapes;

pub use binding::{
    BindingStrategies, BindingStrategy, MovePointsOptions, apply_binding_strategy,
    bind_or_unbind_binding_element, move_connector_points, propagate_shape_move,
    resolve_binding_strategy,
};
pub use config::{BindingConfig, BindingOptions, GlobalBindMode, PropagateOptions, RouteOptions};
pub use distance::distance_to_element;
pub use elbow::{ElbowUpdates, RouteUpdate, recompute_elbow_route};
pub use error::{ConnectorError, ConnectorResult};
pub use heading::Heading;
pub use scene::{ElementsMap, MutableScene, Scene, StagedScene};
pub use shapes::{
    BindableShape, Binding, BindingMode, Connector, Element, ElementId, FixedSegment, ShapeKind,
};
