//! # MetalForge Core
//!
//! Parametric component kernel for planar circuit layout: unit-aware option
//! parsing, 2-D geometry primitives with rotate/translate, per-component
//! element and pin registries, and the design aggregate that owns built
//! components.
//!
//! All lengths are micrometers and all angles are degrees once parsed.

pub mod component;
pub mod design;
pub mod error;
pub mod geometry;
pub mod params;
pub mod registry;
pub mod transform;
pub mod units;

pub use component::{BuildContext, BuildState, Buildable, Component, ComponentId};
pub use design::{Design, DesignSettings, Net, PinRef};
pub use error::{ComponentError, GeometryError, ParameterError, RegistrationError, StateError};
pub use geometry::{BBox, LineString, Point, Polygon, Shape};
pub use params::{OptionTemplate, Options, ParamValue, ParsedParameters};
pub use registry::{ElementKind, ElementOptions, GeometryElement, LayerId, Pin, PinOptions, Registrations};
