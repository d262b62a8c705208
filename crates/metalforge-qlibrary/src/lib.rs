//! # MetalForge Component Library
//!
//! Ready-made components for the MetalForge kernel. Each one declares its
//! default options as a static table and builds its geometry through
//! [`metalforge_core::Buildable`].

pub mod rectangle;
pub mod short_to_ground;

pub use rectangle::Rectangle;
pub use short_to_ground::ShortToGround;
