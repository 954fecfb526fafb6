//! Planar **polygon Boolean operations**, plane clipping and decomposition for
//! brush-style level geometry, built around 2D [BSP](bsp) partitions of each
//! polygon's edges.
//!
//! A [`Polygon`] is a vertex list plus directed index edges on one plane. It can
//! hold several outer loops, holes, or open polylines. Every Boolean operation
//! partitions one operand's edges against the other's [`PlanarPartition`], keeps
//! the pieces on the wanted side, and welds them back into a polygon with
//! [`Polygon::optimize`].
//!
//! # Features
//! #### Default
//! - **f64**: use f64 as Real
//!
//! #### Optional
//! - **f32**: use f32 as Real, this conflicts with f64
//!
//! # Tolerance
//! All predicates compare against [`float_types::tolerance`], which can be set
//! at build time through `BRUSHCSG_TOLERANCE` or once at start-up through
//! [`float_types::set_tolerance`].

#![forbid(unsafe_code)]
#![deny(unused)]
#![warn(clippy::missing_const_for_fn, clippy::approx_constant, clippy::all)]

pub mod bsp;
pub mod decompose;
pub mod edge;
pub mod errors;
pub mod float_types;
pub mod loops;
pub mod plane;
pub mod polygon;
pub mod traits;
pub mod vertex;

#[cfg(any(all(feature = "f64", feature = "f32"), not(any(feature = "f64", feature = "f32"))))]
compile_error!("Either 'f64' or 'f32' feature must be specified, but not both");

pub use bsp::{Classification, IntersectionKind, PlanarPartition};
pub use decompose::{Convex, Decomposer, Triangle};
pub use edge::{Edge2, Edge3};
pub use errors::{PersistError, PolygonError};
pub use loops::{Island, LoopExtractor, Loops};
pub use plane::Plane;
pub use polygon::{ClipPolicy, PlaneClip, Polygon, PolygonFlags};
pub use traits::BooleanOps;
pub use vertex::Vertex;
