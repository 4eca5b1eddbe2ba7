//! 2D plane-stress finite element analysis of polygonal elastic bodies.
//!
//! A polygon (optionally with interior holes and scattered interior points)
//! is triangulated into a constrained Delaunay mesh, each triangle becomes
//! a linear constant-strain element, and applied point loads propagate
//! through an assembled global stiffness system to per-point displacements
//! and per-element strain/stress.
//!
//! The pipeline is three calls: build a [`Polygon`], run
//! [`mesher::triangulate`], feed the triangles to [`solver::run`].

pub mod element;
pub mod error;
pub mod geometry;
pub mod input;
pub mod mesher;
pub mod polygon;
pub mod post_processor;
pub mod solver;

pub use element::{FiniteElement, Force, Material};
pub use error::OlivineError;
pub use geometry::{Edge, Point, Triangle};
pub use polygon::{Hole, Polygon};
pub use solver::Analysis;
