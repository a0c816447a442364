//! The compositor: template image + ordered field list + submitted values →
//! final bitmap.
//!
//! Rendering is a pure function of its inputs. The raster backend is
//! `vello_cpu`; each invocation builds fresh scratch state, so two renders of
//! the same inputs are pixel-identical.

pub mod assets;
pub mod backend;
pub mod blur;
pub mod compositor;
pub(crate) mod shape;
pub mod text;
