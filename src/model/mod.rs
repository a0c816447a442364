//! The normalized field/template data model.
//!
//! Everything downstream of this module (editor, persistence, compositor)
//! assumes fields have passed through [`field::normalize`]; the model is the
//! single place where geometry and style ranges are enforced.

pub mod field;
pub mod migrate;
pub mod project;
