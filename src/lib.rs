//! Placard is a deterministic card-template layout and compositing engine.
//!
//! An operator lays out positioned, styled placeholders ("fields") over a
//! background template image; each participant submission is then composited
//! into a final raster card at the template's native resolution. The public
//! API is split along that seam:
//!
//! - Build and edit a field list with an [`EditorSession`]
//! - Persist it through a [`RecordStore`] (legacy pixel records are migrated
//!   on load)
//! - Wait on the [`FontGate`], then run the [`Compositor`] and hand the PNG
//!   to an [`ObjectSink`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod foundation;

pub mod editor;
pub mod export;
pub mod fonts;
pub mod model;
pub mod render;
pub mod session;
pub mod store;

pub use crate::foundation::core::{Canvas, Rgba8};
pub use crate::foundation::error::{PlacardError, PlacardResult};

pub use crate::editor::history::History;
pub use crate::editor::session::{EditorSession, SurfaceSize};
pub use crate::export::{MemorySink, ObjectSink, encode_png};
pub use crate::fonts::{FontGate, FontGateOpts, FontLibrary, FontSpec, GateOutcome};
pub use crate::model::field::{
    Field, FieldKind, FieldShape, FieldStyle, PctRect, Shadow, TextAlign, TextStyle, normalize,
};
pub use crate::model::project::{Project, SubmissionRecord, SubmissionValues};
pub use crate::render::assets::{PreparedImage, decode_image, decode_photo_upload};
pub use crate::render::backend::FrameRGBA;
pub use crate::render::compositor::Compositor;
pub use crate::session::{
    GenerateFlow, GenerateRequest, GeneratedCard, RenderTicket, generate_card,
    validate_submission,
};
pub use crate::store::{FieldRecord, MemoryStore, RecordStore, load_fields, save_fields};
