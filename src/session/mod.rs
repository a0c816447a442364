//! Card generation flow: validate → font gate → composite → encode → upload
//! → record.
//!
//! There is no cancellation token. If a new generation starts while an older
//! one is pending, the older result is simply discarded: tickets from
//! [`GenerateFlow::begin`] are compared against the latest sequence number
//! and stale results never surface.

use crate::export::{ObjectSink, encode_png};
use crate::fonts::{FontGate, FontLibrary, GateOutcome, font_specs_for};
use crate::foundation::error::{PlacardError, PlacardResult};
use crate::model::field::{Field, FieldKind};
use crate::model::project::{Project, SubmissionRecord, SubmissionValues};
use crate::render::assets::PreparedImage;
use crate::render::compositor::Compositor;
use crate::store::RecordStore;

/// Handle for one in-flight render; see [`GenerateFlow::accept`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderTicket(u64);

/// Last-result-wins sequencing for renders triggered from one session.
#[derive(Debug, Default)]
pub struct GenerateFlow {
    latest: u64,
}

impl GenerateFlow {
    /// Fresh flow with no renders issued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket for a new render; any older ticket becomes stale.
    pub fn begin(&mut self) -> RenderTicket {
        self.latest += 1;
        RenderTicket(self.latest)
    }

    /// Pass a finished result through only when its ticket is still the
    /// latest; stale results are dropped so no outdated bitmap is exposed.
    pub fn accept<T>(&self, ticket: RenderTicket, value: T) -> Option<T> {
        (ticket.0 == self.latest).then_some(value)
    }
}

/// Check a submission against the project and field list before rendering.
///
/// This is the gate that keeps generation all-or-nothing: inactive projects,
/// missing photos and blank text values are rejected up front.
pub fn validate_submission(
    project: &Project,
    fields: &[Field],
    values: &SubmissionValues,
) -> PlacardResult<()> {
    if !project.is_active() {
        return Err(PlacardError::validation(
            "project is not accepting submissions",
        ));
    }
    let needs_photo = fields.iter().any(|f| f.kind == FieldKind::Photo);
    if needs_photo && values.photo.is_none() {
        return Err(PlacardError::validation("a photo is required"));
    }
    for field in fields.iter().filter(|f| f.kind == FieldKind::Text) {
        if values.text(&field.name).is_none() {
            return Err(PlacardError::validation(format!(
                "missing value for '{}'",
                field.name
            )));
        }
    }
    Ok(())
}

/// Everything one generation needs, bundled so call sites stay readable.
pub struct GenerateRequest<'a> {
    /// The project being rendered; must be active.
    pub project: &'a Project,
    /// Normalized field list (usually via [`crate::load_fields`]).
    pub fields: &'a [Field],
    /// Decoded template background at native resolution.
    pub template: &'a PreparedImage,
    /// Participant values.
    pub values: &'a SubmissionValues,
    /// Original encoded photo upload `(bytes, content_type)`, stored
    /// alongside the generated card when present.
    pub photo_upload: Option<(&'a [u8], &'a str)>,
    /// Draw the branding watermark (non-paying tier).
    pub watermark: bool,
}

/// A completed generation.
#[derive(Clone, Debug)]
pub struct GeneratedCard {
    /// Public URL of the uploaded card PNG.
    pub card_url: String,
    /// Public URL of the uploaded participant photo, if one was provided.
    pub photo_url: Option<String>,
    /// Whether the font gate resolved or timed out (logged degradation).
    pub gate: GateOutcome,
}

/// Run one full generation: validate, wait for fonts, composite, encode,
/// upload, and record the submission.
///
/// Resource failures (decode, render, upload, store) abort the whole flow
/// with an error and nothing partial is persisted or returned. A font-gate
/// timeout is NOT an error; rendering proceeds with the available faces.
pub fn generate_card(
    req: &GenerateRequest<'_>,
    fonts: &mut FontLibrary,
    gate: FontGate,
    store: &mut dyn RecordStore,
    sink: &mut dyn ObjectSink,
) -> PlacardResult<GeneratedCard> {
    validate_submission(req.project, req.fields, req.values)?;

    let specs = font_specs_for(req.fields);
    let gate_outcome = gate.wait_ready(fonts, &specs);

    let photo_url = match req.photo_upload {
        Some((bytes, content_type)) => Some(sink.upload(bytes, content_type)?),
        None => None,
    };

    let frame = Compositor::new(fonts).render(
        req.template,
        req.fields,
        req.values,
        req.watermark,
    )?;
    let png = encode_png(&frame)?;
    let card_url = sink.upload(&png, "image/png")?;

    store.insert_submission(&SubmissionRecord {
        project_id: req.project.id.clone(),
        participant_name: req.values.participant_name(),
        photo_url: photo_url.clone(),
        generated_card_url: card_url.clone(),
        field_values: req.values.texts.clone(),
    })?;

    tracing::info!(
        project = %req.project.id,
        card = %card_url,
        "card generated"
    );
    Ok(GeneratedCard {
        card_url,
        photo_url,
        gate: gate_outcome,
    })
}
