use std::collections::BTreeMap;

use kurbo::Point;
use placard::{
    EditorSession, Field, FieldRecord, FontGate, FontLibrary, GateOutcome, GenerateRequest,
    MemorySink, MemoryStore, PctRect, PreparedImage, Project, RecordStore, SubmissionValues,
    SurfaceSize, generate_card, load_fields, normalize, save_fields,
};

fn active_project() -> Project {
    Project {
        id: "p1".into(),
        name: "Conference badges".into(),
        template_image_url: "mem://template".into(),
        status: "active".into(),
    }
}

fn solid_image(width: u32, height: u32, px: [u8; 4]) -> PreparedImage {
    PreparedImage::from_premul(width, height, px.repeat((width * height) as usize)).unwrap()
}

#[test]
fn edit_save_reload_round_trip_with_legacy_migration() {
    let mut store = MemoryStore::new();

    // Seed one legacy pixel record and one modern record.
    let legacy = FieldRecord {
        x_position: 400.0,
        y_position: 300.0,
        width: 160.0,
        height: 120.0,
        ..FieldRecord::from_field(&Field::photo("legacy"))
    };
    let modern = FieldRecord::from_field(&normalize(Field::text("modern")));
    store.replace_all_fields("p1", &[legacy, modern]).unwrap();

    // Load applies migration transparently.
    let fields = load_fields(&store, "p1").unwrap();
    assert_eq!(fields[0].rect, PctRect::new(50.0, 50.0, 20.0, 20.0));

    // Drag the migrated field in the editor, then save.
    let mut session = EditorSession::new(
        fields,
        SurfaceSize {
            width: 800.0,
            height: 600.0,
        },
    );
    assert!(session.begin_drag("legacy", Point::new(400.0, 300.0)));
    session.pointer_moved(Point::new(80.0, 60.0));
    session.end_interaction();
    save_fields(&mut store, "p1", session.fields()).unwrap();

    // Reload: values come back as the saved percentages, no re-migration.
    let reloaded = load_fields(&store, "p1").unwrap();
    assert_eq!(reloaded[0].rect, PctRect::new(10.0, 10.0, 20.0, 20.0));
    assert_eq!(reloaded, session.fields());
}

#[test]
fn generate_card_uploads_png_and_records_submission() {
    let mut store = MemoryStore::new();
    let mut sink = MemorySink::new();
    let mut fonts = FontLibrary::new();
    let project = active_project();

    let mut photo_field = Field::photo("p");
    photo_field.rect = PctRect::new(10.0, 10.0, 50.0, 50.0);
    let fields = vec![normalize(photo_field)];

    let template = solid_image(80, 60, [240, 240, 240, 255]);
    let values = SubmissionValues {
        texts: BTreeMap::new(),
        photo: Some(solid_image(8, 8, [10, 20, 30, 255])),
    };

    let photo_bytes = b"not-a-real-jpeg".as_slice();
    let req = GenerateRequest {
        project: &project,
        fields: &fields,
        template: &template,
        values: &values,
        photo_upload: Some((photo_bytes, "image/jpeg")),
        watermark: true,
    };
    let card = generate_card(
        &req,
        &mut fonts,
        FontGate::default(),
        &mut store,
        &mut sink,
    )
    .unwrap();

    // No text fields means no font specs, so the gate resolves immediately.
    assert_eq!(card.gate, GateOutcome::Ready);
    assert_eq!(card.photo_url.as_deref(), Some("mem://uploads/0"));
    assert_eq!(card.card_url, "mem://uploads/1");

    // The uploaded card is a decodable PNG at template native resolution.
    let uploads = sink.uploads();
    assert_eq!(uploads.len(), 2);
    assert_eq!(uploads[1].1, "image/png");
    let decoded = image::load_from_memory(&uploads[1].2).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (80, 60));

    // The submission record captured the flow's outputs.
    let subs = store.submissions();
    assert_eq!(subs.len(), 1);
    assert_eq!(subs[0].project_id, "p1");
    assert_eq!(subs[0].participant_name, "Unknown");
    assert_eq!(subs[0].generated_card_url, card.card_url);
    assert_eq!(subs[0].photo_url, card.photo_url);
}

#[test]
fn generate_card_rejects_missing_values_without_uploading() {
    let mut store = MemoryStore::new();
    let mut sink = MemorySink::new();
    let mut fonts = FontLibrary::new();
    let project = active_project();

    let fields = vec![normalize(Field::text("t"))];
    let template = solid_image(40, 40, [255, 255, 255, 255]);
    let values = SubmissionValues::default();

    let req = GenerateRequest {
        project: &project,
        fields: &fields,
        template: &template,
        values: &values,
        photo_upload: None,
        watermark: false,
    };
    let err = generate_card(
        &req,
        &mut fonts,
        FontGate::default(),
        &mut store,
        &mut sink,
    );

    assert!(err.is_err());
    // All-or-nothing: nothing was uploaded or recorded.
    assert!(sink.uploads().is_empty());
    assert!(store.submissions().is_empty());
}
