use std::{
    collections::BTreeMap,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use placard::{
    Compositor, FieldRecord, FontGate, FontGateOpts, FontLibrary, GateOutcome, Project,
    SubmissionValues, decode_image, encode_png,
};

#[derive(Parser, Debug)]
#[command(name = "placard", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Composite one card from a project, its fields and submitted values.
    Render(RenderArgs),
    /// Rewrite a legacy field-record JSON file into the normalized form.
    Migrate(MigrateArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Field records JSON (array).
    #[arg(long)]
    fields: PathBuf,

    /// Submitted text values JSON (object: field name -> value).
    #[arg(long)]
    values: PathBuf,

    /// Template background image file.
    #[arg(long)]
    template: PathBuf,

    /// Participant photo image file.
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Font file to register (repeatable; first is the fallback face).
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Composite the branding watermark.
    #[arg(long)]
    watermark: bool,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct MigrateArgs {
    /// Input field records JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output field records JSON.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Migrate(args) => cmd_migrate(args),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let f = File::open(path).with_context(|| format!("open {what} '{}'", path.display()))?;
    let r = BufReader::new(f);
    serde_json::from_reader(r).with_context(|| format!("parse {what} JSON"))
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let project: Project = read_json(&args.project, "project")?;
    let records: Vec<FieldRecord> = read_json(&args.fields, "fields")?;
    let texts: BTreeMap<String, String> = read_json(&args.values, "values")?;

    let fields: Vec<_> = records
        .into_iter()
        .map(|r| placard::model::migrate::migrate_field(r.into_field()))
        .collect();

    let template_bytes = std::fs::read(&args.template)
        .with_context(|| format!("read template '{}'", args.template.display()))?;
    let template = decode_image(&template_bytes)?;

    let photo = match &args.photo {
        Some(p) => {
            let bytes =
                std::fs::read(p).with_context(|| format!("read photo '{}'", p.display()))?;
            Some(placard::render::assets::decode_photo_upload(&bytes)?)
        }
        None => None,
    };
    let values = SubmissionValues { texts, photo };

    let mut fonts = FontLibrary::new();
    for path in &args.fonts {
        let bytes =
            std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        let family = fonts.register_font_bytes(&bytes)?;
        eprintln!("registered font family '{family}'");
    }

    let gate = FontGate::new(FontGateOpts::default());
    let specs = placard::fonts::font_specs_for(&fields);
    if gate.wait_ready(&mut fonts, &specs) == GateOutcome::TimedOut {
        eprintln!("warning: font gate timed out, output may use fallback faces");
    }

    if !project.is_active() {
        anyhow::bail!("project '{}' is not active", project.id);
    }

    let frame = Compositor::new(&mut fonts).render(&template, &fields, &values, args.watermark)?;
    let png = encode_png(&frame)?;
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write output '{}'", args.out.display()))?;
    eprintln!(
        "wrote {}×{} card to '{}'",
        frame.width,
        frame.height,
        args.out.display()
    );
    Ok(())
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let records: Vec<FieldRecord> = read_json(&args.in_path, "fields")?;
    let migrated: Vec<FieldRecord> = records
        .into_iter()
        .map(|r| {
            let field = placard::model::migrate::migrate_field(r.into_field());
            FieldRecord::from_field(&field)
        })
        .collect();

    let json = serde_json::to_string_pretty(&migrated)?;
    std::fs::write(&args.out, json)
        .with_context(|| format!("write output '{}'", args.out.display()))?;
    eprintln!("migrated {} field record(s)", migrated.len());
    Ok(())
}
