//! shapeforge - generate, inspect and export preview objects from the command line
//!
//! Subcommands:
//! - `options`: list the shapes, textures and colors the service offers
//! - `generate`: request an object for a shape / texture / color
//! - `describe`: request an object from a free-text description
//! - `open`: load a model archive from disk

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use shapeforge::scene::CommitOutcome;
use shapeforge::{AppConfig, HttpBackend, Session};

#[derive(Parser, Debug)]
#[command(name = "shapeforge")]
#[command(about = "Preview generated 3D objects", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Generation service base URL (overrides the config)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available shapes, textures and colors
    Options,
    /// Generate an object from explicit parameters
    Generate(GenerateArgs),
    /// Generate an object from a free-text description
    Describe(DescribeArgs),
    /// Load a model archive from disk
    Open(OpenArgs),
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write the resulting object as a ZIP (model.obj, model.mtl, textures)
    #[arg(long)]
    export: Option<PathBuf>,

    /// Animation frames to advance before reporting
    #[arg(long, default_value = "0")]
    frames: u32,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[arg(long)]
    shape: Option<String>,

    #[arg(long)]
    texture: Option<String>,

    /// Color as #RRGGBB
    #[arg(long)]
    color: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct DescribeArgs {
    /// Description such as "a shiny blue metal sphere"
    text: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct OpenArgs {
    /// ZIP archive with a model, material and textures
    archive: PathBuf,

    /// Preferred texture variant (e.g. stone, wood, metal)
    #[arg(long)]
    variant: Option<String>,

    #[command(flatten)]
    output: OutputArgs,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(url) = &cli.backend {
        config.backend_url = url.clone();
    }
    Ok(config)
}

fn report(session: &mut Session<HttpBackend>, outcome: &CommitOutcome, output: &OutputArgs) -> Result<()> {
    if let CommitOutcome::Superseded(_) = outcome {
        println!("Result discarded: a newer request was made");
    }
    session.advance(output.frames);
    println!("{}", session.summary());

    if let Some(path) = &output.export {
        write_export(session, path)?;
    }
    Ok(())
}

fn write_export(session: &Session<HttpBackend>, path: &Path) -> Result<()> {
    session
        .export_current_to(path)
        .with_context(|| format!("Failed to export to {}", path.display()))?;
    println!("Exported to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let backend = HttpBackend::from_config(&config);
    log::info!("Generation service at {}", backend.base_url());
    let mut session = Session::new(config, backend);

    match cli.command {
        Commands::Options => {
            let options = session.load_options();
            println!("Shapes:   {}", options.shapes.join(", "));
            println!("Colors:   {}", options.colors.join(", "));
            let textures: Vec<&str> = session
                .ui()
                .texture_entries()
                .iter()
                .map(|entry| entry.label.as_str())
                .collect();
            println!("Textures: {}", textures.join(", "));
        }
        Commands::Generate(args) => {
            if let Some(shape) = &args.shape {
                session.select_shape(shape)?;
            }
            if let Some(texture) = &args.texture {
                session.select_texture(texture)?;
            }
            if let Some(color) = &args.color {
                session.set_color(color)?;
            }
            let outcome = session.generate().context("Generation failed")?;
            report(&mut session, &outcome, &args.output)?;
        }
        Commands::Describe(args) => {
            let (params, outcome) = session
                .generate_from_text(&args.text)
                .context("Generation from text failed")?;
            println!(
                "Interpreted as {} / {} / {}",
                params.shape, params.texture, params.color
            );
            report(&mut session, &outcome, &args.output)?;
        }
        Commands::Open(args) => {
            let bytes = std::fs::read(&args.archive)
                .with_context(|| format!("Failed to read {}", args.archive.display()))?;
            let outcome = session
                .open_archive(bytes, args.variant.as_deref())
                .context("Failed to load archive")?;
            report(&mut session, &outcome, &args.output)?;
        }
    }
    Ok(())
}
