//! Native command-line host.
//!
//! Replays recorded backend responses for one image: lists the detected
//! faces, optionally selects one and prints its similar faces, and can write
//! the image with the face boxes drawn on it.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use spylab_view::ManualElement;

use crate::config::{ApiConfig, AppConfig};
use crate::error::{Result, SpylabError};
use crate::finder::{execute, AnalysisState, Command, FaceFinder, Message};
use crate::render::{display_dimensions, render_overlay};
use crate::service::{endpoints, ImageFile, RecordedService};

/// Find faces similar to one in an image, using recorded backend responses.
#[derive(Parser, Debug)]
#[command(name = "spylab-native", version)]
pub struct Cli {
    /// Image to analyze
    pub image: PathBuf,
    /// Recorded `/analyze` response (JSON)
    pub analysis: PathBuf,
    /// Recorded `/similar-to-image` response (JSON)
    #[arg(long)]
    pub similar: Option<PathBuf>,
    /// Index of the face box to select
    #[arg(long)]
    pub select: Option<usize>,
    /// Rendered image width in pixels
    #[arg(long)]
    pub width: Option<u32>,
    /// Write the image with face boxes to this PNG/JPEG file
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Only list faces of good quality
    #[arg(long, action = ArgAction::SetTrue)]
    pub high_quality: bool,
    /// Configuration file (defaults to the user config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Parse the command line and run.
pub fn main() {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(config.preferences.log_level.to_level_filter())
        .parse_default_env()
        .init();

    if let Err(e) = run(&cli, &config) {
        log::error!("{}", e);
        eprintln!("Application error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_from_default_path().unwrap_or_default(),
    };
    if cli.high_quality {
        config.preferences.high_quality_only = true;
    }
    Ok(config)
}

/// Run one session.
pub fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let prefs = &config.preferences;
    let service = RecordedService::from_files(&cli.analysis, cli.similar.as_deref())?;
    let mut finder = FaceFinder::new(prefs.filters()).with_distance_decimals(prefs.distance_decimals);

    let file = ImageFile::read(&cli.image)?;
    let command = finder
        .update(Message::FileSelected(Some(file)))
        .ok_or_else(|| {
            SpylabError::InvalidArgument(format!("{} is empty", cli.image.display()))
        })?;
    log::info!("{}", describe_command(&config.api, &command));
    let finished = pollster::block_on(execute(&service, command));
    finder.update(finished);
    if let AnalysisState::Failed(message) = finder.analysis() {
        return Err(SpylabError::Analysis(message.clone()));
    }

    let (natural_width, natural_height) = image::image_dimensions(&cli.image)?;
    let (width, height) = display_dimensions(
        (natural_width, natural_height),
        cli.width,
        prefs.max_display_height,
    );
    let element = ManualElement::new();
    element.set_layout(f64::from(width), f64::from(height));
    element.finish_loading(f64::from(natural_width), f64::from(natural_height));
    finder.attach_image(cli.image.display().to_string(), Box::new(element.source()))?;

    if let Some(index) = cli.select {
        let activated = finder.overlay().activate(index).ok_or_else(|| {
            SpylabError::InvalidArgument(format!(
                "No face box {} (found {})",
                index,
                finder.overlay().boxes().len()
            ))
        })?;
        if let Some(command) = finder.update(activated) {
            log::info!("{}", describe_command(&config.api, &command));
            let finished = pollster::block_on(execute(&service, command));
            finder.update(finished);
        }
    }

    print_boxes(&finder);
    print_results(&finder, prefs.page_size);

    if let Some(out) = &cli.out {
        let image = image::open(&cli.image)?;
        let overlay = finder.overlay();
        let canvas = render_overlay(&image, &overlay.display_size(), &overlay.placed_boxes())?;
        canvas.save(out)?;
        log::info!("Wrote {}", out.display());
    }

    Ok(())
}

/// The request a live backend would receive for `command`, with the form
/// fields it carries.
fn describe_command(api: &ApiConfig, command: &Command<ImageFile>) -> String {
    match command {
        Command::Analyze(request) => format!(
            "POST {} file={}",
            api.endpoint(endpoints::ANALYZE),
            request.file.name
        ),
        Command::FindSimilar(request) => {
            let fields: Vec<String> = request
                .rect
                .form_fields()
                .into_iter()
                .chain(request.filters.form_fields())
                .map(|(name, value)| format!("{}={}", name, value))
                .collect();
            format!(
                "POST {} image={} {}",
                api.endpoint(endpoints::SIMILAR_TO_IMAGE),
                request.file.name,
                fields.join(" ")
            )
        }
    }
}

fn print_boxes(finder: &FaceFinder<ImageFile>) {
    let placed = finder.overlay().placed_boxes();
    println!("Faces: {}", placed.len());
    for (i, b) in placed.iter().enumerate() {
        println!(
            "{:>3}{} {:>7.1} {:>7.1} {:>7.1} {:>7.1}  {}",
            i,
            if b.face.is_strong { "*" } else { " " },
            b.face.rect.x,
            b.face.rect.y,
            b.face.rect.w,
            b.face.rect.h,
            b.face.tooltip.as_deref().unwrap_or_default()
        );
    }
}

fn print_results(finder: &FaceFinder<ImageFile>, page_size: usize) {
    if let Some(error) = finder.similarity().error() {
        eprintln!("Similarity search failed: {}", error);
        return;
    }

    if finder.selection().selected_rect().is_none() {
        return;
    }
    let rows = finder.results();
    println!("Similar faces: {}", rows.len());
    for row in rows.iter().take(page_size.max(1)) {
        println!(
            "{:>8} {:<30} {:>8} {:>4}{} {:>8} {:>10} {}",
            row.id,
            row.file_name,
            row.distance,
            row.quality.map(|q| q.to_string()).unwrap_or_default(),
            if row.good_quality { "+" } else { " " },
            row.confidence,
            row.region,
            row.model
        );
    }
    if let Some(hidden) = hidden_rows(rows.len(), page_size) {
        println!("... {} more", hidden);
    }
}

/// Rows left off the first page, if any. A page always shows at least one row.
fn hidden_rows(total: usize, page_size: usize) -> Option<usize> {
    total.checked_sub(page_size.max(1)).filter(|&hidden| hidden > 0)
}
