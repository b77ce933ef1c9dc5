//! deckgen: command-line front end for presentation generation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;

use deckgen::assets::branding::{color_palette, BrandingOverrides};
use deckgen::assets::narration::Voice;
use deckgen::assets::translation::{detect_language, language_info, SUPPORTED_LANGUAGES};
use deckgen::cache::{CacheNamespace, CacheStore};
use deckgen::config::load_config_or_default;
use deckgen::db::presentation_repo::PresentationFilter;
use deckgen::model::JobStatus;
use deckgen::orchestrator::CANCELLED_MESSAGE;
use deckgen::{App, GenerationError, NewPresentation, NoopProgress};

/// Interval between two status polls while waiting for a run.
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "deckgen")]
#[command(author, version, about = "Generate researched slide decks from a prompt")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a JSON config file (defaults apply when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum VoiceArg {
    Male,
    Female,
}

impl From<VoiceArg> for Voice {
    fn from(v: VoiceArg) -> Self {
        match v {
            VoiceArg::Male => Voice::Male,
            VoiceArg::Female => Voice::Female,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NamespaceArg {
    Web,
    Images,
    Translation,
}

impl From<NamespaceArg> for CacheNamespace {
    fn from(n: NamespaceArg) -> Self {
        match n {
            NamespaceArg::Web => CacheNamespace::Web,
            NamespaceArg::Images => CacheNamespace::Images,
            NamespaceArg::Translation => CacheNamespace::Translation,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create a presentation and wait for it to be generated
    Generate {
        /// What the presentation is about
        prompt: String,

        /// Number of slides
        #[arg(short, long, default_value_t = 10)]
        slides: u32,

        /// Builtin theme: corporate, startup or academic
        #[arg(short, long, default_value = "corporate")]
        theme: String,

        /// Language of the generated content
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Translate the finished presentation to this language
        #[arg(long)]
        translate: Option<String>,

        /// Narrate the finished presentation with this voice
        #[arg(long, value_enum)]
        narrate: Option<VoiceArg>,
    },

    /// Show the status of a presentation
    Status {
        id: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// List presentations, newest first
    List {
        /// Only presentations with this status
        #[arg(long)]
        status: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: u64,

        #[arg(long, default_value_t = 0)]
        offset: u64,
    },

    /// Translate a presentation in place
    Translate { id: String, language: String },

    /// Synthesize narration audio for every slide
    Narrate {
        id: String,

        #[arg(long, value_enum, default_value_t = VoiceArg::Female)]
        voice: VoiceArg,
    },

    /// Set theme overrides applied when the presentation is rendered
    Brand {
        id: String,

        #[arg(long)]
        primary: Option<String>,

        #[arg(long)]
        secondary: Option<String>,

        #[arg(long)]
        accent: Option<String>,

        #[arg(long)]
        font: Option<String>,

        /// Path to a logo image
        #[arg(long)]
        logo: Option<String>,

        /// Remove all overrides
        #[arg(long, conflicts_with_all = ["primary", "secondary", "accent", "font", "logo"])]
        clear: bool,
    },

    /// Derive a color palette from a primary color
    Palette {
        /// Primary color as #rrggbb
        color: String,
    },

    /// List supported languages, or detect the language of a text
    Languages {
        #[arg(long)]
        detect: Option<String>,
    },

    /// Delete expired cache entries
    CacheSweep {
        #[arg(long, value_enum, default_value_t = NamespaceArg::Web)]
        namespace: NamespaceArg,

        /// Keep entries that expired less than this many days ago
        #[arg(long, default_value_t = 7)]
        retention_days: i64,
    },
}

fn init_logging(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(env_filter);
    let installed = match format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        ),
    };
    if let Err(e) = installed {
        eprintln!("Failed to install tracing subscriber: {}", e);
    }

    // db and cache code log through `log`
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to bridge log records: {}", e);
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    // Commands that need no database.
    match &cli.command {
        Commands::Palette { color } => return cmd_palette(color),
        Commands::Languages { detect } => {
            cmd_languages(detect.as_deref());
            return Ok(());
        }
        _ => {}
    }

    let config = load_config_or_default(cli.config.as_deref())?;
    let app = App::from_config(config, Arc::new(NoopProgress))?;

    match cli.command {
        Commands::Generate {
            prompt,
            slides,
            theme,
            language,
            translate,
            narrate,
        } => {
            let request = NewPresentation::new(prompt)
                .slides(slides)
                .theme(theme)
                .language(language);
            cmd_generate(&app, &request, translate.as_deref(), narrate.map(Voice::from)).await?
        }
        Commands::Status { id, json } => cmd_status(&app, &id, json)?,
        Commands::List {
            status,
            limit,
            offset,
        } => cmd_list(&app, status, limit, offset)?,
        Commands::Translate { id, language } => cmd_translate(&app, &id, &language).await?,
        Commands::Narrate { id, voice } => cmd_narrate(&app, &id, voice.into()).await?,
        Commands::Brand {
            id,
            primary,
            secondary,
            accent,
            font,
            logo,
            clear,
        } => {
            let overrides = (!clear).then(|| BrandingOverrides {
                primary_color: primary,
                secondary_color: secondary,
                accent_color: accent,
                font_name: font,
                logo_path: logo,
                ..BrandingOverrides::default()
            });
            app.service.set_branding(&id, overrides.as_ref())?;
            println!("Branding updated for {}", id);
        }
        Commands::CacheSweep {
            namespace,
            retention_days,
        } => {
            let deleted =
                CacheStore::new(app.db.clone()).sweep_expired(namespace.into(), retention_days)?;
            println!("Deleted {} expired entries", deleted);
        }
        Commands::Palette { .. } | Commands::Languages { .. } => {}
    }
    Ok(())
}

async fn cmd_generate(
    app: &App,
    request: &NewPresentation,
    translate: Option<&str>,
    narrate: Option<Voice>,
) -> Result<(), Box<dyn std::error::Error>> {
    let job = app.service.create_presentation(request)?;
    println!("Created presentation {}", job.id);

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    if !app.service.start(&job.id)? {
        return Err(format!("Presentation {} is already being generated", job.id).into());
    }

    let mut last_step = None;
    let status = loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        if interrupted.swap(false, Ordering::SeqCst) && app.service.cancel(&job.id)? {
            println!("Cancelling...");
        }
        let status = app.service.get_status(&job.id)?;
        if status.current_step != last_step {
            if let Some(step) = &status.current_step {
                println!("[{:>3}%] {}", status.progress, step);
            }
            last_step = status.current_step.clone();
        }
        if status.status.is_terminal() && !status.is_active {
            break status;
        }
    };

    if status.error_message.as_deref() == Some(CANCELLED_MESSAGE) {
        return Err(GenerationError::Cancelled.into());
    }
    if status.status != JobStatus::Completed {
        return Err(status
            .error_message
            .unwrap_or_else(|| "Generation failed".to_string())
            .into());
    }
    let job = app.service.get(&job.id)?;
    println!(
        "Completed in {}s: {}",
        status.generation_time.unwrap_or(0),
        job.file_path.as_deref().unwrap_or("<no file>")
    );

    if let Some(language) = translate {
        cmd_translate(app, &job.id, language).await?;
    }
    if let Some(voice) = narrate {
        cmd_narrate(app, &job.id, voice).await?;
    }
    Ok(())
}

fn cmd_status(app: &App, id: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let status = app.service.get_status(id)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }
    println!("Status:   {}", status.status);
    println!("Progress: {}%", status.progress);
    if let Some(step) = &status.current_step {
        println!("Step:     {}", step);
    }
    if let Some(error) = &status.error_message {
        println!("Error:    {}", error);
    }
    if let Some(secs) = status.generation_time {
        println!("Time:     {}s", secs);
    }
    println!("Active:   {}", status.is_active);
    for entry in &status.recent_logs {
        println!("  {} {} {}", entry.start_time, entry.step_name, entry.status);
    }
    Ok(())
}

fn cmd_list(
    app: &App,
    status: Option<String>,
    limit: u64,
    offset: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = PresentationFilter {
        status,
        limit: Some(limit),
        offset: Some(offset),
    };
    let (rows, total) = app.service.list(&filter)?;
    for row in &rows {
        println!(
            "{}  {:<10} {:>3}%  {}",
            row.id, row.status, row.progress, row.title
        );
    }
    println!("{} of {} presentations", rows.len(), total);
    Ok(())
}

async fn cmd_translate(
    app: &App,
    id: &str,
    language: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(translator) = app.translator()? else {
        return Err("No translation endpoint configured (translation.endpoint)".into());
    };
    let summary = translator.translate_presentation(id, language).await?;
    info!(language = %summary.language, untranslated = summary.untranslated, "Translation finished");
    println!(
        "Translated {} slides to {} ({} texts kept as is)",
        summary.slides, summary.language, summary.untranslated
    );
    Ok(())
}

async fn cmd_narrate(app: &App, id: &str, voice: Voice) -> Result<(), Box<dyn std::error::Error>> {
    let rows = app.narrator()?.narrate(id, voice).await?;
    let total: f64 = rows.iter().map(|r| r.duration_secs).sum();
    println!("Narrated {} slides ({:.0}s of audio)", rows.len(), total);
    Ok(())
}

fn cmd_palette(color: &str) -> Result<(), Box<dyn std::error::Error>> {
    let palette = color_palette(color)?;
    println!("{}", serde_json::to_string_pretty(&palette)?);
    Ok(())
}

fn cmd_languages(detect: Option<&str>) {
    if let Some(text) = detect {
        let code = detect_language(text);
        println!("{} ({})", code, language_info(code).name);
        return;
    }
    for (code, _) in SUPPORTED_LANGUAGES {
        let info = language_info(code);
        println!(
            "{:<3} {:<22} rtl={:<5} font x{}",
            info.code, info.name, info.rtl, info.font_adjustment
        );
    }
}
