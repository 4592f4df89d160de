//! Tactile Recorder CLI
//!
//! Records tactile-pressure sessions from a sample feed and manages saved
//! session documents.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tactile_recorder::{
    config::Config,
    document::SessionDocument,
    scheduler::AcquisitionScheduler,
    session::{MetadataDraft, RecordingSession, SessionError, SessionMode, TreatmentLocation},
    source::SyntheticSource,
    zones::ZoneThresholds,
    FrameAggregator, StopDecision, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tactile-recorder")]
#[command(author = "PT Robotics")]
#[command(version = VERSION)]
#[command(about = "Tactile-pressure session recorder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a session from the synthetic feed
    Record {
        /// Subject identifier
        #[arg(long)]
        subject: String,

        /// Treatment location
        #[arg(long, value_enum)]
        location: TreatmentLocation,

        /// Operator identifier
        #[arg(long)]
        operator: String,

        /// Assistant identifier, if present
        #[arg(long)]
        assistant: Option<String>,

        /// Session mode
        #[arg(long, value_enum, default_value = "protocol-development")]
        mode: SessionMode,

        /// Clinical notes
        #[arg(long)]
        notes: Option<String>,

        /// Frame period in milliseconds (defaults to the configured value)
        #[arg(long)]
        period: Option<u64>,

        /// Pressure level the synthetic feed reports, in kPa
        #[arg(long, default_value = "35")]
        level: u16,

        /// Stop automatically after this many seconds (otherwise Ctrl+C)
        #[arg(long)]
        duration: Option<u64>,
    },

    /// Show a saved session document
    Show {
        /// Path to the session document
        path: PathBuf,
    },

    /// Export the per-channel CSV from a saved document
    Export {
        /// Path to the session document
        path: PathBuf,

        /// Output CSV path (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Export the clinical report CSV from a saved document
    Report {
        /// Path to the session document
        path: PathBuf,

        /// Output CSV path (defaults to the configured export directory)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Named threshold preset to classify against
        #[arg(long, value_enum)]
        preset: Option<ZonePreset>,
    },

    /// Show the zone thresholds and presets
    Zones {
        /// Classify this pressure value (kPa) against the configured zones
        #[arg(long)]
        classify: Option<f64>,
    },

    /// Show configuration
    Config,
}

/// Named threshold presets from the treatment protocol catalogue.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ZonePreset {
    Standard,
    SoftTissue,
    JointMobilization,
    Lymphatic,
}

impl ZonePreset {
    fn thresholds(self) -> ZoneThresholds {
        match self {
            ZonePreset::Standard => ZoneThresholds::default(),
            ZonePreset::SoftTissue => ZoneThresholds::preset_soft_tissue(),
            ZonePreset::JointMobilization => ZoneThresholds::preset_joint_mobilization(),
            ZonePreset::Lymphatic => ZoneThresholds::preset_lymphatic(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            subject,
            location,
            operator,
            assistant,
            mode,
            notes,
            period,
            level,
            duration,
        } => {
            cmd_record(
                subject, location, operator, assistant, mode, notes, period, level, duration,
            );
        }
        Commands::Show { path } => {
            cmd_show(&path);
        }
        Commands::Export { path, output } => {
            cmd_export(&path, output);
        }
        Commands::Report {
            path,
            output,
            preset,
        } => {
            cmd_report(&path, output, preset);
        }
        Commands::Zones { classify } => {
            cmd_zones(classify);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_record(
    subject: String,
    location: TreatmentLocation,
    operator: String,
    assistant: Option<String>,
    mode: SessionMode,
    notes: Option<String>,
    period: Option<u64>,
    level: u16,
    duration: Option<u64>,
) {
    println!("Tactile Recorder v{VERSION}");
    println!();

    let config = Config::load().unwrap_or_default();
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    let period_ms = period.unwrap_or(config.frame_period_ms);
    let thresholds = config.zone_thresholds;

    let source = SyntheticSource::new(level).with_pattern_tag("synthetic");
    let scheduler = match AcquisitionScheduler::new(
        Box::new(source),
        RecordingSession::new(),
        FrameAggregator::new(),
        period_ms,
    ) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let draft = MetadataDraft {
        subject_id: subject,
        location: Some(location),
        operator_id: operator,
        assistant_id: assistant,
        mode: Some(mode),
        notes,
        export_preferences: Default::default(),
    };
    let metadata = match scheduler.start_session(draft) {
        Ok(metadata) => metadata,
        Err(e) => {
            eprintln!("Error starting session: {e}");
            std::process::exit(1);
        }
    };

    println!("Recording session {}", metadata.session_id);
    println!("  Subject:  {}", metadata.subject_id);
    println!("  Location: {}", metadata.location.display_name());
    println!("  Mode:     {}", metadata.mode.display_name());
    println!("  Period:   {period_ms} ms");
    println!();
    println!("Press Ctrl+C to stop and save");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone());

    let deadline = duration.map(|secs| Instant::now() + Duration::from_secs(secs));

    while running.load(Ordering::SeqCst) {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }

        match scheduler.frames().recv_timeout(Duration::from_millis(200)) {
            Ok(frame) => {
                let peak = frame.peak();
                println!(
                    "[{}] frame {:>5}  peak {:>3} kPa  avg {:>6.1}  {}  ({} active)",
                    frame.timestamp.format("%H:%M:%S"),
                    frame.index,
                    peak,
                    frame.active_mean(),
                    thresholds.classify(f64::from(peak)).label(),
                    frame.active_channel_count(),
                );
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if !scheduler.is_connected() {
                    println!("(feed disconnected, recording paused)");
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                eprintln!("Frame stream closed unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping...");

    match scheduler.stop(StopDecision::Save) {
        Ok(()) => {}
        Err(SessionError::EmptySession) => {
            let _ = scheduler.stop(StopDecision::Discard);
            eprintln!("No frames were captured; session discarded.");
            return;
        }
        Err(e) => {
            eprintln!("Error stopping session: {e}");
            std::process::exit(1);
        }
    }

    let document =
        match scheduler.with_session(|session| SessionDocument::from_session(session, thresholds))
        {
            Ok(document) => document,
            Err(e) => {
                eprintln!("Error building document: {e}");
                std::process::exit(1);
            }
        };

    let document_path = config
        .document_path
        .join(format!("{}.json", metadata.session_id));
    if let Err(e) = document.save(&document_path) {
        eprintln!("Error saving session: {e}");
        std::process::exit(1);
    }
    println!(
        "Saved {} frames ({:.1}s) to {:?}",
        document.summary.total_frames, document.summary.duration_seconds, document_path
    );

    if config.auto_export_csv && metadata.export_preferences.auto_export_csv {
        let csv_path = config
            .export_path
            .join(format!("{}_data.csv", metadata.session_id));
        match document.export_channel_csv(&csv_path) {
            Ok(()) => println!("Exported channel CSV to {csv_path:?}"),
            Err(e) => eprintln!("Warning: CSV export failed: {e}"),
        }
    }
}

fn cmd_show(path: &PathBuf) {
    let document = load_or_exit(path);

    println!("Session Document");
    println!("================");
    println!();
    println!("Session ID:  {}", document.session.session_id);
    println!("Created:     {}", document.session.created_at.to_rfc3339());
    println!("Created by:  {}", document.created_by);
    println!("Device:      {}", document.device);
    println!("Subject:     {}", document.session.subject_id);
    println!(
        "Location:    {}",
        document.session.location.display_name()
    );
    println!("Operator:    {}", document.session.operator_id);
    if let Some(assistant) = &document.session.assistant_id {
        println!("Assistant:   {assistant}");
    }
    println!("Mode:        {}", document.session.mode.display_name());
    if let Some(notes) = &document.session.notes {
        println!("Notes:       {notes}");
    }
    println!(
        "Zones:       min={} max={} caution={} (at save time)",
        document.zone_thresholds.min,
        document.zone_thresholds.max,
        document.zone_thresholds.caution
    );
    println!();
    println!("Frames:      {}", document.summary.total_frames);
    println!("Duration:    {:.2}s", document.summary.duration_seconds);
    println!("Complete:    {}", document.summary.complete);
}

fn cmd_export(path: &PathBuf, output: Option<PathBuf>) {
    let config = Config::load().unwrap_or_default();
    let document = load_or_exit(path);

    let output = output.unwrap_or_else(|| {
        config
            .export_path
            .join(format!("{}_data.csv", document.session.session_id))
    });

    match document.export_channel_csv(&output) {
        Ok(()) => println!(
            "Exported {} frames to {:?}",
            document.summary.total_frames, output
        ),
        Err(e) => {
            eprintln!("Error exporting CSV: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_report(path: &PathBuf, output: Option<PathBuf>, preset: Option<ZonePreset>) {
    let config = Config::load().unwrap_or_default();
    let document = load_or_exit(path);

    // The report always classifies against the operator's current setup,
    // never the thresholds stored in the document.
    let thresholds = preset
        .map(ZonePreset::thresholds)
        .unwrap_or(config.zone_thresholds);

    let output = output.unwrap_or_else(|| {
        config
            .export_path
            .join(format!("{}_report.csv", document.session.session_id))
    });

    match document.export_report_csv(&output, &thresholds) {
        Ok(()) => println!(
            "Report for {} written to {:?}",
            document.session.session_id, output
        ),
        Err(e) => {
            eprintln!("Error exporting report: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_zones(classify: Option<f64>) {
    let config = Config::load().unwrap_or_default();
    let zones = config.zone_thresholds;

    println!("Pressure Zones (kPa)");
    println!("====================");
    println!();
    println!(
        "Configured:        min={} max={} caution={}",
        zones.min, zones.max, zones.caution
    );
    println!();
    println!("Presets:");
    for (name, preset) in [
        ("standard", ZoneThresholds::default()),
        ("soft-tissue", ZoneThresholds::preset_soft_tissue()),
        (
            "joint-mobilization",
            ZoneThresholds::preset_joint_mobilization(),
        ),
        ("lymphatic", ZoneThresholds::preset_lymphatic()),
    ] {
        println!(
            "  {:<20} min={:<5} max={:<5} caution={}",
            name, preset.min, preset.max, preset.caution
        );
    }

    if let Some(value) = classify {
        println!();
        println!("{value} kPa -> {}", zones.classify(value).label());
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}

fn load_or_exit(path: &PathBuf) -> SessionDocument {
    match SessionDocument::load(path) {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error loading {path:?}: {e}");
            std::process::exit(1);
        }
    }
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl+C handler");
}
