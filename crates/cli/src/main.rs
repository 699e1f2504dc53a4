use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use env_logger::Env;

use attendance_capture_core::backend::domain::recognition_backend::RecognitionBackend;
use attendance_capture_core::backend::infrastructure::http_backend::HttpRecognitionBackend;
use attendance_capture_core::capture::frame_pipeline::FramePipeline;
use attendance_capture_core::capture::infrastructure::image_dir_source::ImageDirSource;
use attendance_capture_core::capture::infrastructure::jpeg_encoder::JpegFrameEncoder;
use attendance_capture_core::roster::domain::roster_snapshot::RosterSnapshot;
use attendance_capture_core::roster::roster_view_model::RosterViewModel;
use attendance_capture_core::session::domain::session_notifier::LogSessionNotifier;
use attendance_capture_core::session::infrastructure::thread_scheduler::ThreadScheduler;
use attendance_capture_core::session::session_controller::SessionController;
use attendance_capture_core::shared::classroom_id::ClassroomId;
use attendance_capture_core::shared::settings::ClientSettings;

/// Live classroom attendance capture against the recognition service.
#[derive(Parser)]
#[command(name = "attendance-live")]
struct Cli {
    /// Recognition service base URL (overrides the settings file).
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a live session, submitting a still every interval.
    Live {
        /// Classroom to take attendance for.
        #[arg(long)]
        classroom: i64,

        /// Image file or directory of images used as the camera feed.
        #[arg(long)]
        frames: PathBuf,

        /// Capture interval in milliseconds (overrides the settings file).
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop automatically after this many seconds instead of on Enter.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Print today's attendance for a classroom.
    Roster {
        #[arg(long)]
        classroom: i64,
    },
    /// Mark a student present by hand.
    Mark {
        /// Student identifier, e.g. STU001.
        #[arg(long)]
        student: String,

        #[arg(long)]
        classroom: i64,
    },
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command {
        Command::Live {
            classroom,
            frames,
            interval_ms,
            duration_secs,
        } => {
            let mut settings = settings;
            if let Some(ms) = interval_ms {
                settings.capture_interval_ms = ms;
            }
            settings.validate()?;
            validate_classroom(classroom)?;
            run_live(
                &settings,
                ClassroomId(classroom),
                frames,
                duration_secs.map(Duration::from_secs),
            )
        }
        Command::Roster { classroom } => {
            validate_classroom(classroom)?;
            run_roster(&settings, ClassroomId(classroom))
        }
        Command::Mark { student, classroom } => {
            validate_classroom(classroom)?;
            if student.trim().is_empty() {
                return Err("Student ID must not be empty".into());
            }
            let backend = HttpRecognitionBackend::from_settings(&settings)?;
            let result = backend.mark_attendance(student.trim(), ClassroomId(classroom))?;
            println!("{}", result.message);
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> Result<ClientSettings, Box<dyn std::error::Error>> {
    let mut settings = match &cli.settings {
        Some(path) => ClientSettings::load_from(path)?,
        None => ClientSettings::load(),
    };
    if let Some(url) = &cli.api_url {
        settings.api_base_url = url.clone();
    }
    settings.validate()?;
    Ok(settings)
}

fn run_live(
    settings: &ClientSettings,
    classroom_id: ClassroomId,
    frames: PathBuf,
    duration: Option<Duration>,
) -> Result<(), Box<dyn std::error::Error>> {
    let source = ImageDirSource::open(&frames)?;

    let backend: Arc<dyn RecognitionBackend> =
        Arc::new(HttpRecognitionBackend::from_settings(settings)?);
    let pipeline = Arc::new(FramePipeline::new(
        Box::new(source),
        JpegFrameEncoder::from_settings(settings),
        backend.clone(),
    ));
    let roster = Arc::new(
        RosterViewModel::new(backend.clone(), settings.refresh_ordering)
            .with_on_update(Box::new(print_counts)),
    );
    let scheduler = Arc::new(ThreadScheduler::new());

    let mut controller = SessionController::new(
        backend,
        pipeline,
        roster.clone(),
        scheduler.clone(),
        Arc::new(LogSessionNotifier),
        settings.capture_interval(),
    );
    controller.start(classroom_id)?;

    wait_for_stop(duration);

    controller.stop();
    scheduler.join_pending();

    print_roster(&roster.snapshot());
    Ok(())
}

fn run_roster(
    settings: &ClientSettings,
    classroom_id: ClassroomId,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend: Arc<dyn RecognitionBackend> =
        Arc::new(HttpRecognitionBackend::from_settings(settings)?);
    let roster = RosterViewModel::new(backend, settings.refresh_ordering);
    roster.refresh(classroom_id)?;
    print_roster(&roster.snapshot());
    Ok(())
}

/// Blocks until Enter is pressed or `duration` elapses, whichever is first.
fn wait_for_stop(duration: Option<Duration>) {
    let (tx, rx) = mpsc::channel::<()>();
    let stdin_tx = tx.clone();
    thread::spawn(move || {
        let mut line = String::new();
        let _ = io::stdin().lock().read_line(&mut line);
        let _ = stdin_tx.send(());
    });

    match duration {
        Some(duration) => {
            eprintln!("Running for {}s (press Enter to stop early)", duration.as_secs());
            let _ = rx.recv_timeout(duration);
        }
        None => {
            eprintln!("Press Enter to stop");
            let _ = rx.recv();
        }
    }
    drop(tx);
}

fn validate_classroom(classroom: i64) -> Result<(), Box<dyn std::error::Error>> {
    if classroom <= 0 {
        return Err(format!("Classroom ID must be positive, got {classroom}").into());
    }
    Ok(())
}

fn print_counts(snapshot: &RosterSnapshot) {
    let counts = snapshot.counts();
    eprintln!(
        "Present: {}  Late: {}  Total: {}",
        counts.present, counts.late, counts.total
    );
}

fn format_confidence(percent: Option<f64>) -> String {
    match percent {
        Some(percent) => format!("{percent:.1}%"),
        None => "-".to_string(),
    }
}

fn print_roster(snapshot: &RosterSnapshot) {
    if snapshot.is_empty() {
        println!("No attendance recorded today");
        return;
    }

    println!(
        "{:<10} {:<24} {:<9} {:<8} {:>10}",
        "ID", "Name", "Time", "Status", "Confidence"
    );
    for record in snapshot.records() {
        println!(
            "{:<10} {:<24} {:<9} {:<8} {:>10}",
            record.student_id(),
            record.student_name(),
            record.check_in_time().format("%H:%M:%S").to_string(),
            record.status().to_string(),
            format_confidence(record.confidence_percent())
        );
    }

    let counts = snapshot.counts();
    println!(
        "\nPresent: {}  Late: {}  Total: {}",
        counts.present, counts.late, counts.total
    );
}
