//! Polygraph CLI
//!
//! Usage:
//!   polygraph                               # Interactive terminal kiosk
//!   polygraph --serve                       # HTTP + WebSocket API server
//!   polygraph --config kiosk.toml           # Load engine settings
//!   polygraph --source silent --json        # No microphone, JSON views

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polygraph::core::{
    spawn_frame_driver, AppState, AudioSource, GesturePosition, LogFeedback,
    SessionController, SilentSource, SpectrumAnalyzer, SyntheticSource, TerminalFeedback,
};
use polygraph::types::{EngineConfig, MiddleBandPolicy, Reduction, SessionPhase, SessionView, Verdict};
use polygraph::{PolygraphError, VERSION};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// No microphone; every session hears silence
    Silent,
    /// Simulated voice
    Synthetic,
    /// Default input device (requires the `microphone` feature)
    Microphone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum MiddleBand {
    Defer,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReductionArg {
    Mean,
    Sum,
}

#[derive(Parser, Debug)]
#[command(
    name = "polygraph",
    version = VERSION,
    about = "Polygraph kiosk - theatrical lie detector session engine",
    long_about = "Runs the deception session engine behind the Polygraph kiosk.\n\n\
                  Touch the control (give a position 0.0-1.0), speak, and\n\
                  after the analysis window the engine answers TRUE or LIE.\n\n\
                  Modes:\n  \
                  (default)  Interactive terminal kiosk\n  \
                  --serve    HTTP + WebSocket API for a presentation layer\n\n\
                  Phases:\n  \
                  IDLE         - Waiting for a touch\n  \
                  CALIBRATING  - Recording baseline voice level\n  \
                  ANALYZING    - Session running\n  \
                  RESULT_TRUE  - Verified\n  \
                  RESULT_LIE   - Deception detected"
)]
struct Args {
    /// Run as HTTP API server
    #[arg(short, long)]
    serve: bool,

    /// Server address
    #[arg(long, default_value = "127.0.0.1:3000", env = "POLYGRAPH_ADDR")]
    addr: String,

    /// Engine config file (TOML)
    #[arg(short, long, env = "POLYGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Audio source
    #[arg(long, value_enum, default_value = "synthetic")]
    source: SourceKind,

    /// Loudness of the synthetic voice (0.0-1.0)
    #[arg(long, default_value_t = 0.5)]
    voice_level: f32,

    /// Seed for gesture bands, status text and coin flips
    #[arg(long)]
    seed: Option<u64>,

    /// Override analysis duration (ms)
    #[arg(long)]
    analysis_ms: Option<u64>,

    /// Override calibration duration (ms)
    #[arg(long)]
    calibration_ms: Option<u64>,

    /// Override silence threshold (0-255)
    #[arg(long)]
    silence_threshold: Option<u8>,

    /// Override middle-band behaviour
    #[arg(long, value_enum)]
    middle_band: Option<MiddleBand>,

    /// Override spectrum reduction
    #[arg(long, value_enum)]
    reduction: Option<ReductionArg>,

    /// Output views as JSON lines
    #[arg(long)]
    json: bool,

    /// Disable colors in output
    #[arg(long)]
    no_color: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polygraph=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    if args.no_color {
        colored::control::set_override(false);
    }

    let config = load_config(&args)?;
    info!(?config, "engine configuration");

    if args.serve {
        let controller = build_controller(&args, config, false)?;
        polygraph::core::run_server(&args.addr, controller)
            .await
            .context("API server failed")?;
    } else {
        let controller = build_controller(&args, config, true)?;
        run_interactive(&args, controller).await?;
    }
    Ok(())
}

/// File config, then CLI overrides, then validation
fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if let Some(ms) = args.analysis_ms {
        config.analysis_ms = ms;
    }
    if let Some(ms) = args.calibration_ms {
        config.calibration_ms = ms;
    }
    if let Some(threshold) = args.silence_threshold {
        config.silence_threshold = threshold;
    }
    if let Some(middle) = args.middle_band {
        config.middle_band = match middle {
            MiddleBand::Defer => MiddleBandPolicy::Defer,
            MiddleBand::Random => MiddleBandPolicy::Random,
        };
    }
    if let Some(reduction) = args.reduction {
        config.reduction = match reduction {
            ReductionArg::Mean => Reduction::Mean,
            ReductionArg::Sum => Reduction::Sum,
        };
    }

    config.validate().context("Invalid engine configuration")?;
    Ok(config)
}

fn build_source(args: &Args, config: &EngineConfig) -> Result<Box<dyn AudioSource>, PolygraphError> {
    let analyzer = SpectrumAnalyzer::new(config.fft_size, config.min_decibels, config.max_decibels);
    match args.source {
        SourceKind::Silent => Ok(Box::new(SilentSource)),
        SourceKind::Synthetic => {
            let seed = args.seed.unwrap_or_else(rand::random);
            Ok(Box::new(SyntheticSource::new(analyzer, args.voice_level, seed)))
        }
        #[cfg(feature = "microphone")]
        SourceKind::Microphone => Ok(Box::new(polygraph::core::MicrophoneSource::new(analyzer))),
        #[cfg(not(feature = "microphone"))]
        SourceKind::Microphone => {
            Err(PolygraphError::SourceUnavailable(
                "built without the `microphone` feature".to_string(),
            ))
        }
    }
}

fn build_controller(args: &Args, config: EngineConfig, terminal: bool) -> Result<SessionController> {
    let source = build_source(args, &config)?;
    let mut controller = SessionController::new(config, source)?;
    controller = if terminal {
        controller.with_feedback(Box::new(TerminalFeedback::default()))
    } else {
        controller.with_feedback(Box::new(LogFeedback))
    };
    if let Some(seed) = args.seed {
        controller = controller.with_seed(seed);
    }
    Ok(controller)
}

// =============================================================================
// INTERACTIVE KIOSK
// =============================================================================

async fn run_interactive(args: &Args, controller: SessionController) -> Result<()> {
    let state = AppState::new(controller);
    let driver = spawn_frame_driver(state.clone());
    let printer = spawn_printer(&state, args.json);

    print_header();
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        match command.to_ascii_lowercase().as_str() {
            "start" | "s" | "touch" => {
                let ratio = match words.next().map(str::parse::<f64>) {
                    None => 0.5,
                    Some(Ok(ratio)) => ratio,
                    Some(Err(_)) => {
                        println!("{}", "⚠ Position must be a number between 0.0 and 1.0".yellow());
                        continue;
                    }
                };
                let Some(position) = GesturePosition::from_ratio(ratio) else {
                    println!("{}", "⚠ Position must be a finite number".yellow());
                    continue;
                };
                if !state.session.lock().await.start(position) {
                    println!("{}", "⚠ Session already in progress".yellow());
                }
            }
            "calibrate" | "c" => {
                if !state.session.lock().await.calibrate() {
                    println!("{}", "⚠ Finish or reset the current session first".yellow());
                }
            }
            "reset" | "r" => {
                state.session.lock().await.reset();
            }
            "status" => {
                let view = state.session.lock().await.view();
                print_view(&view, args.json);
            }
            "help" | "?" => print_help(),
            "quit" | "exit" | "q" => break,
            other => println!("{} {}", "⚠ Unknown command:".yellow(), other),
        }
    }

    state.session.lock().await.reset();
    driver.abort();
    printer.abort();
    println!("\nSystem offline.");
    Ok(())
}

/// Print views as phases and status lines change
fn spawn_printer(state: &AppState, json: bool) -> tokio::task::JoinHandle<()> {
    let mut rx = state.subscribe();
    tokio::spawn(async move {
        let mut last: Option<(SessionPhase, String, Option<String>)> = None;
        loop {
            let view = match rx.recv().await {
                Ok(view) => view,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            };
            let key = (view.phase, view.status.clone(), view.notice.clone());
            if last.as_ref() == Some(&key) {
                continue;
            }
            let entered_result = view.phase.is_result()
                && last.as_ref().map_or(true, |(phase, _, _)| *phase != view.phase);
            last = Some(key);

            print_view(&view, json);
            if entered_result && !json {
                print_verdict(&view);
            }
        }
    })
}

fn print_view(view: &SessionView, json: bool) {
    if json {
        match serde_json::to_string(view) {
            Ok(line) => println!("{}", line),
            Err(e) => eprintln!("failed to encode view: {}", e),
        }
    } else if colored::control::SHOULD_COLORIZE.should_colorize() {
        println!("{}", view.to_terminal_string());
    } else {
        println!("{}", view.to_parseable_string());
    }
    if let (Some(notice), false) = (&view.notice, json) {
        println!("{}", notice.yellow().bold());
    }
}

fn print_verdict(view: &SessionView) {
    match view.verdict {
        Some(Verdict::True) => {
            println!();
            println!("{}", "  ╔══════════════╗".green());
            println!("{}", "  ║     TRUE     ║".green().bold());
            println!("{}", "  ╚══════════════╝".green());
            println!("  {}", "VERIFIED".green());
            println!();
        }
        Some(Verdict::Lie) => {
            println!();
            println!("{}", "  ╔══════════════╗".red());
            println!("{}", "  ║     LIE      ║".red().bold());
            println!("{}", "  ╚══════════════╝".red());
            println!("  {}", "DECEPTION DETECTED".red());
            println!();
        }
        None => {}
    }
}

fn print_header() {
    println!();
    println!("{}", "══════════════════════════════════════════".green());
    println!("{}", format!("  POLYGRAPH SYSTEM v{}", VERSION).green().bold());
    println!("{}", "══════════════════════════════════════════".green());
    println!();
}

fn print_help() {
    println!("Commands:");
    println!("  start [pos]   Touch the control at pos (0.0 left - 1.0 right, default 0.5)");
    println!("  calibrate     Record your baseline voice level");
    println!("  reset         Reset after a verdict, or cancel a running phase");
    println!("  status        Show the current session view");
    println!("  quit          Exit");
    println!();
}
