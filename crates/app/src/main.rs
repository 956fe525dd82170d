use std::{io::Read, path::PathBuf};

use clap::{Parser, Subcommand};
use imagic_core::{
    AppConfig, AudioMonitor, Collaborators, ConfigStore, Engine, EngineHandle, InputFrontend,
    JsonFileStore, MediaKind, MediaLibrary, PlaybackMode, ProcessExit, SensorHub, StageGraph,
    StageRecord, TrickConfig, TriggerRecord, TriggerType,
};
use tracing_subscriber::EnvFilter;

mod headless;
mod script;

use headless::{ConsoleHost, HeadlessBackend, PlaybackProbe};
use script::Step;

fn main() -> imagic_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => run_validate(&config),
        Commands::Init { output } => run_init(&output),
        Commands::Run {
            config,
            script,
            settings,
            media_root,
        } => run_headless(&config, script.as_ref(), settings.as_ref(), media_root),
    }
}

fn run_validate(path: &PathBuf) -> imagic_core::Result<()> {
    tracing::info!(?path, "validating config");
    let raw = JsonFileStore::new(path)
        .load()?
        .ok_or_else(|| imagic_core::ImagicError::msg(format!("{} not found", path.display())))?;
    let graph = StageGraph::load(&raw)?;

    let triggers: usize = graph.stages().iter().map(|s| s.triggers.len()).sum();
    println!(
        "{}: {} stages, {} triggers, blow threshold {} dBFS",
        path.display(),
        graph.stages().len(),
        triggers,
        graph.blow_threshold()
    );
    for warning in graph.warnings() {
        println!("warning: {:?} at `{}`", warning.kind, warning.offending_id);
    }
    Ok(())
}

fn run_init(output: &PathBuf) -> imagic_core::Result<()> {
    tracing::info!(?output, "writing sample config");
    JsonFileStore::new(output).save(&sample_config())
}

fn run_headless(
    config: &PathBuf,
    script: Option<&PathBuf>,
    settings: Option<&PathBuf>,
    media_root: Option<PathBuf>,
) -> imagic_core::Result<()> {
    let settings = match settings {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    };

    let raw = JsonFileStore::new(config).load_or_default();
    let graph = StageGraph::load(&raw).unwrap_or_else(|err| {
        tracing::error!(%err, "config rejected, starting from an empty graph");
        StageGraph::empty()
    });

    let source = match script {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    let steps = script::parse(&source)?;

    let (handle, events) = EngineHandle::channel();
    let audio = AudioMonitor::new(&settings.audio, graph.blow_threshold(), handle.clone());
    let (backend, probe) = HeadlessBackend::new(handle.clone());
    let library = match media_root {
        Some(root) => MediaLibrary::with_root(root),
        None => MediaLibrary::unchecked(),
    };

    let parts = Collaborators {
        media: Box::new(backend),
        library,
        sensors: Box::new(SensorHub::with_audio(audio.clone())),
        exit: Box::new(ProcessExit),
        host: Box::new(ConsoleHost),
    };
    let mut engine = Engine::new(graph, parts, handle.clone(), events);
    let mut input = InputFrontend::new(&settings, engine.gates(), handle.clone());

    engine.start();
    engine.process_pending();

    for step in steps {
        apply_step(&step, &mut input, &audio, &probe, &handle)?;
        engine.process_pending();
        tracing::debug!(?step, state = ?engine.state(), "step applied");
    }

    println!(
        "finished on stage {}",
        engine.state().current_stage_id.as_deref().unwrap_or("<none>")
    );
    Ok(())
}

fn apply_step(
    step: &Step,
    input: &mut InputFrontend,
    audio: &AudioMonitor,
    probe: &PlaybackProbe,
    handle: &EngineHandle,
) -> imagic_core::Result<()> {
    match step {
        Step::Tap(at) => {
            input.tap(*at)?;
        }
        Step::Press(at) => input.press_began(*at),
        Step::Hold(at) => {
            input.press_held(*at)?;
        }
        Step::Release(at) => {
            input.press_ended(*at)?;
        }
        Step::Circle | Step::Line => {
            let trace = if *step == Step::Circle {
                script::circle_trace()
            } else {
                script::line_trace()
            };
            let mut points = trace.into_iter();
            if let Some(first) = points.next() {
                input.pointer_began(first);
                points.for_each(|point| input.pointer_moved(point));
                input.pointer_ended()?;
            }
        }
        Step::Blow(level) => {
            let buffer = vec![*level; audio.block_size().max(1)];
            if let Some(reading) = audio.push_samples(&buffer)? {
                tracing::info!(db = reading.db, loud = reading.loud, "audio buffer");
            }
        }
        Step::Shake(g) => {
            input.acceleration(*g)?;
        }
        Step::Cover => {
            input.proximity(true)?;
        }
        Step::Uncover => {
            input.proximity(false)?;
        }
        Step::End => match probe.visible_handoff() {
            Some(handoff) => handle.media_ended(handoff)?,
            None => tracing::warn!("nothing on screen to end"),
        },
        Step::Fail(reason) => probe.fail_next(reason.clone()),
    }
    Ok(())
}

fn sample_config() -> TrickConfig {
    TrickConfig {
        stages: vec![
            StageRecord {
                id: "intro".to_string(),
                kind: MediaKind::Video,
                source: "intro.mp4".to_string(),
                mode: PlaybackMode::Loop,
                triggers: vec![
                    TriggerRecord::new(TriggerType::Tap3, "reveal"),
                    TriggerRecord::new(TriggerType::Blow, "reveal"),
                ],
                description: "Idle loop until the spectator blows".to_string(),
                show_time: true,
            },
            StageRecord {
                id: "reveal".to_string(),
                kind: MediaKind::Video,
                source: "reveal.mp4".to_string(),
                mode: PlaybackMode::OneShot,
                triggers: vec![TriggerRecord::new(TriggerType::Auto, imagic_core::EXIT_SENTINEL)],
                description: "Reveal, then quit".to_string(),
                show_time: false,
            },
        ],
        ..TrickConfig::default()
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless host for Imagic stage graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check a trick config and report what it contains.
    Validate {
        /// Path to the trick config (JSON).
        config: PathBuf,
    },
    /// Write a small sample trick config.
    Init {
        /// Output path for the generated config.
        output: PathBuf,
    },
    /// Drive the engine with a scripted input stream.
    Run {
        /// Path to the trick config (JSON). Missing or corrupt files start empty.
        config: PathBuf,
        /// Input script; read from stdin when omitted.
        #[arg(short, long)]
        script: Option<PathBuf>,
        /// Classifier tuning overrides (JSON).
        #[arg(long)]
        settings: Option<PathBuf>,
        /// Resolve relative media sources here and require the files to exist.
        #[arg(long)]
        media_root: Option<PathBuf>,
    },
}
