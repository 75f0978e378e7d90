//! Spell Shooter headless runner
//!
//! Loads a curriculum, plays one session with the demo player and prints
//! the outcome. Hosts with a screen drive `SessionLoop` the same way.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use spell_shooter::records::JsonFileStore;
use spell_shooter::sim::GameEvent;
use spell_shooter::sim::autopilot::next_command;
use spell_shooter::{
    Curriculum, DrillMode, ManualScheduler, MemoryStore, OutcomeStore, Selection, SessionLoop,
    Settings,
};

const BUNDLED_CURRICULUM: &str = include_str!("../demos/shoot.json");

/// Wall-clock milliseconds per simulated frame
const FRAME_MS: u64 = 16;

#[derive(Parser)]
#[command(name = "spell-shooter", version, about = "Arcade spelling drill (headless runner)")]
struct Cli {
    #[arg(long, help = "Curriculum JSON file (defaults to the bundled demo)")]
    curriculum: Option<PathBuf>,

    #[arg(short, long, help = "Category name (defaults to the first)")]
    category: Option<String>,

    #[arg(short, long, help = "Subcategory name (defaults to the first)")]
    subcategory: Option<String>,

    #[arg(short, long, help = "Drill mode (letter-rounds, word)")]
    mode: Option<String>,

    #[arg(long, help = "Print the selection preview and exit")]
    preview: bool,

    #[arg(long, default_value_t = 42, help = "Session RNG seed")]
    seed: u64,

    #[arg(long, help = "Records JSON file (in-memory when omitted)")]
    records: Option<PathBuf>,

    #[arg(long, help = "Settings JSON file")]
    settings: Option<PathBuf>,

    #[arg(long, default_value_t = 60 * 60 * 10, help = "Abandon the session after this many frames")]
    max_frames: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let curriculum = match &cli.curriculum {
        Some(path) => Curriculum::load(path)
            .with_context(|| format!("loading curriculum {}", path.display()))?,
        None => Curriculum::from_json(BUNDLED_CURRICULUM).context("parsing bundled curriculum")?,
    };

    let category = match cli.category.clone() {
        Some(c) => c,
        None => curriculum
            .category_names()
            .next()
            .map(str::to_string)
            .context("curriculum has no categories")?,
    };
    let subcategory = match cli.subcategory.clone() {
        Some(s) => s,
        None => curriculum
            .subcategory_names(&category)
            .next()
            .map(str::to_string)
            .with_context(|| format!("category {category} has no subcategories"))?,
    };
    let requested = match cli.mode.as_deref() {
        Some(m) => match DrillMode::parse(m) {
            Some(mode) => mode,
            None => bail!("unknown mode {m}"),
        },
        None => DrillMode::default(),
    };
    let mode = curriculum.resolve_mode(&category, &subcategory, requested);
    if mode != requested {
        log::info!("Mode {} unavailable, using {}", requested, mode);
    }
    let selection = Selection::new(category, subcategory, mode);

    if cli.preview {
        println!("{}", curriculum.preview(&selection));
        return Ok(());
    }

    let settings = cli
        .settings
        .as_deref()
        .map(Settings::load)
        .unwrap_or_default();

    match &cli.records {
        Some(path) => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("opening records {}", path.display()))?;
            run(&cli, &curriculum, &selection, settings, store)
        }
        None => run(&cli, &curriculum, &selection, settings, MemoryStore::new()),
    }
}

/// Play one session to completion (or until `max_frames`) with the demo player
fn run<O: OutcomeStore>(
    cli: &Cli,
    curriculum: &Curriculum,
    selection: &Selection,
    settings: Settings,
    store: O,
) -> Result<()> {
    let mut game = SessionLoop::new(ManualScheduler::new(), store, settings);
    let mut now_ms = 0;

    let events = game.start(curriculum, selection, cli.seed, now_ms)?;
    report(&events);
    if let Some(speech) = game.hint_speech() {
        log::debug!("Speak [{}]: {}", speech.language, speech.text);
    }

    let mut frames = 0;
    while let Some(handle) = game.scheduler_mut().take_due() {
        if frames >= cli.max_frames {
            log::warn!("Frame limit reached, abandoning session");
            game.finish(now_ms);
            break;
        }
        if let Some(command) = game.state().and_then(next_command) {
            if let Some(event) = game.command(command, now_ms) {
                report(std::slice::from_ref(&event));
            }
        }
        now_ms += FRAME_MS;
        let events = game.on_frame(handle, now_ms);
        report(&events);
        if events.iter().any(|e| matches!(e, GameEvent::RoundStarted { .. })) {
            if let Some(speech) = game.hint_speech() {
                log::debug!("Speak [{}]: {}", speech.language, speech.text);
            }
        }
        frames += 1;
    }

    let state = game.state().context("session vanished")?;
    println!(
        "{} / {} ({}): {:?}",
        selection.category,
        selection.subcategory,
        selection.mode,
        state.outcome()
    );
    println!(
        "score {}  right {}  wrong {}  rounds {}",
        state.score.score,
        state.right_count(),
        state.score.wrong,
        state.round_label()
    );
    println!("high score {}", game.high_score(selection));
    Ok(())
}

fn report(events: &[GameEvent]) {
    for event in events {
        match event {
            GameEvent::RoundStarted { index, count, hint } => {
                log::info!("Round {}/{}: {}", index + 1, count, hint)
            }
            GameEvent::Hit { token, correct, points } => {
                log::info!("Hit {} ({}, {:+})", token, if *correct { "right" } else { "wrong" }, points)
            }
            GameEvent::Finished { outcome } => log::info!("Finished: {:?}", outcome),
            other => log::trace!("{:?}", other),
        }
    }
}
