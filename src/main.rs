use std::fs::File;
use std::io;
use std::process;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing_subscriber::EnvFilter;

use ledscene::{
    config::PlayerConfig,
    engine::{source::SceneSource, RenderReport, Scene},
    player::{write_snapshot, Player},
    renderer,
    surface::Canvas,
    types::Frame,
};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

const PLAY_USAGE: &str = "ledscene play <scene.yml>";
const CHECK_USAGE: &str = "ledscene check <scene.yml> [seconds]";
const FRAME_USAGE: &str = "ledscene frame <scene.yml> [seconds] [--json]";

fn run() -> Result<()> {
    let mut args = std::env::args().skip(1);

    match args.next().as_deref() {
        Some("play") => {
            let path = args.next().context(PLAY_USAGE)?;
            init_tracing(true)?;
            play(&path)
        }
        Some("check") => {
            let path = args.next().context(CHECK_USAGE)?;
            let seconds = parse_seconds(args.next(), Duration::from_secs(1)).context(CHECK_USAGE)?;
            init_tracing(false)?;
            check(&path, seconds)
        }
        Some("frame") => {
            let path = args.next().context(FRAME_USAGE)?;
            let mut seconds = Duration::ZERO;
            let mut json = false;
            for arg in args {
                if arg == "--json" {
                    json = true;
                } else {
                    seconds = parse_seconds(Some(arg), Duration::ZERO).context(FRAME_USAGE)?;
                }
            }
            init_tracing(false)?;
            frame(&path, seconds, json)
        }
        _ => bail!(
            "ledscene: animated scene player for LED matrices\n\nUsage:\n  {PLAY_USAGE}\n  {CHECK_USAGE}\n  {FRAME_USAGE}"
        ),
    }
}

fn parse_seconds(arg: Option<String>, default: Duration) -> Result<Duration> {
    let Some(arg) = arg else {
        return Ok(default);
    };
    let seconds: f64 = arg
        .parse()
        .with_context(|| format!("Invalid seconds: {arg}"))?;
    Duration::try_from_secs_f64(seconds).with_context(|| format!("Invalid seconds: {arg}"))
}

/// The player owns the terminal, so `play` logs to a file instead of stderr.
fn init_tracing(to_file: bool) -> Result<()> {
    let subscriber = tracing_subscriber::fmt().with_env_filter(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );

    if to_file {
        let path = std::env::var("LEDSCENE_LOG").unwrap_or_else(|_| "ledscene.log".into());
        let file = File::create(&path).with_context(|| format!("Failed to create log file {path}"))?;
        subscriber.with_ansi(false).with_writer(Mutex::new(file)).init();
    } else {
        subscriber.with_writer(io::stderr).init();
    }
    Ok(())
}

fn play(path: &str) -> Result<()> {
    let config = PlayerConfig::load();
    let scene = SceneSource::load(path)?;
    let watcher = SceneSource::watch(path, config.watch_config())?;

    let mut player = Player::new(scene, Some(watcher), config);
    player.play()
}

fn check(path: &str, seconds: Duration) -> Result<()> {
    let config = PlayerConfig::load();
    let mut scene = SceneSource::load(path)?;
    let mut canvas = Canvas::new(scene.width(), scene.height());

    let mut frames = 0;
    let mut problems = Vec::new();
    step(&mut scene, &mut canvas, &config, seconds, |report| {
        frames += 1;
        for failure in &report.failures {
            problems.push(failure.to_string());
        }
        for error in &report.animation_errors {
            problems.push(error.to_string());
        }
    });
    problems.sort();
    problems.dedup();

    if !problems.is_empty() {
        bail!(
            "{} problem(s) in {path} over {frames} frames:\n  {}",
            problems.len(),
            problems.join("\n  ")
        );
    }
    eprintln!(
        "{path}: {} objects, {} animations, {frames} frames OK",
        scene.objects().len(),
        scene.animations().len(),
    );
    Ok(())
}

fn frame(path: &str, seconds: Duration, json: bool) -> Result<()> {
    let config = PlayerConfig::load();
    let mut scene = SceneSource::load(path)?;
    let mut canvas = Canvas::new(scene.width(), scene.height());

    step(&mut scene, &mut canvas, &config, seconds, |_| {});
    let cells = renderer::grid(&canvas, config.contract());
    if json {
        println!("{}", serde_json::to_string_pretty(&Frame::Full { cells })?);
        return Ok(());
    }
    write_snapshot(&mut io::stdout(), &cells)
}

/// Render from time 0 to `end` at the configured frame interval. The canvas
/// holds the last frame afterwards.
fn step(
    scene: &mut Scene,
    canvas: &mut Canvas,
    config: &PlayerConfig,
    end: Duration,
    mut on_report: impl FnMut(&RenderReport),
) {
    let background = config.background();
    let interval = config.frame_interval();
    let mut now = Duration::ZERO;
    loop {
        canvas.clear(background);
        on_report(&scene.render_at(canvas, now));
        if now >= end {
            break;
        }
        now = now.saturating_add(interval).min(end);
    }
}
