//! Freecam Capture
//!
//! Headless driver for the capture core. A simulated render thread stands in
//! for the game's present hook, so every capture mode can be run end to end
//! and its files inspected.
//!
//! Usage: `freecam-capture [single|panorama|lightfield|test|bokeh] [--config <path>] [--out <dir>]`

use anyhow::{bail, Context, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use freecam_capture::camera::{CameraPose, LiveCamera, PoseMirror, DEFAULT_FOV};
use freecam_capture::capture::ScreenshotController;
use freecam_capture::config::{MultiShotType, Settings};
use freecam_capture::notify::LogNotifier;
use freecam_capture::paths;
use freecam_capture::system::{Action, ScriptedInput, System, BOKEH_FRAME_INTERVAL, FRAME_SLEEP};

const FRAME_WIDTH: u32 = 320;
const FRAME_HEIGHT: u32 = 180;

/// Time between simulated presents, roughly 120 fps.
const PRESENT_INTERVAL: Duration = Duration::from_millis(8);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Single,
    MultiShot(Option<MultiShotType>),
    TestRun,
    Bokeh,
}

struct Args {
    mode: Mode,
    config: PathBuf,
    out: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        mode: Mode::Single,
        config: paths::get_config_path(),
        out: None,
    };
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "single" => args.mode = Mode::Single,
            "multi" => args.mode = Mode::MultiShot(None),
            "panorama" => args.mode = Mode::MultiShot(Some(MultiShotType::HorizontalPanorama)),
            "lightfield" => args.mode = Mode::MultiShot(Some(MultiShotType::Lightfield)),
            "test" => args.mode = Mode::TestRun,
            "bokeh" => args.mode = Mode::Bokeh,
            "--config" => {
                args.config = iter.next().map(PathBuf::from).context("--config needs a path")?;
            }
            "--out" => {
                args.out = Some(iter.next().map(PathBuf::from).context("--out needs a directory")?);
            }
            other => bail!("Unknown argument: {}", other),
        }
    }
    Ok(args)
}

fn init_logging() -> Result<()> {
    let log_path = paths::get_logs_dir().join("freecam_capture.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("freecam_capture=info,notification=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(log_file)),
        )
        .with(env_filter)
        .init();
    Ok(())
}

/// Draws a test pattern that shifts with the camera, so neighbouring shots differ.
fn render_frame(pose: &CameraPose) -> Vec<u8> {
    let shift_x = (pose.yaw * 100.0 + pose.position.x * 50.0) as i64;
    let shift_y = (pose.pitch * 100.0 + pose.position.y * 50.0) as i64;
    let mut frame = Vec::with_capacity((FRAME_WIDTH * FRAME_HEIGHT * 4) as usize);
    for y in 0..i64::from(FRAME_HEIGHT) {
        for x in 0..i64::from(FRAME_WIDTH) {
            let u = (x + shift_x).rem_euclid(256) as u8;
            let v = (y + shift_y).rem_euclid(256) as u8;
            frame.extend_from_slice(&[u, v, u ^ v, 255]);
        }
    }
    frame
}

/// Simulated present hook: grabs a frame whenever the controller asks for one.
fn spawn_renderer(
    controller: Arc<ScreenshotController>,
    live_camera: Arc<PoseMirror>,
    active: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while active.load(Ordering::SeqCst) {
            thread::sleep(PRESENT_INTERVAL);
            if controller.should_take_shot() {
                let frame = render_frame(&live_camera.pose());
                if controller.is_bokeh_shot() {
                    controller.store_bokeh_grabbed_shot(frame);
                } else {
                    controller.store_grabbed_shot(frame);
                }
            }
            controller.present_called();
        }
    })
}

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let msg = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        let location = panic_info
            .location()
            .map(|loc| format!(" at {}:{}:{}", loc.file(), loc.line(), loc.column()))
            .unwrap_or_default();
        eprintln!("[PANIC]{} {}", location, msg);
        error!("[PANIC]{} {}", location, msg);
    }));

    paths::ensure_directories()?;
    init_logging()?;

    let args = parse_args()?;
    let mut settings = Settings::load(&args.config);
    if let Some(out) = args.out {
        settings.screenshot.screenshot_folder = out;
    }
    if let Mode::MultiShot(Some(shot_type)) = args.mode {
        settings.screenshot.type_of_screenshot = shot_type;
    }
    info!(
        "Mode {:?}, writing to {}",
        args.mode,
        settings.screenshot.screenshot_folder.display()
    );

    let live_camera = Arc::new(PoseMirror::new(DEFAULT_FOV));
    let controller = Arc::new(ScreenshotController::new(
        live_camera.clone(),
        Arc::new(LogNotifier),
    ));
    controller.set_buffer_size(FRAME_WIDTH, FRAME_HEIGHT);

    let active = Arc::new(AtomicBool::new(true));
    let renderer = spawn_renderer(controller.clone(), live_camera.clone(), active.clone());

    let action = match args.mode {
        Mode::Single => Action::TakeScreenshot,
        Mode::MultiShot(_) => Action::TakeMultiShot,
        Mode::TestRun => Action::TestMultiShotSetup,
        Mode::Bokeh => Action::TakeBokehShot,
    };
    let script = ScriptedInput::new()
        .press(&[Action::CameraEnable])
        .press(&[action])
        .idle();
    let frames = script.remaining_frames();

    let live: Arc<dyn LiveCamera> = live_camera;
    let mut system = System::new(
        settings,
        controller.clone(),
        Box::new(script),
        live,
        Arc::new(LogNotifier),
    );

    for _ in 0..frames {
        thread::sleep(FRAME_SLEEP);
        system.update_frame();
    }
    while system.is_bokeh_rendering() {
        thread::sleep(BOKEH_FRAME_INTERVAL);
        system.update_frame();
    }

    active.store(false, Ordering::SeqCst);
    if renderer.join().is_err() {
        error!("Render thread panicked");
    }
    info!("Done");
    Ok(())
}
