// What you SEE now:
// • Your camera, semi-transparent, on top of every other window.
// • Clicks and keys go straight through it to whatever is underneath.
// • With --ui: a small preview + ALPHA slider; ESC quits, R/C/F/S move the overlay.
// • ctrl-c (or the camera going away) exits cleanly.

mod camera;
mod config;
mod draw;
mod error;
mod overlay;
mod presenter;
mod transform;
mod types;
mod x11;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

use camera::{CameraCapture, FrameSource};
use config::Config;
use draw::{ControlPanel, Drawer};
use error::Error;
use overlay::{Layout, OverlayBackend, OverlaySurface};
use presenter::{Presenter, ShutdownFlag, StopReason};
use types::{AlphaCell, Size};
use x11::X11Backend;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let config = Config::parse();

    match run(&config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}, terminating");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config) -> Result<StopReason, Error> {
    info!("ctrl-c to exit, have fun");
    info!("{config:?}");
    let shutdown = ShutdownFlag::install()?;

    /* --- Camera ---
       Fails right here with "no video signal" if the device is missing. */
    let camera = CameraCapture::open(config.cam)?;
    let video = camera.native_size();

    /* --- Overlay ---
       Visual: the click-through window appears, full screen or at the quarter offset. */
    let backend = X11Backend::connect()?;
    let layout = Layout::new(backend.screen_size(), video);
    let surface = OverlaySurface::create(backend, layout, config.fs)?;
    info!(
        "screen {}, reduced overlay {}, overlay at {:?}",
        surface.layout().screen,
        surface.layout().reduced,
        surface.geometry()
    );

    let fps = config::effective_fps(config.fps, camera.native_fps());
    info!("Use FPS: {fps}");

    let alpha = AlphaCell::new(config.alpha);

    /* --- Optional debug preview ---
       Visual: a quarter-size window mirroring the overlay, with the slider below. */
    let panel: Option<Box<dyn ControlPanel>> = if config.ui {
        let shown = surface.size();
        let preview = Size::new(shown.width / 4, shown.height / 4);
        Some(Box::new(Drawer::new("UI Overlay", preview)?))
    } else {
        None
    };

    let mut presenter = Presenter::new(
        camera,
        surface,
        panel,
        &alpha,
        config.alpha_mode(),
        config::frame_interval(fps),
        shutdown,
    );
    presenter.run()
}
