// Command-line flags and the frame pacing derived from them.

use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::types::AlphaMode;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Live camera feed as a click-through overlay on top of the desktop")]
pub struct Config {
    /// Default cam device index.
    #[arg(long, env = "CAM_OVERLAY_CAM", default_value_t = 0)]
    pub cam: u32,

    /// Limit, upper update rate of overlay.
    #[arg(
        long,
        env = "CAM_OVERLAY_FPS",
        default_value_t = 25,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub fps: u32,

    /// Full screen at start.
    #[arg(
        long,
        env = "CAM_OVERLAY_FS",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub fs: bool,

    /// Show the debug preview with an alpha slider (keys: ESC R C F S).
    #[arg(
        long,
        env = "CAM_OVERLAY_UI",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub ui: bool,

    /// Default transparency percent.
    #[arg(
        long,
        env = "CAM_OVERLAY_ALPHA",
        default_value_t = 30,
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub alpha: u8,

    /// If true only the alpha channel is changed.
    #[arg(
        long = "onlyAlphaChan",
        env = "CAM_OVERLAY_ONLY_ALPHA_CHAN",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub only_alpha_chan: bool,
}

impl Config {
    pub fn alpha_mode(&self) -> AlphaMode {
        if self.only_alpha_chan {
            AlphaMode::AlphaChannelOnly
        } else {
            AlphaMode::UniformScale
        }
    }
}

/// Native rate floored at 1, capped by the configured rate.
pub fn effective_fps(configured: u32, native: u32) -> u32 {
    native.max(1).min(configured.max(1))
}

/// Whole milliseconds per frame.
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(fps.max(1)))
}
