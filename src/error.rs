// One error type for the whole overlay.
// Every variant states *where* things went wrong.
use thiserror::Error;

use crate::types::Size;

#[derive(Debug, Error)]
pub enum Error {
    /// Opening/starting the camera failed.
    #[error("No video signal found ({0})")]
    NoVideoSignal(String),

    /// The display has no 32-bit TrueColor visual, so no alpha-capable overlay.
    #[error("No visual found supporting RGBA color")]
    NoTrueColorVisual,

    /// Talking to the display server failed.
    #[error("Display error: {0}")]
    Display(String),

    /// A write or blit was attempted after a geometry change without reacquiring the buffer.
    #[error("Overlay buffer is {buffer} but window is {window}; reacquire before writing")]
    StaleBuffer { buffer: Size, window: Size },

    /// Creating the debug preview window failed.
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the debug preview window failed.
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Installing the interrupt handler failed.
    #[error("Signal handler error: {0}")]
    Signal(String),
}
