// The control loop: read -> transform -> blit -> (UI poll | sleep).
// Visual expectation: the overlay refreshes at the effective frame rate
// until ctrl-c, the end of the camera stream, or ESC in the preview.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::info;

use crate::camera::FrameSource;
use crate::draw::{ControlPanel, UiCommand};
use crate::error::Error;
use crate::overlay::{OverlayBackend, OverlaySurface};
use crate::transform;
use crate::types::{AlphaCell, AlphaMode};

/// Interrupt flag: set from the signal handler, read at the start of each tick.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    /// Route ctrl-c into a fresh flag.
    pub fn install() -> Result<Self, Error> {
        let flag = Self::default();
        let handle = flag.clone();
        ctrlc::set_handler(move || handle.raise())
            .map_err(|e| Error::Signal(e.to_string()))?;
        Ok(flag)
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why the loop stopped. Every variant is a clean exit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    EndOfStream,
    QuitKey,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopping(StopReason),
    Terminated(StopReason),
}

pub struct Presenter<'a, S: FrameSource, B: OverlayBackend> {
    source: S,
    surface: OverlaySurface<B>,
    panel: Option<Box<dyn ControlPanel + 'a>>,
    alpha: &'a AlphaCell,
    mode: AlphaMode,
    interval: Duration,
    shutdown: ShutdownFlag,
    state: LoopState,
}

impl<'a, S: FrameSource, B: OverlayBackend> Presenter<'a, S, B> {
    pub fn new(
        source: S,
        surface: OverlaySurface<B>,
        panel: Option<Box<dyn ControlPanel + 'a>>,
        alpha: &'a AlphaCell,
        mode: AlphaMode,
        interval: Duration,
        shutdown: ShutdownFlag,
    ) -> Self {
        Self {
            source,
            surface,
            panel,
            alpha,
            mode,
            interval,
            shutdown,
            state: LoopState::Running,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> LoopState {
        self.state
    }

    #[cfg(test)]
    pub(crate) fn surface(&self) -> &OverlaySurface<B> {
        &self.surface
    }

    /// Run ticks until something asks to stop; returns the reason.
    pub fn run(&mut self) -> Result<StopReason, Error> {
        while self.state == LoopState::Running {
            // Safe point: only checked between ticks, never mid-blit.
            if self.shutdown.is_raised() {
                self.state = LoopState::Stopping(StopReason::Interrupted);
                break;
            }
            if let Some(reason) = self.tick()? {
                self.state = LoopState::Stopping(reason);
            }
        }

        let reason = match self.state {
            LoopState::Stopping(reason) | LoopState::Terminated(reason) => reason,
            LoopState::Running => StopReason::Interrupted,
        };
        self.state = LoopState::Terminated(reason);
        info!("overlay stopped: {reason:?}");
        Ok(reason)
    }

    /// One capture + transform + blit, then pacing.
    fn tick(&mut self) -> Result<Option<StopReason>, Error> {
        let started = Instant::now();

        let Some(frame) = self.source.read() else {
            return Ok(Some(StopReason::EndOfStream));
        };

        let alpha = self.alpha.get();
        {
            let mut view = self.surface.buffer_mut()?;
            transform::transform_into(&frame, &mut view, alpha, self.mode);
        }
        self.surface.blit()?;

        match self.panel.as_mut() {
            Some(panel) => {
                panel.show(self.surface.pixels(), self.surface.size(), alpha)?;
                // The key poll doubles as frame pacing.
                match panel.wait_key(self.interval, self.alpha)? {
                    Some(UiCommand::Quit) => return Ok(Some(StopReason::QuitKey)),
                    Some(UiCommand::Preset(preset)) => self.surface.apply_preset(preset)?,
                    None => {}
                }
            }
            None => thread::sleep(self.interval.saturating_sub(started.elapsed())),
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    use image::Rgb;

    use super::*;
    use crate::overlay::tests::FakeDisplay;
    use crate::overlay::{Layout, Preset};
    use crate::types::{Frame, Size};

    /// Serves queued frames, then reports end-of-stream.
    struct ScriptedSource {
        frames: VecDeque<Frame>,
        reads: usize,
        // Raised after this many reads, as if ctrl-c landed mid-tick.
        interrupt_after: Option<(usize, ShutdownFlag)>,
    }

    impl ScriptedSource {
        fn new(count: usize) -> Self {
            let frames = (0..count).map(|_| Frame::from_pixel(4, 3, Rgb([200, 100, 50]))).collect();
            Self { frames, reads: 0, interrupt_after: None }
        }
    }

    impl FrameSource for ScriptedSource {
        fn native_size(&self) -> Size {
            Size::new(4, 3)
        }

        fn native_fps(&self) -> u32 {
            30
        }

        fn read(&mut self) -> Option<Frame> {
            self.reads += 1;
            if let Some((n, flag)) = &self.interrupt_after {
                if self.reads >= *n {
                    flag.raise();
                }
            }
            self.frames.pop_front()
        }
    }

    /// Replays scripted key results and records what it was shown.
    struct ScriptedPanel {
        keys: VecDeque<Option<UiCommand>>,
        slider: Option<u8>,
        shown: Rc<RefCell<Vec<(Size, u8)>>>,
    }

    impl ControlPanel for ScriptedPanel {
        fn show(&mut self, bgra: &[u8], size: Size, alpha: u8) -> Result<(), Error> {
            assert_eq!(bgra.len(), size.area() * 4);
            self.shown.borrow_mut().push((size, alpha));
            Ok(())
        }

        fn wait_key(&mut self, _timeout: Duration, alpha: &AlphaCell) -> Result<Option<UiCommand>, Error> {
            if let Some(v) = self.slider.take() {
                alpha.set(v);
            }
            Ok(self.keys.pop_front().flatten())
        }
    }

    fn surface() -> OverlaySurface<FakeDisplay> {
        let layout = Layout::new(Size::new(40, 30), Size::new(4, 3));
        OverlaySurface::create(FakeDisplay::new(40, 30), layout, true).unwrap()
    }

    fn presenter<'a>(
        source: ScriptedSource,
        panel: Option<Box<dyn ControlPanel + 'a>>,
        alpha: &'a AlphaCell,
        shutdown: ShutdownFlag,
    ) -> Presenter<'a, ScriptedSource, FakeDisplay> {
        Presenter::new(
            source,
            surface(),
            panel,
            alpha,
            AlphaMode::UniformScale,
            Duration::from_millis(1),
            shutdown,
        )
    }

    #[test]
    fn end_of_stream_stops_cleanly() {
        let alpha = AlphaCell::new(30);
        let mut p = presenter(ScriptedSource::new(3), None, &alpha, ShutdownFlag::default());

        assert_eq!(p.run().unwrap(), StopReason::EndOfStream);
        assert_eq!(p.state(), LoopState::Terminated(StopReason::EndOfStream));
        assert_eq!(p.surface().backend().puts.len(), 3);
    }

    #[test]
    fn interrupt_mid_tick_finishes_the_tick() {
        let alpha = AlphaCell::new(30);
        let shutdown = ShutdownFlag::default();
        let mut source = ScriptedSource::new(10);
        source.interrupt_after = Some((1, shutdown.clone()));
        let mut p = presenter(source, None, &alpha, shutdown);

        assert_eq!(p.run().unwrap(), StopReason::Interrupted);
        // The frame read when the signal arrived was still transformed and blitted.
        assert_eq!(p.surface().backend().puts, vec![Size::new(40, 30)]);
        // Fully written: uniform 30% of (R=200,G=100,B=50,A=255).
        assert!(p.surface().pixels().chunks_exact(4).all(|px| px == [15, 30, 60, 76]));
    }

    #[test]
    fn interrupt_before_first_tick_blits_nothing() {
        let alpha = AlphaCell::new(30);
        let shutdown = ShutdownFlag::default();
        shutdown.raise();
        let mut p = presenter(ScriptedSource::new(5), None, &alpha, shutdown);

        assert_eq!(p.run().unwrap(), StopReason::Interrupted);
        assert!(p.surface().backend().puts.is_empty());
    }

    #[test]
    fn quit_key_stops_after_current_blit() {
        let alpha = AlphaCell::new(30);
        let shown = Rc::new(RefCell::new(Vec::new()));
        let panel = ScriptedPanel {
            keys: VecDeque::from([None, Some(UiCommand::Quit)]),
            slider: None,
            shown: shown.clone(),
        };
        let mut p = presenter(ScriptedSource::new(10), Some(Box::new(panel)), &alpha, ShutdownFlag::default());

        assert_eq!(p.run().unwrap(), StopReason::QuitKey);
        assert_eq!(p.surface().backend().puts.len(), 2);
        assert_eq!(shown.borrow().len(), 2);
    }

    #[test]
    fn preset_key_resizes_before_next_write() {
        let alpha = AlphaCell::new(30);
        let shown = Rc::new(RefCell::new(Vec::new()));
        let panel = ScriptedPanel {
            keys: VecDeque::from([Some(UiCommand::Preset(Preset::Small)), Some(UiCommand::Preset(Preset::Corner))]),
            slider: None,
            shown: shown.clone(),
        };
        let mut p = presenter(ScriptedSource::new(3), Some(Box::new(panel)), &alpha, ShutdownFlag::default());

        assert_eq!(p.run().unwrap(), StopReason::EndOfStream);
        // Reduced size for a 40x30 screen and 4:3 video is 20x15.
        let puts = &p.surface().backend().puts;
        assert_eq!(puts, &vec![Size::new(40, 30), Size::new(20, 15), Size::new(20, 15)]);
        assert_eq!(p.surface().geometry(), crate::types::Rect::new(20, 15, 20, 15));
    }

    #[test]
    fn slider_value_reaches_next_frame() {
        let alpha = AlphaCell::new(30);
        let shown = Rc::new(RefCell::new(Vec::new()));
        let panel = ScriptedPanel {
            keys: VecDeque::new(),
            slider: Some(100),
            shown: shown.clone(),
        };
        let mut p = presenter(ScriptedSource::new(2), Some(Box::new(panel)), &alpha, ShutdownFlag::default());

        p.run().unwrap();
        let alphas: Vec<u8> = shown.borrow().iter().map(|(_, a)| *a).collect();
        assert_eq!(alphas, vec![30, 100]);
        assert!(p.surface().pixels().chunks_exact(4).all(|px| px == [50, 100, 200, 255]));
    }
}
