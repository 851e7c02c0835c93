// Opens a camera by index and hands out one RGB frame per call.
// Visual expectation: when the loop calls `read()`, you get the camera's
// current picture at its native resolution, ready for the transform.

use log::{info, warn};

use crate::error::Error;
use crate::types::{Frame, Size};

// Bring in nokhwa types for camera control.
use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{CameraIndex, RequestedFormat, RequestedFormatType},
};

/// Anything the loop can pull frames from.
pub trait FrameSource {
    /// Width/height of the frames `read` returns.
    fn native_size(&self) -> Size;

    /// Frame rate the device reports (may be 0 if unknown).
    fn native_fps(&self) -> u32;

    /// Next frame, or `None` once the stream has ended (or failed).
    fn read(&mut self) -> Option<Frame>;
}

// A small wrapper around nokhwa::Camera so our main loop stays clean.
pub struct CameraCapture {
    cam: Camera,
    size: Size,
    fps: u32,
}

impl CameraCapture {
    /// Open device `index` with its default format and start streaming.
    /// Fails with `NoVideoSignal` when there is no such device or it won't stream.
    pub fn open(index: u32) -> Result<Self, Error> {
        let idx = CameraIndex::Index(index);

        // Let the device pick its own format; we adapt to whatever it delivers.
        let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);

        let mut cam = Camera::new(idx, req)
            .map_err(|e| Error::NoVideoSignal(format!("create camera {index}: {e}")))?;

        cam.open_stream()
            .map_err(|e| Error::NoVideoSignal(format!("open stream: {e}")))?;

        // The stream decides the real resolution/rate; read them back.
        let actual = cam.resolution();
        let size = Size::new(actual.width(), actual.height());
        let fps = cam.frame_rate();
        info!("camera {index}: {size} @ {fps} fps");

        Ok(Self { cam, size, fps })
    }
}

impl FrameSource for CameraCapture {
    fn native_size(&self) -> Size {
        self.size
    }

    fn native_fps(&self) -> u32 {
        self.fps
    }

    fn read(&mut self) -> Option<Frame> {
        // Blocks until the device has a new frame.
        let raw = match self.cam.frame() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("fetch frame failed, ending stream: {e}");
                return None;
            }
        };

        let decoded = match raw.decode_image::<RgbFormat>() {
            Ok(img) => img,
            Err(e) => {
                warn!("decode frame failed, ending stream: {e}");
                return None;
            }
        };

        // Rebuild as our own image type so nokhwa's image version never leaks out.
        let (w, h) = decoded.dimensions();
        Frame::from_raw(w, h, decoded.into_raw())
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.cam.stop_stream() {
            warn!("stop stream: {e}");
        }
    }
}
