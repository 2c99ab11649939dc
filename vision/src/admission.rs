use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::VisionError;
use crate::frame::{warp_into, PixelBuffer};
use crate::transform::AffineTransform;

/// Camera-side contract. The controller calls `request_next_frame` exactly
/// once per delivered frame, admitted or not, so capture never stalls.
pub trait FrameSource {
    /// Raw pixels of the frame being delivered, row-major, packed 0xAARRGGBB.
    /// `None` when the capture buffer is not available for this frame.
    fn frame_pixels(&mut self) -> Option<&[u32]>;

    /// Signals that the source may reuse its capture buffer.
    fn request_next_frame(&mut self);
}

/// Non-blocking single-flight gate: at most one holder, excess entries are
/// refused rather than queued. This is not a mutex; nobody ever waits on it.
pub struct SingleFlightGate {
    busy: AtomicBool,
}

impl SingleFlightGate {
    pub fn new() -> SingleFlightGate {
        SingleFlightGate {
            busy: AtomicBool::new(false),
        }
    }

    /// Idle -> Busy. Returns false when already busy.
    pub fn try_enter(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Busy -> Idle.
    pub fn exit(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for SingleFlightGate {
    fn default() -> Self {
        SingleFlightGate::new()
    }
}

/// Outcome of one frame delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Pixels copied, crop populated, hand-off complete.
    Admitted { timestamp: u64 },
    /// A previous hand-off was still in flight; the frame was discarded.
    Dropped,
    /// The source had no usable pixel data; buffers untouched.
    Skipped,
}

struct Buffers {
    frame: PixelBuffer,
    crop: PixelBuffer,
}

/// Decides, per camera frame, whether to admit it into the shared frame and
/// crop buffers or drop it. The gate is released as soon as the hand-off
/// completes (crop populated, next frame requested), not when downstream
/// detection finishes; detection throughput is the bottleneck and dropping
/// beats buffering.
pub struct FrameAdmissionController {
    gate: SingleFlightGate,
    buffers: Mutex<Buffers>,
    frame_to_crop: AffineTransform,
    timestamp: AtomicU64,
}

impl FrameAdmissionController {
    pub fn new(
        preview_width: usize,
        preview_height: usize,
        crop_size: usize,
        frame_to_crop: AffineTransform,
    ) -> FrameAdmissionController {
        FrameAdmissionController {
            gate: SingleFlightGate::new(),
            buffers: Mutex::new(Buffers {
                frame: PixelBuffer::new(preview_width, preview_height),
                crop: PixelBuffer::new(crop_size, crop_size),
            }),
            frame_to_crop,
            timestamp: AtomicU64::new(0),
        }
    }

    /// Entry point for the frame-delivery context. Never blocks the source:
    /// a busy gate means the frame is dropped on the spot.
    pub fn on_frame_available<S: FrameSource>(&self, source: &mut S) -> Admission {
        let timestamp = self.timestamp.fetch_add(1, Ordering::SeqCst) + 1;

        if !self.gate.try_enter() {
            log::debug!("dropping frame {timestamp}: previous hand-off still in flight");
            source.request_next_frame();
            return Admission::Dropped;
        }

        let admitted = self.copy_and_crop(source, timestamp);

        // Hand-off: the source may overwrite its capture buffer from here on,
        // and the gate reopens before any detector work happens.
        source.request_next_frame();
        self.gate.exit();

        if admitted {
            Admission::Admitted { timestamp }
        } else {
            Admission::Skipped
        }
    }

    fn copy_and_crop<S: FrameSource>(&self, source: &mut S, timestamp: u64) -> bool {
        let mut buffers = self.buffers.lock().unwrap();
        let Buffers { frame, crop } = &mut *buffers;

        let Some(raw) = source.frame_pixels() else {
            log::debug!("skipping frame {timestamp}: {}", VisionError::MissingFrameData);
            return false;
        };
        if let Err(e) = frame.copy_from(raw) {
            log::warn!("skipping frame {timestamp}: {e}");
            return false;
        }
        if let Err(e) = warp_into(frame, crop, &self.frame_to_crop) {
            log::warn!("skipping frame {timestamp}: {e}");
            return false;
        }
        true
    }

    /// Latest admitted frame, for the display-refresh path. Not gated: a
    /// stale frame simply re-renders the last admitted content.
    pub fn with_frame<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> R {
        f(&self.buffers.lock().unwrap().frame)
    }

    /// Latest crop, for the detector.
    pub fn with_crop<R>(&self, f: impl FnOnce(&PixelBuffer) -> R) -> R {
        f(&self.buffers.lock().unwrap().crop)
    }

    pub fn frame_to_crop(&self) -> &AffineTransform {
        &self.frame_to_crop
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Count of frames delivered so far, admitted or not.
    pub fn frames_delivered(&self) -> u64 {
        self.timestamp.load(Ordering::SeqCst)
    }
}
