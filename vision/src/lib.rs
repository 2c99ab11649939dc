pub mod admission;
pub mod detection;
pub mod error;
pub mod frame;
pub mod render;
pub mod transform;

use std::time::Instant;

pub use admission::{Admission, FrameAdmissionController, FrameSource};
pub use detection::{Detection, Detector, Region, TrackerOverlay};
pub use error::VisionError;
pub use frame::PixelBuffer;
pub use render::Renderer;
pub use transform::{build_transform, AffineTransform, Rotation};

/// Session parameters, fixed at start except for the canvas size, which the
/// renderer reads fresh from each canvas it is handed.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub preview_width: i32,
    pub preview_height: i32,
    pub rotation_degrees: i32,
    pub crop_size: i32,
    pub maintain_aspect: bool,
    pub min_confidence: f32,
}

impl Default for SessionConfig {
    fn default() -> SessionConfig {
        SessionConfig {
            preview_width: 640,
            preview_height: 480,
            rotation_degrees: 90,
            crop_size: 300,
            maintain_aspect: false,
            min_confidence: 0.5,
        }
    }
}

/// Wires the admission controller, a detector and a tracker overlay into one
/// per-frame pipeline. Transform construction happens once here; a geometry
/// failure at this point is fatal and propagates to the caller.
pub struct DetectionSession<D: Detector, T: TrackerOverlay> {
    controller: FrameAdmissionController,
    crop_to_frame: AffineTransform,
    detector: D,
    tracker: T,
    min_confidence: f32,
}

impl<D: Detector, T: TrackerOverlay> DetectionSession<D, T> {
    pub fn new(config: &SessionConfig, detector: D, tracker: T) -> Result<Self, VisionError> {
        let frame_to_crop = build_transform(
            config.preview_width,
            config.preview_height,
            config.crop_size,
            config.crop_size,
            config.rotation_degrees,
            config.maintain_aspect,
        )?;
        let crop_to_frame = frame_to_crop.invert()?;

        log::info!(
            "session start: preview {}x{}, crop {}, rotation {}",
            config.preview_width,
            config.preview_height,
            config.crop_size,
            config.rotation_degrees
        );

        Ok(DetectionSession {
            controller: FrameAdmissionController::new(
                config.preview_width as usize,
                config.preview_height as usize,
                config.crop_size as usize,
                frame_to_crop,
            ),
            crop_to_frame,
            detector,
            tracker,
            min_confidence: config.min_confidence,
        })
    }

    /// Per-frame entry point. Admission failures and detector errors are
    /// logged and swallowed; the next frame simply supersedes this one.
    pub fn process_frame<S: FrameSource>(&mut self, source: &mut S) -> Admission {
        let outcome = self.controller.on_frame_available(source);

        if let Admission::Admitted { timestamp } = outcome {
            let started = Instant::now();
            let detections = self
                .controller
                .with_crop(|crop| self.detector.detect(crop));
            match detections {
                Ok(detections) => {
                    let tracked = self.project_to_frame(detections);
                    self.tracker.on_results(&tracked, timestamp);
                    log::debug!(
                        "frame {timestamp}: {} detections in {}ms",
                        tracked.len(),
                        started.elapsed().as_millis()
                    );
                }
                Err(e) => log::error!("detector failed on frame {timestamp}: {e}"),
            }
        }

        outcome
    }

    fn project_to_frame(&self, detections: Vec<Detection>) -> Vec<Detection> {
        detections
            .into_iter()
            .filter(|d| d.confidence >= self.min_confidence)
            .map(|d| Detection {
                bounds: d.bounds.transformed(&self.crop_to_frame),
                ..d
            })
            .collect()
    }

    pub fn controller(&self) -> &FrameAdmissionController {
        &self.controller
    }

    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    pub fn crop_to_frame(&self) -> &AffineTransform {
        &self.crop_to_frame
    }
}
