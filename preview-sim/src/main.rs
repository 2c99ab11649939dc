use std::time::Instant;

use nalgebra::Vector2;
use rand::{thread_rng, rngs::ThreadRng, Rng};
use vision::{
    Admission, Detection, DetectionSession, Detector, FrameSource, PixelBuffer, Region, Renderer,
    Rotation, SessionConfig, TrackerOverlay,
};

const PREVIEW_WIDTH: i32 = 640;
const PREVIEW_HEIGHT: i32 = 480;
const CROP_SIZE: i32 = 300;
const SENSOR_ROTATION: i32 = 90;
const MIN_CONFIDENCE: f32 = 0.5;
const FRAME_COUNT: u32 = 120;
const SQUARE_SIZE: i32 = 80;

const BACKGROUND: u32 = 0xFF10_1820;
const SQUARE_COLOR: u32 = 0xFFF0_F0F0;

fn main() -> anyhow::Result<()> {
    setup_logging();

    let config = SessionConfig {
        preview_width: PREVIEW_WIDTH,
        preview_height: PREVIEW_HEIGHT,
        rotation_degrees: SENSOR_ROTATION,
        crop_size: CROP_SIZE,
        maintain_aspect: false,
        min_confidence: MIN_CONFIDENCE,
    };

    log::info!("Starting detection session");
    let detector = LuminanceDetector { threshold: 180 };
    let mut session = DetectionSession::new(&config, detector, LogOverlay::default())?;
    let mut renderer = Renderer::new(
        PREVIEW_WIDTH as usize,
        PREVIEW_HEIGHT as usize,
        Rotation::from_degrees(SENSOR_ROTATION)?,
    );
    // Portrait surface for the rotated sensor.
    let mut canvas = PixelBuffer::new(480, 640);

    let mut camera = SimCamera::new(PREVIEW_WIDTH as usize, PREVIEW_HEIGHT as usize);

    log::info!("Starting preview loop");
    for _ in 0..FRAME_COUNT {
        camera.advance();

        let started = Instant::now();
        let outcome = session.process_frame(&mut camera);
        if let Admission::Admitted { timestamp } = outcome {
            log::debug!(
                "frame {timestamp} processed in {}ms",
                started.elapsed().as_millis()
            );
        }

        if let Err(e) = renderer.refresh(session.controller(), &mut canvas) {
            log::error!("display refresh failed: {e}");
        }
    }

    log::info!(
        "Done: {} frames delivered, {} next-frame requests, {} tracked results",
        session.controller().frames_delivered(),
        camera.requests,
        session.tracker().results
    );

    Ok(())
}

/// Synthetic camera: a bright square drifting over a dark background, with a
/// little positional jitter per frame.
struct SimCamera {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
    position: Vector2<f32>,
    velocity: Vector2<f32>,
    rng: ThreadRng,
    requests: u64,
}

impl SimCamera {
    fn new(width: usize, height: usize) -> SimCamera {
        SimCamera {
            width,
            height,
            pixels: vec![BACKGROUND; width * height],
            position: Vector2::new(width as f32 / 4.0, height as f32 / 4.0),
            velocity: Vector2::new(3.0, 2.0),
            rng: thread_rng(),
            requests: 0,
        }
    }

    fn advance(&mut self) {
        let jitter = Vector2::new(
            self.rng.gen_range(-1.5..=1.5),
            self.rng.gen_range(-1.5..=1.5),
        );
        self.position += self.velocity + jitter;

        // Bounce off the frame edges.
        let max_x = (self.width as i32 - SQUARE_SIZE) as f32;
        let max_y = (self.height as i32 - SQUARE_SIZE) as f32;
        if self.position.x < 0.0 || self.position.x > max_x {
            self.velocity.x = -self.velocity.x;
            self.position.x = self.position.x.clamp(0.0, max_x);
        }
        if self.position.y < 0.0 || self.position.y > max_y {
            self.velocity.y = -self.velocity.y;
            self.position.y = self.position.y.clamp(0.0, max_y);
        }

        self.pixels.fill(BACKGROUND);
        let (x0, y0) = (self.position.x as usize, self.position.y as usize);
        for y in y0..(y0 + SQUARE_SIZE as usize).min(self.height) {
            for x in x0..(x0 + SQUARE_SIZE as usize).min(self.width) {
                self.pixels[y * self.width + x] = SQUARE_COLOR;
            }
        }
    }
}

impl FrameSource for SimCamera {
    fn frame_pixels(&mut self) -> Option<&[u32]> {
        Some(&self.pixels)
    }

    fn request_next_frame(&mut self) {
        self.requests += 1;
    }
}

/// Stand-in detector: boxes the bright pixels of the crop by min/max
/// accumulation and reports a single detection.
struct LuminanceDetector {
    threshold: u32,
}

impl Detector for LuminanceDetector {
    fn detect(&mut self, crop: &PixelBuffer) -> anyhow::Result<Vec<Detection>> {
        let mut bounds: Option<Region> = None;
        let mut bright = 0u32;

        for y in 0..crop.height() {
            for x in 0..crop.width() {
                let px = crop.get(x, y);
                let luma = (299 * ((px >> 16) & 0xFF) + 587 * ((px >> 8) & 0xFF)
                    + 114 * (px & 0xFF))
                    / 1000;
                if luma < self.threshold {
                    continue;
                }
                bright += 1;
                let p = Vector2::new(x as f32, y as f32);
                match bounds.as_mut() {
                    Some(region) => region.expand_to(&p),
                    None => bounds = Some(Region::new(p, p)),
                }
            }
        }

        Ok(bounds
            .map(|bounds| {
                let coverage = bright as f32 / (bounds.width() * bounds.height()).max(1.0);
                vec![Detection {
                    label: "bright-object".to_string(),
                    confidence: coverage.clamp(0.0, 1.0),
                    bounds,
                }]
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
struct LogOverlay {
    results: u64,
}

impl TrackerOverlay for LogOverlay {
    fn on_results(&mut self, detections: &[Detection], timestamp: u64) {
        for d in detections {
            log::info!(
                "frame {timestamp}: {} ({:.2}) at ({:.0},{:.0})-({:.0},{:.0})",
                d.label,
                d.confidence,
                d.bounds.min.x,
                d.bounds.min.y,
                d.bounds.max.x,
                d.bounds.max.y
            );
            self.results += 1;
        }
    }
}

fn setup_logging() {
    simple_log::quick!();
}
