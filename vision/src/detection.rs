use nalgebra::Vector2;

use crate::frame::PixelBuffer;
use crate::transform::AffineTransform;

/// Axis-aligned box, min/max corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub min: Vector2<f32>,
    pub max: Vector2<f32>,
}

impl Region {
    pub fn new(min: Vector2<f32>, max: Vector2<f32>) -> Region {
        Region { min, max }
    }

    /// Grows the box to include `p`.
    pub fn expand_to(&mut self, p: &Vector2<f32>) {
        self.min.x = p.x.min(self.min.x);
        self.min.y = p.y.min(self.min.y);
        self.max.x = p.x.max(self.max.x);
        self.max.y = p.y.max(self.max.y);
    }

    /// Maps the box through `transform` and re-normalizes the corners, since
    /// a rotation can swap which corner is minimal.
    pub fn transformed(&self, transform: &AffineTransform) -> Region {
        let corners = [
            transform.apply(Vector2::new(self.min.x, self.min.y)),
            transform.apply(Vector2::new(self.max.x, self.min.y)),
            transform.apply(Vector2::new(self.min.x, self.max.y)),
            transform.apply(Vector2::new(self.max.x, self.max.y)),
        ];
        let mut region = Region::new(corners[0], corners[0]);
        for corner in &corners[1..] {
            region.expand_to(corner);
        }
        region
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }
}

/// One detector result. `bounds` is in crop space as produced by the
/// detector; the session projects it to frame space before tracking.
#[derive(Debug, Clone)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bounds: Region,
}

/// Black-box object detector over the fixed-size crop buffer.
pub trait Detector {
    fn detect(&mut self, crop: &PixelBuffer) -> anyhow::Result<Vec<Detection>>;
}

/// Black-box tracker/overlay. Receives detections already projected to frame
/// space, plus the timestamp of the admitted frame they came from.
pub trait TrackerOverlay {
    fn on_results(&mut self, detections: &[Detection], timestamp: u64);
}
