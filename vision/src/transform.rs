use nalgebra::{Matrix3, Vector2, Vector3};

use crate::error::VisionError;

/// Determinants below this are treated as singular.
const DET_EPSILON: f32 = 1e-6;

/// Quarter-turn rotation between a sensor-oriented frame and its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Normalizes an arbitrary degree value (negatives allowed) to a quarter
    /// turn. Anything not a multiple of 90 is invalid geometry.
    pub fn from_degrees(degrees: i32) -> Result<Rotation, VisionError> {
        let normalized = ((degrees % 360) + 360) % 360;
        match normalized {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            _ => Err(VisionError::InvalidGeometry(format!(
                "rotation must be a multiple of 90, got {degrees}"
            ))),
        }
    }

    pub fn degrees(&self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// True when the rotated source's bounding box has its axes exchanged.
    pub fn transposes(&self) -> bool {
        matches!(self, Rotation::Deg90 | Rotation::Deg270)
    }

    // Exact cos/sin for quarter turns, no trig drift.
    fn cos_sin(&self) -> (f32, f32) {
        match self {
            Rotation::Deg0 => (1.0, 0.0),
            Rotation::Deg90 => (0.0, 1.0),
            Rotation::Deg180 => (-1.0, 0.0),
            Rotation::Deg270 => (0.0, -1.0),
        }
    }
}

/// Immutable 2-D affine transform between two named pixel spaces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    m: Matrix3<f32>,
}

impl AffineTransform {
    pub fn identity() -> AffineTransform {
        AffineTransform {
            m: Matrix3::identity(),
        }
    }

    pub fn apply(&self, p: Vector2<f32>) -> Vector2<f32> {
        let q = self.m * Vector3::new(p.x, p.y, 1.0);
        Vector2::new(q.x, q.y)
    }

    /// Composition: applies `self` first, then `after`.
    pub fn then(&self, after: &AffineTransform) -> AffineTransform {
        AffineTransform { m: after.m * self.m }
    }

    /// Returns a new inverse transform. Never silently reuses stale state:
    /// a near-zero determinant is an explicit failure.
    pub fn invert(&self) -> Result<AffineTransform, VisionError> {
        let det = self.m.determinant();
        if det.abs() < DET_EPSILON {
            return Err(VisionError::SingularTransform(det));
        }
        let m = self
            .m
            .try_inverse()
            .ok_or(VisionError::SingularTransform(det))?;
        Ok(AffineTransform { m })
    }

    pub fn matrix(&self) -> &Matrix3<f32> {
        &self.m
    }

    fn translation(tx: f32, ty: f32) -> AffineTransform {
        AffineTransform {
            m: Matrix3::new(1.0, 0.0, tx, 0.0, 1.0, ty, 0.0, 0.0, 1.0),
        }
    }

    fn scale(sx: f32, sy: f32) -> AffineTransform {
        AffineTransform {
            m: Matrix3::new(sx, 0.0, 0.0, 0.0, sy, 0.0, 0.0, 0.0, 1.0),
        }
    }

    fn rotation(rotation: Rotation) -> AffineTransform {
        let (c, s) = rotation.cos_sin();
        AffineTransform {
            m: Matrix3::new(c, -s, 0.0, s, c, 0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// Builds the affine transform mapping source pixel coordinates onto the
/// destination rectangle: center the source at the origin, rotate, scale the
/// rotated extent onto the destination, re-center on the destination.
///
/// With `maintain_aspect` the scale is uniform (the smaller of the two axis
/// ratios); otherwise each axis scales independently. For 90/270 the source
/// extents are swapped before the ratios are taken.
pub fn build_transform(
    src_w: i32,
    src_h: i32,
    dst_w: i32,
    dst_h: i32,
    rotation_degrees: i32,
    maintain_aspect: bool,
) -> Result<AffineTransform, VisionError> {
    if src_w <= 0 || src_h <= 0 || dst_w <= 0 || dst_h <= 0 {
        return Err(VisionError::InvalidGeometry(format!(
            "dimensions must be positive, got {src_w}x{src_h} -> {dst_w}x{dst_h}"
        )));
    }
    let rotation = Rotation::from_degrees(rotation_degrees)?;

    let (in_w, in_h) = if rotation.transposes() {
        (src_h as f32, src_w as f32)
    } else {
        (src_w as f32, src_h as f32)
    };

    let sx = dst_w as f32 / in_w;
    let sy = dst_h as f32 / in_h;
    let (sx, sy) = if maintain_aspect {
        let s = sx.min(sy);
        (s, s)
    } else {
        (sx, sy)
    };

    let center_src = AffineTransform::translation(-(src_w as f32) / 2.0, -(src_h as f32) / 2.0);
    let center_dst = AffineTransform::translation(dst_w as f32 / 2.0, dst_h as f32 / 2.0);

    Ok(center_src
        .then(&AffineTransform::rotation(rotation))
        .then(&AffineTransform::scale(sx, sy))
        .then(&center_dst))
}
