use thiserror::Error;

/// Errors produced by the transform and admission core.
///
/// `InvalidGeometry` and `SingularTransform` are fatal at session setup;
/// `MissingFrameData` is recoverable and only skips the current frame.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VisionError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("transform is singular (determinant {0})")]
    SingularTransform(f32),

    #[error("frame source delivered no pixel data")]
    MissingFrameData,
}
