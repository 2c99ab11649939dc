use crate::admission::FrameAdmissionController;
use crate::error::VisionError;
use crate::frame::{grayscale_in_place, warp_into, PixelBuffer};
use crate::transform::{build_transform, AffineTransform, Rotation};

/// Frame -> canvas transform for the current display surface: fit the rotated
/// preview extent into its aspect-correct box (the smaller axis ratio wins),
/// then stretch that box onto the actual canvas rectangle.
pub fn canvas_transform(
    preview_width: i32,
    preview_height: i32,
    canvas_width: i32,
    canvas_height: i32,
    rotation: Rotation,
) -> Result<AffineTransform, VisionError> {
    let rotated = rotation.transposes();
    let (pw, ph) = (preview_width as f32, preview_height as f32);
    let multiplier = if rotated {
        (ph / pw).min(pw / ph)
    } else {
        1.0
    };
    let fit_w = (multiplier * if rotated { ph } else { pw }) as i32;
    let fit_h = (multiplier * if rotated { pw } else { ph }) as i32;

    let frame_to_fit = build_transform(
        preview_width,
        preview_height,
        fit_w,
        fit_h,
        rotation.degrees(),
        false,
    )?;
    let fit_to_canvas = build_transform(fit_w, fit_h, canvas_width, canvas_height, 0, false)?;
    Ok(frame_to_fit.then(&fit_to_canvas))
}

/// Redraws the latest admitted frame onto a canvas buffer. Runs on every
/// refresh regardless of the admission gate; a stale frame just re-renders
/// the last admitted content. The scratch buffer is reused across refreshes.
pub struct Renderer {
    preview_width: usize,
    preview_height: usize,
    rotation: Rotation,
    scratch: PixelBuffer,
}

impl Renderer {
    pub fn new(preview_width: usize, preview_height: usize, rotation: Rotation) -> Renderer {
        Renderer {
            preview_width,
            preview_height,
            rotation,
            scratch: PixelBuffer::new(preview_width, preview_height),
        }
    }

    pub fn refresh(
        &mut self,
        controller: &FrameAdmissionController,
        canvas: &mut PixelBuffer,
    ) -> Result<(), VisionError> {
        controller.with_frame(|frame| self.scratch.copy_from(frame.pixels()))?;

        // The displayed preview is the grayscale of the captured frame.
        grayscale_in_place(&mut self.scratch);

        let transform = canvas_transform(
            self.preview_width as i32,
            self.preview_height as i32,
            canvas.width() as i32,
            canvas.height() as i32,
            self.rotation,
        )?;
        warp_into(&self.scratch, canvas, &transform)
    }
}
