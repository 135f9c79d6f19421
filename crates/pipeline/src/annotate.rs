//! Draws detection boxes and labels onto frames.
//!
//! Boxes and text are rendered with `imageproc`. Labels use DejaVu Sans
//! Mono, embedded in the binary.

use std::sync::OnceLock;

use ab_glyph::{FontRef, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::detector::DetectionBox;

const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_BACKGROUND: Rgb<u8> = Rgb([0, 0, 0]);
const LABEL_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const BOX_THICKNESS: i32 = 2;
const LABEL_PADDING: i32 = 2;
const LABEL_SCALE: PxScale = PxScale { x: 16.0, y: 16.0 };

const LABEL_FONT_BYTES: &[u8] = include_bytes!("../assets/fonts/DejaVuSansMono.ttf");

fn label_font() -> Option<&'static FontRef<'static>> {
    static FONT: OnceLock<Option<FontRef<'static>>> = OnceLock::new();
    FONT.get_or_init(|| match FontRef::try_from_slice(LABEL_FONT_BYTES) {
        Ok(font) => Some(font),
        Err(e) => {
            tracing::warn!(error = %e, "Label font unreadable, drawing boxes only");
            None
        }
    })
    .as_ref()
}

/// Outline `detection` and write `label` just above its top-left corner.
pub fn draw_detection(image: &mut RgbImage, detection: &DetectionBox, label: &str) {
    let (width, height) = (image.width() as i32, image.height() as i32);
    if width == 0 || height == 0 {
        return;
    }

    let left = (detection.x1.round() as i32).clamp(0, width - 1);
    let top = (detection.y1.round() as i32).clamp(0, height - 1);
    let right = (detection.x2.round() as i32).clamp(0, width - 1);
    let bottom = (detection.y2.round() as i32).clamp(0, height - 1);

    for inset in 0..BOX_THICKNESS {
        let w = right - left - 2 * inset + 1;
        let h = bottom - top - 2 * inset + 1;
        if w < 1 || h < 1 {
            break;
        }
        let rect = Rect::at(left + inset, top + inset).of_size(w as u32, h as u32);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
    }

    let Some(font) = label_font() else {
        return;
    };
    if label.is_empty() {
        return;
    }
    let (text_width, text_height) = text_size(LABEL_SCALE, font, label);
    let background_height = text_height as i32 + 2 * LABEL_PADDING;
    let label_y = (top - background_height).max(0);
    let background = Rect::at(left, label_y).of_size(
        text_width + 2 * LABEL_PADDING as u32,
        background_height as u32,
    );
    draw_filled_rect_mut(image, background, LABEL_BACKGROUND);
    draw_text_mut(
        image,
        LABEL_COLOR,
        left + LABEL_PADDING,
        label_y + LABEL_PADDING,
        LABEL_SCALE,
        font,
        label,
    );
}

/// Format a label the way operators see it on the feed, e.g. `accident 0.93`.
pub fn detection_label(detection: &DetectionBox) -> String {
    format!("{} {:.2}", detection.class_label, detection.confidence)
}
