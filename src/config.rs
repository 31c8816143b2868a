use std::path::PathBuf;

use clap::Parser;

use crate::session::ImageLoadPolicy;

// ── Constants ───────────────────────────────────────────────────────────────

/// Marker diameter in image pixels.
pub const DOT_SIZE: f32 = 8.0;

/// Markers per palette band before the next color is used.
pub const PALETTE_BAND: usize = 10;

pub const MAGNIFIER_RADIUS: f32 = 150.0;
pub const MAGNIFIER_DIAMETER: f32 = MAGNIFIER_RADIUS * 2.0;
/// Source-to-destination sampling factor of the magnifier.
pub const MAGNIFIER_ZOOM: f32 = 2.0;

/// Distance of the count box from the top and right edges of the export.
pub const COUNT_BOX_MARGIN: i32 = 10;
/// Space between the count text and the box border.
pub const COUNT_BOX_PADDING: i32 = 10;
pub const COUNT_BOX_BORDER: i32 = 2;
/// 8x8 glyphs scaled to roughly a 24px font.
pub const COUNT_TEXT_SCALE: i32 = 3;

// ── Command line ────────────────────────────────────────────────────────────

#[derive(Parser, Clone, Debug, Default, PartialEq)]
#[command(name = "muggenteller", about = "Count dots on an image", version)]
pub struct Settings {
    /// Image to open at startup (JPEG or PNG)
    pub image_path: Option<PathBuf>,

    /// Dots file to load after the image
    pub dots_path: Option<PathBuf>,

    /// Clear existing dots whenever another image is loaded
    #[arg(long)]
    pub clear_on_image_load: bool,
}

impl Settings {
    pub fn image_load_policy(&self) -> ImageLoadPolicy {
        if self.clear_on_image_load {
            ImageLoadPolicy::ClearMarkers
        } else {
            ImageLoadPolicy::KeepMarkers
        }
    }
}
