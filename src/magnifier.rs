//! Zoomed preview that follows the pointer while toggled on.

use eframe::egui;

use crate::config::{MAGNIFIER_DIAMETER, MAGNIFIER_RADIUS, MAGNIFIER_ZOOM};
use crate::session::{DotColor, Marker};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Magnifier {
    active: bool,
    /// Top-left of the viewport over the surface. Stale while inactive.
    origin: egui::Pos2,
}

/// Everything needed to paint one frame of the magnifier.
#[derive(Clone, Debug, PartialEq)]
pub struct MagnifierView {
    /// Viewport placement relative to the surface's top-left.
    pub origin: egui::Pos2,
    /// Sampled image region clipped to the image, in image pixels, with
    /// where it lands in the viewport. `None` when the region misses the image.
    pub visible: Option<(egui::Rect, egui::Rect)>,
    /// Markers in viewport-local coordinates.
    pub dots: Vec<(egui::Pos2, DotColor)>,
}

/// `min(max(v - R, 0), extent - D)`. Negative when the surface is narrower
/// than the viewport.
fn clamp_origin(v: f32, extent: f32) -> f32 {
    (v - MAGNIFIER_RADIUS).max(0.0).min(extent - MAGNIFIER_DIAMETER)
}

impl Magnifier {
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn origin(&self) -> egui::Pos2 {
        self.origin
    }

    pub fn toggle(&mut self) -> bool {
        self.active = !self.active;
        log::debug!("Magnifier {}", if self.active { "on" } else { "off" });
        self.active
    }

    /// Center the viewport on `offset`, kept inside `buffer`. No-op while inactive.
    pub fn track(&mut self, offset: egui::Vec2, buffer: egui::Vec2) {
        if !self.active {
            return;
        }
        self.origin = egui::pos2(
            clamp_origin(offset.x, buffer.x),
            clamp_origin(offset.y, buffer.y),
        );
    }

    pub fn view(&self, image_size: egui::Vec2, markers: &[Marker]) -> MagnifierView {
        let origin = self.origin();
        // Sampled at twice the viewport's coordinates.
        let source = egui::Rect::from_min_size(
            (origin.to_vec2() * MAGNIFIER_ZOOM).to_pos2(),
            egui::Vec2::splat(MAGNIFIER_DIAMETER * MAGNIFIER_ZOOM),
        );

        let bounds = egui::Rect::from_min_size(egui::Pos2::ZERO, image_size);
        let clipped = source.intersect(bounds);
        let visible = clipped.is_positive().then(|| {
            let dest = egui::Rect::from_min_max(
                ((clipped.min - source.min) / MAGNIFIER_ZOOM).to_pos2(),
                ((clipped.max - source.min) / MAGNIFIER_ZOOM).to_pos2(),
            );
            (clipped, dest)
        });

        let window = egui::Rect::from_min_size(origin, egui::Vec2::splat(MAGNIFIER_DIAMETER));
        let shift = egui::Vec2::splat(MAGNIFIER_RADIUS) - origin.to_vec2();
        let dots = markers
            .iter()
            .filter(|m| window.contains(m.pos()))
            .map(|m| (m.pos() + shift, m.color))
            .collect();

        MagnifierView {
            origin,
            visible,
            dots,
        }
    }
}
