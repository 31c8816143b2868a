use eframe::egui;
use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::config::{DOT_SIZE, PALETTE_BAND};
use crate::magnifier::{Magnifier, MagnifierView};

// ── Data Model ──────────────────────────────────────────────────────────────

/// Marker color. Serialized by name, the way marker files store it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DotColor {
    Red,
    Green,
    Blue,
    Yellow,
    Magenta,
}

impl DotColor {
    pub const PALETTE: [DotColor; 5] = [
        DotColor::Red,
        DotColor::Green,
        DotColor::Blue,
        DotColor::Yellow,
        DotColor::Magenta,
    ];

    /// Color of the marker appended at `index`: ten markers per color, cycling.
    pub fn for_index(index: usize) -> Self {
        Self::PALETTE[(index / PALETTE_BAND) % Self::PALETTE.len()]
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            DotColor::Red => [255, 0, 0],
            DotColor::Green => [0, 128, 0],
            DotColor::Blue => [0, 0, 255],
            DotColor::Yellow => [255, 255, 0],
            DotColor::Magenta => [255, 0, 255],
        }
    }

    pub fn to_egui(self) -> egui::Color32 {
        let [r, g, b] = self.rgb();
        egui::Color32::from_rgb(r, g, b)
    }
}

/// A counted point, in natural image pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Marker {
    pub x: i32,
    pub y: i32,
    pub color: DotColor,
}

impl Marker {
    /// Axis-aligned hit box of half the dot size around the center, inclusive.
    pub fn contains(&self, p: egui::Pos2) -> bool {
        let r = DOT_SIZE / 2.0;
        let (x, y) = (self.x as f32, self.y as f32);
        p.x >= x - r && p.x <= x + r && p.y >= y - r && p.y <= y + r
    }

    pub fn pos(&self) -> egui::Pos2 {
        egui::pos2(self.x as f32, self.y as f32)
    }
}

#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub file_name: String,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    pub fn size(&self) -> egui::Vec2 {
        egui::vec2(self.pixels.width() as f32, self.pixels.height() as f32)
    }

    /// File name up to its first `.`, used to name saved files.
    pub fn base_name(&self) -> &str {
        self.file_name.split('.').next().unwrap_or_default()
    }
}

/// What happens to existing markers when another image is loaded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ImageLoadPolicy {
    #[default]
    KeepMarkers,
    ClearMarkers,
}

// ── Coordinate Mapping ──────────────────────────────────────────────────────

/// On-screen placement of the image against its natural pixel size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceGeometry {
    rect: egui::Rect,
    buffer: egui::Vec2,
}

impl SurfaceGeometry {
    /// `None` while the surface has no layout size yet.
    pub fn new(rect: egui::Rect, buffer: egui::Vec2) -> Option<Self> {
        if rect.width() <= 0.0 || rect.height() <= 0.0 || buffer.x <= 0.0 || buffer.y <= 0.0 {
            return None;
        }
        Some(Self { rect, buffer })
    }

    pub fn rect(&self) -> egui::Rect {
        self.rect
    }

    pub fn buffer(&self) -> egui::Vec2 {
        self.buffer
    }

    /// Whether `screen` is over the image. Right and bottom edges are
    /// exclusive so the mapped pixel stays inside the image.
    pub fn contains(&self, screen: egui::Pos2) -> bool {
        screen.x >= self.rect.left()
            && screen.x < self.rect.right()
            && screen.y >= self.rect.top()
            && screen.y < self.rect.bottom()
    }

    /// Screen to image space, keeping fractions.
    pub fn to_image(&self, screen: egui::Pos2) -> egui::Pos2 {
        egui::pos2(
            (screen.x - self.rect.left()) * self.buffer.x / self.rect.width(),
            (screen.y - self.rect.top()) * self.buffer.y / self.rect.height(),
        )
    }

    /// Screen to the containing image pixel.
    pub fn to_pixel(&self, screen: egui::Pos2) -> (i32, i32) {
        let p = self.to_image(screen);
        (p.x.floor() as i32, p.y.floor() as i32)
    }

    pub fn to_screen(&self, image: egui::Pos2) -> egui::Pos2 {
        self.rect.min + (image.to_vec2() * self.scale())
    }

    /// Screen points per image pixel.
    pub fn scale(&self) -> egui::Vec2 {
        egui::vec2(
            self.rect.width() / self.buffer.x,
            self.rect.height() / self.buffer.y,
        )
    }

    /// On-screen radius of a marker. Uses the smaller axis scale if the
    /// surface is stretched.
    pub fn dot_radius(&self) -> f32 {
        DOT_SIZE / 2.0 * self.scale().min_elem()
    }

    /// Pointer offset from the surface's top-left, unmapped.
    pub fn offset(&self, screen: egui::Pos2) -> egui::Vec2 {
        screen - self.rect.min
    }
}

// ── Session ─────────────────────────────────────────────────────────────────

/// The image being annotated, its markers, and the magnifier.
#[derive(Default)]
pub struct AnnotationSession {
    markers: Vec<Marker>,
    image: Option<LoadedImage>,
    policy: ImageLoadPolicy,
    magnifier: Magnifier,
}

impl AnnotationSession {
    pub fn new(policy: ImageLoadPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    /// Replace the current image, applying the load policy to the markers.
    pub fn set_image(&mut self, image: LoadedImage) {
        if self.policy == ImageLoadPolicy::ClearMarkers && !self.markers.is_empty() {
            log::info!("Clearing {} markers for new image", self.markers.len());
            self.markers.clear();
        }
        self.image = Some(image);
    }

    /// Place a marker at the pixel under the pointer. `None` when the
    /// pointer is off the image.
    pub fn add(&mut self, geometry: &SurfaceGeometry, pointer: egui::Pos2) -> Option<Marker> {
        if !geometry.contains(pointer) {
            return None;
        }
        let (x, y) = geometry.to_pixel(pointer);
        Some(self.add_pixel(x, y))
    }

    pub fn add_pixel(&mut self, x: i32, y: i32) -> Marker {
        let marker = Marker {
            x,
            y,
            color: DotColor::for_index(self.markers.len()),
        };
        log::debug!("Added marker #{} at ({x}, {y})", self.markers.len() + 1);
        self.markers.push(marker);
        marker
    }

    /// Remove the first marker under the pointer, if any.
    pub fn remove_at(&mut self, geometry: &SurfaceGeometry, pointer: egui::Pos2) -> Option<Marker> {
        if !geometry.contains(pointer) {
            return None;
        }
        self.remove_at_image(geometry.to_image(pointer))
    }

    pub fn remove_at_image(&mut self, p: egui::Pos2) -> Option<Marker> {
        let index = self.markers.iter().position(|m| m.contains(p))?;
        let removed = self.markers.remove(index);
        log::debug!("Removed marker at ({}, {})", removed.x, removed.y);
        Some(removed)
    }

    pub fn undo(&mut self) -> Option<Marker> {
        self.markers.pop()
    }

    pub fn reset(&mut self) {
        self.markers.clear();
    }

    pub fn replace_markers(&mut self, markers: Vec<Marker>) {
        self.markers = markers;
    }

    // magnifier

    pub fn magnifier_active(&self) -> bool {
        self.magnifier.is_active()
    }

    pub fn toggle_magnifier(&mut self) -> bool {
        self.magnifier.toggle()
    }

    /// Follow the pointer while the magnifier is shown.
    pub fn track_pointer(&mut self, geometry: &SurfaceGeometry, pointer: egui::Pos2) {
        self.magnifier.track(geometry.offset(pointer), geometry.buffer());
    }

    pub fn magnifier_view(&self) -> Option<MagnifierView> {
        if !self.magnifier.is_active() {
            return None;
        }
        let image = self.image.as_ref()?;
        Some(self.magnifier.view(image.size(), &self.markers))
    }
}
