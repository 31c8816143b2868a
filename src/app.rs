use eframe::egui;
use std::path::{Path, PathBuf};

use crate::config::{Settings, DOT_SIZE, MAGNIFIER_DIAMETER};
use crate::export::export_image;
use crate::persist::{
    default_dir, export_file_name, load_image, load_markers, markers_file_name, save_markers,
};
use crate::session::{AnnotationSession, SurfaceGeometry};

// ── Status Line ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Status {
    Info(String),
    Error(String),
}

/// Largest rect at the top-left of `available` showing `image_size` without
/// distortion or upscaling.
fn fit_rect(available: egui::Rect, image_size: egui::Vec2) -> egui::Rect {
    let scale = (available.width() / image_size.x)
        .min(available.height() / image_size.y)
        .min(1.0)
        .max(0.0);
    egui::Rect::from_min_size(available.min, image_size * scale)
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct CounterApp {
    session: AnnotationSession,
    image_path: Option<PathBuf>,
    texture: Option<egui::TextureHandle>,
    status: Option<Status>,
    title_dirty: bool,
    /// Where the image was laid out on the last frame.
    surface: Option<SurfaceGeometry>,
}

impl CounterApp {
    pub fn new(settings: Settings) -> Self {
        let mut app = Self {
            session: AnnotationSession::new(settings.image_load_policy()),
            image_path: None,
            texture: None,
            status: None,
            title_dirty: false,
            surface: None,
        };
        if let Some(path) = settings.image_path {
            app.open_image(path);
        }
        if let Some(path) = settings.dots_path {
            app.open_markers(&path);
        }
        app
    }

    fn info(&mut self, message: String) {
        self.status = Some(Status::Info(message));
    }

    fn error(&mut self, message: String) {
        log::error!("{message}");
        self.status = Some(Status::Error(message));
    }

    fn open_image(&mut self, path: PathBuf) {
        match load_image(&path) {
            Ok(image) => {
                let name = image.file_name.clone();
                self.session.set_image(image);
                self.image_path = Some(path);
                self.texture = None;
                self.title_dirty = true;
                self.info(format!("Opened {name}"));
            }
            Err(e) => self.error(format!("Could not open {}: {e}", path.display())),
        }
    }

    /// A bad file leaves the current markers untouched.
    fn open_markers(&mut self, path: &Path) {
        match load_markers(path) {
            Ok(markers) => {
                let count = markers.len();
                self.session.replace_markers(markers);
                self.info(format!("Loaded {count} dots from {}", path.display()));
            }
            Err(e) => self.error(format!("Could not load {}: {e}", path.display())),
        }
    }

    fn base_name(&self) -> String {
        self.session
            .image()
            .map(|i| i.base_name().to_string())
            .unwrap_or_else(|| "dots".to_string())
    }

    fn dialog(&self) -> rfd::FileDialog {
        let dialog = rfd::FileDialog::new();
        match default_dir(self.image_path.as_deref()) {
            Some(dir) => dialog.set_directory(dir),
            None => dialog,
        }
    }

    fn pick_image(&mut self) {
        if let Some(path) = self
            .dialog()
            .add_filter("Images", &["jpg", "jpeg", "png"])
            .pick_file()
        {
            self.open_image(path);
        }
    }

    fn pick_markers(&mut self) {
        if let Some(path) = self.dialog().add_filter("JSON", &["json"]).pick_file() {
            self.open_markers(&path);
        }
    }

    fn save_markers_as(&mut self) {
        let Some(path) = self
            .dialog()
            .add_filter("JSON", &["json"])
            .set_file_name(markers_file_name(&self.base_name()))
            .save_file()
        else {
            return;
        };
        match save_markers(&path, self.session.markers()) {
            Ok(()) => self.info(format!("Saved dots to {}", path.display())),
            Err(e) => self.error(format!("Could not save {}: {e}", path.display())),
        }
    }

    fn save_image_as(&mut self) {
        let Some(path) = self
            .dialog()
            .add_filter("JPEG", &["jpg", "jpeg"])
            .set_file_name(export_file_name(&self.base_name()))
            .save_file()
        else {
            return;
        };
        match export_image(&self.session, &path) {
            Ok(()) => self.info(format!("Saved image to {}", path.display())),
            Err(e) => self.error(format!("Could not save {}: {e}", path.display())),
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let (None, Some(image)) = (&self.texture, self.session.image()) else {
            return;
        };
        let (w, h) = image.pixels.dimensions();
        let upload = egui::ColorImage::from_rgba_unmultiplied(
            [w as usize, h as usize],
            image.pixels.as_raw(),
        );
        log::debug!("Uploading {w}x{h} texture for {}", image.file_name);
        self.texture = Some(ctx.load_texture(
            image.file_name.clone(),
            upload,
            egui::TextureOptions::LINEAR,
        ));
    }

    fn draw_markers(&self, painter: &egui::Painter, geometry: &SurfaceGeometry) {
        let radius = geometry.dot_radius();
        for m in self.session.markers() {
            painter.circle_filled(geometry.to_screen(m.pos()), radius, m.color.to_egui());
        }
    }

    fn draw_magnifier(&self, ctx: &egui::Context, geometry: &SurfaceGeometry) {
        let (Some(view), Some(tex), Some(image)) = (
            self.session.magnifier_view(),
            self.texture.as_ref(),
            self.session.image(),
        ) else {
            return;
        };

        let viewport = egui::Rect::from_min_size(
            geometry.rect().min + view.origin.to_vec2(),
            egui::Vec2::splat(MAGNIFIER_DIAMETER),
        );
        let painter = ctx
            .layer_painter(egui::LayerId::new(
                egui::Order::Foreground,
                egui::Id::new("magnifier"),
            ))
            .with_clip_rect(viewport);

        painter.rect_filled(viewport, 0.0, egui::Color32::from_gray(20));
        if let Some((source, dest)) = view.visible {
            let size = image.size();
            let uv = egui::Rect::from_min_max(
                (source.min.to_vec2() / size).to_pos2(),
                (source.max.to_vec2() / size).to_pos2(),
            );
            painter.image(
                tex.id(),
                dest.translate(viewport.min.to_vec2()),
                uv,
                egui::Color32::WHITE,
            );
        }
        for (pos, color) in &view.dots {
            painter.circle_filled(viewport.min + pos.to_vec2(), DOT_SIZE / 2.0, color.to_egui());
        }
        painter.rect_stroke(
            viewport,
            0.0,
            egui::Stroke::new(2.0, egui::Color32::BLACK),
            egui::StrokeKind::Inside,
        );
    }
}

// ── eframe App impl ────────────────────────────────────────────────────────

impl eframe::App for CounterApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui(ctx);
    }
}

impl CounterApp {
    /// One frame of input handling and painting.
    fn ui(&mut self, ctx: &egui::Context) {
        self.ensure_texture(ctx);

        if self.title_dirty {
            if let Some(image) = self.session.image() {
                ctx.send_viewport_cmd(egui::ViewportCommand::Title(format!(
                    "muggenteller — {}",
                    image.file_name
                )));
            }
            self.title_dirty = false;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.session.toggle_magnifier();
        }

        let has_image = self.session.has_image();
        let count = self.session.markers().len();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("Reset").clicked() {
                    self.session.reset();
                }
                if ui
                    .add_enabled(count > 0, egui::Button::new("Undo"))
                    .clicked()
                {
                    self.session.undo();
                }
                if ui.button("Save Dots").clicked() {
                    self.save_markers_as();
                }
                if ui.button("Load Dots").clicked() {
                    self.pick_markers();
                }
                ui.separator();
                if ui.button("Load Image").clicked() {
                    self.pick_image();
                }
                if ui
                    .add_enabled(has_image, egui::Button::new("Save Image"))
                    .clicked()
                {
                    self.save_image_as();
                }
                ui.separator();
                ui.label(format!("Counter: {}", self.session.markers().len()));
                if self.session.magnifier_active() {
                    ui.separator();
                    ui.label("Magnifier (Z)");
                }
            });
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| match &self.status {
            Some(Status::Info(message)) => {
                ui.label(message);
            }
            Some(Status::Error(message)) => {
                ui.colored_label(egui::Color32::RED, message);
            }
            None => {
                ui.label("Left click adds a dot, right click removes one, Z toggles the magnifier");
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let Some(image_size) = self.session.image().map(|i| i.size()) else {
                self.surface = None;
                ui.centered_and_justified(|ui| {
                    ui.label("Load an image to start counting");
                });
                return;
            };

            let rect = fit_rect(ui.available_rect_before_wrap(), image_size);
            let response = ui.allocate_rect(rect, egui::Sense::click());
            self.surface = SurfaceGeometry::new(rect, image_size);
            let Some(geometry) = self.surface else {
                return;
            };

            let painter = ui.painter_at(rect);
            if let Some(ref tex) = self.texture {
                painter.image(
                    tex.id(),
                    rect,
                    egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                    egui::Color32::WHITE,
                );
            }

            // Clicks within the interaction radius outside the image still
            // reach this response; the session ignores those.
            if let Some(pos) = response.interact_pointer_pos() {
                if response.clicked() {
                    self.session.add(&geometry, pos);
                } else if response.secondary_clicked() {
                    self.session.remove_at(&geometry, pos);
                }
            }

            if self.session.magnifier_active() {
                if let Some(pos) = response.hover_pos() {
                    self.session.track_pointer(&geometry, pos);
                }
            }

            self.draw_markers(&painter, &geometry);
            self.draw_magnifier(ctx, &geometry);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::LoadedImage;

    fn app_with_image(w: u32, h: u32) -> CounterApp {
        let mut app = CounterApp::new(Settings::default());
        app.session.set_image(LoadedImage {
            file_name: "trap.png".to_string(),
            pixels: image::RgbaImage::new(w, h),
        });
        app
    }

    fn frame(
        ctx: &egui::Context,
        app: &mut CounterApp,
        modifiers: egui::Modifiers,
        events: Vec<egui::Event>,
    ) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(1024.0, 768.0),
            )),
            modifiers,
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| app.ui(ctx));
    }

    fn click(
        ctx: &egui::Context,
        app: &mut CounterApp,
        pos: egui::Pos2,
        button: egui::PointerButton,
    ) {
        let none = egui::Modifiers::NONE;
        frame(ctx, app, none, vec![egui::Event::PointerMoved(pos)]);
        for pressed in [true, false] {
            let event = egui::Event::PointerButton {
                pos,
                button,
                pressed,
                modifiers: none,
            };
            frame(ctx, app, none, vec![event]);
        }
    }

    fn press_z(ctx: &egui::Context, app: &mut CounterApp, modifiers: egui::Modifiers) {
        let event = egui::Event::Key {
            key: egui::Key::Z,
            physical_key: None,
            pressed: true,
            repeat: false,
            modifiers,
        };
        frame(ctx, app, modifiers, vec![event]);
    }

    /// Lay out one frame and return where the image landed.
    fn laid_out(ctx: &egui::Context, app: &mut CounterApp) -> SurfaceGeometry {
        frame(ctx, app, egui::Modifiers::NONE, vec![]);
        app.surface.unwrap()
    }

    #[test]
    fn test_first_frame_uploads_texture() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(200, 100);
        assert!(app.texture.is_none());
        let geometry = laid_out(&ctx, &mut app);
        assert!(app.texture.is_some());
        assert_eq!(geometry.buffer(), egui::vec2(200.0, 100.0));
    }

    #[test]
    fn test_primary_click_adds_marker() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(200, 100);
        let geometry = laid_out(&ctx, &mut app);

        click(
            &ctx,
            &mut app,
            geometry.to_screen(egui::pos2(120.5, 40.5)),
            egui::PointerButton::Primary,
        );
        assert_eq!(app.session.markers().len(), 1);
        let m = app.session.markers()[0];
        assert_eq!((m.x, m.y), (120, 40));
    }

    #[test]
    fn test_click_just_outside_image_is_ignored() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(200, 100);
        let geometry = laid_out(&ctx, &mut app);
        let rect = geometry.rect();

        click(
            &ctx,
            &mut app,
            egui::pos2(rect.right() + 3.0, rect.center().y),
            egui::PointerButton::Primary,
        );
        click(
            &ctx,
            &mut app,
            egui::pos2(rect.center().x, rect.bottom() + 2.0),
            egui::PointerButton::Primary,
        );
        assert!(app.session.markers().is_empty());

        app.session.add_pixel(199, 50);
        click(
            &ctx,
            &mut app,
            egui::pos2(rect.right() + 2.0, rect.center().y),
            egui::PointerButton::Secondary,
        );
        assert_eq!(app.session.markers().len(), 1);
    }

    #[test]
    fn test_secondary_click_removes_marker() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(200, 100);
        let geometry = laid_out(&ctx, &mut app);
        app.session.add_pixel(50, 50);
        app.session.add_pixel(150, 50);

        click(
            &ctx,
            &mut app,
            geometry.to_screen(egui::pos2(100.0, 20.0)),
            egui::PointerButton::Secondary,
        );
        assert_eq!(app.session.markers().len(), 2);

        click(
            &ctx,
            &mut app,
            geometry.to_screen(egui::pos2(151.0, 49.0)),
            egui::PointerButton::Secondary,
        );
        assert_eq!(app.session.markers().len(), 1);
        assert_eq!(app.session.markers()[0].x, 50);
    }

    #[test]
    fn test_z_toggles_magnifier() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(200, 100);
        laid_out(&ctx, &mut app);

        press_z(&ctx, &mut app, egui::Modifiers::NONE);
        assert!(app.session.magnifier_active());
        press_z(&ctx, &mut app, egui::Modifiers::SHIFT);
        assert!(app.session.magnifier_active());
        press_z(&ctx, &mut app, egui::Modifiers::NONE);
        assert!(!app.session.magnifier_active());
    }

    #[test]
    fn test_magnifier_follows_pointer() {
        let ctx = egui::Context::default();
        let mut app = app_with_image(600, 400);
        let geometry = laid_out(&ctx, &mut app);
        press_z(&ctx, &mut app, egui::Modifiers::NONE);

        let pos = geometry.rect().min + egui::vec2(400.0, 200.0);
        let moved = vec![egui::Event::PointerMoved(pos)];
        frame(&ctx, &mut app, egui::Modifiers::NONE, moved);
        let view = app.session.magnifier_view().unwrap();
        // Raw surface offset less the radius, kept within the 600x400 buffer.
        assert_eq!(view.origin, egui::pos2(250.0, 50.0));

        let corner = geometry.rect().max - egui::vec2(1.0, 1.0);
        let moved = vec![egui::Event::PointerMoved(corner)];
        frame(&ctx, &mut app, egui::Modifiers::NONE, moved);
        let view = app.session.magnifier_view().unwrap();
        assert_eq!(view.origin, egui::pos2(300.0, 100.0));
    }

    #[test]
    fn test_fit_rect_never_upscales() {
        let available =
            egui::Rect::from_min_size(egui::pos2(0.0, 50.0), egui::vec2(2000.0, 2000.0));
        let rect = fit_rect(available, egui::vec2(800.0, 600.0));
        assert_eq!(rect.min, egui::pos2(0.0, 50.0));
        assert_eq!(rect.size(), egui::vec2(800.0, 600.0));
    }

    #[test]
    fn test_fit_rect_keeps_aspect() {
        let available = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(400.0, 1000.0));
        let rect = fit_rect(available, egui::vec2(800.0, 600.0));
        assert_eq!(rect.size(), egui::vec2(400.0, 300.0));
    }

    #[test]
    fn test_bad_marker_file_keeps_markers() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "[{\"x\": 1,").unwrap();

        let mut app = CounterApp::new(Settings::default());
        app.session.add_pixel(5, 5);
        app.open_markers(&bad);

        assert_eq!(app.session.markers().len(), 1);
        assert!(matches!(app.status, Some(Status::Error(_))));
    }

    #[test]
    fn test_startup_loads_image_and_markers() {
        let dir = tempfile::tempdir().unwrap();
        let image_path = dir.path().join("trap.png");
        image::RgbaImage::new(40, 30).save(&image_path).unwrap();
        let dots_path = dir.path().join("trap.json");
        std::fs::write(&dots_path, r#"[{"x":3,"y":4,"color":"green"}]"#).unwrap();

        let app = CounterApp::new(Settings {
            image_path: Some(image_path),
            dots_path: Some(dots_path),
            ..Default::default()
        });
        assert!(app.session.has_image());
        assert_eq!(app.session.markers().len(), 1);
        assert_eq!(app.base_name(), "trap");
    }

    #[test]
    fn test_missing_startup_image_is_reported() {
        let app = CounterApp::new(Settings {
            image_path: Some(PathBuf::from("/definitely/not/here.png")),
            ..Default::default()
        });
        assert!(!app.session.has_image());
        assert!(matches!(app.status, Some(Status::Error(_))));
        assert_eq!(app.base_name(), "dots");
    }
}
