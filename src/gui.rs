// src/gui.rs
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::{Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints, Points};
use log::{error, info, warn};

use scalar_monitor::drivers::plot::MARKER_SIZE;
use scalar_monitor::drivers::{PngRenderer, Renderer};
use scalar_monitor::types::parse_color;
use scalar_monitor::{AcquisitionController, AcquisitionMode, MonitorConfig, StyleHint};

/// Renderer backing the central plot; holds the last frame until the next repaint.
#[derive(Default)]
pub struct PlotSurface {
    points: Vec<[f64; 2]>,
    style: StyleHint,
}

impl Renderer for PlotSurface {
    fn clear(&mut self) {
        self.points.clear();
    }

    fn render(&mut self, xs: &[f64], ys: &[f64], style: &StyleHint) {
        self.points = xs.iter().zip(ys).map(|(x, y)| [*x, *y]).collect();
        self.style = style.clone();
    }
}

fn color32([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

pub struct MonitorApp {
    controller: AcquisitionController<PlotSurface>,
    points_input: String,
    channel_input: String,
    log_messages: Vec<String>,
    dialog_rx: Option<Receiver<Option<PathBuf>>>,
}

impl MonitorApp {
    pub fn new(controller: AcquisitionController<PlotSurface>, config: &MonitorConfig) -> Self {
        Self {
            controller,
            points_input: config.window_capacity.to_string(),
            channel_input: config.channel.to_string(),
            log_messages: vec!["Monitor ready.".to_owned()],
            dialog_rx: None,
        }
    }

    fn log(&mut self, msg: &str) {
        info!("{msg}");
        self.log_messages.push(format!("> {}", msg));
        if self.log_messages.len() > 8 {
            self.log_messages.remove(0);
        }
    }

    fn open_log_dialog(&mut self) {
        if self.dialog_rx.is_some() {
            return;
        }
        let (tx, rx) = channel();
        self.dialog_rx = Some(rx);
        thread::spawn(move || {
            let file = rfd::FileDialog::new()
                .add_filter("log", &["dat"])
                .pick_file();
            tx.send(file).ok();
        });
    }

    fn poll_log_dialog(&mut self) {
        let result = match self.dialog_rx.as_ref().map(|rx| rx.try_recv()) {
            Some(Ok(result)) => result,
            Some(Err(TryRecvError::Disconnected)) => None,
            Some(Err(TryRecvError::Empty)) | None => return,
        };
        self.dialog_rx = None;
        let Some(path) = result else {
            return;
        };
        let channel = self
            .channel_input
            .trim()
            .parse::<i64>()
            .unwrap_or(self.controller.session().channel as i64);
        match self.controller.select_custom_file(&path, channel) {
            Ok(()) => self.log(&format!("Watching {}", path.display())),
            Err(e) => self.log(&e.to_string()),
        }
    }

    fn apply_points_input(&mut self) {
        let result = match self.points_input.trim().parse::<i64>() {
            Ok(n) => self.controller.set_window_capacity(n).map(|_| n),
            Err(_) => {
                self.log("invalid number of points");
                return;
            }
        };
        match result {
            Ok(n) => self.log(&format!("Number of points: {n}")),
            Err(e) => {
                self.points_input = self.controller.session().window_capacity.to_string();
                self.log(&e.to_string());
            }
        }
    }

    fn apply_channel_input(&mut self) {
        let result = match self.channel_input.trim().parse::<i64>() {
            Ok(c) => self.controller.set_channel(c).map(|_| c),
            Err(_) => {
                self.log("invalid channel");
                return;
            }
        };
        match result {
            Ok(c) => self.log(&format!("Channel: {c}")),
            Err(e) => {
                self.channel_input = self.controller.session().channel.to_string();
                self.log(&e.to_string());
            }
        }
    }

    fn save_png(&mut self) {
        let frame = self.controller.snapshot();
        if frame.is_empty() {
            self.log("Nothing to save yet");
            return;
        }
        let mut png = PngRenderer::default();
        png.render(&frame.xs, &frame.ys, self.controller.style());
        let bytes = match png.to_png() {
            Ok(bytes) => bytes,
            Err(e) => {
                self.log(&e.to_string());
                return;
            }
        };
        thread::spawn(move || {
            let Some(path) = rfd::FileDialog::new()
                .add_filter("PNG", &["png"])
                .set_file_name("snapshot.png")
                .save_file()
            else {
                return;
            };
            match std::fs::write(&path, bytes) {
                Ok(()) => info!("snapshot saved to {}", path.display()),
                Err(e) => error!("failed to save {}: {e}", path.display()),
            }
        });
    }
}

impl eframe::App for MonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_log_dialog();
        self.controller.poll(Instant::now());

        let sources: Vec<(String, Color32)> = self
            .controller
            .registry()
            .iter()
            .map(|s| {
                let rgb = parse_color(&s.display_color).unwrap_or(StyleHint::default().color);
                (s.name.clone(), color32(rgb))
            })
            .collect();

        egui::SidePanel::right("controls").min_width(160.0).show(ctx, |ui| {
            ui.add_space(10.0);
            for (name, color) in &sources {
                let button = egui::Button::new(RichText::new(name).color(*color).strong())
                    .fill(Color32::from_gray(90));
                if ui.add_sized([140.0, 24.0], button).clicked() {
                    match self.controller.select_source_by_name(name) {
                        Ok(()) => self.log(&format!("Starting {name} watch")),
                        Err(e) => {
                            warn!("{e}");
                            self.log(&e.to_string());
                        }
                    }
                }
            }
            ui.add_space(10.0);
            if ui.add_sized([140.0, 24.0], egui::Button::new("Load LOG")).clicked() {
                self.controller.stop();
                self.open_log_dialog();
            }
            if ui.add_sized([140.0, 24.0], egui::Button::new("Stop")).clicked() {
                self.controller.stop();
                self.log("Stopped");
            }
            ui.separator();

            ui.label("Number of points");
            let resp = ui.text_edit_singleline(&mut self.points_input);
            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.apply_points_input();
            }
            ui.label("Channel to monitor");
            let resp = ui.text_edit_singleline(&mut self.channel_input);
            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                self.apply_channel_input();
            }
            ui.separator();

            let session = self.controller.session();
            let mode = match session.mode {
                AcquisitionMode::Idle => "Idle".to_owned(),
                AcquisitionMode::FileReplay => format!("Log replay (ch {})", session.channel),
                AcquisitionMode::NetworkStream => session
                    .active_source
                    .as_ref()
                    .map(|s| format!("Live: {}", s.name))
                    .unwrap_or_else(|| "Live".to_owned()),
            };
            let mode = match self.controller.last_value() {
                Some(v) => format!("{mode} [{v:.4e}]"),
                None => mode,
            };
            ui.label(RichText::new(mode).small());
            if ui.button("Save PNG").clicked() {
                self.save_png();
            }

            ui.add_space(10.0);
            egui::ScrollArea::vertical().max_height(140.0).show(ui, |ui| {
                for m in &self.log_messages {
                    ui.monospace(m);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let surface = self.controller.renderer();
            let color = color32(surface.style.color);
            Plot::new("scalar_plot")
                .legend(Legend::default())
                .auto_bounds_x()
                .auto_bounds_y()
                .show(ui, |plot_ui| {
                    if surface.points.is_empty() {
                        return;
                    }
                    plot_ui.line(
                        Line::new(PlotPoints::new(surface.points.clone()))
                            .color(color.gamma_multiply(0.4)),
                    );
                    plot_ui.points(
                        Points::new(PlotPoints::new(surface.points.clone()))
                            .radius(MARKER_SIZE as f32 / 2.0)
                            .color(color)
                            .name(&surface.style.label),
                    );
                });
        });

        ctx.request_repaint_after(Duration::from_millis(50));
    }

    fn on_close_event(&mut self) -> bool {
        self.controller.stop();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_surface_keeps_last_frame() {
        let mut surface = PlotSurface::default();
        let style = StyleHint {
            color: [0, 255, 0],
            label: "PC".into(),
        };
        surface.render(&[0.0, 1.0], &[0.01, 0.02], &style);
        assert_eq!(surface.points, vec![[0.0, 0.01], [1.0, 0.02]]);
        assert_eq!(surface.style, style);
        surface.clear();
        assert!(surface.points.is_empty());
        assert_eq!(color32([1, 2, 3]), Color32::from_rgb(1, 2, 3));
    }
}
