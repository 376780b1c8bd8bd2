use super::{Phase, SummarizerApp};
use crate::upload::SelectedFile;
use crate::utils::size::human_size;
use eframe::egui::{self, Color32, RichText, Stroke};
use rfd::FileDialog;

const ACCENT: Color32 = Color32::from_rgb(161, 89, 225);
const VIDEO_EXTENSIONS: [&str; 8] = ["mp4", "mov", "mkv", "webm", "avi", "m4v", "mpeg", "wmv"];

impl SummarizerApp {
    pub fn render(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                ui.add_space(20.0);
                ui.vertical_centered(|ui| {
                    ui.heading("Video Summarizer");
                    ui.add_space(5.0);
                    ui.label(
                        RichText::new("Turn long meeting recordings into short summaries")
                            .color(ui.visuals().text_color().gamma_multiply(0.7)),
                    );
                });

                ui.add_space(20.0);
                self.render_upload_form(ui);

                if self.controller.shows_processing() {
                    ui.add_space(20.0);
                    self.render_processing(ui);
                }

                if let Some(result_url) = self.controller.result_url().map(str::to_owned) {
                    ui.add_space(20.0);
                    self.render_result(ui, &result_url);
                }

                ui.add_space(20.0);
            });
        });
    }

    fn render_upload_form(&mut self, ui: &mut egui::Ui) {
        let accepts_files = self.controller.accepts_files();
        let mut browse = false;
        let mut remove = false;
        let mut submit = false;

        let stroke = if self.drop_hover {
            Stroke::new(2.0, ACCENT)
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };
        egui::Frame::group(ui.style()).stroke(stroke).show(ui, |ui| {
            ui.set_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.add_space(10.0);
                ui.label(RichText::new("🎞 Drag & drop a video file here").size(16.0));
                ui.add_space(5.0);
                ui.add_enabled_ui(accepts_files, |ui| {
                    browse = ui.button("📁 Browse...").clicked();
                });
                ui.add_space(10.0);
            });
        });

        if let Some(file) = self.controller.selected_file() {
            ui.add_space(10.0);
            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.label(format!("Selected: {}", file.name));
                    if let Some(size) = file.size {
                        ui.label(
                            RichText::new(human_size(size))
                                .color(ui.visuals().text_color().gamma_multiply(0.7)),
                        );
                    }
                    let can_remove = matches!(self.controller.phase(), Phase::FileSelected { .. });
                    ui.add_enabled_ui(can_remove, |ui| {
                        remove = ui.button("✖ Remove").clicked();
                    });
                });
            });
        }

        ui.add_space(15.0);
        ui.horizontal(|ui| {
            ui.label("Summary length");
            let mut minutes = self.controller.duration_minutes();
            let slider = egui::Slider::new(&mut minutes, self.controller.duration_range())
                .show_value(false);
            if ui.add(slider).changed() {
                self.controller.set_duration_minutes(minutes);
            }
            ui.label(format!("{} min", self.controller.duration_minutes()));
        });

        ui.add_space(15.0);
        ui.vertical_centered(|ui| {
            ui.add_enabled_ui(self.controller.can_submit(), |ui| {
                let button =
                    egui::Button::new("🎬 Summarize Video").min_size(egui::vec2(200.0, 40.0));
                submit = ui.add(button).clicked();
            });
        });

        if browse {
            let picked = FileDialog::new()
                .add_filter("Video", &VIDEO_EXTENSIONS[..])
                .pick_file();
            if let Some(path) = picked {
                self.select(vec![SelectedFile::from_path(&path)]);
            }
        }
        if remove {
            self.controller.remove_file();
        }
        if submit {
            self.submit();
        }
    }

    fn render_processing(&mut self, ui: &mut egui::Ui) {
        let progress = self.controller.progress();
        let animate = matches!(
            self.controller.phase(),
            Phase::Submitting { .. } | Phase::Polling { .. }
        );

        ui.group(|ui| {
            ui.add(
                egui::ProgressBar::new(progress.fraction())
                    .show_percentage()
                    .animate(animate)
                    .fill(ACCENT),
            );
            ui.label(&progress.message);
        });
    }

    fn render_result(&mut self, ui: &mut egui::Ui, result_url: &str) {
        let resolved = self
            .worker
            .client()
            .resolve(result_url)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| result_url.to_string());
        let mut download = false;
        let mut start_over = false;

        ui.group(|ui| {
            ui.set_width(ui.available_width());
            ui.vertical_centered(|ui| {
                ui.label(RichText::new("✅ Your summary is ready").size(18.0));
                ui.add_space(5.0);
                ui.label(RichText::new(&resolved).monospace());
                ui.add_space(10.0);

                ui.horizontal(|ui| {
                    if ui.button("▶ Play summary").clicked() {
                        if let Err(e) = open::that(&resolved) {
                            tracing::error!(url = %resolved, "could not open player: {e}");
                        }
                    }
                    download = ui.button("⬇ Download").clicked();
                });

                if let Some(note) = self.controller.download_note() {
                    ui.add_space(5.0);
                    ui.label(note);
                }

                ui.add_space(10.0);
                start_over = ui.button("🔄 Start new summary").clicked();
            });
        });

        if download {
            let file_name = download_file_name(&resolved);
            let dest = FileDialog::new().set_file_name(&file_name).save_file();
            if let Some(dest) = dest {
                let commands = self.controller.request_download(dest);
                self.run(commands);
            }
        }
        if start_over {
            self.reset();
        }
    }
}

fn download_file_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "summary.mp4".to_string())
}
