use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use capsule_lander::config::SimulationConfig;
use capsule_lander::control::RandomPilot;
use capsule_lander::feedback::landing_pad_color;
use capsule_lander::sim::{run_episodes, EpisodeRecord, SimulationOrchestrator, TrainingArea};

const EPISODES: usize = 4;

fn main() -> eframe::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    // Heuristic pilot flies every episode.
    let config = SimulationConfig { is_training: false, ..SimulationConfig::default() };
    let policy = Box::new(RandomPilot::new(5, 0.0, config.seed));
    let records = SimulationOrchestrator::sandbox(TrainingArea::standard(0), config, policy)
        .and_then(|mut orch| run_episodes(&mut orch, EPISODES))
        .unwrap_or_else(|e| {
            eprintln!("simulation failed: {e}");
            Vec::new()
        });

    let app = LanderViz { records, selected: 0 };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Capsule Lander", options, Box::new(|_| Ok(Box::new(app))))
}

struct LanderViz {
    records: Vec<EpisodeRecord>,
    selected: usize,
}

fn plot(ui: &mut egui::Ui, id: &str, name: &str, w: f32, h: f32, points: PlotPoints) {
    Plot::new(id)
        .width(w)
        .height(h)
        .x_axis_label("Time (s)")
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(name.to_string(), points));
        });
}

impl eframe::App for LanderViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let Some(record) = self.records.get(self.selected) else {
            egui::CentralPanel::default().show(ctx, |ui| {
                ui.heading("No episodes recorded");
            });
            return;
        };
        let summary = record.summary;
        let mut selected = self.selected;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.horizontal(|ui| {
                for (i, r) in self.records.iter().enumerate() {
                    let label = format!("Episode {}", r.summary.episode);
                    if ui.selectable_label(selected == i, label).clicked() {
                        selected = i;
                    }
                }
            });
            ui.horizontal(|ui| {
                let [r, g, b] = landing_pad_color(summary.terminal_score).to_u8();
                let (rect, _) = ui.allocate_exact_size(egui::vec2(24.0, 24.0), egui::Sense::hover());
                ui.painter().rect_filled(rect, 4.0, egui::Color32::from_rgb(r, g, b));
                ui.label(format!(
                    "{:?}  |  steps: {}  |  return: {:.3}  |  terminal score: {:.3}",
                    summary.outcome, summary.steps, summary.total_reward, summary.terminal_score,
                ));
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;
            let ticks = &record.ticks;
            let cumulative = record.cumulative_reward();

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Altitude (m)");
                    let points: PlotPoints = ticks.iter().map(|t| [t.body.time, t.body.pos.z]).collect();
                    plot(ui, "altitude", "Altitude", half_w, half_h, points);
                });
                ui.vertical(|ui| {
                    ui.label("Speed (m/s)");
                    let points: PlotPoints =
                        ticks.iter().map(|t| [t.body.time, t.body.vel.norm()]).collect();
                    plot(ui, "speed", "Speed", half_w, half_h, points);
                });
            });

            ui.horizontal(|ui| {
                ui.vertical(|ui| {
                    ui.label("Tilt (deg)");
                    let points: PlotPoints =
                        ticks.iter().map(|t| [t.body.time, t.body.tilt_deg()]).collect();
                    plot(ui, "tilt", "Tilt", half_w, half_h, points);
                });
                ui.vertical(|ui| {
                    ui.label("Cumulative reward");
                    let points: PlotPoints = ticks
                        .iter()
                        .zip(cumulative.iter())
                        .map(|(t, r)| [t.body.time, *r])
                        .collect();
                    plot(ui, "reward", "Reward", half_w, half_h, points);
                });
            });
        });

        self.selected = selected;
    }
}
