use eframe::egui::{self, Align, Context, Layout};

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("top_bar")
            .resizable(false)
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    let graph = self.session.graph();
                    ui.heading("gfascope");
                    ui.separator();
                    ui.label(format!("file: {}", graph.source().display()));
                    ui.label(format!("segments: {}", graph.node_count()));
                    ui.label(format!("links: {}", graph.edge_count()));
                    ui.label(format!("genomes: {}", graph.genome_paths().len()));
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(status) = &self.status {
                            ui.label(status.as_str());
                        }
                        if let Some(window) = &self.window {
                            ui.label(format!(
                                "visible: {} nodes, {} edges",
                                window.node_count(),
                                window.edge_count()
                            ));
                        }
                    });
                });
            });

        egui::SidePanel::left("controls")
            .resizable(true)
            .default_width(320.0)
            .show(ctx, |ui| self.draw_controls(ui));

        egui::SidePanel::right("bookmarks")
            .resizable(true)
            .default_width(260.0)
            .show(ctx, |ui| self.draw_bookmarks(ui));

        egui::CentralPanel::default().show(ctx, |ui| self.draw_window(ui));
    }
}
