use eframe::egui::{self, RichText, Ui};

use gfascope::model::{HasLength, HasMetadata, Node};
use gfascope::util::{abbreviate_sequence, format_bases};

use super::super::ViewModel;

const SEQUENCE_PREVIEW: usize = 48;

impl ViewModel {
    pub(in crate::app) fn draw_window(&mut self, ui: &mut Ui) {
        let Some(window) = self.window.clone() else {
            ui.vertical_centered(|ui| {
                ui.add_space(120.0);
                ui.heading("The graph has no segments to show.");
            });
            return;
        };

        ui.horizontal(|ui| {
            if let Some(center) = window.center() {
                ui.label(RichText::new(format!("Center {}", self.node_label(center))).strong());
            }
            ui.label(format!("radius {}", window.radius()));
            if self.enriched {
                ui.label("metadata loaded");
            } else if window.radius() >= self.session.context().config.radius_threshold {
                ui.weak("metadata skipped for large windows");
            } else {
                ui.spinner();
                ui.weak("loading metadata");
            }
        });
        ui.separator();

        let mut recenter = None;
        egui::ScrollArea::both()
            .id_salt("visible_nodes")
            .auto_shrink([false, false])
            .show(ui, |ui| {
                egui::Grid::new("visible_node_grid")
                    .striped(true)
                    .num_columns(5)
                    .show(ui, |ui| {
                        ui.label(RichText::new("Segment").strong());
                        ui.label(RichText::new("Length").strong());
                        ui.label(RichText::new("Hops").strong());
                        ui.label(RichText::new("Genomes").strong());
                        ui.label(RichText::new("Sequence").strong());
                        ui.end_row();

                        for node in window.nodes() {
                            if ui.link(self.node_label(node.id())).clicked() {
                                recenter = Some(node.id());
                            }
                            ui.label(format_bases(node.length()));
                            ui.label(
                                self.session
                                    .query()
                                    .depth(node.id())
                                    .map_or_else(String::new, |depth| depth.to_string()),
                            );
                            ui.label(genome_summary(node));
                            match node.metadata().ok().flatten() {
                                Some(metadata) => {
                                    ui.monospace(abbreviate_sequence(metadata.sequence(), SEQUENCE_PREVIEW));
                                }
                                None => {
                                    ui.weak("-");
                                }
                            }
                            ui.end_row();
                        }
                    });
            });

        if let Some(center) = recenter {
            self.navigate(center);
        }
    }
}

fn genome_summary(node: &Node) -> String {
    match node.genomes() {
        Some(genomes) if genomes.len() <= 3 => genomes.iter().cloned().collect::<Vec<_>>().join(", "),
        Some(genomes) => format!("{} genomes", genomes.len()),
        None => String::new(),
    }
}
