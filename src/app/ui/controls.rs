use eframe::egui::{self, Key, Ui};
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;

use gfascope::util::format_bases;

use super::super::ViewModel;

const GENOME_ROWS: f32 = 180.0;

impl ViewModel {
    pub(in crate::app) fn draw_controls(&mut self, ui: &mut Ui) {
        ui.heading("Navigation");
        ui.separator();
        ui.add_space(4.0);

        ui.label("Center (segment name or node id)");
        let center_response = ui.text_edit_singleline(&mut self.center_input);
        let submitted = center_response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

        let config = &self.session.context().config;
        let (max_radius, radius_threshold) = (config.max_radius, config.radius_threshold);
        ui.add(egui::Slider::new(&mut self.radius, 0..=max_radius).text("radius"));
        if self.radius >= radius_threshold {
            ui.small(format!(
                "Sequence metadata is skipped at radius {radius_threshold} and above."
            ));
        }

        if ui.button("Show window").clicked() || submitted {
            match self.session.resolve_node(&self.center_input) {
                Some(center) => self.navigate(center),
                None => self.status = Some(format!("Unknown node {:?}", self.center_input.trim())),
            }
        }

        ui.add_space(8.0);
        ui.separator();
        self.draw_genome_picker(ui);
        ui.add_space(8.0);
        ui.separator();
        self.draw_go_to(ui);
    }

    fn draw_genome_picker(&mut self, ui: &mut Ui) {
        ui.heading("Genomes");
        ui.add_space(4.0);
        ui.label("Filter");
        ui.text_edit_singleline(&mut self.genome_filter);

        let candidates = {
            let query = self.genome_filter.trim();
            let mut scored: Vec<(i64, String)> = self
                .session
                .graph()
                .genome_names()
                .filter_map(|name| {
                    if query.is_empty() {
                        Some((0, name.to_owned()))
                    } else {
                        fuzzy_match_score(&self.matcher, name, query).map(|score| (score, name.to_owned()))
                    }
                })
                .collect();
            scored.sort_by(|left, right| right.0.cmp(&left.0).then_with(|| left.1.cmp(&right.1)));
            scored
        };

        let mut picked = None;
        egui::ScrollArea::vertical()
            .id_salt("genome_list")
            .max_height(GENOME_ROWS)
            .show(ui, |ui| {
                if candidates.is_empty() {
                    ui.weak("No genome paths match.");
                }
                for (_, name) in &candidates {
                    let selected = self.selected_genome.as_deref() == Some(name.as_str());
                    let indexed = self.session.index().is_indexed(name);
                    let label = if indexed {
                        name.clone()
                    } else {
                        format!("{name} (not indexed)")
                    };
                    if ui.selectable_label(selected, label).clicked() {
                        picked = Some(name.clone());
                    }
                }
            });

        if let Some(genome) = picked {
            self.select_genome(genome);
        }
    }

    fn draw_go_to(&mut self, ui: &mut Ui) {
        ui.heading("Go to coordinate");
        ui.add_space(4.0);

        let Some(genome) = self.selected_genome.clone() else {
            ui.label("Pick a genome to build its coordinate index.");
            return;
        };

        let progress = self.session.progress().snapshot();
        if !self.session.index().is_indexed(&genome) {
            ui.add(
                egui::ProgressBar::new(f32::from(progress.percent) / 100.0)
                    .text(progress.message.as_str()),
            );
            return;
        }

        if let Some(length) = self.session.index().genome_length(&genome) {
            ui.label(format!("{genome}: {}", format_bases(length)));
        }

        ui.label("Base (0-based)");
        let response = ui.text_edit_singleline(&mut self.base_input);
        let submitted = response.lost_focus() && ui.input(|input| input.key_pressed(Key::Enter));

        if ui.button("Go").clicked() || submitted {
            let Ok(base) = self.base_input.trim().replace('_', "").parse::<u64>() else {
                self.status = Some(format!("{:?} is not a base position", self.base_input.trim()));
                return;
            };
            match self.session.go_to(&genome, base, self.radius) {
                Some((point, window)) => {
                    self.center_input = self.node_label(point.node_id);
                    self.window = Some(window);
                    self.enriched = false;
                    self.status = Some(format!(
                        "{genome}:{base} is offset {} in {}",
                        point.offset,
                        self.node_label(point.node_id)
                    ));
                }
                None => self.status = Some(format!("Coordinate {genome}:{base} not found")),
            }
        }

        if let Some(center) = self.session.query().center()
            && let Some(base) = self.session.index().get_base(&genome, center)
        {
            ui.small(format!("Center starts at {genome}:{base}"));
        }
    }
}

fn fuzzy_match_score(matcher: &SkimMatcherV2, text: &str, query: &str) -> Option<i64> {
    matcher
        .fuzzy_match(text, query)
        .or_else(|| matcher.fuzzy_match(&text.to_ascii_lowercase(), &query.to_ascii_lowercase()))
}
