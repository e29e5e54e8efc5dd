use eframe::egui::{self, Ui};

use gfascope::bookmarks::Bookmark;

use super::super::ViewModel;

impl ViewModel {
    pub(in crate::app) fn draw_bookmarks(&mut self, ui: &mut Ui) {
        ui.heading("Bookmarks");
        ui.separator();

        let current = self.session.query().center().map(|center| (center, self.session.query().radius()));
        ui.add_enabled_ui(current.is_some(), |ui| {
            ui.label("Description");
            ui.text_edit_singleline(&mut self.bookmark_description);
            if ui.button("Bookmark this window").clicked()
                && let Some((center, radius)) = current
            {
                let bookmark = Bookmark {
                    center,
                    radius,
                    description: self.bookmark_description.trim().to_owned(),
                };
                match self.session.bookmarks_mut().add(bookmark) {
                    Ok(()) => self.bookmark_description.clear(),
                    Err(error) => self.status = Some(format!("Failed to save bookmark: {error}")),
                }
            }
        });
        ui.add_space(6.0);

        let mut open = None;
        let mut remove = None;
        egui::ScrollArea::vertical()
            .id_salt("bookmark_list")
            .show(ui, |ui| {
                let bookmarks = self.session.bookmarks().list();
                if bookmarks.is_empty() {
                    ui.weak("No bookmarks for this file yet.");
                }
                for (index, bookmark) in bookmarks.iter().enumerate() {
                    ui.horizontal(|ui| {
                        let title = if bookmark.description.is_empty() {
                            format!("{} (r={})", self.node_label(bookmark.center), bookmark.radius)
                        } else {
                            bookmark.description.clone()
                        };
                        if ui.link(title).clicked() {
                            open = Some((bookmark.center, bookmark.radius));
                        }
                        if ui.small_button("x").clicked() {
                            remove = Some(index);
                        }
                    });
                }
            });

        if let Some((center, radius)) = open {
            self.radius = radius;
            self.navigate(center);
        }
        if let Some(index) = remove
            && let Err(error) = self.session.bookmarks_mut().remove(index)
        {
            self.status = Some(format!("Failed to remove bookmark: {error}"));
        }
    }
}
