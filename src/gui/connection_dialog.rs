use std::time::Instant;

use eframe::egui::{self, Color32};

use crate::connection::credentials::{ConnectionForm, Credentials, PROTOCOLS};
use crate::error::ViewerResult;
use crate::persistence::settings::{AppSettings, SettingsStore};
use super::banner::{Banner, BannerKind, CONNECTION_BANNER_TTL};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DialogAction {
    None,
    Submit,
    Cancel,
}

/// "Connect to Neo4j" dialog state.
pub struct ConnectionDialog {
    pub open: bool,
    pub form: ConnectionForm,
    pub banner: Banner,
    pub submitting: bool,
}

impl ConnectionDialog {
    pub fn new(settings: &AppSettings) -> Self {
        Self {
            open: false,
            form: ConnectionForm::from_settings(settings),
            banner: Banner::default(),
            submitting: false,
        }
    }

    /// Validate, persist the non-secret fields and hand back credentials to connect with.
    pub fn submit(&mut self, settings: &mut AppSettings, store: &SettingsStore) -> ViewerResult<Credentials> {
        self.form.validate()?;
        self.form.store_into(settings);
        if let Err(e) = store.save(settings) {
            log::warn!("could not persist connection defaults: {}", e);
        }
        self.submitting = true;
        Ok(self.form.credentials())
    }

    pub fn on_connected(&mut self) {
        self.submitting = false;
        self.open = false;
        self.banner.dismiss();
    }

    pub fn on_failed(&mut self, message: &str, now: Instant) {
        self.submitting = false;
        self.form.clear_password();
        self.banner.show_for(BannerKind::Danger, message, now, CONNECTION_BANNER_TTL);
    }

    pub fn tick(&mut self, now: Instant) {
        self.banner.tick(now);
    }

    pub fn ui(&mut self, ctx: &egui::Context) -> DialogAction {
        if !self.open {
            return DialogAction::None;
        }
        let mut action = DialogAction::None;
        egui::Window::new("Connect to Neo4j")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
            .show(ctx, |ui| {
                if self.banner.is_visible() {
                    let col = match self.banner.kind() {
                        BannerKind::Danger => Color32::from_rgb(230, 90, 90),
                        BannerKind::Success => Color32::LIGHT_GREEN,
                        BannerKind::Neutral => Color32::GRAY,
                    };
                    ui.horizontal(|ui| {
                        ui.colored_label(col, self.banner.message());
                        if ui.small_button("x").clicked() {
                            self.banner.dismiss();
                        }
                    });
                    ui.separator();
                }
                egui::Grid::new("connection_form").num_columns(2).spacing([8.0, 6.0]).show(ui, |ui| {
                    ui.label("Protocol");
                    egui::ComboBox::from_id_salt("protocol")
                        .selected_text(self.form.protocol.clone())
                        .show_ui(ui, |ui| {
                            for p in PROTOCOLS {
                                ui.selectable_value(&mut self.form.protocol, p.to_string(), p);
                            }
                        });
                    ui.end_row();
                    ui.label("Connection URL");
                    ui.text_edit_singleline(&mut self.form.host);
                    ui.end_row();
                    ui.label("Port");
                    ui.add(egui::TextEdit::singleline(&mut self.form.port).hint_text("7687"));
                    ui.end_row();
                    ui.label("Database");
                    ui.add(egui::TextEdit::singleline(&mut self.form.database).hint_text("neo4j"));
                    ui.end_row();
                    ui.label("Username");
                    ui.add(egui::TextEdit::singleline(&mut self.form.username).hint_text("neo4j"));
                    ui.end_row();
                    ui.label("Password");
                    ui.add(egui::TextEdit::singleline(&mut self.form.password).password(true));
                    ui.end_row();
                });
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Cancel").clicked() {
                        action = DialogAction::Cancel;
                    }
                    let enabled = self.form.can_submit() && !self.submitting;
                    let label = if self.submitting { "Connecting..." } else { "Submit" };
                    if ui.add_enabled(enabled, egui::Button::new(label)).clicked() {
                        action = DialogAction::Submit;
                    }
                    if self.submitting {
                        ui.spinner();
                    }
                });
            });
        action
    }
}
