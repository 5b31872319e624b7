use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};

use eframe::egui;
use tracing::{
    info,
    warn,
};

use super::{
    carousel_view::{
        carousel_view,
        TailState,
    },
    error_modal::ErrorModal,
    message_overlay::{
        MessageOverlay,
        OverlayAction,
    },
    reward_overlay::RewardOverlay,
    theme::{
        set_theme,
        Theme,
    },
    top_bar::{
        SessionStatus,
        TopBar,
        TopBarAction,
    },
};
use crate::{
    api::{
        ApiClient,
        ItemSource,
        OutcomeSubmitter,
    },
    core::{
        http::{
            Credentials,
            Transport,
        },
        models::{
            Outcome,
            SessionId,
        },
        settings::SETTINGS_FILE,
        tasks::TaskManager,
        PracticeError,
        Settings,
    },
    persistence::{
        load_json_or_default,
        save_json,
    },
    practice::{
        PracticeController,
        RewardQueue,
        Screen,
        SubmitDecision,
    },
};

const FRAME: Duration = Duration::from_millis(16);
const OUTCOME_KEYS: [egui::Key; 5] =
    [egui::Key::Num1, egui::Key::Num2, egui::Key::Num3, egui::Key::Num4, egui::Key::Num5];

pub struct PracticeApp {
    controller: PracticeController<TaskManager, RewardQueue>,
    settings: Settings,
    theme: Theme,
    message_overlay: MessageOverlay,
    error_modal: ErrorModal,
    session_input: String,
}

impl PracticeApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        session_id: Option<SessionId>,
    ) -> Result<Self, PracticeError> {
        let task_manager = build_task_manager(&settings, &cc.egui_ctx)?;
        let rewards = RewardQueue::new(settings.max_visible_rewards, settings.reward_display());
        let controller = PracticeController::new(
            task_manager,
            rewards,
            settings.batch_size(),
            settings.animation_duration(),
        );

        let mut app = Self {
            controller,
            theme: Theme::dracula(),
            message_overlay: MessageOverlay::new(),
            error_modal: ErrorModal::new(),
            session_input: session_id.as_ref().map(|id| id.0.clone()).unwrap_or_default(),
            settings,
        };

        app.setup_theme(cc);

        if let Some(session_id) = session_id {
            app.start_session(session_id);
        }

        Ok(app)
    }

    fn setup_theme(&self, cc: &eframe::CreationContext<'_>) {
        cc.egui_ctx.set_zoom_factor(cc.egui_ctx.zoom_factor() + 0.2);
        set_theme(&cc.egui_ctx, &self.theme);

        cc.egui_ctx.set_theme(if self.settings.dark_mode {
            egui::Theme::Dark
        } else {
            egui::Theme::Light
        });
    }

    fn start_session(&mut self, session_id: SessionId) {
        info!(session = %session_id, "starting practice session");
        self.message_overlay.set_message("Loading practice session...");
        self.controller.initialize(session_id);
    }

    fn restart_session(&mut self) {
        if let Some(session_id) = self.controller.session_id().cloned() {
            self.start_session(session_id);
        }
    }

    fn submit(&mut self, outcome: Outcome) {
        match self.controller.submit_outcome(outcome) {
            SubmitDecision::Sent(_) => {}
            ignored => tracing::debug!(?outcome, ?ignored, "outcome not submitted"),
        }
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.error_modal.is_open() || ctx.wants_keyboard_input() {
            return;
        }

        let (picked, toggle) = ctx.input(|i| {
            let picked = OUTCOME_KEYS.iter().position(|key| i.key_pressed(*key));
            (picked, i.key_pressed(egui::Key::Space))
        });

        if let Some(index) = picked {
            self.submit(Outcome::ALL[index]);
        }
        if toggle {
            self.controller.tap_displayed();
        }
    }

    fn sync_overlay(&mut self) {
        match self.controller.screen() {
            Screen::Loading => match self.controller.load_error() {
                Some(error) => {
                    self.message_overlay.set_message("Unable to load this practice session");
                    self.message_overlay.set_error(error.to_string());
                }
                None => {
                    if self.message_overlay.error.is_some() || !self.message_overlay.active {
                        self.message_overlay.set_message("Loading practice session...");
                    }
                }
            },
            _ => self.message_overlay.clear_message(),
        }
    }

    fn outcome_panel(&mut self, ctx: &egui::Context) {
        if !matches!(self.controller.screen(), Screen::Ready) {
            return;
        }

        egui::TopBottomPanel::bottom("outcome_panel").show(ctx, |ui| {
            ui.add_space(10.0);
            let enabled = self.controller.can_submit();
            let mut picked = None;

            ui.horizontal(|ui| {
                let spacing = ui.spacing().item_spacing.x;
                let width = ((ui.available_width() - spacing * 4.0) / 5.0).max(60.0);
                for (index, outcome) in Outcome::ALL.iter().enumerate() {
                    let color = self.theme.outcome(ui.ctx(), *outcome);
                    let label = egui::RichText::new(format!("{}  {}", index + 1, outcome.label()))
                        .color(color)
                        .strong();
                    let button = egui::Button::new(label)
                        .min_size(egui::vec2(width, 36.0))
                        .stroke(egui::Stroke::new(1.0, color));
                    if ui.add_enabled(enabled, button).clicked() {
                        picked = Some(*outcome);
                    }
                }
            });

            ui.add_space(10.0);

            if let Some(outcome) = picked {
                self.submit(outcome);
            }
        });
    }

    fn central_panel(&mut self, ctx: &egui::Context, now: Instant) {
        egui::CentralPanel::default().show(ctx, |ui| match self.controller.screen().clone() {
            Screen::NotStarted => self.session_prompt(ui),
            Screen::Loading => {}
            Screen::Ready => {
                let tail = if self.controller.buffer().is_exhausted() {
                    TailState::End
                } else if self.controller.is_stalled() {
                    TailState::Stalled
                } else {
                    TailState::Loading
                };

                if tail == TailState::Stalled {
                    ui.horizontal(|ui| {
                        ui.label("More monsters could not be loaded.");
                        if ui.button("Retry").clicked() {
                            self.controller.retry_prefetch();
                        }
                    });
                }

                let view = self.controller.view(now);
                if let Some(position) = carousel_view(ui, &self.theme, &view, tail) {
                    self.controller.tap(position);
                }
            }
            Screen::Finished => {
                let resolved = self.controller.buffer().resolved_count();
                let points = self.controller.points();
                self.centered_message(ui, "Session complete", &format!(
                    "{resolved} monsters practised, {points:+} points"
                ));
                ui.vertical_centered(|ui| {
                    if ui.button("Practice again").clicked() {
                        self.restart_session();
                    }
                });
            }
            Screen::Aborted { reason } => {
                self.centered_message(ui, "This session had to stop", &reason);
                ui.vertical_centered(|ui| {
                    if ui.button("Reload session").clicked() {
                        self.restart_session();
                    }
                });
            }
            Screen::SignedOut => {
                self.centered_message(
                    ui,
                    "Signed out",
                    "Your login has expired. Update the access token in settings.json and restart.",
                );
            }
        });
    }

    fn session_prompt(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.label(self.theme.heading(ui.ctx(), "Enter a practice session id"));
            ui.add_space(8.0);
            let response =
                ui.add(egui::TextEdit::singleline(&mut self.session_input).desired_width(280.0));
            let submitted =
                response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            ui.add_space(8.0);
            let input = self.session_input.trim().to_string();
            if (ui.add_enabled(!input.is_empty(), egui::Button::new("Start")).clicked() || submitted)
                && !input.is_empty()
            {
                self.start_session(SessionId(input));
            }
        });
    }

    fn centered_message(&self, ui: &mut egui::Ui, title: &str, body: &str) {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() * 0.3);
            ui.label(self.theme.heading(ui.ctx(), title).size(24.0));
            ui.add_space(8.0);
            ui.label(body);
            ui.add_space(12.0);
        });
    }
}

impl eframe::App for PracticeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();

        let task_results = self.controller.tasks_mut().poll_results();
        for result in task_results {
            self.controller.handle_task_result(result, now);
        }

        self.controller.tick(now);
        for notice in self.controller.take_notices() {
            self.error_modal.push(notice);
        }
        self.controller.rewards_mut().update(now);
        self.sync_overlay();
        self.handle_shortcuts(ctx);

        let status = SessionStatus {
            session: self.controller.session(),
            resolved: self.controller.buffer().resolved_count(),
            loaded: self.controller.buffer().len(),
            points: self.controller.points(),
            busy: self.controller.is_busy(),
        };
        if let Some(action) = TopBar::show(ctx, &self.theme, &status) {
            match action {
                TopBarAction::RestartSession => self.restart_session(),
                TopBarAction::ChangeSession => {
                    self.controller.reset();
                    self.message_overlay.clear_message();
                }
            }
        }

        self.outcome_panel(ctx);
        self.central_panel(ctx, now);

        if let Some(OverlayAction::Retry) = self.message_overlay.show(ctx, &self.theme) {
            self.restart_session();
        }
        RewardOverlay::show(ctx, &self.theme, self.controller.rewards(), now);
        self.error_modal.show(ctx);

        if self.controller.carousel().is_transitioning() || !self.controller.rewards().is_idle() {
            ctx.request_repaint_after(FRAME);
        }
    }
}

fn build_task_manager(
    settings: &Settings,
    ctx: &egui::Context,
) -> Result<TaskManager, PracticeError> {
    let transport = Transport::from_settings(settings)?.with_token_listener(Arc::new(persist_tokens));
    let client = Arc::new(ApiClient::new(transport));
    let repaint_ctx = ctx.clone();
    Ok(TaskManager::new(
        Arc::clone(&client) as Arc<dyn ItemSource>,
        client as Arc<dyn OutcomeSubmitter>,
    )?
    .with_waker(Arc::new(move || repaint_ctx.request_repaint())))
}

/// Writes refreshed tokens back to the settings file on disk.
fn persist_tokens(credentials: &Credentials) {
    let mut stored = load_json_or_default::<Settings>(SETTINGS_FILE);
    stored.access_token = credentials.access_token.clone();
    if credentials.refresh_token.is_some() {
        stored.refresh_token = credentials.refresh_token.clone();
    }
    if let Err(e) = save_json(&stored, SETTINGS_FILE) {
        warn!("failed to persist refreshed tokens: {e}");
    }
}
