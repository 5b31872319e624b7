use eframe::egui;
use monster_practice::{
    core::{
        models::SessionId,
        settings::SETTINGS_FILE,
        Settings,
    },
    gui::PracticeApp,
    persistence::load_json_or_default,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("monster_practice=info")),
        )
        .init();

    let settings = load_json_or_default::<Settings>(SETTINGS_FILE).with_env_overrides();
    let session_id = std::env::args()
        .nth(1)
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .map(SessionId);

    info!(api = %settings.api_base_url, session = ?session_id, "starting monster practice");

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Monster Practice")
            .with_inner_size([1100.0, 720.0])
            .with_min_inner_size([720.0, 480.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Monster Practice",
        native_options,
        Box::new(move |cc| {
            let app = PracticeApp::new(cc, settings, session_id)?;
            Ok(Box::new(app))
        }),
    )
}
