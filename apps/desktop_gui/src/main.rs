use clap::Parser;
use crossbeam_channel::bounded;
use eframe::egui;

mod backend_bridge;
mod controller;
mod ui;

use backend_bridge::{commands::BackendCommand, runtime::spawn_backend_thread};
use controller::events::UiEvent;
use ui::app::MainWindowApp;

const APP_TITLE: &str = "Accord";

#[derive(Debug, Parser)]
#[command(name = "accord", about = "Desktop chat client")]
struct Args {
    /// Gateway endpoint; http(s) schemes are upgraded to websocket schemes.
    #[arg(long, default_value = "wss://gateway.accord.example/session")]
    gateway_url: String,

    /// Override the preferences directory (defaults to the platform data dir).
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,
}

fn preferences_database_url(args: &Args) -> String {
    let dir = args
        .data_dir
        .clone()
        .unwrap_or_else(|| dirs::data_dir().unwrap_or_else(std::env::temp_dir).join("accord"));
    format!(
        "sqlite://{}",
        dir.join("preferences.db").to_string_lossy().replace('\\', "/")
    )
}

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let (cmd_tx, cmd_rx) = bounded::<BackendCommand>(256);
    let (ui_tx, ui_rx) = bounded::<UiEvent>(2048);
    spawn_backend_thread(preferences_database_url(&args), cmd_rx, ui_tx);

    let gateway_url = args.gateway_url.clone();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_TITLE)
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([980.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        APP_TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(MainWindowApp::new(cmd_tx, ui_rx, gateway_url)))),
    )
}

#[cfg(test)]
mod tests {
    use super::{preferences_database_url, Args};

    #[test]
    fn preferences_url_uses_data_dir_override() {
        let args = Args {
            gateway_url: "wss://gateway.accord.example/session".to_string(),
            data_dir: Some(std::path::PathBuf::from("/tmp/accord-test")),
        };
        assert_eq!(
            preferences_database_url(&args),
            "sqlite:///tmp/accord-test/preferences.db"
        );
    }
}
