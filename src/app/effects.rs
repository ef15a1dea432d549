use std::time::Duration;

use tracing::{info, warn};

use crate::app::{App, Message, Model, ToastLevel};
use crate::perf;
use crate::watcher::ScenarioWatcher;

const RELOAD_QUIET_PERIOD: Duration = Duration::from_millis(200);

impl App {
    pub(super) fn make_watcher(&self) -> notify::Result<ScenarioWatcher> {
        ScenarioWatcher::new(&self.scenario_path, RELOAD_QUIET_PERIOD)
    }

    /// Work that needs the disk or the terminal, after `update` ran.
    pub(super) fn handle_message_side_effects(model: &mut Model, msg: &Message) {
        if *msg != Message::FileChanged {
            return;
        }
        let _scope = perf::scope("app.reload");
        match model.reload_from_disk() {
            Ok(()) => {
                info!(path = %model.scenario_path.display(), "scenario reloaded");
                model.show_toast(ToastLevel::Info, "Scenario reloaded");
            }
            Err(err) => {
                warn!(%err, "reload failed");
                perf::log_event("reload.error", format!("{err:#}"));
                model.show_toast(ToastLevel::Error, format!("Reload failed: {err:#}"));
            }
        }
    }
}
