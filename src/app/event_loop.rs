use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use ratatui::DefaultTerminal;

use crate::app::{App, Message, Model, ToastLevel, load_scenario, update};
use crate::perf;
use crate::watcher::ScenarioWatcher;

/// Longest wait for input while nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(250);

impl App {
    /// Run the application until the user quits.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = perf::scope("app.run.total");

        let scenario = load_scenario(&self.scenario_path, &self.config)?;
        let mut model = Model::new(self.scenario_path.clone(), scenario, self.config.clone());
        model.watch_enabled = self.watch_enabled;

        let init_scope = perf::scope("app.ratatui_init");
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal; codeplay needs an interactive terminal")?;
        let size = terminal.size()?;
        model.terminal_size = (size.width, size.height);
        drop(init_scope);

        if self.autoplay {
            model = update(model, Message::Toggle);
        }

        let result = self.event_loop(&mut terminal, &mut model);
        ratatui::restore();
        result
    }

    fn event_loop(&self, terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let mut watcher = if model.watch_enabled {
            match self.make_watcher() {
                Ok(watcher) => Some(watcher),
                Err(err) => {
                    model.watch_enabled = false;
                    model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
                    perf::log_event("watcher.error", err.to_string());
                    None
                }
            }
        } else {
            None
        };
        let mut last_tick = Instant::now();
        let mut frame_idx: u64 = 0;
        let mut needs_render = true;

        loop {
            if model.expire_toast(Instant::now()) {
                needs_render = true;
            }

            if watcher.as_mut().is_some_and(ScenarioWatcher::poll_changed) {
                Self::dispatch(model, Message::FileChanged);
                last_tick = Instant::now();
                needs_render = true;
            }

            // The virtual clock follows real time.
            let now = Instant::now();
            if model.player.has_pending_timers() {
                Self::dispatch(model, Message::Tick(now - last_tick));
                needs_render = true;
            }
            last_tick = now;

            if needs_render {
                frame_idx += 1;
                let draw_start = Instant::now();
                terminal.draw(|frame| crate::ui::render(model, frame))?;
                perf::log_event(
                    "frame.draw",
                    format!(
                        "frame={frame_idx} draw_ms={:.3}",
                        draw_start.elapsed().as_secs_f64() * 1000.0
                    ),
                );
                needs_render = false;
            }
            if model.should_quit {
                return Ok(());
            }

            let poll = [
                Some(IDLE_POLL),
                model.player.next_due(),
                watcher.as_ref().and_then(ScenarioWatcher::pending_for),
            ]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(IDLE_POLL);
            if event::poll(poll)? {
                // Coalesce bursts (key repeat, paste) into a single render.
                loop {
                    if let Some(msg) = Self::handle_event(&event::read()?, model) {
                        perf::log_event("event.message", format!("frame={frame_idx} msg={msg:?}"));
                        Self::dispatch(model, msg);
                        needs_render = true;
                    }
                    if !event::poll(Duration::ZERO)? {
                        break;
                    }
                }
            }
        }
    }

    fn dispatch(model: &mut Model, msg: Message) {
        let side = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, &side);
    }
}
