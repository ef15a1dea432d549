//! The playback state machine.
//!
//! A [`Player`] walks the scenario steps, dispatching each one to its
//! registered action. Actions never block: they either continue at once
//! through [`Player::proceed`] or leave a callback on the virtual-clock
//! [`TimerRegistry`], which the owner drives with [`Player::tick`].
//!
//! Moving to another step (`next`, `back`, a finished action) first runs
//! the cleanup callbacks of the interrupted step and cancels every pending
//! timer and click waiter, so nothing from an old step can fire later.

mod click;

pub use click::{WaiterId, WaiterOrigin};

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::editor::{Editor, Pos, Range};
use crate::error::{PlayerError, Result};
use crate::events::{EventHub, PlayerEvent, SubscriptionId};
use crate::perf;
use crate::registry::{ActionRegistry, ActionSpec};
use crate::scenario::{Scenario, Step};
use crate::stage::{Annotation, Progress, Roadmap, Stage};
use crate::texts::Texts;
use crate::timer::{TimerId, TimerRegistry};
use click::ClickWaiter;

/// Deferred work run against the player.
pub type Callback = Box<dyn FnOnce(&mut Player) -> Result<()>>;

/// Cleanup run when the current step is interrupted.
pub type Cleanup = Box<dyn FnOnce(&mut Player)>;

/// Locale used for roadmap labels when none is configured.
pub const DEFAULT_LOCALE: &str = "en";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlayerState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// What to do once an action is done.
pub enum Next {
    /// Move on to the following step.
    Advance,
    /// A custom continuation, used by actions that chain into others.
    Then(Callback),
}

impl Next {
    pub const fn advance() -> Self {
        Self::Advance
    }

    pub fn then(callback: impl FnOnce(&mut Player) -> Result<()> + 'static) -> Self {
        Self::Then(Box::new(callback))
    }

    pub(crate) fn run(self, player: &mut Player) -> Result<()> {
        match self {
            Self::Advance => player.advance(true),
            Self::Then(callback) => callback(player),
        }
    }
}

impl fmt::Debug for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance => f.write_str("Next::Advance"),
            Self::Then(_) => f.write_str("Next::Then(..)"),
        }
    }
}

/// Snapshot taken before a reversible step runs.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedState {
    pub text: String,
    pub cursor: Pos,
    pub selections: Vec<Range>,
    pub progress: Progress,
    /// Filled only by actions that show annotations.
    pub annotations: Option<Vec<Annotation>>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerConfig {
    /// Steps limited to another locale are skipped.
    pub locale: Option<String>,
    pub fast_forward: bool,
    /// Delay between `play()` and the first step.
    pub before_delay: Duration,
    /// Delay between the last step and the automatic `stop()`.
    pub after_delay: Duration,
    pub texts: Texts,
}

pub struct Player {
    editor: Box<dyn Editor>,
    steps: Vec<Step>,
    index: Option<usize>,
    state: PlayerState,
    config: PlayerConfig,
    registry: Rc<ActionRegistry>,
    timers: TimerRegistry<Callback>,
    events: EventHub<PlayerEvent>,
    cleanups: Vec<Cleanup>,
    waiters: Vec<ClickWaiter>,
    next_waiter: u64,
    stage: Stage,
    initial_text: String,
    initial_cursor: Pos,
}

impl Player {
    /// A player with the built-in actions.
    pub fn new(editor: Box<dyn Editor>, scenario: Scenario, config: PlayerConfig) -> Self {
        Self::with_registry(
            editor,
            scenario,
            config,
            Rc::new(ActionRegistry::with_builtins()),
        )
    }

    pub fn with_registry(
        mut editor: Box<dyn Editor>,
        scenario: Scenario,
        config: PlayerConfig,
        registry: Rc<ActionRegistry>,
    ) -> Self {
        if let Some((text, cursor)) = scenario.initial_text() {
            editor.set_text(&text);
            editor.set_cursor(cursor.unwrap_or_default());
        }
        let locale = config.locale.as_deref().unwrap_or(DEFAULT_LOCALE);
        let roadmap = Roadmap::new(scenario.roadmap_labels(locale));

        let mut timers = TimerRegistry::new();
        timers.set_fast_forward(config.fast_forward);

        let initializers: Vec<fn(&mut Self)> =
            registry.specs().filter_map(ActionSpec::initializer).collect();
        let mut player = Self {
            initial_text: editor.text(),
            initial_cursor: editor.cursor(),
            editor,
            steps: scenario.steps,
            index: None,
            state: PlayerState::Idle,
            config,
            registry,
            timers,
            events: EventHub::new(),
            cleanups: Vec::new(),
            waiters: Vec::new(),
            next_waiter: 0,
            stage: Stage::new(roadmap),
        };
        for init in initializers {
            init(&mut player);
        }
        player
    }

    pub const fn state(&self) -> PlayerState {
        self.state
    }

    /// Index of the current step, `None` before the first one.
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn editor(&self) -> &dyn Editor {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> &mut dyn Editor {
        self.editor.as_mut()
    }

    pub const fn stage(&self) -> &Stage {
        &self.stage
    }

    pub const fn stage_mut(&mut self) -> &mut Stage {
        &mut self.stage
    }

    pub fn locale(&self) -> Option<&str> {
        self.config.locale.as_deref()
    }

    pub const fn texts(&self) -> &Texts {
        &self.config.texts
    }

    pub const fn is_fast_forward(&self) -> bool {
        self.config.fast_forward
    }

    /// Current virtual time.
    pub const fn now(&self) -> Duration {
        self.timers.now()
    }

    /// Subscribe to player events by space-separated name (`"all"` for every one).
    pub fn on(&mut self, names: &str, listener: impl FnMut(&PlayerEvent) + 'static) -> SubscriptionId {
        self.events.on(names, listener)
    }

    pub fn off(&mut self, names: Option<&str>, id: Option<SubscriptionId>) {
        self.events.off(names, id);
    }

    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Paused => {
                self.state = PlayerState::Playing;
                self.timers.resume();
                self.log_transition();
                self.emit(PlayerEvent::Resume);
            }
            PlayerState::Idle => {
                self.reset();
                self.set_state(PlayerState::Playing);
                self.emit(PlayerEvent::Play);
                let delay = self.config.before_delay;
                self.schedule(delay, |player| player.advance(true));
            }
        }
        self.settle()
    }

    /// Freeze playback. Only acts while playing.
    pub fn pause(&mut self) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.state = PlayerState::Paused;
        self.timers.freeze();
        self.log_transition();
        self.emit(PlayerEvent::Pause);
    }

    pub fn toggle(&mut self) -> Result<()> {
        if self.state == PlayerState::Playing {
            self.pause();
            Ok(())
        } else {
            self.play()
        }
    }

    /// Cancel pending timers and click waits, then go idle. The document is
    /// left as is.
    pub fn stop(&mut self) {
        if self.state == PlayerState::Idle {
            return;
        }
        self.timers.cancel_all();
        self.waiters.clear();
        self.set_state(PlayerState::Idle);
        self.emit(PlayerEvent::Stop);
    }

    /// Back to the state right after construction.
    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.set_state(PlayerState::Idle);
        self.cleanups.clear();
        self.waiters.clear();
        self.index = None;
        self.stage.reset();
        let text = self.initial_text.clone();
        self.editor.set_text(&text);
        self.editor.set_cursor(self.initial_cursor);
        self.emit(PlayerEvent::Reset);
    }

    /// Skip to the following step.
    pub fn next(&mut self) -> Result<()> {
        self.drive(|player| player.advance(true))
    }

    /// Rewind to the previous reversible step.
    pub fn back(&mut self) -> Result<()> {
        self.drive(|player| player.advance(false))
    }

    pub fn set_fast_forward(&mut self, enabled: bool) {
        self.config.fast_forward = enabled;
        self.timers.set_fast_forward(enabled);
        self.emit(PlayerEvent::FastForward(enabled));
    }

    /// Advance the virtual clock by `elapsed`, firing due timers in order.
    pub fn tick(&mut self, elapsed: Duration) -> Result<()> {
        let until = self.timers.now() + elapsed;
        self.run_until(until)
    }

    /// Time until the earliest live timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    /// Whether any timer is live or parked.
    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty() || self.timers.backlog_len() > 0
    }

    /// Drive the clock until nothing is pending, answering each click
    /// waiter with its first selector. Waiters without selectors cannot be
    /// answered and are left pending.
    pub fn run_to_end(&mut self) -> Result<()> {
        loop {
            if let Some(wait) = self.timers.next_due() {
                self.tick(wait)?;
                continue;
            }
            let target = self
                .waiters
                .iter()
                .find_map(|waiter| waiter.selectors.first().cloned());
            let Some(target) = target else {
                if !self.waiters.is_empty() {
                    warn!(
                        pending = self.waiters.len(),
                        index = ?self.index,
                        "click waiters without selectors left unanswered"
                    );
                }
                return Ok(());
            };
            debug!(%target, "answering click waiter");
            self.click(&target)?;
        }
    }

    /// Whether a click waiter is still pending.
    pub fn is_waiting_for_click(&self) -> bool {
        !self.waiters.is_empty()
    }

    /// Deliver a click on `target`. Returns whether any waiter was released.
    pub fn click(&mut self, target: &str) -> Result<bool> {
        let ids: Vec<WaiterId> = self
            .waiters
            .iter()
            .filter(|waiter| waiter.matches(target))
            .map(|waiter| waiter.id)
            .collect();
        let mut released = false;
        for id in ids {
            if self.waiters.iter().any(|waiter| waiter.id == id) {
                released = true;
                self.drive(|player| player.release_waiter(id))?;
            }
        }
        Ok(released)
    }

    /// Selectors currently waited on, in registration order.
    pub fn click_targets(&self) -> impl Iterator<Item = &str> {
        self.waiters
            .iter()
            .flat_map(|waiter| waiter.selectors.iter().map(String::as_str))
    }

    /// Hand control to `next` as soon as the current callback returns.
    pub fn proceed(&mut self, next: Next) {
        self.timers.immediate(Box::new(move |player| next.run(player)));
    }

    /// Run `callback` after `delay`. Parked while not playing.
    pub fn schedule(
        &mut self,
        delay: Duration,
        callback: impl FnOnce(&mut Self) -> Result<()> + 'static,
    ) -> Option<TimerId> {
        self.timers.schedule(Box::new(callback), delay)
    }

    /// Hand control to `next` after `delay`.
    pub fn schedule_next(&mut self, delay: Duration, next: Next) -> Option<TimerId> {
        self.schedule(delay, move |player| next.run(player))
    }

    /// Run `cleanup` if the current step is interrupted.
    pub fn add_cleanup(&mut self, cleanup: impl FnOnce(&mut Self) + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// Continue with `callback` once one of the comma-separated `selectors`
    /// is clicked. A popover waiter replaces earlier popover waiters.
    pub fn wait_for_click(
        &mut self,
        selectors: &str,
        origin: WaiterOrigin,
        callback: impl FnOnce(&mut Self) -> Result<()> + 'static,
    ) -> WaiterId {
        if origin == WaiterOrigin::Popover {
            self.waiters.retain(|waiter| waiter.origin != WaiterOrigin::Popover);
        }
        let id = WaiterId(self.next_waiter);
        self.next_waiter += 1;
        let waiter = ClickWaiter::new(id, selectors, origin, Box::new(callback));
        debug!(%id, selectors = ?waiter.selectors, "waiting for click");
        self.waiters.push(waiter);
        id
    }

    /// Release waiter `id` on its own after `timeout`.
    pub fn release_after(&mut self, id: WaiterId, timeout: Duration) {
        let timer = self.schedule(timeout, move |player| player.release_waiter(id));
        if let Some(waiter) = self.waiters.iter_mut().find(|waiter| waiter.id == id) {
            waiter.timer = timer;
        }
    }

    /// Remove waiter `id` and run its callback. Unknown ids are ignored.
    pub fn release_waiter(&mut self, id: WaiterId) -> Result<()> {
        let Some(at) = self.waiters.iter().position(|waiter| waiter.id == id) else {
            return Ok(());
        };
        let waiter = self.waiters.remove(at);
        if let Some(timer) = waiter.timer {
            self.timers.cancel(timer);
        }
        (waiter.callback)(self)
    }

    /// Move one step forward or back to the previous reversible step.
    pub(crate) fn advance(&mut self, forward: bool) -> Result<()> {
        self.run_cleanups();
        self.timers.cancel_all();
        self.waiters.clear();
        let registry = Rc::clone(&self.registry);

        if forward {
            loop {
                let index = self.index.map_or(0, |i| i + 1);
                if index >= self.steps.len() {
                    break;
                }
                self.index = Some(index);
                self.emit(PlayerEvent::Action(index));
                let spec = self.lookup(&registry, index)?;
                if !self.is_correct_locale(&self.steps[index].options) {
                    debug!(index, "step skipped for locale");
                    continue;
                }
                if spec.is_reversible() {
                    self.capture_state(index, spec);
                }
                return self.dispatch(index, spec);
            }
            let delay = self.config.after_delay;
            self.schedule(delay, |player| {
                player.stop();
                Ok(())
            });
            return Ok(());
        }

        while let Some(current) = self.index.filter(|&i| i > 0) {
            let index = current - 1;
            self.index = Some(index);
            let spec = self.lookup(&registry, index)?;
            if spec.is_reversible() && self.is_correct_locale(&self.steps[index].options) {
                self.restore_state(index, spec);
                self.emit(PlayerEvent::Action(index));
                return self.dispatch(index, spec);
            }
        }
        if self.index == Some(0) {
            self.reset();
        }
        Ok(())
    }

    /// A step applies when either side has no locale or both agree.
    pub fn is_correct_locale(&self, options: &Value) -> bool {
        let Some(own) = self.config.locale.as_deref() else {
            return true;
        };
        match options.get("locale") {
            None | Some(Value::Null) => true,
            Some(locale) => locale.as_str() == Some(own),
        }
    }

    fn lookup<'r>(&self, registry: &'r ActionRegistry, index: usize) -> Result<&'r ActionSpec> {
        let kind = &self.steps[index].kind;
        registry
            .get(kind)
            .ok_or_else(|| PlayerError::UnknownAction(kind.clone()))
    }

    fn dispatch(&mut self, index: usize, spec: &ActionSpec) -> Result<()> {
        let options = self.steps[index].options.clone();
        debug!(index, kind = %self.steps[index].kind, "dispatching step");
        perf::log_event(
            "player.dispatch",
            format!("index={index} kind={}", self.steps[index].kind),
        );
        spec.invoke(self, &options, Next::advance())
    }

    fn capture_state(&mut self, index: usize, spec: &ActionSpec) {
        let mut state = CapturedState {
            text: self.editor.text(),
            cursor: self.editor.cursor(),
            selections: self.editor.selections(),
            progress: self.stage.roadmap.progress(),
            annotations: None,
        };
        if let Some(capture) = spec.capture_hook() {
            capture(self, &mut state);
        }
        self.steps[index].captured_state = Some(state);
    }

    fn restore_state(&mut self, index: usize, spec: &ActionSpec) {
        let Some(state) = self.steps[index].captured_state.clone() else {
            return;
        };
        self.editor.set_text(&state.text);
        self.editor.set_cursor(state.cursor);
        self.editor.set_selections(&state.selections);
        self.stage.roadmap.set(state.progress);
        if let Some(restore) = spec.restore_hook() {
            restore(self, &state);
        }
    }

    fn run_cleanups(&mut self) {
        let cleanups = std::mem::take(&mut self.cleanups);
        if !cleanups.is_empty() {
            debug!(count = cleanups.len(), "running cleanups");
        }
        for cleanup in cleanups {
            cleanup(self);
        }
    }

    /// Run `act`, halting playback if it fails, then fire whatever is due now.
    fn drive(&mut self, act: impl FnOnce(&mut Self) -> Result<()>) -> Result<()> {
        if let Err(err) = act(self) {
            self.halt(&err);
            return Err(err);
        }
        self.settle()
    }

    fn settle(&mut self) -> Result<()> {
        let now = self.timers.now();
        self.run_until(now)
    }

    fn run_until(&mut self, until: Duration) -> Result<()> {
        while let Some((id, callback)) = self.timers.pop_due(until) {
            if let Err(err) = callback(self) {
                debug!(%id, "timer callback failed");
                self.halt(&err);
                return Err(err);
            }
        }
        self.timers.advance_to(until);
        Ok(())
    }

    fn halt(&mut self, err: &PlayerError) {
        error!(%err, index = ?self.index, "playback halted");
        perf::log_event("player.halt", err.to_string());
        self.timers.cancel_all();
        self.waiters.clear();
        self.stop();
    }

    fn set_state(&mut self, state: PlayerState) {
        self.state = state;
        self.timers.set_running(state == PlayerState::Playing);
        self.log_transition();
    }

    fn log_transition(&self) {
        info!(state = ?self.state, index = ?self.index, "player state");
        perf::log_event("player.state", format!("{:?}", self.state));
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.trigger(&event);
    }
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("state", &self.state)
            .field("index", &self.index)
            .field("steps", &self.steps.len())
            .field("timers", &self.timers)
            .field("waiters", &self.waiters.len())
            .field("stage", &self.stage)
            .finish_non_exhaustive()
    }
}
