//! Name-keyed publish/subscribe.
//!
//! Listeners register under one or more space-separated event names. The
//! reserved name `"all"` receives every event. Triggering works on a
//! snapshot of the listener list, so a listener may subscribe or
//! unsubscribe others without disturbing the delivery in progress.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::debug;

/// Event name that matches every event.
pub const ALL: &str = "all";

/// An event that knows the name it is published under.
pub trait NamedEvent {
    fn name(&self) -> &'static str;
}

/// Handle returned by [`EventHub::on`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Rc<RefCell<dyn FnMut(&E)>>;

/// Registry of listeners keyed by event name.
pub struct EventHub<E> {
    listeners: HashMap<String, Vec<(SubscriptionId, Listener<E>)>>,
    next_id: u64,
}

impl<E: NamedEvent> EventHub<E> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
        }
    }

    /// Subscribe `listener` to each name in the space-separated `names`.
    pub fn on(&mut self, names: &str, listener: impl FnMut(&E) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let listener: Listener<E> = Rc::new(RefCell::new(listener));
        for name in names.split_whitespace() {
            self.listeners
                .entry(name.to_string())
                .or_default()
                .push((id, Rc::clone(&listener)));
        }
        id
    }

    /// Unsubscribe.
    ///
    /// With a name and an id, removes that subscription from that name;
    /// with only a name, clears the name; with only an id, removes the
    /// subscription everywhere; with neither, clears everything.
    pub fn off(&mut self, names: Option<&str>, id: Option<SubscriptionId>) {
        match (names, id) {
            (None, None) => self.listeners.clear(),
            (None, Some(id)) => {
                for list in self.listeners.values_mut() {
                    list.retain(|(sub, _)| *sub != id);
                }
            }
            (Some(names), id) => {
                for name in names.split_whitespace() {
                    match id {
                        Some(id) => {
                            if let Some(list) = self.listeners.get_mut(name) {
                                list.retain(|(sub, _)| *sub != id);
                            }
                        }
                        None => {
                            self.listeners.remove(name);
                        }
                    }
                }
            }
        }
        self.listeners.retain(|_, list| !list.is_empty());
    }

    /// Deliver `event` to its named listeners, then to `"all"` listeners.
    pub fn trigger(&self, event: &E) {
        let snapshot: Vec<Listener<E>> = [event.name(), ALL]
            .iter()
            .filter_map(|name| self.listeners.get(*name))
            .flatten()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in snapshot {
            // A listener that re-triggers an event it receives would borrow itself twice.
            let Ok(mut call) = listener.try_borrow_mut() else {
                debug!(event = event.name(), "listener busy, nested notification dropped");
                continue;
            };
            call(event);
        }
    }

    /// Number of subscriptions registered under `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }
}

impl<E: NamedEvent> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.listeners.keys().collect();
        names.sort();
        f.debug_struct("EventHub").field("names", &names).finish()
    }
}

/// Lifecycle notifications emitted by the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Play,
    Resume,
    Pause,
    Stop,
    Reset,
    /// A step is about to be dispatched.
    Action(usize),
    FastForward(bool),
}

impl NamedEvent for PlayerEvent {
    fn name(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Resume => "resume",
            Self::Pause => "pause",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Action(_) => "action",
            Self::FastForward(_) => "fastForward",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder(hub: &mut EventHub<PlayerEvent>, names: &str) -> (SubscriptionId, Rc<RefCell<Vec<PlayerEvent>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = hub.on(names, move |event| sink.borrow_mut().push(*event));
        (id, seen)
    }

    #[test]
    fn test_listener_receives_only_its_names() {
        let mut hub = EventHub::new();
        let (_, seen) = recorder(&mut hub, "play stop");
        hub.trigger(&PlayerEvent::Play);
        hub.trigger(&PlayerEvent::Pause);
        hub.trigger(&PlayerEvent::Stop);
        assert_eq!(*seen.borrow(), vec![PlayerEvent::Play, PlayerEvent::Stop]);
    }

    #[test]
    fn test_all_receives_every_event() {
        let mut hub = EventHub::new();
        let (_, seen) = recorder(&mut hub, ALL);
        hub.trigger(&PlayerEvent::Action(3));
        hub.trigger(&PlayerEvent::FastForward(true));
        assert_eq!(
            *seen.borrow(),
            vec![PlayerEvent::Action(3), PlayerEvent::FastForward(true)]
        );
    }

    #[test]
    fn test_off_by_id_removes_everywhere() {
        let mut hub = EventHub::new();
        let (id, seen) = recorder(&mut hub, "play pause");
        let (_, other) = recorder(&mut hub, "play");
        hub.off(None, Some(id));
        hub.trigger(&PlayerEvent::Play);
        hub.trigger(&PlayerEvent::Pause);
        assert!(seen.borrow().is_empty());
        assert_eq!(other.borrow().len(), 1);
        assert_eq!(hub.listener_count("pause"), 0);
    }

    #[test]
    fn test_off_by_name_and_id() {
        let mut hub = EventHub::new();
        let (id, seen) = recorder(&mut hub, "play pause");
        hub.off(Some("play"), Some(id));
        hub.trigger(&PlayerEvent::Play);
        hub.trigger(&PlayerEvent::Pause);
        assert_eq!(*seen.borrow(), vec![PlayerEvent::Pause]);
    }

    #[test]
    fn test_off_by_name_clears_name() {
        let mut hub = EventHub::new();
        recorder(&mut hub, "stop");
        recorder(&mut hub, "stop");
        assert_eq!(hub.listener_count("stop"), 2);
        hub.off(Some("stop"), None);
        assert_eq!(hub.listener_count("stop"), 0);
    }

    #[test]
    fn test_off_without_arguments_clears_everything() {
        let mut hub = EventHub::new();
        recorder(&mut hub, "play");
        recorder(&mut hub, ALL);
        hub.off(None, None);
        assert_eq!(hub.listener_count("play"), 0);
        assert_eq!(hub.listener_count(ALL), 0);
    }

    #[test]
    fn test_listener_is_not_reentered_by_its_own_trigger() {
        let hub_slot: Rc<RefCell<Option<Rc<EventHub<PlayerEvent>>>>> = Rc::new(RefCell::new(None));
        let mut hub = EventHub::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let inner = Rc::clone(&hub_slot);
        hub.on(ALL, move |event| {
            sink.borrow_mut().push(*event);
            if *event == PlayerEvent::Play {
                if let Some(hub) = inner.borrow().as_ref() {
                    hub.trigger(&PlayerEvent::Stop);
                }
            }
        });
        let (_, stops) = recorder(&mut hub, "stop");
        let hub = Rc::new(hub);
        *hub_slot.borrow_mut() = Some(Rc::clone(&hub));

        hub.trigger(&PlayerEvent::Play);
        assert_eq!(*seen.borrow(), vec![PlayerEvent::Play]);
        assert_eq!(*stops.borrow(), vec![PlayerEvent::Stop]);
        hub_slot.borrow_mut().take();
    }

    #[test]
    fn test_event_names() {
        assert_eq!(PlayerEvent::Action(0).name(), "action");
        assert_eq!(PlayerEvent::FastForward(false).name(), "fastForward");
        assert_eq!(PlayerEvent::Resume.name(), "resume");
    }
}
