//! Topic subscription bookkeeping.
//!
//! All toggles share the session's single registry, which is what enforces
//! the at-most-one-live-handle-per-topic invariant. Registry mutation happens
//! synchronously within one event-loop turn; there is no window between
//! "check subscribed" and "set subscribed".

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use nodeview_core::Topic;
use serde_json::Value;
use tokio::sync::Notify;

use crate::connection::SessionShared;
use crate::frame::Frame;

/// Payload of one topic message.
///
/// The backend usually sends JSON; the system log topic sends raw lines. A
/// body starting with `{` or `[` is parsed, anything else is passed through
/// as text.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageBody {
    /// A decoded JSON document.
    Json(Value),
    /// A raw text payload.
    Text(String),
}

impl MessageBody {
    pub(crate) fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_start();
        if trimmed.starts_with('{') || trimmed.starts_with('[') {
            if let Ok(value) = serde_json::from_str(raw) {
                return MessageBody::Json(value);
            }
        }
        MessageBody::Text(raw.to_string())
    }
}

pub(crate) type MessageCallback = Rc<dyn Fn(MessageBody)>;
pub(crate) type InitCallback = Rc<dyn Fn()>;

pub(crate) struct SubscriptionEntry {
    /// Last state requested while connected; drives re-materialization.
    pub(crate) desired: bool,
    /// Live subscription id, absent when not subscribed.
    pub(crate) handle: Option<u64>,
    pub(crate) on_message: MessageCallback,
    pub(crate) on_first_subscribe: Option<InitCallback>,
}

/// Per-topic subscription table shared by every toggle of one session.
pub(crate) struct Registry {
    pub(crate) entries: HashMap<Topic, SubscriptionEntry>,
    next_handle: u64,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_handle: 1,
        }
    }

    pub(crate) fn allocate_handle(&mut self) -> u64 {
        let handle = self.next_handle;
        self.next_handle += 1;
        handle
    }

    /// Invalidate every live handle without emitting UNSUBSCRIBE frames.
    ///
    /// Called on connection loss: the transport already tore the
    /// subscriptions down. Desired states survive for re-materialization.
    pub(crate) fn clear_handles(&mut self) {
        for entry in self.entries.values_mut() {
            entry.handle = None;
        }
    }

    /// Topics whose desired state is subscribed.
    pub(crate) fn desired_topics(&self) -> Vec<Topic> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.desired)
            .map(|(topic, _)| *topic)
            .collect()
    }
}

/// Connects one topic's UI-visibility state to its subscription.
///
/// Created by `StompSession::make_toggle`. Call [`SubscriptionToggle::set`]
/// whenever the desired visibility changes; the toggle applies the change
/// only when it is a real transition and the session is connected.
#[derive(Clone)]
pub struct SubscriptionToggle {
    shared: Rc<RefCell<SessionShared>>,
    outbound_notify: Rc<Notify>,
    topic: Topic,
}

impl SubscriptionToggle {
    pub(crate) fn new(
        shared: Rc<RefCell<SessionShared>>,
        outbound_notify: Rc<Notify>,
        topic: Topic,
    ) -> Self {
        Self {
            shared,
            outbound_notify,
            topic,
        }
    }

    /// The topic this toggle manages.
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Apply the desired subscription state.
    ///
    /// No-op when the state already matches, and no-op while disconnected:
    /// the desired state is simply not applied, and the caller is expected
    /// to set it again once connected (the session does this automatically
    /// for states it has seen).
    pub fn set(&self, should_be_subscribed: bool) {
        if should_be_subscribed {
            apply_subscribe(&self.shared, &self.outbound_notify, self.topic);
        } else {
            apply_unsubscribe(&self.shared, &self.outbound_notify, self.topic);
        }
    }

    /// Whether a live subscription currently exists for this topic.
    pub fn is_subscribed(&self) -> bool {
        self.shared
            .borrow()
            .registry
            .entries
            .get(&self.topic)
            .is_some_and(|entry| entry.handle.is_some())
    }
}

/// Subscribe `topic` if connected and not already subscribed.
///
/// Runs the topic's init callback (snapshot request) before the SUBSCRIBE
/// goes out, matching the order the backend expects.
pub(crate) fn apply_subscribe(
    shared: &Rc<RefCell<SessionShared>>,
    outbound_notify: &Rc<Notify>,
    topic: Topic,
) {
    let init = {
        let state = shared.borrow();
        if !state.connected {
            return;
        }
        let Some(entry) = state.registry.entries.get(&topic) else {
            return;
        };
        if entry.handle.is_some() {
            return;
        }
        entry.on_first_subscribe.clone()
    };

    // The callback may queue frames or toggle subscriptions itself, so no
    // borrow is held across it.
    if let Some(init) = init {
        init();
    }

    {
        let mut state = shared.borrow_mut();
        if !state.connected {
            return;
        }
        if state
            .registry
            .entries
            .get(&topic)
            .map_or(true, |entry| entry.handle.is_some())
        {
            return;
        }
        let handle = state.registry.allocate_handle();
        if let Some(entry) = state.registry.entries.get_mut(&topic) {
            entry.desired = true;
            entry.handle = Some(handle);
        }
        state
            .outbound
            .push_back(Frame::subscribe(handle, topic.destination()));
        tracing::debug!(topic = %topic, handle, "subscribing");
    }
    outbound_notify.notify_one();
}

/// Unsubscribe `topic` if connected and currently subscribed.
pub(crate) fn apply_unsubscribe(
    shared: &Rc<RefCell<SessionShared>>,
    outbound_notify: &Rc<Notify>,
    topic: Topic,
) {
    {
        let mut state = shared.borrow_mut();
        if !state.connected {
            return;
        }
        let Some(entry) = state.registry.entries.get_mut(&topic) else {
            return;
        };
        let Some(handle) = entry.handle.take() else {
            return;
        };
        entry.desired = false;
        state.outbound.push_back(Frame::unsubscribe(handle));
        tracing::debug!(topic = %topic, handle, "unsubscribing");
    }
    outbound_notify.notify_one();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameCommand;
    use serde_json::json;

    fn test_shared(connected: bool) -> Rc<RefCell<SessionShared>> {
        let shared = SessionShared::new_shared();
        shared.borrow_mut().connected = connected;
        shared
    }

    fn register(shared: &Rc<RefCell<SessionShared>>, topic: Topic) {
        shared.borrow_mut().registry.entries.insert(
            topic,
            SubscriptionEntry {
                desired: false,
                handle: None,
                on_message: Rc::new(|_| {}),
                on_first_subscribe: None,
            },
        );
    }

    fn toggle(shared: &Rc<RefCell<SessionShared>>, topic: Topic) -> SubscriptionToggle {
        SubscriptionToggle::new(shared.clone(), Rc::new(Notify::new()), topic)
    }

    #[test]
    fn set_true_while_disconnected_is_a_no_op() {
        let shared = test_shared(false);
        register(&shared, Topic::Peers);
        let toggle = toggle(&shared, Topic::Peers);

        toggle.set(true);

        assert!(!toggle.is_subscribed());
        assert!(shared.borrow().outbound.is_empty());
        // Desired state was not applied either.
        assert!(!shared.borrow().registry.entries[&Topic::Peers].desired);
    }

    #[test]
    fn set_true_twice_subscribes_once() {
        let shared = test_shared(true);
        register(&shared, Topic::Peers);
        let toggle = toggle(&shared, Topic::Peers);

        toggle.set(true);
        toggle.set(true);

        assert!(toggle.is_subscribed());
        let outbound = &shared.borrow().outbound;
        assert_eq!(outbound.len(), 1);
        assert_eq!(outbound[0].command, FrameCommand::Subscribe);
    }

    #[test]
    fn set_false_twice_unsubscribes_once() {
        let shared = test_shared(true);
        register(&shared, Topic::Peers);
        let toggle = toggle(&shared, Topic::Peers);

        toggle.set(true);
        toggle.set(false);
        toggle.set(false);

        assert!(!toggle.is_subscribed());
        let outbound = &shared.borrow().outbound;
        assert_eq!(outbound.len(), 2);
        assert_eq!(outbound[1].command, FrameCommand::Unsubscribe);
    }

    #[test]
    fn init_callback_runs_before_subscribe_is_queued() {
        let shared = test_shared(true);
        let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
        let seen = order.clone();
        shared.borrow_mut().registry.entries.insert(
            Topic::MachineInfo,
            SubscriptionEntry {
                desired: false,
                handle: None,
                on_message: Rc::new(|_| {}),
                on_first_subscribe: Some(Rc::new(move || seen.borrow_mut().push("init"))),
            },
        );
        let toggle = toggle(&shared, Topic::MachineInfo);

        toggle.set(true);

        assert_eq!(*order.borrow(), vec!["init"]);
        assert_eq!(shared.borrow().outbound.len(), 1);
    }

    #[test]
    fn two_topics_hold_independent_handles() {
        let shared = test_shared(true);
        register(&shared, Topic::Peers);
        register(&shared, Topic::SystemLog);
        let peers = toggle(&shared, Topic::Peers);
        let logs = toggle(&shared, Topic::SystemLog);

        peers.set(true);
        logs.set(true);

        let state = shared.borrow();
        let h1 = state.registry.entries[&Topic::Peers].handle;
        let h2 = state.registry.entries[&Topic::SystemLog].handle;
        assert!(h1.is_some());
        assert!(h2.is_some());
        assert_ne!(h1, h2);
    }

    #[test]
    fn clear_handles_keeps_desired_state_and_sends_nothing() {
        let shared = test_shared(true);
        register(&shared, Topic::Peers);
        let toggle = toggle(&shared, Topic::Peers);
        toggle.set(true);
        shared.borrow_mut().outbound.clear();

        shared.borrow_mut().registry.clear_handles();

        let state = shared.borrow();
        assert!(state.registry.entries[&Topic::Peers].handle.is_none());
        assert!(state.registry.entries[&Topic::Peers].desired);
        assert!(state.outbound.is_empty());
    }

    #[test]
    fn message_body_json_detection() {
        assert_eq!(
            MessageBody::parse(r#"{"cpuUsage":1.5}"#),
            MessageBody::Json(json!({"cpuUsage": 1.5}))
        );
        assert_eq!(
            MessageBody::parse("[1,2]"),
            MessageBody::Json(json!([1, 2]))
        );
        assert_eq!(
            MessageBody::parse("INFO block imported"),
            MessageBody::Text("INFO block imported".to_string())
        );
        // Looks like JSON but is not: passed through as text.
        assert_eq!(
            MessageBody::parse("{not json"),
            MessageBody::Text("{not json".to_string())
        );
    }
}
