use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::dom::NodeId;
use crate::page::Page;
use crate::Result;

/// Listener callback. Handlers get the page back so they can mutate it and
/// dispatch further events.
pub type EventHandler = Rc<dyn Fn(&mut Page, &mut Event) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

/// An event in flight.
#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub target: NodeId,
    pub current_target: NodeId,
    /// `KeyboardEvent.key` for keydown.
    pub key: Option<String>,
    pub shift_key: bool,
    /// Set for intersection notifications.
    pub is_intersecting: Option<bool>,
    pub bubbles: bool,
    pub default_prevented: bool,
    pub propagation_stopped: bool,
    pub immediate_propagation_stopped: bool,
}

impl Event {
    pub fn new(event_type: &str, target: NodeId) -> Self {
        Self {
            event_type: event_type.to_string(),
            target,
            current_target: target,
            key: None,
            shift_key: false,
            is_intersecting: None,
            bubbles: bubbles_by_default(event_type),
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
        }
    }

    pub fn key_down(target: NodeId, key: &str, shift_key: bool) -> Self {
        let mut event = Self::new("keydown", target);
        event.key = Some(key.to_string());
        event.shift_key = shift_key;
        event
    }

    pub fn intersection(target: NodeId, is_intersecting: bool) -> Self {
        let mut event = Self::new("intersection", target);
        event.is_intersecting = Some(is_intersecting);
        event
    }

    pub fn is_key(&self, key: &str) -> bool {
        self.key.as_deref() == Some(key)
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }
}

fn bubbles_by_default(event_type: &str) -> bool {
    !matches!(
        event_type,
        "focus" | "blur" | "mouseenter" | "mouseleave" | "intersection"
    )
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) capture: bool,
    pub(crate) handler: EventHandler,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
pub(crate) struct ListenerStore {
    map: HashMap<NodeId, HashMap<String, Vec<Listener>>>,
    locations: HashMap<ListenerId, (NodeId, String)>,
    next_id: u64,
}

impl ListenerStore {
    pub(crate) fn add(
        &mut self,
        node_id: NodeId,
        event: &str,
        capture: bool,
        handler: EventHandler,
    ) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.map
            .entry(node_id)
            .or_default()
            .entry(event.to_string())
            .or_default()
            .push(Listener {
                id,
                capture,
                handler,
            });
        self.locations.insert(id, (node_id, event.to_string()));
        id
    }

    pub(crate) fn remove(&mut self, id: ListenerId) -> bool {
        let Some((node_id, event)) = self.locations.remove(&id) else {
            return false;
        };
        let Some(events) = self.map.get_mut(&node_id) else {
            return false;
        };
        let Some(listeners) = events.get_mut(&event) else {
            return false;
        };

        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        let removed = listeners.len() != before;
        if listeners.is_empty() {
            events.remove(&event);
        }
        if events.is_empty() {
            self.map.remove(&node_id);
        }
        removed
    }

    pub(crate) fn contains(&self, id: ListenerId) -> bool {
        self.locations.contains_key(&id)
    }

    pub(crate) fn get(&self, node_id: NodeId, event: &str, capture: bool) -> Vec<Listener> {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map(|listeners| {
                listeners
                    .iter()
                    .filter(|listener| listener.capture == capture)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn count(&self, node_id: NodeId, event: &str) -> usize {
        self.map
            .get(&node_id)
            .and_then(|events| events.get(event))
            .map_or(0, Vec::len)
    }

    pub(crate) fn len(&self) -> usize {
        self.locations.len()
    }
}

/// Listeners registered together and removed together.
#[derive(Debug, Default)]
pub struct ListenerGroup {
    ids: Vec<ListenerId>,
}

impl ListenerGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        page: &mut Page,
        node: NodeId,
        event_type: &str,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        let id = page.add_listener(node, event_type, false, handler)?;
        self.ids.push(id);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Removes every listener in the group; returns how many were still live.
    pub fn remove_all(&mut self, page: &mut Page) -> usize {
        self.ids
            .drain(..)
            .filter(|id| page.remove_listener(*id))
            .count()
    }
}

impl Page {
    pub(crate) fn dispatch_event(&mut self, event: Event) -> Result<Event> {
        stacker::maybe_grow(64 * 1024, 2 * 1024 * 1024, || self.dispatch_event_impl(event))
    }

    fn dispatch_event_impl(&mut self, mut event: Event) -> Result<Event> {
        let target = event.target;
        let mut path = Vec::new();
        let mut cursor = Some(target);
        while let Some(node) = cursor {
            path.push(node);
            cursor = self.dom.parent(node);
        }
        path.reverse();

        // Capture phase.
        for node in &path[..path.len() - 1] {
            event.current_target = *node;
            self.invoke_listeners(*node, &mut event, true)?;
            if event.propagation_stopped {
                self.trace_event_done(&event, "propagation_stopped");
                return Ok(event);
            }
        }

        // Target phase: capture listeners first.
        event.current_target = target;
        self.invoke_listeners(target, &mut event, true)?;
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }
        self.invoke_listeners(target, &mut event, false)?;
        if event.propagation_stopped {
            self.trace_event_done(&event, "propagation_stopped");
            return Ok(event);
        }

        // Bubble phase.
        if event.bubbles {
            for node in path[..path.len() - 1].iter().rev() {
                event.current_target = *node;
                self.invoke_listeners(*node, &mut event, false)?;
                if event.propagation_stopped {
                    self.trace_event_done(&event, "propagation_stopped");
                    return Ok(event);
                }
            }
        }

        self.trace_event_done(&event, "completed");
        Ok(event)
    }

    fn invoke_listeners(&mut self, node_id: NodeId, event: &mut Event, capture: bool) -> Result<()> {
        let listeners = self.listeners.get(node_id, &event.event_type, capture);
        for listener in listeners {
            // Removed by an earlier listener of this same dispatch.
            if !self.listeners.contains(listener.id) {
                continue;
            }
            if self.trace {
                let phase = if capture { "capture" } else { "bubble" };
                let target_label = self.trace_node_label(event.target);
                let current_label = self.trace_node_label(event.current_target);
                self.trace_event_line(format!(
                    "[event] {} target={} current={} phase={} default_prevented={}",
                    event.event_type, target_label, current_label, phase, event.default_prevented
                ));
            }
            (listener.handler)(self, event)?;
            if event.immediate_propagation_stopped {
                break;
            }
        }
        Ok(())
    }

    fn trace_event_done(&mut self, event: &Event, outcome: &str) {
        if !self.trace {
            return;
        }
        let target_label = self.trace_node_label(event.target);
        self.trace_event_line(format!(
            "[event] done {} target={} outcome={} default_prevented={}",
            event.event_type, target_label, outcome, event.default_prevented
        ));
    }
}
