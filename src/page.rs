use std::collections::VecDeque;

use crate::dom::{Dom, NodeId};
use crate::event::{Event, EventHandler, ListenerId, ListenerStore};
use crate::focus_trap::FOCUSABLE_SELECTOR;
use crate::html::parse_html;
use crate::selector::SelectorList;
use crate::timer::TimerQueue;
use crate::{Error, Result};

/// Deterministic page model components are mounted on.
///
/// Holds the DOM, registered listeners, the focused element and a fake clock.
/// User actions (`click`, `press_key`, `hover`, ...) dispatch events the way a
/// browser would, including default actions such as Tab navigation.
#[derive(Debug)]
pub struct Page {
    pub(crate) dom: Dom,
    pub(crate) listeners: ListenerStore,
    pub(crate) timers: TimerQueue,
    active_element: Option<NodeId>,
    pub(crate) trace: bool,
    trace_events: bool,
    trace_timers: bool,
    trace_logs: VecDeque<String>,
    trace_log_limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

impl Page {
    pub fn new() -> Self {
        Self::with_dom(Dom::new())
    }

    pub fn from_html(html: &str) -> Result<Self> {
        Ok(Self::with_dom(parse_html(html)?))
    }

    fn with_dom(dom: Dom) -> Self {
        Self {
            dom,
            listeners: ListenerStore::default(),
            timers: TimerQueue::default(),
            active_element: None,
            trace: false,
            trace_events: true,
            trace_timers: true,
            trace_logs: VecDeque::new(),
            trace_log_limit: 10_000,
        }
    }

    // --- tree ---------------------------------------------------------------

    pub fn document(&self) -> NodeId {
        self.dom.root()
    }

    /// `<body>` when the markup has one, the document otherwise.
    pub fn body(&self) -> NodeId {
        let root = self.dom.root();
        self.dom
            .descendants(root)
            .find(|node| self.dom.tag_name(*node) == Some("body"))
            .unwrap_or(root)
    }

    pub fn select(&self, selector: &str) -> Result<Option<NodeId>> {
        let selectors = SelectorList::parse(selector)?;
        let first = self.dom.select(self.dom.root(), &selectors).next();
        Ok(first)
    }

    pub fn select_required(&self, selector: &str) -> Result<NodeId> {
        self.select(selector)?
            .ok_or_else(|| Error::SelectorNotFound(selector.to_string()))
    }

    pub fn select_all(&self, selector: &str) -> Result<Vec<NodeId>> {
        self.select_within(self.dom.root(), selector)
    }

    /// Descendants of `root` matching `selector`, in document order.
    pub fn select_within(&self, root: NodeId, selector: &str) -> Result<Vec<NodeId>> {
        let selectors = SelectorList::parse(selector)?;
        let found = self.dom.select(root, &selectors).collect();
        Ok(found)
    }

    /// Like [`Page::select_within`], first match only.
    pub fn select_first_within(&self, root: NodeId, selector: &str) -> Result<Option<NodeId>> {
        let selectors = SelectorList::parse(selector)?;
        let first = self.dom.select(root, &selectors).next();
        Ok(first)
    }

    pub fn matches(&self, node: NodeId, selector: &str) -> Result<bool> {
        Ok(SelectorList::parse(selector)?.matches(&self.dom, node))
    }

    pub fn closest(&self, node: NodeId, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.dom.closest(node, &SelectorList::parse(selector)?))
    }

    pub fn is_element(&self, node: NodeId) -> bool {
        self.dom.element(node).is_some()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<&str> {
        self.dom.tag_name(node)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.dom.parent(node)
    }

    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        ancestor == node || self.dom.is_descendant_of(node, ancestor)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        self.dom.is_connected(node)
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.dom.create_element(tag_name)
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.dom.append_child(parent, child)
    }

    /// Detaches `node`. Focus inside the removed subtree is dropped.
    pub fn remove_node(&mut self, node: NodeId) -> Result<()> {
        if node == self.dom.root() {
            return Err(Error::InvalidNode("cannot remove the document".into()));
        }
        self.dom.detach(node);
        if let Some(active) = self.active_element {
            if !self.dom.is_connected(active) {
                self.active_element = None;
            }
        }
        Ok(())
    }

    // --- content ------------------------------------------------------------

    pub fn text(&self, node: NodeId) -> String {
        self.dom.text_content(node)
    }

    pub fn set_text(&mut self, node: NodeId, value: &str) -> Result<()> {
        self.dom.set_text_content(node, value)
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.dom.attr(node, name)
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) -> Result<()> {
        self.dom.set_attr(node, name, value)
    }

    pub fn has_class(&self, node: NodeId, class_name: &str) -> bool {
        self.dom.has_class(node, class_name)
    }

    pub fn add_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.add_class(node, class_name)
    }

    pub fn remove_class(&mut self, node: NodeId, class_name: &str) -> Result<()> {
        self.dom.remove_class(node, class_name)
    }

    /// Inline style lookup; accepts `animationPlayState` or `animation-play-state`.
    pub fn style(&self, node: NodeId, property: &str) -> Result<String> {
        self.dom.style(node, property)
    }

    pub fn set_style(&mut self, node: NodeId, property: &str, value: &str) -> Result<()> {
        self.dom.set_style(node, property, value)
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.dom.disabled(node)
    }

    pub fn dump_dom(&self, selector: &str) -> Result<String> {
        let target = self.select_required(selector)?;
        Ok(self.dom.outer_html(target))
    }

    pub fn dump_node(&self, node: NodeId) -> String {
        self.dom.outer_html(node)
    }

    // --- listeners ----------------------------------------------------------

    pub fn add_listener(
        &mut self,
        node: NodeId,
        event_type: &str,
        capture: bool,
        handler: EventHandler,
    ) -> Result<ListenerId> {
        if !self.dom.is_valid_node(node) {
            return Err(Error::InvalidNode(format!(
                "cannot listen on unknown node {}",
                node.index()
            )));
        }
        Ok(self.listeners.add(node, event_type, capture, handler))
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self, node: NodeId, event_type: &str) -> usize {
        self.listeners.count(node, event_type)
    }

    pub fn total_listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Dispatches a synthetic event and returns it after all phases ran.
    pub fn dispatch(&mut self, event: Event) -> Result<Event> {
        if !self.dom.is_valid_node(event.target) {
            return Err(Error::InvalidNode(format!(
                "cannot dispatch to unknown node {}",
                event.target.index()
            )));
        }
        self.dispatch_event(event)
    }

    // --- focus --------------------------------------------------------------

    pub fn active_element(&self) -> Option<NodeId> {
        self.active_element
    }

    /// Moves focus to `node`. Disabled, detached or non-element nodes are
    /// ignored, as a browser ignores `focus()` on them.
    pub fn focus(&mut self, node: NodeId) -> Result<()> {
        if !self.is_element(node) || self.dom.disabled(node) || !self.dom.is_connected(node) {
            return Ok(());
        }
        if self.active_element == Some(node) {
            return Ok(());
        }
        if let Some(current) = self.active_element {
            self.blur(current)?;
        }

        self.active_element = Some(node);
        self.dispatch_event(Event::new("focusin", node))?;
        self.dispatch_event(Event::new("focus", node))?;
        Ok(())
    }

    pub fn blur(&mut self, node: NodeId) -> Result<()> {
        if self.active_element != Some(node) {
            return Ok(());
        }
        self.dispatch_event(Event::new("focusout", node))?;
        self.dispatch_event(Event::new("blur", node))?;
        self.active_element = None;
        Ok(())
    }

    // --- user actions -------------------------------------------------------

    pub fn click(&mut self, selector: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        self.click_node(target)
    }

    pub fn click_node(&mut self, target: NodeId) -> Result<()> {
        if self.dom.disabled(target) {
            return Ok(());
        }
        self.dispatch(Event::new("click", target))?;
        Ok(())
    }

    /// Sends a keydown to the focused element (or `<body>`). An unprevented
    /// Tab moves focus through the document's focusable elements.
    pub fn press_key(&mut self, key: &str, shift_key: bool) -> Result<Event> {
        let target = self
            .active_element
            .filter(|node| self.dom.is_connected(*node))
            .unwrap_or_else(|| self.body());
        let event = self.dispatch_event(Event::key_down(target, key, shift_key))?;
        if key == "Tab" && !event.default_prevented {
            self.sequential_focus(shift_key)?;
        }
        Ok(event)
    }

    fn sequential_focus(&mut self, backwards: bool) -> Result<()> {
        let focusable = SelectorList::parse(FOCUSABLE_SELECTOR)?;
        let order = self.dom.focusable_within(self.dom.root(), &focusable);
        if order.is_empty() {
            return Ok(());
        }
        let position = self
            .active_element
            .and_then(|active| order.iter().position(|node| *node == active));
        let next = match (position, backwards) {
            (None, false) => 0,
            (None, true) => order.len() - 1,
            (Some(pos), false) => (pos + 1) % order.len(),
            (Some(pos), true) => (pos + order.len() - 1) % order.len(),
        };
        self.focus(order[next])
    }

    pub fn hover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        self.dispatch(Event::new("mouseenter", target))?;
        Ok(())
    }

    pub fn unhover(&mut self, selector: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        self.dispatch(Event::new("mouseleave", target))?;
        Ok(())
    }

    /// Reports a viewport intersection change for the element.
    pub fn set_intersecting(&mut self, selector: &str, is_intersecting: bool) -> Result<()> {
        let target = self.select_required(selector)?;
        self.dispatch(Event::intersection(target, is_intersecting))?;
        Ok(())
    }

    /// Fires the end of one CSS animation loop on the element.
    pub fn animation_iteration(&mut self, selector: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        self.dispatch(Event::new("animationiteration", target))?;
        Ok(())
    }

    // --- assertions ---------------------------------------------------------

    pub fn assert_text(&self, selector: &str, expected: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        let actual = self.dom.text_content(target);
        if actual != expected {
            return Err(self.assertion_failed(selector, target, expected, &actual));
        }
        Ok(())
    }

    pub fn assert_attr(&self, selector: &str, name: &str, expected: Option<&str>) -> Result<()> {
        let target = self.select_required(selector)?;
        let actual = self.dom.attr(target, name);
        if actual.as_deref() != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!("{name}={expected:?}"),
                &format!("{name}={actual:?}"),
            ));
        }
        Ok(())
    }

    pub fn assert_class(&self, selector: &str, class_name: &str, expected: bool) -> Result<()> {
        let target = self.select_required(selector)?;
        let actual = self.dom.has_class(target, class_name);
        if actual != expected {
            return Err(self.assertion_failed(
                selector,
                target,
                &format!(".{class_name}={expected}"),
                &format!(".{class_name}={actual}"),
            ));
        }
        Ok(())
    }

    pub fn assert_focused(&self, selector: &str) -> Result<()> {
        let target = self.select_required(selector)?;
        if self.active_element != Some(target) {
            let actual = self
                .active_element
                .map(|node| self.trace_node_label(node))
                .unwrap_or_else(|| "none".into());
            return Err(self.assertion_failed(selector, target, "focused", &actual));
        }
        Ok(())
    }

    fn assertion_failed(&self, selector: &str, target: NodeId, expected: &str, actual: &str) -> Error {
        Error::AssertionFailed {
            selector: selector.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            dom_snippet: snippet(&self.dom.outer_html(target), 200),
        }
    }

    // --- trace --------------------------------------------------------------

    pub fn enable_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    pub fn set_trace_events(&mut self, enabled: bool) {
        self.trace_events = enabled;
    }

    pub fn set_trace_timers(&mut self, enabled: bool) {
        self.trace_timers = enabled;
    }

    pub fn set_trace_log_limit(&mut self, max_entries: usize) -> Result<()> {
        if max_entries == 0 {
            return Err(Error::InvalidConfig(
                "set_trace_log_limit requires at least 1 entry".into(),
            ));
        }
        self.trace_log_limit = max_entries;
        if self.trace_logs.len() > max_entries {
            let excess = self.trace_logs.len() - max_entries;
            self.trace_logs.drain(..excess);
        }
        Ok(())
    }

    pub fn take_trace_logs(&mut self) -> Vec<String> {
        self.trace_logs.drain(..).collect()
    }

    pub(crate) fn trace_event_line(&mut self, line: String) {
        if self.trace && self.trace_events {
            self.trace_line(line);
        }
    }

    pub(crate) fn trace_timer_line(&mut self, line: String) {
        if self.trace && self.trace_timers {
            self.trace_line(line);
        }
    }

    fn trace_line(&mut self, line: String) {
        tracing::trace!(target: "site_widgets::page", "{line}");
        if self.trace_logs.len() >= self.trace_log_limit {
            self.trace_logs.pop_front();
        }
        self.trace_logs.push_back(line);
    }

    pub(crate) fn trace_node_label(&self, node: NodeId) -> String {
        if let Some(id) = self.dom.attr(node, "id").filter(|id| !id.is_empty()) {
            return format!("#{id}");
        }
        self.dom
            .tag_name(node)
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("node-{}", node.index()))
    }
}

/// First `max_chars` characters of `html`, with `...` when cut.
fn snippet(html: &str, max_chars: usize) -> String {
    match html.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &html[..cut]),
        None => html.to_string(),
    }
}
