//! Keeps Tab navigation inside a container.
//!
//! The focusable list is computed once, at install time. Tab on the last
//! element wraps to the first, Shift+Tab on the first wraps to the last; every
//! other key press falls through to the page's default handling.

use std::rc::Rc;

use crate::dom::NodeId;
use crate::event::{Event, ListenerId};
use crate::page::Page;
use crate::selector::SelectorList;
use crate::Result;

pub const FOCUSABLE_SELECTOR: &str =
    r#"button, [href], input, select, textarea, [tabindex]:not([tabindex="-1"])"#;

/// An installed focus trap. Dropping the handle does not uninstall it; call
/// [`FocusTrapHandle::release`].
#[derive(Debug)]
#[must_use = "a focus trap stays installed until released"]
pub struct FocusTrapHandle {
    container: NodeId,
    listener: Option<ListenerId>,
    first: Option<NodeId>,
    last: Option<NodeId>,
}

impl FocusTrapHandle {
    pub fn install(page: &mut Page, container: NodeId) -> Result<Self> {
        let selectors = SelectorList::parse(FOCUSABLE_SELECTOR)?;
        let focusable = page.dom.focusable_within(container, &selectors);
        let (Some(&first), Some(&last)) = (focusable.first(), focusable.last()) else {
            tracing::debug!(container = container.index(), "focus trap has nothing to trap");
            return Ok(Self {
                container,
                listener: None,
                first: None,
                last: None,
            });
        };

        let listener = page.add_listener(
            container,
            "keydown",
            false,
            Rc::new(move |page: &mut Page, event: &mut Event| {
                if !event.is_key("Tab") {
                    return Ok(());
                }
                let active = page.active_element();
                if event.shift_key && active == Some(first) {
                    event.prevent_default();
                    page.focus(last)?;
                } else if !event.shift_key && active == Some(last) {
                    event.prevent_default();
                    page.focus(first)?;
                }
                Ok(())
            }),
        )?;
        tracing::trace!(
            container = container.index(),
            focusable = focusable.len(),
            "focus trap installed"
        );

        Ok(Self {
            container,
            listener: Some(listener),
            first: Some(first),
            last: Some(last),
        })
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn first(&self) -> Option<NodeId> {
        self.first
    }

    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    /// False for the no-op trap installed over a container with nothing focusable.
    pub fn is_active(&self) -> bool {
        self.listener.is_some()
    }

    pub fn release(self, page: &mut Page) {
        if let Some(listener) = self.listener {
            page.remove_listener(listener);
            tracing::trace!(container = self.container.index(), "focus trap released");
        }
    }
}
