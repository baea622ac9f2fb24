//! Modal image viewer for a gallery.
//!
//! A single delegated click listener on the gallery scope opens the modal for
//! whichever `<img>` was clicked, so images added after mount work too. The
//! modal closes from its close button, from a click on the bare overlay, or
//! from Escape anywhere on the page.

use std::cell::RefCell;
use std::rc::Rc;

use crate::config::Config;
use crate::dom::NodeId;
use crate::event::{Event, ListenerGroup};
use crate::focus_trap::FocusTrapHandle;
use crate::page::Page;
use crate::{Error, Result};

/// The modal's parts. Inject one to reuse existing markup; otherwise
/// [`Lightbox::mount`] builds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightboxModal {
    pub overlay: NodeId,
    pub close: NodeId,
    pub image: NodeId,
    pub caption: NodeId,
}

impl LightboxModal {
    /// Rejects an injected modal whose parts are not elements of this page.
    fn check(&self, page: &Page) -> Result<()> {
        let parts = [
            ("overlay", self.overlay),
            ("close", self.close),
            ("image", self.image),
            ("caption", self.caption),
        ];
        for (part, node) in parts {
            if !page.is_element(node) {
                return Err(Error::InvalidNode(format!(
                    "lightbox {part} is not an element: node {}",
                    node.index()
                )));
            }
        }
        Ok(())
    }

    /// Builds the default modal and appends it to `<body>`.
    fn build(page: &mut Page) -> Result<Self> {
        let overlay = page.create_element("div");
        page.set_attr(overlay, "class", "lightbox-modal")?;
        page.set_attr(overlay, "role", "dialog")?;
        page.set_attr(overlay, "aria-modal", "true")?;
        page.set_attr(overlay, "aria-hidden", "true")?;

        let close = page.create_element("button");
        page.set_attr(close, "class", "lightbox-close")?;
        page.set_attr(close, "aria-label", "Close")?;
        page.set_text(close, "×")?;

        let image = page.create_element("img");
        page.set_attr(image, "class", "lightbox-image")?;
        page.set_attr(image, "alt", "")?;
        page.set_attr(image, "aria-hidden", "true")?;

        let caption = page.create_element("div");
        page.set_attr(caption, "class", "lightbox-caption")?;

        for child in [close, image, caption] {
            page.append_child(overlay, child)?;
        }
        let body = page.body();
        page.append_child(body, overlay)?;

        Ok(Self {
            overlay,
            close,
            image,
            caption,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightboxState {
    pub is_open: bool,
    pub current_image: Option<NodeId>,
    /// Element focused before the modal opened. Not owned.
    pub previously_focused: Option<NodeId>,
}

#[derive(Debug)]
struct Shared {
    modal: LightboxModal,
    focus_trap_enabled: bool,
    state: RefCell<LightboxState>,
    trap: RefCell<Option<FocusTrapHandle>>,
}

fn image_source(page: &Page, image: NodeId) -> Option<String> {
    page.attr(image, "src").filter(|src| !src.is_empty())
}

fn caption_for(page: &Page, image: NodeId) -> String {
    ["data-caption", "alt"]
        .into_iter()
        .filter_map(|name| page.attr(image, name))
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

impl Shared {
    fn open(&self, page: &mut Page, image: NodeId) -> Result<()> {
        let Some(src) = image_source(page, image) else {
            return Err(Error::MissingImageSource(page.dump_node(image)));
        };
        let caption = caption_for(page, image);
        let modal = self.modal;

        page.set_attr(modal.image, "src", &src)?;
        page.set_text(modal.caption, &caption)?;
        page.set_attr(modal.image, "aria-hidden", "false")?;
        page.set_attr(modal.overlay, "aria-hidden", "false")?;
        page.add_class(modal.overlay, "show")?;

        let reopened = {
            let mut state = self.state.borrow_mut();
            let reopened = state.is_open;
            if !reopened {
                state.previously_focused = page.active_element();
            }
            state.is_open = true;
            state.current_image = Some(image);
            reopened
        };

        if !reopened && self.focus_trap_enabled {
            let trap = FocusTrapHandle::install(page, modal.overlay)?;
            if let Some(stale) = self.trap.borrow_mut().replace(trap) {
                stale.release(page);
            }
        }
        tracing::trace!(image = image.index(), reopened, "lightbox opened");

        page.focus(modal.close)
    }

    fn close(&self, page: &mut Page) -> Result<()> {
        let restore = {
            let mut state = self.state.borrow_mut();
            if !state.is_open {
                return Ok(());
            }
            state.is_open = false;
            state.current_image = None;
            state.previously_focused.take()
        };
        let modal = self.modal;

        page.set_attr(modal.image, "src", "")?;
        page.set_attr(modal.image, "aria-hidden", "true")?;
        page.set_attr(modal.overlay, "aria-hidden", "true")?;
        page.remove_class(modal.overlay, "show")?;

        let trap = self.trap.borrow_mut().take();
        if let Some(trap) = trap {
            trap.release(page);
        }
        tracing::trace!("lightbox closed");

        match restore {
            Some(opener) if page.is_connected(opener) => {
                if let Err(err) = page.focus(opener) {
                    tracing::debug!(%err, "focus restoration failed");
                }
            }
            Some(opener) => {
                tracing::debug!(
                    opener = opener.index(),
                    "opener left the document; focus not restored"
                );
            }
            None => {}
        }
        Ok(())
    }
}

/// Gallery delegation, close button, bare-overlay click and document Escape.
fn wire_listeners(
    page: &mut Page,
    shared: &Rc<Shared>,
    scope: NodeId,
    listeners: &mut ListenerGroup,
) -> Result<()> {
    let on_gallery = Rc::clone(shared);
    listeners.add(
        page,
        scope,
        "click",
        Rc::new(move |page: &mut Page, event: &mut Event| {
            let Some(image) = page.closest(event.target, "img")? else {
                return Ok(());
            };
            if page.contains(on_gallery.modal.overlay, image) {
                return Ok(());
            }
            if image_source(page, image).is_none() {
                tracing::debug!(image = image.index(), "gallery image has no source");
                return Ok(());
            }
            on_gallery.open(page, image)
        }),
    )?;

    let on_close = Rc::clone(shared);
    listeners.add(
        page,
        shared.modal.close,
        "click",
        Rc::new(move |page: &mut Page, _: &mut Event| on_close.close(page)),
    )?;

    let on_overlay = Rc::clone(shared);
    listeners.add(
        page,
        shared.modal.overlay,
        "click",
        Rc::new(move |page: &mut Page, event: &mut Event| {
            if event.target != on_overlay.modal.overlay {
                return Ok(());
            }
            on_overlay.close(page)
        }),
    )?;

    let on_escape = Rc::clone(shared);
    let document = page.document();
    listeners.add(
        page,
        document,
        "keydown",
        Rc::new(move |page: &mut Page, event: &mut Event| {
            if !event.is_key("Escape") || !on_escape.state.borrow().is_open {
                return Ok(());
            }
            on_escape.close(page)
        }),
    )?;
    Ok(())
}

/// A mounted lightbox.
#[derive(Debug)]
pub struct Lightbox {
    shared: Rc<Shared>,
    scope: NodeId,
    listeners: ListenerGroup,
    built_modal: bool,
}

impl Lightbox {
    /// Wires the lightbox to `scope`. Returns `Ok(None)` without touching the
    /// page when the scope is absent or not an element. An injected modal
    /// whose parts are not elements is rejected before anything is wired.
    pub fn mount(
        page: &mut Page,
        scope: Option<NodeId>,
        modal: Option<LightboxModal>,
        config: &Config,
    ) -> Result<Option<Self>> {
        config.validate()?;
        let Some(scope) = scope.filter(|node| page.is_element(*node)) else {
            tracing::debug!("lightbox skipped: no gallery scope");
            return Ok(None);
        };
        let built_modal = modal.is_none();
        let modal = match modal {
            Some(modal) => {
                modal.check(page)?;
                modal
            }
            None => LightboxModal::build(page)?,
        };

        let shared = Rc::new(Shared {
            modal,
            focus_trap_enabled: config.focus_trap_enabled,
            state: RefCell::new(LightboxState::default()),
            trap: RefCell::new(None),
        });
        let mut listeners = ListenerGroup::new();
        if let Err(err) = wire_listeners(page, &shared, scope, &mut listeners) {
            listeners.remove_all(page);
            if built_modal {
                page.remove_node(modal.overlay)?;
            }
            return Err(err);
        }

        tracing::debug!(scope = scope.index(), built_modal, "lightbox mounted");
        Ok(Some(Self {
            shared,
            scope,
            listeners,
            built_modal,
        }))
    }

    /// Shows `image` in the modal. Opening while already open swaps the
    /// content and keeps the original opener for focus restoration.
    pub fn open(&self, page: &mut Page, image: NodeId) -> Result<()> {
        self.shared.open(page, image)
    }

    /// Hides the modal and restores focus. A no-op when already closed.
    pub fn close(&self, page: &mut Page) -> Result<()> {
        self.shared.close(page)
    }

    pub fn state(&self) -> LightboxState {
        self.shared.state.borrow().clone()
    }

    pub fn is_open(&self) -> bool {
        self.shared.state.borrow().is_open
    }

    pub fn modal(&self) -> LightboxModal {
        self.shared.modal
    }

    pub fn scope(&self) -> NodeId {
        self.scope
    }

    /// Whether a focus trap is currently installed on the overlay.
    pub fn has_focus_trap(&self) -> bool {
        self.shared.trap.borrow().is_some()
    }

    /// Closes the modal if open, removes every listener this lightbox added
    /// and detaches the modal when it was built here.
    pub fn teardown(mut self, page: &mut Page) -> Result<()> {
        self.shared.close(page)?;
        let removed = self.listeners.remove_all(page);
        if self.built_modal && page.is_connected(self.shared.modal.overlay) {
            page.remove_node(self.shared.modal.overlay)?;
        }
        tracing::debug!(removed, "lightbox torn down");
        Ok(())
    }
}
