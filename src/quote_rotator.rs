use std::cell::RefCell;
use std::rc::Rc;

use crate::config::{AdvanceSource, Config};
use crate::dom::NodeId;
use crate::event::{Event, ListenerGroup};
use crate::page::Page;
use crate::timer::TimerId;
use crate::{Error, Result};

/// One quotation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    text: String,
    author: String,
}

impl Quote {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    /// Body slot text, wrapped in directional quotation marks.
    pub fn display_text(&self) -> String {
        format!("“{}”", self.text)
    }

    /// Author slot text.
    pub fn display_author(&self) -> String {
        format!("— {}", self.author)
    }
}

/// The stock quote list shipped with the site.
pub fn default_quotes() -> Vec<Quote> {
    vec![
        Quote::new("Smile and keep on running.", "Riccardo B."),
        Quote::new("Your limitation—it’s only your imagination.", "Unknown"),
        Quote::new(
            "The only way to do great work is to love what you do.",
            "Steve Jobs",
        ),
        Quote::new(
            "It does not matter how slowly you go as long as you do not stop.",
            "Confucius",
        ),
        Quote::new("Dream it. Wish it. Do it.", "Unknown"),
        Quote::new(
            "Challenges are what make life interesting; overcoming... is what makes life meaningful.",
            "Joshua J. Marine",
        ),
        Quote::new("Don’t watch the clock; do what it does. Keep going.", "Sam Levenson"),
    ]
}

/// The two text slots a rotator renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteDisplay {
    pub text: NodeId,
    pub author: NodeId,
}

/// Optional activators and the region watched for hover and visibility.
/// Without a region the text slot's parent is watched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuoteControls {
    pub previous: Option<NodeId>,
    pub next: Option<NodeId>,
    pub region: Option<NodeId>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Forward,
    Back,
}

#[derive(Debug)]
struct RotatorState {
    quotes: Vec<Quote>,
    current_index: usize,
    display: QuoteDisplay,
    hovered: bool,
    offscreen: bool,
    torn_down: bool,
}

impl RotatorState {
    fn paused(&self) -> bool {
        self.hovered || self.offscreen
    }

    fn step(&mut self, step: Step) -> usize {
        let len = self.quotes.len();
        self.current_index = match step {
            Step::Forward => (self.current_index + 1) % len,
            Step::Back => (self.current_index + len - 1) % len,
        };
        self.current_index
    }
}

fn render_into(state: &RefCell<RotatorState>, page: &mut Page, index: usize) -> Result<()> {
    let (display, text, author) = {
        let state = state.borrow();
        let quote = state.quotes.get(index).ok_or(Error::QuoteIndexOutOfRange {
            index,
            len: state.quotes.len(),
        })?;
        if state.torn_down {
            return Ok(());
        }
        (state.display, quote.display_text(), quote.display_author())
    };
    if !page.is_connected(display.text) || !page.is_connected(display.author) {
        tracing::trace!(index, "quote display detached; render skipped");
        return Ok(());
    }
    page.set_text(display.text, &text)?;
    page.set_text(display.author, &author)?;
    Ok(())
}

fn advance(state: &RefCell<RotatorState>, page: &mut Page, step: Step) -> Result<()> {
    let index = state.borrow_mut().step(step);
    tracing::trace!(index, ?step, "quote rotated");
    render_into(state, page, index)
}

fn auto_advance(state: &RefCell<RotatorState>, page: &mut Page) -> Result<()> {
    if state.borrow().paused() {
        return Ok(());
    }
    advance(state, page, Step::Forward)
}

fn update_pause(
    state: &RefCell<RotatorState>,
    page: &mut Page,
    change: impl FnOnce(&mut RotatorState),
) -> Result<()> {
    let (display, paused) = {
        let mut state = state.borrow_mut();
        if state.torn_down {
            return Ok(());
        }
        change(&mut *state);
        (state.display, state.paused())
    };
    let play_state = if paused { "paused" } else { "running" };
    for slot in [display.text, display.author] {
        page.set_style(slot, "animationPlayState", play_state)?;
    }
    Ok(())
}

/// Cycles a fixed list of quotes through two display slots.
///
/// Each rotator owns its own index, so several can live on one page.
#[derive(Debug)]
pub struct QuoteRotator {
    state: Rc<RefCell<RotatorState>>,
    listeners: ListenerGroup,
    timer: Option<TimerId>,
    region: NodeId,
}

impl QuoteRotator {
    /// Mounts a rotator and renders the first quote.
    ///
    /// Returns `Ok(None)` and leaves the page untouched when `quotes` is empty
    /// or the display slots are missing or detached.
    pub fn mount(
        page: &mut Page,
        quotes: Vec<Quote>,
        display: Option<QuoteDisplay>,
        controls: QuoteControls,
        config: &Config,
    ) -> Result<Option<Self>> {
        config.validate()?;
        if quotes.is_empty() {
            tracing::debug!("quote rotator skipped: no quotes");
            return Ok(None);
        }
        let Some(display) = display else {
            tracing::debug!("quote rotator skipped: no display target");
            return Ok(None);
        };
        let slot_ok = |node: NodeId| page.is_element(node) && page.is_connected(node);
        if !slot_ok(display.text) || !slot_ok(display.author) {
            tracing::debug!("quote rotator skipped: display slots are not connected elements");
            return Ok(None);
        }

        let state = Rc::new(RefCell::new(RotatorState {
            quotes,
            current_index: 0,
            display,
            hovered: false,
            offscreen: false,
            torn_down: false,
        }));
        render_into(&state, page, 0)?;

        let region = controls
            .region
            .filter(|node| page.is_element(*node))
            .or_else(|| page.parent(display.text).filter(|node| page.is_element(*node)))
            .unwrap_or(display.text);

        let mut listeners = ListenerGroup::new();
        let activators = [(controls.previous, Step::Back), (controls.next, Step::Forward)];
        for (control, step) in activators {
            let Some(control) = control.filter(|node| page.is_element(*node)) else {
                continue;
            };
            let state = Rc::clone(&state);
            listeners.add(
                page,
                control,
                "click",
                Rc::new(move |page: &mut Page, _: &mut Event| advance(&state, page, step)),
            )?;
        }

        if config.pause_on_hover {
            let enter = Rc::clone(&state);
            listeners.add(
                page,
                region,
                "mouseenter",
                Rc::new(move |page: &mut Page, _: &mut Event| {
                    update_pause(&enter, page, |state| state.hovered = true)
                }),
            )?;
            let leave = Rc::clone(&state);
            listeners.add(
                page,
                region,
                "mouseleave",
                Rc::new(move |page: &mut Page, _: &mut Event| {
                    update_pause(&leave, page, |state| state.hovered = false)
                }),
            )?;
        }

        if config.pause_when_offscreen {
            let state = Rc::clone(&state);
            listeners.add(
                page,
                region,
                "intersection",
                Rc::new(move |page: &mut Page, event: &mut Event| {
                    let offscreen = !event.is_intersecting.unwrap_or(true);
                    update_pause(&state, page, |state| state.offscreen = offscreen)
                }),
            )?;
        }

        let timer = match config.advance_source {
            AdvanceSource::Timer => {
                let state = Rc::clone(&state);
                Some(page.set_interval(
                    config.interval_ms(),
                    Rc::new(move |page: &mut Page| auto_advance(&state, page)),
                ))
            }
            AdvanceSource::Animation => {
                let state = Rc::clone(&state);
                listeners.add(
                    page,
                    display.text,
                    "animationiteration",
                    Rc::new(move |page: &mut Page, _: &mut Event| auto_advance(&state, page)),
                )?;
                None
            }
        };

        tracing::debug!(
            quotes = state.borrow().quotes.len(),
            listeners = listeners.len(),
            "quote rotator mounted"
        );
        Ok(Some(Self {
            state,
            listeners,
            timer,
            region,
        }))
    }

    pub fn next(&self, page: &mut Page) -> Result<()> {
        advance(&self.state, page, Step::Forward)
    }

    pub fn previous(&self, page: &mut Page) -> Result<()> {
        advance(&self.state, page, Step::Back)
    }

    /// Writes the quote at `index` into the slots without moving the rotator.
    pub fn render(&self, page: &mut Page, index: usize) -> Result<()> {
        render_into(&self.state, page, index)
    }

    pub fn current_index(&self) -> usize {
        self.state.borrow().current_index
    }

    pub fn current_quote(&self) -> Quote {
        let state = self.state.borrow();
        state.quotes[state.current_index].clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().quotes.len()
    }

    /// Always false: an empty list never mounts.
    pub fn is_empty(&self) -> bool {
        self.state.borrow().quotes.is_empty()
    }

    pub fn is_paused(&self) -> bool {
        self.state.borrow().paused()
    }

    pub fn display(&self) -> QuoteDisplay {
        self.state.borrow().display
    }

    pub fn region(&self) -> NodeId {
        self.region
    }

    /// The auto-advance interval, when rotation is timer driven.
    pub fn timer(&self) -> Option<TimerId> {
        self.timer
    }

    /// Cancels auto-advance and removes every listener this rotator added.
    pub fn teardown(mut self, page: &mut Page) {
        if let Some(timer) = self.timer.take() {
            page.clear_timer(timer);
        }
        let removed = self.listeners.remove_all(page);
        self.state.borrow_mut().torn_down = true;
        tracing::debug!(removed, "quote rotator torn down");
    }
}
