//! Headless page-enhancement components: a quote rotator and an image lightbox
//! with focus trapping.
//!
//! Components never reach for a real browser. They operate on a [`Page`], a
//! deterministic arena DOM with selector queries, event dispatch, focus tracking
//! and a fake clock, and receive the elements they work on as [`NodeId`]s.
//!
//! ```
//! use site_widgets::{Config, Page, Quote, QuoteControls, QuoteDisplay, QuoteRotator};
//!
//! let mut page = Page::from_html(
//!     "<blockquote><p id='text'></p><cite id='author'></cite></blockquote>",
//! )?;
//! let display = QuoteDisplay {
//!     text: page.select_required("#text")?,
//!     author: page.select_required("#author")?,
//! };
//! let quotes = vec![Quote::new("Q1", "A1"), Quote::new("Q2", "A2")];
//! let rotator = QuoteRotator::mount(
//!     &mut page,
//!     quotes,
//!     Some(display),
//!     QuoteControls::default(),
//!     &Config::default(),
//! )?
//! .expect("display present");
//!
//! page.assert_text("#text", "“Q1”")?;
//! rotator.next(&mut page)?;
//! page.assert_text("#author", "— A2")?;
//! # Ok::<(), site_widgets::Error>(())
//! ```

mod config;
mod dom;
mod event;
mod focus_trap;
mod html;
mod lightbox;
mod page;
mod quote_rotator;
mod selector;
mod site;
mod timer;

pub use config::{AdvanceSource, Config, DEFAULT_AUTO_ADVANCE_INTERVAL_MS};
pub use dom::NodeId;
pub use event::{Event, EventHandler, ListenerGroup, ListenerId};
pub use focus_trap::{FOCUSABLE_SELECTOR, FocusTrapHandle};
pub use lightbox::{Lightbox, LightboxModal, LightboxState};
pub use page::Page;
pub use quote_rotator::{Quote, QuoteControls, QuoteDisplay, QuoteRotator, default_quotes};
pub use site::{Site, SiteSelectors};
pub use timer::{PendingTimer, TimerCallback, TimerId};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("invalid node operation: {0}")]
    InvalidNode(String),
    #[error("timer error: {0}")]
    Timer(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("config parse error: {0}")]
    ConfigParse(String),
    #[error("quote index {index} out of range for {len} quotes")]
    QuoteIndexOutOfRange { index: usize, len: usize },
    #[error("image has no source: {0}")]
    MissingImageSource(String),
    #[error("assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
}

#[cfg(test)]
mod tests;
