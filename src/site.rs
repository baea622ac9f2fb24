use crate::Result;
use crate::config::Config;
use crate::dom::NodeId;
use crate::lightbox::Lightbox;
use crate::page::Page;
use crate::quote_rotator::{QuoteControls, QuoteDisplay, QuoteRotator, default_quotes};

/// Selectors used to find each component's anchors on the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSelectors {
    pub quotes_section: String,
    pub quote_text: String,
    pub quote_author: String,
    pub previous: String,
    pub next: String,
    pub gallery: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            quotes_section: "#quotes-section".into(),
            quote_text: "#quote-text".into(),
            quote_author: "#quote-author".into(),
            previous: "#prev".into(),
            next: "#next".into(),
            gallery: ".gallery".into(),
        }
    }
}

/// Every component mounted on one page. A component whose anchors are missing
/// is simply absent; the rotator needs its section as well as both slots.
#[derive(Debug)]
pub struct Site {
    quotes: Option<QuoteRotator>,
    lightbox: Option<Lightbox>,
}

impl Site {
    pub fn init(page: &mut Page, config: &Config) -> Result<Self> {
        Self::init_with(page, config, &SiteSelectors::default())
    }

    pub fn init_with(page: &mut Page, config: &Config, selectors: &SiteSelectors) -> Result<Self> {
        config.validate()?;

        let quotes = match page.select(&selectors.quotes_section)? {
            Some(section) => Self::mount_quotes(page, config, selectors, section)?,
            None => {
                tracing::debug!(selector = %selectors.quotes_section, "no quotes section");
                None
            }
        };

        let gallery = page.select(&selectors.gallery)?;
        let lightbox = Lightbox::mount(page, gallery, None, config)?;

        tracing::debug!(
            quotes = quotes.is_some(),
            lightbox = lightbox.is_some(),
            "site initialized"
        );
        Ok(Self { quotes, lightbox })
    }

    /// Quote slots and buttons are looked up inside the section only.
    fn mount_quotes(
        page: &mut Page,
        config: &Config,
        selectors: &SiteSelectors,
        section: NodeId,
    ) -> Result<Option<QuoteRotator>> {
        let display = match (
            page.select_first_within(section, &selectors.quote_text)?,
            page.select_first_within(section, &selectors.quote_author)?,
        ) {
            (Some(text), Some(author)) => Some(QuoteDisplay { text, author }),
            _ => None,
        };
        let controls = QuoteControls {
            previous: page.select_first_within(section, &selectors.previous)?,
            next: page.select_first_within(section, &selectors.next)?,
            region: Some(section),
        };
        QuoteRotator::mount(page, default_quotes(), display, controls, config)
    }

    pub fn quotes(&self) -> Option<&QuoteRotator> {
        self.quotes.as_ref()
    }

    pub fn lightbox(&self) -> Option<&Lightbox> {
        self.lightbox.as_ref()
    }

    pub fn teardown(self, page: &mut Page) -> Result<()> {
        if let Some(quotes) = self.quotes {
            quotes.teardown(page);
        }
        if let Some(lightbox) = self.lightbox {
            lightbox.teardown(page)?;
        }
        Ok(())
    }
}
