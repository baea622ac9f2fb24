use super::*;

const SITE_HTML: &str = r#"
    <!doctype html>
    <html>
      <body>
        <nav><a href='#quotes-section'>Quotes</a></nav>
        <section id='quotes-section'>
          <p id='quote-text'></p>
          <p id='quote-author'></p>
          <button id='prev'>Previous</button>
          <button id='next'>Next</button>
        </section>
        <section id='gallery-section'>
          <div class='gallery'>
            <img src='one.jpg' alt='First'>
            <img src='two.jpg' alt='Second'>
          </div>
        </section>
      </body>
    </html>
    "#;

#[test]
fn config_defaults() {
    let config = Config::default();
    assert_eq!(config.auto_advance_interval_ms, DEFAULT_AUTO_ADVANCE_INTERVAL_MS);
    assert_eq!(config.auto_advance_interval_ms, 10_000);
    assert!(!config.pause_on_hover);
    assert!(!config.pause_when_offscreen);
    assert!(config.focus_trap_enabled);
    assert_eq!(config.advance_source, AdvanceSource::Timer);
}

#[test]
fn config_parses_camel_case_keys() -> Result<()> {
    let config = Config::from_json(
        r#"{
            "autoAdvanceIntervalMs": 4000,
            "pauseOnHover": true,
            "pauseWhenOffscreen": true,
            "focusTrapEnabled": false,
            "advanceSource": "animation"
        }"#,
    )?;
    assert_eq!(
        config,
        Config {
            auto_advance_interval_ms: 4_000,
            pause_on_hover: true,
            pause_when_offscreen: true,
            focus_trap_enabled: false,
            advance_source: AdvanceSource::Animation,
        }
    );
    Ok(())
}

#[test]
fn config_fills_missing_keys_and_ignores_unknown_ones() -> Result<()> {
    let config = Config::from_json(r#"{ "pauseOnHover": true, "theme": "dark" }"#)?;
    assert!(config.pause_on_hover);
    assert_eq!(config.auto_advance_interval_ms, 10_000);
    assert_eq!(Config::from_json("{}")?, Config::default());
    Ok(())
}

#[test]
fn config_rejects_zero_interval() {
    let err = Config::from_json(r#"{ "autoAdvanceIntervalMs": 0 }"#).expect_err("zero interval");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn config_reports_malformed_json() {
    for raw in ["{", r#"{ "advanceSource": "scroll" }"#, r#"{ "pauseOnHover": "yes" }"#] {
        match Config::from_json(raw) {
            Err(Error::ConfigParse(_)) => {}
            other => panic!("expected parse error for {raw}, got {other:?}"),
        }
    }
}

#[test]
fn config_serializes_with_camel_case_keys() {
    let json = serde_json::to_string(&Config::default()).expect("config serializes");
    assert!(json.contains("\"autoAdvanceIntervalMs\":10000"));
    assert!(json.contains("\"advanceSource\":\"timer\""));
}

#[test]
fn site_mounts_both_components() -> Result<()> {
    let mut page = Page::from_html(SITE_HTML)?;
    let site = Site::init(&mut page, &Config::default())?;

    let quotes = site.quotes().expect("quote anchors present");
    assert_eq!(quotes.len(), default_quotes().len());
    page.assert_text("#quote-text", "“Smile and keep on running.”")?;
    page.assert_text("#quote-author", "— Riccardo B.")?;
    page.click("#next")?;
    page.assert_text("#quote-author", "— Unknown")?;

    let lightbox = site.lightbox().expect("gallery present");
    page.click("img[alt=\"Second\"]")?;
    assert!(lightbox.is_open());
    page.assert_text(".lightbox-caption", "Second")?;
    Ok(())
}

#[test]
fn site_without_gallery_still_rotates_quotes() -> Result<()> {
    let mut page = Page::from_html(
        "<section id='quotes-section'><p id='quote-text'></p><p id='quote-author'></p></section>",
    )?;
    let site = Site::init(&mut page, &Config::default())?;
    assert!(site.lightbox().is_none());
    assert_eq!(page.select(".lightbox-modal")?, None);

    page.advance_time(10_000)?;
    page.assert_text("#quote-author", "— Unknown")?;
    Ok(())
}

#[test]
fn site_without_quote_slots_still_has_lightbox() -> Result<()> {
    let mut page = Page::from_html("<div class='gallery'><img id='x' src='x.jpg'></div>")?;
    let site = Site::init(&mut page, &Config::default())?;
    assert!(site.quotes().is_none());
    assert!(site.lightbox().is_some());
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn site_selectors_can_be_overridden() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <aside id='words'><q id='line'></q><span id='who'></span></aside>
        <ul id='photos'><li><img src='a.png' alt='A'></li></ul>
        "#,
    )?;
    let selectors = SiteSelectors {
        quotes_section: "#words".into(),
        quote_text: "#line".into(),
        quote_author: "#who".into(),
        gallery: "#photos".into(),
        ..SiteSelectors::default()
    };
    let site = Site::init_with(&mut page, &Config::default(), &selectors)?;

    let quotes = site.quotes().expect("custom quote anchors present");
    assert_eq!(quotes.region(), page.select_required("#words")?);
    page.assert_text("#who", "— Riccardo B.")?;
    assert!(site.lightbox().is_some());
    Ok(())
}

#[test]
fn site_teardown_leaves_a_clean_page() -> Result<()> {
    let mut page = Page::from_html(SITE_HTML)?;
    let config = Config {
        pause_on_hover: true,
        pause_when_offscreen: true,
        ..Config::default()
    };
    let site = Site::init(&mut page, &config)?;
    site.teardown(&mut page)?;

    assert_eq!(page.total_listener_count(), 0);
    assert!(page.pending_timers().is_empty());
    assert_eq!(page.select(".lightbox-modal")?, None);

    let again = Site::init(&mut page, &config)?;
    assert!(again.quotes().is_some());
    assert_eq!(page.select_all(".lightbox-modal")?.len(), 1);
    Ok(())
}

#[test]
fn site_needs_the_quotes_section() -> Result<()> {
    let mut page = Page::from_html(
        "<p id='quote-text'></p><p id='quote-author'></p><button id='next'>n</button>",
    )?;
    let site = Site::init(&mut page, &Config::default())?;
    assert!(site.quotes().is_none());
    page.assert_text("#quote-text", "")?;
    assert!(page.pending_timers().is_empty());
    assert_eq!(page.total_listener_count(), 0);
    Ok(())
}

#[test]
fn site_looks_up_quote_parts_inside_the_section() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <header><q class='line' id='banner'></q><span class='who'></span></header>
        <section id='quotes-section'>
          <q class='line' id='inside'></q><span class='who'></span>
        </section>
        <button id='next'>outside</button>
        "#,
    )?;
    let selectors = SiteSelectors {
        quote_text: ".line".into(),
        quote_author: ".who".into(),
        ..SiteSelectors::default()
    };
    let site = Site::init_with(&mut page, &Config::default(), &selectors)?;

    let quotes = site.quotes().expect("section holds both slots");
    assert_eq!(quotes.display().text, page.select_required("#inside")?);
    page.assert_text("#inside", "“Smile and keep on running.”")?;
    page.assert_text("#banner", "")?;

    page.click("#next")?;
    assert_eq!(quotes.current_index(), 0);
    Ok(())
}
