use super::*;

const NESTED_HTML: &str = r#"
    <div id='outer'>
      <div id='inner'><button id='btn'>go</button></div>
    </div>
    "#;

fn logger(log: &CallLog, label: &'static str) -> EventHandler {
    let log = log.clone();
    Rc::new(move |_page: &mut Page, _event: &mut Event| {
        log.push(label);
        Ok(())
    })
}

#[test]
fn click_runs_capture_target_then_bubble() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let outer = page.select_required("#outer")?;
    let inner = page.select_required("#inner")?;
    let btn = page.select_required("#btn")?;
    let log = CallLog::default();

    page.add_listener(outer, "click", false, logger(&log, "outer-bubble"))?;
    page.add_listener(outer, "click", true, logger(&log, "outer-capture"))?;
    page.add_listener(inner, "click", false, logger(&log, "inner-bubble"))?;
    page.add_listener(btn, "click", false, logger(&log, "btn"))?;

    page.click("#btn")?;
    assert_eq!(
        log.entries(),
        vec!["outer-capture", "btn", "inner-bubble", "outer-bubble"]
    );
    Ok(())
}

#[test]
fn stop_propagation_halts_bubbling() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let outer = page.select_required("#outer")?;
    let inner = page.select_required("#inner")?;
    let log = CallLog::default();

    page.add_listener(outer, "click", false, logger(&log, "outer"))?;
    let stop_log = log.clone();
    page.add_listener(
        inner,
        "click",
        false,
        Rc::new(move |_page: &mut Page, event: &mut Event| {
            stop_log.push("inner");
            event.stop_propagation();
            Ok(())
        }),
    )?;

    page.click("#btn")?;
    assert_eq!(log.entries(), vec!["inner"]);
    Ok(())
}

#[test]
fn stop_immediate_propagation_skips_sibling_listeners() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let btn = page.select_required("#btn")?;
    let log = CallLog::default();

    let first_log = log.clone();
    page.add_listener(
        btn,
        "click",
        false,
        Rc::new(move |_page: &mut Page, event: &mut Event| {
            first_log.push("first");
            event.stop_immediate_propagation();
            Ok(())
        }),
    )?;
    page.add_listener(btn, "click", false, logger(&log, "second"))?;

    page.click("#btn")?;
    assert_eq!(log.entries(), vec!["first"]);
    Ok(())
}

#[test]
fn mouseenter_and_intersection_do_not_bubble() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let outer = page.select_required("#outer")?;
    let inner = page.select_required("#inner")?;
    let log = CallLog::default();

    page.add_listener(outer, "mouseenter", false, logger(&log, "outer-enter"))?;
    page.add_listener(outer, "intersection", false, logger(&log, "outer-visible"))?;
    page.add_listener(inner, "mouseenter", false, logger(&log, "inner-enter"))?;

    page.hover("#inner")?;
    page.set_intersecting("#inner", true)?;
    assert_eq!(log.entries(), vec!["inner-enter"]);
    Ok(())
}

#[test]
fn listener_removed_mid_dispatch_is_skipped() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let btn = page.select_required("#btn")?;
    let log = CallLog::default();
    let victim: Rc<RefCell<Option<ListenerId>>> = Rc::default();

    let remover_log = log.clone();
    let remover_victim = Rc::clone(&victim);
    page.add_listener(
        btn,
        "click",
        false,
        Rc::new(move |page: &mut Page, _event: &mut Event| {
            remover_log.push("remover");
            if let Some(id) = remover_victim.borrow_mut().take() {
                page.remove_listener(id);
            }
            Ok(())
        }),
    )?;
    let id = page.add_listener(btn, "click", false, logger(&log, "victim"))?;
    *victim.borrow_mut() = Some(id);

    page.click("#btn")?;
    page.click("#btn")?;
    assert_eq!(log.entries(), vec!["remover", "remover"]);
    assert_eq!(page.listener_count(btn, "click"), 1);
    Ok(())
}

#[test]
fn listener_group_removes_everything_it_added() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let outer = page.select_required("#outer")?;
    let btn = page.select_required("#btn")?;
    let log = CallLog::default();

    let mut group = ListenerGroup::new();
    group.add(&mut page, outer, "click", logger(&log, "outer"))?;
    group.add(&mut page, btn, "keydown", logger(&log, "key"))?;
    assert_eq!(group.len(), 2);
    assert_eq!(page.total_listener_count(), 2);

    assert_eq!(group.remove_all(&mut page), 2);
    assert!(group.is_empty());
    assert_eq!(page.total_listener_count(), 0);
    page.click("#btn")?;
    assert!(log.entries().is_empty());
    Ok(())
}

#[test]
fn listening_on_unknown_node_fails() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let other = Page::from_html(&"<p></p>".repeat(64))?;
    let far = other.select_all("p")?.last().copied().expect("fixture has paragraphs");
    let log = CallLog::default();
    let err = page
        .add_listener(far, "click", false, logger(&log, "never"))
        .expect_err("node does not exist on this page");
    assert!(matches!(err, Error::InvalidNode(_)));
    Ok(())
}

#[test]
fn focus_moves_with_blur_and_focus_events() -> Result<()> {
    let mut page = Page::from_html("<input id='a'><input id='b'><button id='off' disabled>x</button>")?;
    let a = page.select_required("#a")?;
    let b = page.select_required("#b")?;
    let off = page.select_required("#off")?;
    let log = CallLog::default();
    page.add_listener(a, "blur", false, logger(&log, "a-blur"))?;
    page.add_listener(b, "focus", false, logger(&log, "b-focus"))?;

    page.focus(a)?;
    page.focus(b)?;
    assert_eq!(log.entries(), vec!["a-blur", "b-focus"]);
    page.assert_focused("#b")?;

    page.focus(off)?;
    assert_eq!(page.active_element(), Some(b));
    Ok(())
}

#[test]
fn tab_walks_focusable_elements_in_order() -> Result<()> {
    let mut page = Page::from_html(
        "<button id='one'>1</button><span tabindex='-1' id='skip'>s</span><a id='two' href='#x'>2</a><input id='three'>",
    )?;
    page.press_key("Tab", false)?;
    page.assert_focused("#one")?;
    page.press_key("Tab", false)?;
    page.assert_focused("#two")?;
    page.press_key("Tab", false)?;
    page.assert_focused("#three")?;
    page.press_key("Tab", false)?;
    page.assert_focused("#one")?;
    page.press_key("Tab", true)?;
    page.assert_focused("#three")?;
    Ok(())
}

#[test]
fn prevented_tab_keeps_focus() -> Result<()> {
    let mut page = Page::from_html("<button id='one'>1</button><button id='two'>2</button>")?;
    let one = page.select_required("#one")?;
    let document = page.document();
    page.add_listener(
        document,
        "keydown",
        false,
        Rc::new(|_page: &mut Page, event: &mut Event| {
            if event.is_key("Tab") {
                event.prevent_default();
            }
            Ok(())
        }),
    )?;
    page.focus(one)?;
    let event = page.press_key("Tab", false)?;
    assert!(event.default_prevented);
    page.assert_focused("#one")?;
    Ok(())
}

#[test]
fn timeout_fires_once_when_due() -> Result<()> {
    let mut page = Page::new();
    let log = CallLog::default();
    let fired = log.clone();
    page.set_timeout(
        100,
        Rc::new(move |page: &mut Page| {
            fired.push(format!("t={}", page.now_ms()));
            Ok(())
        }),
    );

    page.advance_time(99)?;
    assert!(log.entries().is_empty());
    page.advance_time(1)?;
    page.advance_time(1_000)?;
    assert_eq!(log.entries(), vec!["t=100"]);
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn interval_repeats_until_cleared() -> Result<()> {
    let mut page = Page::new();
    let log = CallLog::default();
    let ticks = log.clone();
    let id = page.set_interval(
        50,
        Rc::new(move |page: &mut Page| {
            ticks.push(page.now_ms().to_string());
            Ok(())
        }),
    );

    page.advance_time(160)?;
    assert_eq!(log.entries(), vec!["50", "100", "150"]);
    assert_eq!(page.now_ms(), 160);
    let pending = page.pending_timers();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].due_at, 200);
    assert_eq!(pending[0].interval_ms, Some(50));

    assert!(page.clear_timer(id));
    assert!(!page.clear_timer(id));
    page.advance_time(500)?;
    assert_eq!(log.entries().len(), 3);
    Ok(())
}

#[test]
fn interval_cleared_inside_its_callback_is_not_requeued() -> Result<()> {
    let mut page = Page::new();
    let log = CallLog::default();
    let own_id: Rc<RefCell<Option<TimerId>>> = Rc::default();
    let ticks = log.clone();
    let callback_id = Rc::clone(&own_id);
    let id = page.set_interval(
        10,
        Rc::new(move |page: &mut Page| {
            ticks.push("tick");
            if let Some(id) = *callback_id.borrow() {
                page.clear_timer(id);
            }
            Ok(())
        }),
    );
    *own_id.borrow_mut() = Some(id);

    page.advance_time(100)?;
    assert_eq!(log.entries(), vec!["tick"]);
    assert!(page.pending_timers().is_empty());
    Ok(())
}

#[test]
fn flush_with_live_interval_hits_step_limit() -> Result<()> {
    let mut page = Page::new();
    page.set_timer_step_limit(5)?;
    page.set_interval(10, Rc::new(|_page: &mut Page| Ok(())));
    match page.flush() {
        Err(Error::Timer(msg)) => assert!(msg.contains("exceeded max steps")),
        other => panic!("unexpected flush result: {other:?}"),
    }
    Ok(())
}

#[test]
fn timer_clock_rejects_going_backwards() -> Result<()> {
    let mut page = Page::new();
    page.advance_time(20)?;
    assert!(matches!(page.advance_time(-1), Err(Error::Timer(_))));
    assert!(matches!(page.advance_time_to(10), Err(Error::Timer(_))));
    assert!(matches!(page.set_timer_step_limit(0), Err(Error::Timer(_))));
    assert_eq!(page.run_due_timers()?, 0);
    Ok(())
}

#[test]
fn same_due_time_runs_in_schedule_order() -> Result<()> {
    let mut page = Page::new();
    let log = CallLog::default();
    for label in ["a", "b", "c"] {
        let log = log.clone();
        page.set_timeout(
            5,
            Rc::new(move |_page: &mut Page| {
                log.push(label);
                Ok(())
            }),
        );
    }
    assert_eq!(page.flush()?, 3);
    assert_eq!(log.entries(), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn trace_log_records_events_and_timers() -> Result<()> {
    let mut page = Page::from_html(NESTED_HTML)?;
    let btn = page.select_required("#btn")?;
    let log = CallLog::default();
    page.add_listener(btn, "click", false, logger(&log, "btn"))?;
    page.enable_trace(true);

    page.click("#btn")?;
    page.set_timeout(5, Rc::new(|_page: &mut Page| Ok(())));
    page.advance_time(5)?;

    let lines = page.take_trace_logs();
    assert!(lines.iter().any(|line| line.starts_with("[event] click target=#btn")));
    assert!(lines.iter().any(|line| line.starts_with("[event] done click")));
    assert!(lines.iter().any(|line| line.starts_with("[timer] run id=")));
    assert!(page.take_trace_logs().is_empty());

    page.set_trace_events(false);
    page.click("#btn")?;
    assert!(page.take_trace_logs().is_empty());
    Ok(())
}

#[test]
fn trace_log_limit_keeps_newest_lines() -> Result<()> {
    let mut page = Page::new();
    page.enable_trace(true);
    page.set_trace_log_limit(2)?;
    for _ in 0..3 {
        page.set_timeout(1, Rc::new(|_page: &mut Page| Ok(())));
    }
    let lines = page.take_trace_logs();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].contains("id=2"));
    assert!(lines[1].contains("id=3"));

    page.set_trace_log_limit(10)?;
    for _ in 0..4 {
        page.set_timeout(1, Rc::new(|_page: &mut Page| Ok(())));
    }
    page.set_trace_log_limit(1)?;
    let lines = page.take_trace_logs();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains("id=7"));
    assert!(matches!(page.set_trace_log_limit(0), Err(Error::InvalidConfig(_))));
    Ok(())
}
