use super::*;

const DIALOG_HTML: &str = r#"
    <button id='before'>before</button>
    <div id='dialog'>
      <button id='a'>A</button>
      <span id='skipped' tabindex='-1'>no</span>
      <a id='b' href='#details'>B</a>
      <input id='c'>
      <button id='off' disabled>off</button>
    </div>
    <button id='after'>after</button>
    "#;

fn focus_selector(page: &mut Page, selector: &str) -> Result<()> {
    let node = page.select_required(selector)?;
    page.focus(node)
}

#[test]
fn install_records_first_and_last_focusable() -> Result<()> {
    let mut page = Page::from_html(DIALOG_HTML)?;
    let dialog = page.select_required("#dialog")?;
    let trap = FocusTrapHandle::install(&mut page, dialog)?;

    assert!(trap.is_active());
    assert_eq!(trap.container(), dialog);
    assert_eq!(trap.first(), page.select("#a")?);
    assert_eq!(trap.last(), page.select("#c")?);
    trap.release(&mut page);
    Ok(())
}

#[test]
fn tab_from_last_wraps_to_first() -> Result<()> {
    let mut page = Page::from_html(DIALOG_HTML)?;
    let dialog = page.select_required("#dialog")?;
    let trap = FocusTrapHandle::install(&mut page, dialog)?;

    focus_selector(&mut page, "#c")?;
    let event = page.press_key("Tab", false)?;
    assert!(event.default_prevented);
    page.assert_focused("#a")?;
    trap.release(&mut page);
    Ok(())
}

#[test]
fn shift_tab_from_first_wraps_to_last() -> Result<()> {
    let mut page = Page::from_html(DIALOG_HTML)?;
    let dialog = page.select_required("#dialog")?;
    let trap = FocusTrapHandle::install(&mut page, dialog)?;

    focus_selector(&mut page, "#a")?;
    page.press_key("Tab", true)?;
    page.assert_focused("#c")?;
    trap.release(&mut page);
    Ok(())
}

#[test]
fn tab_between_inner_elements_uses_default_order() -> Result<()> {
    let mut page = Page::from_html(DIALOG_HTML)?;
    let dialog = page.select_required("#dialog")?;
    let trap = FocusTrapHandle::install(&mut page, dialog)?;

    focus_selector(&mut page, "#a")?;
    let event = page.press_key("Tab", false)?;
    assert!(!event.default_prevented);
    page.assert_focused("#b")?;

    let event = page.press_key("Enter", false)?;
    assert!(!event.default_prevented);
    page.assert_focused("#b")?;
    trap.release(&mut page);
    Ok(())
}

#[test]
fn release_restores_default_tab_behavior() -> Result<()> {
    let mut page = Page::from_html(DIALOG_HTML)?;
    let dialog = page.select_required("#dialog")?;
    let trap = FocusTrapHandle::install(&mut page, dialog)?;
    assert_eq!(page.listener_count(dialog, "keydown"), 1);

    trap.release(&mut page);
    assert_eq!(page.listener_count(dialog, "keydown"), 0);

    focus_selector(&mut page, "#c")?;
    page.press_key("Tab", false)?;
    page.assert_focused("#after")?;
    Ok(())
}

#[test]
fn empty_container_installs_inert_trap() -> Result<()> {
    let mut page = Page::from_html(
        "<div id='empty'><p>text only</p><span tabindex='-1'>x</span></div><button id='b'>b</button>",
    )?;
    let empty = page.select_required("#empty")?;
    let trap = FocusTrapHandle::install(&mut page, empty)?;

    assert!(!trap.is_active());
    assert_eq!(trap.first(), None);
    assert_eq!(page.total_listener_count(), 0);
    page.press_key("Tab", false)?;
    page.assert_focused("#b")?;
    trap.release(&mut page);
    Ok(())
}

#[test]
fn single_focusable_element_keeps_focus_on_itself() -> Result<()> {
    let mut page = Page::from_html(
        "<button id='outside'>o</button><div id='box'><button id='only'>x</button></div>",
    )?;
    let boxed = page.select_required("#box")?;
    let trap = FocusTrapHandle::install(&mut page, boxed)?;

    focus_selector(&mut page, "#only")?;
    page.press_key("Tab", false)?;
    page.assert_focused("#only")?;
    page.press_key("Tab", true)?;
    page.assert_focused("#only")?;
    trap.release(&mut page);
    Ok(())
}
