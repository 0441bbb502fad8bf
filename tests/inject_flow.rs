//! Settings/learn toggle injection: placement, pending retry until the
//! anchor form renders, and preference write-through.

use ruby_fold::inject::{CHECKBOX_ID, CHECKBOX_LABEL};
use ruby_fold::store::HIDE_KANJI_KEY;
use ruby_fold::{Dom, KvStore, MemoryStore, Session};

const SETTINGS_URL: &str = "https://jpdb.io/settings";
const LEARN_URL: &str = "https://jpdb.io/learn";

const SETTINGS_PAGE: &[u8] = br#"<html><body><form action="/settings"><h6>Account</h6><h6>Kanji learning configuration</h6><div class="coverage"/></form></body></html>"#;

const LEARN_PAGE: &[u8] = br#"<html><body><div id="page"><form action="/review#a"><input type="submit" value="Review"/></form></div></body></html>"#;

#[test]
fn settings_attach_injects_checkbox_after_heading() {
    let mut dom = Dom::parse(SETTINGS_PAGE).expect("parse");
    let session = Session::attach(&mut dom, SETTINGS_URL, MemoryStore::new());
    assert!(session.control().is_some());

    let root = dom.root();
    let form = dom
        .find_element_with_attr(root, "form", "action", "/settings")
        .expect("form");
    let children = dom.children(form).to_vec();
    // heading, heading, injected control, pre-existing div
    assert_eq!(dom.text_content(children[1]), "Kanji learning configuration");
    assert_eq!(dom.attr(children[2], "class"), Some("checkbox"));
    assert_eq!(dom.attr(children[3], "class"), Some("coverage"));

    let input = dom.element_by_id(root, CHECKBOX_ID).expect("input");
    assert_eq!(dom.attr(input, "type"), Some("checkbox"));
    assert!(dom.attr(input, "checked").is_none(), "fresh store starts unchecked");

    let label = dom
        .find_element_with_attr(root, "label", "for", CHECKBOX_ID)
        .expect("label");
    assert_eq!(dom.text_content(label), CHECKBOX_LABEL);
}

#[test]
fn settings_checkbox_mirrors_stored_preference() {
    let mut store = MemoryStore::new();
    store.set(HIDE_KANJI_KEY, "true").expect("seed store");
    let mut dom = Dom::parse(SETTINGS_PAGE).expect("parse");
    let session = Session::attach(&mut dom, SETTINGS_URL, store);

    let control = session.control().expect("control");
    assert!(control.is_checked(&dom));
}

#[test]
fn settings_change_writes_preference_through() {
    let mut dom = Dom::parse(SETTINGS_PAGE).expect("parse");
    let mut session = Session::attach(&mut dom, SETTINGS_URL, MemoryStore::new());

    session.set_control_checked(&mut dom, true).expect("check");
    assert_eq!(
        session.preference().store().get(HIDE_KANJI_KEY).as_deref(),
        Some("true")
    );
    let control = session.control().expect("control");
    assert!(control.is_checked(&dom));

    session.set_control_checked(&mut dom, false).expect("uncheck");
    assert_eq!(
        session.preference().store().get(HIDE_KANJI_KEY).as_deref(),
        Some("false")
    );
}

#[test]
fn learn_attach_injects_container_above_form() {
    let mut dom = Dom::parse(LEARN_PAGE).expect("parse");
    let session = Session::attach(&mut dom, LEARN_URL, MemoryStore::new());
    assert!(session.control().is_some());

    let root = dom.root();
    let page = dom.element_by_id(root, "page").expect("page");
    let children = dom.children(page).to_vec();
    assert_eq!(children.len(), 2);
    let style = dom.attr(children[0], "style").expect("flex container");
    assert!(style.contains("display: flex"), "style: {}", style);
    assert_eq!(dom.name(children[1]), Some("form"));
}

#[test]
fn injection_stays_pending_until_form_renders() {
    // The page hasn't rendered its form yet.
    let mut dom = Dom::parse(b"<html><body><div id=\"shell\">loading</div></body></html>")
        .expect("parse");
    let mut session = Session::attach(&mut dom, SETTINGS_URL, MemoryStore::new());
    assert!(session.is_pending());
    assert!(session.control().is_none());

    // A few turns with no form: still pending, no limit on retries.
    session.pump(&mut dom);
    session.pump(&mut dom);
    assert!(session.is_pending());

    // The form renders; the next turn picks it up.
    let root = dom.root();
    let body = dom.elements_named(root, "body")[0];
    let form = dom.create_element_with_attrs("form", &[("action", "/settings")]);
    let heading = dom.create_element("h6");
    let heading_text = dom.create_text("Kanji learning configuration");
    dom.append_child(heading, heading_text);
    dom.append_child(form, heading);
    dom.append_child(body, form);

    session.pump(&mut dom);
    assert!(!session.is_pending());
    let control = session.control().expect("control after retry");
    assert_eq!(dom.attr(control.input(), "id"), Some(CHECKBOX_ID));
}

#[test]
fn pending_change_requests_are_silent_noops() {
    let mut dom = Dom::parse(b"<html><body/></html>").expect("parse");
    let mut session = Session::attach(&mut dom, LEARN_URL, MemoryStore::new());
    assert!(session.is_pending());
    session
        .set_control_checked(&mut dom, true)
        .expect("no control yet is not an error");
    assert!(
        session.preference().store().get(HIDE_KANJI_KEY).is_none(),
        "nothing written without a control"
    );
}

#[test]
fn settings_page_never_folds_review_content() {
    // Ruby on a non-review page stays as-is even with the preference on.
    let page = br#"<html><body><form action="/settings"><h6>Kanji learning configuration</h6></form><ruby>X<rt>x</rt></ruby></body></html>"#;
    let mut store = MemoryStore::new();
    store.set(HIDE_KANJI_KEY, "true").expect("seed store");
    let mut dom = Dom::parse(page).expect("parse");
    Session::attach(&mut dom, SETTINGS_URL, store);
    assert_eq!(dom.elements_named(dom.root(), "ruby").len(), 1);
}
