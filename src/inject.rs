//! Toggle-control injection for the settings and learn pages.
//!
//! Both pages get the same labeled checkbox, mirroring the stored
//! preference; only the anchor and placement differ. The settings page
//! puts it right after the kanji-configuration heading inside the settings
//! form (or appends to the form when the heading is missing); the learn
//! page puts it in a flex container right above the review form. When the
//! anchor form has not rendered yet, injection stays pending and the
//! session retries it on every structural-change batch, without limit.

use crate::dom::{Dom, NodeId};
use crate::error::Error;
use crate::store::{KvStore, Preference};

/// `id`/`name` of the injected checkbox input.
pub const CHECKBOX_ID: &str = "hide-kanji-option";
/// Label text next to the checkbox.
pub const CHECKBOX_LABEL: &str = "Hide kanji on the review page and show only furigana";
/// Action attribute of the settings form the control is injected into.
pub const SETTINGS_FORM_ACTION: &str = "/settings";
/// Exact (trimmed) text of the heading the control is inserted after.
pub const SETTINGS_HEADING: &str = "Kanji learning configuration";
/// Action attribute of the learn page's review form.
pub const LEARN_FORM_ACTION: &str = "/review#a";

/// Handle to an injected checkbox, wired through to the preference store.
#[derive(Clone, Copy, Debug)]
pub struct ControlBinding {
    input: NodeId,
}

impl ControlBinding {
    /// The checkbox input node.
    pub fn input(&self) -> NodeId {
        self.input
    }

    /// Whether the checkbox currently renders checked.
    pub fn is_checked(&self, dom: &Dom) -> bool {
        dom.attr(self.input, "checked").is_some()
    }

    /// The change handler: update the checkbox state and write the new
    /// value through to the preference store.
    pub fn set_checked<S: KvStore>(
        &self,
        dom: &mut Dom,
        pref: &mut Preference<S>,
        checked: bool,
    ) -> Result<(), Error> {
        if checked {
            dom.set_attr(self.input, "checked", "checked");
        } else {
            dom.remove_attr(self.input, "checked");
        }
        pref.set(checked)
    }
}

/// Inject the toggle into the settings form, if the form has rendered.
///
/// The control lands immediately after the `<h6>` whose trimmed text is
/// [`SETTINGS_HEADING`], or at the end of the form when that heading is
/// missing. Returns `None` (retry later) when the form itself is absent.
pub fn inject_settings(dom: &mut Dom, checked: bool) -> Option<ControlBinding> {
    let root = dom.root();
    let form = dom.find_element_with_attr(root, "form", "action", SETTINGS_FORM_ACTION)?;

    let container = dom.create_element_with_attrs("div", &[("class", "checkbox")]);
    let input = build_input(dom, checked, &[]);
    let label = build_label(dom);
    dom.append_child(container, input);
    dom.append_child(container, label);

    let heading = dom
        .elements_named(form, "h6")
        .into_iter()
        .find(|&h| dom.text_content(h).trim() == SETTINGS_HEADING);
    let mut placed = false;
    if let Some(h) = heading {
        placed = dom.insert_after(h, container);
    }
    if !placed {
        dom.append_child(form, container);
    }
    log::debug!("injected settings toggle (checked={})", checked);
    Some(ControlBinding { input })
}

/// Inject the toggle immediately above the learn page's review form, if
/// that form has rendered. Returns `None` (retry later) when it is absent.
pub fn inject_learn(dom: &mut Dom, checked: bool) -> Option<ControlBinding> {
    let root = dom.root();
    let form = dom.find_element_with_attr(root, "form", "action", LEARN_FORM_ACTION)?;

    let container = dom.create_element_with_attrs(
        "div",
        &[(
            "style",
            "display: flex; align-items: center; margin-top: 1rem; margin-bottom: 0.5rem;",
        )],
    );
    let input = build_input(dom, checked, &[("style", "margin-right: 0.5rem;")]);
    let label = build_label(dom);
    dom.append_child(container, input);
    dom.append_child(container, label);

    if !dom.insert_before(form, container) {
        return None;
    }
    log::debug!("injected learn toggle (checked={})", checked);
    Some(ControlBinding { input })
}

fn build_input(dom: &mut Dom, checked: bool, extra: &[(&str, &str)]) -> NodeId {
    let input = dom.create_element_with_attrs(
        "input",
        &[("type", "checkbox"), ("id", CHECKBOX_ID), ("name", CHECKBOX_ID)],
    );
    for (k, v) in extra {
        dom.set_attr(input, k, v);
    }
    if checked {
        dom.set_attr(input, "checked", "checked");
    }
    input
}

fn build_label(dom: &mut Dom) -> NodeId {
    let label = dom.create_element_with_attrs("label", &[("for", CHECKBOX_ID)]);
    let text = dom.create_text(CHECKBOX_LABEL);
    dom.append_child(label, text);
    label
}
