//! Page sessions: classify a location, read the preference once, and run
//! the matching handler.
//!
//! A [`Session`] is attached once per page load. On the review page with
//! the preference enabled it folds the tree immediately and arms a
//! mutation watcher on the main content container (falling back to the
//! body, then the document root) so content loaded later is folded too.
//! On the settings and learn pages it injects the toggle control, staying
//! pending until the anchor form renders. Everything else is inert.
//!
//! [`Session::pump`] is one cooperative event-loop turn: retry a pending
//! injection, or drain the watcher to quiescence. All paths are fail-soft;
//! an absent preference key simply means nothing happens on review pages.

use crate::classify::{classify, PageKind};
use crate::dom::{Dom, NodeId};
use crate::error::Error;
use crate::inject::{inject_learn, inject_settings, ControlBinding};
use crate::rewrite::fold_ruby;
use crate::store::{KvStore, Preference};
use crate::sweep::sweep;
use crate::watch::{drive, MutationWatcher, WatchLimits};

/// Review-page behavior options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReviewOptions {
    /// Run the legacy residual-glyph sweep after the fold pass instead of
    /// arming a watcher. Destructive for unannotated kanji; see
    /// [`crate::sweep::sweep`]. Off by default.
    pub sweep_residuals: bool,
    /// Fixed-point limits for the mutation watcher.
    pub watch: WatchLimits,
}

#[derive(Debug)]
enum SessionState {
    /// Nothing to do (unrecognized page, disabled preference, or a
    /// finished legacy pass).
    Idle,
    /// Control injection anchor not rendered yet; retried, without an
    /// attempt limit, whenever the tree changes structurally.
    PendingControl { watcher: MutationWatcher },
    /// Control injected and live.
    Control(ControlBinding),
    /// Review fold armed against asynchronous content loads.
    Watching {
        watcher: MutationWatcher,
        limits: WatchLimits,
    },
}

/// One page load's worth of behavior, holding the preference it was
/// attached with.
#[derive(Debug)]
pub struct Session<S: KvStore> {
    pref: Preference<S>,
    kind: Option<PageKind>,
    state: SessionState,
}

impl<S: KvStore> Session<S> {
    /// Attach to a page with default review behavior.
    pub fn attach(dom: &mut Dom, location: &str, store: S) -> Self {
        Self::attach_with_options(dom, location, store, ReviewOptions::default())
    }

    /// Attach to a page, classifying `location` and reading the stored
    /// preference exactly once.
    pub fn attach_with_options(
        dom: &mut Dom,
        location: &str,
        store: S,
        options: ReviewOptions,
    ) -> Self {
        let pref = Preference::new(store);
        let enabled = pref.get();
        let kind = classify(location);
        if let Some(kind) = kind {
            log::debug!("attaching to {} page (hide={})", kind.as_str(), enabled);
        }

        let state = match kind {
            None => SessionState::Idle,
            Some(PageKind::Settings) => match inject_settings(dom, enabled) {
                Some(control) => SessionState::Control(control),
                None => SessionState::PendingControl {
                    watcher: MutationWatcher::arm(dom, dom.root()),
                },
            },
            Some(PageKind::Learn) => match inject_learn(dom, enabled) {
                Some(control) => SessionState::Control(control),
                None => SessionState::PendingControl {
                    watcher: MutationWatcher::arm(dom, dom.root()),
                },
            },
            Some(PageKind::Review) if !enabled => SessionState::Idle,
            Some(PageKind::Review) => {
                let root = dom.root();
                fold_ruby(dom, root);
                if options.sweep_residuals {
                    sweep(dom, body_or_root(dom));
                    SessionState::Idle
                } else {
                    let target = watch_target(dom);
                    SessionState::Watching {
                        watcher: MutationWatcher::arm(dom, target),
                        limits: options.watch,
                    }
                }
            }
        };

        Self { pref, kind, state }
    }

    /// One event-loop turn: retry a pending injection or drain the review
    /// watcher. Safe to call any number of times.
    pub fn pump(&mut self, dom: &mut Dom) {
        match &mut self.state {
            SessionState::PendingControl { watcher } => {
                if !watcher.poll(dom) {
                    return;
                }
                let enabled = self.pref.get();
                let injected = match self.kind {
                    Some(PageKind::Settings) => inject_settings(dom, enabled),
                    Some(PageKind::Learn) => inject_learn(dom, enabled),
                    _ => None,
                };
                if let Some(control) = injected {
                    self.state = SessionState::Control(control);
                }
            }
            SessionState::Watching { watcher, limits } => {
                let target = watcher.target();
                let limits = *limits;
                drive(dom, watcher, limits, |d| {
                    fold_ruby(d, target);
                });
            }
            SessionState::Idle | SessionState::Control(_) => {}
        }
    }

    /// The page this session attached to, if any was recognized.
    pub fn page(&self) -> Option<PageKind> {
        self.kind
    }

    /// The injected toggle control, once its anchor rendered.
    pub fn control(&self) -> Option<&ControlBinding> {
        match &self.state {
            SessionState::Control(control) => Some(control),
            _ => None,
        }
    }

    /// True while a settings/learn injection is still waiting for its
    /// anchor form.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, SessionState::PendingControl { .. })
    }

    /// Flip the injected control, writing the new value through to the
    /// store. A no-op while the control has not been injected yet.
    pub fn set_control_checked(&mut self, dom: &mut Dom, checked: bool) -> Result<(), Error> {
        match &self.state {
            SessionState::Control(control) => {
                let control = *control;
                control.set_checked(dom, &mut self.pref, checked)
            }
            _ => Ok(()),
        }
    }

    /// The preference this session was attached with.
    pub fn preference(&self) -> &Preference<S> {
        &self.pref
    }

    /// Mutable access to the preference (and its store).
    pub fn preference_mut(&mut self) -> &mut Preference<S> {
        &mut self.pref
    }
}

/// Watch target: `#main` if present, else the body, else the whole tree.
fn watch_target(dom: &Dom) -> NodeId {
    let root = dom.root();
    dom.element_by_id(root, "main")
        .or_else(|| dom.elements_named(root, "body").into_iter().next())
        .unwrap_or(root)
}

/// Sweep scope for the legacy pass: the body, else the whole tree.
fn body_or_root(dom: &Dom) -> NodeId {
    let root = dom.root();
    dom.elements_named(root, "body")
        .into_iter()
        .next()
        .unwrap_or(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, HIDE_KANJI_KEY};

    fn enabled_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.set(HIDE_KANJI_KEY, "true").expect("seed store");
        store
    }

    #[test]
    fn test_unrecognized_location_is_inert() {
        let mut dom = Dom::parse("<body><ruby>\u{6f22}<rt>\u{304b}\u{3093}</rt></ruby></body>".as_bytes())
            .expect("parse");
        let before = dom.to_markup();
        let mut session = Session::attach(&mut dom, "https://jpdb.io/stats", enabled_store());
        session.pump(&mut dom);
        assert_eq!(session.page(), None);
        assert_eq!(dom.to_markup(), before);
    }

    #[test]
    fn test_review_disabled_leaves_tree_untouched() {
        let mut dom = Dom::parse("<body><ruby>\u{6f22}<rt>\u{304b}\u{3093}</rt></ruby></body>".as_bytes())
            .expect("parse");
        let before = dom.to_markup();
        Session::attach(&mut dom, "https://jpdb.io/review", MemoryStore::new());
        assert_eq!(dom.to_markup(), before, "absent key means no rewrite at all");
    }

    #[test]
    fn test_watch_target_prefers_main_then_body() {
        let dom = Dom::parse(b"<body><div id=\"main\"/></body>").expect("parse");
        let main = dom.element_by_id(dom.root(), "main").expect("main");
        assert_eq!(watch_target(&dom), main);

        let dom = Dom::parse(b"<body><div/></body>").expect("parse");
        let body = dom.elements_named(dom.root(), "body")[0];
        assert_eq!(watch_target(&dom), body);

        let dom = Dom::parse(b"<div/>").expect("parse");
        assert_eq!(watch_target(&dom), dom.root());
    }

    #[test]
    fn test_legacy_mode_folds_and_sweeps_without_watcher() {
        let markup = "<body><div id=\"main\">\u{6b8b}\u{308a}<ruby>\u{65e5}<rt>\u{306b}</rt></ruby></div></body>";
        let mut dom = Dom::parse(markup.as_bytes()).expect("parse");
        let options = ReviewOptions {
            sweep_residuals: true,
            ..ReviewOptions::default()
        };
        let session =
            Session::attach_with_options(&mut dom, "https://jpdb.io/review", enabled_store(), options);
        // Reading survives; both the annotated and the stray kanji are gone.
        assert_eq!(
            dom.to_markup(),
            "<body><div id=\"main\">\u{308a}\u{306b}</div></body>"
        );
        assert!(session.control().is_none());
    }
}
