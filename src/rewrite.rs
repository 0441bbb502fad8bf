//! The annotation fold: replace each `<ruby>` construct with the
//! concatenation of its `<rt>` reading text.
//!
//! This is the pass that hides kanji. A ruby construct pairs base text
//! with one or more phonetic readings; folding it keeps only the readings,
//! as a single plain text node in the construct's tree position. The pass
//! is idempotent: each construct is folded at most once, and a pass over
//! an already-folded tree does nothing and produces no mutations — which
//! is what lets the mutation watcher re-run it freely (see
//! [`crate::watch`]).

use smallvec::SmallVec;

use crate::dom::{Dom, NodeId};

/// Marker attribute set on a construct when it is folded. A marked
/// construct is never folded again, even if a stale handle to it is
/// re-enumerated after it was detached from the tree.
pub const PROCESSED_ATTR: &str = "data-ruby-folded";

/// Fold every unprocessed ruby construct under `root`, in document order.
///
/// Each construct is replaced in its parent by one text node holding its
/// reading — the text of its `<rt>` descendants concatenated in document
/// order (empty string if it has none). `<rp>` fallback punctuation is
/// excluded. Returns the number of constructs folded; `0` means the pass
/// changed nothing.
pub fn fold_ruby(dom: &mut Dom, root: NodeId) -> usize {
    let targets: Vec<NodeId> = dom
        .elements_named(root, "ruby")
        .into_iter()
        .filter(|&id| dom.attr(id, PROCESSED_ATTR).is_none())
        .collect();

    let mut folded = 0;
    for ruby in targets {
        // Folding an outer construct detaches anything nested below it.
        if !(ruby == root || dom.is_descendant_of(ruby, root)) || dom.parent(ruby).is_none() {
            continue;
        }
        let mut reading = String::new();
        for rt in reading_fragments(dom, ruby) {
            reading.push_str(&dom.text_content(rt));
        }
        dom.set_attr(ruby, PROCESSED_ATTR, "true");
        if dom.replace_with_text(ruby, reading).is_some() {
            folded += 1;
        }
    }
    if folded > 0 {
        log::debug!("folded {} ruby constructs", folded);
    }
    folded
}

/// Collect the `<rt>` elements of a construct in document order, skipping
/// `<rp>` subtrees and not descending into the readings themselves.
fn reading_fragments(dom: &Dom, ruby: NodeId) -> SmallVec<[NodeId; 4]> {
    let mut fragments = SmallVec::new();
    collect_rt(dom, ruby, &mut fragments);
    fragments
}

fn collect_rt(dom: &Dom, node: NodeId, out: &mut SmallVec<[NodeId; 4]>) {
    for &child in dom.children(node) {
        match dom.name(child) {
            Some("rp") => {}
            Some("rt") => out.push(child),
            _ => collect_rt(dom, child, out),
        }
    }
}
