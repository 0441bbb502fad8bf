//! Mutation watching and fixed-point re-application.
//!
//! The host page loads review items asynchronously, so a single fold pass
//! at attach time is not enough. A [`MutationWatcher`] reads the tree's
//! child-list journal from a cursor and reports whether anything was added
//! under its target subtree. [`drive`] then re-runs a pass until the
//! watcher goes quiet: the pass's own node replacements are themselves
//! journaled additions, so the chain terminates only because a repeat pass
//! over folded content changes nothing. Termination is the pass's
//! idempotence made explicit, not an artifact of notification batching;
//! [`WatchLimits::max_passes`] is a backstop for non-idempotent passes.

use crate::dom::{Dom, MutationKind, NodeId};

/// Limits for fixed-point iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WatchLimits {
    /// Maximum pass invocations per [`drive`] call.
    pub max_passes: usize,
}

impl Default for WatchLimits {
    fn default() -> Self {
        Self { max_passes: 32 }
    }
}

/// Observer of child-list additions under a target subtree.
///
/// Armed at most once per review session and never torn down; its lifetime
/// is the page's lifetime.
#[derive(Clone, Copy, Debug)]
pub struct MutationWatcher {
    target: NodeId,
    cursor: usize,
}

impl MutationWatcher {
    /// Arm a watcher on `target`, seeing only mutations from now on.
    pub fn arm(dom: &Dom, target: NodeId) -> Self {
        Self {
            target,
            cursor: dom.journal_len(),
        }
    }

    /// The watched subtree root.
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Consume journal entries since the last poll; true iff any of them
    /// added a node at or under the target.
    pub fn poll(&mut self, dom: &Dom) -> bool {
        let fresh = &dom.journal()[self.cursor..];
        self.cursor = dom.journal_len();
        fresh.iter().any(|m| {
            m.kind == MutationKind::Added
                && (m.target == self.target || dom.is_descendant_of(m.target, self.target))
        })
    }
}

/// Re-run `pass` while the watcher keeps seeing qualifying additions,
/// up to `limits.max_passes`. Returns the number of pass invocations.
pub fn drive(
    dom: &mut Dom,
    watcher: &mut MutationWatcher,
    limits: WatchLimits,
    mut pass: impl FnMut(&mut Dom),
) -> usize {
    let mut passes = 0;
    while watcher.poll(dom) {
        if passes >= limits.max_passes {
            log::warn!(
                "watch pass count exceeds max_passes ({}); leaving subtree as-is",
                limits.max_passes
            );
            break;
        }
        pass(dom);
        passes += 1;
    }
    passes
}
