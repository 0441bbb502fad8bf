//! Residual-glyph sweep: strip kanji that appear outside any ruby
//! construct.
//!
//! This is the legacy companion to [`fold_ruby`](crate::rewrite::fold_ruby)
//! from before per-construct processed markers existed. It is destructive
//! by contract: it deletes EVERY matching character from every text node
//! under the root, including meaningful unannotated prose — for example a
//! construct's base text rendered as a sibling text node rather than
//! inside the construct. It is off by default and only runs when
//! [`ReviewOptions::sweep_residuals`](crate::page::ReviewOptions) is set.

use crate::dom::{Dom, NodeId};

/// True for characters in the CJK Unified Ideographs block (U+4E00..=U+9FAF
/// as the original range was drawn) and Extension A (U+3400..=U+4DBF).
pub fn is_kanji(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FAF}' | '\u{3400}'..='\u{4DBF}')
}

/// Strip every kanji character from every text node under `root`,
/// preserving all other characters and their order. Returns the number of
/// characters removed. Nodes without kanji are untouched.
pub fn sweep(dom: &mut Dom, root: NodeId) -> usize {
    let text_nodes: Vec<NodeId> = dom
        .descendants(root)
        .into_iter()
        .filter(|&id| dom.text(id).is_some())
        .collect();

    let mut removed = 0;
    for id in text_nodes {
        let Some(raw) = dom.text(id) else { continue };
        if !raw.chars().any(is_kanji) {
            continue;
        }
        let kept: String = raw.chars().filter(|&c| !is_kanji(c)).collect();
        removed += raw.chars().count() - kept.chars().count();
        dom.set_text(id, kept);
    }
    if removed > 0 {
        log::debug!("swept {} residual kanji characters", removed);
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_kanji_ranges() {
        assert!(is_kanji('\u{4E00}'));
        assert!(is_kanji('\u{9FAF}'));
        assert!(is_kanji('\u{3400}'));
        assert!(is_kanji('\u{4DBF}'));
        assert!(is_kanji('\u{6f22}'));
        assert!(!is_kanji('\u{9FB0}'), "above the original upper bound");
        assert!(!is_kanji('\u{306b}'), "hiragana is not swept");
        assert!(!is_kanji('\u{30cb}'), "katakana is not swept");
        assert!(!is_kanji('a'));
    }

    #[test]
    fn test_sweep_strips_kanji_preserving_everything_else() {
        let mut dom = Dom::parse("<p>Hello \u{4e16}\u{754c} test</p>".as_bytes()).expect("parse");
        let root = dom.root();
        assert_eq!(sweep(&mut dom, root), 2);
        assert_eq!(dom.to_markup(), "<p>Hello  test</p>");
    }

    #[test]
    fn test_sweep_is_noop_without_kanji() {
        let mut dom = Dom::parse(b"<p>plain <b>text</b> only</p>").expect("parse");
        let root = dom.root();
        let before = dom.to_markup();
        assert_eq!(sweep(&mut dom, root), 0);
        assert_eq!(dom.to_markup(), before);
    }

    #[test]
    fn test_sweep_keeps_kana_readings() {
        let mut dom =
            Dom::parse("<div>\u{306b}\u{307b}\u{3093}\u{3054} \u{65e5}\u{672c}\u{8a9e}</div>".as_bytes())
                .expect("parse");
        let root = dom.root();
        assert_eq!(sweep(&mut dom, root), 3);
        assert_eq!(dom.to_markup(), "<div>\u{306b}\u{307b}\u{3093}\u{3054} </div>");
    }

    #[test]
    fn test_sweep_does_not_journal_text_edits() {
        let mut dom = Dom::parse("<p>\u{6f22}</p>".as_bytes()).expect("parse");
        let root = dom.root();
        let baseline = dom.journal_len();
        sweep(&mut dom, root);
        assert_eq!(dom.journal_len(), baseline);
    }
}
