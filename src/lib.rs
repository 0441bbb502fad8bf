//! Fold ruby annotations into their furigana readings.
//!
//! `ruby-fold` reimplements a review-page augmentation for a Japanese
//! vocabulary site: when the user opts in, every ruby construct (kanji
//! base text with `<rt>` readings) on the review page is replaced in
//! place by its reading, content loaded asynchronously after the first
//! pass included. The opt-in is a single persisted boolean, toggled by a
//! checkbox the crate injects into the settings and learn pages.
//!
//! The page environment is modeled explicitly: markup is parsed into an
//! arena [`Dom`] whose child-list mutations are journaled, a
//! [`watch::MutationWatcher`] replays the fold over asynchronously added
//! content as a bounded fixed point, and storage is any [`KvStore`]
//! (in-memory, or a JSON file surviving across sessions).
//!
//! # Usage
//!
//! ```rust
//! use ruby_fold::{Dom, MemoryStore, Preference, Session};
//!
//! # fn example() -> Result<(), ruby_fold::Error> {
//! let mut pref = Preference::new(MemoryStore::new());
//! pref.set(true)?;
//!
//! let page = "<body><div id=\"main\">\
//!     <ruby>\u{65e5}\u{672c}\u{8a9e}<rt>\u{306b}</rt><rt>\u{307b}\u{3093}</rt><rt>\u{3054}</rt></ruby>\
//!     </div></body>";
//! let mut dom = Dom::parse(page.as_bytes())?;
//!
//! let mut session = Session::attach(&mut dom, "https://jpdb.io/review", pref.into_inner());
//! assert!(dom.to_markup().contains("\u{306b}\u{307b}\u{3093}\u{3054}"));
//!
//! // Later content loads are folded by pumping the session.
//! session.pump(&mut dom);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

#![cfg_attr(
    not(test),
    deny(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::todo,
        clippy::unimplemented
    )
)]

pub mod classify;
pub mod dom;
pub mod error;
pub mod inject;
pub mod page;
pub mod rewrite;
pub mod store;
pub mod sweep;
pub mod watch;

pub use classify::{classify, PageKind};
pub use dom::{Dom, DomLimits, MutationKind, MutationRecord, NodeId};
pub use error::Error;
pub use inject::ControlBinding;
pub use page::{ReviewOptions, Session};
pub use rewrite::fold_ruby;
pub use store::{JsonFileStore, KvStore, MemoryStore, Preference, HIDE_KANJI_KEY};
pub use sweep::{is_kanji, sweep};
pub use watch::{MutationWatcher, WatchLimits};
