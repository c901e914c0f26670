//! # Vantage Pager - Terminal-Aware Output Paging
//!
//! `vantage-pager` is the screen-overflow layer for interactive consoles:
//! [`term`] detects the terminal dimensions, and [`Pager`] decides when a
//! piece of text no longer fits one screen and hands it to an external
//! pager (`$PAGER`, `less`, `more`) with the text piped to stdin. A
//! built-in screenful pager covers systems with no pager installed.
//!
//! This crate is the paging foundation for the `vantage` pipeline, but can
//! be used on its own.
//!
//! ## Quick Start
//!
//! ```rust
//! use vantage_pager::{PageMode, Pager};
//!
//! let (width, height) = vantage_pager::term::detect_dimensions().unwrap_or((80, 24));
//! let pager = Pager::new(width, height);
//!
//! let report = "one line\n";
//! if pager.activated_by(report, PageMode::Rendered) {
//!     pager.page(report, PageMode::Rendered).ok();
//! }
//! ```
//!
//! ## Measurement Modes
//!
//! Formatted output ([`PageMode::Rendered`]) is measured in lines against
//! the terminal height. Raw inspect text ([`PageMode::Inspect`]) is often a
//! single long line, so it is measured in characters against the whole
//! screen area instead.

pub mod pager;
pub mod term;

pub use pager::{
    MockPagerResult, MockPagerRunner, PageMode, PagedCall, Pager, PagerError, PagerRunner,
    RealPagerRunner,
};
