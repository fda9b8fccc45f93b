//! Pure HTML parsing for statute and subsidiary-legislation pages.
//!
//! No I/O happens here: callers fetch the pages and hand the raw HTML in.
//! Malformed input never aborts a parse — missing structure degrades to
//! best-effort fallbacks and accumulates warnings on the result.

pub mod meta;
pub mod section;
mod text;

pub use meta::{ActPage, LazyLoadConfig, SlPage, extract_listing_paths, parse_act_page, parse_sl_page};
pub use section::{ParsedSections, extract_sections};
