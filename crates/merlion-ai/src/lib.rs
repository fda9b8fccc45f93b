//! Court classification and the external summarizer client.

pub mod court;
pub mod summarizer;

pub use court::standardize_court_name;
pub use summarizer::{AiError, Summarizer};
