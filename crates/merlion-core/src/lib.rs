pub mod config;
pub mod model;
pub mod sort_key;

pub use config::{Config, RetryPolicy};
pub use model::{
    Case, Document, DocumentKind, JobStatus, NewCase, NewDocument, NewSection, UrlOutcome,
};
pub use sort_key::{SectionKey, section_sort_key};
