//! Request pipeline: extraction, summarization, rendering, and packaging.

mod service;

pub use service::{NotesApi, NotesService};
