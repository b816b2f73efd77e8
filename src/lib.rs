#![deny(missing_docs)]

//! Core library for the lecture notes service.

/// HTTP routing and handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Request-level error taxonomy and status mapping.
pub mod error;
/// Text extraction for PDF, DOCX, PPTX, and plain-text uploads.
pub mod extract;
/// Upload admission: authorization, filename sanitation, and size limits.
pub mod ingress;
/// Structured logging and tracing setup.
pub mod logging;
/// ZIP packaging of the rendered documents.
pub mod package;
/// End-to-end notes pipeline shared by the HTTP surface.
pub mod pipeline;
/// Markdown classification and DOCX/PDF rendering.
pub mod render;
/// Completion client and prompt handling.
pub mod summarization;
