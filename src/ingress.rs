//! Upload admission: shared-secret check, filename sanitation, and size/count ceilings.
//!
//! Parts are admitted while the multipart body streams in. A file count overflow is rejected
//! before the extra part is read; size overflows are counted to the end of the body without
//! keeping the bytes, then reported.

use crate::error::NotesError;
use axum::extract::Multipart;
use axum::http::HeaderMap;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::LazyLock;

/// Header carrying the optional shared secret.
pub const SECRET_HEADER: &str = "x-backend-secret";

const MAX_FILENAME_CHARS: usize = 120;
const FALLBACK_FILENAME: &str = "file";
const BYTES_PER_MB: u64 = 1024 * 1024;

static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9._-]+").expect("valid filename regex"));

/// A single uploaded file with its sanitized name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Sanitized filename used for dispatch and labeling.
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Build an upload, sanitizing the supplied name.
    pub fn new(raw_name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: sanitize_filename(raw_name),
            bytes,
        }
    }
}

/// Count and size ceilings applied to one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Maximum number of files per request.
    pub max_files: usize,
    /// Per-file ceiling in bytes.
    pub max_file_bytes: u64,
    /// Aggregate ceiling in bytes.
    pub max_total_bytes: u64,
}

impl UploadLimits {
    /// Build limits from megabyte values as they appear in configuration.
    pub fn from_megabytes(max_files: usize, max_mb_per_file: u64, max_total_mb: u64) -> Self {
        Self {
            max_files,
            max_file_bytes: max_mb_per_file.saturating_mul(BYTES_PER_MB),
            max_total_bytes: max_total_mb.saturating_mul(BYTES_PER_MB),
        }
    }

    /// Ceiling for the raw request body: the aggregate limit plus multipart framing slack.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_total_bytes.saturating_add(BYTES_PER_MB)).unwrap_or(usize::MAX)
    }

    fn max_file_mb(&self) -> u64 {
        self.max_file_bytes / BYTES_PER_MB
    }

    fn max_total_mb(&self) -> u64 {
        self.max_total_bytes / BYTES_PER_MB
    }
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self::from_megabytes(10, 25, 50)
    }
}

/// Reject the request unless the configured shared secret was presented.
///
/// With no secret configured every caller is accepted.
pub fn authorize(headers: &HeaderMap, shared_secret: Option<&str>) -> Result<(), NotesError> {
    let Some(expected) = shared_secret else {
        return Ok(());
    };
    let presented = headers
        .get(SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if secrets_match(presented, expected) {
        Ok(())
    } else {
        Err(NotesError::Unauthorized)
    }
}

/// Compare fixed-length digests so the time taken does not depend on where the inputs differ.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let presented = Sha256::digest(presented.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    presented
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Replace characters outside `[A-Za-z0-9._-]` with `_` and bound the length.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_CHARS.replace_all(name, "_");
    let truncated: String = cleaned.chars().take(MAX_FILENAME_CHARS).collect();
    if truncated.is_empty() {
        FALLBACK_FILENAME.to_string()
    } else {
        truncated
    }
}

/// Incremental admission of uploaded parts against [`UploadLimits`].
///
/// Limits are reported in a fixed order regardless of where in the stream they are broken: file
/// count first, then the first oversized file, then the aggregate. Once a size limit is broken the
/// remaining bytes are only counted, never kept.
#[derive(Debug)]
pub struct UploadCollector {
    limits: UploadLimits,
    files: Vec<UploadedFile>,
    current_bytes: u64,
    total_bytes: u64,
    oversized: Option<String>,
}

impl UploadCollector {
    /// Start collecting under the given limits.
    pub fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            files: Vec::new(),
            current_bytes: 0,
            total_bytes: 0,
            oversized: None,
        }
    }

    /// Open a new file part. Fails before any of its bytes are read when the count is exceeded.
    pub fn begin_file(&mut self, raw_name: &str) -> Result<(), NotesError> {
        if self.files.len() >= self.limits.max_files {
            return Err(NotesError::TooManyFiles {
                max: self.limits.max_files,
            });
        }
        self.files.push(UploadedFile::new(raw_name, Vec::new()));
        self.current_bytes = 0;
        Ok(())
    }

    /// Account for bytes of the most recently opened file.
    pub fn append(&mut self, chunk: &[u8]) {
        let Some(current) = self.files.last_mut() else {
            return;
        };
        let chunk_len = chunk.len() as u64;
        self.current_bytes += chunk_len;
        self.total_bytes += chunk_len;

        if self.oversized.is_none() && self.current_bytes > self.limits.max_file_bytes {
            self.oversized = Some(current.name.clone());
        }
        let violated =
            self.oversized.is_some() || self.total_bytes > self.limits.max_total_bytes;
        if violated {
            for file in &mut self.files {
                file.bytes = Vec::new();
            }
        } else {
            current.bytes.extend_from_slice(chunk);
        }
    }

    /// A size ceiling has been broken; the request will fail at [`finish`](Self::finish).
    pub fn has_violation(&self) -> bool {
        self.oversized.is_some() || self.total_bytes > self.limits.max_total_bytes
    }

    /// Finish collection, reporting the highest-precedence size violation or an empty upload.
    pub fn finish(self) -> Result<Vec<UploadedFile>, NotesError> {
        if let Some(error) = self.size_violation() {
            return Err(error);
        }
        if self.files.is_empty() {
            return Err(NotesError::NoFiles);
        }
        Ok(self.files)
    }

    fn size_violation(&self) -> Option<NotesError> {
        if let Some(name) = &self.oversized {
            return Some(NotesError::FileTooLarge {
                name: name.clone(),
                max_mb: self.limits.max_file_mb(),
            });
        }
        (self.total_bytes > self.limits.max_total_bytes).then(|| NotesError::TotalTooLarge {
            max_mb: self.limits.max_total_mb(),
        })
    }
}

/// Drain a multipart body into admitted uploads.
///
/// Parts with a filename are uploads; plain form fields are skipped. A body cut short by the
/// transport limit after a size ceiling was already broken reports that ceiling.
pub async fn read_multipart(
    mut multipart: Multipart,
    limits: UploadLimits,
) -> Result<Vec<UploadedFile>, NotesError> {
    let mut collector = UploadCollector::new(limits);

    loop {
        let mut field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => return Err(stream_error(collector, error)),
        };
        let Some(file_name) = field.file_name().map(str::to_string) else {
            tracing::debug!(field = ?field.name(), "Skipping non-file form field");
            continue;
        };
        collector.begin_file(&file_name)?;
        loop {
            match field.chunk().await {
                Ok(Some(chunk)) => collector.append(&chunk),
                Ok(None) => break,
                Err(error) => return Err(stream_error(collector, error)),
            }
        }
    }

    collector.finish()
}

fn stream_error(
    collector: UploadCollector,
    error: axum::extract::multipart::MultipartError,
) -> NotesError {
    collector
        .size_violation()
        .unwrap_or_else(|| multipart_error(error))
}

fn multipart_error(error: axum::extract::multipart::MultipartError) -> NotesError {
    NotesError::Multipart {
        status: error.status(),
        message: error.body_text(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn tiny_limits() -> UploadLimits {
        UploadLimits {
            max_files: 2,
            max_file_bytes: 10,
            max_total_bytes: 15,
        }
    }

    #[test]
    fn sanitize_filename_replaces_runs_and_truncates() {
        assert_eq!(sanitize_filename("Week 1 – Intro!.pdf"), "Week_1_Intro_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), ".._.._etc_passwd");
        assert_eq!(sanitize_filename(""), "file");
        let long = "a".repeat(300);
        assert_eq!(sanitize_filename(&long).len(), 120);
    }

    #[test]
    fn authorize_accepts_everyone_without_secret() {
        assert!(authorize(&HeaderMap::new(), None).is_ok());
    }

    #[test]
    fn authorize_requires_matching_header() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            authorize(&headers, Some("s3cret")),
            Err(NotesError::Unauthorized)
        ));
        headers.insert(SECRET_HEADER, HeaderValue::from_static("wrong"));
        assert!(matches!(
            authorize(&headers, Some("s3cret")),
            Err(NotesError::Unauthorized)
        ));
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));
        assert!(authorize(&headers, Some("s3cret")).is_ok());
    }

    #[test]
    fn secret_comparison_rejects_prefixes_and_extensions() {
        assert!(secrets_match("s3cret", "s3cret"));
        assert!(!secrets_match("s3cre", "s3cret"));
        assert!(!secrets_match("s3cret!", "s3cret"));
        assert!(!secrets_match("", "s3cret"));
    }

    #[test]
    fn collector_rejects_extra_file_before_reading_it() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.begin_file("b.txt").unwrap();
        let error = collector.begin_file("c.txt").unwrap_err();
        assert!(matches!(error, NotesError::TooManyFiles { max: 2 }));
    }

    #[test]
    fn collector_names_the_oversized_file() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("big deck.pptx").unwrap();
        collector.append(b"12345");
        collector.append(b"678901");
        assert!(collector.has_violation());
        let error = collector.finish().unwrap_err();
        assert!(matches!(error, NotesError::FileTooLarge { ref name, .. } if name == "big_deck.pptx"));
    }

    #[test]
    fn collector_enforces_aggregate_ceiling() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.append(b"123456789");
        collector.begin_file("b.txt").unwrap();
        collector.append(b"1234567");
        let error = collector.finish().unwrap_err();
        assert!(matches!(error, NotesError::TotalTooLarge { .. }));
    }

    #[test]
    fn oversized_file_wins_over_aggregate() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.append(b"123456789");
        collector.begin_file("b.txt").unwrap();
        collector.append(b"1234567");
        collector.append(b"89012");
        let error = collector.finish().unwrap_err();
        assert!(matches!(error, NotesError::FileTooLarge { ref name, .. } if name == "b.txt"));
    }

    #[test]
    fn file_count_wins_over_earlier_size_violation() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.append(&[0; 64]);
        collector.begin_file("b.txt").unwrap();
        let error = collector.begin_file("c.txt").unwrap_err();
        assert!(matches!(error, NotesError::TooManyFiles { max: 2 }));
    }

    #[test]
    fn bytes_after_a_violation_are_not_kept() {
        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.append(&[1; 11]);
        collector.begin_file("b.txt").unwrap();
        collector.append(b"abc");
        assert!(collector.files.iter().all(|file| file.bytes.is_empty()));

        let mut collector = UploadCollector::new(tiny_limits());
        collector.begin_file("a.txt").unwrap();
        collector.append(b"123456789");
        collector.begin_file("b.txt").unwrap();
        collector.append(b"1234567");
        assert!(collector.files.iter().all(|file| file.bytes.is_empty()));
    }

    #[test]
    fn collector_requires_a_file() {
        let collector = UploadCollector::new(tiny_limits());
        assert!(matches!(collector.finish(), Err(NotesError::NoFiles)));
    }

    #[test]
    fn collector_preserves_order_and_content() {
        let mut collector = UploadCollector::new(UploadLimits::default());
        collector.begin_file("one.txt").unwrap();
        collector.append(b"alpha");
        collector.begin_file("two.md").unwrap();
        collector.append(b"be");
        collector.append(b"ta");
        let files = collector.finish().unwrap();
        assert_eq!(
            files,
            vec![
                UploadedFile::new("one.txt", b"alpha".to_vec()),
                UploadedFile::new("two.md", b"beta".to_vec()),
            ]
        );
    }
}
