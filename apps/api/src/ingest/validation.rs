use bytes::Bytes;
use thiserror::Error;

use crate::ingest::extract::ExtractedDocument;
use crate::ingest::format::DocumentKind;

/// Upload ceiling per artifact: 10 MiB. An artifact of exactly this size passes.
pub const MAX_ARTIFACT_BYTES: usize = 10 * 1024 * 1024;

/// A user-submitted file, fully buffered. Declared length is the buffer length.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadedArtifact {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }
}

/// An artifact that passed the gate, tagged with its resolved kind.
#[derive(Debug, Clone)]
pub struct ValidatedArtifact {
    pub name: String,
    pub bytes: Bytes,
    pub kind: DocumentKind,
}

#[derive(Debug, Clone)]
pub struct ValidatedPair {
    pub resume: ValidatedArtifact,
    pub job: ValidatedArtifact,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Both resume and job description files are required (missing: {missing})")]
    MissingInput { missing: String },

    #[error("File '{name}' is {size} bytes, which exceeds the maximum limit of 10MB")]
    PayloadTooLarge { name: String, size: usize },

    #[error("Invalid file type for '{name}'. Only PDF, DOCX and TXT files are supported")]
    UnsupportedFormat { name: String },

    #[error("Could not extract text from {names}. Please ensure the files contain readable text")]
    UnreadableContent { names: String },
}

/// Upload preconditions, short-circuiting on the first failing check:
/// both present, then both within the size ceiling, then both of a supported kind.
pub fn validate_uploads(
    resume: Option<UploadedArtifact>,
    job: Option<UploadedArtifact>,
) -> Result<ValidatedPair, ValidationError> {
    let (resume, job) = match (resume, job) {
        (Some(r), Some(j)) => (r, j),
        (r, j) => {
            let missing = [(r.is_none(), "resume"), (j.is_none(), "jobDescription")]
                .into_iter()
                .filter_map(|(absent, field)| absent.then_some(field))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ValidationError::MissingInput { missing });
        }
    };

    for artifact in [&resume, &job] {
        if artifact.len() > MAX_ARTIFACT_BYTES {
            return Err(ValidationError::PayloadTooLarge {
                name: artifact.name.clone(),
                size: artifact.len(),
            });
        }
    }

    Ok(ValidatedPair {
        resume: classify(resume)?,
        job: classify(job)?,
    })
}

fn classify(artifact: UploadedArtifact) -> Result<ValidatedArtifact, ValidationError> {
    let kind = DocumentKind::from_file_name(&artifact.name).ok_or_else(|| {
        ValidationError::UnsupportedFormat {
            name: artifact.name.clone(),
        }
    })?;
    Ok(ValidatedArtifact {
        name: artifact.name,
        bytes: artifact.bytes,
        kind,
    })
}

/// Extraction postcondition: both texts must be non-empty after trimming.
pub fn require_readable(
    resume: (&str, &ExtractedDocument),
    job: (&str, &ExtractedDocument),
) -> Result<(), ValidationError> {
    let blank: Vec<&str> = [resume, job]
        .into_iter()
        .filter(|(_, doc)| doc.is_blank())
        .map(|(name, _)| name)
        .collect();
    if blank.is_empty() {
        return Ok(());
    }
    Err(ValidationError::UnreadableContent {
        names: blank.join(" and "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str, len: usize) -> UploadedArtifact {
        UploadedArtifact::new(name, vec![b'a'; len])
    }

    #[test]
    fn test_valid_pair_is_tagged() {
        let pair =
            validate_uploads(Some(artifact("cv.pdf", 10)), Some(artifact("jd.txt", 10))).unwrap();
        assert_eq!(pair.resume.kind, DocumentKind::Pdf);
        assert_eq!(pair.job.kind, DocumentKind::PlainText);
        assert_eq!(pair.resume.name, "cv.pdf");
    }

    #[test]
    fn test_missing_inputs_are_named() {
        let err = validate_uploads(None, Some(artifact("jd.txt", 1))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingInput {
                missing: "resume".to_string()
            }
        );

        let err = validate_uploads(None, None).unwrap_err();
        assert!(err.to_string().contains("resume, jobDescription"));
    }

    #[test]
    fn test_size_ceiling_is_inclusive() {
        let ok = validate_uploads(
            Some(artifact("cv.txt", MAX_ARTIFACT_BYTES)),
            Some(artifact("jd.txt", 1)),
        );
        assert!(ok.is_ok());

        let err = validate_uploads(
            Some(artifact("cv.txt", 1)),
            Some(artifact("jd.txt", MAX_ARTIFACT_BYTES + 1)),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::PayloadTooLarge { ref name, .. } if name == "jd.txt"));
    }

    #[test]
    fn test_size_is_checked_before_format() {
        // oversized resume with a bad extension reports size, not format
        let err = validate_uploads(
            Some(artifact("cv.exe", MAX_ARTIFACT_BYTES + 1)),
            Some(artifact("jd.txt", 1)),
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let err =
            validate_uploads(Some(artifact("cv.pdf", 1)), Some(artifact("jd.exe", 1))).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedFormat {
                name: "jd.exe".to_string()
            }
        );
    }

    #[test]
    fn test_require_readable_names_blank_documents() {
        let full = ExtractedDocument {
            kind: DocumentKind::PlainText,
            text: "Rust".to_string(),
        };
        let blank = ExtractedDocument {
            kind: DocumentKind::Pdf,
            text: " \n\t ".to_string(),
        };

        assert!(require_readable(("cv.txt", &full), ("jd.txt", &full)).is_ok());

        let err = require_readable(("cv.pdf", &blank), ("jd.txt", &full)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnreadableContent {
                names: "cv.pdf".to_string()
            }
        );

        let err = require_readable(("cv.pdf", &blank), ("jd.pdf", &blank)).unwrap_err();
        assert!(err.to_string().contains("cv.pdf and jd.pdf"));
    }
}
