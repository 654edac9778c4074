//! Inbound essay submissions and their validation.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::domain::error::{ExaminerError, Result};

/// An uploaded image expected to contain a handwritten or typed essay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: Option<String>,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: Option<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name,
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Reject empty or non-image uploads.
    pub fn validate(&self) -> Result<()> {
        let label = self.file_name.as_deref().unwrap_or("upload");
        if self.bytes.is_empty() {
            return Err(ExaminerError::InvalidInput(format!(
                "uploaded file '{label}' is empty"
            )));
        }
        if !self.content_type.starts_with("image/") {
            return Err(ExaminerError::InvalidInput(format!(
                "uploaded file '{label}' has unsupported content type '{}'",
                self.content_type
            )));
        }
        Ok(())
    }

    /// Encode as a base64 `data:` URL suitable for a vision model.
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// A validated essay ready for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EssayInput {
    Text(String),
    Image(ImageUpload),
    /// Several images; the model picks the single most complete essay.
    Images(Vec<ImageUpload>),
}

impl EssayInput {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            EssayInput::Text(_) => "text",
            EssayInput::Image(_) => "image",
            EssayInput::Images(_) => "images",
        }
    }
}

/// Raw submission as it arrives over the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EssaySubmission {
    pub essay_text: Option<String>,
    pub files: Vec<ImageUpload>,
}

impl EssaySubmission {
    pub fn text(essay_text: impl Into<String>) -> Self {
        Self {
            essay_text: Some(essay_text.into()),
            files: Vec::new(),
        }
    }

    pub fn images(files: Vec<ImageUpload>) -> Self {
        Self {
            essay_text: None,
            files,
        }
    }

    /// Validate the submission and turn it into an [`EssayInput`].
    ///
    /// Text, when present, must be non-blank and takes precedence over
    /// files. With `multi` set, at least one file is required and text is
    /// ignored.
    pub fn into_input(self, multi: bool) -> Result<EssayInput> {
        if multi {
            if self.files.is_empty() {
                return Err(ExaminerError::InvalidInput(
                    "at least one image file is required".to_string(),
                ));
            }
            for file in &self.files {
                file.validate()?;
            }
            return Ok(EssayInput::Images(self.files));
        }

        if let Some(text) = self.essay_text {
            if text.trim().is_empty() {
                return Err(ExaminerError::InvalidInput(
                    "Essay text cannot be empty.".to_string(),
                ));
            }
            return Ok(EssayInput::Text(text));
        }

        let mut files = self.files;
        match files.len() {
            0 => Err(ExaminerError::InvalidInput(
                "Please provide either text or an image.".to_string(),
            )),
            1 => {
                let file = files.remove(0);
                file.validate()?;
                Ok(EssayInput::Image(file))
            }
            _ => {
                for file in &files {
                    file.validate()?;
                }
                Ok(EssayInput::Images(files))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(name: &str) -> ImageUpload {
        ImageUpload::new(Some(name.to_string()), "image/png", vec![0x89, 0x50, 0x4e, 0x47])
    }

    #[test]
    fn test_text_submission_becomes_text_input() {
        let input = EssaySubmission::text("An essay.").into_input(false).unwrap();
        assert_eq!(input, EssayInput::Text("An essay.".to_string()));
    }

    #[test]
    fn test_blank_text_is_rejected() {
        for text in ["", "   ", "\n\t "] {
            let err = EssaySubmission::text(text).into_input(false).unwrap_err();
            assert!(matches!(err, ExaminerError::InvalidInput(_)), "{text:?}");
        }
    }

    #[test]
    fn test_blank_text_is_rejected_even_with_file() {
        let submission = EssaySubmission {
            essay_text: Some("  ".to_string()),
            files: vec![png("a.png")],
        };
        assert!(submission.into_input(false).is_err());
    }

    #[test]
    fn test_nothing_submitted_is_rejected() {
        let err = EssaySubmission::default().into_input(false).unwrap_err();
        assert!(err.to_string().contains("either text or an image"));
    }

    #[test]
    fn test_single_file_becomes_image_input() {
        let input = EssaySubmission::images(vec![png("a.png")])
            .into_input(false)
            .unwrap();
        assert_eq!(input.kind(), "image");
    }

    #[test]
    fn test_multi_requires_files() {
        let err = EssaySubmission::default().into_input(true).unwrap_err();
        assert!(err.to_string().contains("at least one image"));
    }

    #[test]
    fn test_multi_keeps_all_files() {
        let input = EssaySubmission::images(vec![png("a.png"), png("b.png")])
            .into_input(true)
            .unwrap();
        match input {
            EssayInput::Images(files) => assert_eq!(files.len(), 2),
            other => panic!("expected images, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_or_non_image_file_is_rejected() {
        let empty = ImageUpload::new(Some("a.png".into()), "image/png", vec![]);
        assert!(empty.validate().is_err());

        let pdf = ImageUpload::new(Some("a.pdf".into()), "application/pdf", vec![1, 2, 3]);
        let err = pdf.validate().unwrap_err();
        assert!(err.to_string().contains("application/pdf"));
    }

    #[test]
    fn test_data_url_encoding() {
        let image = ImageUpload::new(None, "image/jpeg", b"abc".to_vec());
        assert_eq!(image.to_data_url(), "data:image/jpeg;base64,YWJj");
    }
}
