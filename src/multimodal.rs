//! Multimodal user messages: a question plus one image.
//!
//! Images are passed through untouched. Remote URLs are forwarded as-is and
//! raw bytes are wrapped in a `data:` URI; size and format checks are left to
//! the model API.

use std::path::{Path, PathBuf};

use base64::Engine;
use bytes::Bytes;
use thiserror::Error;

use crate::llm::{ChatMessage, ContentPart};

/// Question used when the user attaches an image without asking anything.
pub const DEFAULT_IMAGE_QUESTION: &str = "Please describe this image.";

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the image comes from.
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Remote image URL.
    Url(String),
    /// Raw image bytes with their declared MIME type.
    Bytes { data: Bytes, mime_type: String },
}

impl ImageSource {
    /// URL to hand to the model: the URL itself or a `data:` URI.
    pub fn to_url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Bytes { data, mime_type } => data_uri(data, mime_type),
        }
    }
}

/// Build a user message with the question first and the image second.
pub fn build_image_message(question: &str, source: &ImageSource) -> ChatMessage {
    let question = if question.trim().is_empty() {
        DEFAULT_IMAGE_QUESTION
    } else {
        question
    };

    ChatMessage::user_parts(vec![
        ContentPart::text(question),
        ContentPart::image(source.to_url()),
    ])
}

/// Read a local image and build a message from it.
///
/// Fails with [`ImageError::FileNotFound`] before anything is sent anywhere
/// when `path` does not exist.
pub async fn image_message_from_file(
    question: &str,
    path: impl AsRef<Path>,
) -> Result<ChatMessage, ImageError> {
    let path = path.as_ref();
    let data = match tokio::fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ImageError::FileNotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ImageError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    let source = ImageSource::Bytes {
        data: Bytes::from(data),
        mime_type: mime_from_path(path).to_string(),
    };
    Ok(build_image_message(question, &source))
}

/// MIME type from a file extension; unknown extensions are treated as JPEG.
pub fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

/// Encode bytes as a base64 `data:` URI.
pub fn data_uri(data: &[u8], mime_type: &str) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(data)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MessageContent, Role};
    use std::io::Write;

    fn parts(msg: &ChatMessage) -> Vec<ContentPart> {
        match msg.content.clone() {
            Some(MessageContent::Parts(parts)) => parts,
            other => panic!("expected parts, got {other:?}"),
        }
    }

    #[test]
    fn url_message_keeps_text_before_image() {
        let msg = build_image_message(
            "What breed is this?",
            &ImageSource::Url("https://example.com/dog.jpg".to_string()),
        );

        assert_eq!(msg.role, Role::User);
        assert_eq!(
            parts(&msg),
            vec![
                ContentPart::text("What breed is this?"),
                ContentPart::image("https://example.com/dog.jpg"),
            ]
        );
    }

    #[test]
    fn blank_question_uses_default() {
        let msg = build_image_message("  ", &ImageSource::Url("https://x/y.png".to_string()));
        assert_eq!(parts(&msg)[0], ContentPart::text(DEFAULT_IMAGE_QUESTION));
    }

    #[test]
    fn bytes_become_data_uri() {
        let source = ImageSource::Bytes {
            data: Bytes::from_static(b"hello"),
            mime_type: "image/png".to_string(),
        };
        assert_eq!(source.to_url(), "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn mime_types_follow_extension() {
        assert_eq!(mime_from_path(Path::new("a.PNG")), "image/png");
        assert_eq!(mime_from_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_from_path(Path::new("a.gif")), "image/gif");
        assert_eq!(mime_from_path(Path::new("a.bmp")), "image/jpeg");
        assert_eq!(mime_from_path(Path::new("noext")), "image/jpeg");
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.png");

        let err = image_message_from_file("what?", &path).await.unwrap_err();
        assert!(matches!(err, ImageError::FileNotFound(p) if p == path));
    }

    #[tokio::test]
    async fn file_is_encoded_inline() {
        let mut file = tempfile::Builder::new().suffix(".gif").tempfile().unwrap();
        file.write_all(b"GIF89a").unwrap();

        let msg = image_message_from_file("what?", file.path()).await.unwrap();
        assert_eq!(
            parts(&msg)[1],
            ContentPart::image("data:image/gif;base64,R0lGODlh")
        );
    }
}
