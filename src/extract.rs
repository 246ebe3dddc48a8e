use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::model::Syllabus;

/// Extensions accepted by the upload picker.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md", "pdf", "doc", "docx"];

fn check_extension(name: &str) -> Result<(), ExtractionError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if SUPPORTED_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => {
            warn!(document = name, "Rejected document with unsupported extension");
            Err(ExtractionError::UnsupportedType(name.to_string()))
        }
    }
}

/// Read the raw text of an uploaded document.
///
/// The whole reader is consumed and decoded as UTF-8. Binary formats that do not
/// decode are reported as `NotUtf8`; no format-specific parsing is attempted.
pub async fn extract_text<R>(name: &str, mut reader: R) -> Result<Syllabus, ExtractionError>
where
    R: AsyncRead + Unpin,
{
    check_extension(name)?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    debug!(document = name, bytes = bytes.len(), "Read document");

    let text = String::from_utf8(bytes)?;
    if text.trim().is_empty() {
        return Err(ExtractionError::Empty);
    }

    info!(document = name, chars = text.chars().count(), "Extracted syllabus text");
    Ok(Syllabus::new(name, text))
}

/// Open `path` and extract its text, using the file name as the display name.
pub async fn extract_file(path: impl AsRef<Path>) -> Result<Syllabus, ExtractionError> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let file = fs::File::open(path).await?;
    extract_text(&name, file).await
}
