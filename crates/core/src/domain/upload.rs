use crate::error::ClientError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Opaque identifier the backend issues for an uploaded statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A statement picked by the user, plus the server id once it has been uploaded.
#[derive(Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub file_id: Option<FileId>,
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .field("size", &self.size())
            .field("file_id", &self.file_id)
            .finish()
    }
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            content,
            file_id: None,
        }
    }

    /// Read a statement from disk, guessing its MIME type from the extension.
    ///
    /// Type and size are checked against the file's metadata first, so a file
    /// that would be rejected is never read into memory.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ClientError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "statement.pdf".to_string());
        let mime_type = mime_type_for(path);

        let size = tokio::fs::metadata(path).await?.len();
        check_upload(&name, mime_type, size)?;

        let content = tokio::fs::read(path).await?;
        Ok(Self::new(name, mime_type, content))
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        check_upload(&self.name, &self.mime_type, self.size())
    }
}

fn check_upload(name: &str, mime_type: &str, size: u64) -> Result<(), ClientError> {
    if mime_type != PDF_MIME_TYPE {
        return Err(ClientError::Validation(format!(
            "'{name}' is not a PDF file (got {mime_type})"
        )));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(format!(
            "'{name}' is {:.1} MB; the limit is 10 MB",
            size as f64 / (1024.0 * 1024.0)
        )));
    }
    Ok(())
}

fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => PDF_MIME_TYPE,
        Some("csv") => "text/csv",
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_pdf_at_the_limit() {
        let file = UploadedFile::new("a.pdf", PDF_MIME_TYPE, vec![0; MAX_UPLOAD_BYTES as usize]);
        assert!(file.validate().is_ok());
    }

    #[test]
    fn rejects_oversized_pdf() {
        let file = UploadedFile::new(
            "big.pdf",
            PDF_MIME_TYPE,
            vec![0; MAX_UPLOAD_BYTES as usize + 1],
        );
        let err = file.validate().unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(err.to_string().contains("10 MB"));
    }

    #[test]
    fn rejects_non_pdf() {
        let file = UploadedFile::new("s.csv", "text/csv", b"a,b".to_vec());
        assert!(matches!(file.validate(), Err(ClientError::Validation(_))));
    }

    #[test]
    fn mime_type_follows_extension() {
        assert_eq!(mime_type_for(Path::new("x/Statement.PDF")), PDF_MIME_TYPE);
        assert_eq!(mime_type_for(Path::new("x/data.csv")), "text/csv");
        assert_eq!(mime_type_for(Path::new("noext")), "application/octet-stream");
    }

    fn scratch_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("aicc-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn from_path_rejects_oversized_file_from_metadata() {
        let path = scratch_path("huge.pdf");
        // Sparse on most filesystems: the length is set without writing data.
        let file = std::fs::File::create(&path).unwrap();
        file.set_len(4 * 1024 * 1024 * 1024).unwrap();
        drop(file);

        let res = UploadedFile::from_path(&path).await;
        std::fs::remove_file(&path).unwrap();

        let err = res.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert!(err.to_string().contains("10 MB"));
    }

    #[tokio::test]
    async fn from_path_rejects_non_pdf_before_reading() {
        let path = scratch_path("export.csv");
        std::fs::write(&path, b"date,amount\n").unwrap();

        let res = UploadedFile::from_path(&path).await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(res, Err(ClientError::Validation(ref m)) if m.contains("not a PDF")));
    }

    #[tokio::test]
    async fn from_path_reads_valid_pdf() {
        let path = scratch_path("statement.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let res = UploadedFile::from_path(&path).await;
        std::fs::remove_file(&path).unwrap();

        let file = res.unwrap();
        assert_eq!(file.mime_type, PDF_MIME_TYPE);
        assert_eq!(file.content, b"%PDF-1.7");
        assert!(file.name.ends_with("statement.pdf"));
    }

    #[tokio::test]
    async fn from_path_reports_missing_file() {
        let err = UploadedFile::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io(_)));
    }
}
