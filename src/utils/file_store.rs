use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64_STANDARD};
use std::path::{Path, PathBuf};
use strum_macros::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::error::AppError;

/// Sub-directory an upload lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum FileKind {
    CheckIn,
    CheckOut,
    Attachment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageFormat {
    Jpeg,
    Png,
    Pdf,
}

impl ImageFormat {
    fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(b"%PDF-") {
            Some(Self::Pdf)
        } else {
            None
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Pdf => "pdf",
        }
    }

    pub fn content_type(extension: &str) -> &'static str {
        match extension {
            "jpg" => "image/jpeg",
            "png" => "image/png",
            "pdf" => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

/// Decoded upload ready to be written.
#[derive(Debug)]
pub struct DecodedFile {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

/// Stores photos and leave attachments on local disk under `root`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    /// Decodes a base64 payload (optionally a `data:` URL) and checks its
    /// size and type. Photos must be JPEG or PNG; attachments may also be PDF.
    pub fn decode(&self, kind: FileKind, encoded: &str) -> Result<DecodedFile, AppError> {
        let payload = match encoded.split_once(";base64,") {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => encoded,
        };

        let payload = payload.trim();
        if payload.is_empty() {
            return Err(AppError::BadRequest("File content is empty".into()));
        }
        // base64 is 4/3 the size of its content
        if payload.len() / 4 * 3 > self.max_bytes + 3 {
            return Err(AppError::BadRequest(format!(
                "File exceeds {} bytes",
                self.max_bytes
            )));
        }

        let bytes = BASE64_STANDARD
            .decode(payload)
            .map_err(|_| AppError::BadRequest("File is not valid base64".into()))?;

        if bytes.len() > self.max_bytes {
            return Err(AppError::BadRequest(format!(
                "File exceeds {} bytes",
                self.max_bytes
            )));
        }

        let format = ImageFormat::sniff(&bytes)
            .ok_or_else(|| AppError::BadRequest("Unsupported file type".into()))?;
        if format == ImageFormat::Pdf && kind != FileKind::Attachment {
            return Err(AppError::BadRequest("Photo must be JPEG or PNG".into()));
        }

        Ok(DecodedFile {
            bytes,
            extension: format.extension(),
        })
    }

    /// Writes the file on the blocking pool and returns its stored name,
    /// relative to the store root (`check_in/<uuid>.jpg`).
    pub async fn save(&self, kind: FileKind, file: DecodedFile) -> Result<String, AppError> {
        let relative = format!("{}/{}.{}", kind.as_ref(), Uuid::new_v4(), file.extension);
        let dir = self.root.join(kind.as_ref());
        let path = self.root.join(&relative);

        actix_web::web::block(move || {
            std::fs::create_dir_all(&dir)?;
            std::fs::write(&path, &file.bytes)
        })
        .await
        .map_err(|e| AppError::Internal(format!("blocking pool error: {e}")))?
        .map_err(|e| AppError::Internal(format!("failed to store file: {e}")))?;

        tracing::debug!(file = %relative, "Stored upload");
        Ok(relative)
    }

    /// Deletes a file written by [`FileStore::save`] whose row was never
    /// recorded. Failures are logged, not returned.
    pub async fn discard(&self, relative: &str) {
        let path = self.root.join(relative);
        let result = actix_web::web::block(move || std::fs::remove_file(path)).await;
        match result {
            Ok(Ok(())) => tracing::debug!(file = %relative, "Discarded upload"),
            Ok(Err(e)) => tracing::warn!(file = %relative, error = %e, "Failed to discard upload"),
            Err(e) => tracing::warn!(file = %relative, error = %e, "Failed to discard upload"),
        }
    }

    /// Resolves a stored name back to a path, refusing anything that could
    /// escape the store root.
    pub fn resolve(&self, kind: FileKind, name: &str) -> Result<PathBuf, AppError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
            && !name.starts_with('.')
            && !name.contains("..");
        if !valid {
            return Err(AppError::BadRequest("Invalid file name".into()));
        }
        Ok(self.root.join(kind.as_ref()).join(name))
    }

    pub async fn read(&self, path: PathBuf) -> Result<(Vec<u8>, &'static str), AppError> {
        let extension = extension_of(&path);
        let bytes = actix_web::web::block(move || std::fs::read(path))
            .await
            .map_err(|e| AppError::Internal(format!("blocking pool error: {e}")))?
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AppError::NotFound("File not found".into()),
                _ => AppError::Internal(format!("failed to read file: {e}")),
            })?;
        Ok((bytes, ImageFormat::content_type(extension)))
    }
}

fn extension_of(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") => "jpg",
        Some("png") => "png",
        Some("pdf") => "pdf",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

    fn store() -> FileStore {
        FileStore::new("uploads", 1024)
    }

    #[test]
    fn test_decodes_plain_and_data_url_jpeg() {
        let encoded = BASE64_STANDARD.encode(TINY_JPEG);
        let plain = store().decode(FileKind::CheckIn, &encoded).unwrap();
        assert_eq!(plain.extension, "jpg");

        let data_url = format!("data:image/jpeg;base64,{encoded}");
        let from_url = store().decode(FileKind::CheckIn, &data_url).unwrap();
        assert_eq!(from_url.bytes, TINY_JPEG);
    }

    #[test]
    fn test_rejects_unknown_type_and_bad_base64() {
        let text = BASE64_STANDARD.encode(b"hello world");
        assert!(store().decode(FileKind::CheckIn, &text).is_err());
        assert!(store().decode(FileKind::CheckIn, "***").is_err());
        assert!(store().decode(FileKind::CheckIn, "   ").is_err());
    }

    #[test]
    fn test_pdf_only_allowed_as_attachment() {
        let pdf = BASE64_STANDARD.encode(b"%PDF-1.7 minimal");
        assert!(store().decode(FileKind::CheckOut, &pdf).is_err());
        assert_eq!(store().decode(FileKind::Attachment, &pdf).unwrap().extension, "pdf");
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let mut big = TINY_JPEG.to_vec();
        big.resize(4096, 0);
        let encoded = BASE64_STANDARD.encode(&big);
        assert!(store().decode(FileKind::CheckIn, &encoded).is_err());
    }

    #[test]
    fn test_resolve_refuses_traversal() {
        assert!(store().resolve(FileKind::Attachment, "../secret").is_err());
        assert!(store().resolve(FileKind::Attachment, "a/b.jpg").is_err());
        assert!(store().resolve(FileKind::Attachment, ".hidden").is_err());
        let ok = store()
            .resolve(FileKind::CheckIn, "3f1c0d2e-aaaa-bbbb-cccc-000000000000.jpg")
            .unwrap();
        assert!(ok.ends_with("check_in/3f1c0d2e-aaaa-bbbb-cccc-000000000000.jpg"));
    }

    #[test]
    fn test_file_kind_parses_from_path_segment() {
        use std::str::FromStr;
        assert_eq!(FileKind::from_str("check_out").unwrap(), FileKind::CheckOut);
        assert!(FileKind::from_str("etc").is_err());
    }

    #[actix_web::test]
    async fn test_discard_removes_saved_file() {
        let root = std::env::temp_dir().join(format!("presensi-store-{}", Uuid::new_v4()));
        let store = FileStore::new(&root, 1024);
        let file = store
            .decode(FileKind::CheckIn, &BASE64_STANDARD.encode(TINY_JPEG))
            .unwrap();

        let name = store.save(FileKind::CheckIn, file).await.unwrap();
        assert!(root.join(&name).exists());

        store.discard(&name).await;
        assert!(!root.join(&name).exists());

        // already gone: logged, not a panic
        store.discard(&name).await;
        let _ = std::fs::remove_dir_all(&root);
    }
}
