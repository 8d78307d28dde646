//! Uploaded-file side channel and content sniffing.
//!
//! File uploads never travel through the input value map. The caller hands
//! the dispatcher a [`FileSource`] that resolves a configured upload name to
//! the temporary files the transport layer stored.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

const PDF_MAGIC: &[u8] = b"%PDF-";
const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const GIF87_MAGIC: &[u8] = b"GIF87a";
const GIF89_MAGIC: &[u8] = b"GIF89a";
const BMP_MAGIC: &[u8] = b"BM";

/// One uploaded file as stored by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    /// Where the upload was stored on local disk.
    #[serde(rename = "tmp_name")]
    pub tmp_path: PathBuf,
    /// The filename the client sent.
    pub name: String,
}

impl UploadedFile {
    pub fn new(tmp_path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            tmp_path: tmp_path.into(),
            name: name.into(),
        }
    }
}

/// The files uploaded under one field name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileUpload {
    Single(UploadedFile),
    Multiple(Vec<UploadedFile>),
}

impl FileUpload {
    pub fn files(&self) -> &[UploadedFile] {
        match self {
            FileUpload::Single(file) => std::slice::from_ref(file),
            FileUpload::Multiple(files) => files,
        }
    }
}

/// Lookup of uploaded files by field name.
pub trait FileSource {
    fn lookup(&self, name: &str) -> Option<&FileUpload>;
}

/// In-memory [`FileSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadedFiles {
    uploads: HashMap<String, FileUpload>,
}

impl UploadedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, upload: FileUpload) {
        self.uploads.insert(name.into(), upload);
    }

    /// Parse a manifest of the form
    /// `{"field": {"tmp_name": "...", "name": "..."}}` where each value may
    /// also be a list of such objects.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

impl FileSource for UploadedFiles {
    fn lookup(&self, name: &str) -> Option<&FileUpload> {
        self.uploads.get(name)
    }
}

/// Content type deduced from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Jpeg,
    Png,
    Gif,
    Bmp,
    Unknown,
}

impl FileKind {
    pub fn is_document(self) -> bool {
        matches!(self, FileKind::Pdf)
    }

    pub fn is_bitmap(self) -> bool {
        matches!(
            self,
            FileKind::Jpeg | FileKind::Png | FileKind::Gif | FileKind::Bmp
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Jpeg => "jpeg",
            FileKind::Png => "png",
            FileKind::Gif => "gif",
            FileKind::Bmp => "bmp",
            FileKind::Unknown => "unknown",
        }
    }
}

/// Identify content from its first bytes.
pub fn sniff_bytes(head: &[u8]) -> FileKind {
    if head.starts_with(PDF_MAGIC) {
        FileKind::Pdf
    } else if head.starts_with(JPEG_MAGIC) {
        FileKind::Jpeg
    } else if head.starts_with(PNG_MAGIC) {
        FileKind::Png
    } else if head.starts_with(GIF87_MAGIC) || head.starts_with(GIF89_MAGIC) {
        FileKind::Gif
    } else if head.starts_with(BMP_MAGIC) {
        FileKind::Bmp
    } else {
        FileKind::Unknown
    }
}

/// Read at most `max_bytes` from `path` and identify the content.
pub fn sniff_file(path: &Path, max_bytes: usize) -> io::Result<FileKind> {
    let file = File::open(path)?;
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let mut head = Vec::with_capacity(max_bytes.min(64));
    file.take(limit).read_to_end(&mut head)?;
    let kind = sniff_bytes(&head);
    tracing::trace!(path = %path.display(), kind = kind.as_str(), "sniffed upload");
    Ok(kind)
}

/// True when the file content is a PDF. Unreadable files are not documents.
pub fn is_document_file(path: &Path, max_bytes: usize) -> bool {
    sniff_or_unknown(path, max_bytes).is_document()
}

/// True when the file content is a JPEG, PNG, GIF or BMP image.
pub fn is_bitmap_file(path: &Path, max_bytes: usize) -> bool {
    sniff_or_unknown(path, max_bytes).is_bitmap()
}

fn sniff_or_unknown(path: &Path, max_bytes: usize) -> FileKind {
    match sniff_file(path, max_bytes) {
        Ok(kind) => kind,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed reading upload");
            FileKind::Unknown
        }
    }
}
