//! Uploaded-file payloads and their test-mode normalization.
//!
//! The host's production upload type validates that a file really arrived
//! over an HTTP POST; in-process tests have no such transfer, so every raw
//! file entry is wrapped as a [`TestUpload`] that keeps the same interface
//! while skipping that validation. Normalization is recursive and preserves
//! the payload's nesting shape exactly: arrays of files stay arrays, maps
//! stay maps, scalar leaves become single wrapped files.

use std::collections::BTreeMap;

use bytes::Bytes;

/// A file entry as supplied by the test runner's transport request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawUpload {
    /// Client-side file name.
    pub filename: String,
    /// MIME type reported for the file, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Bytes,
}

impl RawUpload {
    /// Construct a raw upload from a name and contents.
    #[must_use]
    pub fn new(filename: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    /// Attach a MIME type.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// The host-native uploaded-file wrapper in test mode.
///
/// Carries the same metadata as the production type but never touches the
/// filesystem or checks how the file was transferred.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestUpload {
    /// Client-side file name.
    pub filename: String,
    /// MIME type reported for the file, if any.
    pub content_type: Option<String>,
    /// File contents.
    pub bytes: Bytes,
}

impl From<RawUpload> for TestUpload {
    fn from(raw: RawUpload) -> Self {
        Self {
            filename: raw.filename,
            content_type: raw.content_type,
            bytes: raw.bytes,
        }
    }
}

/// A node in the transport request's nested file payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileField {
    /// A single file leaf.
    File(RawUpload),
    /// An array of entries under one key.
    Many(Vec<FileField>),
    /// A keyed group of entries.
    Map(BTreeMap<String, FileField>),
}

/// A node in the normalized payload handed to the application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadField {
    /// A single wrapped file leaf.
    File(TestUpload),
    /// An array of normalized entries under one key.
    Many(Vec<UploadField>),
    /// A keyed group of normalized entries.
    Map(BTreeMap<String, UploadField>),
}

/// Normalized file payload carried into the native request's extensions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadBag {
    /// Top-level file fields keyed by form-field name.
    pub fields: BTreeMap<String, UploadField>,
}

impl UploadBag {
    /// Whether the bag carries no files at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Wrap every raw file leaf in `field`, preserving the nesting shape.
#[must_use]
pub fn normalize_field(field: FileField) -> UploadField {
    match field {
        FileField::File(raw) => UploadField::File(raw.into()),
        FileField::Many(entries) => {
            UploadField::Many(entries.into_iter().map(normalize_field).collect())
        }
        FileField::Map(entries) => UploadField::Map(
            entries
                .into_iter()
                .map(|(key, value)| (key, normalize_field(value)))
                .collect(),
        ),
    }
}

/// Normalize a whole transport file payload into an [`UploadBag`].
#[must_use]
pub fn normalize_files(files: BTreeMap<String, FileField>) -> UploadBag {
    UploadBag {
        fields: files
            .into_iter()
            .map(|(key, value)| (key, normalize_field(value)))
            .collect(),
    }
}
