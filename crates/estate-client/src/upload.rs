//! Verification-document selection and upload progress.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use mime::Mime;
use serde::Serialize;

use crate::error::ClientError;

/// A picked file: where it lives, what to call it, and its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    pub location: PathBuf,
    pub display_name: String,
    pub media_type: Mime,
}

impl FileDescriptor {
    pub fn new(
        location: impl Into<PathBuf>,
        display_name: impl Into<String>,
        media_type: Mime,
    ) -> Self {
        Self {
            location: location.into(),
            display_name: display_name.into(),
            media_type,
        }
    }

    /// Descriptor for a path, naming it after the file and guessing the media type.
    pub fn from_path(location: impl Into<PathBuf>) -> Self {
        let location = location.into();
        let display_name = file_name_of(&location);
        let media_type = mime_guess::from_path(&location).first_or_octet_stream();
        Self {
            location,
            display_name,
            media_type,
        }
    }
}

/// Named slots of the property verification form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSlot {
    /// Title deed or other proof of ownership.
    Deed,
    /// Government identity document.
    Identity,
    /// Live photo of the owner.
    Selfie,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 3] = [
        DocumentSlot::Deed,
        DocumentSlot::Identity,
        DocumentSlot::Selfie,
    ];

    /// Multipart part name expected by `/property/verify`.
    pub fn field_name(self) -> &'static str {
        match self {
            DocumentSlot::Deed => "deed",
            DocumentSlot::Identity => "id",
            DocumentSlot::Selfie => "selfie",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentSlot::Deed => "property deed",
            DocumentSlot::Identity => "identity document",
            DocumentSlot::Selfie => "live photo",
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Files picked so far for a verification submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingUploadSet {
    slots: BTreeMap<DocumentSlot, FileDescriptor>,
}

impl PendingUploadSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a file for `slot`, replacing any earlier pick.
    pub fn pick(&mut self, slot: DocumentSlot, file: FileDescriptor) {
        self.slots.insert(slot, file);
    }

    pub fn clear(&mut self, slot: DocumentSlot) -> Option<FileDescriptor> {
        self.slots.remove(&slot)
    }

    pub fn clear_all(&mut self) {
        self.slots.clear();
    }

    pub fn get(&self, slot: DocumentSlot) -> Option<&FileDescriptor> {
        self.slots.get(&slot)
    }

    pub fn missing(&self) -> Vec<DocumentSlot> {
        DocumentSlot::ALL
            .into_iter()
            .filter(|slot| !self.slots.contains_key(slot))
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing().is_empty()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Scalar details that accompany the verification documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    pub property_id: String,
    pub full_name: String,
    pub phone_number: String,
}

impl VerificationRequest {
    /// Multipart shape for `/property/verify`. Every field and slot is required.
    pub fn to_upload(&self, files: &PendingUploadSet) -> MultipartUpload {
        let mut upload = MultipartUpload::new()
            .field("property_id", &self.property_id)
            .field("full_name", &self.full_name)
            .field("phone_number", &self.phone_number);
        for slot in DocumentSlot::ALL {
            upload = upload.file(slot.field_name(), files.get(slot).cloned());
        }
        upload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub name: String,
    pub value: String,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub name: String,
    pub file: Option<FileDescriptor>,
    pub required: bool,
}

/// Scalar fields plus named files, checked before anything is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartUpload {
    pub fields: Vec<FormField>,
    pub files: Vec<FilePart>,
}

impl MultipartUpload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
            required: true,
        });
        self
    }

    pub fn optional_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: value.into(),
            required: false,
        });
        self
    }

    pub fn file(mut self, name: impl Into<String>, file: Option<FileDescriptor>) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file,
            required: true,
        });
        self
    }

    pub fn optional_file(
        mut self,
        name: impl Into<String>,
        file: Option<FileDescriptor>,
    ) -> Self {
        self.files.push(FilePart {
            name: name.into(),
            file,
            required: false,
        });
        self
    }

    /// Names of required fields that are blank and required files that are unset.
    pub fn missing(&self) -> Vec<&str> {
        let fields = self
            .fields
            .iter()
            .filter(|field| field.required && field.value.trim().is_empty())
            .map(|field| field.name.as_str());
        let files = self
            .files
            .iter()
            .filter(|part| part.required && part.file.is_none())
            .map(|part| part.name.as_str());
        fields.chain(files).collect()
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        let missing = self.missing();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ClientError::Validation(format!(
                "Please fill in all required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

type ProgressListener = Box<dyn Fn(u8) + Send + Sync>;

/// Caller-visible upload state: an in-progress flag and the latest percentage.
///
/// Listeners may be invoked from whichever thread drives the request body;
/// only the latest value matters.
#[derive(Clone, Default)]
pub struct UploadProgress {
    inner: Arc<ProgressState>,
}

#[derive(Default)]
struct ProgressState {
    in_progress: AtomicBool,
    percent: AtomicU8,
    listener: Option<ProgressListener>,
}

impl UploadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ProgressState {
                listener: Some(Box::new(listener)),
                ..ProgressState::default()
            }),
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.inner.in_progress.load(Ordering::Acquire)
    }

    pub fn percent(&self) -> u8 {
        self.inner.percent.load(Ordering::Acquire)
    }

    pub(crate) fn begin(&self) -> ProgressGuard {
        self.inner.percent.store(0, Ordering::Release);
        self.inner.in_progress.store(true, Ordering::Release);
        ProgressGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Record `percent`; the listener only hears strictly larger values.
    pub(crate) fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.inner.percent.fetch_max(percent, Ordering::AcqRel);
        if percent > previous {
            if let Some(listener) = &self.inner.listener {
                listener(percent);
            }
        }
    }
}

impl fmt::Debug for UploadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadProgress")
            .field("in_progress", &self.is_in_progress())
            .field("percent", &self.percent())
            .finish_non_exhaustive()
    }
}

/// Resets the progress state when the upload ends, however it ends.
pub(crate) struct ProgressGuard {
    inner: Arc<ProgressState>,
}

impl Drop for ProgressGuard {
    fn drop(&mut self) {
        self.inner.in_progress.store(false, Ordering::Release);
        self.inner.percent.store(0, Ordering::Release);
    }
}

/// Counts body bytes handed to the transport.
#[derive(Debug)]
pub struct ByteMeter {
    sent: AtomicU64,
    total: u64,
}

impl ByteMeter {
    pub fn new(total: u64) -> Self {
        Self {
            sent: AtomicU64::new(0),
            total,
        }
    }

    /// Add `bytes` and return `round(sent * 100 / total)`, capped at 100.
    pub fn advance(&self, bytes: u64) -> u8 {
        let sent = self.sent.fetch_add(bytes, Ordering::AcqRel) + bytes;
        percent_of(sent, self.total)
    }
}

pub fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = u128::from(sent.min(total));
    let total = u128::from(total);
    ((sent * 100 + total / 2) / total) as u8
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string())
}
