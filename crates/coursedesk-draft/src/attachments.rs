//! Pending binary attachments, held outside the draft tree.
//!
//! The tree only stores file names. The bytes live in a side-table keyed by
//! [`AttachmentKey`], a proper composite key, so module 1 / topic 23 and
//! module 12 / topic 3 can never collide. Each pending binary comes with a
//! preview handle that is revoked exactly once when the binary is replaced,
//! detached, or its node is removed.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bytes::Bytes;
use tracing::{debug, info};

use crate::error::{DraftError, Result};

/// The node a pending binary belongs to. Ordered the way binaries are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttachmentKey {
    CourseImage,
    Resource(usize),
    Topic { module: usize, topic: usize },
}

impl fmt::Display for AttachmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentKey::CourseImage => write!(f, "image"),
            AttachmentKey::Resource(i) => write!(f, "courseResources[{i}]"),
            AttachmentKey::Topic { module, topic } => {
                write!(f, "modules[{module}].topics[{topic}]")
            }
        }
    }
}

/// A file chosen by the author, not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingBinary {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
    /// BLAKE3 hash of `data`.
    pub digest: blake3::Hash,
}

impl PendingBinary {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        let data = data.into();
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            digest: blake3::hash(&data),
            data,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn extension(&self) -> &str {
        file_extension(&self.file_name)
    }
}

/// Text after the last dot of `name` (the whole name if it has none).
pub fn file_extension(name: &str) -> &str {
    name.rsplit_once('.').map_or(name, |(_, ext)| ext)
}

/// Opaque handle to a local preview of a pending binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle(u64);

impl PreviewHandle {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Issues preview handles and revokes each one at most once.
#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next: u64,
    live: HashMap<PreviewHandle, AttachmentKey>,
    revoked: usize,
}

impl PreviewRegistry {
    fn issue(&mut self, key: AttachmentKey) -> PreviewHandle {
        self.next += 1;
        let handle = PreviewHandle(self.next);
        self.live.insert(handle, key);
        handle
    }

    /// `false` if the handle was already revoked (or never issued).
    pub fn revoke(&mut self, handle: PreviewHandle) -> bool {
        match self.live.remove(&handle) {
            Some(key) => {
                self.revoked += 1;
                debug!(handle = handle.0, key = %key, "preview revoked");
                true
            }
            None => false,
        }
    }

    pub fn is_live(&self, handle: PreviewHandle) -> bool {
        self.live.contains_key(&handle)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Total revocations so far.
    pub fn revoked_count(&self) -> usize {
        self.revoked
    }
}

struct Entry {
    binary: PendingBinary,
    preview: PreviewHandle,
}

/// The side-table owned by one draft editor.
pub struct Attachments {
    pending: BTreeMap<AttachmentKey, Entry>,
    previews: PreviewRegistry,
    max_bytes: usize,
}

impl Attachments {
    pub fn new(max_bytes: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            previews: PreviewRegistry::default(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn check_size(&self, binary: &PendingBinary) -> Result<()> {
        if binary.size() > self.max_bytes {
            return Err(DraftError::PayloadTooLarge {
                size: binary.size(),
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Store `binary` under `key`, revoking the preview of whatever it replaces.
    pub fn insert(&mut self, key: AttachmentKey, binary: PendingBinary) -> Result<PreviewHandle> {
        self.check_size(&binary)?;
        if let Some(old) = self.pending.remove(&key) {
            self.previews.revoke(old.preview);
        }

        let preview = self.previews.issue(key);
        info!(
            key = %key,
            file = %binary.file_name,
            size = binary.size(),
            digest = %binary.digest.to_hex(),
            "attachment pending"
        );
        self.pending.insert(key, Entry { binary, preview });
        Ok(preview)
    }

    /// Drop the binary under `key` and revoke its preview.
    pub fn remove(&mut self, key: &AttachmentKey) -> Option<PendingBinary> {
        let entry = self.pending.remove(key)?;
        self.previews.revoke(entry.preview);
        Some(entry.binary)
    }

    pub fn get(&self, key: &AttachmentKey) -> Option<&PendingBinary> {
        self.pending.get(key).map(|e| &e.binary)
    }

    pub fn preview(&self, key: &AttachmentKey) -> Option<PreviewHandle> {
        self.pending.get(key).map(|e| e.preview)
    }

    pub fn contains(&self, key: &AttachmentKey) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending binaries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&AttachmentKey, &PendingBinary)> {
        self.pending.iter().map(|(k, e)| (k, &e.binary))
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Move every entry to `remap(key)`, releasing those mapped to `None`.
    /// Used after structural edits so attachments follow their nodes.
    pub fn rekey<F>(&mut self, remap: F)
    where
        F: Fn(AttachmentKey) -> Option<AttachmentKey>,
    {
        let old = std::mem::take(&mut self.pending);
        for (key, entry) in old {
            match remap(key) {
                Some(new_key) => {
                    if new_key != key {
                        debug!(from = %key, to = %new_key, "attachment re-keyed");
                    }
                    self.pending.insert(new_key, entry);
                }
                None => {
                    self.previews.revoke(entry.preview);
                    debug!(key = %key, "attachment released with its node");
                }
            }
        }
    }

    /// Release everything, e.g. when the editor closes.
    pub fn clear(&mut self) {
        self.rekey(|_| None);
    }
}

impl Drop for Attachments {
    fn drop(&mut self) {
        self.clear();
    }
}

impl fmt::Debug for Attachments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachments")
            .field("keys", &self.pending.keys().collect::<Vec<_>>())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(name: &str) -> PendingBinary {
        PendingBinary::new(name, "video/mp4", vec![1u8, 2, 3])
    }

    #[test]
    fn composite_keys_do_not_collide() {
        let mut table = Attachments::new(1024);
        table
            .insert(AttachmentKey::Topic { module: 1, topic: 23 }, video("a.mp4"))
            .unwrap();
        table
            .insert(AttachmentKey::Topic { module: 12, topic: 3 }, video("b.mp4"))
            .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn replacing_revokes_previous_preview_once() {
        let mut table = Attachments::new(1024);
        let key = AttachmentKey::Resource(0);
        let first = table.insert(key, video("a.pdf")).unwrap();
        let second = table.insert(key, video("b.pdf")).unwrap();

        assert!(!table.previews().is_live(first));
        assert!(table.previews().is_live(second));
        assert_eq!(table.previews().revoked_count(), 1);
        assert_eq!(table.get(&key).unwrap().file_name, "b.pdf");
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let mut table = Attachments::new(2);
        let err = table.insert(AttachmentKey::CourseImage, video("big.png")).unwrap_err();
        assert!(matches!(err, DraftError::PayloadTooLarge { size: 3, limit: 2 }));
        assert!(table.is_empty());
    }

    #[test]
    fn rekey_moves_and_releases() {
        let mut table = Attachments::new(1024);
        table.insert(AttachmentKey::Resource(0), video("a.pdf")).unwrap();
        let doomed = table.insert(AttachmentKey::Resource(1), video("b.pdf")).unwrap();
        table.insert(AttachmentKey::Resource(2), video("c.pdf")).unwrap();

        // Remove resource 1.
        table.rekey(|k| match k {
            AttachmentKey::Resource(1) => None,
            AttachmentKey::Resource(i) if i > 1 => Some(AttachmentKey::Resource(i - 1)),
            other => Some(other),
        });

        assert_eq!(table.get(&AttachmentKey::Resource(1)).unwrap().file_name, "c.pdf");
        assert!(!table.contains(&AttachmentKey::Resource(2)));
        assert!(!table.previews().is_live(doomed));
        assert_eq!(table.previews().revoked_count(), 1);
    }

    #[test]
    fn digest_and_extension() {
        let bin = PendingBinary::new("notes.final.pdf", "application/pdf", &b"hello"[..]);
        assert_eq!(bin.extension(), "pdf");
        assert_eq!(bin.digest, blake3::hash(b"hello"));
        assert_eq!(PendingBinary::new("README", "text/plain", Vec::new()).extension(), "README");
    }
}
