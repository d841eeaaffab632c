//! Collection and document addresses.
//!
//! Paths alternate collection and document segments, starting with a
//! collection: `courses/12/discussions/abc/replies` is a collection path,
//! `courses/12/discussions/abc` a document path.

use std::fmt;

use coursedesk_shared::types::DocumentId;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    segments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath {
    collection: CollectionPath,
    id: DocumentId,
}

fn check_segment(segment: &str, whole: &str) -> Result<()> {
    if segment.is_empty() || segment.contains('/') {
        return Err(StoreError::InvalidPath(whole.to_string()));
    }
    Ok(())
}

impl CollectionPath {
    /// A top-level collection such as `privateMessages`.
    pub fn root(name: &str) -> Result<Self> {
        check_segment(name, name)?;
        Ok(Self {
            segments: vec![name.to_string()],
        })
    }

    pub fn parse(path: &str) -> Result<Self> {
        let segments: Vec<String> = path.split('/').map(str::to_string).collect();
        if segments.len() % 2 == 0 {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        for segment in &segments {
            check_segment(segment, path)?;
        }
        Ok(Self { segments })
    }

    /// Address a document inside this collection.
    pub fn doc(&self, id: impl Into<DocumentId>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// The last segment, i.e. the collection's own name.
    pub fn name(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// The document this collection hangs off, if it is a subcollection.
    pub fn parent(&self) -> Option<DocumentPath> {
        if self.segments.len() < 3 {
            return None;
        }
        let n = self.segments.len();
        Some(DocumentPath {
            collection: CollectionPath {
                segments: self.segments[..n - 2].to_vec(),
            },
            id: DocumentId(self.segments[n - 2].clone()),
        })
    }
}

impl DocumentPath {
    pub fn parse(path: &str) -> Result<Self> {
        let (collection, id) = path
            .rsplit_once('/')
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        check_segment(id, path)?;
        Ok(Self {
            collection: CollectionPath::parse(collection)?,
            id: DocumentId(id.to_string()),
        })
    }

    pub fn collection_path(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &DocumentId {
        &self.id
    }

    /// Address a subcollection of this document.
    pub fn collection(&self, name: &str) -> Result<CollectionPath> {
        check_segment(name, name)?;
        let mut segments = self.collection.segments.clone();
        segments.push(self.id.0.clone());
        segments.push(name.to_string());
        Ok(CollectionPath { segments })
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_collection() {
        let path = CollectionPath::parse("courses/12/discussions/abc/replies").unwrap();
        assert_eq!(path.name(), "replies");
        let parent = path.parent().unwrap();
        assert_eq!(parent.to_string(), "courses/12/discussions/abc");
        assert_eq!(parent.id().as_str(), "abc");
    }

    #[test]
    fn even_segment_count_is_not_a_collection() {
        assert!(CollectionPath::parse("courses/12").is_err());
        assert!(CollectionPath::parse("courses//discussions").is_err());
        assert!(CollectionPath::parse("").is_err());
    }

    #[test]
    fn document_path_round_trips_through_display() {
        let doc = DocumentPath::parse("courses/12/discussions/abc").unwrap();
        assert_eq!(doc.collection_path().to_string(), "courses/12/discussions");
        let replies = doc.collection("replies").unwrap();
        assert_eq!(replies.to_string(), "courses/12/discussions/abc/replies");
        assert!(DocumentPath::parse("courses").is_err());
    }
}
