//! DIP registry
//!
//! Owns every registered document. Documents are held as `Arc`s in an
//! id-ordered map; mutations swap in a fresh `Arc` under the write lock, so
//! snapshots handed out earlier never change underneath their holders.

use crate::dip::{
    DipId, DipStatus, ProposalDocument, StatusKind, TransitionEngine, TransitionRecord,
};
use crate::error::{dip_not_found, AppError};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Predicate over documents, used by [`DipRegistry::list`]
pub trait DocumentFilter {
    fn matches(&self, doc: &ProposalDocument) -> bool;
}

impl<F> DocumentFilter for F
where
    F: Fn(&ProposalDocument) -> bool,
{
    fn matches(&self, doc: &ProposalDocument) -> bool {
        self(doc)
    }
}

/// Common listing filter: by status kind and/or author substring
#[derive(Debug, Clone, Default)]
pub struct DipFilter {
    pub status: Option<StatusKind>,
    pub author: Option<String>,
}

impl DipFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn status(kind: StatusKind) -> Self {
        Self {
            status: Some(kind),
            author: None,
        }
    }
}

impl DocumentFilter for DipFilter {
    fn matches(&self, doc: &ProposalDocument) -> bool {
        let status_ok = self.status.map_or(true, |kind| doc.status.kind() == kind);
        let author_ok = self.author.as_ref().map_or(true, |needle| {
            doc.author.to_lowercase().contains(&needle.to_lowercase())
        });
        status_ok && author_ok
    }
}

/// Point-in-time view of the registry.
///
/// Filtering happens lazily on iteration, in ascending id order; `iter`
/// can be called any number of times.
pub struct DipListing<P> {
    documents: Vec<Arc<ProposalDocument>>,
    filter: P,
}

impl<P: DocumentFilter> DipListing<P> {
    pub fn iter(&self) -> impl Iterator<Item = &ProposalDocument> + '_ {
        self.documents
            .iter()
            .map(|doc| doc.as_ref())
            .filter(move |doc| self.filter.matches(doc))
    }
}

impl<'a, P: DocumentFilter> IntoIterator for &'a DipListing<P> {
    type Item = &'a ProposalDocument;
    type IntoIter = Box<dyn Iterator<Item = &'a ProposalDocument> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Thread-safe DIP registry
pub struct DipRegistry {
    documents: Arc<RwLock<BTreeMap<DipId, Arc<ProposalDocument>>>>,
}

impl DipRegistry {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Register a new document; ids are unique
    pub async fn register(&self, mut doc: ProposalDocument) -> Result<Arc<ProposalDocument>, AppError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&doc.id) {
            tracing::warn!("Rejected duplicate registration of DIP{}", doc.id);
            return Err(AppError::DuplicateId(doc.id));
        }

        let now = Utc::now();
        doc.registered_at = Some(now);
        doc.updated_at = Some(now);

        let id = doc.id;
        let doc = Arc::new(doc);
        documents.insert(id, Arc::clone(&doc));

        tracing::info!("Registered DIP{} '{}' ({})", id, doc.title, doc.status);
        Ok(doc)
    }

    /// Get a document by id
    pub async fn get(&self, id: DipId) -> Result<Arc<ProposalDocument>, AppError> {
        let documents = self.documents.read().await;
        documents.get(&id).cloned().ok_or_else(|| dip_not_found(id))
    }

    /// Snapshot of the documents matching `filter`, ascending by id
    pub async fn list<P: DocumentFilter>(&self, filter: P) -> DipListing<P> {
        let documents = self.documents.read().await;
        DipListing {
            documents: documents.values().cloned().collect(),
            filter,
        }
    }

    /// Move a document through the lifecycle.
    ///
    /// The stored document is replaced only if the transition is legal.
    pub async fn apply_transition(
        &self,
        id: DipId,
        target: DipStatus,
        note: Option<String>,
    ) -> Result<(Arc<ProposalDocument>, TransitionRecord), AppError> {
        let mut documents = self.documents.write().await;
        let current = documents.get(&id).ok_or_else(|| dip_not_found(id))?;

        let mut updated = ProposalDocument::clone(current);
        let record = TransitionEngine::apply(&mut updated, target, note)?;

        let updated = Arc::new(updated);
        documents.insert(id, Arc::clone(&updated));
        Ok((updated, record))
    }

    /// Transition history of a document, oldest first
    pub async fn history(&self, id: DipId) -> Result<Vec<TransitionRecord>, AppError> {
        Ok(self.get(id).await?.history.clone())
    }

    /// Number of documents per status kind
    pub async fn status_counts(&self) -> BTreeMap<StatusKind, usize> {
        let documents = self.documents.read().await;
        let mut counts = BTreeMap::new();
        for doc in documents.values() {
            *counts.entry(doc.status.kind()).or_insert(0) += 1;
        }
        counts
    }

    /// Get document count
    pub async fn len(&self) -> usize {
        let documents = self.documents.read().await;
        documents.len()
    }
}

impl Default for DipRegistry {
    fn default() -> Self {
        Self::new()
    }
}
