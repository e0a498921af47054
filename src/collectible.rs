use crate::address::Address;
use crate::error::BuilderError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Reference from a collectible to the collection it claims membership of
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionRef {
    /// The collection's address
    pub address: Address,

    /// Whether the collection authority has verified the membership claim
    pub verified: bool,
}

/// One key/value attribute in a collectible's off-chain document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub trait_type: String,
    pub value: String,
}

/// The off-chain document a collectible's content pointer resolves to
///
/// Attribute order is preserved across fetch and republish.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDocument {
    pub name: String,
    pub attributes: Vec<Attribute>,
}

impl AttributeDocument {
    /// Find the position of a named trait
    pub fn position_of(&self, trait_type: &str) -> Option<usize> {
        self.attributes
            .iter()
            .position(|attribute| attribute.trait_type == trait_type)
    }
}

/// A unique on-ledger item plus the pointer to its off-chain document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectibleRecord {
    /// The item's mint address
    pub mint: Address,

    /// The collection this item claims to belong to, if any
    pub collection: Option<CollectionRef>,

    /// Content pointer to the item's attribute document
    pub uri: String,
}

/// External content-addressed store for attribute documents
pub trait ContentStore {
    /// Fetch the document at a content pointer
    ///
    /// # Parameters
    /// * `uri` - The content pointer to resolve
    ///
    /// # Returns
    /// The document, or an error if the pointer does not resolve
    fn fetch(&self, uri: &str) -> Result<AttributeDocument, BuilderError>;

    /// Publish a document and return its new content pointer
    ///
    /// Publishing is a committed side effect; there is no way to unpublish.
    fn publish(&self, document: &AttributeDocument) -> Result<String, BuilderError>;
}

/// In-memory content-addressed store
///
/// Pointers are derived from the document bytes, so republishing identical
/// content yields the same pointer.
pub struct InMemoryContentStore {
    documents: Mutex<HashMap<String, AttributeDocument>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
        }
    }

    /// Publish a document directly, for seeding test fixtures
    pub fn seed(&self, document: &AttributeDocument) -> String {
        self.publish(document).expect("seeding an in-memory store")
    }
}

impl Default for InMemoryContentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentStore for InMemoryContentStore {
    fn fetch(&self, uri: &str) -> Result<AttributeDocument, BuilderError> {
        let documents = self
            .documents
            .lock()
            .map_err(|err| BuilderError::ContentStore(format!("store poisoned: {}", err)))?;
        documents
            .get(uri)
            .cloned()
            .ok_or_else(|| BuilderError::ContentStore(format!("no document at {}", uri)))
    }

    fn publish(&self, document: &AttributeDocument) -> Result<String, BuilderError> {
        let bytes = serde_json::to_vec(document)?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let uri = format!("content://{}", hex::encode(hasher.finalize()));

        let mut documents = self
            .documents
            .lock()
            .map_err(|err| BuilderError::ContentStore(format!("store poisoned: {}", err)))?;
        documents.insert(uri.clone(), document.clone());
        Ok(uri)
    }
}

/// Check that an asset belongs to the expected collection
///
/// Fails closed: a missing collection reference, an unverified reference,
/// and a mismatched collection address all abort the flow before any
/// instruction touching the asset is assembled.
pub fn verify_provenance(
    record: &CollectibleRecord,
    expected_collection: &Address,
) -> Result<(), BuilderError> {
    match record.collection {
        None => {
            warn!("collectible {} has no collection reference", record.mint);
            Err(BuilderError::UnverifiedCollection)
        }
        Some(collection) if !collection.verified => {
            warn!(
                "collectible {} claims collection {} without verification",
                record.mint, collection.address
            );
            Err(BuilderError::UnverifiedCollection)
        }
        Some(collection) if collection.address != *expected_collection => {
            Err(BuilderError::WrongCollection {
                expected: *expected_collection,
                found: collection.address,
            })
        }
        Some(_) => Ok(()),
    }
}

/// Increment a collectible's named counter trait by one and republish its
/// document
///
/// # Parameters
/// * `store` - The content store holding the attribute document
/// * `record` - The collectible whose counter is bumped
/// * `trait_name` - The trait holding the counter value
///
/// # Returns
/// The content pointer of the republished document. The republish commits
/// before any on-chain update is assembled; a crash between the two leaves
/// the new document orphaned.
pub fn bump_counter(
    store: &dyn ContentStore,
    record: &CollectibleRecord,
    trait_name: &str,
) -> Result<String, BuilderError> {
    let mut document = store.fetch(&record.uri)?;

    let position = document
        .position_of(trait_name)
        .ok_or_else(|| BuilderError::TraitNotFound(trait_name.to_string()))?;

    let count: u64 = document.attributes[position]
        .value
        .parse()
        .map_err(|_| BuilderError::TraitNotFound(trait_name.to_string()))?;

    document.attributes[position].value = (count + 1).to_string();
    debug!("bumped {} trait of {} to {}", trait_name, record.mint, count + 1);

    store.publish(&document)
}
