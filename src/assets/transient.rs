//! Process-local, revocable handles for binary payloads.
//!
//! The render layer loads textures through a [`TransientAddress`] instead of a
//! file path. Every address handed out is live until it is revoked exactly
//! once; a build records the addresses it created in a [`ReleaseList`] so they
//! can be released together with the object they back.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransientAddress(String);

impl TransientAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransientAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TransientPayload {
    /// Archive path the payload came from.
    pub name: String,
    pub bytes: Arc<[u8]>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransientError {
    #[error("transient address {0} is not live (never created or already revoked)")]
    NotLive(TransientAddress),
}

#[derive(Debug, Default)]
pub struct TransientStore {
    next_id: u64,
    live: HashMap<TransientAddress, TransientPayload>,
}

impl TransientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(
        &mut self,
        name: &str,
        bytes: Vec<u8>,
        width: u32,
        height: u32,
    ) -> TransientAddress {
        self.next_id += 1;
        let digest = Sha256::digest(&bytes);
        let hash = format!("{:x}", digest);
        let address = TransientAddress(format!(
            "blob:shapeforge/{:06}-{}",
            self.next_id,
            &hash[..12]
        ));
        self.live.insert(
            address.clone(),
            TransientPayload {
                name: name.to_string(),
                bytes: bytes.into(),
                width,
                height,
            },
        );
        address
    }

    pub fn resolve(&self, address: &TransientAddress) -> Option<&TransientPayload> {
        self.live.get(address)
    }

    /// Looks an address up by its textual form, as found in rewritten
    /// material text.
    pub fn resolve_str(&self, address: &str) -> Option<(&TransientAddress, &TransientPayload)> {
        self.live
            .iter()
            .find(|(candidate, _)| candidate.as_str() == address)
    }

    pub fn revoke(&mut self, address: &TransientAddress) -> Result<(), TransientError> {
        self.live
            .remove(address)
            .map(|_| ())
            .ok_or_else(|| TransientError::NotLive(address.clone()))
    }

    /// Number of addresses created and not yet revoked.
    pub fn outstanding(&self) -> usize {
        self.live.len()
    }
}

/// Addresses created on behalf of one build. Never shared between builds.
#[derive(Debug, Default)]
pub struct ReleaseList {
    addresses: Vec<TransientAddress>,
}

impl ReleaseList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, address: TransientAddress) {
        self.addresses.push(address);
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransientAddress> {
        self.addresses.iter()
    }

    pub fn into_addresses(self) -> Vec<TransientAddress> {
        self.addresses
    }

    /// Revokes every recorded address, continuing past failures. Returns the
    /// number actually revoked.
    pub fn release_all(self, store: &mut TransientStore) -> usize {
        let mut revoked = 0;
        for address in &self.addresses {
            match store.revoke(address) {
                Ok(()) => revoked += 1,
                Err(err) => log::warn!("Release failed: {}", err),
            }
        }
        revoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addresses_are_unique_even_for_identical_payloads() {
        let mut store = TransientStore::new();
        let a = store.create("a.png", vec![1, 2, 3], 1, 1);
        let b = store.create("a.png", vec![1, 2, 3], 1, 1);
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:shapeforge/"));
        assert_eq!(store.outstanding(), 2);
    }

    #[test]
    fn revoke_is_exactly_once() {
        let mut store = TransientStore::new();
        let address = store.create("a.png", vec![9], 1, 1);
        assert!(store.revoke(&address).is_ok());
        assert_eq!(
            store.revoke(&address),
            Err(TransientError::NotLive(address.clone()))
        );
        assert!(store.resolve(&address).is_none());
    }

    #[test]
    fn release_list_returns_store_to_previous_count() {
        let mut store = TransientStore::new();
        let keep = store.create("keep.png", vec![0], 1, 1);
        let before = store.outstanding();

        let mut releases = ReleaseList::new();
        for index in 0..4u8 {
            releases.record(store.create("t.png", vec![index], 1, 1));
        }
        assert_eq!(store.outstanding(), before + 4);
        assert_eq!(releases.release_all(&mut store), 4);
        assert_eq!(store.outstanding(), before);
        assert!(store.resolve(&keep).is_some());
    }

    #[test]
    fn resolve_by_text() {
        let mut store = TransientStore::new();
        let address = store.create("wood.jpg", vec![5, 6], 2, 3);
        let (found, payload) = store.resolve_str(address.as_str()).unwrap();
        assert_eq!(found, &address);
        assert_eq!(payload.name, "wood.jpg");
        assert_eq!((payload.width, payload.height), (2, 3));
    }
}
