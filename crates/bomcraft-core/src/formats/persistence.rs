//! # Snapshot Format
//!
//! Binary serialization for catalog snapshots.
//!
//! Format: Header (5 bytes) + postcard-serialized [`SerializableCatalog`].
//! - 4 bytes: Magic ("BOMC")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded.

use crate::catalog::{ItemGraphStore, SerializableCatalog};
use crate::{BomError, Catalog, primitives};

/// Maximum accepted snapshot size.
///
/// Checked before deserialization so a corrupted or hostile file cannot
/// force a huge allocation.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 256 * 1024 * 1024; // 256 MB

const HEADER_SIZE: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The header preceding all snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate magic and version.
    pub fn validate(&self) -> Result<(), BomError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(BomError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(BomError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BomError> {
        if bytes.len() < HEADER_SIZE {
            return Err(BomError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize any store to snapshot bytes (header + payload).
pub fn snapshot_to_bytes<G: ItemGraphStore>(store: &G) -> Result<Vec<u8>, BomError> {
    encode(&SerializableCatalog::from_store(store)?)
}

/// Serialize an in-memory catalog to snapshot bytes.
pub fn catalog_to_bytes(catalog: &Catalog) -> Result<Vec<u8>, BomError> {
    encode(&SerializableCatalog::from(catalog))
}

fn encode(snapshot: &SerializableCatalog) -> Result<Vec<u8>, BomError> {
    let payload =
        postcard::to_stdvec(snapshot).map_err(|e| BomError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&SnapshotHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode snapshot bytes without building a catalog.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<SerializableCatalog, BomError> {
    if bytes.len() < HEADER_SIZE {
        return Err(BomError::DeserializationError(format!(
            "Data too short: minimum {} bytes required",
            HEADER_SIZE
        )));
    }

    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(BomError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    SnapshotHeader::from_bytes(bytes)?.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        BomError::DeserializationError(format!("Failed to deserialize catalog data: {}", e))
    })
}

/// Decode snapshot bytes into an in-memory catalog.
pub fn catalog_from_bytes(bytes: &[u8]) -> Result<Catalog, BomError> {
    snapshot_from_bytes(bytes).map(Catalog::from)
}

// =============================================================================
// TESTS
// =============================================================================
