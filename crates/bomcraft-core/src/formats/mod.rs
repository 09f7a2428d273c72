//! # Formats
//!
//! Byte-level encodings of a catalog. File I/O stays in the app layer.

pub mod persistence;

pub use persistence::{
    MAX_SNAPSHOT_PAYLOAD_SIZE, SnapshotHeader, catalog_from_bytes, catalog_to_bytes,
    snapshot_from_bytes, snapshot_to_bytes,
};
