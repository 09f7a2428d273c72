//! # Engine Limits
//!
//! Hardcoded constants for the bomcraft engine.
//!
//! These are compiled into the binary and are immutable at runtime.
//! Configuration may lower a bound, never raise it.

/// Magic bytes for the catalog snapshot header.
///
/// - File Header = Magic Bytes ("BOMC") + Version (u8) before payload.
pub const MAGIC_BYTES: &[u8; 4] = b"BOMC";

/// Current snapshot format version.
///
/// Increment this when making breaking changes to the snapshot format.
pub const FORMAT_VERSION: u8 = 1;

/// Default expansion depth for a resolve call.
pub const DEFAULT_RESOLVE_DEPTH: usize = 64;

/// Hard cap on expansion depth.
///
/// Every resolve call is bounded by this, whatever the caller asks for,
/// so a pathological catalog cannot grow the stack without limit.
pub const MAX_RESOLVE_DEPTH: usize = 256;

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length of an item name, in bytes (the source schema used VARCHAR(255)).
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of component edges on a single item.
pub const MAX_COMPONENTS_PER_ITEM: usize = 256;

/// Maximum number of records accepted by one seeding run.
pub const MAX_SEED_RECORDS: usize = 100_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_depth_within_cap() {
        assert!(DEFAULT_RESOLVE_DEPTH <= MAX_RESOLVE_DEPTH);
    }

    #[test]
    fn magic_bytes_correct() {
        assert_eq!(MAGIC_BYTES, b"BOMC");
    }
}
