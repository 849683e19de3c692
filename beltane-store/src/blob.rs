//! MessagePack serialization for history and autosave snapshot blobs.

use beltane_types::CompositionSnapshot;

pub fn serialize_snapshot(
    snapshot: &CompositionSnapshot,
) -> Result<Vec<u8>, rmp_serde::encode::Error> {
    rmp_serde::to_vec(snapshot)
}

pub fn deserialize_snapshot(
    bytes: &[u8],
) -> Result<CompositionSnapshot, rmp_serde::decode::Error> {
    rmp_serde::from_slice(bytes)
}
