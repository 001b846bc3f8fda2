//! Big-endian key encoding

use super::StorageError;
use crate::types::QuakeId;

pub const QUAKE_KEY_LEN: usize = 8;
pub const LINK_KEY_LEN: usize = QUAKE_KEY_LEN + 4;

/// Summary and ledger key
pub const fn quake_key(quake_id: QuakeId) -> [u8; QUAKE_KEY_LEN] {
    quake_id.to_be_bytes()
}

/// Link key: quake id then the link's ordinal within that quake
pub fn link_key(quake_id: QuakeId, ordinal: u32) -> [u8; LINK_KEY_LEN] {
    let mut key = [0u8; LINK_KEY_LEN];
    key[..QUAKE_KEY_LEN].copy_from_slice(&quake_id.to_be_bytes());
    key[QUAKE_KEY_LEN..].copy_from_slice(&ordinal.to_be_bytes());
    key
}

/// Quake id from either key shape
pub fn quake_from_key(key: &[u8], tree: &'static str) -> Result<QuakeId, StorageError> {
    if key.len() != QUAKE_KEY_LEN && key.len() != LINK_KEY_LEN {
        return Err(StorageError::MalformedKey { tree, len: key.len() });
    }
    let mut id = [0u8; QUAKE_KEY_LEN];
    id.copy_from_slice(&key[..QUAKE_KEY_LEN]);
    Ok(QuakeId::from_be_bytes(id))
}
