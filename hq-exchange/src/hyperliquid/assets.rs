//! Lazily-populated coin -> asset-index map (spec §4.5 "signer?, asset_index_map?"). The
//! `order`/`cancel` exchange actions address assets by index, not by name, so every write
//! path needs this resolved before it can build a wire request.

use hq_core::error::DataError;
use hq_core::Result;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Default)]
pub struct AssetIndexMap {
    by_name: RwLock<HashMap<String, u32>>,
}

impl AssetIndexMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        !self.by_name.read().is_empty()
    }

    /// Replace the whole map, in venue `universe` order (spec: asset index is the
    /// position of the coin in the `meta` response's `universe` array).
    pub fn load(&self, coins_in_order: impl IntoIterator<Item = String>) {
        let map = coins_in_order
            .into_iter()
            .enumerate()
            .map(|(index, name)| (name, index as u32))
            .collect();
        *self.by_name.write() = map;
    }

    pub fn index_of(&self, coin: &str) -> Result<u32> {
        self.by_name
            .read()
            .get(coin)
            .copied()
            .ok_or_else(|| DataError::AssetNotFound(coin.to_string()).into())
    }
}
