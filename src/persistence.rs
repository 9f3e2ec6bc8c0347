//! Persistence: save and load the full exchange state to a file.
//! Enables recovery after restart: balances, resting orders, chain pointers,
//! fee schedule, and per-market id counters are all restored.

use crate::engine::ExchangeSnapshot;
use std::path::Path;

/// File-based persistence: one JSON file. Save after state changes; load on
/// startup.
#[derive(Clone, Debug)]
pub struct FilePersistence {
    path: std::path::PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Save a snapshot to the file. Overwrites an existing file.
    pub fn save(&self, snapshot: &ExchangeSnapshot) -> Result<(), String> {
        let json = serde_json::to_string_pretty(snapshot).map_err(|e| e.to_string())?;
        std::fs::write(&self.path, json).map_err(|e| e.to_string())
    }

    /// Load a snapshot. Returns `None` if the file does not exist.
    pub fn load(&self) -> Result<Option<ExchangeSnapshot>, String> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        let snapshot: ExchangeSnapshot = serde_json::from_str(&data).map_err(|e| e.to_string())?;
        Ok(Some(snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Exchange;
    use crate::events::InMemoryEventSink;
    use crate::types::{AccountId, AssetId, Side, UNIT};
    use std::sync::Arc;

    #[test]
    fn save_and_load_round_trip() {
        let dir = std::env::temp_dir().join("dex_matching_engine_persistence_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        let _ = std::fs::remove_file(&path);
        let persistence = FilePersistence::new(&path);

        assert!(persistence.load().unwrap().is_none());

        let mut exchange = Exchange::with_events(Arc::new(InMemoryEventSink::new()));
        let token = AssetId(1);
        let bob = AccountId(2);
        exchange.deposit(token, bob, 2 * UNIT).unwrap();
        let id = exchange
            .create_order(token, bob, UNIT, UNIT, Side::Sell)
            .unwrap();

        persistence.save(&exchange.snapshot()).unwrap();
        let loaded = persistence.load().unwrap().expect("saved state");
        let restored = Exchange::from_snapshot(loaded, Arc::new(InMemoryEventSink::new()));

        assert_eq!(restored.get_balance(token, bob), exchange.get_balance(token, bob));
        assert_eq!(restored.get_order(token, id), exchange.get_order(token, id));
        let _ = std::fs::remove_file(&path);
    }
}
