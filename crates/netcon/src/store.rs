use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::GameRecord;

/// Shared map from game id to record. Clones are handles to the same map.
#[derive(Debug, Clone, Default)]
pub struct GameStore {
    games: Arc<RwLock<HashMap<String, GameRecord>>>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the record under `id`.
    pub fn store(&self, id: impl Into<String>, game: GameRecord) {
        self.games
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), game);
    }

    pub fn load(&self, id: &str) -> Option<GameRecord> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Runs `f` over a snapshot taken when the call starts. Writes made while
    /// iterating are not seen, and `f` may write to the store.
    pub fn for_each(&self, mut f: impl FnMut(&str, &GameRecord)) {
        for (id, game) in self.snapshot() {
            f(&id, &game);
        }
    }

    pub fn snapshot(&self) -> Vec<(String, GameRecord)> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(id, game)| (id.clone(), game.clone()))
            .collect()
    }

    pub fn ids(&self) -> Vec<String> {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    pub fn size(&self) -> usize {
        self.games
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_store_replaces_on_conflict() {
        let store = GameStore::new();
        store.store("42", GameRecord::listed("42", "/games/42", "Crónicas", "D&D"));
        store.store(
            "42",
            GameRecord {
                max_players: 6,
                ..GameRecord::listed(
                    "42",
                    "https://app.netconplay.com/games/42",
                    "Crónicas",
                    "D&D 5e",
                )
            },
        );

        assert_eq!(store.size(), 1);
        let game = store.load("42").expect("Should find game 42");
        assert_eq!(game.system, "D&D 5e");
        assert_eq!(game.max_players, 6);
        assert!(store.load("43").is_none());
    }

    #[test]
    fn test_is_empty_until_first_store() {
        let store = GameStore::new();
        assert!(store.is_empty());

        store.store("7", GameRecord::listed("7", "/games/7", "Siete", ""));
        assert!(!store.is_empty());
        assert_eq!(store.ids(), vec!["7".to_string()]);
    }

    #[test]
    fn test_for_each_sees_snapshot() {
        let store = GameStore::new();
        store.store("1", GameRecord::listed("1", "/games/1", "Uno", ""));
        store.store("2", GameRecord::listed("2", "/games/2", "Dos", ""));

        let mut seen = Vec::new();
        store.for_each(|id, game| {
            seen.push(id.to_string());
            store.store(format!("{}0", id), game.clone());
        });

        seen.sort();
        assert_eq!(seen, vec!["1", "2"]);
        assert_eq!(store.size(), 4);
    }

    #[test]
    fn test_concurrent_writers_do_not_lose_updates() {
        let store = GameStore::new();

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                thread::spawn(move || {
                    for n in 0..50 {
                        let id = (worker * 50 + n).to_string();
                        store.store(id.clone(), GameRecord::listed(&id, "", "", ""));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("Writer panicked");
        }

        assert_eq!(store.size(), 400);
        assert_eq!(store.ids().len(), 400);
    }
}
