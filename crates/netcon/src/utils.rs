use crate::store::GameStore;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub completed: usize,
    pub open: usize,
    pub streamed: usize,
    pub initiation: usize,
}

impl RunSummary {
    pub fn from_store(store: &GameStore) -> RunSummary {
        let mut summary = RunSummary::default();
        store.for_each(|_, game| {
            summary.total += 1;
            if game.completed() {
                summary.completed += 1;
            }
            if game.free_seats() > 0 {
                summary.open += 1;
            }
            if game.streamed {
                summary.streamed += 1;
            }
            if game.initiation_game {
                summary.initiation += 1;
            }
        });
        summary
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\nStatistics:")?;
        writeln!(f, "  Full games:       {}", self.completed)?;
        writeln!(f, "  With open seats:  {}", self.open)?;
        writeln!(f, "  Streamed:         {}", self.streamed)?;
        writeln!(f, "  Initiation games: {}", self.initiation)?;
        writeln!(f, "  Total:            {}", self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameRecord;

    #[test]
    fn test_summary_counts() {
        let store = GameStore::new();
        store.store(
            "1",
            GameRecord {
                max_players: 5,
                registered_players: 5,
                streamed: true,
                ..GameRecord::listed("1", "", "", "")
            },
        );
        store.store(
            "2",
            GameRecord {
                max_players: 5,
                registered_players: 2,
                initiation_game: true,
                ..GameRecord::listed("2", "", "", "")
            },
        );
        store.store("3", GameRecord::listed("3", "", "", ""));

        let summary = RunSummary::from_store(&store);

        assert_eq!(
            summary,
            RunSummary {
                total: 3,
                completed: 2,
                open: 1,
                streamed: 1,
                initiation: 1,
            }
        );
        assert!(summary.to_string().contains("Total:            3"));
    }
}
