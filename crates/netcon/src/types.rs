use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::fmt::Display;

/// Time zone every event date on the site is published in.
pub const CIVIL_TZ: Tz = chrono_tz::Europe::Madrid;

/// The site's "yes" answer for boolean fields.
pub const AFFIRMATIVE: &str = "Si";

/// Timestamp used when an event date could not be parsed.
pub fn zero_timestamp() -> DateTime<Tz> {
    DateTime::<Utc>::UNIX_EPOCH.with_timezone(&CIVIL_TZ)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    pub link: String,
    pub title: String,
    pub system: String,
    pub description: String,
    pub master_name: String,
    pub master_description: String,
    pub start_date: DateTime<Tz>,
    pub duration_hours: u32,
    pub security: String,
    pub sensible_content: String,
    pub platform: String,
    pub channel: String,
    pub streamed: bool,
    pub initiation_game: bool,
    pub max_players: u32,
    pub registered_players: u32,
}

impl Default for GameRecord {
    fn default() -> Self {
        Self {
            id: String::new(),
            link: String::new(),
            title: String::new(),
            system: String::new(),
            description: String::new(),
            master_name: String::new(),
            master_description: String::new(),
            start_date: zero_timestamp(),
            duration_hours: 0,
            security: String::new(),
            sensible_content: String::new(),
            platform: String::new(),
            channel: String::new(),
            streamed: false,
            initiation_game: false,
            max_players: 0,
            registered_players: 0,
        }
    }
}

impl GameRecord {
    /// Identity-only record, as discovered on a listing page.
    pub fn listed(id: &str, link: &str, title: &str, system: &str) -> Self {
        Self {
            id: id.trim().to_string(),
            link: link.trim().to_string(),
            title: title.trim().to_string(),
            system: system.trim().to_string(),
            ..Self::default()
        }
    }

    /// Always `start_date + duration_hours`. Falls back to `start_date` if the sum
    /// leaves chrono's representable range.
    pub fn end_date(&self) -> DateTime<Tz> {
        self.start_date
            .checked_add_signed(self.duration())
            .unwrap_or(self.start_date)
    }

    pub fn duration(&self) -> TimeDelta {
        crate::parser::extract_duration(i64::from(self.duration_hours))
    }

    pub fn duration_display(&self) -> String {
        self.duration_hours.to_string()
    }

    pub fn completed(&self) -> bool {
        self.max_players == self.registered_players
    }

    /// Negative when the game is overbooked.
    pub fn free_seats(&self) -> i64 {
        i64::from(self.max_players) - i64::from(self.registered_players)
    }
}

impl Display for GameRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "#{} [{}/{}] {}",
            self.id, self.registered_players, self.max_players, self.title
        )?;
        if !self.system.is_empty() {
            write!(f, " ({})", self.system)?;
        }
        write!(f, " — {}", self.start_date.format("%Y-%m-%d %H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_listed_record_has_only_identity_fields() {
        let record = GameRecord::listed(" 42 ", "/games/42", " Crónicas\n", "D&D ");

        assert_eq!(record.id, "42");
        assert_eq!(record.link, "/games/42");
        assert_eq!(record.title, "Crónicas");
        assert_eq!(record.system, "D&D");
        assert_eq!(record.description, "");
        assert_eq!(record.master_name, "");
        assert_eq!(record.start_date, zero_timestamp());
        assert_eq!(record.duration_hours, 0);
        assert!(!record.streamed);
        assert!(!record.initiation_game);
        assert_eq!(record.max_players, 0);
        assert_eq!(record.registered_players, 0);
    }

    #[test]
    fn test_end_date_follows_duration() {
        let record = GameRecord {
            start_date: CIVIL_TZ.with_ymd_and_hms(2025, 3, 15, 20, 0, 0).unwrap(),
            duration_hours: 4,
            ..GameRecord::default()
        };

        assert_eq!(
            record.end_date(),
            CIVIL_TZ.with_ymd_and_hms(2025, 3, 16, 0, 0, 0).unwrap()
        );
        assert_eq!(record.end_date() - record.start_date, TimeDelta::hours(4));
        assert_eq!(record.duration_display(), "4");
    }

    #[test]
    fn test_end_date_across_dst_change_is_absolute() {
        // Clocks jump from 02:00 to 03:00 on 2025-03-30 in Madrid.
        let record = GameRecord {
            start_date: CIVIL_TZ.with_ymd_and_hms(2025, 3, 29, 23, 0, 0).unwrap(),
            duration_hours: 4,
            ..GameRecord::default()
        };

        assert_eq!(record.end_date().format("%H:%M").to_string(), "04:00");
        assert_eq!(record.end_date() - record.start_date, TimeDelta::hours(4));
    }

    #[test]
    fn test_completed() {
        let empty = GameRecord::default();
        assert!(empty.completed(), "0/0 counts as completed");

        let open = GameRecord {
            max_players: 5,
            registered_players: 3,
            ..GameRecord::default()
        };
        assert!(!open.completed());
        assert_eq!(open.free_seats(), 2);

        let overbooked = GameRecord {
            max_players: 4,
            registered_players: 6,
            ..GameRecord::default()
        };
        assert!(!overbooked.completed());
        assert_eq!(overbooked.free_seats(), -2);
    }

    #[test]
    fn test_display() {
        let record = GameRecord {
            id: "7".into(),
            title: "La Llamada".into(),
            system: "Cthulhu".into(),
            max_players: 5,
            registered_players: 2,
            start_date: CIVIL_TZ.with_ymd_and_hms(2025, 4, 5, 17, 30, 0).unwrap(),
            ..GameRecord::default()
        };

        assert_eq!(
            record.to_string(),
            "#7 [2/5] La Llamada (Cthulhu) — 2025-04-05 17:30"
        );
    }

    #[test]
    fn test_serialize_uses_camel_case_keys() {
        let record = GameRecord {
            master_name: "Ana".into(),
            duration_hours: 3,
            start_date: CIVIL_TZ.with_ymd_and_hms(2025, 4, 5, 17, 30, 0).unwrap(),
            ..GameRecord::listed("7", "/games/7", "La Llamada", "Cthulhu")
        };

        let json = serde_json::to_value(&record).expect("Failed to serialize record");

        assert_eq!(json["id"], "7");
        assert_eq!(json["masterName"], "Ana");
        assert_eq!(json["durationHours"], 3);
        assert_eq!(json["startDate"], "2025-04-05T17:30:00+02:00");
        assert_eq!(json["registeredPlayers"], 0);
        assert!(json.get("master_name").is_none());
    }
}
