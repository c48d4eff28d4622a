use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

use crate::sheets::{SheetSink, SheetsConfig, SheetsError};
use crate::store::GameStore;
use crate::types::{AFFIRMATIVE, CIVIL_TZ, GameRecord};

/// One spreadsheet cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellValue {
    Text(String),
    Bool(bool),
    Int(i64),
    Timestamp(DateTime<Tz>),
}

pub type Row = Vec<CellValue>;

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(text) => serializer.serialize_str(text),
            CellValue::Bool(value) => serializer.serialize_bool(*value),
            CellValue::Int(value) => serializer.serialize_i64(*value),
            CellValue::Timestamp(ts) => serializer.serialize_str(&ts.to_rfc3339()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<u32> for CellValue {
    fn from(value: u32) -> Self {
        CellValue::Int(i64::from(value))
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Int(value)
    }
}

impl From<DateTime<Tz>> for CellValue {
    fn from(value: DateTime<Tz>) -> Self {
        CellValue::Timestamp(value)
    }
}

pub const GAMES_HEADER: [&str; 18] = [
    "game_id",
    "title",
    "system",
    "description",
    "master_name",
    "master_description",
    "start_date",
    "duration",
    "end_date",
    "security",
    "sensible_content",
    "platform",
    "channel",
    "streamed",
    "initiation_game",
    "max_players",
    "registered_players",
    "completed",
];

pub const CALENDAR_HEADER: [&str; 14] = [
    "Update",
    "Title",
    "Start",
    "End",
    "Start Time",
    "End Time",
    "Repeat",
    "Interval",
    "Count",
    "Until",
    "By Day",
    "Description",
    "Location",
    "Timezone",
];

const FULL_GLYPH: &str = "🔒";
const OPEN_GLYPH: &str = "✨";
const STREAM_GLYPH: &str = "🎥";

fn header_row(names: &[&str]) -> Row {
    names.iter().map(|name| CellValue::from(*name)).collect()
}

/// Integer value of an id for ordering. Non-numeric ids count as 0.
fn sort_key(id: &str) -> i64 {
    id.parse::<i64>().unwrap_or(0)
}

/// Store ids in ascending numeric order. Ids with the same numeric value keep
/// their lexical order.
pub fn sorted_ids(store: &GameStore) -> Vec<String> {
    let mut ids = store.ids();
    ids.sort();
    ids.sort_by_key(|id| sort_key(id));
    ids
}

pub fn sorted_games(store: &GameStore) -> Vec<GameRecord> {
    sorted_ids(store)
        .iter()
        .filter_map(|id| store.load(id))
        .collect()
}

pub fn games_rows(games: &[GameRecord]) -> Vec<Row> {
    let mut rows = vec![header_row(&GAMES_HEADER)];
    rows.extend(games.iter().map(|game| -> Row {
        vec![
            game.id.as_str().into(),
            game.title.as_str().into(),
            game.system.as_str().into(),
            game.description.as_str().into(),
            game.master_name.as_str().into(),
            game.master_description.as_str().into(),
            game.start_date.into(),
            game.duration_display().into(),
            game.end_date().into(),
            game.security.as_str().into(),
            game.sensible_content.as_str().into(),
            game.platform.as_str().into(),
            game.channel.as_str().into(),
            game.streamed.into(),
            game.initiation_game.into(),
            game.max_players.into(),
            game.registered_players.into(),
            game.completed().into(),
        ]
    }));
    rows
}

fn calendar_title(game: &GameRecord) -> String {
    let free_seats = game.free_seats();
    let glyph = if free_seats > 0 { OPEN_GLYPH } else { FULL_GLYPH };
    let stream_mark = if game.streamed { STREAM_GLYPH } else { "" };
    format!(
        "{} [{}/{}] {} {}",
        glyph, free_seats, game.max_players, game.title, stream_mark
    )
}

fn calendar_description(game: &GameRecord) -> String {
    let streamed = if game.streamed { AFFIRMATIVE } else { "No" };
    format!(
        "🔗 Enlace: {}\n\
         👥 Plazas libres: {}/{}\n\
         🧙🏻 Organizadora: {}\n\
         🎲 Sistema: {}\n\
         🎥 Emitida: {}\n\
         ---\n\
         📝 Descripción:\n\
         {}\n\n",
        game.link,
        game.free_seats(),
        game.max_players,
        game.master_name,
        game.system,
        streamed,
        game.description
    )
}

pub fn calendar_rows(games: &[GameRecord]) -> Vec<Row> {
    let mut rows = vec![header_row(&CALENDAR_HEADER)];
    rows.extend(games.iter().map(|game| -> Row {
        let end = game.end_date();
        vec![
            "TRUE".into(),
            calendar_title(game).into(),
            game.start_date.format("%Y-%m-%d").to_string().into(),
            end.format("%Y-%m-%d").to_string().into(),
            game.start_date.format("%H:%M:%S").to_string().into(),
            end.format("%H:%M:%S").to_string().into(),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            "".into(),
            calendar_description(game).into(),
            "".into(),
            CIVIL_TZ.name().into(),
        ]
    }));
    rows
}

/// Overwrites both sheets. Stops at the first rejected write.
pub async fn export_all<S: SheetSink>(
    store: &GameStore,
    sink: &S,
    config: &SheetsConfig,
) -> Result<(), SheetsError> {
    let games = sorted_games(store);
    log::info!("Exporting {} games", games.len());

    sink.overwrite(&config.games_range, &games_rows(&games))
        .await
        .inspect_err(|e| log::error!("Unable to write games sheet: {e}"))?;
    sink.overwrite(&config.calendar_range, &calendar_rows(&games))
        .await
        .inspect_err(|e| log::error!("Unable to write calendar sheet: {e}"))?;

    Ok(())
}
