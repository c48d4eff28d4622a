use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone};
use chrono_tz::Tz;
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Node, Selector};

use crate::types::{AFFIRMATIVE, CIVIL_TZ, GameRecord};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Failed to parse URL: {0}")]
    UrlParse(String),
    #[error("Failed to parse date: {0}")]
    DateParse(String),
    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Last path segment of the listing page itself. Anything carrying this id is
/// the listing, never a game.
pub const LISTING_SEGMENT: &str = "games";

const EVENT_DATE_LAYOUT: &str = "%d %b %Y %H:%M";

// Only the months the event runs in are translated.
const MONTHS: [(&str, &str); 2] = [("marzo", "Mar"), ("abril", "Apr")];

static RE_NON_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9]+").expect("invalid regex: non digits"));

static ENTRY_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div.games a"));
static ENTRY_TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p.game_title"));
static ENTRY_SYSTEM_SEL: LazyLock<Selector> = LazyLock::new(|| selector("p:nth-child(2)"));
static PAGINATION_SEL: LazyLock<Selector> =
    LazyLock::new(|| selector("ul.pagination li a[href]"));

static PANEL_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div.panel-body"));
static TITLE_SEL: LazyLock<Selector> = LazyLock::new(|| selector("h3"));
static CONTENT_SEL: LazyLock<Selector> = LazyLock::new(|| selector("div"));
static LABEL_SEL: LazyLock<Selector> = LazyLock::new(|| selector("strong"));

const LAST_POSITION: usize = 16;

static POSITION_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    (1..=LAST_POSITION)
        .map(|i| selector(&format!("p:nth-child({i})")))
        .collect()
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector '{css}': {e}"))
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>()
}

/// Strips every non-digit and parses what is left. `None` when no digits remain
/// or the number does not fit.
pub fn extract_integer(text: &str) -> Option<u32> {
    RE_NON_DIGITS.replace_all(text, "").parse::<u32>().ok()
}

/// Hour count as a duration. The sign is not checked.
pub fn extract_duration(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours).unwrap_or(if hours < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

/// Parses dates like `Sábado 15 marzo 2025 20:00` in the civil time zone. The
/// leading weekday is dropped without being checked.
pub fn parse_event_date(text: &str) -> Result<DateTime<Tz>, ParseError> {
    let cleaned = MONTHS
        .iter()
        .fold(text.replace('\n', ""), |s, (es, en)| s.replace(es, en));
    let cleaned = cleaned.trim();

    let date_part = match cleaned.split_once(' ') {
        Some((_weekday, rest)) => rest,
        None => cleaned,
    };

    let naive = NaiveDateTime::parse_from_str(date_part, EVENT_DATE_LAYOUT)
        .map_err(|e| ParseError::DateParse(format!("'{}': {}", text.trim(), e)))?;

    // A wall time skipped by the spring DST change moves forward by the gap.
    CIVIL_TZ
        .from_local_datetime(&naive)
        .earliest()
        .or_else(|| {
            naive
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|shifted| CIVIL_TZ.from_local_datetime(&shifted).earliest())
        })
        .ok_or_else(|| ParseError::DateParse(format!("Nonexistent local time: {}", naive)))
}

/// Drops a leading `:` and the whitespace around it. Text without a colon only
/// gets trimmed.
pub fn strip_label_text(text: &str) -> &str {
    let text = text.trim_start();
    text.strip_prefix(':').unwrap_or(text).trim()
}

/// Value of a `<strong>Label</strong>: Value` paragraph.
pub fn strip_label(fragment: ElementRef) -> String {
    let text: String = fragment
        .descendants()
        .filter_map(|node| match node.value() {
            Node::Text(text)
                if !node
                    .ancestors()
                    .take_while(|a| a.id() != fragment.id())
                    .any(|a| a.value().as_element().is_some_and(|e| e.name() == "strong")) =>
            {
                Some(&**text)
            }
            _ => None,
        })
        .collect();
    strip_label_text(&text).to_string()
}

/// Final path segment of an absolute or relative link, ignoring query and
/// trailing slashes.
pub fn last_path_segment(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.split(['?', '#']).next().unwrap_or_default().to_string(),
    };
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

fn is_affirmative(text: &str) -> bool {
    text.trim() == AFFIRMATIVE
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub games: Vec<GameRecord>,
    /// Raw pagination hrefs, unresolved.
    pub pagination: Vec<String>,
}

pub fn parse_listing_page(html: &str) -> ListingPage {
    let document = Html::parse_document(html);

    let games = document
        .select(&ENTRY_SEL)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let Some(id) = last_path_segment(href) else {
                log::warn!("Skipping listing entry with unusable link: {:?}", href);
                return None;
            };
            if id == LISTING_SEGMENT {
                return None;
            }

            let title = anchor
                .select(&ENTRY_TITLE_SEL)
                .next()
                .map(elem_text)
                .unwrap_or_default();
            let system = anchor
                .select(&ENTRY_SYSTEM_SEL)
                .next()
                .map(elem_text)
                .unwrap_or_default();

            Some(GameRecord::listed(&id, href, &title, &system))
        })
        .collect();

    let pagination = document
        .select(&PAGINATION_SEL)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect();

    ListingPage { games, pagination }
}

/// Paragraph at a 1-based child position of the content block.
fn nth_paragraph<'a>(content: ElementRef<'a>, position: usize) -> Option<ElementRef<'a>> {
    let sel = POSITION_SELS.get(position.checked_sub(1)?)?;
    content.select(sel).next()
}

fn labeled_value(content: ElementRef, position: usize) -> String {
    nth_paragraph(content, position)
        .map(strip_label)
        .unwrap_or_default()
}

fn plain_value(content: ElementRef, position: usize) -> String {
    nth_paragraph(content, position)
        .map(|p| elem_text(p).trim().to_string())
        .unwrap_or_default()
}

/// A labeled paragraph found in the variable part of the detail page.
struct LabeledBlock {
    value: String,
    next_paragraph: String,
}

type FieldSetter = fn(&mut GameRecord, &LabeledBlock);

fn set_master_description(game: &mut GameRecord, block: &LabeledBlock) {
    game.master_description = block.next_paragraph.clone();
}

fn set_channel(game: &mut GameRecord, block: &LabeledBlock) {
    game.channel = block.value.clone();
}

fn set_max_players(game: &mut GameRecord, block: &LabeledBlock) {
    game.max_players = extract_integer(&block.value).unwrap_or_default();
}

fn set_registered_players(game: &mut GameRecord, block: &LabeledBlock) {
    game.registered_players = extract_integer(&block.value).unwrap_or_default();
}

/// Lowercased label text to the field it fills.
const LABELED_FIELDS: &[(&str, FieldSetter)] = &[
    ("sobre la directora", set_master_description),
    ("canal de emision", set_channel),
    ("canal de emisión", set_channel),
    ("número máximo de jugadoras", set_max_players),
    ("número de jugadoras registradas", set_registered_players),
];

const LABELED_POSITIONS: std::ops::RangeInclusive<usize> = 11..=15;

fn setter_for(label: &str) -> Option<FieldSetter> {
    let label = label.trim().trim_end_matches(':').trim().to_lowercase();
    LABELED_FIELDS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, setter)| *setter)
}

/// Builds a full record out of one `div.panel-body` fragment. Broken fields fall
/// back to their zero value.
pub fn parse_game_fragment(panel: ElementRef, url: &str, id: &str) -> GameRecord {
    let title = panel
        .select(&TITLE_SEL)
        .next()
        .map(elem_text)
        .unwrap_or_default();

    let mut game = GameRecord {
        id: id.trim().to_string(),
        link: url.trim().to_string(),
        title: title.trim().to_string(),
        ..GameRecord::default()
    };

    let Some(content) = panel.select(&CONTENT_SEL).next() else {
        log::warn!("Game {} has no content block", id);
        return game;
    };

    game.master_name = labeled_value(content, 1);
    game.description = plain_value(content, 2);
    game.security = labeled_value(content, 3);
    game.sensible_content = labeled_value(content, 4);
    game.system = labeled_value(content, 5);
    game.platform = labeled_value(content, 6);

    let raw_date = labeled_value(content, 7);
    match parse_event_date(&raw_date) {
        Ok(start) => game.start_date = start,
        Err(e) => log::warn!("Game {} keeps the zero start date: {}", id, e),
    }

    let raw_duration = labeled_value(content, 8);
    game.duration_hours = extract_integer(&raw_duration)
        .filter(|&hours| {
            game.start_date
                .checked_add_signed(extract_duration(i64::from(hours)))
                .is_some()
        })
        .unwrap_or_else(|| {
            log::debug!("Game {} has no usable duration in {:?}", id, raw_duration);
            0
        });

    game.streamed = is_affirmative(&labeled_value(content, 9));
    game.initiation_game = is_affirmative(&labeled_value(content, 10));

    for position in LABELED_POSITIONS {
        let Some(paragraph) = nth_paragraph(content, position) else {
            continue;
        };
        let label: String = paragraph.select(&LABEL_SEL).map(elem_text).collect();
        let Some(setter) = setter_for(&label) else {
            continue;
        };
        let block = LabeledBlock {
            value: strip_label(paragraph),
            next_paragraph: plain_value(content, position + 1),
        };
        setter(&mut game, &block);
    }

    game
}

/// Parses a game detail page. Returns `Ok(None)` when `url` is the listing page
/// rather than a game.
pub fn parse_game_detail(html: &str, url: &str) -> Result<Option<GameRecord>, ParseError> {
    let id = last_path_segment(url)
        .ok_or_else(|| ParseError::UrlParse(format!("No game id in {}", url)))?;
    if id == LISTING_SEGMENT {
        return Ok(None);
    }

    let document = Html::parse_document(html);
    let panel = document
        .select(&PANEL_SEL)
        .find(|panel| panel.select(&TITLE_SEL).next().is_some())
        .or_else(|| document.select(&PANEL_SEL).next())
        .ok_or_else(|| ParseError::MissingField(format!("div.panel-body in {}", url)))?;

    Ok(Some(parse_game_fragment(panel, url, &id)))
}
