//! Report composer.
//!
//! Renders fetched readings and incident reports into a chat message. Each
//! operation is pure given its inputs and a `now` timestamp; the wall-clock
//! wrappers exist for callers that do not inject time.
//!
//! Empty input is never an error. Every operation degrades to a
//! `PlainText` fallback, and no carousel is ever built with zero cards.
//!
//! Submodules:
//! - `card` — message and card shapes.
//! - `theme` — severity → styling table.

pub mod card;
pub mod theme;

use chrono::{DateTime, FixedOffset, Offset, Utc};

use crate::alert::staleness::{age_minutes_at, is_stale_at};
use crate::alert::thresholds::SeverityThresholds;
use crate::analysis::trend::{Assessment, Direction, TrendAssessment, assess_trend};
use crate::config::{ComposerConfig, LINE_MAX_CAROUSEL_CARDS};
use crate::model::{IncidentReport, Reading};

pub use card::{CardAction, CardPayload, CardRow, RenderedMessage};
use theme::{HISTORY_BACKGROUND, INCIDENT_BACKGROUND, NOTICE_COLOR, asset_url, theme_for};

// ---------------------------------------------------------------------------
// Fallback texts
// ---------------------------------------------------------------------------

pub const LEVEL_UNAVAILABLE: &str =
    "Water level data is currently unavailable. Please try again later.";
pub const HISTORY_UNAVAILABLE: &str = "No water level history is available right now.";
pub const NO_OVERALL_DATA: &str = "No water level or incident data is available right now.";

fn no_incidents_text(window_hours: i64) -> String {
    format!("No incident reports in the last {window_hours} hours.")
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Composer {
    thresholds: SeverityThresholds,
    config: ComposerConfig,
    display_offset: FixedOffset,
}

impl Composer {
    /// `config` is expected to have passed `RelayConfig::validate`; an
    /// out-of-range offset falls back to UTC, a zero page size is treated as
    /// 1 and the carousel cap is held within LINE's limit.
    pub fn new(thresholds: SeverityThresholds, config: ComposerConfig) -> Self {
        let display_offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix());
        Self {
            thresholds,
            config,
            display_offset,
        }
    }

    // --- Current level ------------------------------------------------------

    pub fn render_current_level(&self, readings: &[Reading]) -> RenderedMessage {
        self.render_current_level_at(readings, Utc::now())
    }

    /// Single card for the newest reading, themed by severity.
    pub fn render_current_level_at(
        &self,
        readings: &[Reading],
        now: DateTime<Utc>,
    ) -> RenderedMessage {
        match assess_trend(readings, &self.thresholds) {
            Assessment::NoData => RenderedMessage::plain(LEVEL_UNAVAILABLE),
            Assessment::Trend(trend) => RenderedMessage::SingleCard {
                alt_text: format!(
                    "Water level {:.1} cm ({})",
                    trend.current_level_cm,
                    theme_for(trend.severity).status_label
                ),
                card: self.current_level_card(&trend, now),
            },
        }
    }

    fn current_level_card(&self, trend: &TrendAssessment, now: DateTime<Utc>) -> CardPayload {
        let theme = theme_for(trend.severity);
        let mut card = CardPayload::new("Current water level")
            .with_hero(asset_url(self.config.asset_base_url.as_deref(), theme.background))
            .with_accent(theme.accent_color)
            .with_row(CardRow::new("Level", format!("{:.1} cm", trend.current_level_cm)))
            .with_row(CardRow::new("Status", theme.status_label).with_color(theme.accent_color))
            .with_row(CardRow::new("Trend", trend_line(trend.direction, trend.rate_per_hour)))
            .with_row(CardRow::new("Updated", self.format_time(trend.observed_at)));

        let newest = Reading::new(trend.current_level_cm, trend.observed_at);
        if is_stale_at(&newest, self.config.stale_after_minutes, now) {
            card = card.with_row(
                CardRow::new(
                    "Notice",
                    format!("No new reading for {} minutes", age_minutes_at(&newest, now)),
                )
                .with_color(NOTICE_COLOR),
            );
        }
        card
    }

    // --- History ------------------------------------------------------------

    /// One card per `history_page_size` readings, numbered 1..N across cards.
    pub fn render_history(&self, readings: &[Reading]) -> RenderedMessage {
        if readings.is_empty() {
            return RenderedMessage::plain(HISTORY_UNAVAILABLE);
        }

        let page_size = self.config.history_page_size.max(1);
        let pages = readings.len().div_ceil(page_size);
        let hero = asset_url(self.config.asset_base_url.as_deref(), HISTORY_BACKGROUND);

        let mut cards: Vec<CardPayload> = readings
            .chunks(page_size)
            .enumerate()
            .map(|(page, chunk)| {
                let first_number = page * page_size + 1;
                let rows = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, reading)| self.history_row(first_number + i, reading))
                    .collect();
                CardPayload {
                    rows,
                    ..CardPayload::new(format!("Level history ({}/{})", page + 1, pages))
                        .with_hero(hero.clone())
                }
            })
            .collect();

        let cap = self.carousel_cap();
        cards.truncate(cap);
        if let Some(uri) = self.config.see_more_url.as_deref() {
            if cards.len() < cap {
                cards.push(CardPayload::new("More history").with_action("See more", uri));
            }
        }

        RenderedMessage::CardCarousel {
            alt_text: format!("Water level history: {} readings", readings.len()),
            cards,
        }
    }

    fn history_row(&self, number: usize, reading: &Reading) -> CardRow {
        let relative = if number == 1 {
            "latest".to_string()
        } else {
            format!("{} earlier", number - 1)
        };
        CardRow::new(
            format!("{number}. {relative}"),
            format!("{:.1} cm · {}", reading.level_cm, self.format_time(reading.observed_at)),
        )
    }

    // --- Incidents ----------------------------------------------------------

    pub fn render_incidents(
        &self,
        reports: &[IncidentReport],
        window_hours: i64,
    ) -> RenderedMessage {
        self.render_incidents_at(reports, window_hours, Utc::now())
    }

    /// One card per report. `reports` must already be limited to the window.
    pub fn render_incidents_at(
        &self,
        reports: &[IncidentReport],
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> RenderedMessage {
        let cards = self.incident_cards(reports, now);
        if cards.is_empty() {
            return RenderedMessage::plain(no_incidents_text(window_hours));
        }
        RenderedMessage::CardCarousel {
            alt_text: format!(
                "{} incident report(s) in the last {} hours",
                reports.len(),
                window_hours
            ),
            cards,
        }
    }

    fn incident_cards(&self, reports: &[IncidentReport], now: DateTime<Utc>) -> Vec<CardPayload> {
        let hero = asset_url(self.config.asset_base_url.as_deref(), INCIDENT_BACKGROUND);
        reports
            .iter()
            .take(self.carousel_cap())
            .map(|report| {
                CardPayload::new(report.area_name.clone())
                    .with_hero(hero.clone())
                    .with_row(CardRow::new("Severity", report.severity.clone()))
                    .with_row(CardRow::new("Details", report.description_or_placeholder()))
                    .with_row(CardRow::new("Reported", hours_ago(report.observed_at, now)))
            })
            .collect()
    }

    // --- Combined -----------------------------------------------------------

    pub fn render_combined(
        &self,
        readings: &[Reading],
        reports: &[IncidentReport],
        window_hours: i64,
    ) -> RenderedMessage {
        self.render_combined_at(readings, reports, window_hours, Utc::now())
    }

    /// Current-level card first, then incident cards in their original order.
    pub fn render_combined_at(
        &self,
        readings: &[Reading],
        reports: &[IncidentReport],
        window_hours: i64,
        now: DateTime<Utc>,
    ) -> RenderedMessage {
        let trend = assess_trend(readings, &self.thresholds);
        let level_card = trend.trend().map(|t| self.current_level_card(t, now));

        let cards: Vec<CardPayload> = level_card
            .into_iter()
            .chain(self.incident_cards(reports, now))
            .take(self.carousel_cap())
            .collect();

        if cards.is_empty() {
            return RenderedMessage::plain(NO_OVERALL_DATA);
        }

        let level_part = match trend.trend() {
            Some(t) => format!(
                "level {:.1} cm ({})",
                t.current_level_cm,
                theme_for(t.severity).status_label
            ),
            None => "level unavailable".to_string(),
        };
        RenderedMessage::CardCarousel {
            alt_text: format!(
                "Flood summary: {}, {} report(s) in the last {} hours",
                level_part,
                reports.len(),
                window_hours
            ),
            cards,
        }
    }

    // --- Helpers ------------------------------------------------------------

    fn carousel_cap(&self) -> usize {
        self.config.max_carousel_cards.clamp(1, LINE_MAX_CAROUSEL_CARDS)
    }

    fn format_time(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.display_offset)
            .format("%d %b %Y %H:%M")
            .to_string()
    }
}

fn trend_line(direction: Direction, rate_per_hour: f64) -> String {
    let label = match direction {
        Direction::Rising => "Rising",
        Direction::Falling => "Falling",
        Direction::Steady => "Steady",
    };
    format!("{label} ({rate_per_hour:+.2} cm/h)")
}

/// Whole hours between observation and `now`, never negative.
fn hours_ago(observed_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    match (now - observed_at).num_hours().max(0) {
        1 => "1 hour ago".to_string(),
        n => format!("{n} hours ago"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn composer() -> Composer {
        Composer::new(SeverityThresholds::new(20.0, 40.0), ComposerConfig::default())
    }

    fn composer_with(config: ComposerConfig) -> Composer {
        Composer::new(SeverityThresholds::new(20.0, 40.0), config)
    }

    /// `count` readings, newest first, 15 minutes apart, ending at `fixed_now`.
    fn readings(count: usize) -> Vec<Reading> {
        (0..count)
            .map(|i| Reading::new(30.0 - i as f64, fixed_now() - Duration::minutes(15 * i as i64)))
            .collect()
    }

    fn report(area: &str, hours_before_now: i64, description: Option<&str>) -> IncidentReport {
        IncidentReport {
            area_name: area.to_string(),
            severity: "high".to_string(),
            description: description.map(String::from),
            observed_at: fixed_now() - Duration::hours(hours_before_now),
        }
    }

    /// `count` reports one hour old, named "Area 0", "Area 1", ...
    fn areas(count: usize) -> Vec<IncidentReport> {
        (0..count).map(|i| report(&format!("Area {i}"), 1, None)).collect()
    }

    fn row<'a>(card: &'a CardPayload, label: &str) -> &'a CardRow {
        card.rows
            .iter()
            .find(|r| r.label == label)
            .unwrap_or_else(|| panic!("card {:?} has no {label} row", card.title))
    }

    // --- Current level ------------------------------------------------------

    #[test]
    fn test_current_level_without_readings_is_plain_text() {
        let message = composer().render_current_level_at(&[], fixed_now());
        assert_eq!(message, RenderedMessage::plain(LEVEL_UNAVAILABLE));
    }

    #[test]
    fn test_current_level_card_contents() {
        let readings = vec![
            Reading::new(45.0, fixed_now()),
            Reading::new(25.0, fixed_now() - Duration::hours(2)),
        ];
        let message = composer().render_current_level_at(&readings, fixed_now());

        let RenderedMessage::SingleCard { alt_text, card } = &message else {
            panic!("expected a single card, got {message:?}");
        };
        assert_eq!(alt_text, "Water level 45.0 cm (Danger)");
        assert_eq!(row(card, "Level").value, "45.0 cm");
        assert_eq!(row(card, "Status").value, "Danger");
        assert_eq!(row(card, "Status").color.as_deref(), Some("#C0392B"));
        assert_eq!(row(card, "Trend").value, "Rising (+10.00 cm/h)");
        // 13:00 UTC shown at the default UTC+7 offset.
        assert_eq!(row(card, "Updated").value, "01 May 2024 20:00");
        assert_eq!(card.accent_color.as_deref(), Some("#C0392B"));
        assert!(card.rows.iter().all(|r| r.label != "Notice"));
    }

    #[test]
    fn test_current_level_theme_follows_tier() {
        let cases = [(5.0, "Normal"), (20.0, "Warning"), (40.0, "Danger")];
        for (level, label) in cases {
            let readings = [Reading::new(level, fixed_now())];
            let message = composer().render_current_level_at(&readings, fixed_now());
            assert_eq!(row(&message.cards()[0], "Status").value, label, "level {level}");
        }
    }

    #[test]
    fn test_current_level_hero_uses_asset_base() {
        let composer = composer_with(ComposerConfig {
            asset_base_url: Some("https://cdn.example.org/flomon".to_string()),
            ..ComposerConfig::default()
        });
        let readings = [Reading::new(10.0, fixed_now())];
        let message = composer.render_current_level_at(&readings, fixed_now());
        assert_eq!(
            message.cards()[0].hero_image_url.as_deref(),
            Some("https://cdn.example.org/flomon/level_normal.png")
        );
    }

    #[test]
    fn test_stale_reading_adds_notice() {
        let old = vec![Reading::new(12.0, fixed_now() - Duration::minutes(90))];
        let message = composer().render_current_level_at(&old, fixed_now());
        assert_eq!(row(&message.cards()[0], "Notice").value, "No new reading for 90 minutes");
    }

    // --- History ------------------------------------------------------------

    #[test]
    fn test_history_without_readings_is_plain_text() {
        assert_eq!(composer().render_history(&[]), RenderedMessage::plain(HISTORY_UNAVAILABLE));
    }

    #[test]
    fn test_history_twelve_rows_paginate_into_three_cards() {
        let message = composer().render_history(&readings(12));
        let RenderedMessage::CardCarousel { cards, alt_text } = &message else {
            panic!("expected a carousel, got {message:?}");
        };
        assert_eq!(alt_text, "Water level history: 12 readings");

        let row_counts: Vec<usize> = cards.iter().map(|c| c.rows.len()).collect();
        assert_eq!(row_counts, vec![5, 5, 2]);

        let numbers: Vec<usize> = cards
            .iter()
            .flat_map(|c| c.rows.iter())
            .map(|r| r.label.split('.').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(numbers, (1..=12).collect::<Vec<_>>());
        assert_eq!(cards[2].title, "Level history (3/3)");
    }

    #[test]
    fn test_history_card_count_is_ceil_of_page_size() {
        for n in 1..=20 {
            let message = composer().render_history(&readings(n));
            assert_eq!(message.cards().len(), n.div_ceil(5), "{n} readings");
        }
    }

    #[test]
    fn test_history_preserves_order_and_relative_index() {
        let message = composer().render_history(&readings(3));
        let rows = &message.cards()[0].rows;
        assert_eq!(rows[0].label, "1. latest");
        assert_eq!(rows[2].label, "3. 2 earlier");
        assert_eq!(rows[0].value, "30.0 cm · 01 May 2024 20:00");
        assert_eq!(rows[1].value, "29.0 cm · 01 May 2024 19:45");
    }

    #[test]
    fn test_history_see_more_card_is_appended_without_rows() {
        let composer = composer_with(ComposerConfig {
            see_more_url: Some("https://example.org/levels".to_string()),
            ..ComposerConfig::default()
        });
        let cards = composer.render_history(&readings(7)).cards().to_vec();
        assert_eq!(cards.len(), 3);
        let nav = cards.last().unwrap();
        assert!(nav.rows.is_empty());
        assert_eq!(
            nav.action,
            Some(CardAction {
                label: "See more".to_string(),
                uri: "https://example.org/levels".to_string()
            })
        );
        let data_rows: usize = cards.iter().map(|c| c.rows.len()).sum();
        assert_eq!(data_rows, 7);
    }

    #[test]
    fn test_history_respects_carousel_cap() {
        let composer = composer_with(ComposerConfig {
            max_carousel_cards: 2,
            see_more_url: Some("https://example.org/levels".to_string()),
            ..ComposerConfig::default()
        });
        let cards = composer.render_history(&readings(30)).cards().to_vec();
        assert_eq!(cards.len(), 2);
        assert!(cards.iter().all(|c| c.action.is_none()));
        assert_eq!(cards[1].rows[0].label, "6. 5 earlier");
    }

    // --- Incidents ----------------------------------------------------------

    #[test]
    fn test_no_incidents_names_the_window() {
        let message = composer().render_incidents_at(&[], 24, fixed_now());
        assert_eq!(message, RenderedMessage::plain("No incident reports in the last 24 hours."));
    }

    #[test]
    fn test_incident_cards_in_order_with_placeholder() {
        let reports = vec![
            report("Riverside Market", 1, Some("Water over the footpath")),
            report("Old Bridge", 5, None),
        ];
        let message = composer().render_incidents_at(&reports, 24, fixed_now());
        let RenderedMessage::CardCarousel { cards, .. } = &message else {
            panic!("expected a carousel, got {message:?}");
        };
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].title, "Riverside Market");
        assert_eq!(row(&cards[0], "Reported").value, "1 hour ago");
        assert_eq!(row(&cards[1], "Details").value, "-");
        assert_eq!(row(&cards[1], "Reported").value, "5 hours ago");
        assert_eq!(row(&cards[1], "Severity").value, "high");
    }

    #[test]
    fn test_incidents_capped_at_carousel_limit() {
        let message = composer().render_incidents_at(&areas(13), 24, fixed_now());
        let RenderedMessage::CardCarousel { alt_text, cards } = &message else {
            panic!("expected a carousel, got {message:?}");
        };
        assert_eq!(cards.len(), 12);
        assert_eq!(cards[0].title, "Area 0");
        assert_eq!(cards[11].title, "Area 11");
        assert_eq!(alt_text, "13 incident report(s) in the last 24 hours");
    }

    #[test]
    fn test_configured_cap_above_line_limit_is_clamped() {
        let composer = composer_with(ComposerConfig {
            max_carousel_cards: 40,
            ..ComposerConfig::default()
        });
        let message = composer.render_incidents_at(&areas(30), 24, fixed_now());
        assert_eq!(message.cards().len(), LINE_MAX_CAROUSEL_CARDS);
        assert_eq!(composer.render_history(&readings(100)).cards().len(), 12);
    }

    #[test]
    fn test_hours_ago_is_recomputed_against_render_time() {
        let reports = vec![report("Old Bridge", 2, None)];
        let first = composer().render_incidents_at(&reports, 24, fixed_now());
        let later = composer().render_incidents_at(&reports, 24, fixed_now() + Duration::hours(3));
        assert_eq!(row(&first.cards()[0], "Reported").value, "2 hours ago");
        assert_eq!(row(&later.cards()[0], "Reported").value, "5 hours ago");
    }

    #[test]
    fn test_rendering_twice_at_same_time_is_identical() {
        let reports = vec![report("Old Bridge", 2, None)];
        let c = composer();
        assert_eq!(
            c.render_combined_at(&readings(4), &reports, 24, fixed_now()),
            c.render_combined_at(&readings(4), &reports, 24, fixed_now())
        );
        assert_eq!(c.render_history(&readings(9)), c.render_history(&readings(9)));
    }

    // --- Combined -----------------------------------------------------------

    #[test]
    fn test_combined_without_any_data_is_plain_text() {
        let message = composer().render_combined_at(&[], &[], 24, fixed_now());
        assert_eq!(message, RenderedMessage::plain(NO_OVERALL_DATA));
    }

    #[test]
    fn test_combined_places_level_card_first() {
        let reports = vec![report("A", 1, None), report("B", 2, None)];
        let message = composer().render_combined_at(&readings(3), &reports, 24, fixed_now());
        let RenderedMessage::CardCarousel { cards, .. } = &message else {
            panic!("expected a carousel, got {message:?}");
        };
        let titles: Vec<&str> = cards.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Current water level", "A", "B"]);
    }

    #[test]
    fn test_combined_with_only_one_side_still_carousels() {
        let only_level = composer().render_combined_at(&readings(1), &[], 24, fixed_now());
        assert_eq!(only_level.kind(), "carousel");
        assert_eq!(only_level.cards().len(), 1);

        let only_reports =
            composer().render_combined_at(&[], &[report("A", 1, None)], 24, fixed_now());
        assert_eq!(only_reports.cards().len(), 1);
        assert_eq!(only_reports.cards()[0].title, "A");
    }

    #[test]
    fn test_combined_respects_carousel_cap() {
        let reports = areas(20);
        let message = composer().render_combined_at(&readings(2), &reports, 24, fixed_now());
        assert_eq!(message.cards().len(), 12);
        assert_eq!(message.cards()[0].title, "Current water level");
        assert_eq!(message.cards()[11].title, "Area 10");
    }
}
