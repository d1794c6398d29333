//! Command dispatch.
//!
//! Maps an inbound chat text to one composer operation through a closed,
//! exact-match table, fetches fresh data, renders, and hands the message to
//! the delivery sink. Unknown text gets no reply.
//!
//! Nothing escapes `dispatch`: repository failures degrade to the composer's
//! fallback message and delivery failures are logged and dropped, so the
//! webhook transport can always acknowledge the request and later events in
//! a batch are still processed. The same holds one level up: a malformed
//! input line is skipped and the next one is still read.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::compose::{Composer, RenderedMessage};
use crate::config::{CommandLabels, QueryConfig, RelayConfig};
use crate::delivery::DeliverySink;
use crate::logging::{self, LogSource};
use crate::repository::{Repository, incidents_or_empty, readings_or_empty};
use crate::webhook::{self, WebhookEvent};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    CurrentLevel,
    History,
    Incidents,
    Combined,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::CurrentLevel => write!(f, "current_level"),
            Command::History => write!(f, "history"),
            Command::Incidents => write!(f, "incidents"),
            Command::Combined => write!(f, "combined"),
        }
    }
}

/// Exact-match label → command table. Adding a command is one entry here
/// plus one label in `CommandLabels`.
#[derive(Debug, Clone)]
pub struct CommandTable {
    entries: Vec<(String, Command)>,
}

impl CommandTable {
    pub fn from_labels(labels: &CommandLabels) -> Self {
        let entries = [
            (&labels.current_level, Command::CurrentLevel),
            (&labels.history, Command::History),
            (&labels.incidents, Command::Incidents),
            (&labels.combined, Command::Combined),
        ]
        .into_iter()
        .map(|(label, command)| (label.trim().to_string(), command))
        .collect();
        Self { entries }
    }

    /// Surrounding whitespace is ignored; otherwise the match is exact.
    pub fn lookup(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        self.entries
            .iter()
            .find(|(label, _)| label == text)
            .map(|(_, command)| *command)
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not a command; nothing was sent.
    Ignored,
    Delivered(Command),
    DeliveryFailed(Command),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub handled: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn absorb(&mut self, other: BatchSummary) {
        self.handled += other.handled;
        self.ignored += other.ignored;
        self.failed += other.failed;
    }
}

/// Totals over a stream of webhook bodies, one per line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    pub batches: usize,
    /// Lines that were not a webhook body (bad JSON, invalid UTF-8).
    pub skipped_lines: usize,
    pub events: BatchSummary,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Owns the collaborators for the lifetime of the process.
pub struct Dispatcher {
    repository: Arc<dyn Repository>,
    sink: Arc<dyn DeliverySink>,
    composer: Composer,
    queries: QueryConfig,
    commands: CommandTable,
    clock: Option<DateTime<Utc>>,
}

impl Dispatcher {
    pub fn new(
        repository: Arc<dyn Repository>,
        sink: Arc<dyn DeliverySink>,
        config: &RelayConfig,
    ) -> Self {
        Self {
            repository,
            sink,
            composer: Composer::new(config.thresholds, config.composer.clone()),
            queries: config.queries.clone(),
            commands: CommandTable::from_labels(&config.commands),
            clock: None,
        }
    }

    /// Pins "now" for staleness and "hours ago"; used when replaying a
    /// fixture whose repository clock is pinned to the same instant.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }

    pub async fn dispatch(&self, command_text: &str, reply_token: &str) -> DispatchOutcome {
        self.dispatch_at(command_text, reply_token, self.now()).await
    }

    /// Like [`Dispatcher::dispatch`], rendering relative times against `now`.
    pub async fn dispatch_at(
        &self,
        command_text: &str,
        reply_token: &str,
        now: DateTime<Utc>,
    ) -> DispatchOutcome {
        let Some(command) = self.commands.lookup(command_text) else {
            logging::debug(
                LogSource::Dispatch,
                Some(reply_token),
                "no command matched; not replying",
            );
            return DispatchOutcome::Ignored;
        };

        let message = self.render(command, now).await;
        logging::debug(
            LogSource::Dispatch,
            Some(reply_token),
            &format!("{command} rendered as {}", message.kind()),
        );

        match self.sink.deliver(reply_token, &message).await {
            Ok(()) => DispatchOutcome::Delivered(command),
            Err(e) => {
                logging::log_delivery_failure(reply_token, &e);
                DispatchOutcome::DeliveryFailed(command)
            }
        }
    }

    /// Fetches fresh data for `command` and renders it. Never fails.
    pub async fn render(&self, command: Command, now: DateTime<Utc>) -> RenderedMessage {
        let repository = self.repository.as_ref();
        let q = &self.queries;
        match command {
            Command::CurrentLevel => {
                let readings = readings_or_empty(repository, q.trend_window_readings).await;
                self.composer.render_current_level_at(&readings, now)
            }
            Command::History => {
                let readings = readings_or_empty(repository, q.history_limit).await;
                self.composer.render_history(&readings)
            }
            Command::Incidents => {
                let reports =
                    incidents_or_empty(repository, q.incident_window_hours, q.incident_limit).await;
                self.composer.render_incidents_at(&reports, q.incident_window_hours, now)
            }
            Command::Combined => {
                let readings = readings_or_empty(repository, q.trend_window_readings).await;
                let reports =
                    incidents_or_empty(repository, q.incident_window_hours, q.incident_limit).await;
                self.composer
                    .render_combined_at(&readings, &reports, q.incident_window_hours, now)
            }
        }
    }

    /// Processes one webhook batch in order; each event is independent.
    pub async fn handle_events(&self, events: &[WebhookEvent]) -> BatchSummary {
        self.handle_events_at(events, self.now()).await
    }

    /// Like [`Dispatcher::handle_events`], rendering every event against `now`.
    pub async fn handle_events_at(
        &self,
        events: &[WebhookEvent],
        now: DateTime<Utc>,
    ) -> BatchSummary {
        let mut summary = BatchSummary::default();
        for event in events {
            let Some(command) = event.as_text_command() else {
                summary.ignored += 1;
                continue;
            };
            match self.dispatch_at(command.text, command.reply_token, now).await {
                DispatchOutcome::Ignored => summary.ignored += 1,
                DispatchOutcome::Delivered(_) => summary.handled += 1,
                DispatchOutcome::DeliveryFailed(_) => summary.failed += 1,
            }
        }
        logging::log_batch_summary(summary.handled, summary.ignored, summary.failed);
        summary
    }

    /// Reads webhook bodies, one per line, until end of input.
    ///
    /// Lines are taken as raw bytes: a line that is not valid UTF-8 or not a
    /// webhook body is logged and skipped, and reading carries on. Only end of
    /// input or a failing reader stops the loop.
    pub async fn serve_lines<R>(&self, mut reader: R) -> StreamSummary
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = StreamSummary::default();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) => break,
                Ok(_) => {}
                Err(e) => {
                    logging::error(LogSource::System, None, &format!("input read error: {e}"));
                    break;
                }
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            match webhook::parse_body_bytes(&line) {
                Ok(body) => {
                    summary.batches += 1;
                    summary.events.absorb(self.handle_events(&body.events).await);
                }
                Err(e) => {
                    summary.skipped_lines += 1;
                    logging::warn(
                        LogSource::System,
                        None,
                        &format!("skipping malformed webhook body: {e}"),
                    );
                }
            }
        }
        summary
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
