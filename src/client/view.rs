//! Calendar view model: the visible range, what was last fetched for it,
//! and the editor opened from it.

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};

use super::api::EventsApi;
use super::editor::{EditorOutcome, EventEditor};
use super::timezone::DisplayZone;
use crate::api::public::events::CalendarEvent;

/// Identifies one fetch so a late result for an old range can be told
/// apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// An event as drawn in the display zone.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug)]
pub struct CalendarView {
    zone: DisplayZone,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    events: Vec<CalendarEvent>,
    generation: u64,
    pub editor: EventEditor,
}

impl CalendarView {
    pub fn new(zone: DisplayZone, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            zone,
            start,
            end,
            events: Vec::new(),
            generation: 0,
            editor: EventEditor::new(),
        }
    }

    pub fn zone(&self) -> DisplayZone {
        self.zone
    }

    pub fn range(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.start, self.end)
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Switch the display zone. Callers refetch afterwards.
    pub fn set_zone(&mut self, zone: DisplayZone) {
        self.zone = zone;
    }

    /// Move the visible window. Any fetch still in flight for the old
    /// window is now stale.
    pub fn set_range(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.start = start;
        self.end = end;
        self.generation += 1;
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        FetchTicket {
            generation: self.generation,
            start: self.start,
            end: self.end,
        }
    }

    /// Apply a fetch result. Returns false when the result was dropped
    /// because a newer fetch or range change superseded it. Errors leave
    /// the last good events in place.
    pub fn finish_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<CalendarEvent>>,
    ) -> Result<bool> {
        if ticket.generation != self.generation {
            tracing::debug!("Dropping stale fetch for {} - {}", ticket.start, ticket.end);
            return Ok(false);
        }
        self.events = result?;
        Ok(true)
    }

    pub async fn refresh(&mut self, api: &dyn EventsApi) -> Result<bool> {
        let ticket = self.begin_fetch();
        let result = api.list_events(ticket.start, ticket.end).await;
        self.finish_fetch(ticket, result)
    }

    pub fn rendered_events(&self) -> Vec<RenderedEvent> {
        let tz = self.zone.tz();
        self.events
            .iter()
            .map(|event| RenderedEvent {
                id: event.id.clone(),
                title: event.title.clone(),
                start: event.start_utc.with_timezone(&tz).naive_local(),
                end: event.end_utc.with_timezone(&tz).naive_local(),
            })
            .collect()
    }

    /// A time range was selected on the grid.
    pub fn select(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        self.editor.open_create(start, end, self.zone);
    }

    /// A loaded event was clicked.
    pub fn click(&mut self, id: &str) -> Result<()> {
        let event = self
            .events
            .iter()
            .find(|event| event.id == id)
            .cloned()
            .ok_or_else(|| anyhow!("No loaded event with id {}", id))?;
        self.editor.open_edit(event, self.zone);
        Ok(())
    }

    /// Save the open draft and, if the server changed, refetch the range.
    /// An error means the save itself failed and the editor is still open.
    pub async fn save(&mut self, api: &dyn EventsApi) -> Result<EditorOutcome> {
        let outcome = self.editor.save(api).await?;
        self.refetch_after(&outcome, api).await;
        Ok(outcome)
    }

    pub async fn delete(&mut self, api: &dyn EventsApi) -> Result<EditorOutcome> {
        let outcome = self.editor.delete(api).await?;
        self.refetch_after(&outcome, api).await;
        Ok(outcome)
    }

    /// The write already went through, so a failed refetch only leaves
    /// the previous events on screen.
    async fn refetch_after(&mut self, outcome: &EditorOutcome, api: &dyn EventsApi) {
        if !outcome.changed_server() {
            return;
        }
        if let Err(err) = self.refresh(api).await {
            tracing::warn!("Refetch after change failed: {}", err);
        }
    }
}
