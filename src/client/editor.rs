//! The create/edit event dialog as a state machine.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::api::EventsApi;
use super::timezone::{DisplayZone, duration_preview, from_input_value, to_input_value, utc_preview};
use crate::api::public::events::{CalendarEvent, EventPayload};

/// In-progress, zone-local form of an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventDraft {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    /// Comma separated, split on save
    pub attendees: String,
    pub start_local: String,
    pub end_local: String,
}

impl EventDraft {
    pub fn from_selection(start: DateTime<Utc>, end: DateTime<Utc>, zone: DisplayZone) -> Self {
        Self {
            start_local: to_input_value(start, zone),
            end_local: to_input_value(end, zone),
            ..Default::default()
        }
    }

    pub fn from_event(event: &CalendarEvent, zone: DisplayZone) -> Self {
        Self {
            id: Some(event.id.clone()),
            title: event.title.clone(),
            description: event.description.clone(),
            attendees: event.attendees.join(", "),
            start_local: to_input_value(event.start_utc, zone),
            end_local: to_input_value(event.end_utc, zone),
        }
    }

    /// Build the request body, or `None` if either time doesn't parse.
    pub fn to_payload(&self, zone: DisplayZone) -> Option<EventPayload> {
        let start_utc = from_input_value(&self.start_local, zone)?;
        let end_utc = from_input_value(&self.end_local, zone)?;
        Some(EventPayload {
            title: self.title.trim().to_string(),
            description: Some(self.description.trim().to_string()),
            attendees: Some(split_attendees(&self.attendees)),
            start_utc,
            end_utc,
        })
    }
}

pub fn split_attendees(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum EditorState {
    #[default]
    Closed,
    Creating {
        draft: EventDraft,
        zone: DisplayZone,
    },
    Editing {
        event: CalendarEvent,
        draft: EventDraft,
        zone: DisplayZone,
    },
}

/// What a terminal action ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorOutcome {
    Saved(CalendarEvent),
    Deleted,
    /// A time field didn't parse, nothing was sent
    Refused,
    /// The action doesn't apply in the current state
    Ignored,
}

impl EditorOutcome {
    /// Whether the server was changed, and the view should refetch.
    pub fn changed_server(&self) -> bool {
        matches!(self, EditorOutcome::Saved(_) | EditorOutcome::Deleted)
    }
}

#[derive(Debug, Default)]
pub struct EventEditor {
    state: EditorState,
}

impl EventEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, EditorState::Closed)
    }

    pub fn open_create(&mut self, start: DateTime<Utc>, end: DateTime<Utc>, zone: DisplayZone) {
        self.state = EditorState::Creating {
            draft: EventDraft::from_selection(start, end, zone),
            zone,
        };
    }

    pub fn open_edit(&mut self, event: CalendarEvent, zone: DisplayZone) {
        let draft = EventDraft::from_event(&event, zone);
        self.state = EditorState::Editing { event, draft, zone };
    }

    pub fn close(&mut self) {
        self.state = EditorState::Closed;
    }

    pub fn draft(&self) -> Option<&EventDraft> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Creating { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
        }
    }

    pub fn draft_mut(&mut self) -> Option<&mut EventDraft> {
        match &mut self.state {
            EditorState::Closed => None,
            EditorState::Creating { draft, .. } | EditorState::Editing { draft, .. } => Some(draft),
        }
    }

    /// The zone the open draft's times are written in.
    pub fn zone(&self) -> Option<DisplayZone> {
        match &self.state {
            EditorState::Closed => None,
            EditorState::Creating { zone, .. } | EditorState::Editing { zone, .. } => Some(*zone),
        }
    }

    pub fn duration_preview(&self) -> Option<String> {
        let (draft, zone) = (self.draft()?, self.zone()?);
        Some(duration_preview(&draft.start_local, &draft.end_local, zone))
    }

    pub fn utc_preview(&self) -> Option<String> {
        let (draft, zone) = (self.draft()?, self.zone()?);
        Some(utc_preview(&draft.start_local, zone))
    }

    /// Create or update depending on the mode. The editor only closes when
    /// the call succeeds, a failed call leaves the draft as it was.
    pub async fn save(&mut self, api: &dyn EventsApi) -> Result<EditorOutcome> {
        let saved = match &self.state {
            EditorState::Closed => return Ok(EditorOutcome::Ignored),
            EditorState::Creating { draft, zone } => {
                let Some(payload) = draft.to_payload(*zone) else {
                    tracing::debug!("Refusing to save, unparseable time");
                    return Ok(EditorOutcome::Refused);
                };
                api.create_event(&payload).await?
            }
            EditorState::Editing { event, draft, zone } => {
                let Some(payload) = draft.to_payload(*zone) else {
                    tracing::debug!("Refusing to save, unparseable time");
                    return Ok(EditorOutcome::Refused);
                };
                let id = draft.id.as_deref().unwrap_or(&event.id);
                api.update_event(id, &payload).await?
            }
        };
        self.close();
        Ok(EditorOutcome::Saved(saved))
    }

    pub async fn delete(&mut self, api: &dyn EventsApi) -> Result<EditorOutcome> {
        let EditorState::Editing { event, .. } = &self.state else {
            return Ok(EditorOutcome::Ignored);
        };
        api.delete_event(&event.id).await?;
        self.close();
        Ok(EditorOutcome::Deleted)
    }
}
