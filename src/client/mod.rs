//! Client side of the proxy: display zone conversion, the event editor,
//! the calendar view model, and the HTTP client they talk through.

pub mod api;
pub mod editor;
pub mod timezone;
pub mod view;

pub use api::{ApiClient, EventsApi};
pub use editor::{EditorOutcome, EditorState, EventDraft, EventEditor};
pub use timezone::DisplayZone;
pub use view::CalendarView;
