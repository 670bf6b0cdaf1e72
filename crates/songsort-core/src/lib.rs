pub mod error;
pub mod events;
pub mod library;
pub mod organizer;
pub mod playback;
pub mod query;
pub mod selection;
pub mod session;
pub mod settings;
pub mod traits;

#[cfg(test)]
mod testing;

pub use error::{LibraryError, Result, SessionError, SettingsError, SortError};
pub use events::SortEvent;
pub use organizer::Organizer;
pub use playback::{JUMP_INTERVAL, PlaybackCoordinator, PlaybackState};
pub use query::LibraryQueries;
pub use selection::{DateRange, DateRangeMode, PlaylistSelections, SelectionMode, SelectionSet};
pub use session::{Commit, SessionState, SortSession};
pub use settings::{MemorySettings, Settings, SettingsData};
pub use traits::{AuthorizationStatus, MediaLibrary, PlayerBackend, PlaylistWriter, SettingsBackend};
