//! Session lifecycle and time-windowed access control for scheduled virtual
//! classes, plus the guarded mutations and debounced query state that sit
//! around it.

pub mod clock;
pub mod driver;
pub mod error;
pub mod guard;
pub mod labels;
pub mod listing;
pub mod ports;
pub mod query;
pub mod status;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::QueryDriver;
pub use error::{ListingError, StaleResponse};
pub use guard::{ActionClass, InFlightTicket, MutationGuard};
pub use labels::label;
pub use listing::{
    build_view, AccountRoster, BoardView, ListingEvent, ListingSettings, MutationOutcome,
    SessionBoard, SessionCounts, SessionRow,
};
pub use ports::{AccountDirectory, AccountService, RegistrationService, SessionCatalog};
pub use query::{DebounceTimer, LoadRequest, PageInfo, QueryOrchestrator, QueryState, Tab};
pub use status::{evaluate, ColorTag, DisplayState, Phase, PhaseGroup};
