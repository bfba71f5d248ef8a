mod aggregate;
mod archive;
mod error;
mod export;
mod session;
mod store;
mod types;

pub use aggregate::aggregate_schedule;
pub use archive::SimulationArchive;
pub use error::{ArchiveError, Result};
pub use export::{EXPORT_FILE_NAME, schedule_csv_string, write_schedule_csv};
pub use session::SimulationSession;
pub use store::{
    DEFAULT_DATA_DIR, FileStore, KeyStore, LEGACY_SCHEDULE_KEY, MemoryStore, SIMULATIONS_KEY,
};
pub use types::{
    Currency, PaymentRow, ScheduleSource, ScheduleTotals, SimulationDraft, SimulationRecord,
    SimulationSummary, StoredState,
};
