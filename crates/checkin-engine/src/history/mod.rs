pub mod entry;
pub mod ledger;

pub use entry::{HISTORY_HEADERS, HistoryEntry};
pub use ledger::{HistoryLedger, LedgerError};
