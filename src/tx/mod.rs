pub mod submitter;
pub mod watcher;

pub use submitter::{Route, SubmitOutcome, TransactionSubmitter};
pub use watcher::{ReceiptWatcher, WatchOutcome};
