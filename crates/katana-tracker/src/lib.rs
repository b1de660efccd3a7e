//! Background work for Katana: automatic usage tracking and status polling

pub mod tracker;
pub mod poller;

pub use tracker::{AutoTracker, EditorEvent, Fingerprint, TextInsertion, TrackDecision, TrackerSettings};
pub use poller::{StatusPoller, StatusSummary, TickOutcome, DEFAULT_POLL_INTERVAL};
