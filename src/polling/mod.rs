//! Poll ingestion.
//!
//! Raw records from the loading layer are normalized into typed [`Poll`]s.
//! Records from sources outside the recognized pollster set are treated as
//! absent, not as errors, but every drop is counted in an [`IngestReport`].

pub mod poll;
pub mod pollster;
pub mod quality;

pub use poll::{
    normalize_polls, parse_poll_date, parse_raw_polls, DropReason, IngestReport, Poll, PollResult,
    RawPoll, TargetRace,
};
pub use pollster::{Pollster, PollsterName, UnknownPollster};
pub use quality::{polling_quality, quality_for_count, PollingQualityConfig};
