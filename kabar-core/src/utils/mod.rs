pub mod time;

pub use self::time::{canonical_timestamp, display_offset, TimestampError, DEFAULT_OFFSET_HOURS};
