use crate::model::Min;

pub const MINUTES_PER_DAY: Min = 24 * 60;

pub const MIN_SLOT_DURATION: Min = 5;
pub const MAX_SLOT_DURATION: Min = 240;

/// A month view is the widest range a loader fetches.
pub const MAX_RANGE_DAYS: i64 = 31;

pub const MAX_COURTS_PER_FACILITY: usize = 64;
pub const MAX_LOADERS: usize = 1024;
pub const MAX_PENDING_MUTATIONS: usize = 256;
pub const MAX_NOTE_LEN: usize = 1024;
