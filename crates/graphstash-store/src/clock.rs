//! Time sources and timestamp presentation.
//!
//! Records and log entries carry a canonical UTC instant (`createdAt`) plus a
//! human-readable `displayTimestamp`. The instant comes from a [`Clock`] and
//! the display string from a [`TimestampFormatter`]; both are injectable so
//! eviction order and rendering can be pinned down in tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, FixedOffset, Offset, SecondsFormat, Utc};

// ── clocks ───────────────────────────────────────────────────────────

/// Injectable source of "now".
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Interior mutability lets a test keep one `Arc<MockClock>` and move time
/// while stores hold another handle to it.
#[derive(Debug)]
pub struct MockClock {
    current: Mutex<DateTime<Utc>>,
}

impl MockClock {
    pub fn new(time: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(time),
        }
    }

    /// A clock at 2026-01-15 12:00:00 UTC.
    pub fn fixed() -> Self {
        Self::new(DateTime::from_timestamp(1_768_478_400, 0).unwrap_or_default())
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut current) = self.current.lock() {
            *current += by;
        }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        if let Ok(mut current) = self.current.lock() {
            *current = time;
        }
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        match self.current.lock() {
            Ok(current) => *current,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Current time from `clock`, truncated to whole milliseconds so that the
/// numeric id and the ISO string of a record describe the same instant.
pub(crate) fn now_millis(clock: &dyn Clock) -> DateTime<Utc> {
    let now = clock.now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

// ── formatting ───────────────────────────────────────────────────────

/// Renders an instant for display next to a stored record.
pub trait TimestampFormatter: Send + Sync {
    fn format(&self, instant: DateTime<Utc>) -> String;
}

/// Default display offset, UTC+08:00.
pub const DEFAULT_DISPLAY_OFFSET_SECS: i32 = 8 * 3600;

/// Default display pattern, `2026/01/15 20:00:00`.
pub const DEFAULT_DISPLAY_PATTERN: &str = "%Y/%m/%d %H:%M:%S";

/// Formats every instant in one fixed UTC offset, regardless of the viewer.
#[derive(Debug, Clone)]
pub struct FixedOffsetFormatter {
    offset: FixedOffset,
    pattern: String,
}

impl FixedOffsetFormatter {
    /// Build a formatter for `offset_secs` east of UTC. Out-of-range offsets
    /// fall back to UTC.
    pub fn new(offset_secs: i32, pattern: impl Into<String>) -> Self {
        Self {
            offset: FixedOffset::east_opt(offset_secs).unwrap_or(Utc.fix()),
            pattern: pattern.into(),
        }
    }

    pub fn utc() -> Self {
        Self::new(0, DEFAULT_DISPLAY_PATTERN)
    }
}

impl Default for FixedOffsetFormatter {
    fn default() -> Self {
        Self::new(DEFAULT_DISPLAY_OFFSET_SECS, DEFAULT_DISPLAY_PATTERN)
    }
}

impl TimestampFormatter for FixedOffsetFormatter {
    fn format(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.offset)
            .format(&self.pattern)
            .to_string()
    }
}

// ── stamping ─────────────────────────────────────────────────────────

/// The time fields every persisted record carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Stamp {
    /// Milliseconds since the Unix epoch.
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub display: String,
}

/// A clock paired with a formatter; each dataset owns one.
#[derive(Clone)]
pub struct Timekeeper {
    clock: Arc<dyn Clock>,
    formatter: Arc<dyn TimestampFormatter>,
}

impl Timekeeper {
    pub fn new(clock: Arc<dyn Clock>, formatter: Arc<dyn TimestampFormatter>) -> Self {
        Self { clock, formatter }
    }

    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
    }

    pub fn set_formatter(&mut self, formatter: Arc<dyn TimestampFormatter>) {
        self.formatter = formatter;
    }

    pub(crate) fn stamp(&self) -> Stamp {
        let created_at = now_millis(self.clock.as_ref());
        Stamp {
            id: created_at.timestamp_millis(),
            created_at,
            display: self.formatter.format(created_at),
        }
    }
}

impl Default for Timekeeper {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(FixedOffsetFormatter::default()))
    }
}

impl std::fmt::Debug for Timekeeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timekeeper").finish_non_exhaustive()
    }
}

// ── serde ────────────────────────────────────────────────────────────

/// `serde(with)` module storing instants as `2026-01-15T12:00:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    use super::SecondsFormat;

    pub fn serialize<S: Serializer>(instant: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}

// ── tests ────────────────────────────────────────────────────────────
