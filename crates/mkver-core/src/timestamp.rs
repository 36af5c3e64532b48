use chrono::{DateTime, SubsecRound, Utc};

/// Formats an instant as `YYYYMMDDhhmmss` in UTC.
///
/// Fixed width (14 digits for years 0..=9999), so sorting the strings sorts
/// the instants.
pub fn ymdhms(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M%S").to_string()
}

/// Source of the generation instant.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now().trunc_subsecs(3)
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.trunc_subsecs(3)
    }
}
