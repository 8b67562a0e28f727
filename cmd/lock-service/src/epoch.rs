use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Start-time fingerprint of a lock coordinator.
///
/// Fixed when the coordinator is built and never changes afterwards. Callers
/// learn it at login and echo it on every lock request; a different value
/// means the coordinator restarted and dropped its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Epoch(u64);

impl Epoch {
    pub fn now() -> Self {
        Self::from_system_time(SystemTime::now())
    }

    pub fn from_system_time(at: SystemTime) -> Self {
        let nanos = at
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_nanos();
        Self(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn as_nanos(self) -> u64 {
        self.0
    }
}

impl From<u64> for Epoch {
    fn from(nanos: u64) -> Self {
        Self(nanos)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_system_time_counts_nanos_since_unix_epoch() {
        let at = UNIX_EPOCH + Duration::from_millis(1_500);
        assert_eq!(Epoch::from_system_time(at).as_nanos(), 1_500_000_000);
    }

    #[test]
    fn times_before_unix_epoch_clamp_to_zero() {
        let at = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(Epoch::from_system_time(at), Epoch::from_nanos(0));
    }
}
