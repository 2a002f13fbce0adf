use thiserror::Error;
use time::Duration;

#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Debug, Hash)]
pub struct PositiveDuration(Duration);

impl PositiveDuration {
    #[must_use]
    pub fn new(duration: Duration) -> Option<Self> {
        duration.is_positive().then_some(Self(duration))
    }

    #[must_use]
    pub fn get(&self) -> Duration {
        self.0
    }

    /// Whole milliseconds, never zero.
    #[must_use]
    pub fn whole_milliseconds(&self) -> u64 {
        u64::try_from(self.0.whole_milliseconds())
            .unwrap_or(u64::MAX)
            .max(1)
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The duration is not positive: {0}")]
pub struct NonPositiveDurationError(Duration);

impl TryFrom<Duration> for PositiveDuration {
    type Error = NonPositiveDurationError;

    fn try_from(value: Duration) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(NonPositiveDurationError(value))
    }
}

#[cfg(test)]
mod tests {
    use crate::util::PositiveDuration;
    use time::Duration;

    #[test]
    fn only_positive_durations() {
        assert!(PositiveDuration::try_from(Duration::seconds(5)).is_ok());
        assert!(PositiveDuration::try_from(Duration::ZERO).is_err());
        assert!(PositiveDuration::try_from(Duration::seconds(-1)).is_err());
    }

    #[test]
    fn milliseconds() {
        let five_seconds = PositiveDuration::try_from(Duration::seconds(5)).unwrap();
        assert_eq!(five_seconds.whole_milliseconds(), 5000);

        let tiny = PositiveDuration::try_from(Duration::microseconds(10)).unwrap();
        assert_eq!(tiny.whole_milliseconds(), 1);
    }
}
