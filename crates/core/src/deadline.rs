use std::time::{Duration, Instant};

use crate::domain::IngestStage;
use crate::error::{Error, Result};

/// Optional wall-clock budget for a blocking operation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline that never expires.
    pub fn none() -> Self {
        Self { at: None }
    }

    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    pub fn from_millis(ms: Option<u64>) -> Self {
        ms.map(|ms| Self::after(Duration::from_millis(ms)))
            .unwrap_or_default()
    }

    /// The earlier of two deadlines.
    pub fn min(self, other: Deadline) -> Deadline {
        match (self.at, other.at) {
            (Some(a), Some(b)) => Deadline { at: Some(a.min(b)) },
            (Some(_), None) => self,
            _ => other,
        }
    }

    /// Time left, or `None` if unbounded. Saturates at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Fail with `DeadlineExceeded(stage)` once the budget is spent.
    pub fn check(&self, stage: IngestStage) -> Result<()> {
        if self.is_expired() {
            return Err(Error::DeadlineExceeded(stage));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_never_expires() {
        let d = Deadline::none();
        assert!(d.remaining().is_none());
        assert!(d.check(IngestStage::TxOpen).is_ok());
    }

    #[test]
    fn test_zero_budget_is_expired() {
        let d = Deadline::after(Duration::ZERO);
        assert!(d.is_expired());
        let err = d.check(IngestStage::BlobWriting).unwrap_err();
        assert!(matches!(
            err,
            Error::DeadlineExceeded(IngestStage::BlobWriting)
        ));
    }

    #[test]
    fn test_min_prefers_bounded() {
        let bounded = Deadline::after(Duration::from_secs(60));
        assert!(Deadline::none().min(bounded).remaining().is_some());
        assert!(bounded.min(Deadline::none()).remaining().is_some());
        let tighter = Deadline::after(Duration::ZERO);
        assert!(bounded.min(tighter).is_expired());
    }

    #[test]
    fn test_from_millis() {
        assert!(Deadline::from_millis(None).remaining().is_none());
        assert!(Deadline::from_millis(Some(60_000)).remaining().is_some());
    }
}
