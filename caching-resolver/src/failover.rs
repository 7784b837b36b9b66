use std::net::{IpAddr, Ipv4Addr};

pub const FALLBACK_FORWARDER: IpAddr = IpAddr::V4(Ipv4Addr::new(8, 8, 4, 4));

// The sixth consecutive failure switches forwarders, the seventh gives up.
const FAILOVER_THRESHOLD: u32 = 5;
const DROP_THRESHOLD: u32 = 6;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FailureAction {
    /// Try the same query again.
    Retry,
    /// The forwarder was switched to the fallback; try again there.
    FailOver,
    /// Give up on the query; nothing is sent back.
    Drop,
}

/// The forwarder in use and the count of upstream errors seen in a row.
///
/// Successes leave the counter alone, so errors separated by successful
/// exchanges still add up. Only the failover and drop branches ever reset
/// anything.
#[derive(Debug)]
pub struct Failover {
    forwarder: IpAddr,
    consecutive_errors: u32,
}

impl Failover {
    pub fn new(forwarder: IpAddr) -> Self {
        Self {
            forwarder,
            consecutive_errors: 0,
        }
    }

    pub fn forwarder(&self) -> IpAddr {
        self.forwarder
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    pub fn record_failure(&mut self) -> FailureAction {
        self.consecutive_errors += 1;

        if self.consecutive_errors > DROP_THRESHOLD {
            self.consecutive_errors = 0;
            FailureAction::Drop
        } else if self.consecutive_errors > FAILOVER_THRESHOLD {
            self.forwarder = FALLBACK_FORWARDER;
            FailureAction::FailOver
        } else {
            FailureAction::Retry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primary() -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(192, 0, 2, 53))
    }

    #[test]
    fn test_sixth_failure_fails_over() {
        let mut f = Failover::new(primary());

        for i in 1..=5 {
            assert_eq!(f.record_failure(), FailureAction::Retry);
            assert_eq!(f.consecutive_errors(), i);
            assert_eq!(f.forwarder(), primary());
        }

        assert_eq!(f.record_failure(), FailureAction::FailOver);
        assert_eq!(f.forwarder(), FALLBACK_FORWARDER);
        assert_eq!(f.consecutive_errors(), 6);
    }

    #[test]
    fn test_seventh_failure_drops_and_resets() {
        let mut f = Failover::new(primary());
        for _ in 0..6 {
            f.record_failure();
        }

        assert_eq!(f.record_failure(), FailureAction::Drop);
        assert_eq!(f.consecutive_errors(), 0);
        assert_eq!(f.forwarder(), FALLBACK_FORWARDER);

        // counting starts over: the next six do not drop
        for _ in 0..5 {
            assert_eq!(f.record_failure(), FailureAction::Retry);
        }
        assert_eq!(f.record_failure(), FailureAction::FailOver);
        assert_eq!(f.record_failure(), FailureAction::Drop);
    }
}
