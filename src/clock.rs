//! Monotonic clock and the periodic timer wheel that drives C8's
//! event loop.
//!
//! Each timer re-arms itself for `now + period` only after its
//! callback has run to completion, mirroring the upstream radio
//! manager's `uloop_timeout_set` calls at the end of each periodic
//! handler rather than a fixed-rate `tokio::time::interval`.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

pub use crate::types::now;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timer {
    UpdateClient,
    DeniedReqThreshold,
    RemoveClient,
    RemoveProbe,
    RemoveAp,
    UpdateHostapd,
    UpdateTcpCon,
    UpdateChanUtil,
    UpdateBeaconReports,
}

struct Entry {
    deadline: Instant,
    timer: Timer,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline
    }
}
impl Eq for Entry {}
impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

/// A min-heap of armed timers, each re-armed explicitly by the caller
/// after it fires.
pub struct TimerWheel {
    heap: BinaryHeap<Reverse<TimerEntry>>,
}

#[derive(PartialEq, Eq)]
struct TimerEntry(Entry);

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

impl TimerWheel {
    pub fn new() -> Self {
        TimerWheel { heap: BinaryHeap::new() }
    }

    /// Arm `timer` to fire `period` from now. A timer not currently
    /// armed is conditionally armed — used to turn timers like the
    /// denied-request sweep on/off based on `use_driver_recog`.
    pub fn arm(&mut self, timer: Timer, period: Duration) {
        self.heap.push(Reverse(TimerEntry(Entry {
            deadline: Instant::now() + period,
            timer,
        })));
    }

    /// Sleep until the earliest armed timer's deadline, then pop and
    /// return it. Returns `None` if no timers are armed (caller
    /// should then only wait on other event sources).
    pub async fn next(&mut self) -> Option<Timer> {
        let Reverse(TimerEntry(entry)) = self.heap.peek()?;
        let deadline = entry.deadline;
        tokio::time::sleep_until(deadline.into()).await;
        self.heap.pop().map(|Reverse(TimerEntry(e))| e.timer)
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl Default for TimerWheel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn earliest_timer_fires_first() {
        let mut wheel = TimerWheel::new();
        wheel.arm(Timer::UpdateClient, Duration::from_secs(10));
        wheel.arm(Timer::RemoveAp, Duration::from_secs(1));

        let fired = wheel.next().await;
        assert_eq!(fired, Some(Timer::RemoveAp));
    }
}
