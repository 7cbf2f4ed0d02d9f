//! Link supervision
//!
//! Tracks the time since the last accepted frame and reports the moment
//! the link goes quiet for longer than the configured timeout.

/// Default silence before the link is considered lost
pub const LINK_TIMEOUT_MS: u32 = 1000;

/// Link state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// No frame accepted yet
    Waiting,
    /// Frames arriving within the timeout
    Up,
    /// Silent for at least the timeout
    Lost,
}

/// Silence timer for one transport
#[derive(Debug, Clone)]
pub struct LinkMonitor {
    timeout_ms: u32,
    /// Time since last accepted frame (ms)
    silent_ms: u32,
    status: LinkStatus,
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new(LINK_TIMEOUT_MS)
    }
}

impl LinkMonitor {
    pub fn new(timeout_ms: u32) -> Self {
        Self {
            timeout_ms,
            silent_ms: 0,
            status: LinkStatus::Waiting,
        }
    }

    /// Record an accepted frame
    pub fn frame_received(&mut self) {
        self.silent_ms = 0;
        self.status = LinkStatus::Up;
    }

    /// Advance the silence timer
    ///
    /// Returns `true` exactly once per outage, on the update that crosses
    /// the timeout.
    pub fn update_time(&mut self, delta_ms: u32) -> bool {
        self.silent_ms = self.silent_ms.saturating_add(delta_ms);

        if self.status == LinkStatus::Up && self.silent_ms >= self.timeout_ms {
            self.status = LinkStatus::Lost;
            return true;
        }
        false
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn is_up(&self) -> bool {
        self.status == LinkStatus::Up
    }

    pub fn silent_ms(&self) -> u32 {
        self.silent_ms
    }
}

/// Frames per second from a count taken over `period_ms`
///
/// Widened to `u64`, saturating at `u32::MAX`. A zero period is treated as 1 ms.
pub fn frame_rate(frames: u32, period_ms: u32) -> u32 {
    let rate = frames as u64 * 1000 / period_ms.max(1) as u64;
    u32::try_from(rate).unwrap_or(u32::MAX)
}
