use std::time::{Duration, Instant};

/// Ticket for a scheduled frame; cancelling a stale ticket is a no-op.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct FrameHandle(u64);

/// Animation-frame scheduler. At most one frame is pending; the frame
/// callback re-requests the next one when it finishes, so the loop stops as
/// soon as nobody re-requests or the pending frame is cancelled.
pub(crate) struct FrameLoop {
    interval: Duration,
    next_id: u64,
    pending: Option<(FrameHandle, Instant)>,
}

impl FrameLoop {
    pub(crate) fn new(fps: u32) -> Self {
        let fps = fps.clamp(1, 240);
        Self {
            interval: Duration::from_nanos(1_000_000_000u64 / fps as u64),
            next_id: 0,
            pending: None,
        }
    }

    fn schedule(&mut self, at: Instant) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending = Some((handle, at));
        handle
    }

    /// First frame: due immediately.
    pub(crate) fn start(&mut self, now: Instant) -> FrameHandle {
        self.schedule(now)
    }

    /// Next frame, one refresh interval after `now`.
    pub(crate) fn request(&mut self, now: Instant) -> FrameHandle {
        self.schedule(now + self.interval)
    }

    pub(crate) fn cancel(&mut self, handle: FrameHandle) {
        if matches!(self.pending, Some((h, _)) if h == handle) {
            self.pending = None;
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// How long until the pending frame is due; `None` when nothing is pending.
    pub(crate) fn wait_time(&self, now: Instant) -> Option<Duration> {
        self.pending
            .map(|(_, at)| at.saturating_duration_since(now))
    }

    /// Hand out the pending frame if it is due. The caller runs it to
    /// completion and decides whether to request another.
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<FrameHandle> {
        match self.pending {
            Some((h, at)) if at <= now => {
                self.pending = None;
                Some(h)
            }
            _ => None,
        }
    }
}
