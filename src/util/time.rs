// Time utilities
// (c) 2024 Ross Younger

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::time::{sleep_until, Instant, Sleep};

/// A re-armable absolute timer with socket-deadline semantics.
///
/// While armed, [`poll_elapsed`](Deadline::poll_elapsed) reports Ready from the
/// armed instant onwards (an instant in the past fires on the first poll), and
/// keeps reporting Ready until the deadline is re-armed or cleared. A cleared
/// deadline never fires.
#[derive(Debug, Default)]
pub(crate) struct Deadline {
    timer: Option<Pin<Box<Sleep>>>,
}

impl Deadline {
    /// Arms or re-arms the deadline; `None` clears it.
    pub(crate) fn set(&mut self, at: Option<Instant>) {
        self.timer = at.map(|at| Box::pin(sleep_until(at)));
    }

    /// Ready once the armed instant has passed.
    pub(crate) fn poll_elapsed(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        match self.timer.as_mut() {
            None => Poll::Pending,
            // An elapsed Sleep must not be polled again
            Some(timer) if timer.is_elapsed() => Poll::Ready(()),
            Some(timer) => timer.as_mut().poll(cx),
        }
    }
}
