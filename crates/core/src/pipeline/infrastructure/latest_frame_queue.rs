use crossbeam_channel::{Receiver, SendError, Sender, TrySendError};

/// Sending half of a single-slot queue where a newer item replaces a
/// waiting one instead of blocking the producer.
///
/// The replaced item is dropped, which for a [`FrameLease`] releases the
/// frame back to its source.
///
/// [`FrameLease`]: crate::shared::frame_lease::FrameLease
pub struct LatestSender<T> {
    tx: Sender<T>,
    evict: Receiver<T>,
}

/// Creates a keep-newest-only queue of capacity one.
///
/// The queue disconnects when the [`LatestSender`] is dropped. Dropping the
/// receiver alone does not disconnect it, since the sender keeps a handle to
/// evict with.
pub fn latest_only<T>() -> (LatestSender<T>, Receiver<T>) {
    let (tx, rx) = crossbeam_channel::bounded(1);
    (
        LatestSender {
            tx,
            evict: rx.clone(),
        },
        rx,
    )
}

impl<T> LatestSender<T> {
    /// Queues `value`, dropping whatever was still waiting. Returns how many
    /// items were evicted. Never blocks.
    pub fn send(&self, mut value: T) -> Result<usize, SendError<T>> {
        let mut evicted = 0;
        loop {
            match self.tx.try_send(value) {
                Ok(()) => return Ok(evicted),
                Err(TrySendError::Full(v)) => {
                    // The consumer may win the race for the stale item.
                    if self.evict.try_recv().is_ok() {
                        evicted += 1;
                    }
                    value = v;
                }
                Err(TrySendError::Disconnected(v)) => return Err(SendError(v)),
            }
        }
    }
}
