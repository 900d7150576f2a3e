use crossbeam_channel::{Receiver, Sender};

use crate::status::domain::status_sink::{Status, StatusSink};

/// Forwards status updates over an unbounded channel to whichever thread
/// owns the UI.
///
/// Sending never blocks; once the UI side hangs up, updates are dropped.
pub struct ChannelStatusSink {
    tx: Sender<Status>,
}

impl ChannelStatusSink {
    pub fn new() -> (Self, Receiver<Status>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl StatusSink for ChannelStatusSink {
    fn publish(&self, status: Status) {
        if self.tx.send(status).is_err() {
            log::debug!("Status receiver gone, dropping \"{status}\"");
        }
    }
}
