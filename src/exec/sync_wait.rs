use super::{OperationState, Receiver, Sender};
use crossbeam_channel::{bounded, Sender as ChannelSender};

#[derive(Debug)]
struct SyncWaitReceiver {
    tx: ChannelSender<bool>,
}

impl Receiver for SyncWaitReceiver {
    fn set_value(self) {
        let _ = self.tx.send(true);
    }

    fn set_stopped(self) {
        let _ = self.tx.send(false);
    }
}

/// Connects and starts `sender`, then blocks until it completes.
///
/// A receiver that is dropped without ever being signalled (for example,
/// because the resource discarded the work) reads as stopped.
pub fn sync_wait<S: Sender>(sender: S) -> Option<()> {
    let (tx, rx) = bounded(1);
    let mut op = sender.connect(SyncWaitReceiver { tx });
    op.start();

    match rx.recv() {
        Ok(true) => Some(()),
        Ok(false) | Err(_) => None,
    }
}
