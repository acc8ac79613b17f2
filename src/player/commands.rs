//! Single-slot command mailboxes between the API and the voice worker.
//!
//! Each kind is a `flume::bounded(1)` channel: `try_send` succeeds only when
//! no command of that kind is pending. Dropping the [`Mailbox`] closes all
//! four channels at once.

use std::time::Duration;

use flume::{Receiver, Sender, TrySendError};

use crate::common::errors::PlayerError;

pub(crate) struct Mailbox {
    leave: Sender<()>,
    skip: Sender<()>,
    replay: Sender<()>,
    jump: Sender<Duration>,
}

pub(crate) struct CommandReceivers {
    pub leave: Receiver<()>,
    pub skip: Receiver<()>,
    pub replay: Receiver<()>,
    pub jump: Receiver<Duration>,
}

pub(crate) fn mailbox() -> (Mailbox, CommandReceivers) {
    let (leave_tx, leave_rx) = flume::bounded(1);
    let (skip_tx, skip_rx) = flume::bounded(1);
    let (replay_tx, replay_rx) = flume::bounded(1);
    let (jump_tx, jump_rx) = flume::bounded(1);

    (
        Mailbox {
            leave: leave_tx,
            skip: skip_tx,
            replay: replay_tx,
            jump: jump_tx,
        },
        CommandReceivers {
            leave: leave_rx,
            skip: skip_rx,
            replay: replay_rx,
            jump: jump_rx,
        },
    )
}

impl Mailbox {
    pub fn leave(&self) -> Result<(), PlayerError> {
        post(&self.leave, ())
    }

    pub fn skip(&self) -> Result<(), PlayerError> {
        post(&self.skip, ())
    }

    pub fn replay(&self) -> Result<(), PlayerError> {
        post(&self.replay, ())
    }

    pub fn jump(&self, to: Duration) -> Result<(), PlayerError> {
        post(&self.jump, to)
    }
}

fn post<T>(tx: &Sender<T>, command: T) -> Result<(), PlayerError> {
    tx.try_send(command).map_err(|e| match e {
        TrySendError::Full(_) => PlayerError::CommandAlreadySent,
        TrySendError::Disconnected(_) => PlayerError::WorkerNotActive,
    })
}
