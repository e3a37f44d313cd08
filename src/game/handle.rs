use super::*;
use crate::Chips;
use crate::Error;
use crate::Identity;
use std::time::Duration;
use std::time::Instant;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;

/// Cloneable front door to the coordinator task. Sends never block;
/// replies resolve once the command has been handled to completion, so
/// awaiting a bid is enough to observe its broadcast ordering.
#[derive(Clone)]
pub struct Handle {
    tx: UnboundedSender<Command>,
}

impl Handle {
    pub(super) fn new(tx: UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    pub async fn bid(&self, who: Identity, amount: Option<Chips>) -> Result<Receipt, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Bid { who, amount, reply })
            .map_err(|_| Self::gone())?;
        rx.await.map_err(|_| Self::gone())?
    }

    /// Fire-and-forget clock pulse carrying its own timestamp.
    pub fn tick(&self, now: Instant) -> Result<(), Error> {
        self.tx.send(Command::Tick(now)).map_err(|_| Self::gone())
    }

    pub async fn cancel(&self) -> Result<(), Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Cancel { reply })
            .map_err(|_| Self::gone())?;
        rx.await.map_err(|_| Self::gone())?
    }

    pub async fn snapshot(&self) -> Result<Summary, Error> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot { reply })
            .map_err(|_| Self::gone())?;
        rx.await.map_err(|_| Self::gone())
    }

    /// Spawn the wall-clock ticker that drives expiry. Stops on its own
    /// once the coordinator is gone.
    pub fn start_ticker(&self, cadence: Duration) {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cadence);
            loop {
                interval.tick().await;
                if handle.tick(Instant::now()).is_err() {
                    break;
                }
            }
        });
    }

    fn gone() -> Error {
        Error::StateConflict(String::from("round coordinator is gone"))
    }
}
