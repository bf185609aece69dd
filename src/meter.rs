use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::channel::{mpsc, oneshot};
use log::{info, warn};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::message::{Message, MeterResponse, Reading, Status};
use crate::meter_node::MeterNode;
use crate::Config;

/// Receives the meter's emissions. Implemented by the host.
#[async_trait]
pub trait Output {
    /// One call per closed second, in flush order.
    async fn send(&mut self, reading: Reading) -> Result<()>;
    /// Called only when the reported values change.
    async fn status_changed(&mut self, status: Status) -> Result<()>;
}

/// A mailbox to send events and control requests to a running meter.
pub struct MeterHandle<M> {
    sender: mpsc::Sender<Message<M>>,
    reply_timeout: Duration,
}

impl<M> Clone for MeterHandle<M> {
    fn clone(&self) -> Self {
        MeterHandle {
            sender: self.sender.clone(),
            reply_timeout: self.reply_timeout,
        }
    }
}

impl<M> MeterHandle<M> {
    /// Records one event. Non-blocking; fails when the mailbox is full or
    /// the meter task is gone.
    #[inline]
    pub fn record(&self, msg: M) -> Result<()> {
        let mut sender = self.sender.clone();
        sender
            .try_send(Message::Record(msg))
            .map_err(|e| Error::SendError(e.to_string()))
    }

    #[inline]
    pub async fn pause(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.confirm(Message::Pause { chan: tx }, rx).await
    }

    #[inline]
    pub async fn resume(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.confirm(Message::Resume { chan: tx }, rx).await
    }

    #[inline]
    pub async fn reset(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.confirm(Message::Reset { chan: tx }, rx).await
    }

    /// Stops the meter task, resetting its state first.
    #[inline]
    pub async fn stop(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.confirm(Message::Stop { chan: tx }, rx).await
    }

    #[inline]
    pub async fn status(&self) -> Result<Status> {
        let (tx, rx) = oneshot::channel();
        let mut sender = self.sender.clone();
        sender
            .try_send(Message::Status { chan: tx })
            .map_err(|e| Error::SendError(e.to_string()))?;
        let reply = timeout(self.reply_timeout, rx)
            .await?
            .map_err(|e| Error::RecvError(e.to_string()))?;
        match reply {
            MeterResponse::Status(status) => Ok(status),
            reply => {
                warn!("Message::Status, unexpected meter response: {:?}", reply);
                Err(Error::RecvError("unexpected response".into()))
            }
        }
    }

    async fn confirm(
        &self,
        message: Message<M>,
        rx: oneshot::Receiver<MeterResponse>,
    ) -> Result<()> {
        let mut sender = self.sender.clone();
        sender
            .try_send(message)
            .map_err(|e| Error::SendError(e.to_string()))?;
        let reply = timeout(self.reply_timeout, rx)
            .await?
            .map_err(|e| Error::RecvError(e.to_string()))?;
        match reply {
            MeterResponse::Ok => Ok(()),
            reply => {
                warn!("unexpected meter response: {:?}", reply);
                Err(Error::RecvError("unexpected response".into()))
            }
        }
    }
}

pub struct Meter<M, F, O> {
    statistic: F,
    output: O,
    tx: mpsc::Sender<Message<M>>,
    rx: mpsc::Receiver<Message<M>>,
    cfg: Arc<Config>,
}

impl<M, F, O> Meter<M, F, O>
where
    M: Send + 'static,
    F: Fn(&M) -> f64 + Send + 'static,
    O: Output + Send + 'static,
{
    /// creates a new meter with the given statistic function and output.
    pub fn new(cfg: Config, statistic: F, output: O) -> Self {
        let (tx, rx) = mpsc::channel(100_000);
        let cfg = Arc::new(cfg);
        Self {
            statistic,
            output,
            tx,
            rx,
            cfg,
        }
    }

    /// gets a `MeterHandle` for this meter. Take handles before `run()`.
    pub fn handle(&self) -> MeterHandle<M> {
        MeterHandle {
            sender: self.tx.clone(),
            reply_timeout: self.cfg.reply_timeout,
        }
    }

    /// Drives the meter until it is stopped or every handle is dropped.
    pub async fn run(self) -> Result<()> {
        info!("meter started, window: {}", self.cfg.describe());
        let Meter {
            statistic,
            output,
            tx,
            rx,
            cfg,
        } = self;
        // The node must see the channel close once the last handle is gone.
        drop(tx);
        MeterNode::new(rx, statistic, output, &cfg).run().await
    }
}
