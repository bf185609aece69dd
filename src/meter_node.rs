use std::time::Duration;

use futures::channel::{mpsc, oneshot};
use futures::StreamExt;
use log::{debug, error, info, warn};
use tokio::time::timeout;

use crate::error::{Error, Result};
use crate::estimator::Estimator;
use crate::message::{Emit, Message, MeterResponse};
use crate::meter::Output;
use crate::Config;

#[inline]
fn now_ms() -> i64 {
    chrono::Local::now().timestamp_millis()
}

pub(crate) struct MeterNode<M, F, O> {
    rcv: mpsc::Receiver<Message<M>>,
    statistic: F,
    output: O,
    estimator: Estimator,
    should_quit: bool,
}

impl<M, F, O> MeterNode<M, F, O>
where
    M: Send + 'static,
    F: Fn(&M) -> f64 + Send + 'static,
    O: Output + Send + 'static,
{
    pub fn new(rcv: mpsc::Receiver<Message<M>>, statistic: F, output: O, cfg: &Config) -> Self {
        MeterNode {
            rcv,
            statistic,
            output,
            estimator: Estimator::new(cfg),
            should_quit: false,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            if self.should_quit {
                warn!("Quitting meter");
                return Ok(());
            }

            // The wait deadline is the open second's boundary; mailbox
            // traffic never pushes it later.
            match self.estimator.due_in_ms(now_ms()) {
                Some(due) if due <= 0 => {
                    // Already past the boundary: close the overdue seconds
                    // before taking more messages.
                    let emits = self.estimator.tick_at(now_ms());
                    self.emit(emits).await?;
                }
                Some(due) => {
                    match timeout(Duration::from_millis(due as u64), self.rcv.next()).await {
                        Ok(Some(message)) => self.dispatch(message).await?,
                        Ok(None) => {
                            error!("Recv None");
                            return Err(Error::RecvError("Recv None".into()));
                        }
                        Err(_) => {
                            // The boundary passed with an empty mailbox.
                            let emits = self.estimator.tick_at(now_ms());
                            self.emit(emits).await?;
                        }
                    }
                }
                // Paused or never started; nothing to flush until a
                // message arrives.
                None => match self.rcv.next().await {
                    Some(message) => self.dispatch(message).await?,
                    None => {
                        error!("Recv None");
                        return Err(Error::RecvError("Recv None".into()));
                    }
                },
            }
        }
    }

    async fn dispatch(&mut self, message: Message<M>) -> Result<()> {
        match message {
            Message::Record(msg) => {
                let statistic = (self.statistic)(&msg);
                let emits = self.estimator.record_at(statistic, now_ms());
                self.emit(emits).await?;
            }
            Message::Pause { chan } => {
                debug!("pausing meter");
                self.estimator.pause();
                self.send_ok(chan);
            }
            Message::Resume { chan } => {
                debug!("resuming meter");
                self.estimator.resume_at(now_ms());
                self.send_ok(chan);
            }
            Message::Reset { chan } => {
                debug!("resetting meter");
                self.estimator.reset();
                self.send_ok(chan);
            }
            Message::Stop { chan } => {
                info!("stopping meter");
                self.estimator.reset();
                self.should_quit = true;
                self.send_ok(chan);
            }
            Message::Status { chan } => {
                if let Err(e) = chan.send(MeterResponse::Status(self.estimator.status())) {
                    warn!("Message::Status, MeterResponse send error: {:?}", e);
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn send_ok(&self, chan: oneshot::Sender<MeterResponse>) {
        if let Err(e) = chan.send(MeterResponse::Ok) {
            warn!("MeterResponse send error: {:?}", e);
        }
    }

    async fn emit(&mut self, emits: Vec<Emit>) -> Result<()> {
        for emit in emits {
            match emit {
                Emit::Status(status) => {
                    debug!("status changed: {:?}", status);
                    self.output.status_changed(status).await?;
                }
                Emit::Reading(reading) => self.output.send(reading).await?,
            }
        }
        Ok(())
    }
}
