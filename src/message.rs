use futures::channel::oneshot::Sender;
use serde::{Deserialize, Serialize};

#[derive(Debug)]
pub enum MeterResponse {
    Status(Status),
    Ok,
}

pub enum Message<M> {
    Record(M),
    Pause { chan: Sender<MeterResponse> },
    Resume { chan: Sender<MeterResponse> },
    Reset { chan: Sender<MeterResponse> },
    Stop { chan: Sender<MeterResponse> },
    Status { chan: Sender<MeterResponse> },
}

/// One reported value per elapsed second: the windowed totals at the moment
/// the second closed.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Reading {
    pub count: u64,
    pub statistic: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Status {
    pub count: u64,
    pub statistic: f64,
    pub startup: bool,
    pub paused: bool,
}

impl Status {
    #[inline]
    pub fn is_startup(&self) -> bool {
        self.startup
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

pub(crate) enum Emit {
    Status(Status),
    Reading(Reading),
}
