use std::fmt;
use std::time::Duration;

use log::warn;

pub use crate::error::{Error, Result};
pub use crate::message::{Reading, Status};
pub use crate::meter::{Meter, MeterHandle, Output};

mod error;
mod estimator;
mod message;
mod meter;
mod meter_node;
mod window;

/// The time unit reported rates are expressed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Sec,
    Min,
    Hour,
}

impl Frequency {
    /// Parses "sec", "min" or "hour". Anything else falls back to `Sec`.
    pub fn parse(s: &str) -> Frequency {
        match s.trim().to_ascii_lowercase().as_str() {
            "sec" => Frequency::Sec,
            "min" => Frequency::Min,
            "hour" => Frequency::Hour,
            other => {
                warn!("unknown frequency {:?}, falling back to \"sec\"", other);
                Frequency::Sec
            }
        }
    }

    #[inline]
    pub(crate) fn seconds_per_unit(&self) -> usize {
        match self {
            Frequency::Sec => 1,
            Frequency::Min => 60,
            Frequency::Hour => 3600,
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::Sec => write!(f, "sec"),
            Frequency::Min => write!(f, "min"),
            Frequency::Hour => write!(f, "hour"),
        }
    }
}

#[derive(Clone)]
pub struct Config {
    //Unit of the reported rate
    pub frequency: Frequency,
    //Window length in frequency units, 0 falls back to 1
    pub interval: usize,
    //Start paused, wait for an explicit resume
    pub pause_at_startup: bool,
    //Project a partially filled window up to a full one
    pub estimation_startup: bool,
    //Suppress readings (not status changes) while the window fills
    pub ignore_startup: bool,
    pub reply_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency: Frequency::Sec,
            interval: 1,
            pause_at_startup: false,
            estimation_startup: false,
            ignore_startup: false,
            reply_timeout: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Human form of the window, e.g. "30 sec".
    pub fn describe(&self) -> String {
        format!("{} {}", self.interval.max(1), self.frequency)
    }
}
