// End-to-end tests for a running meter task: a real tokio runtime, real
// wall-clock seconds, and a collecting Output on the far side.
//
// cargo test --test meter_test

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use flowmeter::{Config, Error, Frequency, Meter, MeterHandle, Output, Reading, Result, Status};

// ============================================================
// Test fixtures
// ============================================================

#[derive(Clone, Default)]
struct Collector {
    readings: Arc<Mutex<Vec<Reading>>>,
    statuses: Arc<Mutex<Vec<Status>>>,
}

impl Collector {
    fn readings(&self) -> Vec<Reading> {
        self.readings.lock().unwrap().clone()
    }

    fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().unwrap().clone()
    }
}

#[async_trait]
impl Output for Collector {
    async fn send(&mut self, reading: Reading) -> Result<()> {
        self.readings.lock().unwrap().push(reading);
        Ok(())
    }

    async fn status_changed(&mut self, status: Status) -> Result<()> {
        self.statuses.lock().unwrap().push(status);
        Ok(())
    }
}

// The statistic is the payload size, so the meter reports both a message
// rate and a byte rate.
fn spawn_meter(
    cfg: Config,
) -> (
    MeterHandle<Vec<u8>>,
    Collector,
    tokio::task::JoinHandle<Result<()>>,
) {
    let collector = Collector::default();
    let meter = Meter::new(cfg, |msg: &Vec<u8>| msg.len() as f64, collector.clone());
    let handle = meter.handle();
    let task = tokio::spawn(meter.run());
    (handle, collector, task)
}

fn seconds_window(interval: usize) -> Config {
    Config {
        frequency: Frequency::Sec,
        interval,
        ..Default::default()
    }
}

// ============================================================
// Reading emission
// ============================================================

#[tokio::test]
async fn emits_one_reading_per_elapsed_second() {
    let (handle, collector, task) = spawn_meter(seconds_window(3));

    handle.record(vec![0u8; 256]).unwrap();
    handle.record(vec![0u8; 256]).unwrap();

    sleep(Duration::from_millis(1500)).await;
    assert_eq!(
        collector.readings(),
        vec![Reading {
            count: 2,
            statistic: 512.0
        }],
        "the first second should close with both events"
    );

    sleep(Duration::from_millis(1000)).await;
    let readings = collector.readings();
    assert_eq!(readings.len(), 2, "one reading per elapsed second");
    assert_eq!(
        readings[1],
        Reading {
            count: 2,
            statistic: 512.0
        },
        "both events are still resident in the 3s window"
    );

    // Totals never changed after the first close, so only one status
    // notification goes out.
    assert_eq!(collector.statuses().len(), 1);

    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));
}

#[tokio::test]
async fn frequent_status_polls_do_not_delay_readings() {
    let (handle, collector, task) = spawn_meter(seconds_window(5));

    handle.record(vec![0u8; 64]).unwrap();

    // A host polling for display must not hold the per-second cadence back.
    for _ in 0..12 {
        sleep(Duration::from_millis(300)).await;
        assert!(!handle.status().await.unwrap().is_paused());
    }

    let readings = collector.readings();
    assert!(
        readings.len() >= 3,
        "3.6s of polling must close at least 3 seconds, got {}",
        readings.len()
    );
    assert_eq!(
        readings[0],
        Reading {
            count: 1,
            statistic: 64.0
        }
    );
    assert_eq!(handle.status().await.unwrap().count, 1);

    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));
}

// ============================================================
// Lifecycle: pause / resume / reset / stop
// ============================================================

#[tokio::test]
async fn pause_holds_readings_and_resume_reanchors() {
    let (handle, collector, task) = spawn_meter(seconds_window(2));

    handle.record(vec![0u8; 64]).unwrap();
    handle.pause().await.unwrap();
    assert!(handle.status().await.unwrap().is_paused());

    sleep(Duration::from_millis(1500)).await;
    assert!(
        collector.readings().is_empty(),
        "a paused meter must not emit"
    );

    handle.resume().await.unwrap();
    assert!(!handle.status().await.unwrap().is_paused());

    // The event recorded before the pause is still pending and lands in
    // the first second closed after the resume.
    sleep(Duration::from_millis(1500)).await;
    let readings = collector.readings();
    assert!(!readings.is_empty(), "resume must rearm the tick");
    assert_eq!(
        readings[0],
        Reading {
            count: 1,
            statistic: 64.0
        }
    );

    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));
}

#[tokio::test]
async fn reset_clears_the_estimate_and_disarms_the_tick() {
    let (handle, collector, task) = spawn_meter(seconds_window(2));

    handle.record(vec![0u8; 32]).unwrap();
    sleep(Duration::from_millis(1300)).await;
    assert_eq!(handle.status().await.unwrap().count, 1);

    handle.reset().await.unwrap();
    let status = handle.status().await.unwrap();
    assert_eq!(status.count, 0);
    assert_eq!(status.statistic, 0.0);
    assert!(status.is_startup());

    // Until the next event the meter sits idle again.
    let quiet = collector.readings().len();
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(collector.readings().len(), quiet);

    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));
}

#[tokio::test]
async fn stop_ends_the_task_and_later_calls_fail() {
    let (handle, _collector, task) = spawn_meter(seconds_window(1));

    handle.record(vec![0u8; 8]).unwrap();
    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));

    assert!(matches!(
        handle.record(vec![0u8; 8]),
        Err(Error::SendError(_))
    ));
    assert!(handle.status().await.is_err());
}

// ============================================================
// Status queries and collaborator failures
// ============================================================

#[tokio::test]
async fn status_query_reflects_live_values() {
    let (handle, _collector, task) = spawn_meter(seconds_window(3));

    for _ in 0..3 {
        handle.record(vec![0u8; 10]).unwrap();
    }
    sleep(Duration::from_millis(1300)).await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.count, 3);
    assert_eq!(status.statistic, 30.0);
    assert!(status.is_startup(), "one of three slots is filled");
    assert!(!status.is_paused());

    handle.stop().await.unwrap();
    assert!(matches!(task.await, Ok(Ok(()))));
}

#[tokio::test]
async fn output_errors_end_the_run() {
    struct ClosedOutput;

    #[async_trait]
    impl Output for ClosedOutput {
        async fn send(&mut self, _reading: Reading) -> Result<()> {
            Err(anyhow::anyhow!("collector closed").into())
        }

        async fn status_changed(&mut self, _status: Status) -> Result<()> {
            Ok(())
        }
    }

    let meter = Meter::new(
        seconds_window(1),
        |msg: &Vec<u8>| msg.len() as f64,
        ClosedOutput,
    );
    let handle = meter.handle();
    let task = tokio::spawn(meter.run());

    handle.record(vec![0u8; 8]).unwrap();

    // The first closed second hits the failing output and the error
    // surfaces from run().
    let result = task.await.expect("meter task must not panic");
    assert!(matches!(result, Err(Error::Anyhow(_))));
}

#[tokio::test]
async fn status_sink_errors_end_the_run() {
    struct ClosedStatusSink;

    #[async_trait]
    impl Output for ClosedStatusSink {
        async fn send(&mut self, _reading: Reading) -> Result<()> {
            Ok(())
        }

        async fn status_changed(&mut self, _status: Status) -> Result<()> {
            Err("status sink closed".into())
        }
    }

    let meter = Meter::new(
        seconds_window(1),
        |msg: &Vec<u8>| msg.len() as f64,
        ClosedStatusSink,
    );
    let handle = meter.handle();
    let task = tokio::spawn(meter.run());

    handle.record(vec![0u8; 8]).unwrap();

    // The first close notifies status before sending the reading, and a
    // plain string error surfaces as the message variant.
    let result = task.await.expect("meter task must not panic");
    assert!(matches!(result, Err(Error::Msg(_))));
}

#[tokio::test]
async fn dropping_every_handle_ends_the_run() {
    let (handle, _collector, task) = spawn_meter(seconds_window(1));

    drop(handle);
    let result = task.await.expect("meter task must not panic");
    assert!(matches!(result, Err(Error::RecvError(_))));
}
