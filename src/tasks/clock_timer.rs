//! Clock timer background task

use std::{sync::Arc, time::Duration};
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

use crate::clock::{ClockInputs, ClockReading, ElapsedClock, WallClock};

const TICK: Duration = Duration::from_secs(1);

/// Clock inputs as published to the timer, numbered so readers can tell which
/// publication a reading was computed for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputUpdate {
    pub revision: u64,
    pub inputs: ClockInputs,
}

/// Background task that recomputes the clock on every input publication and
/// once per second while a session is open.
///
/// `clock` holds the value already computed for the inputs the receiver has
/// seen, so only later publications are picked up. Returns when the input
/// sender or every reading receiver is dropped.
pub async fn clock_timer_task(
    mut clock: ElapsedClock,
    mut inputs_rx: watch::Receiver<InputUpdate>,
    readings_tx: watch::Sender<ClockReading>,
    wall: Arc<dyn WallClock>,
) {
    info!("Starting clock timer task");

    let mut revision = clock.reading().revision;

    loop {
        if clock.is_ticking() {
            debug!("Clock ticking from {}", clock.reading().elapsed);

            // Dropped on input change, so at most one interval exists at a time
            let mut interval = interval_at(Instant::now() + TICK, TICK);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let reading = stamped(clock.tick(wall.now()), revision);
                        trace!("Clock tick: {}", reading.elapsed);
                        if readings_tx.send(reading).is_err() {
                            debug!("No clock readers left, stopping timer");
                            return;
                        }
                    }

                    changed = inputs_rx.changed() => {
                        if changed.is_err() {
                            info!("Clock inputs closed, stopping timer");
                            return;
                        }
                        break;
                    }
                }
            }
        } else {
            debug!("Clock frozen at {}", clock.reading().elapsed);
            if inputs_rx.changed().await.is_err() {
                info!("Clock inputs closed, stopping timer");
                return;
            }
        }

        let update = inputs_rx.borrow_and_update().clone();
        if update.inputs == *clock.inputs() {
            info!("Clock inputs re-sent unchanged, recomputing from baseline");
        } else {
            info!(
                "Clock inputs changed: activity={:?}, session_start={:?}, baseline={:?}",
                update.inputs.activity, update.inputs.session_start, update.inputs.baseline
            );
        }
        revision = update.revision;
        let reading = stamped(clock.update(update.inputs, wall.now()), revision);
        if readings_tx.send(reading).is_err() {
            debug!("No clock readers left, stopping timer");
            return;
        }
    }
}

fn stamped(reading: &ClockReading, revision: u64) -> ClockReading {
    ClockReading {
        revision,
        ..reading.clone()
    }
}

/// Owner of one running clock: its input sender, its reading receiver and
/// the timer task. Dropping the handle stops the timer.
#[derive(Debug)]
pub struct ClockHandle {
    inputs_tx: watch::Sender<InputUpdate>,
    readings_rx: watch::Receiver<ClockReading>,
    task: JoinHandle<()>,
}

impl ClockHandle {
    /// Spawn the timer task on the current tokio runtime
    pub fn spawn(initial: ClockInputs, wall: Arc<dyn WallClock>) -> Self {
        let clock = ElapsedClock::new(initial.clone(), wall.now());
        let (inputs_tx, inputs_rx) = watch::channel(InputUpdate {
            revision: 0,
            inputs: initial,
        });
        let (readings_tx, readings_rx) = watch::channel(clock.reading().clone());

        let task = tokio::spawn(clock_timer_task(clock, inputs_rx, readings_tx, wall));

        Self {
            inputs_tx,
            readings_rx,
            task,
        }
    }

    /// Publish new inputs. Returns `false` and leaves the timer untouched when
    /// they equal the current ones.
    pub fn set_inputs(&self, inputs: ClockInputs) -> bool {
        self.inputs_tx.send_if_modified(|current| {
            if current.inputs == inputs {
                false
            } else {
                current.revision += 1;
                current.inputs = inputs;
                true
            }
        })
    }

    /// Publish inputs from the backend. The timer always recomputes, so a
    /// value frozen on session close gives way to the server baseline even
    /// when the inputs are unchanged. Returns whether they differed.
    pub fn sync_inputs(&self, inputs: ClockInputs) -> bool {
        let mut changed = false;
        self.inputs_tx.send_modify(|current| {
            changed = current.inputs != inputs;
            current.revision += 1;
            current.inputs = inputs;
        });
        changed
    }

    pub fn inputs(&self) -> ClockInputs {
        self.inputs_tx.borrow().inputs.clone()
    }

    /// Number of the latest input publication
    pub fn revision(&self) -> u64 {
        self.inputs_tx.borrow().revision
    }

    pub fn reading(&self) -> ClockReading {
        self.readings_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClockReading> {
        self.readings_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ClockHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    use crate::clock::{Activity, MonotonicClock};

    fn clock_at(s: &str) -> Arc<dyn WallClock> {
        Arc::new(MonotonicClock::starting_at(DateTime::parse_from_rfc3339(s).unwrap()))
    }

    async fn settle() {
        for _ in 0..8 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticks_once_per_second_while_active() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:00:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        settle().await;
        assert_eq!(handle.reading().total_seconds, 0);

        tokio::time::sleep(Duration::from_millis(5_100)).await;
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "00:00:05");
    }

    #[tokio::test(start_paused = true)]
    async fn inactive_clock_does_not_tick() {
        let handle = ClockHandle::spawn(ClockInputs::inactive("02:15:30"), clock_at("2026-03-02T12:00:00Z"));
        settle().await;
        let mut rx = handle.subscribe();
        rx.borrow_and_update();

        tokio::time::sleep(Duration::from_secs(30)).await;
        settle().await;
        assert!(!rx.has_changed().unwrap(), "inactive clock must not publish per second");
        assert_eq!(handle.reading().elapsed.to_string(), "02:15:30");
        assert!(!handle.reading().ticking);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn baseline_change_restarts_from_server_value() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:00:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        tokio::time::sleep(Duration::from_millis(10_100)).await;
        settle().await;
        assert_eq!(handle.reading().total_seconds, 10);

        assert!(handle.set_inputs(ClockInputs::active("01:00:00", "09:00")));
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "01:00:10");

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "01:00:12");
    }

    #[tokio::test(start_paused = true)]
    async fn deactivation_stops_the_timer_and_freezes() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:30:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        settle().await;

        handle.set_inputs(ClockInputs::inactive("00:30:00"));
        settle().await;
        let frozen = handle.reading();
        assert_eq!(frozen.activity, Activity::Inactive);
        assert!(!frozen.ticking);
        assert_eq!(frozen.elapsed.to_string(), "00:30:03");

        tokio::time::sleep(Duration::from_secs(60)).await;
        settle().await;
        assert_eq!(handle.reading().elapsed, frozen.elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn identical_inputs_are_not_a_change() {
        let handle = ClockHandle::spawn(ClockInputs::inactive("00:10:00"), clock_at("2026-03-02T09:00:00Z"));
        assert!(!handle.set_inputs(ClockInputs::inactive("00:10:00")));
        assert!(handle.set_inputs(ClockInputs::inactive("00:10:01")));
    }

    #[tokio::test(start_paused = true)]
    async fn resent_inputs_end_a_freeze() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:30:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        tokio::time::sleep(Duration::from_millis(3_500)).await;
        settle().await;
        handle.set_inputs(ClockInputs::inactive("00:30:00"));
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "00:30:03");

        // Unchanged inputs through the API keep the frozen value
        assert!(!handle.set_inputs(ClockInputs::inactive("00:30:00")));
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "00:30:03");

        assert!(!handle.sync_inputs(ClockInputs::inactive("00:30:00")));
        settle().await;
        assert_eq!(handle.reading().elapsed.to_string(), "00:30:00");
        assert_eq!(handle.reading().revision, handle.revision());
    }

    #[tokio::test(start_paused = true)]
    async fn readings_carry_the_input_revision() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:00:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        assert_eq!(handle.reading().revision, 0);

        assert!(handle.set_inputs(ClockInputs::active("00:10:00", "09:00")));
        assert!(handle.sync_inputs(ClockInputs::inactive("00:20:00")));
        assert_eq!(handle.revision(), 2);

        let mut rx = handle.subscribe();
        let reading = rx.wait_for(|r| r.revision == 2).await.unwrap().clone();
        assert_eq!(reading.elapsed.to_string(), "00:20:00");

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        settle().await;
        assert_eq!(handle.reading().revision, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn initial_reading_comes_from_the_spawned_clock() {
        let wall = clock_at("2026-03-02T09:00:00Z");
        let expected = ElapsedClock::new(ClockInputs::active("00:05:00", "soon"), wall.now());
        let handle = ClockHandle::spawn(ClockInputs::active("00:05:00", "soon"), wall);

        // Nothing is re-sent at startup: the seeded reading is the task's own
        let mut rx = handle.subscribe();
        settle().await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().clone(), *expected.reading());
    }

    #[tokio::test(start_paused = true)]
    async fn task_stops_when_inputs_close() {
        let wall = clock_at("2026-03-02T09:00:00Z");
        let clock = ElapsedClock::new(ClockInputs::active("00:00:00", "09:00"), wall.now());
        let (inputs_tx, inputs_rx) = watch::channel(InputUpdate {
            revision: 0,
            inputs: clock.inputs().clone(),
        });
        let (readings_tx, _readings_rx) = watch::channel(clock.reading().clone());
        let task = tokio::spawn(clock_timer_task(clock, inputs_rx, readings_tx, wall));

        drop(inputs_tx);
        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("timer task should exit")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_handle_aborts_the_task() {
        let handle = ClockHandle::spawn(
            ClockInputs::active("00:00:00", "09:00"),
            clock_at("2026-03-02T09:00:00Z"),
        );
        let mut rx = handle.subscribe();
        drop(handle);
        settle().await;

        // Sender side lives in the aborted task; the channel closes with it
        tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await
        .expect("reading channel should close once the timer is gone");
    }
}
