//! Periodic backend refresh task

use std::{sync::Arc, time::Duration};
use chrono::NaiveDate;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::{
    clock::{ClockInputs, WallClock},
    errors::ClockResult,
    services::{AccumulatedDuration, AttendanceBackend, SessionStatus},
    state::AppState,
};

/// Combine the two backend responses into clock inputs.
///
/// The accumulated total is the baseline. The open session's start comes from
/// the session status, or from the accumulated record's last start when the
/// status omits it.
pub fn merge_inputs(status: &SessionStatus, accumulated: &AccumulatedDuration) -> ClockInputs {
    let activity = status.activity();
    let session_start = if activity.is_active() {
        status
            .session_start_time
            .clone()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| accumulated.last_session_start.clone())
    } else {
        None
    };

    if activity.is_active() != accumulated.is_active {
        debug!(
            "Session status and accumulated duration disagree on activity, using status ({:?})",
            activity
        );
    }

    ClockInputs {
        activity,
        session_start,
        baseline: accumulated.total_duration.clone(),
    }
}

/// Fetch both endpoints once and publish the result.
///
/// The clock always recomputes from the fetched baseline. Returns whether the
/// clock inputs changed.
pub async fn refresh_once(state: &AppState, backend: &dyn AttendanceBackend, today: NaiveDate) -> ClockResult<bool> {
    let (status, accumulated) = tokio::try_join!(backend.session_status(), backend.accumulated_duration(today))?;

    let inputs = merge_inputs(&status, &accumulated);
    let changed = state.sync_inputs("backend refresh", inputs);

    let label = Some(status.time_zone_label).filter(|l| !l.trim().is_empty());
    state.record_refresh_success(label)?;
    Ok(changed)
}

/// Background task that re-fetches the clock inputs on a fixed period and on demand
pub async fn refresh_task(
    state: Arc<AppState>,
    backend: Arc<dyn AttendanceBackend>,
    wall: Arc<dyn WallClock>,
    every: Duration,
) {
    info!("Starting refresh task, every {}s", every.as_secs());

    let mut interval = interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = state.refresh_requested.notified() => {
                debug!("Refresh requested out of schedule");
                interval.reset();
            }
        }

        let today = wall.now().date_naive();
        match refresh_once(&state, backend.as_ref(), today).await {
            Ok(true) => info!("Refresh applied new clock inputs"),
            Ok(false) => debug!("Refresh returned unchanged clock inputs"),
            Err(e) => {
                warn!("Refresh failed, keeping previous inputs: {}", e);
                if let Err(e) = state.record_refresh_failure(e.to_string()) {
                    error!("Failed to record refresh failure: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::DateTime;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex;

    use crate::{
        clock::{Activity, MonotonicClock},
        errors::ClockError,
        tasks::ClockHandle,
    };

    struct FakeBackend {
        status: Mutex<SessionStatus>,
        accumulated: Mutex<AccumulatedDuration>,
        fail: std::sync::atomic::AtomicBool,
        calls: AtomicU32,
    }

    impl FakeBackend {
        fn new(status: SessionStatus, accumulated: AccumulatedDuration) -> Self {
            Self {
                status: Mutex::new(status),
                accumulated: Mutex::new(accumulated),
                fail: std::sync::atomic::AtomicBool::new(false),
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl AttendanceBackend for FakeBackend {
        async fn session_status(&self) -> ClockResult<SessionStatus> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            if self.fail.load(Ordering::Relaxed) {
                return Err(ClockError::Backend("connection refused".to_string()));
            }
            Ok(self.status.lock().await.clone())
        }

        async fn accumulated_duration(&self, _date: NaiveDate) -> ClockResult<AccumulatedDuration> {
            Ok(self.accumulated.lock().await.clone())
        }
    }

    fn status(active: bool, start: Option<&str>) -> SessionStatus {
        SessionStatus {
            is_active: active,
            session_start_time: start.map(str::to_string),
            time_zone_label: "IST".to_string(),
            punch_state: None,
        }
    }

    fn accumulated(total: &str, last_start: Option<&str>) -> AccumulatedDuration {
        AccumulatedDuration {
            total_duration: total.to_string(),
            is_active: last_start.is_some(),
            last_session_start: last_start.map(str::to_string),
            last_session_end: None,
        }
    }

    fn wall() -> Arc<dyn WallClock> {
        Arc::new(MonotonicClock::starting_at(
            DateTime::parse_from_rfc3339("2026-03-02T10:00:00+05:30").unwrap(),
        ))
    }

    fn app_state(wall: Arc<dyn WallClock>) -> Arc<AppState> {
        let clock = ClockHandle::spawn(ClockInputs::default(), wall);
        Arc::new(AppState::new(clock, 0, "127.0.0.1".to_string(), "local".to_string(), true))
    }

    #[test]
    fn merge_prefers_status_start() {
        let inputs = merge_inputs(&status(true, Some("09:00")), &accumulated("01:00:00", Some("08:00")));
        assert_eq!(inputs, ClockInputs::active("01:00:00", "09:00"));
    }

    #[test]
    fn merge_falls_back_to_last_session_start() {
        let inputs = merge_inputs(&status(true, Some(" ")), &accumulated("01:00:00", Some("08:00")));
        assert_eq!(inputs.session_start.as_deref(), Some("08:00"));
    }

    #[test]
    fn merge_drops_start_when_inactive() {
        let inputs = merge_inputs(&status(false, Some("09:00")), &accumulated("04:00:00", None));
        assert_eq!(inputs, ClockInputs::inactive("04:00:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_once_publishes_backend_values() {
        let wall = wall();
        let state = app_state(Arc::clone(&wall));
        let backend = FakeBackend::new(status(true, Some("09:00")), accumulated("01:30:00", Some("09:00")));

        let today = wall.now().date_naive();
        assert!(refresh_once(&state, &backend, today).await.unwrap());
        assert!(!refresh_once(&state, &backend, today).await.unwrap());

        tokio::time::sleep(Duration::from_millis(10)).await;
        let reading = state.current_reading();
        assert_eq!(reading.activity, Activity::Active);
        assert_eq!(reading.elapsed.to_string(), "02:30:00");
        assert_eq!(state.time_zone_label(), "IST");
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_replaces_a_frozen_value_with_the_server_baseline() {
        let wall = wall();
        let state = app_state(Arc::clone(&wall));
        let backend = FakeBackend::new(status(false, None), accumulated("00:30:00", None));

        state.publish_inputs("api", ClockInputs::active("00:30:00", "10:00"));
        tokio::time::sleep(Duration::from_millis(600_500)).await;
        state.publish_inputs("api", ClockInputs::inactive("00:30:00"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.current_reading().elapsed.to_string(), "00:40:00");

        let today = wall.now().date_naive();
        for _ in 0..2 {
            assert!(!refresh_once(&state, &backend, today).await.unwrap());
            tokio::time::sleep(Duration::from_millis(10)).await;
            let reading = state.current_reading();
            assert_eq!(reading.elapsed.to_string(), "00:30:00");
            assert!(!reading.ticking);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_inputs() {
        let wall = wall();
        let state = app_state(Arc::clone(&wall));
        let backend = Arc::new(FakeBackend::new(status(false, None), accumulated("03:00:00", None)));

        refresh_once(&state, backend.as_ref(), wall.now().date_naive()).await.unwrap();
        backend.fail.store(true, Ordering::Relaxed);

        let task = tokio::spawn(refresh_task(
            Arc::clone(&state),
            backend.clone() as Arc<dyn AttendanceBackend>,
            Arc::clone(&wall),
            Duration::from_secs(300),
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;

        let refresh = state.get_refresh_state().unwrap();
        assert_eq!(refresh.consecutive_failures, 1);
        assert!(refresh.errors[0].contains("connection refused"));
        assert_eq!(state.current_inputs(), ClockInputs::inactive("03:00:00"));
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn manual_request_triggers_fetch() {
        let wall = wall();
        let state = app_state(Arc::clone(&wall));
        let backend = Arc::new(FakeBackend::new(status(false, None), accumulated("00:10:00", None)));

        let task = tokio::spawn(refresh_task(
            Arc::clone(&state),
            backend.clone() as Arc<dyn AttendanceBackend>,
            Arc::clone(&wall),
            Duration::from_secs(300),
        ));
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(backend.calls.load(Ordering::Relaxed), 1);

        *backend.accumulated.lock().await = accumulated("00:20:00", None);
        state.request_refresh().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(backend.calls.load(Ordering::Relaxed), 2);
        assert_eq!(state.current_inputs(), ClockInputs::inactive("00:20:00"));
        task.abort();
    }
}
