//! RefreshCoordinator polling tests
//!
//! Run on tokio's paused clock: sleeps complete as soon as every task is
//! idle, so multi-second polling finishes instantly and deterministically.

mod helpers;

use std::time::Duration;

use helpers::{artist, config_with_ticks, drain, loaded_dashboard, notices, FakeBackend, Fetch};
use roster_common::events::{AdoptOrigin, DashEvent, NoticeLevel, RefreshOutcome};
use roster_dash::refresh::JobState;

fn adoptions(events: &[DashEvent], origin: AdoptOrigin) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, DashEvent::RosterAdopted { origin: o, .. } if *o == origin))
        .count()
}

#[tokio::test(start_paused = true)]
async fn test_partial_then_full_completion() {
    // Given: two targets at baseline t0
    let backend = FakeBackend::new(vec![artist("A", "t0"), artist("B", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(40)).await;
    let mut rx = dash.subscribe();

    // When: A changes on the first tick, B on the second
    backend.push_fetch(Fetch::Roster(vec![artist("A", "t1"), artist("B", "t0")]));
    backend.push_fetch(Fetch::Roster(vec![artist("A", "t1"), artist("B", "t2")]));

    let handle = dash
        .coordinator()
        .track(vec!["A".into(), "B".into()], "Both refreshed")
        .await
        .unwrap();
    let outcome = handle.wait().await.unwrap();

    // Then: completed after exactly two polls, adopting the fetched roster
    assert_eq!(outcome, RefreshOutcome::Completed);
    assert_eq!(backend.fetch_count(), 3);

    let events = drain(&mut rx);
    assert_eq!(adoptions(&events, AdoptOrigin::RefreshJob), 1);
    assert_eq!(adoptions(&events, AdoptOrigin::Reload), 0);
    assert!(notices(&events).contains(&(NoticeLevel::Success, "Both refreshed".to_string())));

    let state = dash.state().dash.read().await;
    let b = state.store.find("B").unwrap();
    assert_eq!(b.updated_at().and_then(|v| v.as_str()), Some("t2"));
}

#[tokio::test(start_paused = true)]
async fn test_times_out_after_deadline_with_one_reload() {
    // Given: a two-tick deadline and a target that never changes
    let backend = FakeBackend::new(vec![artist("A", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(2)).await;
    let mut rx = dash.subscribe();
    let started = tokio::time::Instant::now();

    // When
    let handle = dash
        .coordinator()
        .track(vec!["A".into()], "never")
        .await
        .unwrap();
    let progress = handle.watch();
    let outcome = handle.wait().await.unwrap();

    // Then: two polls, a timeout on the third tick and a single forced reload
    assert_eq!(outcome, RefreshOutcome::TimedOut);
    assert_eq!(started.elapsed(), Duration::from_secs(9));
    assert_eq!(backend.fetch_count(), 1 + 2 + 1);

    let last = progress.borrow().clone();
    assert_eq!(last.state, JobState::TimedOut);
    assert_eq!(last.ticks, 2);

    let events = drain(&mut rx);
    assert_eq!(adoptions(&events, AdoptOrigin::Reload), 1);
    assert_eq!(adoptions(&events, AdoptOrigin::RefreshJob), 0);
    assert_eq!(
        notices(&events),
        vec![(
            NoticeLevel::Info,
            "Refresh taking longer than expected. Check back later.".to_string()
        )]
    );
    assert!(events.iter().any(|e| matches!(
        e,
        DashEvent::RefreshFinished {
            outcome: RefreshOutcome::TimedOut,
            completed: 0,
            targets: 1,
            ..
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_transport_errors_do_not_stop_polling() {
    let backend = FakeBackend::new(vec![artist("A", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(10)).await;

    backend.push_fetch(Fetch::Transport);
    backend.push_fetch(Fetch::Backend("Database connection failed".into()));
    backend.push_fetch(Fetch::Transport);
    backend.push_fetch(Fetch::Roster(vec![artist("A", "t1")]));

    let outcome = dash
        .coordinator()
        .track(vec!["A".into()], "done")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Completed);
    assert_eq!(backend.fetch_count(), 1 + 4);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_jobs_track_independently() {
    // Given: both targets adopted at t0, but the backend already has a new A
    let backend = FakeBackend::new(vec![artist("A", "t0"), artist("B", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(10)).await;
    backend.set_roster(vec![artist("A", "t1"), artist("B", "t0")]);

    // When: one job per target runs at the same time
    let coordinator = dash.coordinator();
    let job_a = coordinator.track(vec!["A".into()], "A done").await.unwrap();
    let job_b = coordinator.track(vec!["B".into()], "B done").await.unwrap();
    assert_ne!(job_a.job_id(), job_b.job_id());

    // Then: A completes without affecting B's baseline
    assert_eq!(job_a.wait().await.unwrap(), RefreshOutcome::Completed);
    let progress = job_b.progress();
    assert_eq!(progress.state, JobState::Polling);
    assert_eq!(progress.completed, 0);

    backend.set_roster(vec![artist("A", "t1"), artist("B", "t2")]);
    assert_eq!(job_b.wait().await.unwrap(), RefreshOutcome::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_completion_prunes_vanished_selections() {
    let backend = FakeBackend::new(vec![
        artist("A", "t0"),
        artist("B", "t0"),
        artist("C", "t0"),
    ]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(10)).await;
    dash.toggle_row("A").await;
    dash.toggle_row("C").await;

    // C disappears while A is being refreshed
    backend.set_roster(vec![artist("A", "t1"), artist("B", "t0")]);
    let outcome = dash
        .coordinator()
        .track(vec!["A".into()], "done")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Completed);
    assert_eq!(dash.selected().await, vec!["A"]);
}

#[tokio::test(start_paused = true)]
async fn test_deleted_target_times_out() {
    let backend = FakeBackend::new(vec![artist("A", "t0"), artist("B", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(3)).await;

    backend.set_roster(vec![artist("B", "t0")]);
    let outcome = dash
        .coordinator()
        .track(vec!["A".into()], "done")
        .await
        .unwrap()
        .wait()
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::TimedOut);
    // The forced reload dropped A from the store
    assert!(dash.state().dash.read().await.store.find("A").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_refresh_fires_one_request_per_unique_target() {
    let backend = FakeBackend::new(vec![artist("A", "t0"), artist("B", "t0")]);
    backend.bump_on_refresh();
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(10)).await;

    let handle = dash
        .coordinator()
        .refresh(vec!["A".into(), "B".into(), "A".into()], None, "done")
        .await
        .unwrap();
    assert_eq!(handle.wait().await.unwrap(), RefreshOutcome::Completed);

    assert_eq!(backend.refreshed_names(), vec!["A", "B"]);
    assert!(backend.refresh_calls().iter().all(|(_, source)| source.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_empty_target_set_is_rejected() {
    let backend = FakeBackend::new(vec![artist("A", "t0")]);
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(2)).await;

    let err = dash
        .coordinator()
        .refresh(Vec::new(), None, "done")
        .await
        .unwrap_err();
    assert!(matches!(err, roster_common::Error::Validation(_)));
    assert!(backend.refresh_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_baselines_precede_refresh_requests() {
    let backend = FakeBackend::new(vec![artist("A", "t0"), artist("B", "t0")]);
    backend.bump_on_refresh();
    let dash = loaded_dashboard(backend.clone(), config_with_ticks(10)).await;
    let mut rx = dash.subscribe();

    // Given: a job whose baselines were taken when it was created
    let handle = dash
        .coordinator()
        .refresh(vec!["A".into()], None, "A refreshed")
        .await
        .unwrap();
    assert_eq!(handle.progress().state, JobState::Polling);
    assert!(matches!(
        drain(&mut rx).first(),
        Some(DashEvent::RefreshStarted { .. })
    ));

    // When: the request lands and a reload adopts the new timestamp first
    tokio::task::yield_now().await;
    assert_eq!(backend.refreshed_names(), vec!["A"]);
    dash.reload().await.unwrap();

    // Then: the first poll still sees A as changed
    assert_eq!(handle.wait().await.unwrap(), RefreshOutcome::Completed);
    assert_eq!(backend.fetch_count(), 1 + 1 + 1);
}
