//! The engine driving a scheduler in real time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickweave::prelude::*;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

fn fast_config() -> SchedulerConfig {
    SchedulerConfig {
        frame_rate: FrameRate::Custom {
            ticks_per_second: 500,
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn engine_ticks_timer_tasks_and_dispatches_completions() {
    let engine: TickweaveEngine<mpsc::UnboundedSender<&'static str>> =
        TickweaveEngine::new(fast_config());
    let (tx, mut rx) = mpsc::unbounded_channel();

    {
        let mut scheduler = engine.lock().await;
        scheduler
            .after(
                3,
                |mut trigger| {
                    trigger.params().send("timer").ok();
                    Outcome::Done
                },
                tx.clone(),
            )
            .unwrap();
        scheduler.on_network(
            41,
            |trigger| {
                if let Trigger::Completed { payload, params } = trigger {
                    if payload.get("status").and_then(|v| v.as_i64()) == Some(200) {
                        params.send("network").ok();
                    }
                }
                Outcome::Done
            },
            tx,
        );
    }

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let runner = engine.clone();
    let handle = tokio::spawn(async move {
        runner
            .run_until(async {
                stop_rx.await.ok();
            })
            .await
    });

    let first = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(first, Some("timer"));

    engine.report_completion(
        AsyncCategory::Network,
        AsyncPayload::with_id(41).field("status", 200),
    );
    let second = timeout(Duration::from_secs(5), rx.recv()).await.unwrap();
    assert_eq!(second, Some("network"));

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
    assert!(engine.lock().await.is_empty());
}

#[tokio::test]
async fn shutdown_tears_down_pending_tasks() {
    let engine: TickweaveEngine<()> = TickweaveEngine::new(fast_config());
    let mut system_events = engine.subscribe_system_events();
    engine
        .lock()
        .await
        .on_dialog(9, |_| Outcome::Done, ());

    engine
        .run_until(tokio::time::sleep(Duration::from_millis(20)))
        .await
        .unwrap();

    assert!(matches!(
        system_events.recv().await.unwrap(),
        SystemEvent::EngineStarted { .. }
    ));
    assert!(matches!(
        system_events.recv().await.unwrap(),
        SystemEvent::EngineShutdown { released: 1 }
    ));
    assert!(engine.lock().await.is_empty());
}

#[tokio::test]
async fn a_second_run_loop_is_refused_while_the_first_is_active() {
    let engine: TickweaveEngine<()> = TickweaveEngine::new(fast_config());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut ticks = engine.subscribe_tick_events();

    let runner = engine.clone();
    let handle = tokio::spawn(async move {
        runner
            .run_until(async {
                stop_rx.await.ok();
            })
            .await
    });

    // Once a tick has gone out the first loop owns the completion queue.
    let tick = timeout(Duration::from_secs(5), ticks.recv()).await.unwrap().unwrap();
    assert_eq!(tick.tick_count, 1);

    let refused = engine.run_until(async {}).await;
    assert!(refused.is_err());

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_completion_backlog_does_not_hold_back_ticks() {
    const BACKLOG: usize = 20_000;

    let engine: TickweaveEngine<Arc<AtomicUsize>> = TickweaveEngine::new(SchedulerConfig {
        frame_rate: FrameRate::Custom {
            ticks_per_second: 1000,
        },
        ..Default::default()
    });
    let resolved = Arc::new(AtomicUsize::new(0));
    let (fired_tx, mut fired_rx) = mpsc::unbounded_channel();

    {
        let mut scheduler = engine.lock().await;
        scheduler
            .after(
                1,
                move |mut trigger| {
                    let seen = trigger.params().load(Ordering::SeqCst);
                    fired_tx.send(seen).ok();
                    Outcome::Done
                },
                resolved.clone(),
            )
            .unwrap();
        for id in 0..BACKLOG as i64 {
            scheduler.on_network(
                id,
                |trigger| {
                    if let Trigger::Completed { params, .. } = trigger {
                        params.fetch_add(1, Ordering::SeqCst);
                    }
                    Outcome::Done
                },
                resolved.clone(),
            );
        }
    }
    for id in 0..BACKLOG as i64 {
        engine.report_completion(AsyncCategory::Network, AsyncPayload::with_id(id));
    }

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let runner = engine.clone();
    let handle = tokio::spawn(async move {
        runner
            .run_until(async {
                stop_rx.await.ok();
            })
            .await
    });

    let seen_at_first_tick = timeout(Duration::from_secs(30), fired_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(
        seen_at_first_tick < BACKLOG,
        "first tick waited for the whole backlog ({seen_at_first_tick} resolved)"
    );

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
