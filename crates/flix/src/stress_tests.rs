//! Concurrency stress: many tasks racing on one controller.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures::future::join_all;

use crate::test_support::{open_seasons, Audience, Beat, Show, Stage};
use crate::{tags, Dispatch, PlainSettings, SeriesController, SkipMode, WatchEvent, WhatNext};

const TASKS: usize = 32;
const ROUNDS: usize = 50;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_viewers_never_overlap() {
    let controller = SeriesController::builder(Show::plain(open_seasons(2)))
        .on_history(|_| {})
        .build();
    controller.begin(Arc::new(Stage), PlainSettings).await;
    let audience = Arc::new(Audience::default());

    let tasks = (0..TASKS).map(|task| {
        let controller = controller.clone();
        let audience = audience.clone();
        tokio::spawn(async move {
            let mut watched = 0;
            let mut busy = 0;
            for round in 0..ROUNDS {
                let data = WatchEvent::new("Crowd", format!("{task}/{round}"));
                match controller.receive(&audience, &Beat::Crowd, data).await {
                    Dispatch::Watched(WhatNext::StayOnSeason) => watched += 1,
                    Dispatch::Busy => busy += 1,
                    other => panic!("unexpected dispatch outcome {other:?}"),
                }
                if fastrand::bool() {
                    tokio::task::yield_now().await;
                }
            }
            (watched, busy)
        })
    });

    let (mut watched, mut busy) = (0, 0);
    for outcome in join_all(tasks).await {
        let (w, b) = outcome.unwrap();
        watched += w;
        busy += b;
    }

    assert_eq!(watched + busy, TASKS * ROUNDS);
    assert_eq!(audience.watched(), watched);
    assert!(audience.peak() <= 1, "handlers overlapped: peak {}", audience.peak());

    let history = controller.history();
    assert_eq!(history.len(), watched + 1);
    assert_eq!(history.tags()[0], tags::SEASON_STARTED);
    assert_eq!(controller.current_round(), Some(0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_skips_deliver_the_history_once() {
    let deliveries = Arc::new(AtomicUsize::new(0));
    let controller = SeriesController::builder(Show::plain(open_seasons(8)))
        .on_history({
            let deliveries = deliveries.clone();
            move |_| {
                deliveries.fetch_add(1, Ordering::SeqCst);
            }
        })
        .build();
    controller.begin(Arc::new(Stage), PlainSettings).await;

    let tasks = (0..TASKS).map(|_| {
        let controller = controller.clone();
        tokio::spawn(async move {
            let mode = match fastrand::usize(0..10) {
                0 => SkipMode::ToEnd,
                n => SkipMode::by(n % 3 + 1).unwrap_or(SkipMode::ToNext),
            };
            controller.skip(mode).await;
        })
    });
    for task in join_all(tasks).await {
        task.unwrap();
    }
    controller.stop_watch_now().await;

    assert!(controller.is_finished());
    assert_eq!(controller.current_round(), Some(7));
    assert_eq!(deliveries.load(Ordering::SeqCst), 1);
}
