//! A small heist game played end to end through the public API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use flix_core::{
    async_trait, tags, Dispatch, Episode, EpisodeSequencer, Screen, Season, SeasonNumber,
    SeasonTimer, Series, SeriesController, SkipMode, Skipper, Timed, TimedSettings, WatchEvent,
    WhatNext,
};
use flix_testing::{locations_of, tagged, Gate, HistoryProbe, Notice, NotificationRecorder};

#[derive(Debug, Default)]
struct Vault {
    shown: Mutex<Vec<String>>,
}

impl Screen for Vault {}

impl Vault {
    fn show(&self, line: impl Into<String>) {
        self.shown.lock().unwrap().push(line.into());
    }

    fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Move {
    Sneak,
    Crack(Gate),
    Alarm,
    Escape,
}

#[async_trait]
impl Episode<Heist> for Move {
    async fn watch(
        &self,
        _crew: &str,
        _season: SeasonNumber,
        screen: &Vault,
        _settings: &Timed,
    ) -> WhatNext {
        match self {
            Move::Sneak => WhatNext::StayOnSeason,
            Move::Crack(gate) => {
                gate.wait().await;
                screen.show("vault open");
                WhatNext::LeaveSeason
            }
            Move::Alarm => WhatNext::SkipToEnd,
            Move::Escape => WhatNext::LeaveSeason,
        }
    }
}

#[derive(Default)]
struct Heist {
    on_timeout: Option<SkipMode>,
}

#[async_trait]
impl Series for Heist {
    type Viewer = str;
    type Episode = Move;
    type Screen = Vault;
    type Settings = Timed;

    fn episodes(&self, _settings: &Timed) -> Vec<Season<Move>> {
        vec![
            vec![Move::Sneak, Move::Crack(Gate::new())],
            vec![Move::Alarm, Move::Escape],
        ]
    }

    async fn season_did_start(
        &self,
        season: SeasonNumber,
        screen: &Vault,
        _settings: &Timed,
    ) -> SeasonTimer {
        screen.show(format!("start {season:?}"));
        SeasonTimer::Armed
    }

    async fn season_did_end(&self, season: SeasonNumber, screen: &Vault, _settings: &Timed) {
        screen.show(format!("end {season:?}"));
    }

    async fn season_too_long(
        &self,
        _season: SeasonNumber,
        screen: &Vault,
        _settings: &Timed,
        skip: Skipper,
    ) {
        screen.show("too slow");
        if let Some(mode) = self.on_timeout {
            skip.skip(mode).await;
        }
    }
}

fn short_fuse() -> Timed {
    let mut settings = Timed::default();
    settings.set_timeout(Duration::from_secs(10));
    settings
}

#[tokio::test]
async fn crew_cracks_the_vault_and_escapes() -> anyhow::Result<()> {
    let vault = Arc::new(Vault::default());
    let controller = SeriesController::new(Heist::default());
    let probe = HistoryProbe::attach(&controller);
    let remote = controller.begin(vault.clone(), short_fuse()).await;

    let gate = Gate::new();
    let crack = tokio::spawn({
        let remote = remote.clone();
        let gate = gate.clone();
        async move {
            remote
                .watch("crew", &Move::Crack(gate), WatchEvent::new("Drilled", "vault"))
                .await
        }
    });
    while !controller.history().tags().contains(&"Drilled") {
        tokio::task::yield_now().await;
    }

    let busy = remote
        .watch("crew", &Move::Sneak, WatchEvent::new("Peeked", ""))
        .await;
    assert_eq!(busy, Some(Dispatch::Busy));

    gate.open();
    assert_eq!(
        crack.await?,
        Some(Dispatch::Watched(WhatNext::LeaveSeason))
    );
    remote.record(WatchEvent::new("Bagged", "loot"));
    remote
        .watch("crew", &Move::Escape, WatchEvent::new("Ran", "door"))
        .await;

    let history = probe.delivered_within(Duration::from_secs(1)).await?;
    assert_eq!(
        history.tags(),
        vec![
            tags::SEASON_STARTED,
            tags::TIMEOUT_TIMER_STARTED,
            "Drilled",
            tags::SEASON_ENDED,
            tags::SEASON_STARTED,
            tags::TIMEOUT_TIMER_STARTED,
            "Bagged",
            "Ran",
            tags::SEASON_ENDED,
        ]
    );
    assert_eq!(history.events()[2].location(), "0/vault");
    assert_eq!(history.events()[6].location(), "1/loot");
    assert_eq!(
        vault.shown(),
        vec!["start First", "vault open", "end First", "start Last", "end Last"]
    );

    let json: serde_json::Value = serde_json::from_str(&history.to_json()?)?;
    assert_eq!(json["events"][2]["what"], "Drilled");
    Ok(())
}

#[tokio::test]
async fn alarm_ends_the_heist_early() -> anyhow::Result<()> {
    let controller = SeriesController::new(Heist::default());
    let probe = HistoryProbe::attach(&controller);
    let remote = controller.begin(Arc::new(Vault::default()), short_fuse()).await;

    let early = remote
        .watch("crew", &Move::Alarm, WatchEvent::new("Tripped", ""))
        .await;
    assert_eq!(early, Some(Dispatch::OutOfSeason));

    controller.skip(SkipMode::ToNext).await;
    remote
        .watch("crew", &Move::Alarm, WatchEvent::new("Tripped", "laser"))
        .await;
    remote.stop_watch_now().await;

    assert_eq!(probe.deliveries(), 1);
    let history = probe.delivered().await?;
    assert_eq!(locations_of(&history, "Tripped"), vec!["1/laser"]);
    assert!(history.tags().contains(&tags::SEASON_SKIPPED_TO_THE_NEXT));
    assert_eq!(history.tags().last(), Some(&tags::SEASON_ENDED));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dawdling_crew_is_moved_along() -> anyhow::Result<()> {
    let vault = Arc::new(Vault::default());
    let controller = SeriesController::new(Heist {
        on_timeout: Some(SkipMode::ToNext),
    });
    let probe = HistoryProbe::attach(&controller);
    controller.begin(vault.clone(), short_fuse()).await;

    let history = probe.delivered().await?;

    assert_eq!(tagged(&history, tags::TIMEOUT_OCCURRED).len(), 2);
    assert_eq!(
        vault.shown(),
        vec!["start First", "too slow", "end First", "start Last", "too slow", "end Last"]
    );
    Ok(())
}

#[tokio::test]
async fn sequencer_walks_seasons_for_any_owner() {
    let recorder = NotificationRecorder::new(SeasonTimer::Unarmed);
    let settings = short_fuse();
    let sequencer: EpisodeSequencer<Heist> =
        EpisodeSequencer::new(Heist::default().episodes(&settings), recorder.owner());
    let vault = Vault::default();

    sequencer.start_first_season(&vault, &settings).await;
    let stray = sequencer
        .dispatch("crew", &Move::Escape, &vault, &settings, None)
        .await;
    assert_eq!(stray, Dispatch::OutOfSeason);

    sequencer.skip(SkipMode::ToNext, &vault, &settings).await;
    sequencer
        .dispatch(
            "crew",
            &Move::Escape,
            &vault,
            &settings,
            Some(WatchEvent::new("Ran", "")),
        )
        .await;

    assert!(sequencer.is_terminal());
    assert_eq!(
        recorder.recorded(),
        vec![tags::SEASON_SKIPPED_TO_THE_NEXT, "Ran"]
    );
    assert_eq!(
        recorder.notices(),
        vec![
            Notice::SeasonStarted(0),
            Notice::PresentedStart(SeasonNumber::First),
            Notice::Recorded {
                round: 0,
                tag: tags::SEASON_SKIPPED_TO_THE_NEXT.into(),
            },
            Notice::TimerDisarmed,
            Notice::SeasonEnded(0),
            Notice::PresentedEnd(SeasonNumber::First),
            Notice::SeasonStarted(1),
            Notice::PresentedStart(SeasonNumber::Last),
            Notice::Recorded {
                round: 1,
                tag: "Ran".into(),
            },
            Notice::TimerDisarmed,
            Notice::SeasonEnded(1),
            Notice::PresentedEnd(SeasonNumber::Last),
            Notice::SequenceEnded,
        ]
    );
    assert_eq!(recorder.count(|n| *n == Notice::SequenceEnded), 1);
}
