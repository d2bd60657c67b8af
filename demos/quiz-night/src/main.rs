//! # Quiz Night Demo
//!
//! A three-round pub quiz driven by a scripted contestant. Shows how a game
//! plugs into flix: episodes as an enum, seasons as rounds, a timed setting
//! with a timeout policy, and the history printed as JSON at the end.
//!
//! Run with `RUST_LOG=flix_core=debug` to watch the sequencer work.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use flix_core::{
    Dispatch, Episode, Remote, Screen, Season, SeasonNumber, SeasonTimer, Series,
    SeriesController, SkipMode, Skipper, Timed, WatchEvent, WhatNext,
};
use tokio::sync::oneshot;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Screen
// ============================================================================

/// Prints to the terminal and keeps the score.
#[derive(Debug, Default)]
struct Console {
    score: AtomicU32,
}

impl Console {
    fn say(&self, line: impl AsRef<str>) {
        println!("  {}", line.as_ref());
    }

    fn score(&self) -> u32 {
        self.score.load(Ordering::SeqCst)
    }
}

impl Screen for Console {}

// ============================================================================
// Episodes (one per thing a contestant can do)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Buzz {
    /// A right answer scores a point and moves to the next round.
    Right,
    /// A wrong answer keeps the round open.
    Wrong,
    /// Double or nothing on the final question.
    AllIn,
    /// The contestant walks out.
    Forfeit,
}

#[async_trait]
impl Episode<QuizNight> for Buzz {
    async fn watch(
        &self,
        contestant: &str,
        season: SeasonNumber,
        console: &Console,
        _settings: &Timed,
    ) -> WhatNext {
        match self {
            Buzz::Right => {
                console.score.fetch_add(1, Ordering::SeqCst);
                console.say(format!("{contestant}: correct! ({season:?})"));
                WhatNext::LeaveSeason
            }
            Buzz::Wrong => {
                console.say(format!("{contestant}: not quite, try again"));
                WhatNext::StayOnSeason
            }
            Buzz::AllIn => {
                let score = console.score.fetch_add(console.score(), Ordering::SeqCst);
                console.say(format!("{contestant} goes all in with {score} points"));
                WhatNext::LeaveSeason
            }
            Buzz::Forfeit => {
                console.say(format!("{contestant} walks out"));
                WhatNext::SkipToEnd
            }
        }
    }
}

// ============================================================================
// Series
// ============================================================================

struct QuizNight;

#[async_trait]
impl Series for QuizNight {
    type Viewer = str;
    type Episode = Buzz;
    type Screen = Console;
    type Settings = Timed;

    fn episodes(&self, _settings: &Timed) -> Vec<Season<Buzz>> {
        vec![
            vec![Buzz::Right, Buzz::Wrong, Buzz::Forfeit],
            vec![Buzz::Right, Buzz::Wrong, Buzz::Forfeit],
            vec![Buzz::AllIn, Buzz::Forfeit],
        ]
    }

    async fn season_did_start(
        &self,
        season: SeasonNumber,
        console: &Console,
        settings: &Timed,
    ) -> SeasonTimer {
        console.say(format!(
            "== {season:?} round: {}s on the clock ==",
            settings.timeout.as_secs()
        ));
        SeasonTimer::Armed
    }

    async fn season_did_end(&self, season: SeasonNumber, console: &Console, _settings: &Timed) {
        console.say(format!("== end of {season:?} round, score {} ==", console.score()));
    }

    async fn season_too_long(
        &self,
        season: SeasonNumber,
        console: &Console,
        _settings: &Timed,
        skip: Skipper,
    ) {
        console.say(format!("time's up on the {season:?} round"));
        skip.skip(SkipMode::ToNext).await;
    }
}

// ============================================================================
// Contestant script
// ============================================================================

async fn buzz(remote: &Remote<QuizNight>, buzz: Buzz, note: &str) {
    let tag = format!("{buzz:?}Buzzed");
    match remote.watch("Robin", &buzz, WatchEvent::new(tag, note)).await {
        Some(Dispatch::Watched(_)) | None => {}
        Some(other) => info!(?buzz, ?other, "buzz ignored"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "flix_core=info".into()),
        )
        .init();

    let (tx, rx) = oneshot::channel();
    let controller = SeriesController::builder(QuizNight)
        .on_history(move |history| {
            let _ = tx.send(history);
        })
        .build();

    let console = Arc::new(Console::default());
    let remote = controller
        .begin(console.clone(), Timed::new(Duration::from_secs(2)))
        .await;

    println!("Quiz night begins");

    // Warm-up: a miss, a stray final-round buzz, then the answer.
    buzz(&remote, Buzz::Wrong, "q1").await;
    buzz(&remote, Buzz::AllIn, "q1").await;
    buzz(&remote, Buzz::Right, "q1").await;

    // Second round: the contestant freezes and the clock moves things along.
    remote.record(WatchEvent::new("HintRequested", "q2"));
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Final.
    buzz(&remote, Buzz::AllIn, "q3").await;

    let history = rx.await.context("quiz ended without a history")?;
    println!("Final score: {}", console.score());
    println!("{}", history.to_json()?);

    Ok(())
}
