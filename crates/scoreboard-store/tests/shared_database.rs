//! Two scoreboards sharing one SQLite file, as two processes would.

use chrono::{DateTime, Duration, TimeZone, Utc};
use scoreboard_core::{GameMode, HistoryFilter, PlayerId, ScoreboardConfig};
use scoreboard_store::{watch_changes, Repository, SqliteRepository, SyncedScoreboard};
use std::sync::Arc;
use tokio::time::{sleep, Instant};

fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap() + Duration::minutes(minutes)
}

fn ids(names: &[&str]) -> Vec<PlayerId> {
    names.iter().map(|n| n.to_string()).collect()
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoreboard.db");

    {
        let repo = SqliteRepository::open(&path).unwrap();
        let board = SyncedScoreboard::open(ScoreboardConfig::default(), repo).unwrap();
        board.set_credential("Grace", "1234").unwrap();
        board.set_credential("Barbara", "5678").unwrap();

        let confirmed = board
            .propose_at(GameMode::Pool2v2, ids(&["Ada", "Alan"]), ids(&["Grace", "Barbara"]), at(0))
            .unwrap();
        board.confirm_at(confirmed.id, "5678", at(1)).unwrap();

        board
            .propose_at(GameMode::Pool1v1, ids(&["Grace"]), ids(&["Ada"]), at(2))
            .unwrap();
    }

    let repo = SqliteRepository::open(&path).unwrap();
    let board = SyncedScoreboard::open(ScoreboardConfig::default(), repo).unwrap();

    assert_eq!(board.board().rating_of("Alan", GameMode::Pool2v2).rating, 1216);
    assert_eq!(board.board().history(&HistoryFilter::default()).len(), 1);
    assert_eq!(board.board().list_pending(at(3)).len(), 1);
    assert!(board.board().has_credential("Barbara"));
}

#[test]
fn test_two_connections_never_confirm_twice() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoreboard.db");
    let open = || {
        SyncedScoreboard::open(ScoreboardConfig::default(), SqliteRepository::open(&path).unwrap())
            .unwrap()
    };

    let a = open();
    a.set_credential("Grace", "1234").unwrap();
    a.set_credential("Barbara", "4321").unwrap();
    let first = a
        .propose_at(GameMode::Pool1v1, ids(&["Ada"]), ids(&["Grace"]), at(0))
        .unwrap();
    let second = a
        .propose_at(GameMode::Pool1v1, ids(&["Alan"]), ids(&["Barbara"]), at(0))
        .unwrap();

    let b = open();
    a.confirm_at(first.id, "1234", at(1)).unwrap();
    b.confirm_at(second.id, "4321", at(2)).unwrap();
    assert!(b.confirm_at(first.id, "1234", at(3)).is_err());

    let stored = open();
    assert_eq!(stored.board().history(&HistoryFilter::default()).len(), 2);
    assert!(stored.board().list_pending(at(4)).is_empty());
    assert_eq!(stored.board().rating_of("Ada", GameMode::Pool1v1).rating, 1216);
    assert_eq!(stored.board().rating_of("Alan", GameMode::Pool1v1).rating, 1216);
}

#[tokio::test]
async fn test_follower_sees_writes_from_another_connection() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scoreboard.db");

    let writer = SyncedScoreboard::open(
        ScoreboardConfig::default(),
        SqliteRepository::open(&path).unwrap(),
    )
    .unwrap();

    let follower_repo = Arc::new(SqliteRepository::open(&path).unwrap());
    let follower = Arc::new(
        SyncedScoreboard::open(ScoreboardConfig::default(), Arc::clone(&follower_repo)).unwrap(),
    );

    let events = follower_repo.subscribe();
    let watcher = tokio::spawn(watch_changes(
        Arc::clone(&follower_repo),
        std::time::Duration::from_millis(20),
    ));
    let following = tokio::spawn(Arc::clone(&follower).follow(events));
    sleep(std::time::Duration::from_millis(50)).await;

    writer
        .propose_at(GameMode::Foosball1v1, ids(&["Ada"]), ids(&["Grace"]), at(0))
        .unwrap();

    let deadline = Instant::now() + std::time::Duration::from_secs(2);
    while follower.board().list_pending(at(1)).is_empty() {
        assert!(Instant::now() < deadline, "follower never saw the proposal");
        sleep(std::time::Duration::from_millis(10)).await;
    }

    watcher.abort();
    following.abort();
}
