//! Tests for database repository operations.

use tempfile::NamedTempFile;

use fourfold_server::{CompletedGame, GAME_TYPE, GameOutcome, GameRecorder, GameRepository};

/// Creates a temporary database file with schema applied, returns the file
/// handle (must stay in scope to keep the file alive) and a ready repository.
fn setup_test_db() -> (NamedTempFile, GameRepository) {
    let db_file = NamedTempFile::new().expect("Failed to create temp file");
    let db_path = db_file.path().to_str().expect("Invalid path").to_string();

    let repo = GameRepository::new(db_path).expect("Failed to create repository");
    repo.run_migrations().expect("Migrations failed");
    (db_file, repo)
}

fn finished(session_id: &str, red: &str, yellow: &str, winner: Option<&str>) -> CompletedGame {
    CompletedGame::new(
        session_id.to_string(),
        red.to_string(),
        yellow.to_string(),
        winner.map(str::to_string),
        7,
        12.5,
    )
}

#[test]
fn test_blank_path_rejected() {
    assert!(GameRepository::new("  ".to_string()).is_err());
}

#[test]
fn test_migrations_are_idempotent() {
    let (_db, repo) = setup_test_db();
    repo.run_migrations().expect("Second run failed");
}

#[test]
fn test_first_match_creates_profiles() {
    let (_db, repo) = setup_test_db();
    repo.record_match(&finished("s1", "Alice", "Bob", None))
        .expect("Record failed");

    let alice = repo
        .get_user_by_name("Alice")
        .expect("Query failed")
        .expect("Profile created");
    assert_eq!(alice.display_name(), "Alice");
    assert!(*alice.id() > 0);

    let bob = repo
        .get_user_by_name("Bob")
        .expect("Query failed")
        .expect("Profile created");
    assert_ne!(alice.id(), bob.id());
}

#[test]
fn test_get_user_by_name_not_found() {
    let (_db, repo) = setup_test_db();
    let found = repo.get_user_by_name("NoSuchUser").expect("Query failed");
    assert!(found.is_none());
}

#[test]
fn test_record_match_writes_both_seats() {
    let (_db, repo) = setup_test_db();

    let rows = repo
        .record_match(&finished("s1", "alice", "Bot", Some("alice")))
        .expect("Record failed");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].outcome(), "win");
    assert_eq!(*rows[0].moves_count(), 7);
    assert_eq!(rows[0].game_type(), GAME_TYPE);
    assert_eq!(rows[1].outcome(), "loss");
    assert_eq!(rows[1].opponent_name(), "alice");

    let alice = repo
        .get_user_by_name("alice")
        .expect("Query failed")
        .expect("Profile created on first sight");
    let bot = repo
        .get_user_by_name("Bot")
        .expect("Query failed")
        .expect("Bot profile created");

    let alice_stats = repo.get_user_stats(*alice.id()).expect("Stats failed");
    assert_eq!(alice_stats.len(), 1);
    assert_eq!(alice_stats[0].outcome(), "win");
    assert_eq!(alice_stats[0].opponent_name(), "Bot");
    assert_eq!(alice_stats[0].session_id(), "s1");
    assert!((alice_stats[0].duration_secs() - 12.5).abs() < 0.001);

    let bot_stats = repo.get_user_stats(*bot.id()).expect("Stats failed");
    assert_eq!(bot_stats[0].outcome(), "loss");
}

#[test]
fn test_record_match_reuses_profiles() {
    let (_db, repo) = setup_test_db();
    repo.record_match(&finished("s1", "alice", "bob", None))
        .expect("Record failed");
    let first_alice = repo
        .get_user_by_name("alice")
        .expect("Query failed")
        .expect("Profile exists");
    repo.record_match(&finished("s2", "bob", "alice", Some("bob")))
        .expect("Record failed");

    assert_eq!(repo.leaderboard(10).expect("Leaderboard failed").len(), 2);

    let alice = repo
        .get_user_by_name("alice")
        .expect("Query failed")
        .expect("Profile exists");
    assert_eq!(alice.id(), first_alice.id());
    let agg = repo
        .get_aggregated_stats(*alice.id())
        .expect("Aggregation failed");
    assert_eq!(*agg.total_games(), 2);
    assert_eq!(*agg.draws(), 1);
    assert_eq!(*agg.losses(), 1);
    assert_eq!(*agg.wins(), 0);
}

#[test]
fn test_get_aggregated_stats() {
    let (_db, repo) = setup_test_db();
    let winners = [
        Some("Frank"),
        Some("Frank"),
        Some("Frank"),
        Some("Opponent"),
        None,
        None,
    ];
    for (i, winner) in winners.iter().enumerate() {
        repo.record_match(&finished(&format!("session_{i}"), "Frank", "Opponent", *winner))
            .expect("Record failed");
    }

    let user = repo
        .get_user_by_name("Frank")
        .expect("Query failed")
        .expect("Profile exists");
    let agg = repo
        .get_aggregated_stats(*user.id())
        .expect("Aggregation failed");
    assert_eq!(*agg.total_games(), 6);
    assert_eq!(*agg.wins(), 3);
    assert_eq!(*agg.losses(), 1);
    assert_eq!(*agg.draws(), 2);
    assert!((agg.win_rate() - 50.0).abs() < 0.001);
}

#[test]
fn test_get_aggregated_stats_no_games() {
    let (_db, repo) = setup_test_db();
    let agg = repo
        .get_aggregated_stats(4242)
        .expect("Aggregation failed");
    assert_eq!(*agg.total_games(), 0);
    assert_eq!(agg.win_rate(), 0.0);
}

#[test]
fn test_leaderboard_ordering() {
    let (_db, repo) = setup_test_db();
    // carol 2/2, alice 2/3, bob 1/5
    repo.record_match(&finished("s1", "carol", "bob", Some("carol")))
        .expect("Record failed");
    repo.record_match(&finished("s2", "bob", "carol", Some("carol")))
        .expect("Record failed");
    repo.record_match(&finished("s3", "alice", "bob", Some("alice")))
        .expect("Record failed");
    repo.record_match(&finished("s4", "alice", "bob", Some("alice")))
        .expect("Record failed");
    repo.record_match(&finished("s5", "alice", "bob", Some("bob")))
        .expect("Record failed");

    let board = repo.leaderboard(10).expect("Leaderboard failed");
    let names: Vec<&str> = board.iter().map(|e| e.display_name().as_str()).collect();
    assert_eq!(names, ["carol", "alice", "bob"]);
    assert_eq!(*board[1].stats().total_games(), 3);

    let top = repo.leaderboard(2).expect("Leaderboard failed");
    assert_eq!(top.len(), 2);
}

#[tokio::test]
async fn test_repository_as_recorder() {
    let (_db, repo) = setup_test_db();
    repo.record_completed_game(finished("s1", "alice", "bob", Some("bob")))
        .await
        .expect("Record failed");

    let bob = repo
        .get_user_by_name("bob")
        .expect("Query failed")
        .expect("Profile created");
    let agg = repo.get_aggregated_stats(*bob.id()).expect("Aggregation failed");
    assert_eq!(*agg.wins(), 1);
}

#[test]
fn test_game_outcome_round_trip() {
    for outcome in &[GameOutcome::Win, GameOutcome::Loss, GameOutcome::Draw] {
        let s = outcome.to_db_string();
        let parsed = GameOutcome::from_db_string(s).expect("Parse failed");
        assert_eq!(*outcome, parsed);
    }
}
