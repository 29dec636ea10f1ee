//! Integration tests for the tgbot-store crate.
//!
//! These tests run the bootstrap, record access layer and typed views
//! against a real SQLite database on disk (via tempfile).

use serde_json::json;
use tgbot_store::{
    BotStateStore, BotUser, Database, Envelope, POLL_OFFSET_KEY, Record, RecordStore, SqlValue,
    USER_TABLE, UpsertOutcome, UserStore,
};

async fn open_temp() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open_and_bootstrap(dir.path().join("tgbot.db"))
        .await
        .unwrap();
    (dir, db)
}

fn user_record(id: i64, first: &str) -> Record {
    Record::new()
        .with("userID", id)
        .with("chatID", id * 10)
        .with("username", format!("user{id}"))
        .with("firstname", first)
        .with("isBot", id % 2 == 0)
}

// ═══════════════════════════════════════════════════════════════════════
//  Database lifecycle
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn bootstrap_creates_file_and_tables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.db");

    let db = Database::open_and_bootstrap(path.clone()).await.unwrap();
    assert!(path.exists());

    let records = RecordStore::new(db);
    assert!(records.select_rows(USER_TABLE, None).await.unwrap().is_empty());
    assert!(records.select_rows("BotState", None).await.unwrap().is_empty());
}

#[tokio::test]
async fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persist.db");

    {
        let db = Database::open_and_bootstrap(path.clone()).await.unwrap();
        let state = BotStateStore::new(RecordStore::new(db));
        state.set_i64(POLL_OFFSET_KEY, 1001).await.unwrap();
    }

    let db = Database::open_and_bootstrap(path).await.unwrap();
    let state = BotStateStore::new(RecordStore::new(db));
    assert_eq!(state.get_i64(POLL_OFFSET_KEY).await.unwrap(), Some(1001));
}

// ═══════════════════════════════════════════════════════════════════════
//  Record access layer
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn zero_matching_rows() {
    let (_dir, db) = open_temp().await;
    let records = RecordStore::new(db);
    let pred = Record::new().with("userID", 1_i64);

    assert!(records.select_one_row(USER_TABLE, &pred).await.unwrap().is_none());
    assert!(records.select_rows(USER_TABLE, Some(&pred)).await.unwrap().is_empty());
}

#[tokio::test]
async fn insert_many_round_trips_every_row() {
    let (_dir, db) = open_temp().await;
    let records = RecordStore::new(db);

    let batch: Vec<Record> = (1..=5).map(|i| user_record(i, "Name")).collect();
    assert_eq!(records.insert_many(USER_TABLE, &batch).await.unwrap(), 5);

    let rows = records.select_rows(USER_TABLE, None).await.unwrap();
    assert_eq!(rows.len(), 5);
    for row in rows {
        let id = row.get_i64("userID").unwrap();
        assert_eq!(row.get_i64("chatID"), Some(id * 10));
        assert_eq!(row.get_bool("isBot"), Some(id % 2 == 0));
        assert_eq!(row.get_str("username"), Some(format!("user{id}").as_str()));
    }
}

#[tokio::test]
async fn structured_values_survive_through_json() {
    let (_dir, db) = open_temp().await;
    db.run_script("CREATE TABLE Prefs (userID INTEGER PRIMARY KEY, data JSON)")
        .await
        .into_result()
        .unwrap();
    let records = RecordStore::new(db);

    let data = json!({"lang": "en", "muted": false, "tags": [1, 2, 3]});
    records
        .insert("Prefs", &Record::new().with("userID", 1_i64).with("data", data.clone()))
        .await
        .unwrap();

    let got = records
        .select_scalar("Prefs", "data", Some(&Record::new().with("userID", 1_i64)))
        .await
        .unwrap();
    assert_eq!(got, Some(SqlValue::Json(data)));
}

#[tokio::test]
async fn sequential_upserts_leave_one_row_with_latest_values() {
    let (_dir, db) = open_temp().await;
    let records = RecordStore::new(db);
    let key = Record::new().with("userID", 42_i64);

    records
        .upsert(USER_TABLE, &user_record(42, "First"), Some(&key))
        .await
        .unwrap();
    let outcome = records
        .upsert(USER_TABLE, &user_record(42, "Second"), Some(&key))
        .await
        .unwrap();
    assert_eq!(outcome, UpsertOutcome::Updated);

    let rows = records.select_rows(USER_TABLE, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_str("firstname"), Some("Second"));
}

#[tokio::test]
async fn timestamp_sentinel_sets_a_time() {
    let (_dir, db) = open_temp().await;
    let records = RecordStore::new(db);

    records.insert(USER_TABLE, &user_record(3, "T")).await.unwrap();
    let key = Record::new().with("userID", 3_i64);
    records
        .upsert(
            USER_TABLE,
            &Record::new().with("createdDate", SqlValue::CurrentTimestamp),
            Some(&key),
        )
        .await
        .unwrap();

    let created = records
        .select_scalar(USER_TABLE, "createdDate", Some(&key))
        .await
        .unwrap()
        .unwrap();
    let text = created.as_str().unwrap();
    assert_eq!(text.len(), "2024-01-01 00:00:00".len());
}

#[tokio::test]
async fn delete_removes_only_matching_rows() {
    let (_dir, db) = open_temp().await;
    let records = RecordStore::new(db);
    let batch: Vec<Record> = (1..=3).map(|i| user_record(i, "N")).collect();
    records.insert_many(USER_TABLE, &batch).await.unwrap();

    let deleted = records
        .delete_where(USER_TABLE, &Record::new().with("userID", 2_i64))
        .await
        .unwrap();
    assert_eq!(deleted, 1);

    let ids = records
        .select_column(USER_TABLE, "userID", None)
        .await
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert!(!ids.contains(&SqlValue::Integer(2)));
}

// ═══════════════════════════════════════════════════════════════════════
//  Scripts
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn script_failure_then_success_returns_success() {
    let (_dir, db) = open_temp().await;
    let env = db
        .run_script("INSERT INTO Missing VALUES (1); SELECT count(*) AS n FROM User")
        .await;
    assert!(env.is_ok());
    assert_eq!(env.into_rows().unwrap()[0].get_i64("n"), Some(0));
}

#[tokio::test]
async fn script_ending_in_failure_reports_error() {
    let (_dir, db) = open_temp().await;
    let env = db.run_script("SELECT 1; DROP TABLE Missing").await;
    assert!(matches!(env, Envelope::Error(_)));
}

// ═══════════════════════════════════════════════════════════════════════
//  Typed views
// ═══════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn user_store_lists_every_user() {
    let (_dir, db) = open_temp().await;
    let users = UserStore::new(RecordStore::new(db));

    for id in [10, 20, 30] {
        users
            .save(&BotUser {
                user_id: id,
                chat_id: id,
                username: String::new(),
                first_name: format!("U{id}"),
                is_bot: false,
                created_date: None,
            })
            .await
            .unwrap();
    }

    let mut ids: Vec<i64> = users.all().await.unwrap().iter().map(|u| u.user_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![10, 20, 30]);
}
