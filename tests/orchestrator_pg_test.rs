//! Initialization pipeline tests.
//!
//! The connectivity test runs anywhere; the end-to-end scenarios need a real
//! PostgreSQL database and are ignored by default. Run them with:
//!
//! ```sh
//! DATABASE_URL=postgresql://localhost/querybridge_test cargo test -- --ignored
//! ```

use std::fs;
use std::path::Path;

use querybridge::config::AppConfig;
use querybridge::database::{Database, SchemaLoader, SchemaReset, TableSet};
use querybridge::error::InitError;
use querybridge::orchestrator::Orchestrator;

/// Lay out a local dataset copy so no network access is needed. The staging
/// directory already containing the repository makes the sync stage fall into
/// its update path, whose failure (not a git repo) is tolerated as long as
/// the layout validates.
fn fake_dataset(staging: &Path, schema_sql: &str, seeds: &[(&str, &str)]) -> AppConfig {
    let sql_dir = staging.join("RAGmonsters/postgresql");
    let seed_dir = sql_dir.join("dataset");
    fs::create_dir_all(&seed_dir).unwrap();
    fs::write(sql_dir.join("ragmonsters_schema.sql"), schema_sql).unwrap();
    for (name, sql) in seeds {
        fs::write(seed_dir.join(name), sql).unwrap();
    }

    let mut config = AppConfig::default();
    config.dataset.staging_dir = staging.display().to_string();
    config
}

const SCHEMA_SQL: &str = "
    CREATE TABLE monsters (id SERIAL PRIMARY KEY, name TEXT NOT NULL);
    CREATE TABLE keywords (
        id SERIAL PRIMARY KEY,
        monster_id INTEGER REFERENCES monsters(id),
        keyword TEXT NOT NULL
    );
";

fn test_table_set() -> TableSet {
    TableSet::new("monsters", vec!["keywords".to_string(), "monsters".to_string()])
}

fn database_url() -> String {
    std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for ignored PG tests")
}

#[tokio::test]
async fn unreachable_database_aborts_at_connectivity_check() {
    let staging = tempfile::tempdir().unwrap();
    let config = fake_dataset(staging.path(), SCHEMA_SQL, &[]);
    let orchestrator = Orchestrator::with_table_set(&config, test_table_set());

    let err = orchestrator
        .run("postgresql://nobody@127.0.0.1:1/nowhere")
        .await
        .unwrap_err();

    assert!(matches!(err, InitError::ConnectivityFailure(_)));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(err.stage(), "connectivity-check");
}

#[tokio::test]
async fn missing_dataset_aborts_before_touching_the_database() {
    let staging = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.dataset.staging_dir = staging.path().display().to_string();
    // Point the clone at a path that cannot exist so the sync stage fails.
    config.dataset.repo_url = staging.path().join("no-such-repo.git").display().to_string();
    let orchestrator = Orchestrator::with_table_set(&config, test_table_set());

    let err = orchestrator
        .run("postgresql://nobody@127.0.0.1:1/nowhere")
        .await
        .unwrap_err();

    assert!(matches!(err, InitError::DatasetUnavailable(_)));
    assert_eq!(err.exit_code(), 2);
}

async fn monster_count(pool: &sqlx::PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM monsters")
        .fetch_one(pool)
        .await
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn empty_database_initializes_to_seeded_state() {
    let staging = tempfile::tempdir().unwrap();
    let config = fake_dataset(
        staging.path(),
        SCHEMA_SQL,
        &[
            ("001_gloomfang.sql", "INSERT INTO monsters (name) VALUES ('Gloomfang');"),
            ("002_pyroclast.sql", "INSERT INTO monsters (name) VALUES ('Pyroclast');"),
        ],
    );
    let orchestrator = Orchestrator::with_table_set(&config, test_table_set());
    let url = database_url();

    let report = orchestrator.run(&url).await.unwrap();
    assert_eq!(report.seed_files_applied, 2);

    let db = Database::connect(&url).await.unwrap();
    assert_eq!(monster_count(db.pool()).await, 2);

    // Second run against the populated database resets and reloads to the
    // identical state.
    let report = orchestrator.run(&url).await.unwrap();
    assert!(report.dropped_existing_schema);
    assert_eq!(monster_count(db.pool()).await, 2);
    db.close().await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn reset_rolls_back_when_a_drop_fails_mid_transaction() {
    let url = database_url();
    let db = Database::connect(&url).await.unwrap();
    sqlx::raw_sql("DROP TABLE IF EXISTS keywords CASCADE; DROP TABLE IF EXISTS monsters CASCADE;")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::raw_sql(SCHEMA_SQL).execute(db.pool()).await.unwrap();

    // The middle entry produces invalid SQL, failing after the first drop.
    let broken = TableSet::new(
        "monsters",
        vec![
            "keywords".to_string(),
            "broken\"name".to_string(),
            "monsters".to_string(),
        ],
    );
    let err = SchemaReset::run(db.pool(), &broken).await.unwrap_err();
    assert!(matches!(err, InitError::ResetFailed(_)));

    // Rollback left every original table intact, including the one whose
    // drop had already executed inside the transaction.
    for table in ["keywords", "monsters"] {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT FROM information_schema.tables
             WHERE table_name = $1 AND table_schema = 'public')",
        )
        .bind(table)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert!(exists, "table {table} should have survived the rollback");
    }
    db.close().await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn seed_load_stops_at_the_first_failing_file() {
    let staging = tempfile::tempdir().unwrap();
    let config = fake_dataset(
        staging.path(),
        SCHEMA_SQL,
        &[
            ("001_good.sql", "INSERT INTO monsters (name) VALUES ('Gloomfang');"),
            ("002_bad.sql", "INSERT INTO nonexistent_table VALUES (1);"),
            ("003_never_runs.sql", "INSERT INTO monsters (name) VALUES ('Pyroclast');"),
        ],
    );
    let orchestrator = Orchestrator::with_table_set(&config, test_table_set());
    let url = database_url();

    let err = orchestrator.run(&url).await.unwrap_err();
    match err {
        InitError::LoadFailed { file, .. } => assert_eq!(file, "002_bad.sql"),
        other => panic!("expected LoadFailed, got {other:?}"),
    }

    // The alphabetically-later seed was never attempted.
    let db = Database::connect(&url).await.unwrap();
    assert_eq!(monster_count(db.pool()).await, 1);
    db.close().await;
}

#[tokio::test]
#[ignore = "requires a PostgreSQL database via DATABASE_URL"]
async fn loader_applies_files_in_name_order() {
    let url = database_url();
    let db = Database::connect(&url).await.unwrap();
    sqlx::raw_sql("DROP TABLE IF EXISTS keywords CASCADE; DROP TABLE IF EXISTS monsters CASCADE;")
        .execute(db.pool())
        .await
        .unwrap();
    sqlx::raw_sql(SCHEMA_SQL).execute(db.pool()).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    // 002 references the row 001 inserts; name order is load order.
    fs::write(
        dir.path().join("002_keyword.sql"),
        "INSERT INTO keywords (monster_id, keyword) SELECT id, 'shadow' FROM monsters;",
    )
    .unwrap();
    fs::write(
        dir.path().join("001_monster.sql"),
        "INSERT INTO monsters (name) VALUES ('Gloomfang');",
    )
    .unwrap();

    let applied = SchemaLoader::apply_dir(db.pool(), dir.path()).await.unwrap();
    assert_eq!(applied, 2);

    let keywords: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM keywords")
        .fetch_one(db.pool())
        .await
        .unwrap();
    assert_eq!(keywords, 1);
    db.close().await;
}
