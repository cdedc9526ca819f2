use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

pub type DbPool = Pool<Sqlite>;

pub const DEFAULT_DATABASE_URL: &str = "sqlite:switchboard.db";

pub async fn init_db(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let in_memory = database_url.contains(":memory:");

    // Create database file if not exists
    if !in_memory && !Sqlite::database_exists(database_url).await.unwrap_or(false) {
        Sqlite::create_database(database_url).await?;
    }

    // Every connection to an in-memory database gets its own empty database,
    // so those pools are pinned to one long-lived connection.
    let options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(database_url).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'pending',
            content TEXT NOT NULL,
            title TEXT NOT NULL,
            language TEXT NOT NULL,
            result TEXT,
            error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_jobs_status_created ON jobs (status, created_at);
        "#,
    )
    .execute(&pool)
    .await?;

    Ok(pool)
}
