use once_cell::sync::OnceCell;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    Statement,
};
use std::path::Path;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Схема БД: каждая инструкция идемпотентна и выполняется отдельно
/// (SQLite в sea-orm не умеет выполнять пакет инструкций)
const SCHEMA: &[(&str, &str)] = &[
    (
        "a101_vendor",
        r#"
        CREATE TABLE IF NOT EXISTS a101_vendor (
            id TEXT PRIMARY KEY NOT NULL,
            code TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        );
        "#,
    ),
    (
        "a102_product_category",
        r#"
        CREATE TABLE IF NOT EXISTS a102_product_category (
            id TEXT PRIMARY KEY NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    ),
    (
        "a103_product",
        r#"
        CREATE TABLE IF NOT EXISTS a103_product (
            id TEXT PRIMARY KEY NOT NULL,
            name TEXT NOT NULL,
            unit TEXT NOT NULL,
            category_id TEXT REFERENCES a102_product_category(id),
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    ),
    (
        "a103_product_name_idx",
        "CREATE INDEX IF NOT EXISTS a103_product_name_idx ON a103_product (name);",
    ),
    (
        "a104_vendor_product",
        r#"
        CREATE TABLE IF NOT EXISTS a104_vendor_product (
            id TEXT PRIMARY KEY NOT NULL,
            vendor_id TEXT NOT NULL REFERENCES a101_vendor(id),
            product_id TEXT NOT NULL REFERENCES a103_product(id),
            price_cents INTEGER NOT NULL,
            in_stock INTEGER NOT NULL DEFAULT 1,
            is_active INTEGER NOT NULL DEFAULT 1,
            vendor_sku TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (vendor_id, product_id)
        );
        "#,
    ),
    (
        "a105_import_batch",
        r#"
        CREATE TABLE IF NOT EXISTS a105_import_batch (
            id TEXT PRIMARY KEY NOT NULL,
            vendor_id TEXT NOT NULL REFERENCES a101_vendor(id),
            created_by_user_id TEXT NOT NULL,
            filename TEXT,
            status TEXT NOT NULL,
            columns_json TEXT NOT NULL DEFAULT '[]',
            row_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            parse_error TEXT,
            locked_at TEXT,
            locked_by_user_id TEXT,
            committed_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK ((locked_at IS NULL) = (locked_by_user_id IS NULL))
        );
        "#,
    ),
    (
        "a105_import_batch_vendor_idx",
        "CREATE INDEX IF NOT EXISTS a105_import_batch_vendor_idx ON a105_import_batch (vendor_id, created_at);",
    ),
    (
        "a105_import_batch_row",
        r#"
        CREATE TABLE IF NOT EXISTS a105_import_batch_row (
            id TEXT PRIMARY KEY NOT NULL,
            batch_id TEXT NOT NULL REFERENCES a105_import_batch(id),
            row_index INTEGER NOT NULL,
            raw_data TEXT NOT NULL,
            normalized_data TEXT,
            status TEXT NOT NULL,
            errors_json TEXT NOT NULL DEFAULT '[]',
            product_id TEXT,
            vendor_product_id TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (batch_id, row_index)
        );
        "#,
    ),
    (
        "sys_audit_log",
        r#"
        CREATE TABLE IF NOT EXISTS sys_audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            action TEXT NOT NULL,
            actor_user_id TEXT,
            diff TEXT NOT NULL
        );
        "#,
    ),
];

fn build_sqlite_url(path: &Path) -> String {
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    format!("sqlite://{}{}?mode=rwc", prefix, normalized)
}

pub async fn connect(url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url.to_string());
    options
        .max_connections(max_connections)
        .min_connections(1)
        .sqlx_logging(false);
    Database::connect(options).await
}

/// Создает недостающие таблицы и индексы
pub async fn ensure_schema<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    for (name, sql) in SCHEMA {
        tracing::debug!("Ensuring schema object {}", name);
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            sql.to_string(),
        ))
        .await?;
    }
    Ok(())
}

pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    let db_url = build_sqlite_url(&absolute_path);
    tracing::info!("Connecting to {}", db_url);

    let conn = connect(&db_url, 8).await?;
    ensure_schema(&conn).await?;
    tracing::info!("Database schema is up to date");

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    Ok(())
}

pub fn get_connection() -> &'static DatabaseConnection {
    DB_CONN
        .get()
        .expect("Database connection has not been initialized")
}

/// In-memory database with the production schema.
///
/// A single pooled connection keeps every query on the same SQLite memory
/// database, so concurrent pipeline calls queue on the pool instead of
/// seeing separate databases.
#[cfg(test)]
pub async fn connect_in_memory() -> DatabaseConnection {
    let conn = connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite");
    ensure_schema(&conn).await.expect("schema");
    conn
}

/// Файловая база во временном каталоге с пулом как в рабочем режиме
#[cfg(test)]
pub async fn connect_temp_file(max_connections: u32) -> (DatabaseConnection, std::path::PathBuf) {
    let path = std::env::temp_dir().join(format!("catalog-import-{}.db", uuid::Uuid::new_v4()));
    let conn = connect(&build_sqlite_url(&path), max_connections)
        .await
        .expect("file sqlite");
    ensure_schema(&conn).await.expect("schema");
    (conn, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sqlite_url() {
        assert_eq!(
            build_sqlite_url(Path::new("/var/db/app.db")),
            "sqlite:///var/db/app.db?mode=rwc"
        );
        assert_eq!(
            build_sqlite_url(Path::new("C:\\data\\app.db")),
            "sqlite:///C:/data/app.db?mode=rwc"
        );
    }

    #[tokio::test]
    async fn test_schema_is_idempotent() {
        let conn = connect_in_memory().await;
        ensure_schema(&conn).await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_columns_must_be_set_together() {
        let conn = connect_in_memory().await;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "INSERT INTO a101_vendor (id, description, created_at) VALUES ('v', 'V', '2024-01-01');"
                .to_string(),
        ))
        .await
        .unwrap();
        let res = conn
            .execute(Statement::from_string(
                DatabaseBackend::Sqlite,
                "INSERT INTO a105_import_batch (id, vendor_id, created_by_user_id, status, locked_at, created_at, updated_at) \
                 VALUES ('b', 'v', 'u', 'DRAFT', '2024-01-01', '2024-01-01', '2024-01-01');"
                    .to_string(),
            ))
            .await;
        assert!(res.is_err());
    }
}
