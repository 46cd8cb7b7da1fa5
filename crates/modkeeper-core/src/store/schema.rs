//! Dialect-specific DDL and upsert statements
//!
//! Statements are written with `?` placeholders and rewritten to `$n` for
//! PostgreSQL, since the Any driver passes SQL through untouched.

use super::snapshot::StoreDriver;

pub const MODULES_TABLE: &str = "modkeeper_modules";
pub const PEERS_TABLE: &str = "modkeeper_peers";
pub const PRINCIPALS_TABLE: &str = "modkeeper_principals";

/// `CREATE TABLE IF NOT EXISTS` statements for the bookkeeping tables
pub fn create_tables(driver: StoreDriver) -> Vec<String> {
    let (id, flag) = match driver {
        StoreDriver::Mysql => ("id INT AUTO_INCREMENT PRIMARY KEY", "BOOLEAN"),
        StoreDriver::Postgres => ("id SERIAL PRIMARY KEY", "BOOLEAN"),
        StoreDriver::Sqlite => ("id INTEGER PRIMARY KEY AUTOINCREMENT", "BOOLEAN"),
    };

    vec![
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MODULES_TABLE} (
                {id},
                name VARCHAR(64) NOT NULL UNIQUE,
                version VARCHAR(32) NOT NULL,
                enabled {flag} NOT NULL DEFAULT TRUE,
                load_time BIGINT NOT NULL
            )
        "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {PRINCIPALS_TABLE} (
                {id},
                uuid VARCHAR(36) NOT NULL UNIQUE,
                name VARCHAR(64) NOT NULL,
                first_seen BIGINT NOT NULL,
                last_seen BIGINT NOT NULL,
                last_peer VARCHAR(64)
            )
        "#
        ),
        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {PEERS_TABLE} (
                {id},
                name VARCHAR(64) NOT NULL UNIQUE,
                address VARCHAR(128) NOT NULL,
                status VARCHAR(16) NOT NULL,
                last_seen BIGINT NOT NULL
            )
        "#
        ),
    ]
}

pub fn upsert_module(driver: StoreDriver) -> String {
    upsert(
        driver,
        MODULES_TABLE,
        &["name", "version", "enabled", "load_time"],
        "name",
        &["version", "enabled", "load_time"],
    )
}

pub fn upsert_peer(driver: StoreDriver) -> String {
    upsert(
        driver,
        PEERS_TABLE,
        &["name", "address", "status", "last_seen"],
        "name",
        &["address", "status", "last_seen"],
    )
}

/// Join: insert or refresh name, last-seen and last peer. `first_seen` is
/// only written on insert.
pub fn upsert_principal(driver: StoreDriver) -> String {
    upsert(
        driver,
        PRINCIPALS_TABLE,
        &["uuid", "name", "first_seen", "last_seen", "last_peer"],
        "uuid",
        &["name", "last_seen", "last_peer"],
    )
}

/// Leave: only the last peer changes
pub fn update_principal_peer(driver: StoreDriver) -> String {
    placeholders(
        driver,
        &format!("UPDATE {PRINCIPALS_TABLE} SET last_peer = ? WHERE uuid = ?"),
    )
}

fn upsert(
    driver: StoreDriver,
    table: &str,
    columns: &[&str],
    key: &str,
    updates: &[&str],
) -> String {
    let values = vec!["?"; columns.len()].join(", ");
    let insert = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        values
    );

    let sql = match driver {
        StoreDriver::Mysql => {
            let set = updates
                .iter()
                .map(|c| format!("{c} = VALUES({c})"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ON DUPLICATE KEY UPDATE {}", insert, set)
        }
        StoreDriver::Postgres | StoreDriver::Sqlite => {
            let set = updates
                .iter()
                .map(|c| format!("{c} = excluded.{c}"))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{} ON CONFLICT ({}) DO UPDATE SET {}", insert, key, set)
        }
    };

    placeholders(driver, &sql)
}

/// Rewrite `?` placeholders to `$1..$n` for PostgreSQL
fn placeholders(driver: StoreDriver, sql: &str) -> String {
    if driver != StoreDriver::Postgres {
        return sql.to_string();
    }

    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}
