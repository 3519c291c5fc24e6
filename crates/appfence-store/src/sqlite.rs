//! SQLite-based restriction store

use appfence_api::SiteList;
use appfence_util::{ListId, PackageId};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::{RestrictionStore, StoreError, StoreResult};

const META_LAST_RESET_DAY: &str = "last_reset_day";
const META_BLOCKER_ENABLED: &str = "activity_blocker_enabled";
const META_RECOVERY_HASH: &str = "recovery_hash";

/// SQLite-backed restriction store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> StoreResult<()> {
        let conn = self.lock_conn()?;

        conn.execute_batch(
            r#"
            -- Per-app daily limits (minutes)
            CREATE TABLE IF NOT EXISTS limits (
                package TEXT PRIMARY KEY,
                minutes INTEGER NOT NULL
            );

            -- Usage ledger (milliseconds, wiped on daily reset)
            CREATE TABLE IF NOT EXISTS usage (
                package TEXT PRIMARY KEY,
                used_millis INTEGER NOT NULL DEFAULT 0
            );

            -- Per-app reopen cooldowns (seconds)
            CREATE TABLE IF NOT EXISTS reopen (
                package TEXT PRIMARY KEY,
                seconds INTEGER NOT NULL
            );

            -- Blocked activity class names
            CREATE TABLE IF NOT EXISTS blocked_activities (
                class_name TEXT PRIMARY KEY
            );

            -- Browser site lists (JSON records)
            CREATE TABLE IF NOT EXISTS site_lists (
                id TEXT PRIMARY KEY,
                record_json TEXT NOT NULL
            );

            -- Scalar settings
            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;

        debug!("Store schema initialized");
        Ok(())
    }

    fn lock_conn(&self) -> StoreResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("Store lock poisoned".into()))
    }

    fn meta_get(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.lock_conn()?;
        let value: Option<String> = conn
            .query_row("SELECT value FROM meta WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn meta_set(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO meta (key, value) VALUES (?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?;
        Ok(())
    }
}

impl RestrictionStore for SqliteStore {
    fn limit_minutes(&self, package: &PackageId) -> StoreResult<Option<u32>> {
        let conn = self.lock_conn()?;
        let minutes: Option<u32> = conn
            .query_row(
                "SELECT minutes FROM limits WHERE package = ?",
                [package.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(minutes)
    }

    fn set_limit_minutes(&self, package: &PackageId, minutes: u32) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        if minutes == 0 {
            conn.execute("DELETE FROM limits WHERE package = ?", [package.as_str()])?;
            debug!(package = %package, "Limit cleared");
        } else {
            conn.execute(
                r#"
                INSERT INTO limits (package, minutes) VALUES (?, ?)
                ON CONFLICT(package) DO UPDATE SET minutes = excluded.minutes
                "#,
                params![package.as_str(), minutes],
            )?;
            debug!(package = %package, minutes, "Limit set");
        }
        Ok(())
    }

    fn used_millis(&self, package: &PackageId) -> StoreResult<u64> {
        let conn = self.lock_conn()?;
        let millis: Option<i64> = conn
            .query_row(
                "SELECT used_millis FROM usage WHERE package = ?",
                [package.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(millis.unwrap_or(0).max(0) as u64)
    }

    fn add_used_millis(&self, package: &PackageId, delta: u64) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO usage (package, used_millis) VALUES (?, ?)
            ON CONFLICT(package)
            DO UPDATE SET used_millis = used_millis + excluded.used_millis
            "#,
            params![package.as_str(), delta as i64],
        )?;
        Ok(())
    }

    fn clear_all_usage(&self) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM usage", [])?;
        debug!("Usage ledger wiped");
        Ok(())
    }

    fn last_reset_day(&self) -> StoreResult<Option<NaiveDate>> {
        let value = self.meta_get(META_LAST_RESET_DAY)?;
        Ok(value.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
    }

    fn set_last_reset_day(&self, day: NaiveDate) -> StoreResult<()> {
        self.meta_set(META_LAST_RESET_DAY, &day.format("%Y-%m-%d").to_string())
    }

    fn reopen_seconds(&self, package: &PackageId) -> StoreResult<Option<u32>> {
        let conn = self.lock_conn()?;
        let seconds: Option<u32> = conn
            .query_row(
                "SELECT seconds FROM reopen WHERE package = ?",
                [package.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(seconds)
    }

    fn set_reopen_seconds(&self, package: &PackageId, seconds: u32) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        if seconds == 0 {
            conn.execute("DELETE FROM reopen WHERE package = ?", [package.as_str()])?;
            debug!(package = %package, "Reopen cooldown cleared");
        } else {
            conn.execute(
                r#"
                INSERT INTO reopen (package, seconds) VALUES (?, ?)
                ON CONFLICT(package) DO UPDATE SET seconds = excluded.seconds
                "#,
                params![package.as_str(), seconds],
            )?;
            debug!(package = %package, seconds, "Reopen cooldown set");
        }
        Ok(())
    }

    fn blocked_activities(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT class_name FROM blocked_activities ORDER BY class_name")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn set_activity_blocked(&self, class_name: &str, blocked: bool) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        if blocked {
            conn.execute(
                "INSERT OR IGNORE INTO blocked_activities (class_name) VALUES (?)",
                [class_name],
            )?;
        } else {
            conn.execute(
                "DELETE FROM blocked_activities WHERE class_name = ?",
                [class_name],
            )?;
        }
        Ok(())
    }

    fn activity_blocker_enabled(&self) -> StoreResult<bool> {
        Ok(self.meta_get(META_BLOCKER_ENABLED)?.as_deref() == Some("1"))
    }

    fn set_activity_blocker_enabled(&self, enabled: bool) -> StoreResult<()> {
        self.meta_set(META_BLOCKER_ENABLED, if enabled { "1" } else { "0" })
    }

    fn recovery_hash(&self) -> StoreResult<Option<String>> {
        self.meta_get(META_RECOVERY_HASH)
    }

    fn set_recovery_hash(&self, hash: &str) -> StoreResult<()> {
        self.meta_set(META_RECOVERY_HASH, hash)
    }

    fn site_lists(&self) -> StoreResult<Vec<SiteList>> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT id, record_json FROM site_lists ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let json: String = row.get(1)?;
            Ok((id, json))
        })?;

        let mut lists = Vec::new();
        for row in rows {
            let (id, json) = row?;
            match serde_json::from_str::<SiteList>(&json) {
                Ok(list) => lists.push(list),
                Err(e) => {
                    // A corrupt record must not take down every other list
                    warn!(list_id = %id, error = %e, "Skipping malformed site list record");
                }
            }
        }
        Ok(lists)
    }

    fn save_site_list(&self, list: &SiteList) -> StoreResult<()> {
        let json = serde_json::to_string(list)?;
        let conn = self.lock_conn()?;
        conn.execute(
            r#"
            INSERT INTO site_lists (id, record_json) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET record_json = excluded.record_json
            "#,
            params![list.id.as_str(), json],
        )?;
        debug!(list_id = %list.id, "Site list saved");
        Ok(())
    }

    fn remove_site_list(&self, id: &ListId) -> StoreResult<()> {
        let conn = self.lock_conn()?;
        conn.execute("DELETE FROM site_lists WHERE id = ?", [id.as_str()])?;
        debug!(list_id = %id, "Site list removed");
        Ok(())
    }

    fn is_healthy(&self) -> bool {
        match self.conn.lock() {
            Ok(conn) => conn.query_row("SELECT 1", [], |_| Ok(())).is_ok(),
            Err(_) => {
                warn!("Store lock poisoned");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkg(id: &str) -> PackageId {
        PackageId::new(id)
    }

    #[test]
    fn in_memory_store_is_healthy() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.is_healthy());
    }

    #[test]
    fn limit_zero_clears() {
        let store = SqliteStore::in_memory().unwrap();
        let p = pkg("org.example.game");

        assert_eq!(store.limit_minutes(&p).unwrap(), None);

        store.set_limit_minutes(&p, 30).unwrap();
        assert_eq!(store.limit_minutes(&p).unwrap(), Some(30));

        store.set_limit_minutes(&p, 0).unwrap();
        assert_eq!(store.limit_minutes(&p).unwrap(), None);
    }

    #[test]
    fn usage_accrues_and_resets() {
        let store = SqliteStore::in_memory().unwrap();
        let p = pkg("org.example.game");

        assert_eq!(store.used_millis(&p).unwrap(), 0);

        store.add_used_millis(&p, 30_000).unwrap();
        store.add_used_millis(&p, 15_000).unwrap();
        assert_eq!(store.used_millis(&p).unwrap(), 45_000);

        store.clear_all_usage().unwrap();
        assert_eq!(store.used_millis(&p).unwrap(), 0);
    }

    #[test]
    fn last_reset_day_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.last_reset_day().unwrap().is_none());

        let day = NaiveDate::from_ymd_opt(2026, 8, 25).unwrap();
        store.set_last_reset_day(day).unwrap();
        assert_eq!(store.last_reset_day().unwrap(), Some(day));
    }

    #[test]
    fn reopen_zero_clears() {
        let store = SqliteStore::in_memory().unwrap();
        let p = pkg("org.example.game");

        store.set_reopen_seconds(&p, 120).unwrap();
        assert_eq!(store.reopen_seconds(&p).unwrap(), Some(120));

        store.set_reopen_seconds(&p, 0).unwrap();
        assert_eq!(store.reopen_seconds(&p).unwrap(), None);
    }

    #[test]
    fn activity_blocklist() {
        let store = SqliteStore::in_memory().unwrap();

        assert!(!store.activity_blocker_enabled().unwrap());
        store.set_activity_blocker_enabled(true).unwrap();
        assert!(store.activity_blocker_enabled().unwrap());

        store
            .set_activity_blocked("com.android.settings.DevSettingsActivity", true)
            .unwrap();
        // Idempotent
        store
            .set_activity_blocked("com.android.settings.DevSettingsActivity", true)
            .unwrap();
        assert_eq!(store.blocked_activities().unwrap().len(), 1);

        store
            .set_activity_blocked("com.android.settings.DevSettingsActivity", false)
            .unwrap();
        assert!(store.blocked_activities().unwrap().is_empty());
    }

    #[test]
    fn recovery_hash_roundtrip() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.recovery_hash().unwrap().is_none());

        store.set_recovery_hash("deadbeef").unwrap();
        assert_eq!(store.recovery_hash().unwrap().as_deref(), Some("deadbeef"));
    }

    #[test]
    fn site_lists_roundtrip_and_remove() {
        let store = SqliteStore::in_memory().unwrap();

        let list = SiteList::new("Social", vec!["a.example".into(), "b.example".into()]);
        store.save_site_list(&list).unwrap();

        let loaded = store.site_lists().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0], list);

        store.remove_site_list(&list.id).unwrap();
        assert!(store.site_lists().unwrap().is_empty());
    }

    #[test]
    fn malformed_site_list_is_skipped() {
        let store = SqliteStore::in_memory().unwrap();

        let good = SiteList::new("Good", vec!["a.example".into()]);
        store.save_site_list(&good).unwrap();

        {
            let conn = store.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO site_lists (id, record_json) VALUES ('broken', 'not json')",
                [],
            )
            .unwrap();
        }

        let loaded = store.site_lists().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Good");
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("restrictions.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set_limit_minutes(&pkg("org.example.game"), 45).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(
            store.limit_minutes(&pkg("org.example.game")).unwrap(),
            Some(45)
        );
    }
}
