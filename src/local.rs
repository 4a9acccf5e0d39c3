//! Local snapshot of the roster, kept in the workspace key-value table.
//!
//! Every failure here is logged and swallowed: callers treat a failed load as
//! "nothing stored" and a failed save as a no-op.

use crate::db;
use crate::model::{normalize_ids, Group};
use chrono::{DateTime, Utc};
use rusqlite::Connection;

pub const GROUPS_KEY: &str = "escola-bilhetes";
pub const LAST_SYNC_KEY: &str = "escola-bilhetes.lastSync";

pub fn load_groups(conn: &Connection) -> Option<Vec<Group>> {
    let raw = match db::kv_get(conn, GROUPS_KEY) {
        Ok(Some(v)) => v,
        Ok(None) => return None,
        Err(e) => {
            log::error!("failed to read {GROUPS_KEY}: {e:#}");
            return None;
        }
    };
    match serde_json::from_str::<Vec<Group>>(&raw) {
        Ok(groups) => Some(normalize_ids(groups)),
        Err(e) => {
            log::error!("stored {GROUPS_KEY} is not a valid group list, ignoring it: {e}");
            None
        }
    }
}

pub fn save_groups<'a>(conn: &Connection, groups: impl IntoIterator<Item = &'a Group>) {
    let groups: Vec<&Group> = groups.into_iter().collect();
    let payload = match serde_json::to_string(&groups) {
        Ok(v) => v,
        Err(e) => {
            log::error!("failed to serialize groups: {e}");
            return;
        }
    };
    if let Err(e) = db::kv_set(conn, GROUPS_KEY, &payload) {
        log::error!("failed to save {GROUPS_KEY}: {e:#}");
    }
}

pub fn load_last_sync(conn: &Connection) -> Option<DateTime<Utc>> {
    let raw = db::kv_get(conn, LAST_SYNC_KEY).ok().flatten()?;
    match DateTime::parse_from_rfc3339(&raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            log::warn!("ignoring unparsable {LAST_SYNC_KEY} {raw:?}: {e}");
            None
        }
    }
}

pub fn save_last_sync(conn: &Connection, at: DateTime<Utc>) {
    if let Err(e) = db::kv_set(conn, LAST_SYNC_KEY, &at.to_rfc3339()) {
        log::error!("failed to save {LAST_SYNC_KEY}: {e:#}");
    }
}
