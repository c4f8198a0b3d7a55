//! SQLite-backed record store with push-based live queries.
//!
//! # Responsibility
//! - Provide keyed CRUD over the `notes` table.
//! - Re-run registered live predicates after each committed write and push
//!   changed result sets to their sinks.
//!
//! # Invariants
//! - Writes and their re-deliveries are serialised by the dispatch lock, so
//!   sinks observe sets in commit order.
//! - Registering a live query and delivering its initial set happen under the
//!   same dispatch lock; no write can slip in between.
//! - Sinks are invoked without the connection or registry lock held.
//! - Result sets are ordered by `date DESC, time DESC, id DESC`.

use super::live::{handle_for, LiveRegistry};
use super::{LiveQueryHandle, NotePredicate, NotesSink, RecordStore, StoreError, StoreResult};
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::note::{Note, NoteDraft, NoteId, MAX_IMAGES};
use log::{debug, info, warn};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

const NOTE_SELECT_SQL: &str = "SELECT
    id,
    title,
    body,
    date,
    time,
    latitude,
    longitude,
    location_name,
    weather,
    image_uri_1,
    image_uri_2,
    image_uri_3,
    is_favorite
FROM notes";

const NOTE_ORDER_SQL: &str = " ORDER BY date DESC, time DESC, id DESC";

/// Note store over one SQLite connection.
pub struct SqliteRecordStore {
    conn: Mutex<Connection>,
    dispatch: Mutex<()>,
    live: Arc<Mutex<LiveRegistry>>,
}

impl SqliteRecordStore {
    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
            dispatch: Mutex::new(()),
            live: Arc::new(Mutex::new(LiveRegistry::default())),
        }
    }

    /// Number of live queries currently registered.
    pub fn live_query_count(&self) -> usize {
        lock(&self.live).len()
    }

    fn write<T>(
        &self,
        event: &'static str,
        op: impl FnOnce(&Connection) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let started_at = Instant::now();
        let _dispatch = lock(&self.dispatch);
        let result = {
            let conn = lock(&self.conn);
            op(&conn)
        };
        match &result {
            Ok(_) => {
                info!(
                    "event={event} module=store status=ok duration_ms={}",
                    started_at.elapsed().as_millis()
                );
                self.publish(event);
            }
            Err(err) => {
                warn!(
                    "event={event} module=store status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
            }
        }
        result
    }

    fn query(&self, predicate: &NotePredicate) -> StoreResult<Vec<Note>> {
        let conn = lock(&self.conn);
        query_notes(&conn, predicate)
    }

    /// Pushes fresh sets to every registration. Caller holds the dispatch lock.
    fn publish(&self, trigger: &'static str) {
        let pending = lock(&self.live).pending();
        let mut pushed = 0usize;
        for delivery in pending {
            let result = self.query(&delivery.predicate);
            let should_push = {
                let mut live = lock(&self.live);
                match &result {
                    Ok(notes) => live.accept(delivery.id, notes),
                    Err(_) => live.accept_failure(delivery.id),
                }
            };
            if !should_push {
                continue;
            }
            if let Err(err) = &result {
                warn!(
                    "event=live_query_push module=store status=error live_query_id={} predicate={} error={}",
                    delivery.id,
                    delivery.predicate.kind(),
                    err
                );
            }
            (delivery.sink)(result);
            pushed += 1;
        }
        debug!("event=live_query_publish module=store status=ok trigger={trigger} pushed={pushed}");
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert(&self, draft: &NoteDraft) -> StoreResult<NoteId> {
        draft.validate()?;
        self.write("note_insert", |conn| {
            let images = image_slots(&draft.image_uris);
            conn.execute(
                "INSERT INTO notes (
                    title,
                    body,
                    date,
                    time,
                    latitude,
                    longitude,
                    location_name,
                    weather,
                    image_uri_1,
                    image_uri_2,
                    image_uri_3,
                    is_favorite
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
                params![
                    draft.title.as_str(),
                    draft.body.as_str(),
                    draft.date.as_str(),
                    draft.time.as_str(),
                    draft.latitude,
                    draft.longitude,
                    draft.location_name.as_str(),
                    draft.weather.as_str(),
                    images[0],
                    images[1],
                    images[2],
                    bool_to_int(draft.is_favorite),
                ],
            )
            .map_err(write_error)?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn update(&self, note: &Note) -> StoreResult<()> {
        note.validate()?;
        self.write("note_update", |conn| {
            let images = image_slots(&note.image_uris);
            let changed = conn
                .execute(
                    "UPDATE notes
                     SET
                        title = ?1,
                        body = ?2,
                        date = ?3,
                        time = ?4,
                        latitude = ?5,
                        longitude = ?6,
                        location_name = ?7,
                        weather = ?8,
                        image_uri_1 = ?9,
                        image_uri_2 = ?10,
                        image_uri_3 = ?11,
                        is_favorite = ?12,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?13;",
                    params![
                        note.title.as_str(),
                        note.body.as_str(),
                        note.date.as_str(),
                        note.time.as_str(),
                        note.latitude,
                        note.longitude,
                        note.location_name.as_str(),
                        note.weather.as_str(),
                        images[0],
                        images[1],
                        images[2],
                        bool_to_int(note.is_favorite),
                        note.id,
                    ],
                )
                .map_err(write_error)?;
            expect_one_row(changed, note.id)
        })
    }

    fn delete(&self, id: NoteId) -> StoreResult<()> {
        self.write("note_delete", |conn| {
            let changed = conn
                .execute("DELETE FROM notes WHERE id = ?1;", [id])
                .map_err(write_error)?;
            expect_one_row(changed, id)
        })
    }

    fn set_favorite(&self, id: NoteId, favorite: bool) -> StoreResult<()> {
        self.write("note_set_favorite", |conn| {
            let changed = conn
                .execute(
                    "UPDATE notes
                     SET
                        is_favorite = ?1,
                        updated_at = (strftime('%s', 'now') * 1000)
                     WHERE id = ?2;",
                    params![bool_to_int(favorite), id],
                )
                .map_err(write_error)?;
            expect_one_row(changed, id)
        })
    }

    fn get_by_id(&self, id: NoteId) -> StoreResult<Option<Note>> {
        let mut notes = self.query(&NotePredicate::ById(id))?;
        Ok(notes.pop())
    }

    fn live_query(
        &self,
        predicate: NotePredicate,
        sink: NotesSink,
    ) -> StoreResult<LiveQueryHandle> {
        let _dispatch = lock(&self.dispatch);
        let id = lock(&self.live).register(predicate.clone(), Arc::clone(&sink));

        let notes = match self.query(&predicate) {
            Ok(notes) => notes,
            Err(err) => {
                lock(&self.live).remove(id);
                warn!(
                    "event=live_query_open module=store status=error predicate={} error={}",
                    predicate.kind(),
                    err
                );
                return Err(err);
            }
        };

        lock(&self.live).accept(id, &notes);
        info!(
            "event=live_query_open module=store status=ok live_query_id={} predicate={} initial_count={}",
            id,
            predicate.kind(),
            notes.len()
        );
        sink(Ok(notes));
        Ok(handle_for(&self.live, id))
    }
}

fn query_notes(conn: &Connection, predicate: &NotePredicate) -> StoreResult<Vec<Note>> {
    let mut sql = String::from(NOTE_SELECT_SQL);
    let mut bind_values: Vec<Value> = Vec::new();

    match predicate {
        NotePredicate::All => {}
        NotePredicate::KeywordSubstring(keyword) => {
            sql.push_str(" WHERE (instr(title, ?1) > 0 OR instr(location_name, ?1) > 0)");
            bind_values.push(Value::Text(keyword.clone()));
        }
        NotePredicate::DatePrefix(prefix) => {
            sql.push_str(" WHERE substr(date, 1, length(?1)) = ?1");
            bind_values.push(Value::Text(prefix.clone()));
        }
        NotePredicate::ById(id) => {
            sql.push_str(" WHERE id = ?1");
            bind_values.push(Value::Integer(*id));
        }
    }
    sql.push_str(NOTE_ORDER_SQL);

    let mut stmt = conn.prepare(&sql).map_err(read_error)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(read_error)?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next().map_err(read_error)? {
        notes.push(parse_note_row(row)?);
    }
    Ok(notes)
}

fn parse_note_row(row: &Row<'_>) -> StoreResult<Note> {
    let is_favorite = match row.get::<_, i64>("is_favorite").map_err(read_error)? {
        0 => false,
        1 => true,
        other => {
            return Err(StoreError::InvalidData(format!(
                "invalid is_favorite value `{other}` in notes.is_favorite"
            )));
        }
    };

    let mut image_uris = Vec::with_capacity(MAX_IMAGES);
    for column in ["image_uri_1", "image_uri_2", "image_uri_3"] {
        if let Some(uri) = row.get::<_, Option<String>>(column).map_err(read_error)? {
            image_uris.push(uri);
        }
    }

    let note = Note {
        id: row.get("id").map_err(read_error)?,
        title: row.get("title").map_err(read_error)?,
        body: row.get("body").map_err(read_error)?,
        date: row.get("date").map_err(read_error)?,
        time: row.get("time").map_err(read_error)?,
        latitude: row.get("latitude").map_err(read_error)?,
        longitude: row.get("longitude").map_err(read_error)?,
        location_name: row.get("location_name").map_err(read_error)?,
        weather: row.get("weather").map_err(read_error)?,
        image_uris,
        is_favorite,
    };
    note.validate().map_err(|err| {
        StoreError::InvalidData(format!("note {} failed validation: {err}", note.id))
    })?;
    Ok(note)
}

fn image_slots(uris: &[String]) -> [Option<&str>; MAX_IMAGES] {
    let mut slots = [None; MAX_IMAGES];
    for (slot, uri) in slots.iter_mut().zip(uris) {
        *slot = Some(uri.as_str());
    }
    slots
}

fn expect_one_row(changed: usize, id: NoteId) -> StoreResult<()> {
    if changed == 0 {
        return Err(StoreError::NotFound(id));
    }
    Ok(())
}

fn write_error(err: rusqlite::Error) -> StoreError {
    StoreError::Write(DbError::Sqlite(err))
}

fn read_error(err: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(DbError::Sqlite(err))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
