//! [`SqliteStore`] — the SQLite implementation of [`ConstraintStore`].

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use std::path::Path;
use uuid::Uuid;

use strato_core::{
  constraint::{Constraint, ConstraintCategory, ConstraintState, NewConstraint},
  remote::RemoteOutcome,
  store::{ConstraintStore, ConstraintSummary},
};

use crate::{
  Error, Result,
  encode::{RawConstraint, RawSummary, encode_dt, encode_uuid},
  schema::SCHEMA,
};

const ROW_COLUMNS: &str = "constraint_id, category, version, state, \
                           extent_json, uss_base_url, time_created, \
                           time_updated";

fn row_to_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawConstraint> {
  Ok(RawConstraint {
    constraint_id: row.get(0)?,
    category:      row.get(1)?,
    version:       row.get(2)?,
    state:         row.get(3)?,
    extent_json:   row.get(4)?,
    uss_base_url:  row.get(5)?,
    time_created:  row.get(6)?,
    time_updated:  row.get(7)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A constraint store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Write a full row. `INSERT OR REPLACE` covers both create and the
  /// full-overwrite update; a replace clears `remote_outcome` until the
  /// post-write enrichment step re-attaches it.
  async fn put_row(&self, c: &Constraint) -> Result<()> {
    let id_str      = encode_uuid(c.constraint_id);
    let category    = c.category.as_str();
    let version     = c.version;
    let state       = c.state.as_str();
    let extent_json = serde_json::to_string(&c.extent)?;
    let time_start  = c.extent.start_unix();
    let time_end    = c.extent.end_unix();
    let base_url    = c.uss_base_url.clone();
    let created     = encode_dt(c.time_created);
    let updated     = encode_dt(c.time_updated);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO constraints (
             constraint_id, category, version, state, extent_json,
             time_start, time_end, uss_base_url, time_created, time_updated,
             remote_outcome
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)",
          rusqlite::params![
            id_str, category, version, state, extent_json, time_start,
            time_end, base_url, created, updated,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── ConstraintStore impl ────────────────────────────────────────────────────

impl ConstraintStore for SqliteStore {
  type Error = Error;

  async fn get(&self, id: Uuid) -> Result<Option<Constraint>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawConstraint> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {ROW_COLUMNS} FROM constraints WHERE constraint_id = ?1"
              ),
              rusqlite::params![id_str],
              row_to_raw,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawConstraint::into_constraint).transpose()
  }

  async fn create(&self, input: NewConstraint) -> Result<Constraint> {
    let now = Utc::now();
    let constraint = Constraint {
      constraint_id: Uuid::new_v4(),
      category: input.category,
      // Version always starts at 1; any client-supplied value is ignored.
      version: 1,
      state: input.state,
      extent: input.extent,
      uss_base_url: input.uss_base_url,
      time_created: now,
      time_updated: now,
    };
    self.put_row(&constraint).await?;
    Ok(constraint)
  }

  async fn update(&self, constraint: &Constraint) -> Result<()> {
    self.put_row(constraint).await
  }

  async fn delete(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM constraints WHERE constraint_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn active_by_state(
    &self,
    state: ConstraintState,
    min_time_end: i64,
  ) -> Result<Vec<Constraint>> {
    let state_str = state.as_str().to_owned();

    let raws: Vec<RawConstraint> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ROW_COLUMNS} FROM constraints \
           WHERE state = ?1 AND time_end >= ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![state_str, min_time_end], row_to_raw)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawConstraint::into_constraint)
      .collect()
  }

  async fn active_by_category(
    &self,
    category: ConstraintCategory,
    min_time_end: i64,
    exclude: Option<Uuid>,
  ) -> Result<Vec<Constraint>> {
    let category_str = category.as_str().to_owned();
    let exclude_str = exclude.map(encode_uuid);

    let raws: Vec<RawConstraint> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(excluded) = exclude_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {ROW_COLUMNS} FROM constraints \
             WHERE category = ?1 AND time_end >= ?2 AND constraint_id <> ?3"
          ))?;
          stmt
            .query_map(
              rusqlite::params![category_str, min_time_end, excluded],
              row_to_raw,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {ROW_COLUMNS} FROM constraints \
             WHERE category = ?1 AND time_end >= ?2"
          ))?;
          stmt
            .query_map(
              rusqlite::params![category_str, min_time_end],
              row_to_raw,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawConstraint::into_constraint)
      .collect()
  }

  async fn attach_remote_outcome(
    &self,
    id: Uuid,
    outcome: &RemoteOutcome,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let outcome_json = serde_json::to_string(outcome)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE constraints SET remote_outcome = ?2 WHERE constraint_id = ?1",
          rusqlite::params![id_str, outcome_json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remote_outcome(&self, id: Uuid) -> Result<Option<RemoteOutcome>> {
    let id_str = encode_uuid(id);

    let json: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT remote_outcome FROM constraints WHERE constraint_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?
            .flatten(),
        )
      })
      .await?;

    json
      .map(|s| serde_json::from_str(&s).map_err(Error::Json))
      .transpose()
  }

  async fn list_summaries(&self) -> Result<Vec<ConstraintSummary>> {
    let raws: Vec<RawSummary> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT constraint_id, uss_base_url, time_created, time_start, \
           time_end FROM constraints",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawSummary {
              constraint_id: row.get(0)?,
              uss_base_url:  row.get(1)?,
              time_created:  row.get(2)?,
              time_start:    row.get(3)?,
              time_end:      row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawSummary::into_summary).collect()
  }
}
