//! [`SqliteStore`]: the SQLite implementation of the storage traits.

use std::path::Path;

use chrono::{DateTime, Utc};
use rollcall_core::{
  attendance::{AttendanceInterval, AttendanceQuery, AttendanceRecord, NewInterval},
  device::DeviceConfig,
  person::{NewPerson, Person, PersonMatch},
  punch::{NewTransactionLog, TransactionLog},
  store::{AttendanceStore, DirectoryStore},
};
use rusqlite::{OptionalExtension as _, types::Value};

use crate::{
  Result,
  encode::{
    INTERVAL_COLUMNS, LOG_COLUMNS, PERSON_COLUMNS, RawDeviceConfig, RawInterval,
    RawLog, RawPerson, RawRecord, encode_dt, like_pattern, stored_dt,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An attendance store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
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

  /// Open an in-memory store, for tests.
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

  async fn query_person(&self, sql: String, arg: Value) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, [arg], RawPerson::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  /// Attendance joined with users, filtered by `where_clause` over `args`.
  /// `limit` is bound as the last parameter.
  async fn query_records(
    &self,
    where_clause: String,
    mut args: Vec<Value>,
    limit: i64,
  ) -> Result<Vec<AttendanceRecord>> {
    args.push(Value::Integer(limit));
    let sql = format!(
      "SELECT a.id, a.user_id, a.check_in, a.check_out, a.status, u.name, u.role
       FROM attendance a
       JOIN users u ON a.user_id = u.id
       {where_clause}
       ORDER BY a.check_in DESC, a.id DESC
       LIMIT ?{}",
      args.len()
    );

    let raws: Vec<RawRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(args), |row| {
            Ok(RawRecord {
              interval:  RawInterval::from_row(row, 0)?,
              user_name: row.get(5)?,
              user_role: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRecord::into_record).collect()
  }
}

// ─── AttendanceStore impl ────────────────────────────────────────────────────

impl AttendanceStore for SqliteStore {
  type Error = crate::Error;

  // ── People ────────────────────────────────────────────────────────────────

  async fn get_person(&self, id: i64) -> Result<Option<Person>> {
    self
      .query_person(
        format!("SELECT {PERSON_COLUMNS} FROM users WHERE id = ?1"),
        Value::Integer(id),
      )
      .await
  }

  async fn find_person_by_code(&self, code: String) -> Result<Option<Person>> {
    // A badge match outranks an id that happens to look the same.
    self
      .query_person(
        format!(
          "SELECT {PERSON_COLUMNS} FROM users
           WHERE badge_number = ?1 OR CAST(id AS TEXT) = ?1
           ORDER BY badge_number = ?1 DESC
           LIMIT 1"
        ),
        Value::Text(code),
      )
      .await
  }

  // ── Intervals ─────────────────────────────────────────────────────────────

  async fn latest_interval(&self, person_id: i64) -> Result<Option<AttendanceInterval>> {
    let raw: Option<RawInterval> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {INTERVAL_COLUMNS} FROM attendance
                 WHERE user_id = ?1
                 ORDER BY check_in DESC, id DESC
                 LIMIT 1"
              ),
              rusqlite::params![person_id],
              |row| RawInterval::from_row(row, 0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawInterval::into_interval).transpose()
  }

  async fn begin_interval(&self, input: NewInterval) -> Result<Option<AttendanceInterval>> {
    let person_id    = input.person_id;
    let check_in     = stored_dt(input.check_in);
    let check_in_str = encode_dt(check_in);
    let status_str   = input.status.as_ref().to_owned();

    let id: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let open: bool = tx.query_row(
          "SELECT EXISTS(
             SELECT 1 FROM attendance WHERE user_id = ?1 AND check_out IS NULL
           )",
          rusqlite::params![person_id],
          |r| r.get(0),
        )?;
        if open {
          return Ok(None);
        }

        tx.execute(
          "INSERT INTO attendance (user_id, check_in, status) VALUES (?1, ?2, ?3)",
          rusqlite::params![person_id, check_in_str, status_str],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(Some(id))
      })
      .await?;

    Ok(id.map(|id| AttendanceInterval {
      id,
      person_id,
      check_in,
      check_out: None,
      status: input.status,
    }))
  }

  async fn close_interval(
    &self,
    person_id: i64,
    at:        DateTime<Utc>,
  ) -> Result<Option<AttendanceInterval>> {
    let at_str = encode_dt(at);

    let raw: Option<RawInterval> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let open = tx
          .query_row(
            &format!(
              "SELECT {INTERVAL_COLUMNS} FROM attendance
               WHERE user_id = ?1 AND check_out IS NULL
               ORDER BY check_in DESC
               LIMIT 1"
            ),
            rusqlite::params![person_id],
            |row| RawInterval::from_row(row, 0),
          )
          .optional()?;

        let Some(mut raw) = open else {
          return Ok(None);
        };

        tx.execute(
          "UPDATE attendance SET check_out = ?1 WHERE id = ?2",
          rusqlite::params![at_str, raw.id],
        )?;
        tx.commit()?;
        raw.check_out = Some(at_str);
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawInterval::into_interval).transpose()
  }

  async fn list_attendance(&self, query: AttendanceQuery) -> Result<Vec<AttendanceRecord>> {
    let mut conds: Vec<String> = vec![];
    let mut args: Vec<Value>   = vec![];

    if let Some(start) = query.start_date {
      args.push(Value::Text(start.format("%Y-%m-%d").to_string()));
      conds.push(format!("date(a.check_in) >= ?{}", args.len()));
    }
    if let Some(end) = query.end_date {
      args.push(Value::Text(end.format("%Y-%m-%d").to_string()));
      conds.push(format!("date(a.check_in) <= ?{}", args.len()));
    }
    if let Some(person_id) = query.person_id {
      args.push(Value::Integer(person_id));
      conds.push(format!("a.user_id = ?{}", args.len()));
    }
    if let Some(status) = query.status {
      args.push(Value::Text(status.as_ref().to_owned()));
      conds.push(format!("a.status = ?{}", args.len()));
    }

    let where_clause = if conds.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", conds.join(" AND "))
    };

    // SQLite treats a negative LIMIT as "no limit".
    self.query_records(where_clause, args, query.limit.map_or(-1, |l| l as i64)).await
  }

  // ── Audit trail ───────────────────────────────────────────────────────────

  async fn append_transaction_log(&self, input: NewTransactionLog) -> Result<TransactionLog> {
    let now        = stored_dt(Utc::now());
    let punch_time = stored_dt(input.punch_time);
    let device_sn  = input.device_sn.unwrap_or_else(|| "unknown".to_owned());

    let emp_code       = input.emp_code.clone();
    let punch_time_str = encode_dt(punch_time);
    let action_str     = input.action.map(|a| a.as_ref().to_owned());
    let status_str     = input.status.as_ref().to_owned();
    let reason         = input.reason.clone();
    let device_str     = device_sn.clone();
    let created_str    = encode_dt(now);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO transaction_logs
             (emp_code, punch_time, action, status, reason, device_sn, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            emp_code,
            punch_time_str,
            action_str,
            status_str,
            reason,
            device_str,
            created_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(TransactionLog {
      id,
      emp_code: input.emp_code,
      punch_time,
      action: input.action,
      status: input.status,
      reason: input.reason,
      device_sn,
      created_at: now,
    })
  }

  async fn list_transaction_logs(&self, limit: usize) -> Result<Vec<TransactionLog>> {
    let limit = limit as i64;

    let raws: Vec<RawLog> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOG_COLUMNS} FROM transaction_logs ORDER BY id DESC LIMIT ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![limit], RawLog::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLog::into_log).collect()
  }
}

// ─── DirectoryStore impl ─────────────────────────────────────────────────────

impl DirectoryStore for SqliteStore {
  async fn add_person(&self, input: NewPerson) -> Result<Person> {
    let created_at = stored_dt(Utc::now());

    let name           = input.name.clone();
    let email          = input.email.clone();
    let phone          = input.phone.clone();
    let role_str       = input.role.as_ref().to_owned();
    let guardian_phone = input.guardian_phone.clone();
    let badge_number   = input.badge_number.clone();
    let created_str    = encode_dt(created_at);

    let id: i64 = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users
             (name, email, phone, role, guardian_phone, badge_number, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            name,
            email,
            phone,
            role_str,
            guardian_phone,
            badge_number,
            created_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Person {
      id,
      name: input.name,
      email: input.email,
      phone: input.phone,
      role: input.role,
      guardian_phone: input.guardian_phone,
      badge_number: input.badge_number,
      created_at,
    })
  }

  async fn list_people(&self) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare(&format!("SELECT {PERSON_COLUMNS} FROM users ORDER BY name, id"))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPerson::into_person).collect()
  }

  async fn update_person(&self, id: i64, input: NewPerson) -> Result<Option<Person>> {
    let role_str = input.role.as_ref().to_owned();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET
             name = ?1, email = ?2, phone = ?3, role = ?4,
             guardian_phone = ?5, badge_number = ?6
           WHERE id = ?7",
          rusqlite::params![
            input.name,
            input.email,
            input.phone,
            role_str,
            input.guardian_phone,
            input.badge_number,
            id,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_person(id).await
  }

  async fn delete_person(&self, id: i64) -> Result<bool> {
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM users WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Search ────────────────────────────────────────────────────────────────

  async fn search_people(&self, text: String, limit: usize) -> Result<Vec<PersonMatch>> {
    let pattern = like_pattern(&text);
    let limit   = limit as i64;

    let raws: Vec<(RawPerson, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PERSON_COLUMNS},
             (SELECT COUNT(*) FROM attendance a WHERE a.user_id = u.id)
           FROM users u
           WHERE name LIKE ?1 ESCAPE '\\'
              OR email LIKE ?1 ESCAPE '\\'
              OR badge_number LIKE ?1 ESCAPE '\\'
           ORDER BY name, id
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![pattern, limit], |row| {
            Ok((RawPerson::from_row(row)?, row.get(8)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|(raw, count)| {
        Ok(PersonMatch {
          person:           raw.into_person()?,
          attendance_count: count.max(0) as u64,
        })
      })
      .collect()
  }

  async fn search_attendance(&self, text: String, limit: usize) -> Result<Vec<AttendanceRecord>> {
    let where_clause = "WHERE u.name LIKE ?1 ESCAPE '\\'
         OR a.status LIKE ?1 ESCAPE '\\'
         OR date(a.check_in) = date(?2)"
      .to_owned();
    let args = vec![Value::Text(like_pattern(&text)), Value::Text(text)];
    self.query_records(where_clause, args, limit as i64).await
  }

  // ── Device ────────────────────────────────────────────────────────────────

  async fn device_config(&self) -> Result<Option<DeviceConfig>> {
    let raw: Option<RawDeviceConfig> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT base_url, username, password FROM device_config
               ORDER BY id DESC LIMIT 1",
              [],
              |row| {
                Ok(RawDeviceConfig {
                  base_url: row.get(0)?,
                  username: row.get(1)?,
                  password: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    Ok(raw.map(DeviceConfig::from))
  }

  async fn save_device_config(&self, config: DeviceConfig) -> Result<()> {
    let at_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO device_config (base_url, username, password, updated_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![config.base_url, config.username, config.password, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
