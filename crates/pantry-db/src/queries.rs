use crate::Database;
use crate::models::{UserRow, parse_uuid};
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::Connection;

use pantry_types::models::User;

impl Database {
    // -- Users --

    /// Returns `false` when the email (or id) is already taken.
    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (id, email, password) VALUES (?1, ?2, ?3)",
                (id, email, password_hash),
            );
            match inserted {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                        || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }
}

impl UserRow {
    pub fn into_user(self) -> Result<User> {
        Ok(User {
            id: parse_uuid(&self.id)?,
            created_at: parse_timestamp(&self.created_at)?,
            email: self.email,
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    // `column` is only ever one of the literals above.
    let sql = format!("SELECT id, email, password, created_at FROM users WHERE {} = ?1", column);
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                email: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without timezone.
pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc()))
        .with_context(|| format!("Corrupt timestamp '{}'", raw))
}

/// Extension trait for optional query results
pub(crate) trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_lookup_by_email_and_id() {
        let db = Database::open_in_memory().unwrap();
        let id = uuid::Uuid::new_v4();
        db.create_user(&id.to_string(), "cook@example.com", "hash").unwrap();

        let by_email = db.get_user_by_email("cook@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, id.to_string());
        assert_eq!(by_email.password, "hash");

        let user = db.get_user_by_id(&id.to_string()).unwrap().unwrap().into_user().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.email, "cook@example.com");

        assert!(db.get_user_by_email("nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn duplicate_email_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_user(&uuid::Uuid::new_v4().to_string(), "cook@example.com", "a").unwrap());
        let second = db
            .create_user(&uuid::Uuid::new_v4().to_string(), "cook@example.com", "b")
            .unwrap();
        assert!(!second);
        assert_eq!(db.get_user_by_email("cook@example.com").unwrap().unwrap().password, "a");
    }

    #[test]
    fn parses_sqlite_timestamps() {
        let ts = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T12:30:00+00:00");
        assert!(parse_timestamp("yesterday").is_err());
    }
}
