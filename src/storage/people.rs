//! Person repository

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::TrackerResult;
use crate::models::Person;

/// Repository for household members
pub struct PersonRepository<'c> {
    conn: &'c Connection,
}

impl<'c> PersonRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
        Ok(Person {
            id: row.get(0)?,
            name: row.get(1)?,
            date_of_birth: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    pub fn get(&self, id: i64) -> TrackerResult<Option<Person>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, date_of_birth, created_at FROM people WHERE id = ?1",
                params![id],
                Self::from_row,
            )
            .optional()?)
    }

    pub fn list(&self) -> TrackerResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, date_of_birth, created_at FROM people
             ORDER BY name COLLATE NOCASE, id",
        )?;
        let people = stmt
            .query_map([], Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(people)
    }

    pub fn insert(&self, person: &Person) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO people (name, date_of_birth, created_at) VALUES (?1, ?2, ?3)",
            params![person.name, person.date_of_birth, person.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, person: &Person) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE people SET name = ?2, date_of_birth = ?3 WHERE id = ?1",
            params![person.id, person.name, person.date_of_birth],
        )?;
        Ok(changed > 0)
    }

    /// Delete a person; allocations cascade and invoices lose the link
    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM people WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }
}
