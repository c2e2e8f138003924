//! Person service
//!
//! Household members that medical expenses and invoices can be attributed to.

use chrono::Utc;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Person, PersonInput};
use crate::storage::{PersonRepository, Storage};

/// Service for household members
pub struct PersonService<'a> {
    storage: &'a Storage,
}

impl<'a> PersonService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: PersonInput) -> TrackerResult<Person> {
        let name = validate_name(&input.name)?;
        let conn = self.storage.connection()?;
        let repo = PersonRepository::new(&conn);

        let mut person = Person {
            id: 0,
            name,
            date_of_birth: input.date_of_birth,
            created_at: Utc::now(),
        };
        person.id = repo.insert(&person)?;

        tracing::info!(id = person.id, name = %person.name, "Created person");
        Ok(person)
    }

    pub fn get(&self, id: i64) -> TrackerResult<Person> {
        let conn = self.storage.connection()?;
        PersonRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::person_not_found(id))
    }

    pub fn list(&self) -> TrackerResult<Vec<Person>> {
        let conn = self.storage.connection()?;
        PersonRepository::new(&conn).list()
    }

    pub fn update(&self, id: i64, input: PersonInput) -> TrackerResult<Person> {
        let name = validate_name(&input.name)?;
        let conn = self.storage.connection()?;
        let repo = PersonRepository::new(&conn);

        let mut person = repo
            .get(id)?
            .ok_or_else(|| TrackerError::person_not_found(id))?;
        person.name = name;
        person.date_of_birth = input.date_of_birth;
        repo.update(&person)?;

        tracing::info!(id, "Updated person");
        Ok(person)
    }

    /// Delete a person; their allocations go with them
    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !PersonRepository::new(&conn).delete(id)? {
            return Err(TrackerError::person_not_found(id));
        }
        tracing::info!(id, "Deleted person");
        Ok(())
    }
}

fn validate_name(name: &str) -> TrackerResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Name is required".into()));
    }
    if name.chars().count() > 100 {
        return Err(TrackerError::Validation(
            "Name must be 100 characters or fewer".into(),
        ));
    }
    Ok(name.to_string())
}
