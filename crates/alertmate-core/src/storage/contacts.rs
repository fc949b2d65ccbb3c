//! Emergency contact persistence.
//!
//! Contacts live in one kv record: namespace `emergency_contacts`, key
//! `contacts`, value a JSON array of phone-number strings. The collection is a
//! set with a fixed capacity; rejected saves leave the record untouched.

use std::collections::BTreeSet;

use super::Database;
use crate::error::{ContactError, Result};

pub const CONTACTS_NAMESPACE: &str = "emergency_contacts";
pub const CONTACTS_KEY: &str = "contacts";
pub const DEFAULT_MAX_CONTACTS: usize = 5;

pub struct ContactStore {
    db: Database,
    max_contacts: usize,
}

impl ContactStore {
    pub fn new(db: Database, max_contacts: usize) -> Self {
        Self { db, max_contacts }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn max_contacts(&self) -> usize {
        self.max_contacts
    }

    /// All saved numbers. A missing record reads as the empty set.
    pub fn load(&self) -> Result<BTreeSet<String>> {
        match self.db.kv_get(CONTACTS_NAMESPACE, CONTACTS_KEY)? {
            Some(json) => {
                let numbers: Vec<String> = serde_json::from_str(&json)?;
                Ok(numbers.into_iter().collect())
            }
            None => Ok(BTreeSet::new()),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.load()?.is_empty())
    }

    /// Add one number.
    ///
    /// # Errors
    /// `InvalidNumber` for blank input, `Duplicate` if already saved,
    /// `LimitReached` when the store is full.
    pub fn save_contact(&self, number: &str) -> Result<BTreeSet<String>> {
        let number = number.trim();
        if number.is_empty() {
            return Err(ContactError::InvalidNumber(number.to_string()).into());
        }

        let mut contacts = self.load()?;
        if contacts.contains(number) {
            return Err(ContactError::Duplicate(number.to_string()).into());
        }
        if contacts.len() >= self.max_contacts {
            return Err(ContactError::LimitReached {
                max: self.max_contacts,
            }
            .into());
        }

        contacts.insert(number.to_string());
        self.write(&contacts)?;
        tracing::info!(count = contacts.len(), "contact saved");
        Ok(contacts)
    }

    pub fn delete_all(&self) -> Result<()> {
        self.db.kv_remove(CONTACTS_NAMESPACE, CONTACTS_KEY)?;
        tracing::info!("all contacts deleted");
        Ok(())
    }

    fn write(&self, contacts: &BTreeSet<String>) -> Result<()> {
        let numbers: Vec<&String> = contacts.iter().collect();
        let json = serde_json::to_string(&numbers)?;
        self.db.kv_set(CONTACTS_NAMESPACE, CONTACTS_KEY, &json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn store() -> ContactStore {
        ContactStore::new(Database::open_memory().unwrap(), DEFAULT_MAX_CONTACTS)
    }

    #[test]
    fn empty_by_default() {
        assert!(store().load().unwrap().is_empty());
    }

    #[test]
    fn stored_as_json_array() {
        let store = store();
        store.save_contact("+15551234567").unwrap();
        let raw = store
            .database()
            .kv_get(CONTACTS_NAMESPACE, CONTACTS_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(raw, r#"["+15551234567"]"#);
    }

    #[test]
    fn reads_records_written_elsewhere() {
        let store = store();
        store
            .database()
            .kv_set(CONTACTS_NAMESPACE, CONTACTS_KEY, r#"["+1","+2","+1"]"#)
            .unwrap();
        assert_eq!(store.load().unwrap().len(), 2);
    }

    #[test]
    fn rejects_blank_number() {
        let err = store().save_contact("   ").unwrap_err();
        assert!(matches!(err, CoreError::Contact(ContactError::InvalidNumber(_))));
    }

    #[test]
    fn trims_whitespace() {
        let store = store();
        store.save_contact("  +15550000001 ").unwrap();
        let err = store.save_contact("+15550000001").unwrap_err();
        assert!(matches!(err, CoreError::Contact(ContactError::Duplicate(_))));
    }

    #[test]
    fn corrupt_record_is_an_error() {
        let store = store();
        store
            .database()
            .kv_set(CONTACTS_NAMESPACE, CONTACTS_KEY, "not json")
            .unwrap();
        assert!(matches!(store.load(), Err(CoreError::Json(_))));
    }
}
