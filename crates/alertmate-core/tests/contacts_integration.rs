//! Contact store persistence against an on-disk database.

use alertmate_core::error::ContactError;
use alertmate_core::storage::{CONTACTS_KEY, CONTACTS_NAMESPACE};
use alertmate_core::{ContactStore, CoreError, Database};
use tempfile::TempDir;

fn store_in(dir: &TempDir) -> ContactStore {
    let db = Database::open_at(&dir.path().join("alertmate.db")).unwrap();
    ContactStore::new(db, 5)
}

#[test]
fn contacts_survive_reopen() {
    let dir = TempDir::new().unwrap();
    {
        let store = store_in(&dir);
        store.save_contact("+15551234567").unwrap();
        store.save_contact("  +15557654321 ").unwrap();
    }

    let store = store_in(&dir);
    let contacts = store.load().unwrap();
    assert_eq!(contacts.len(), 2);
    assert!(contacts.contains("+15557654321"));
}

#[test]
fn sixth_contact_is_rejected_and_store_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    for i in 0..5 {
        store.save_contact(&format!("+1555000000{i}")).unwrap();
    }

    let err = store.save_contact("+15559999999").unwrap_err();
    assert!(matches!(
        err,
        CoreError::Contact(ContactError::LimitReached { max: 5 })
    ));
    assert_eq!(store.load().unwrap().len(), 5);
    assert!(!store.load().unwrap().contains("+15559999999"));
}

#[test]
fn duplicate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save_contact("+15551234567").unwrap();

    let err = store.save_contact("+15551234567").unwrap_err();
    assert!(matches!(err, CoreError::Contact(ContactError::Duplicate(_))));
    assert_eq!(store.load().unwrap().len(), 1);
}

#[test]
fn delete_all_leaves_empty_set() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save_contact("+15551234567").unwrap();
    store.delete_all().unwrap();

    assert!(store.is_empty().unwrap());
    assert!(store
        .database()
        .kv_get(CONTACTS_NAMESPACE, CONTACTS_KEY)
        .unwrap()
        .is_none());
}

#[test]
fn record_is_a_json_array_of_strings() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);
    store.save_contact("+15557654321").unwrap();
    store.save_contact("+15551234567").unwrap();

    let raw = store
        .database()
        .kv_get(CONTACTS_NAMESPACE, CONTACTS_KEY)
        .unwrap()
        .unwrap();
    let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed.len(), 2);
}
