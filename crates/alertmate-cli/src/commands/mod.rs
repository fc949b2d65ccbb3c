pub mod alert;
pub mod config;
pub mod contacts;
pub mod history;
pub mod location;
pub mod simulate;
pub mod timer;

use alertmate_core::location::NoLocationProvider;
use alertmate_core::{Config, ContactStore, Database, ForegroundHost, GrantedPermissions};

use crate::console::{ConsolePresenter, ConsoleSender};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

pub type ConsoleHost = ForegroundHost<ConsolePresenter, ConsoleSender>;

/// Contact store on the on-disk database.
pub fn open_contacts(config: &Config) -> alertmate_core::error::Result<ContactStore> {
    Ok(ContactStore::new(Database::open()?, config.contacts.max))
}

/// A terminal has every permission a phone would ask for.
pub fn console_host(config: Config, contacts: ContactStore, sender: ConsoleSender) -> ConsoleHost {
    ForegroundHost::new(
        config,
        contacts,
        Box::new(GrantedPermissions::all()),
        ConsolePresenter,
        sender,
        true,
    )
}

/// Resumed host with the saved location fix, if any, as its last known one.
pub fn ready_host(config: Config, sender: ConsoleSender) -> Result<ConsoleHost, Box<dyn std::error::Error>> {
    let contacts = open_contacts(&config)?;
    let saved = location::load(contacts.database())?;
    let mut host = console_host(config, contacts, sender);
    host.resume(&mut NoLocationProvider, 0);
    if let Some(saved) = saved {
        host.on_location(saved.to_location(0));
    }
    Ok(host)
}
