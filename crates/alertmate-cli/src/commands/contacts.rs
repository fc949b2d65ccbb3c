use clap::Subcommand;

use alertmate_core::Config;

use super::{open_contacts, CliResult};

#[derive(Subcommand)]
pub enum ContactsAction {
    /// Save an emergency contact
    Add {
        /// Phone number
        number: String,
    },
    /// List saved contacts
    List {
        /// Output as a JSON array
        #[arg(long)]
        json: bool,
    },
    /// Delete every saved contact
    Clear,
}

pub fn run(action: ContactsAction) -> CliResult {
    let config = Config::load()?;
    let store = open_contacts(&config)?;

    match action {
        ContactsAction::Add { number } => {
            let contacts = store.save_contact(&number)?;
            println!("Contact saved ({}/{})", contacts.len(), store.max_contacts());
        }
        ContactsAction::List { json } => {
            let contacts = store.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&contacts)?);
            } else if contacts.is_empty() {
                println!("No emergency contacts saved");
            } else {
                for number in &contacts {
                    println!("{number}");
                }
            }
        }
        ContactsAction::Clear => {
            store.delete_all()?;
            println!("All contacts deleted");
        }
    }
    Ok(())
}
