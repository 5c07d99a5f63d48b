//! JSON address books standing in for a device contact store.
//!
//! ```json
//! [
//!   {
//!     "given_name": "Ada",
//!     "family_name": "Lovelace",
//!     "emails": ["ada@x.com"],
//!     "kind": "person",
//!     "photo_path": "ada.png"
//!   }
//! ]
//! ```
//!
//! A photo is given either inline as `photo_base64` or as `photo_path`,
//! relative to the fixture file.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use base64::{engine::general_purpose, Engine};
use contact_lookup::{Contact, ContactKind};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct FixtureContact {
    #[serde(default)]
    given_name: String,
    #[serde(default)]
    family_name: String,
    #[serde(default)]
    emails: Vec<String>,
    #[serde(default = "person")]
    kind: ContactKind,
    photo_base64: Option<String>,
    photo_path: Option<String>,
}

fn person() -> ContactKind {
    ContactKind::Person
}

pub fn load(path: &Path) -> Result<Vec<Contact>> {
    let raw = fs::read_to_string(path).with_context(|| {
        format!("Failed to read address book: {}", path.display())
    })?;
    let entries: Vec<FixtureContact> = serde_json::from_str(&raw)
        .with_context(|| "Failed to parse address book")?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    entries
        .into_iter()
        .map(|entry| to_contact(entry, base))
        .collect()
}

fn to_contact(entry: FixtureContact, base: &Path) -> Result<Contact> {
    let image_data = match (entry.photo_base64, entry.photo_path) {
        (Some(encoded), _) => Some(
            general_purpose::STANDARD
                .decode(encoded.trim())
                .with_context(|| {
                    format!("Invalid photo_base64 for {}", entry.given_name)
                })?,
        ),
        (None, Some(photo)) => {
            let photo = base.join(photo);
            Some(fs::read(&photo).with_context(|| {
                format!("Failed to read photo: {}", photo.display())
            })?)
        }
        (None, None) => None,
    };

    Ok(Contact {
        given_name: entry.given_name,
        family_name: entry.family_name,
        image_data,
        email_addresses: entry.emails,
        kind: entry.kind,
        unreadable: Vec::new(),
    })
}
