use std::fmt;

use base64::{engine::general_purpose, Engine};
use serde::{Deserialize, Serialize};

/// Contact properties the lookup can ask a provider to fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKey {
    GivenName,
    FamilyName,
    ImageData,
    EmailAddresses,
    ContactType,
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContactKey::GivenName => "givenName",
            ContactKey::FamilyName => "familyName",
            ContactKey::ImageData => "imageData",
            ContactKey::EmailAddresses => "emailAddresses",
            ContactKey::ContactType => "contactType",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Person,
    Organization,
}

/// Failure to read a single property of a single record.
///
/// These never abort a scan; the record is skipped instead.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("property `{0}` was not fetched")]
    NotFetched(ContactKey),
    #[error("property `{field}` could not be read: {reason}")]
    Unreadable { field: ContactKey, reason: String },
}

/// Read-only view of a record owned by the contacts provider.
///
/// Every accessor is fallible: some platforms refuse to hand out properties
/// that were not part of the fetch, and some properties are known to fail on
/// particular OS versions.
pub trait ContactRecord {
    fn given_name(&self) -> Result<&str, FieldError>;

    fn family_name(&self) -> Result<&str, FieldError>;

    fn image_data(&self) -> Result<Option<&[u8]>, FieldError>;

    fn email_addresses(&self) -> Result<&[String], FieldError>;

    fn kind(&self) -> Result<ContactKind, FieldError>;
}

/// Plain in-memory contact, used by [`crate::MemoryProvider`] and fixtures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contact {
    pub given_name: String,
    pub family_name: String,
    pub image_data: Option<Vec<u8>>,
    pub email_addresses: Vec<String>,
    pub kind: ContactKind,
    /// Properties that fail when read, mimicking unstable platform fields.
    pub unreadable: Vec<ContactKey>,
}

impl Contact {
    pub fn person(given_name: &str, family_name: &str) -> Self {
        Contact {
            given_name: given_name.to_owned(),
            family_name: family_name.to_owned(),
            image_data: None,
            email_addresses: Vec::new(),
            kind: ContactKind::Person,
            unreadable: Vec::new(),
        }
    }

    pub fn organization(name: &str) -> Self {
        Contact {
            kind: ContactKind::Organization,
            ..Contact::person(name, "")
        }
    }

    pub fn with_email(mut self, email: &str) -> Self {
        self.email_addresses.push(email.to_owned());
        self
    }

    pub fn with_image(mut self, data: &[u8]) -> Self {
        self.image_data = Some(data.to_vec());
        self
    }

    pub fn with_unreadable(mut self, key: ContactKey) -> Self {
        self.unreadable.push(key);
        self
    }

    fn check(&self, key: ContactKey) -> Result<(), FieldError> {
        if self.unreadable.contains(&key) {
            return Err(FieldError::Unreadable {
                field: key,
                reason: "property unavailable on this record".to_owned(),
            });
        }
        Ok(())
    }
}

impl ContactRecord for Contact {
    fn given_name(&self) -> Result<&str, FieldError> {
        self.check(ContactKey::GivenName)?;
        Ok(&self.given_name)
    }

    fn family_name(&self) -> Result<&str, FieldError> {
        self.check(ContactKey::FamilyName)?;
        Ok(&self.family_name)
    }

    fn image_data(&self) -> Result<Option<&[u8]>, FieldError> {
        self.check(ContactKey::ImageData)?;
        Ok(self.image_data.as_deref())
    }

    fn email_addresses(&self) -> Result<&[String], FieldError> {
        self.check(ContactKey::EmailAddresses)?;
        Ok(&self.email_addresses)
    }

    fn kind(&self) -> Result<ContactKind, FieldError> {
        self.check(ContactKey::ContactType)?;
        Ok(self.kind)
    }
}

/// The projection returned to the host for a matched contact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserContact {
    /// Given and family name joined by one space, even if either is empty.
    pub name: String,
    /// Standard base64 of the photo bytes, empty when there is no photo.
    pub image_base64: String,
}

impl UserContact {
    pub fn from_record(record: &dyn ContactRecord) -> Result<Self, FieldError> {
        let image = record.image_data()?;
        Self::from_parts(record, image)
    }

    /// Like [`UserContact::from_record`], but a photo that cannot be read
    /// yields an empty image instead of an error.
    pub fn from_record_lossy_image(
        record: &dyn ContactRecord,
    ) -> Result<Self, FieldError> {
        let image = record.image_data().unwrap_or_else(|e| {
            log::warn!("Dropping unreadable photo: {}", e);
            None
        });
        Self::from_parts(record, image)
    }

    fn from_parts(
        record: &dyn ContactRecord,
        image: Option<&[u8]>,
    ) -> Result<Self, FieldError> {
        let name = format!("{} {}", record.given_name()?, record.family_name()?);
        let image_base64 = image
            .map(|data| general_purpose::STANDARD.encode(data))
            .unwrap_or_default();
        Ok(UserContact { name, image_base64 })
    }

    pub fn decode_image(&self) -> Result<Vec<u8>, base64::DecodeError> {
        general_purpose::STANDARD.decode(&self.image_base64)
    }
}
