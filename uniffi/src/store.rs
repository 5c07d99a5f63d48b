//! Foreign contact store and its adapter to [`ContactsProvider`].

use std::sync::Arc;

use async_trait::async_trait;
use contact_lookup::{
    AccessDecision, AuthorizationStatus, ContactKey, ContactKind,
    ContactRecord, ContactsProvider, FetchRequest, FieldError, ProviderError,
    Visitor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum StoreAuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    Limited,
    /// A platform value the host could not map.
    Unknown { raw: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum StoreContactKind {
    Person,
    Organization,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum StoreContactKey {
    GivenName,
    FamilyName,
    ImageData,
    EmailAddresses,
    ContactType,
}

#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StoreAccessDecision {
    pub granted: bool,
    /// Platform error description delivered with the decision, if any.
    pub error: Option<String>,
}

/// One record as fetched by the host.
///
/// `None` means the property was not fetched or could not be read; the
/// record is then skipped by lookups that need it.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct StoreContact {
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub email_addresses: Option<Vec<String>>,
    /// Leave `None` unless the platform reads the contact type safely.
    pub kind: Option<StoreContactKind>,
}

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum StoreError {
    #[error("{description}")]
    Failed { description: String },
    #[error("Unexpected callback failure: {reason}")]
    Callback { reason: String },
}

impl From<uniffi::UnexpectedUniFFICallbackError> for StoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        StoreError::Callback { reason: e.reason }
    }
}

/// Platform contacts store, implemented by the host.
///
/// Methods are called from a background thread and may block. In
/// particular `request_access` should wait for the user's answer to the
/// permission prompt.
///
/// `ContactType` is requested only by the me-card fallback. Some platform
/// stores crash when the contact type is read, so a host must leave
/// [`StoreContact::kind`] as `None` whenever reading it is not known to be
/// safe. Such records are skipped by the person filter. Setting
/// `[selection] require_person_kind = false` stops the key from being
/// requested at all.
#[uniffi::export(with_foreign)]
pub trait ContactStore: Send + Sync {
    fn authorization_status(&self) -> StoreAuthorizationStatus;

    fn request_access(&self) -> Result<StoreAccessDecision, StoreError>;

    /// Returns every contact, in store order, with `keys` fetched.
    fn fetch_contacts(
        &self,
        keys: Vec<StoreContactKey>,
    ) -> Result<Vec<StoreContact>, StoreError>;
}

impl From<StoreAuthorizationStatus> for AuthorizationStatus {
    fn from(status: StoreAuthorizationStatus) -> Self {
        match status {
            StoreAuthorizationStatus::NotDetermined => {
                AuthorizationStatus::NotDetermined
            }
            StoreAuthorizationStatus::Restricted => {
                AuthorizationStatus::Restricted
            }
            StoreAuthorizationStatus::Denied => AuthorizationStatus::Denied,
            StoreAuthorizationStatus::Authorized => {
                AuthorizationStatus::Authorized
            }
            StoreAuthorizationStatus::Limited => AuthorizationStatus::Limited,
            StoreAuthorizationStatus::Unknown { raw } => {
                AuthorizationStatus::Unknown(raw)
            }
        }
    }
}

impl From<ContactKey> for StoreContactKey {
    fn from(key: ContactKey) -> Self {
        match key {
            ContactKey::GivenName => StoreContactKey::GivenName,
            ContactKey::FamilyName => StoreContactKey::FamilyName,
            ContactKey::ImageData => StoreContactKey::ImageData,
            ContactKey::EmailAddresses => StoreContactKey::EmailAddresses,
            ContactKey::ContactType => StoreContactKey::ContactType,
        }
    }
}

impl From<StoreError> for ProviderError {
    fn from(e: StoreError) -> Self {
        ProviderError::Unavailable(e.to_string())
    }
}

/// Presents a host [`ContactStore`] as a [`ContactsProvider`].
pub(crate) struct StoreProvider {
    store: Arc<dyn ContactStore>,
}

impl StoreProvider {
    pub(crate) fn new(store: Arc<dyn ContactStore>) -> Self {
        StoreProvider { store }
    }
}

#[async_trait]
impl ContactsProvider for StoreProvider {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.store.authorization_status().into()
    }

    async fn request_access(&self) -> Result<AccessDecision, ProviderError> {
        let store = self.store.clone();
        let decision =
            tokio::task::spawn_blocking(move || store.request_access())
                .await
                .map_err(|e| ProviderError::Unavailable(e.to_string()))??;
        Ok(AccessDecision {
            granted: decision.granted,
            error: decision.error,
        })
    }

    fn enumerate(
        &self,
        request: &FetchRequest,
        visit: &mut Visitor<'_>,
    ) -> Result<(), ProviderError> {
        let keys = request.keys.iter().copied().map(Into::into).collect();
        let contacts = self.store.fetch_contacts(keys)?;
        log::debug!("Host store returned {} contacts", contacts.len());

        for contact in &contacts {
            if visit(&StoreRecord(contact)).is_break() {
                break;
            }
        }
        Ok(())
    }
}

struct StoreRecord<'a>(&'a StoreContact);

fn present<T>(value: Option<T>, key: ContactKey) -> Result<T, FieldError> {
    value.ok_or(FieldError::NotFetched(key))
}

impl ContactRecord for StoreRecord<'_> {
    fn given_name(&self) -> Result<&str, FieldError> {
        present(self.0.given_name.as_deref(), ContactKey::GivenName)
    }

    fn family_name(&self) -> Result<&str, FieldError> {
        present(self.0.family_name.as_deref(), ContactKey::FamilyName)
    }

    fn image_data(&self) -> Result<Option<&[u8]>, FieldError> {
        // A missing photo is an ordinary absence, not a read failure.
        Ok(self.0.image_data.as_deref())
    }

    fn email_addresses(&self) -> Result<&[String], FieldError> {
        present(
            self.0.email_addresses.as_deref(),
            ContactKey::EmailAddresses,
        )
    }

    fn kind(&self) -> Result<ContactKind, FieldError> {
        match present(self.0.kind, ContactKey::ContactType)? {
            StoreContactKind::Person => Ok(ContactKind::Person),
            StoreContactKind::Organization => Ok(ContactKind::Organization),
        }
    }
}
