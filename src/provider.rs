use std::{
    ops::ControlFlow,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;

use crate::contact::{
    Contact, ContactKey, ContactKind, ContactRecord, FieldError,
};

/// Authorization state reported by the contacts provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    Authorized,
    /// The user granted access to a subset of their contacts.
    Limited,
    /// A state this crate does not know about, with the raw platform value.
    Unknown(i64),
}

impl AuthorizationStatus {
    pub fn is_granted(self) -> bool {
        matches!(
            self,
            AuthorizationStatus::Authorized | AuthorizationStatus::Limited
        )
    }
}

/// Outcome of an access request, as delivered by the platform callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessDecision {
    pub granted: bool,
    pub error: Option<String>,
}

impl AccessDecision {
    pub fn granted() -> Self {
        AccessDecision {
            granted: true,
            error: None,
        }
    }

    pub fn denied(error: Option<&str>) -> Self {
        AccessDecision {
            granted: false,
            error: error.map(str::to_owned),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("{0}")]
    Unavailable(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Properties requested from the provider for one scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub keys: Vec<ContactKey>,
}

impl FetchRequest {
    pub fn new(keys: &[ContactKey]) -> Self {
        FetchRequest {
            keys: keys.to_vec(),
        }
    }

    pub fn contains(&self, key: ContactKey) -> bool {
        self.keys.contains(&key)
    }
}

/// Callback invoked once per record; return `Break` to stop the scan.
pub type Visitor<'a> = dyn FnMut(&dyn ContactRecord) -> ControlFlow<()> + 'a;

/// The operating system's permissioned contact directory.
#[async_trait]
pub trait ContactsProvider: Send + Sync {
    /// Current authorization state. Queried on every lookup, never cached.
    fn authorization_status(&self) -> AuthorizationStatus;

    /// Asks the user for access. Platforms show at most one prompt and
    /// remember the answer; later calls resolve immediately.
    async fn request_access(&self) -> Result<AccessDecision, ProviderError>;

    /// Walks records in provider order, handing each to `visit` with only
    /// the properties in `request` readable. Blocking.
    fn enumerate(
        &self,
        request: &FetchRequest,
        visit: &mut Visitor<'_>,
    ) -> Result<(), ProviderError>;
}

/// Fault injected into [`MemoryProvider::enumerate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EnumerationFault {
    /// Fail with the given description after visiting `n` records.
    ErrorAfter(usize, String),
    /// Panic after visiting `n` records.
    PanicAfter(usize),
}

/// In-process provider backed by a list of [`Contact`]s.
///
/// Behaves like a platform store: the prompt is shown only while the status
/// is `NotDetermined`, and its answer becomes the new status.
pub struct MemoryProvider {
    contacts: Vec<Contact>,
    status: Mutex<AuthorizationStatus>,
    prompt_answer: Result<AccessDecision, String>,
    fault: Option<EnumerationFault>,
    prompts: AtomicUsize,
    enumerations: AtomicUsize,
    visited: AtomicUsize,
}

impl MemoryProvider {
    pub fn new(contacts: Vec<Contact>) -> Self {
        MemoryProvider {
            contacts,
            status: Mutex::new(AuthorizationStatus::Authorized),
            prompt_answer: Ok(AccessDecision::granted()),
            fault: None,
            prompts: AtomicUsize::new(0),
            enumerations: AtomicUsize::new(0),
            visited: AtomicUsize::new(0),
        }
    }

    pub fn with_status(self, status: AuthorizationStatus) -> Self {
        MemoryProvider {
            status: Mutex::new(status),
            ..self
        }
    }

    /// Answer given when the user is prompted; `Err` simulates the request
    /// itself failing.
    pub fn answering_prompt(
        self,
        answer: Result<AccessDecision, String>,
    ) -> Self {
        MemoryProvider {
            prompt_answer: answer,
            ..self
        }
    }

    pub fn with_fault(self, fault: EnumerationFault) -> Self {
        MemoryProvider {
            fault: Some(fault),
            ..self
        }
    }

    /// Number of times the user was prompted.
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    pub fn enumerations(&self) -> usize {
        self.enumerations.load(Ordering::SeqCst)
    }

    /// Records handed to visitors across all scans.
    pub fn visited(&self) -> usize {
        self.visited.load(Ordering::SeqCst)
    }

    fn status(&self) -> AuthorizationStatus {
        *self.status.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_status(&self, status: AuthorizationStatus) {
        *self.status.lock().unwrap_or_else(|e| e.into_inner()) = status;
    }
}

#[async_trait]
impl ContactsProvider for MemoryProvider {
    fn authorization_status(&self) -> AuthorizationStatus {
        self.status()
    }

    async fn request_access(&self) -> Result<AccessDecision, ProviderError> {
        let status = self.status();
        if status != AuthorizationStatus::NotDetermined {
            return Ok(AccessDecision {
                granted: status.is_granted(),
                error: None,
            });
        }

        self.prompts.fetch_add(1, Ordering::SeqCst);
        let decision = self
            .prompt_answer
            .clone()
            .map_err(ProviderError::Unavailable)?;
        self.set_status(if decision.granted {
            AuthorizationStatus::Authorized
        } else {
            AuthorizationStatus::Denied
        });
        Ok(decision)
    }

    fn enumerate(
        &self,
        request: &FetchRequest,
        visit: &mut Visitor<'_>,
    ) -> Result<(), ProviderError> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);

        for (position, contact) in self.contacts.iter().enumerate() {
            match &self.fault {
                Some(EnumerationFault::ErrorAfter(n, description))
                    if *n == position =>
                {
                    return Err(ProviderError::Unavailable(
                        description.clone(),
                    ));
                }
                Some(EnumerationFault::PanicAfter(n)) if *n == position => {
                    panic!("contact store crashed at record {}", position);
                }
                _ => {}
            }

            self.visited.fetch_add(1, Ordering::SeqCst);
            let projected = Projected { contact, request };
            if visit(&projected).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// A contact as seen through a fetch request: properties outside the request
/// are not readable.
struct Projected<'a> {
    contact: &'a Contact,
    request: &'a FetchRequest,
}

impl Projected<'_> {
    fn fetched(&self, key: ContactKey) -> Result<(), FieldError> {
        if self.request.contains(key) {
            Ok(())
        } else {
            Err(FieldError::NotFetched(key))
        }
    }
}

impl ContactRecord for Projected<'_> {
    fn given_name(&self) -> Result<&str, FieldError> {
        self.fetched(ContactKey::GivenName)?;
        self.contact.given_name()
    }

    fn family_name(&self) -> Result<&str, FieldError> {
        self.fetched(ContactKey::FamilyName)?;
        self.contact.family_name()
    }

    fn image_data(&self) -> Result<Option<&[u8]>, FieldError> {
        self.fetched(ContactKey::ImageData)?;
        self.contact.image_data()
    }

    fn email_addresses(&self) -> Result<&[String], FieldError> {
        self.fetched(ContactKey::EmailAddresses)?;
        self.contact.email_addresses()
    }

    fn kind(&self) -> Result<ContactKind, FieldError> {
        self.fetched(ContactKey::ContactType)?;
        self.contact.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(provider: &MemoryProvider, request: &FetchRequest) -> Vec<String> {
        let mut seen = Vec::new();
        provider
            .enumerate(request, &mut |record: &dyn ContactRecord| {
                seen.push(record.given_name().unwrap_or("?").to_owned());
                ControlFlow::Continue(())
            })
            .unwrap();
        seen
    }

    #[test]
    fn unfetched_properties_are_not_readable() {
        let provider = MemoryProvider::new(vec![
            Contact::person("Ada", "Lovelace").with_email("ada@x.com")
        ]);
        let request = FetchRequest::new(&[ContactKey::GivenName]);
        provider
            .enumerate(&request, &mut |record: &dyn ContactRecord| {
                assert_eq!(record.given_name(), Ok("Ada"));
                assert_eq!(
                    record.email_addresses(),
                    Err(FieldError::NotFetched(ContactKey::EmailAddresses))
                );
                ControlFlow::Continue(())
            })
            .unwrap();
    }

    #[test]
    fn visits_in_insertion_order() {
        let provider = MemoryProvider::new(vec![
            Contact::person("A", ""),
            Contact::person("B", ""),
            Contact::person("C", ""),
        ]);
        let request = FetchRequest::new(&[ContactKey::GivenName]);
        assert_eq!(names(&provider, &request), vec!["A", "B", "C"]);
    }

    #[test]
    fn break_stops_the_walk() {
        let provider = MemoryProvider::new(vec![
            Contact::person("A", ""),
            Contact::person("B", ""),
        ]);
        let request = FetchRequest::new(&[ContactKey::GivenName]);
        provider
            .enumerate(&request, &mut |_: &dyn ContactRecord| {
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(provider.visited(), 1);
    }

    #[test]
    fn injected_error_aborts_enumeration() {
        let provider = MemoryProvider::new(vec![
            Contact::person("A", ""),
            Contact::person("B", ""),
        ])
        .with_fault(EnumerationFault::ErrorAfter(1, "store went away".into()));
        let request = FetchRequest::new(&[ContactKey::GivenName]);
        let result = provider.enumerate(&request, &mut |_: &dyn ContactRecord| {
            ControlFlow::Continue(())
        });
        assert!(matches!(result, Err(ProviderError::Unavailable(d)) if d == "store went away"));
        assert_eq!(provider.visited(), 1);
    }

    #[tokio::test]
    async fn prompt_is_shown_once_and_remembered() {
        let provider = MemoryProvider::new(vec![])
            .with_status(AuthorizationStatus::NotDetermined)
            .answering_prompt(Ok(AccessDecision::denied(Some("Access Denied"))));

        let first = provider.request_access().await.unwrap();
        assert_eq!(first, AccessDecision::denied(Some("Access Denied")));
        assert_eq!(provider.authorization_status(), AuthorizationStatus::Denied);

        let second = provider.request_access().await.unwrap();
        assert_eq!(second, AccessDecision::denied(None));
        assert_eq!(provider.prompts(), 1);
    }
}
