//! Looks up "the user's own contact" in the device contact store on behalf of
//! a cross-platform app shell.
//!
//! The shell sends `getUserContact`, optionally with an email address. The
//! service checks contacts authorization, scans the store once, and answers
//! with the contact's display name and base64 photo, a "not found" null, or a
//! structured error. See [`channel`] for the wire surface and [`policy`] for
//! how the contact is chosen.

pub mod channel;
pub mod config;
pub mod contact;
pub mod errors;
pub mod policy;
pub mod provider;
pub mod service;

pub use channel::{contact_router, CHANNEL_NAME, GET_USER_CONTACT};
pub use config::{ConfigError, LookupConfig};
pub use contact::{
    Contact, ContactKey, ContactKind, ContactRecord, FieldError, UserContact,
};
pub use errors::{LookupError, Result};
pub use provider::{
    AccessDecision, AuthorizationStatus, ContactsProvider, EnumerationFault,
    FetchRequest, MemoryProvider, ProviderError, Visitor,
};
pub use service::ContactLookupService;
