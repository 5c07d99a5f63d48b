//! UniFFI bindings for the contacts channel.
//!
//! The host app implements [`ContactStore`] on top of its platform contacts
//! API (Contacts.framework on iOS, the contacts provider on Android), builds
//! one [`ContactChannel`], and forwards every method-channel call to
//! [`ContactChannel::invoke`]. Replies come back as JSON through the
//! [`ReplyCallback`] given with each call.

mod channel;
mod store;

pub use channel::*;
pub use store::*;

uniffi::setup_scaffolding!();
