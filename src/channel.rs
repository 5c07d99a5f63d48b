//! The host-facing method channel.
//!
//! Hosts register one channel named [`CHANNEL_NAME`] and forward every call
//! on it to the router built by [`contact_router`]. Only
//! [`GET_USER_CONTACT`] is handled; anything else answers "not implemented"
//! without touching the contacts provider.

use std::sync::Arc;

use rpc::{Reply, Responder, Router};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::service::ContactLookupService;

pub const CHANNEL_NAME: &str = "de.jessicaernst.brainbench/contacts";

pub const GET_USER_CONTACT: &str = "getUserContact";

/// Extracts the optional `email` argument.
///
/// Arguments that are not a map, or an `email` that is not a string, count
/// as no email.
pub fn email_argument(arguments: Option<&Value>) -> Option<String> {
    arguments?
        .as_object()?
        .get("email")?
        .as_str()
        .map(str::to_owned)
}

/// Runs one lookup and folds the outcome into a reply.
pub async fn get_user_contact(
    service: &ContactLookupService,
    email: Option<&str>,
) -> Reply {
    match service.get_user_contact(email).await {
        Ok(Some(contact)) => Reply::success(contact),
        Ok(None) => Reply::not_found(),
        Err(e) => {
            log::info!("Contact lookup failed: {}", e);
            e.into()
        }
    }
}

/// Builds the router for the contacts channel.
///
/// Lookups run as tasks on `runtime`, so the host thread delivering the call
/// returns immediately and gets its reply through the responder.
pub fn contact_router(
    service: Arc<ContactLookupService>,
    runtime: Handle,
) -> Router {
    Router::new().add(
        GET_USER_CONTACT,
        move |arguments: Option<Value>, responder: Responder| {
            let service = service.clone();
            let email = email_argument(arguments.as_ref());
            runtime.spawn(async move {
                let reply = get_user_contact(&service, email.as_deref()).await;
                responder.send(reply);
            });
        },
    )
}
