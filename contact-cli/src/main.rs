use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use contact_lookup::{
    contact_router, AccessDecision, ContactLookupService, LookupConfig,
    MemoryProvider, GET_USER_CONTACT,
};
use rpc::{MethodCall, Reply};
use serde_json::json;

mod cli;
mod fixture;

use cli::{Cli, Command, StoreArgs};

async fn run(store: &StoreArgs, call: MethodCall) -> Result<Reply> {
    let config = match &store.config {
        Some(path) => LookupConfig::load(path).with_context(|| {
            format!("Failed to load config: {}", path.display())
        })?,
        None => LookupConfig::default(),
    };

    let contacts = fixture::load(&store.contacts)?;
    log::debug!("Loaded {} contacts", contacts.len());

    let prompt_answer = if store.deny_prompt {
        AccessDecision::denied(Some("Access Denied"))
    } else {
        AccessDecision::granted()
    };
    let provider = MemoryProvider::new(contacts)
        .with_status(store.status.into())
        .answering_prompt(Ok(prompt_answer));

    let service =
        Arc::new(ContactLookupService::new(Arc::new(provider), config));
    let router = contact_router(service, tokio::runtime::Handle::current());
    Ok(router.call(call).await)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let reply = match cli.command {
        Command::Lookup { store, email } => {
            let arguments = email.map(|email| json!({ "email": email }));
            run(&store, MethodCall::new(GET_USER_CONTACT, arguments)).await?
        }
        Command::Call {
            store,
            method,
            args,
        } => {
            let call = MethodCall::from_json_arguments(method, args.as_deref());
            run(&store, call).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}
