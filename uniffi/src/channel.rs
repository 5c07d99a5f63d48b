use std::sync::Arc;

use contact_lookup::{
    contact_router, ContactLookupService, LookupConfig, CHANNEL_NAME,
};
use rpc::{MethodCall, Reply, Responder, Router};

use crate::store::{ContactStore, StoreProvider};

/// Receives the JSON reply of one [`ContactChannel::invoke`] call.
///
/// Called exactly once per invocation, from a background thread.
#[uniffi::export(with_foreign)]
pub trait ReplyCallback: Send + Sync {
    fn on_reply(&self, reply: String);
}

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum ChannelSetupError {
    #[error("Invalid configuration: {message}")]
    Config { message: String },
    #[error("Couldn't start runtime: {message}")]
    Runtime { message: String },
}

/// Handle to the contacts method channel.
///
/// Owns a dedicated Tokio runtime that drives lookups; keep the channel alive
/// for as long as the host channel is registered.
#[derive(uniffi::Object)]
pub struct ContactChannel {
    router: Router,
    _runtime: tokio::runtime::Runtime,
}

#[uniffi::export]
impl ContactChannel {
    /// Creates the channel over `store`, configured by an optional TOML
    /// document (see `LookupConfig`).
    #[uniffi::constructor]
    pub fn new(
        store: Arc<dyn ContactStore>,
        config_toml: Option<String>,
    ) -> Result<Arc<Self>, ChannelSetupError> {
        let config = match config_toml {
            Some(raw) => LookupConfig::from_toml_str(&raw).map_err(|e| {
                ChannelSetupError::Config {
                    message: e.to_string(),
                }
            })?,
            None => LookupConfig::default(),
        };
        init_logging(&config.logging.level);

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.runtime.worker_threads.max(1))
            .thread_name("contact-lookup")
            .enable_all()
            .build()
            .map_err(|e| ChannelSetupError::Runtime {
                message: e.to_string(),
            })?;

        let provider = Arc::new(StoreProvider::new(store));
        let service = Arc::new(ContactLookupService::new(provider, config));
        let router = contact_router(service, runtime.handle().clone());
        log::info!("Contacts channel `{}` ready", CHANNEL_NAME);

        Ok(Arc::new(ContactChannel {
            router,
            _runtime: runtime,
        }))
    }

    /// Name the host should register its method channel under.
    pub fn channel_name(&self) -> String {
        CHANNEL_NAME.to_owned()
    }

    /// Dispatches one method call and returns immediately.
    ///
    /// `arguments` is the JSON-encoded argument map, if any. The reply is a
    /// JSON object tagged by `status`: `success` (with `result`, null when
    /// nothing matched), `error` (with `code`, `message`, `details`) or
    /// `not_implemented`.
    pub fn invoke(
        &self,
        method: String,
        arguments: Option<String>,
        callback: Arc<dyn ReplyCallback>,
    ) {
        let call = MethodCall::from_json_arguments(method, arguments.as_deref());
        let responder = Responder::new(call.method.clone(), move |reply: Reply| {
            callback.on_reply(reply.to_json())
        });
        self.router.handle(call, responder);
    }
}

fn init_logging(level: &str) {
    // A second channel, or a host that installed its own logger, is fine.
    let _ = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(level),
    )
    .try_init();
}
