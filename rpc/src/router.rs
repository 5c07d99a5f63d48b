use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;

/// Error code sent when a handler lets its responder go without answering.
pub const NO_REPLY: &str = "NO_REPLY";

pub const CATASTROPHIC_ERROR: &str = "{\"status\": \"error\", \"code\": \"CATASTROPHIC_ERROR\", \"message\": \"Failed to serialize reply\", \"details\": null}";

/// A single invocation delivered by the host shell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Option<Value>) -> Self {
        MethodCall {
            method: method.into(),
            arguments,
        }
    }

    /// Builds a call from the raw JSON argument payload a foreign host sends.
    ///
    /// A payload that is not valid JSON is dropped, so the handler sees the
    /// call as having no arguments at all.
    pub fn from_json_arguments(
        method: impl Into<String>,
        arguments: Option<&str>,
    ) -> Self {
        let method = method.into();
        let arguments = arguments.and_then(|raw| {
            match serde_json::from_str::<Value>(raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    log::warn!(
                        "Ignoring malformed arguments for `{}`: {}",
                        method,
                        e
                    );
                    None
                }
            }
        });
        MethodCall { method, arguments }
    }
}

/// Structured failure carried back to the host.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{code}: {message}")]
pub struct ChannelError {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// The one terminal outcome of a method call.
///
/// `Success` with a `null` result is how handlers say "nothing found"; it is
/// not an error. `NotImplemented` is reserved for unknown method names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Reply {
    Success { result: Value },
    Error(ChannelError),
    NotImplemented,
}

impl Reply {
    pub fn success(result: impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(result) => Reply::Success { result },
            Err(e) => Reply::error(
                "CATASTROPHIC_ERROR",
                "Failed to serialize reply",
                Some(e.to_string()),
            ),
        }
    }

    pub fn not_found() -> Self {
        Reply::Success {
            result: Value::Null,
        }
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Self {
        Reply::Error(ChannelError {
            code: code.into(),
            message: message.into(),
            details,
        })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or(CATASTROPHIC_ERROR.into())
    }
}

type Continuation = Box<dyn FnOnce(Reply) + Send + 'static>;

/// Single-shot reply slot handed to a handler.
pub struct Responder {
    method: String,
    continuation: Option<Continuation>,
}

impl Responder {
    pub fn new(
        method: impl Into<String>,
        continuation: impl FnOnce(Reply) + Send + 'static,
    ) -> Self {
        Responder {
            method: method.into(),
            continuation: Some(Box::new(continuation)),
        }
    }

    /// A responder whose reply is delivered through a oneshot channel.
    pub fn channel(
        method: impl Into<String>,
    ) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let responder = Responder::new(method, move |reply| {
            // The receiver may be gone if the caller stopped waiting.
            let _ = tx.send(reply);
        });
        (responder, rx)
    }

    pub fn send(mut self, reply: Reply) {
        self.complete(reply);
    }

    fn complete(&mut self, reply: Reply) {
        if let Some(continuation) = self.continuation.take() {
            continuation(reply);
        }
    }
}

impl Drop for Responder {
    fn drop(&mut self) {
        if self.continuation.is_some() {
            log::warn!("Handler for `{}` dropped its responder", self.method);
            let message =
                format!("Handler for `{}` finished without replying", self.method);
            self.complete(Reply::error(NO_REPLY, message, None));
        }
    }
}

pub trait Handler: Send + Sync {
    /// Starts handling a call. Implementations must return promptly and
    /// answer through `responder`, possibly from another task.
    fn call(&self, arguments: Option<Value>, responder: Responder);
}

impl<F> Handler for F
where
    F: Fn(Option<Value>, Responder) + Send + Sync + 'static,
{
    fn call(&self, arguments: Option<Value>, responder: Responder) {
        (self)(arguments, responder)
    }
}

#[derive(Default, Clone)]
pub struct Router {
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Router {
            routes: HashMap::new(),
        }
    }

    pub fn add(mut self, name: &str, handler: impl Handler + 'static) -> Self {
        self.routes.insert(name.to_owned(), Arc::new(handler));
        self
    }

    /// Dispatches `call` without waiting for the outcome.
    pub fn handle(&self, call: MethodCall, responder: Responder) {
        match self.routes.get(&call.method) {
            Some(handler) => handler.call(call.arguments, responder),
            None => {
                log::debug!("No handler registered for `{}`", call.method);
                responder.send(Reply::NotImplemented)
            }
        }
    }

    /// Dispatches `call` and waits for its single reply.
    pub async fn call(&self, call: MethodCall) -> Reply {
        let (responder, rx) = Responder::channel(call.method.clone());
        self.handle(call, responder);
        rx.await.unwrap_or_else(|_| {
            Reply::error(NO_REPLY, "Reply channel closed", None)
        })
    }
}
