//! Method-channel plumbing shared by every host binding.
//!
//! A host shell delivers a [`MethodCall`] by name, the [`Router`] looks up the
//! registered [`Handler`] and hands it a [`Responder`]. The responder is the
//! only way to answer, and it answers exactly once: calling
//! [`Responder::send`] consumes it, and dropping it unanswered sends a
//! `NO_REPLY` error instead of leaving the host waiting.
mod router;

pub use router::{
    ChannelError, Handler, MethodCall, Reply, Responder, Router,
    CATASTROPHIC_ERROR, NO_REPLY,
};
