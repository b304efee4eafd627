//! Commit sink collaborator
//!
//! Receives each committed fragment. A sink either finishes immediately or
//! hands back a future that the orchestrator keeps in flight.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use crate::models::Fragment;

/// Failure reported by a commit sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SinkError(pub String);

impl SinkError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type PendingDelivery = Pin<Box<dyn Future<Output = Result<(), SinkError>>>>;

/// Outcome of handing a fragment to a sink
pub enum Delivery {
    Done(Result<(), SinkError>),
    Pending(PendingDelivery),
}

impl Delivery {
    pub fn ok() -> Self {
        Delivery::Done(Ok(()))
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Delivery::Done(Err(SinkError::new(message)))
    }

    pub fn pending(future: impl Future<Output = Result<(), SinkError>> + 'static) -> Self {
        Delivery::Pending(Box::pin(future))
    }
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Delivery::Done(result) => f.debug_tuple("Done").field(result).finish(),
            Delivery::Pending(_) => f.write_str("Pending"),
        }
    }
}

/// Destination for committed fragments
pub trait CommitSink {
    fn deliver(&mut self, fragment: Fragment) -> Delivery;
}

/// Any `FnMut(Fragment) -> Delivery` closure is a sink
impl<F> CommitSink for F
where
    F: FnMut(Fragment) -> Delivery,
{
    fn deliver(&mut self, fragment: Fragment) -> Delivery {
        self(fragment)
    }
}
