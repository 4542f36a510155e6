//! Command handlers
//!
//! Each handler is a method on [`Module`](crate::Module). Handlers that
//! stream data frames send them through an [`Outbox`]; the final status
//! frame is always sent by the dispatcher.

mod display;
mod fs;

use modlink_protocol::{Reply, ReplySink};

use crate::error::CommandError;

/// Reply sink wrapper that keeps the transport error
///
/// Handlers see a failed send as [`CommandError::Transport`] and unwind;
/// the dispatcher then returns the original error instead of a status.
pub(crate) struct Outbox<'o, T: ReplySink> {
    sink: &'o mut T,
    error: Option<T::Error>,
}

impl<'o, T: ReplySink> Outbox<'o, T> {
    pub(crate) fn new(sink: &'o mut T) -> Self {
        Self { sink, error: None }
    }

    /// Send one intermediate frame
    pub(crate) async fn send(&mut self, reply: &Reply) -> Result<(), CommandError> {
        if self.error.is_some() {
            return Err(CommandError::Transport);
        }
        match self.sink.send(reply).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.error = Some(e);
                Err(CommandError::Transport)
            }
        }
    }

    /// Give the sink back, or the error that broke it
    pub(crate) fn finish(self) -> Result<&'o mut T, T::Error> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.sink),
        }
    }
}
