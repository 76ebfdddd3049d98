//! Diagnostic events published while translating.
//!
//! The translator never prints. It reports what happened to each unit through
//! a [`DiagnosticSink`]; the default sink forwards to `tracing`, and a channel
//! sender can be used to collect events in tests or front-ends.

use std::sync::mpsc;

use crate::translator::SkipReason;

/// Something worth reporting about one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent
{
    /// The unit produced functions.
    UnitTranslated
    {
        /// Offset of the unit within `.debug_info`.
        offset: usize,
        /// Functions the unit contributed before merging.
        functions: usize,
    },
    /// The unit was recognised as not translatable and left out.
    UnitSkipped
    {
        offset: usize,
        reason: SkipReason,
    },
    /// Decoding the unit failed; later units are still processed.
    UnitFailed
    {
        offset: usize,
        /// Rendered format error.
        error: String,
    },
}

impl DiagnosticEvent
{
    /// Human-readable description of the event.
    #[must_use]
    pub fn describe(&self) -> String
    {
        match self {
            Self::UnitTranslated { offset, functions } => {
                format!("unit at 0x{offset:x}: {functions} function(s)")
            }
            Self::UnitSkipped { offset, reason } => format!("unit at 0x{offset:x} skipped: {reason}"),
            Self::UnitFailed { offset, error } => format!("unit at 0x{offset:x} failed: {error}"),
        }
    }
}

/// Receives diagnostic events.
pub trait DiagnosticSink: Send + Sync
{
    fn emit(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing`: failures at `info`, the rest at `debug`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink
{
    fn emit(&self, event: DiagnosticEvent)
    {
        match &event {
            DiagnosticEvent::UnitFailed { offset, error } => {
                tracing::info!(unit = offset, %error, "failed to translate compilation unit");
            }
            DiagnosticEvent::UnitSkipped { offset, reason } => {
                tracing::debug!(unit = offset, %reason, "skipped compilation unit");
            }
            DiagnosticEvent::UnitTranslated { offset, functions } => {
                tracing::debug!(unit = offset, functions, "translated compilation unit");
            }
        }
    }
}

/// Events go to the channel; a disconnected receiver drops them.
impl DiagnosticSink for mpsc::Sender<DiagnosticEvent>
{
    fn emit(&self, event: DiagnosticEvent)
    {
        if let Err(err) = self.send(event) {
            tracing::trace!(event = ?err.0, "diagnostic receiver closed, event dropped");
        }
    }
}

/// Sender side of a diagnostic channel.
pub type DiagnosticSender = mpsc::Sender<DiagnosticEvent>;
/// Receiver side of a diagnostic channel.
pub type DiagnosticReceiver = mpsc::Receiver<DiagnosticEvent>;

/// Create a new diagnostic channel.
#[must_use]
pub fn diagnostic_channel() -> (DiagnosticSender, DiagnosticReceiver)
{
    mpsc::channel()
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_channel_sink_delivers_events()
    {
        let (sender, receiver) = diagnostic_channel();
        sender.emit(DiagnosticEvent::UnitFailed {
            offset: 0x40,
            error: "boom".to_string(),
        });
        let event = receiver.recv().unwrap();
        assert_eq!(event.describe(), "unit at 0x40 failed: boom");
    }

    #[test]
    fn test_disconnected_channel_is_ignored()
    {
        let (sender, receiver) = diagnostic_channel();
        drop(receiver);
        sender.emit(DiagnosticEvent::UnitTranslated { offset: 0, functions: 1 });
    }
}
