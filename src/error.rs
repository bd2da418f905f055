use crate::address::LinkAddr;
use thiserror::Error;

/// Errors surfaced across the public API.
///
/// Per the protocol's error taxonomy, transient frame errors, buffer
/// saturation, and hop-limit drops are *not* represented here: they are
/// handled in place with a log call and an early return, never surfaced to
/// a caller. Only routing exhaustion crosses the `send()` boundary; the
/// reference error taxonomy's header-allocation failure has no counterpart
/// since the header here is built into a growable `Vec<u8>`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CollectError {
    #[error("no route to {destination}")]
    NoRoute { destination: LinkAddr },
}
