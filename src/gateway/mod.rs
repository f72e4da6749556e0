// Equipment Query Gateway - the only door to the backend.
//
// Lookups degrade to "slot is empty" rather than propagating transport
// noise; mutating requests surface the full error taxonomy. Session
// expiry (a login redirect where JSON was expected) is always surfaced
// distinctly so it can never be misread as an empty slot.

pub mod client;
pub mod errors;

pub use client::{BackendClient, EquipmentStore, SearchOutcome};
pub use errors::GatewayError;
