//! General utility code that didn't fit anywhere else
// (c) 2024 Ross Younger

mod address_family;
pub use address_family::AddressFamily;

mod dns;
pub use dns::lookup_host_by_family;

pub mod socket;
pub(crate) mod time;

mod tracing;
pub use tracing::setup as setup_tracing;
#[cfg(test)]
pub(crate) use tracing::setup_tracing_for_tests;
