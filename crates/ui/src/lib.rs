#![deny(unsafe_code)]

/// Chat conversation model, events and the view-model.
pub mod chat;
/// Console demo host.
pub mod console;
pub mod history;
pub mod host;
pub mod scheduler;
pub mod session;
/// Settings persistence.
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;
