//! Grade derivation and the enrollment-aware grade entry workflow for the
//! college records console, plus the JSON-lines sidecar that serves them.

pub mod api;
pub mod calc;
pub mod config;
pub mod entry;
pub mod ipc;
pub mod records;
