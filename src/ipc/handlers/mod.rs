pub mod core;
pub mod entry;
pub mod grades;
pub mod requests;
pub mod transcript;
