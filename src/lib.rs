//! Contact intake service: the backend of a marketing site's contact form.

pub mod config;
pub mod error;
pub mod intake;
pub mod routes;
