//! Embedded static HTML served by the web UI.

pub mod index;
