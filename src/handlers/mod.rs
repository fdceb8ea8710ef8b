//! Request handlers

pub mod document;

pub use document::{DocumentHandler, DocumentRequest, DocumentResponse};
