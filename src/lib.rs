//! doeet core: a unified to-do list reconciled from a remote demo API and
//! locally persisted tasks, plus a chat assistant that answers common
//! questions from a built-in FAQ and relays the rest to an LLM backend.

pub mod chat;
pub mod error;
pub mod store;
pub mod tasks;
pub mod types;
