//! Backend wire format types
//!
//! One module per wire dialect. These mirror what actually travels over
//! the network; conversion to and from domain types lives in
//! [`crate::convert`].

pub mod anthropic;
pub mod ollama;
pub mod openai;
