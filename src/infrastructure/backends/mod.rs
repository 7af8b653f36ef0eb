//! Generation backend adapters

pub mod openai_responses;

pub use openai_responses::{OpenAiResponsesBackend, OpenAiResponsesFactory};
