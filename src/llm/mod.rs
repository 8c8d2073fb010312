//! LLM access for the judge.
//!
//! ```ignore
//! use longchain_judge::llm::{ChatCompletionsClient, GenerationRequest, LlmProvider, Message};
//!
//! let client = ChatCompletionsClient::from_config(&config)?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello")]);
//! let response = client.generate(request).await?;
//! ```

pub mod client;

pub use client::{
    ChatCompletionsClient, Choice, GenerationRequest, GenerationResponse, LlmProvider, Message,
    Usage,
};
