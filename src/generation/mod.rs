pub mod gemini_client;
pub mod prompts;
