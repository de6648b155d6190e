// Resume submission: form intake, the upload → convert → upload → analyze
// workflow, per-submission progress tracking, and the HTTP handlers.
// All AI calls go through llm_client, never the Anthropic API directly.

pub mod form;
pub mod handlers;
pub mod prompts;
pub mod record;
pub mod tracker;
pub mod workflow;
