//! LLM access
//!
//! The planner only needs "prompt in, text out". [`LlmClient`] is that seam;
//! [`gemini::GeminiClient`] implements it over the Gemini REST API and tests
//! substitute their own implementations.

use async_trait::async_trait;

use crate::Result;

pub mod gemini;

pub use gemini::GeminiClient;

/// A text-generation backend
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Name of the model answering the prompts
    fn model(&self) -> &str;

    /// Send one prompt and return the model's full text answer
    ///
    /// Transport failures map to `ServiceUnavailable`, exceeded deadlines to
    /// `Timeout`, unusable answers to `MalformedResponse`.
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Locate the JSON object inside a model answer
///
/// Models like to wrap JSON in markdown fences or add a sentence around it,
/// so this returns the slice from the first `{` to the last `}`.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#"{"summary":"ok"}"#, Some(r#"{"summary":"ok"}"#))]
    #[case("```json\n{\"summary\":\"ok\"}\n```", Some(r#"{"summary":"ok"}"#))]
    #[case("Here you go: {\"a\":{\"b\":1}} Enjoy!", Some(r#"{"a":{"b":1}}"#))]
    #[case("no json here", None)]
    #[case("} backwards {", None)]
    fn test_extract_json(#[case] text: &str, #[case] expected: Option<&str>) {
        assert_eq!(extract_json(text), expected);
    }
}
