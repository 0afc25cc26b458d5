// All LLM prompt constants for the enrichment module.

/// System prompt for summarization — enforces JSON-only output.
pub const SUMMARIZE_SYSTEM: &str =
    "You are a tech-trend curator writing for indie developers and small \
    product teams. Summarize content tersely and tag it precisely. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Summarization prompt template. Replace `{title}` and `{url}` before sending.
pub const SUMMARIZE_PROMPT_TEMPLATE: &str = r#"Summarize the following piece of content for a developer review queue.

Title: {title}
URL: {url}

Return a JSON object with this EXACT schema (no extra fields):
{
  "summary": "One or two plain sentences on what this is and why a builder might care.",
  "tags": ["ai", "saas"]
}

Rules:
- "summary" must be at most two sentences, no marketing fluff.
- "tags" must only use values from this list:
  ai, vibe-code, solo, saas, startup, llm, python, javascript, rust, go, web, mobile, devtools, opensource
- Pick at most 4 tags. An empty list is fine when nothing fits.
- Judge from the title and URL alone; do not invent details.
"#;
