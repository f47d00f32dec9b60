pub mod extractor;
pub mod prompts;
pub mod regex_fallback;
pub mod schema;
pub mod skills;
