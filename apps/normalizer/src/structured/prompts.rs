// Structured extraction LLM prompt templates.
// All prompts for the structured module are defined here.

pub const RESUME_PARSE_SYSTEM: &str = "\
You are an expert resume parser that extracts structured information from resume text. \
You MUST respond with valid JSON only. No markdown fences, no explanations. \
Never invent information that is not present in the text.";

pub const RESUME_PARSE_PROMPT: &str = r#"Extract the following information from the resume text below:

1. Full Name
2. Email Address (primary)
3. Phone Number (primary)
4. Location/Address
5. Current Job Title
6. Professional Summary
7. Skills (as a list)
8. Work Experience (for each position: title, company, duration, and description)
9. Education (list of degrees/qualifications)
10. Education Details (for each institution: degree, institution name, and graduation year)
11. Certifications (as a list)
12. Languages (as a list)
13. Experience Level (Entry Level, Mid Level, Senior, or Executive)

OUTPUT SCHEMA (return exactly this structure):
{
  "name": "string",
  "email": "string",
  "phone": "string",
  "location": "string",
  "title": "string",
  "summary": "string",
  "skills": ["string"],
  "experience": [{"title": "string", "company": "string", "duration": "string", "description": "string"}],
  "education": ["string"],
  "educationDetails": [{"degree": "string", "institution": "string", "year": "string"}],
  "certifications": ["string"],
  "languages": ["string"],
  "experienceLevel": "string"
}

RULES:
1. If any information is missing, use empty strings for text fields and empty arrays for lists.
2. Copy each position's duration exactly as written (e.g. "Jan 2018 - Present").
3. Return ONLY the JSON object. No commentary, no code fences.

RESUME TEXT:
{resume_text}"#;

pub fn build_parse_prompt(resume_text: &str) -> String {
    RESUME_PARSE_PROMPT.replace("{resume_text}", resume_text)
}
