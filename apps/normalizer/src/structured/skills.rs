//! Fixed skill vocabulary and the dictionary scan over it.

use once_cell::sync::Lazy;
use regex::Regex;

pub const SKILL_VOCABULARY: &[&str] = &[
    // Programming languages
    "JavaScript", "TypeScript", "Python", "Java", "C++", "C#", "Ruby", "PHP", "Swift", "Go",
    "Rust", "Kotlin", "Scala", "Perl", "Haskell", "Lua", "R", "MATLAB", "Groovy", "Objective-C",
    // Frontend
    "React", "Angular", "Vue", "Svelte", "jQuery", "Next.js", "Gatsby", "HTML", "CSS", "SASS",
    "LESS", "Bootstrap", "Tailwind", "Material UI", "Webpack", "Babel", "ESLint",
    // Backend
    "Node.js", "Express", "Django", "Flask", "Spring", "Laravel", "ASP.NET", "Rails", "FastAPI",
    "Symfony", "NestJS", "Deno", "GraphQL", "REST API", "WebSockets", "Microservices", "gRPC",
    // Databases
    "SQL", "MySQL", "PostgreSQL", "MongoDB", "DynamoDB", "Cassandra", "Redis", "SQLite", "Oracle",
    "MariaDB", "Firebase", "Supabase", "Elasticsearch", "Neo4j", "CouchDB", "InfluxDB",
    // Cloud & DevOps
    "AWS", "Azure", "GCP", "Docker", "Kubernetes", "CI/CD", "Git", "Jenkins", "GitHub Actions",
    "Terraform", "Ansible", "Puppet", "Chef", "Prometheus", "Grafana", "ELK Stack",
    // AI & data
    "Machine Learning", "AI", "Data Science", "TensorFlow", "PyTorch", "Pandas", "NumPy",
    "Scikit-learn", "Keras", "NLTK", "Computer Vision", "NLP", "Big Data", "Data Mining",
    // Project management
    "Agile", "Scrum", "Kanban", "Jira", "Confluence", "Project Management", "Product Management",
    "Team Leadership", "Communication", "Problem Solving", "Critical Thinking",
    // Platforms
    "Linux", "Unix", "Windows", "MacOS", "Android", "iOS", "Mobile Development",
    // Testing
    "Testing", "QA", "Unit Testing", "Integration Testing", "Jest", "Mocha", "Cypress",
    "Selenium", "JUnit", "TestNG", "Pytest", "TDD", "BDD",
    // Other
    "Blockchain", "Ethereum", "Smart Contracts", "Solidity", "Web3", "IoT", "AR/VR",
    "Game Development", "Unity", "Unreal Engine",
];

/// Terms this short are matched case-sensitively, otherwise "R" or "Go"
/// would match ordinary words.
const CASE_SENSITIVE_MAX_LEN: usize = 2;

static SKILL_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SKILL_VOCABULARY
        .iter()
        .map(|skill| {
            let flags = if skill.len() <= CASE_SENSITIVE_MAX_LEN { "" } else { "(?i)" };
            // Word boundaries that also work for terms ending in `+` or `#`.
            let pattern = format!(
                r"{flags}(?:^|[^A-Za-z0-9_]){}(?:$|[^A-Za-z0-9_+#])",
                regex::escape(skill)
            );
            (*skill, Regex::new(&pattern).unwrap())
        })
        .collect()
});

static SKILLS_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:technical\s+)?skills\s*:?[ \t]*\n?((?:[^\n]+\n?)+)").unwrap()
});

/// Vocabulary terms found in `text`: those in the "Skills" section first
/// (vocabulary order), then the rest of the document. Spelled as in the
/// vocabulary, without duplicates.
pub fn find_skills(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut scan = |haystack: &str| {
        for (skill, pattern) in SKILL_PATTERNS.iter() {
            if pattern.is_match(haystack) && !found.iter().any(|s| s == skill) {
                found.push(skill.to_string());
            }
        }
    };

    if let Some(section) = SKILLS_SECTION_RE.captures(text).and_then(|c| c.get(1)) {
        scan(section.as_str());
    }
    scan(text);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_skills_come_first() {
        let text = "Worked with Docker daily.\n\nSkills: Rust, PostgreSQL\nKubernetes\n\nOther";
        assert_eq!(
            find_skills(text),
            vec!["Rust", "PostgreSQL", "Kubernetes", "Docker"]
        );
    }

    #[test]
    fn test_symbols_and_word_boundaries() {
        let skills = find_skills("C++, C# and Node.js; CI/CD pipelines");
        assert!(skills.contains(&"C++".to_string()));
        assert!(skills.contains(&"C#".to_string()));
        assert!(skills.contains(&"Node.js".to_string()));
        assert!(skills.contains(&"CI/CD".to_string()));
        // "Java" must not match inside "JavaScript".
        assert_eq!(find_skills("JavaScript"), vec!["JavaScript"]);
    }

    #[test]
    fn test_short_terms_are_case_sensitive() {
        assert!(find_skills("we go to r places").is_empty());
        assert_eq!(find_skills("Go and R"), vec!["Go", "R"]);
        assert_eq!(find_skills("kubernetes"), vec!["Kubernetes"]);
    }
}
