//! Rule-based topic matching.
//!
//! A [`KnowledgeBase`] is an ordered list of [`TopicEntry`] values. Classification lowercases the
//! visitor's text and returns the answer of the first entry with a keyword contained in it, or
//! the fallback answer when nothing matches.

use di::{inject, injectable};

/// One subject the assistant can talk about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicEntry {
    name: String,
    keywords: Vec<String>,
    answer: String,
}

impl TopicEntry {
    /// Keywords are lowercased; empty ones are dropped since they would match every input.
    pub fn new<K, S>(name: impl Into<String>, keywords: K, answer: impl Into<String>) -> Self
    where
        K: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim().to_lowercase();
            if !keyword.is_empty() && !normalized.contains(&keyword) {
                normalized.push(keyword);
            }
        }

        TopicEntry {
            name: name.into(),
            keywords: normalized,
            answer: answer.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    /// `lowered` must already be lowercase.
    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<TopicEntry>,
    fallback: String,
}

#[injectable]
impl KnowledgeBase {
    #[inject]
    pub fn create() -> KnowledgeBase {
        KnowledgeBase::portfolio()
    }
}

impl KnowledgeBase {
    pub fn new(entries: Vec<TopicEntry>, fallback: impl Into<String>) -> Self {
        KnowledgeBase {
            entries,
            fallback: fallback.into(),
        }
    }

    /// The topics shown on the portfolio site, in matching order.
    pub fn portfolio() -> Self {
        KnowledgeBase::new(
            vec![
                TopicEntry::new(
                    "education",
                    [
                        "education",
                        "degree",
                        "university",
                        "college",
                        "study",
                        "student",
                        "bscs",
                        "kiet",
                        "cgpa",
                        "semester",
                    ],
                    EDUCATION_ANSWER,
                ),
                TopicEntry::new(
                    "skills",
                    [
                        "skills",
                        "technologies",
                        "programming",
                        "languages",
                        "frontend",
                        "backend",
                        "database",
                        "tools",
                    ],
                    SKILLS_ANSWER,
                ),
                TopicEntry::new(
                    "experience",
                    [
                        "experience",
                        "work",
                        "internship",
                        "job",
                        "career",
                        "professional",
                    ],
                    EXPERIENCE_ANSWER,
                ),
                TopicEntry::new(
                    "projects",
                    [
                        "projects",
                        "portfolio",
                        "work",
                        "applications",
                        "built",
                        "developed",
                    ],
                    PROJECTS_ANSWER,
                ),
                TopicEntry::new(
                    "contact",
                    ["contact", "email", "phone", "location", "reach", "get in touch"],
                    CONTACT_ANSWER,
                ),
                TopicEntry::new(
                    "general",
                    ["hello", "hi", "hey", "who", "what", "about"],
                    GENERAL_ANSWER,
                ),
            ],
            FALLBACK_ANSWER,
        )
    }

    /// Returns the first entry (in authoring order) with a keyword occurring in `input`.
    pub fn match_topic(&self, input: &str) -> Option<&TopicEntry> {
        let lowered = input.to_lowercase();
        self.entries.iter().find(|entry| entry.matches(&lowered))
    }

    /// Maps visitor text to exactly one answer. Never fails.
    pub fn classify(&self, input: &str) -> &str {
        self.match_topic(input)
            .map(TopicEntry::answer)
            .unwrap_or(self.fallback.as_str())
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn entries(&self) -> &[TopicEntry] {
        &self.entries
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(TopicEntry::name)
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        KnowledgeBase::portfolio()
    }
}

const EDUCATION_ANSWER: &str = "Abdullah is currently pursuing a Bachelor of Science in Computer Science (BSCS) at PAF KIET, Karachi. He's in his 6th semester with a CGPA of 3.2 and has completed 81.5 credit hours. He's expected to graduate in 2026. He also completed FSc Pre-Engineering from Govt. Degree College, Malir Cantt, and Matriculation from Nishan-e-Haider Alma Mater.";

const SKILLS_ANSWER: &str = "Abdullah's technical skills include:

**Frontend:** HTML5, CSS3, JavaScript, React, Tailwind CSS, Bootstrap, Ant Design
**Backend:** C#, ASP.NET MVC, ASP.NET Core, Web API, Entity Framework
**Database:** SQL Server, MS Access, Firebase
**Tools:** Git/GitHub, Postman, VS Code, Visual Studio, OOP, REST APIs";

const EXPERIENCE_ANSWER: &str = "Abdullah has 2 months of internship experience as a Software Intern at Devsinz Intern Connect. During this time, he built CRUD modules using ASP.NET Web API and SQL Server, developed React components with reusable hooks, and collaborated using Git and code reviews.";

const PROJECTS_ANSWER: &str = "Abdullah has worked on several key projects:

1. **Job Portal with Skill Matching** - React + Tailwind + ASP.NET Web API + SQL Server
2. **Student Management System** - ASP.NET Core MVC + EF Core + SQL Server + Bootstrap
3. **Foodpanda Clone** - Next.js + React + Tailwind

You can find more details about these projects in the Projects section of his portfolio.";

const CONTACT_ANSWER: &str = "You can contact Abdullah at:
📧 Email: 15341@kiet.edu.pk
📱 Phone: +92-321-8293386
📍 Location: Karachi, Pakistan
🔗 GitHub: github.com/AbdullahRana18
💼 LinkedIn: linkedin.com/in/abdullah-rana-4326a1290";

const GENERAL_ANSWER: &str = "Hello! I'm here to help you learn about Abdullah Rana's background, education, and technical skills. Feel free to ask me about his studies, programming languages, projects, or experience!";

pub const FALLBACK_ANSWER: &str = "I can help you with information about Abdullah's education, skills, experience, projects, or contact details. Could you be more specific about what you'd like to know?";
