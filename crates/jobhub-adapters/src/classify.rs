//! Keyword relevance filter and stack extraction shared by every connector.
//!
//! Each source carries a [`KeywordProfile`]; the algorithm is the same for
//! all of them. Matching is case-insensitive and token-boundary aware: a
//! keyword edge that is a letter or digit must not touch another letter or
//! digit in the text, so `java` does not fire inside `javascript`.

/// Why a text was accepted or rejected. Rejections are checked in the order
/// the variants are declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Excluded,
    NonTargetStack,
    Seniority,
    NoTechKeyword,
    Relevant,
}

impl Verdict {
    pub fn is_relevant(self) -> bool {
        self == Verdict::Relevant
    }
}

/// One stack token and the spellings that map onto it.
pub type StackRule = (&'static str, &'static [&'static str]);

#[derive(Debug, Clone, Copy)]
pub struct KeywordProfile {
    pub name: &'static str,
    pub exclude: &'static [&'static str],
    pub non_target_stack: &'static [&'static str],
    pub seniority: &'static [&'static str],
    pub tech: &'static [&'static str],
    pub stack: &'static [StackRule],
}

impl KeywordProfile {
    pub fn classify(&self, text: &str) -> Verdict {
        let text = text.to_lowercase();
        if any_keyword(&text, self.exclude) {
            Verdict::Excluded
        } else if any_keyword(&text, self.non_target_stack) {
            Verdict::NonTargetStack
        } else if any_keyword(&text, self.seniority) {
            Verdict::Seniority
        } else if any_keyword(&text, self.tech) {
            Verdict::Relevant
        } else {
            Verdict::NoTechKeyword
        }
    }

    pub fn is_relevant(&self, text: &str) -> bool {
        self.classify(text).is_relevant()
    }

    /// Stack tokens found in `text`, unique, in dictionary order.
    pub fn extract_stack(&self, text: &str) -> Vec<String> {
        let text = text.to_lowercase();
        self.stack
            .iter()
            .filter(|(_, spellings)| any_keyword(&text, spellings))
            .map(|(token, _)| token.to_string())
            .collect()
    }
}

fn any_keyword(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| contains_keyword(lowered, kw))
}

/// `keyword` occurs in `lowered` without being glued to a neighbouring
/// letter or digit. Both arguments are expected in lowercase.
pub fn contains_keyword(lowered: &str, keyword: &str) -> bool {
    if keyword.is_empty() {
        return false;
    }
    let guard_start = keyword.chars().next().is_some_and(char::is_alphanumeric);
    let guard_end = keyword.chars().next_back().is_some_and(char::is_alphanumeric);

    lowered.match_indices(keyword).any(|(start, matched)| {
        let before = lowered[..start].chars().next_back();
        let after = lowered[start + matched.len()..].chars().next();
        (!guard_start || !is_word_char(before)) && (!guard_end || !is_word_char(after))
    })
}

fn is_word_char(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

const TARGET_STACK: &[StackRule] = &[
    ("javascript", &["javascript"]),
    ("typescript", &["typescript"]),
    ("python", &["python"]),
    ("react", &["react", "reactjs", "react.js", "react native"]),
    ("next", &["next", "nextjs", "next.js"]),
    ("node", &["node", "nodejs", "node.js"]),
    ("express", &["express", "expressjs"]),
    ("nestjs", &["nestjs", "nest.js"]),
    ("frontend", &["frontend", "front-end", "front end"]),
    ("backend", &["backend", "back-end", "back end"]),
    ("fullstack", &["fullstack", "full-stack", "full stack"]),
    ("mobile", &["mobile"]),
    ("devops", &["devops"]),
];

const BROAD_STACK: &[StackRule] = &[
    ("javascript", &["javascript"]),
    ("typescript", &["typescript"]),
    ("python", &["python"]),
    ("java", &["java"]),
    ("kotlin", &["kotlin"]),
    ("c#", &["c#"]),
    ("php", &["php"]),
    ("ruby", &["ruby"]),
    ("go", &["go", "golang"]),
    ("rust", &["rust"]),
    ("react", &["react", "reactjs", "react.js"]),
    ("next", &["next", "nextjs", "next.js"]),
    ("node", &["node", "nodejs", "node.js"]),
    ("express", &["express", "expressjs"]),
    ("nestjs", &["nestjs", "nest.js"]),
    ("spring", &["spring", "spring boot"]),
    ("django", &["django"]),
    ("flask", &["flask"]),
    ("laravel", &["laravel"]),
    ("rails", &["rails"]),
    (".net", &[".net", "dotnet", "asp.net"]),
    ("frontend", &["frontend", "front-end", "front end"]),
    ("backend", &["backend", "back-end", "back end"]),
    ("fullstack", &["fullstack", "full-stack", "full stack"]),
];

const NON_TARGET_STACK: &[&str] = &[
    ".net", "dotnet", "asp.net", "c#", "java", "kotlin", "spring", "php", "laravel", "ruby",
    "rails", "go", "golang", "rust", "c++", "swift", "delphi",
];

const NON_TARGET_STACK_WITH_NATIVE_MOBILE: &[&str] = &[
    ".net", "dotnet", "asp.net", "c#", "java", "kotlin", "spring", "php", "laravel", "ruby",
    "rails", "go", "golang", "rust", "c++", "swift", "delphi", "android", "ios",
];

const PT_EN_EXCLUDE: &[&str] = &[
    "vendas", "sales", "comercial", "marketing", "rh", "human resources", "financeiro",
    "finance", "jurídico", "legal", "administrativo", "atendimento",
];

/// Brazilian portal whose search already targets entry and mid-level roles.
pub const BRAZILIAN_PORTAL: KeywordProfile = KeywordProfile {
    name: "brazilian-portal",
    exclude: &[
        "vendas", "sales", "comercial", "marketing", "design gráfico", "ux designer",
        "ui designer", "recursos humanos", "rh", "human resources", "financeiro", "finance",
        "contabil", "contábil", "accounting", "jurídico", "legal", "advogado", "lawyer",
        "administrativo", "administrative", "recepção", "reception", "atendimento",
        "customer service", "suporte ao cliente", "operações", "operations", "logística",
        "logistics",
    ],
    non_target_stack: NON_TARGET_STACK_WITH_NATIVE_MOBILE,
    seniority: &[
        "sênior", "senior", "sénior", "sr", "sr.", "tech lead", "technical lead",
        "lead developer", "lead engineer", "team lead", "engineering manager",
        "gerente de engenharia", "gerente engenharia", "head of", "diretor", "diretora",
        "director", "principal", "staff engineer", "architect", "arquiteto", "arquiteta",
        "coordenador", "coordenadora", "coordinator",
    ],
    tech: &[
        "javascript", "typescript", "python", "react", "next", "node", "express", "nestjs",
        "desenvolvedor", "desenvolvedora", "developer", "engenheiro de software",
        "software engineer", "programador", "programadora", "programmer", "frontend",
        "front-end", "backend", "back-end", "fullstack", "full-stack", "full stack", "mobile",
        "ios", "android", "web", "devops", "sre", "platform engineer", "qa",
        "quality assurance", "test", "teste", "testes", "tester", "api", "cloud", "aws",
        "azure", "gcp", "kubernetes", "docker", "microservices", "database",
    ],
    stack: TARGET_STACK,
};

/// English-language remote boards (Remotive, RemoteOK).
pub const REMOTE_BOARD: KeywordProfile = KeywordProfile {
    name: "remote-board",
    exclude: &[
        "sales", "marketing", "human resources", "finance", "accounting", "legal",
        "administrative", "customer service", "operations", "logistics",
    ],
    non_target_stack: NON_TARGET_STACK_WITH_NATIVE_MOBILE,
    seniority: &[
        "senior", "sr", "sr.", "tech lead", "technical lead", "lead developer",
        "lead engineer", "team lead", "engineering manager", "head of", "director",
        "principal", "staff engineer", "architect", "coordinator",
    ],
    tech: &[
        "javascript", "typescript", "python", "react", "next", "node", "express", "nestjs",
        "developer", "software engineer", "programmer", "frontend", "front-end", "backend",
        "back-end", "fullstack", "full-stack", "full stack", "web", "devops", "sre",
        "platform engineer", "qa", "quality assurance", "test", "tester", "api", "cloud",
        "aws", "azure", "gcp", "kubernetes", "docker", "microservices", "database",
    ],
    stack: TARGET_STACK,
};

/// Brazilian HTML listings. No seniority exclusion: the level is kept instead.
pub const HTML_PORTAL: KeywordProfile = KeywordProfile {
    name: "html-portal",
    exclude: PT_EN_EXCLUDE,
    non_target_stack: NON_TARGET_STACK,
    seniority: &[],
    tech: &[
        "desenvolvedor", "desenvolvedora", "developer", "engenheiro de software",
        "software engineer", "programador", "programadora", "frontend", "front-end",
        "backend", "back-end", "fullstack", "full stack", "full-stack", "react", "next",
        "node", "express", "nestjs", "javascript", "typescript", "python", "qa", "test",
        "teste", "testes", "tester", "devops", "sre",
    ],
    stack: TARGET_STACK,
};

/// Aggregator search: only non-tech domains are dropped.
pub const BROAD_AGGREGATOR: KeywordProfile = KeywordProfile {
    name: "broad-aggregator",
    exclude: PT_EN_EXCLUDE,
    non_target_stack: &[],
    seniority: &[],
    tech: &[
        "desenvolvedor", "desenvolvedora", "developer", "engenheiro de software",
        "software engineer", "programador", "programadora", "frontend", "front-end",
        "backend", "back-end", "fullstack", "full stack", "full-stack", "react", "next",
        "node", "express", "nestjs", "javascript", "typescript", "python", "java", "kotlin",
        "spring", ".net", "dotnet", "asp.net", "c#", "php", "laravel", "ruby", "rails", "go",
        "golang", "rust", "django", "flask", "qa", "test", "tester", "devops", "sre", "cloud",
        "data engineer", "software", "it", "ti", "tecnologia", "technology",
    ],
    stack: BROAD_STACK,
};
