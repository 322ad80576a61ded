use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::util::{normalize, similarity};

/// Supplies the budget type label ("needs", "wants", ...) for an imported
/// row, given its description and category text.
pub trait CategoryMatcher {
    fn match_type(&self, description: &str, category: &str) -> Option<String>;
}

/// Matches nothing. Every row stays "Uncategorized".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMatcher;

impl CategoryMatcher for NoMatcher {
    fn match_type(&self, _description: &str, _category: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    /// Type label assigned on a hit.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
    Fuzzy {
        threshold: f32,
    },
}

impl std::str::FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "contains" => Ok(MatchType::Contains),
            "exact" => Ok(MatchType::Exact),
            "regex" => Ok(MatchType::Regex),
            s if s.starts_with("fuzzy:") => {
                let threshold = s[6..]
                    .parse::<f32>()
                    .map_err(|_| "Invalid fuzzy threshold".to_string())?;
                Ok(MatchType::Fuzzy { threshold })
            }
            other => Err(format!("Unknown match type: '{other}'")),
        }
    }
}

impl TryFrom<String> for MatchType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Contains => f.write_str("contains"),
            MatchType::Exact => f.write_str("exact"),
            MatchType::Regex => f.write_str("regex"),
            MatchType::Fuzzy { threshold } => write!(f, "fuzzy:{threshold}"),
        }
    }
}

impl From<MatchType> for String {
    fn from(m: MatchType) -> Self {
        m.to_string()
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("Failed to parse rules: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid regex in rule '{name}': {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<TypeRule>,
}

struct CompiledRule {
    rule: TypeRule,
    compiled_regex: Option<regex::Regex>,
}

/// Priority-ordered pattern rules. A rule is tried against the description
/// first and then against the category cell; the first hit wins.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<TypeRule>) -> Result<Self, RuleError> {
        let mut compiled = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = match &rule.match_type {
                    MatchType::Regex => Some(regex::Regex::new(&rule.pattern).map_err(|source| {
                        RuleError::InvalidRegex {
                            name: rule.name.clone(),
                            source,
                        }
                    })?),
                    _ => None,
                };
                Ok(CompiledRule { rule, compiled_regex })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        // Highest priority first; stable, so file order breaks ties.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self { rules: compiled })
    }

    /// Parses a TOML document of `[[rules]]` tables.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::new(file.rules)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find_matching_rule(&self, description: &str, category: &str) -> Option<&TypeRule> {
        self.rules
            .iter()
            .find(|cr| {
                [description, category]
                    .into_iter()
                    .filter(|text| !text.trim().is_empty())
                    .any(|text| rule_matches(cr, text))
            })
            .map(|cr| &cr.rule)
    }
}

impl CategoryMatcher for CategoryRuleEngine {
    fn match_type(&self, description: &str, category: &str) -> Option<String> {
        self.find_matching_rule(description, category)
            .map(|rule| rule.label.clone())
    }
}

fn rule_matches(cr: &CompiledRule, text: &str) -> bool {
    let rule = &cr.rule;
    match &rule.match_type {
        MatchType::Contains => text.to_lowercase().contains(&rule.pattern.to_lowercase()),
        MatchType::Exact => text.trim().eq_ignore_ascii_case(rule.pattern.trim()),
        MatchType::Regex => cr
            .compiled_regex
            .as_ref()
            .is_some_and(|re| re.is_match(text)),
        MatchType::Fuzzy { threshold } => {
            similarity(&normalize(text), &normalize(&rule.pattern)) >= *threshold
        }
    }
}
