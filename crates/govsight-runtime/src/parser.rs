//! Deterministic fact parser.
//!
//! Turns a question into a normalized (subject, attribute) [`LookupKey`] by
//! matching it against the configured question templates, and turns a stored
//! value back into a sentence. No I/O, no model calls: the same input always
//! produces the same output, and a question no template recognizes is
//! [`Unparseable`] rather than a guessed key.

use govsight_memory::normalize::{normalize, normalize_key};
use govsight_types::config::ParserConfig;
use govsight_types::error::{GovsightError, GovsightResult};
use govsight_types::fact::{LookupKey, ParsedStatement};
use regex_lite::Regex;
use std::collections::HashMap;

/// Declarative statements accepted by [`FactParser::parse_statement`].
const STATEMENT_PATTERNS: &[&str] = &[
    r"(?i)^\s*the\s+(?P<attr>.+?)\s+of\s+(?P<subject>.+?)\s+(?:is|are|was)\s+(?P<value>.+?)[\s.!]*$",
    r"(?i)^\s*(?P<subject>.+?)'s\s+(?P<attr>.+?)\s+(?:is|are|was)\s+(?P<value>.+?)[\s.!]*$",
];

/// The query matched no known template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unparseable query: {0}")]
pub struct Unparseable(pub String);

struct CompiledTemplate {
    regex: Regex,
    /// Fixed attribute for templates without an `attr` group.
    attribute: Option<String>,
}

struct AttributeEntry {
    template: Option<String>,
}

/// Template-driven question and statement parser.
pub struct FactParser {
    templates: Vec<CompiledTemplate>,
    statements: Vec<Regex>,
    /// Normalized alias (and canonical name) -> canonical name.
    aliases: HashMap<String, String>,
    /// Canonical name -> render settings.
    attributes: HashMap<String, AttributeEntry>,
}

impl FactParser {
    /// Compile the configured templates and vocabulary.
    ///
    /// Fails with `Config` if a pattern does not compile or lacks the named
    /// groups it needs.
    pub fn from_config(config: &ParserConfig) -> GovsightResult<Self> {
        let mut templates = Vec::with_capacity(config.templates.len());
        for t in &config.templates {
            let regex = Regex::new(&t.pattern).map_err(|e| {
                GovsightError::Config(format!("invalid question template '{}': {e}", t.pattern))
            })?;
            let groups: Vec<&str> = regex.capture_names().flatten().collect();
            if !groups.contains(&"subject") {
                return Err(GovsightError::Config(format!(
                    "question template '{}' has no `subject` group",
                    t.pattern
                )));
            }
            if t.attribute.is_none() && !groups.contains(&"attr") {
                return Err(GovsightError::Config(format!(
                    "question template '{}' needs an `attr` group or a fixed attribute",
                    t.pattern
                )));
            }
            templates.push(CompiledTemplate {
                regex,
                attribute: t.attribute.clone(),
            });
        }

        let statements = STATEMENT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).map_err(|e| GovsightError::Internal(e.to_string())))
            .collect::<GovsightResult<Vec<_>>>()?;

        let mut aliases = HashMap::new();
        let mut attributes = HashMap::new();
        for spec in &config.attributes {
            let name = normalize(&spec.name);
            if name.is_empty() {
                return Err(GovsightError::Config(format!(
                    "attribute name '{}' is empty after normalization",
                    spec.name
                )));
            }
            for alias in &spec.aliases {
                let alias = normalize(alias);
                if !alias.is_empty() {
                    aliases.insert(alias, name.clone());
                }
            }
            aliases.insert(name.clone(), name.clone());
            attributes.insert(
                name,
                AttributeEntry {
                    template: spec.template.clone(),
                },
            );
        }

        Ok(Self {
            templates,
            statements,
            aliases,
            attributes,
        })
    }

    /// Map an attribute phrase to its canonical vocabulary name.
    ///
    /// Unknown attributes pass through normalized.
    pub fn canonical_attribute(&self, raw: &str) -> String {
        let norm = normalize(raw);
        self.aliases.get(&norm).cloned().unwrap_or(norm)
    }

    /// Whether `attribute` (canonical or alias) is in the vocabulary.
    pub fn is_known_attribute(&self, attribute: &str) -> bool {
        self.aliases.contains_key(&normalize(attribute))
    }

    /// Extract a lookup key from a question. The first matching template wins.
    pub fn parse_query(&self, raw_text: &str) -> Result<LookupKey, Unparseable> {
        for template in &self.templates {
            let Some(caps) = template.regex.captures(raw_text) else {
                continue;
            };
            let Some(subject) = caps.name("subject") else {
                continue;
            };
            let attribute = match (&template.attribute, caps.name("attr")) {
                (Some(fixed), _) => fixed.as_str(),
                (None, Some(m)) => m.as_str(),
                (None, None) => continue,
            };
            let attribute = self.canonical_attribute(attribute);
            if let Ok(key) = normalize_key(subject.as_str(), &attribute) {
                return Ok(key);
            }
        }
        Err(Unparseable(raw_text.trim().to_string()))
    }

    /// Parse a declarative statement such as
    /// "The mayor of Grandview, TX is Jane Doe." into a full triple.
    pub fn parse_statement(&self, raw_text: &str) -> Result<ParsedStatement, Unparseable> {
        for regex in &self.statements {
            let Some(caps) = regex.captures(raw_text) else {
                continue;
            };
            let (Some(subject), Some(attr), Some(value)) =
                (caps.name("subject"), caps.name("attr"), caps.name("value"))
            else {
                continue;
            };
            let value = value.as_str().trim();
            if value.is_empty() {
                continue;
            }
            let attribute = self.canonical_attribute(attr.as_str());
            if let Ok(key) = normalize_key(subject.as_str(), &attribute) {
                return Ok(ParsedStatement {
                    key,
                    value: value.to_string(),
                });
            }
        }
        Err(Unparseable(raw_text.trim().to_string()))
    }

    /// Compose a sentence for a stored value.
    ///
    /// Attributes with a configured template use it; everything else gets
    /// "{attribute} of {subject} is {value}".
    pub fn render_answer(&self, key: &LookupKey, value: &str) -> String {
        let template = self
            .attributes
            .get(&key.attribute)
            .and_then(|entry| entry.template.as_deref())
            .unwrap_or("{attribute} of {subject} is {value}");
        template
            .replace("{subject}", &key.subject)
            .replace("{attribute}", &key.attribute)
            .replace("{value}", value)
    }
}
