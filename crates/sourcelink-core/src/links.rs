use crate::model::IssueId;
use regex::Regex;
use std::collections::HashSet;

/// A two-stage pattern pair: the outer pattern selects candidate substrings
/// from free text, the inner pattern pulls numeric ids out of each candidate.
#[derive(Debug, Clone)]
pub struct LinkPatterns {
    outer: Regex,
    inner: Regex,
}

impl LinkPatterns {
    pub fn new(outer: Regex, inner: Regex) -> Self {
        Self { outer, inner }
    }

    fn extract(&self, text: &str) -> Vec<IssueId> {
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        for candidate in self.outer.find_iter(text) {
            for caps in self.inner.captures_iter(candidate.as_str()) {
                let Some(m) = caps.get(1) else { continue };
                let Ok(id) = m.as_str().parse::<IssueId>() else { continue };
                if id > 0 && seen.insert(id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

/// Extracts issue ids from commit messages, distinguishing plain references
/// from fix claims. Existence validation happens in the resolution engine,
/// not here.
#[derive(Debug, Clone)]
pub struct BugLinkExtractor {
    references: LinkPatterns,
    fixes: LinkPatterns,
}

impl BugLinkExtractor {
    pub fn new(references: LinkPatterns, fixes: LinkPatterns) -> Self {
        Self { references, fixes }
    }

    /// Ids mentioned anywhere in the text. Positive, deduplicated,
    /// first-seen order.
    pub fn extract_references(&self, text: &str) -> Vec<IssueId> {
        self.references.extract(text)
    }

    /// Ids the text claims to fix.
    pub fn extract_fixes(&self, text: &str) -> Vec<IssueId> {
        self.fixes.extract(text)
    }
}
