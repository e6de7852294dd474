//! Deterministic keyword-to-category tagging.
//!
//! The vocabulary is injected configuration data, not an ambient global, so
//! pipelines with different tag sets can coexist and be tested in isolation.

/// Sentinel tag assigned when no category keyword matches. Callers never see
/// an empty tag set from this path.
pub const GENERAL_TAG: &str = "general";

pub struct RuleTagger {
    /// Category name paired with its lower-cased keyword substrings.
    vocabulary: Vec<(String, Vec<String>)>,
}

impl RuleTagger {
    pub fn new(vocabulary: Vec<(String, Vec<String>)>) -> Self {
        let vocabulary = vocabulary
            .into_iter()
            .map(|(category, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (category, keywords)
            })
            .collect();
        Self { vocabulary }
    }

    /// Case-insensitive substring match against every category. Category
    /// order in the vocabulary determines output order. Infallible.
    pub fn tag(&self, text: &str) -> Vec<String> {
        let lower = text.to_lowercase();
        let mut tags: Vec<String> = self
            .vocabulary
            .iter()
            .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k.as_str())))
            .map(|(category, _)| category.clone())
            .collect();

        if tags.is_empty() {
            tags.push(GENERAL_TAG.to_string());
        }
        tags
    }

    /// Categories known to this tagger, in vocabulary order.
    pub fn categories(&self) -> Vec<&str> {
        self.vocabulary.iter().map(|(c, _)| c.as_str()).collect()
    }
}

impl Default for RuleTagger {
    fn default() -> Self {
        Self::new(default_vocabulary())
    }
}

/// The curated compliance-domain vocabulary.
fn default_vocabulary() -> Vec<(String, Vec<String>)> {
    let raw: &[(&str, &[&str])] = &[
        (
            "finance",
            &[
                "finance", "financial", "budget", "revenue", "tax", "investment", "funding",
                "cost", "expense", "accounting", "audit", "banking", "credit", "loan",
                "payment", "profit", "income", "expenditure", "fiscal", "monetary",
                "economic", "treasury",
            ],
        ),
        (
            "technology",
            &[
                "technology", "digital", "software", "computer", "data", "system", "network",
                "cyber", "automation", "database", "cloud", "encryption", "algorithm",
                "machine learning", "artificial intelligence", "blockchain", "integration",
                "platform", "application",
            ],
        ),
        (
            "healthcare",
            &[
                "health", "medical", "healthcare", "hospital", "patient", "disease",
                "treatment", "medicine", "clinical", "diagnosis", "therapy",
                "pharmaceutical", "drug", "vaccine", "surgery", "nursing", "wellness",
                "epidemiology",
            ],
        ),
        (
            "environment",
            &[
                "environment", "climate", "carbon", "emission", "sustainability", "green",
                "renewable", "pollution", "ecosystem", "biodiversity", "conservation",
                "energy", "solar", "wind", "waste", "recycling", "sustainable",
            ],
        ),
        (
            "infrastructure",
            &[
                "infrastructure", "construction", "building", "transport", "road", "bridge",
                "facility", "urban", "municipal", "public works", "engineering",
                "architecture", "housing", "utilities", "sewage", "electricity",
                "telecommunications",
            ],
        ),
        (
            "legal",
            &[
                "legal", "law", "regulation", "compliance", "policy", "legislation",
                "statute", "court", "judge", "attorney", "lawyer", "contract", "agreement",
                "liability", "jurisdiction", "enforcement", "penalty", "sanction",
                "governance",
            ],
        ),
        (
            "education",
            &[
                "education", "school", "university", "college", "student", "teacher",
                "learning", "curriculum", "academic", "research", "training",
                "certification", "degree", "scholarship", "literacy", "pedagogy",
            ],
        ),
        (
            "government",
            &[
                "government", "administration", "bureaucracy", "civil service", "federal",
                "election", "democracy", "citizen", "public service", "public sector",
                "civil servant",
            ],
        ),
    ];

    raw.iter()
        .map(|(category, keywords)| {
            (
                category.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_single_category() {
        let tagger = RuleTagger::default();
        let tags = tagger.tag("Our tax filing and budget report for the fiscal year.");
        assert_eq!(tags, vec!["finance"]);
    }

    #[test]
    fn matches_multiple_categories_in_vocabulary_order() {
        let tagger = RuleTagger::default();
        let tags = tagger.tag("The hospital budget covers new software systems.");
        assert_eq!(tags, vec!["finance", "technology", "healthcare"]);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let tagger = RuleTagger::default();
        assert_eq!(tagger.tag("ANNUAL TAX COMPLIANCE"), vec!["finance", "legal"]);
    }

    #[test]
    fn no_match_yields_general_sentinel() {
        let tagger = RuleTagger::default();
        let tags = tagger.tag("Nothing relevant here whatsoever.");
        assert_eq!(tags, vec![GENERAL_TAG]);
        assert!(!tags.is_empty());
    }

    #[test]
    fn empty_text_yields_general_sentinel() {
        let tagger = RuleTagger::default();
        assert_eq!(tagger.tag(""), vec![GENERAL_TAG]);
    }

    #[test]
    fn custom_vocabulary_is_honored() {
        let tagger = RuleTagger::new(vec![(
            "hr".to_string(),
            vec!["employee".to_string(), "Salary".to_string()],
        )]);
        assert_eq!(tagger.tag("Employee salary review"), vec!["hr"]);
        assert_eq!(tagger.tag("Unrelated"), vec![GENERAL_TAG]);
        assert_eq!(tagger.categories(), vec!["hr"]);
    }
}
