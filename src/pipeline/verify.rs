//! Post-hoc keyword-evidence verification of assigned tags.
//!
//! A best-effort sanity filter, not ground truth: it catches gross
//! mismatches (a tag with zero textual support in the sample), not subtle
//! misclassification. The rule table is injected configuration, like the
//! tagger vocabulary.

use super::types::{Verification, VerificationStatus};

/// Note attached when every checked tag has keyword support.
pub const CONSISTENT_NOTE: &str = "All tags appear consistent with text sample.";

pub struct Verifier {
    /// Tag name paired with the keywords of which at least one must appear.
    rules: Vec<(String, Vec<String>)>,
}

impl Verifier {
    pub fn new(rules: Vec<(String, Vec<String>)>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(tag, keywords)| {
                let keywords = keywords.into_iter().map(|k| k.to_lowercase()).collect();
                (tag, keywords)
            })
            .collect();
        Self { rules }
    }

    /// Check each tag with an entry in the rule table against the sample.
    /// Tags without an entry are unverifiable and do not fail.
    pub fn verify(&self, tags: &[String], text_sample: &str) -> Verification {
        let sample = text_sample.to_lowercase();
        let mut notes = Vec::new();

        for tag in tags {
            let Some((_, keywords)) = self.rules.iter().find(|(name, _)| name == tag) else {
                continue;
            };
            if !keywords.iter().any(|k| sample.contains(k.as_str())) {
                notes.push(format!(
                    "Tag '{}' is present, but no required keywords ({}) were found in the text sample.",
                    tag,
                    keywords.join(", ")
                ));
            }
        }

        if notes.is_empty() {
            Verification {
                status: VerificationStatus::Passed,
                notes: vec![CONSISTENT_NOTE.to_string()],
            }
        } else {
            Verification {
                status: VerificationStatus::Failed,
                notes,
            }
        }
    }
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

/// Keywords that MUST back a tag for it to be considered plausible.
fn default_rules() -> Vec<(String, Vec<String>)> {
    let raw: &[(&str, &[&str])] = &[
        (
            "finance",
            &["tax", "invoice", "payment", "financial", "budget", "revenue"],
        ),
        (
            "legal",
            &["contract", "agreement", "policy", "regulation", "law"],
        ),
        ("hr", &["employee", "salary", "recruitment", "leave"]),
    ];

    raw.iter()
        .map(|(tag, keywords)| {
            (
                tag.to_string(),
                keywords.iter().map(|k| k.to_string()).collect(),
            )
        })
        .collect()
}
