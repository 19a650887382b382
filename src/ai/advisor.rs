use std::{fmt, str::FromStr, sync::Mutex};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

/// Subject area of a legal query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Criminal,
    Civil,
    Family,
    Property,
    Employment,
    Constitutional,
    Immigration,
    General,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Criminal,
        Category::Civil,
        Category::Family,
        Category::Property,
        Category::Employment,
        Category::Constitutional,
        Category::Immigration,
        Category::General,
    ];

    /// Stored and serialized label; matches the lowercase serde/sqlx rename.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Criminal => "criminal",
            Category::Civil => "civil",
            Category::Family => "family",
            Category::Property => "property",
            Category::Employment => "employment",
            Category::Constitutional => "constitutional",
            Category::Immigration => "immigration",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct UnknownCategory(pub String);

impl fmt::Display for UnknownCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown category '{}'", self.0)
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

// Checked top to bottom; the first category with a matching keyword wins.
const KEYWORDS: [(Category, &[&str]); 7] = [
    (
        Category::Criminal,
        &["arrest", "crime", "criminal", "offense", "police", "prosecution"],
    ),
    (
        Category::Civil,
        &["contract", "damages", "lawsuit", "sue", "civil case"],
    ),
    (
        Category::Family,
        &["divorce", "custody", "alimony", "child support", "marriage"],
    ),
    (
        Category::Property,
        &["real estate", "landlord", "tenant", "property", "eviction"],
    ),
    (
        Category::Employment,
        &["workplace", "fired", "termination", "salary", "employer"],
    ),
    (
        Category::Constitutional,
        &["rights", "freedom", "constitutional", "amendment"],
    ),
    (
        Category::Immigration,
        &["visa", "citizenship", "immigrant", "deportation", "asylum"],
    ),
];

pub const RESPONSE_TEMPLATES: [&str; 5] = [
    "Based on general legal principles, this situation would typically fall under contract law. \
     However, I should note that I am providing information, not legal advice. For your specific \
     situation, it would be best to consult with a qualified attorney.",
    "This appears to be a matter of property rights. In most jurisdictions, property laws provide \
     protections for homeowners and tenants. I recommend consulting with a real estate attorney \
     who can provide advice tailored to your specific circumstances.",
    "From a legal perspective, employment matters are governed by both federal and state laws. \
     The specifics can vary significantly by jurisdiction. Please consider speaking with an employment \
     law specialist for advice specific to your situation.",
    "Family law matters are often complex and emotionally challenging. While I can provide general \
     information about legal concepts, a family law attorney would be best equipped to advise you \
     on your specific rights and obligations.",
    "Criminal law questions require careful consideration of many factors. While I can explain general \
     legal concepts, I must emphasize that I am providing information, not legal advice. Please consult \
     with a criminal defense attorney for guidance specific to your situation.",
];

const APOLOGY: &str = "I apologize, but I encountered an error while processing your legal question. \
                       Please try again with a more specific query.";

/// Outcome of a single response generation.
///
/// A successful record has a non-empty `response` and no `error`. A failed
/// record carries the apology text and the error detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceRecord {
    pub response: String,
    pub error: Option<String>,
}

impl AdviceRecord {
    pub fn answered(response: String) -> Self {
        Self {
            response,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            response: APOLOGY.to_string(),
            error: Some(error.into()),
        }
    }

    /// The response text if it may be persisted.
    pub fn into_usable(self) -> Option<String> {
        match self.error {
            None if !self.response.is_empty() => Some(self.response),
            _ => None,
        }
    }
}

/// Produces the category and advisory answer for a legal question.
pub trait LegalAdvisor: Send + Sync {
    fn categorize(&self, text: &str) -> Category;

    fn respond(&self, text: &str) -> AdviceRecord;
}

/// Keyword classifier with canned answers picked at random.
pub struct MockAdvisor {
    rng: Mutex<StdRng>,
}

impl MockAdvisor {
    pub fn new(model_path: &str, seed: Option<u64>) -> Self {
        tracing::info!(model_path, seeded = seed.is_some(), "mock legal advisor initialized");
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self {
                rng: Mutex::new(StdRng::from_entropy()),
            },
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick_template(&self) -> Result<&'static str, String> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| "response generator state is poisoned".to_string())?;
        RESPONSE_TEMPLATES
            .choose(&mut *rng)
            .copied()
            .ok_or_else(|| "no response templates available".to_string())
    }
}

impl LegalAdvisor for MockAdvisor {
    fn categorize(&self, text: &str) -> Category {
        let lowered = text.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(*k)))
            .map(|(category, _)| *category)
            .unwrap_or(Category::General)
    }

    fn respond(&self, text: &str) -> AdviceRecord {
        let template = match self.pick_template() {
            Ok(template) => template,
            Err(e) => {
                tracing::error!("error generating mock response: {e}");
                return AdviceRecord::failed(e);
            }
        };

        match self.categorize(text) {
            Category::General => AdviceRecord::answered(template.to_string()),
            category => AdviceRecord::answered(format!(
                "Regarding your question about {category} law: {template}"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_prefix(response: &str) -> &str {
        match response.split_once(" law: ") {
            Some((lead, rest)) if lead.starts_with("Regarding your question about") => rest,
            _ => response,
        }
    }

    #[test]
    fn categorizes_by_keyword() {
        let advisor = MockAdvisor::seeded(1);
        assert_eq!(advisor.categorize("I was arrested for theft"), Category::Criminal);
        assert_eq!(
            advisor.categorize("my landlord wants to evict me"),
            Category::Property
        );
        assert_eq!(advisor.categorize("I like turtles"), Category::General);
        assert_eq!(advisor.categorize("I need to sue my landlord"), Category::Civil);
        assert_eq!(advisor.categorize("Applying for a VISA"), Category::Immigration);
        assert_eq!(advisor.categorize(""), Category::General);
    }

    #[test]
    fn first_category_in_order_wins() {
        let advisor = MockAdvisor::seeded(1);
        // matches criminal, civil and employment keywords
        let text = "the police said my employer broke the contract";
        assert_eq!(advisor.categorize(text), Category::Criminal);
        assert_eq!(
            advisor.categorize("custody dispute over the property"),
            Category::Family
        );
    }

    #[test]
    fn response_is_a_known_template() {
        let advisor = MockAdvisor::seeded(7);
        for text in ["I like turtles", "divorce papers", "asylum hearing", "x"] {
            let record = advisor.respond(text);
            assert!(record.error.is_none());
            assert!(RESPONSE_TEMPLATES.contains(&strip_prefix(&record.response)));
        }
    }

    #[test]
    fn non_general_response_names_the_category() {
        let advisor = MockAdvisor::seeded(3);
        let record = advisor.respond("I need to sue my landlord");
        assert!(record
            .response
            .starts_with("Regarding your question about civil law: "));

        let record = advisor.respond("I like turtles");
        assert!(!record.response.starts_with("Regarding"));
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let a = MockAdvisor::seeded(42);
        let b = MockAdvisor::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.respond("hello"), b.respond("hello"));
        }
    }

    #[test]
    fn parses_only_closed_set_labels() {
        assert_eq!("immigration".parse::<Category>(), Ok(Category::Immigration));
        assert_eq!(
            "tax".parse::<Category>(),
            Err(UnknownCategory("tax".to_string()))
        );
        assert!("Criminal".parse::<Category>().is_err());
    }

    #[test]
    fn labels_agree_with_serde_and_parse() {
        for category in Category::ALL {
            let label = category.as_str();
            assert_eq!(serde_json::to_value(category).unwrap(), label);
            assert_eq!(
                serde_json::from_value::<Category>(label.into()).unwrap(),
                category
            );
            assert_eq!(label.parse::<Category>(), Ok(category));
            assert_eq!(category.to_string(), label);
        }

        let mut labels: Vec<_> = Category::ALL.iter().map(Category::as_str).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Category::ALL.len());
    }

    #[test]
    fn failed_record_is_not_usable() {
        let record = AdviceRecord::failed("boom");
        assert!(!record.response.is_empty());
        assert_eq!(record.into_usable(), None);
        assert_eq!(
            AdviceRecord::answered("ok".into()).into_usable(),
            Some("ok".to_string())
        );
        assert_eq!(AdviceRecord::answered(String::new()).into_usable(), None);
    }
}
