//! Display grouping for extracted document details.
//!
//! Field names are matched case-insensitively against keyword lists in a
//! fixed priority order; the first list containing a substring of the name
//! wins. `"Transfer Date"` therefore lands in dates (via `date`) before the
//! legal rule (`transfer type`) is consulted.

use std::collections::BTreeMap;

use crate::DOCUMENT_TYPE_FIELD;

// ── Keyword groupings, in priority order ──

const PARTIES: &[&str] = &["party", "name", "relationship", "address"];

const DATES: &[&str] = &["date", "period", "duration"];

const PROPERTY: &[&str] = &["property", "legal description", "subject"];

const LEGAL: &[&str] = &["governing", "law", "consideration", "transfer type"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DetailCategory {
    Parties,
    Dates,
    Property,
    Legal,
    Other,
}

impl DetailCategory {
    /// Display order.
    pub const ALL: [DetailCategory; 5] = [
        Self::Parties,
        Self::Dates,
        Self::Property,
        Self::Legal,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parties => "parties",
            Self::Dates => "dates",
            Self::Property => "property",
            Self::Legal => "legal",
            Self::Other => "other",
        }
    }

    /// Section heading for the verification form.
    pub fn heading(&self) -> &'static str {
        match self {
            Self::Parties => "Parties Information",
            Self::Dates => "Dates & Duration",
            Self::Property => "Property Details",
            Self::Legal => "Legal Terms",
            Self::Other => "Other Details",
        }
    }
}

/// Bucket for a single field name, or `None` for the reserved
/// `"Document Type"` field, which is shown separately.
pub fn classify_field(name: &str) -> Option<DetailCategory> {
    if name == DOCUMENT_TYPE_FIELD {
        return None;
    }
    let lower = name.to_lowercase();
    let matches = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    let category = if matches(PARTIES) {
        DetailCategory::Parties
    } else if matches(DATES) {
        DetailCategory::Dates
    } else if matches(PROPERTY) {
        DetailCategory::Property
    } else if matches(LEGAL) {
        DetailCategory::Legal
    } else {
        DetailCategory::Other
    };
    Some(category)
}

/// Details partitioned into display buckets. Empty buckets mean "nothing to
/// render".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorizedDetails {
    pub parties: BTreeMap<String, String>,
    pub dates: BTreeMap<String, String>,
    pub property: BTreeMap<String, String>,
    pub legal: BTreeMap<String, String>,
    pub other: BTreeMap<String, String>,
}

impl CategorizedDetails {
    pub fn bucket(&self, category: DetailCategory) -> &BTreeMap<String, String> {
        match category {
            DetailCategory::Parties => &self.parties,
            DetailCategory::Dates => &self.dates,
            DetailCategory::Property => &self.property,
            DetailCategory::Legal => &self.legal,
            DetailCategory::Other => &self.other,
        }
    }

    fn bucket_mut(&mut self, category: DetailCategory) -> &mut BTreeMap<String, String> {
        match category {
            DetailCategory::Parties => &mut self.parties,
            DetailCategory::Dates => &mut self.dates,
            DetailCategory::Property => &mut self.property,
            DetailCategory::Legal => &mut self.legal,
            DetailCategory::Other => &mut self.other,
        }
    }

    /// Non-empty buckets in display order.
    pub fn sections(&self) -> impl Iterator<Item = (DetailCategory, &BTreeMap<String, String>)> {
        DetailCategory::ALL
            .into_iter()
            .map(|c| (c, self.bucket(c)))
            .filter(|(_, fields)| !fields.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }

    /// Total number of categorised fields.
    pub fn len(&self) -> usize {
        DetailCategory::ALL
            .into_iter()
            .map(|c| self.bucket(c).len())
            .sum()
    }
}

/// Partition a details mapping into display buckets.
///
/// Pure and order-independent: any iteration order of the same mapping gives
/// the same result.
pub fn categorize<I, K, V>(details: I) -> CategorizedDetails
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = CategorizedDetails::default();
    for (key, value) in details {
        let key = key.as_ref();
        if let Some(category) = classify_field(key) {
            out.bucket_mut(category)
                .insert(key.to_string(), value.as_ref().to_string());
        }
    }
    out
}
