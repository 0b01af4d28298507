use crate::index::DocId;
use crate::vectorizer::DocVector;
use serde::{Deserialize, Serialize};

/// A drug record as supplied by the corpus loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrugRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requires_prescription: bool,
    /// Price in rupiah.
    #[serde(default)]
    pub price: u64,
    #[serde(default)]
    pub generic_name: Option<String>,
    /// Drug class, e.g. "Analgesik".
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Full text to index instead of the joined fields, e.g. a corpus file body.
    #[serde(default)]
    pub text: Option<String>,
}

impl DrugRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            requires_prescription: false,
            price: 0,
            generic_name: None,
            category: None,
            tags: Vec::new(),
            text: None,
        }
    }

    pub fn with_prescription(mut self, required: bool) -> Self {
        self.requires_prescription = required;
        self
    }

    pub fn with_price(mut self, price: u64) -> Self {
        self.price = price;
        self
    }

    /// The text fed to the normalizer.
    pub fn indexed_text(&self) -> String {
        if let Some(text) = &self.text {
            return text.clone();
        }
        let mut parts: Vec<&str> = vec![self.name.as_str()];
        if let Some(g) = &self.generic_name { parts.push(g); }
        parts.push(&self.description);
        parts.extend(self.tags.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// An indexed record: immutable once the index is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub doc_id: DocId,
    pub record: DrugRecord,
    pub terms: Vec<String>,
    pub vector: DocVector,
}

impl Document {
    pub fn id(&self) -> &str { &self.record.id }

    pub fn magnitude(&self) -> f64 { self.vector.magnitude }
}
