use serde::{Deserialize, Serialize};

/// Summary value used when a document carries no usable abstract
pub const NO_ABSTRACT: &str = "No abstract available";

/// Normalized metadata for one PubMed document
///
/// Every field is always present. `published` is `""`, `YYYY`, `YYYY-MM` or
/// `YYYY-MM-DD` depending on which date parts the source supplied.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArticleMetadata {
    /// PubMed ID
    pub uid: String,
    /// Article or book chapter title
    pub title: String,
    /// Electronic publication date
    pub published: String,
    /// Copyright statement attached to the abstract
    pub copyright_information: String,
    /// Abstract text, or [`NO_ABSTRACT`] when absent
    pub summary: String,
}

impl ArticleMetadata {
    /// Render as the four-line text block used by `run`
    pub fn to_text_block(&self) -> String {
        format!(
            "Published: {}\nTitle: {}\nCopyright Information: {}\nSummary: {}",
            self.published, self.title, self.copyright_information, self.summary
        )
    }

    /// Split into a summary document and the remaining metadata
    pub fn into_document(self) -> Document {
        Document {
            page_content: self.summary,
            metadata: DocumentMetadata {
                uid: self.uid,
                title: self.title,
                published: self.published,
                copyright_information: self.copyright_information,
            },
        }
    }
}

/// Result of the search phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// History server session; required by every fetch of this search
    pub webenv: String,
    /// PMIDs in upstream result order, at most `top_k_results` long
    pub pmids: Vec<String>,
    /// Total number of matches reported by the server
    pub total_count: Option<usize>,
    /// How PubMed interpreted the query
    pub query_translation: Option<String>,
}

/// Document form of an article: summary as content, the rest as metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub uid: String,
    pub title: String,
    pub published: String,
    pub copyright_information: String,
}
