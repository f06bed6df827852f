//! Metadata extraction from EFetch document trees
//!
//! EFetch returns one of two document families per identifier: a journal
//! article (`PubmedArticle/MedlineCitation/Article`) or a book chapter
//! (`PubmedBookArticle/BookDocument`). Both carry the same title, date and
//! abstract element names, so extraction only differs in where the body lives.

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::pubmed::models::{ArticleMetadata, NO_ABSTRACT};
use crate::pubmed::tree::{DocumentTree, TEXT_KEY, lookup};

const ARTICLE_PATH: &[&str] = &["PubmedArticleSet", "PubmedArticle", "MedlineCitation", "Article"];
const BOOK_PATH: &[&str] = &["PubmedArticleSet", "PubmedBookArticle", "BookDocument"];

const LABEL_KEY: &str = "@Label";

/// The shapes `Abstract/AbstractText` takes once folded into a tree
#[derive(Debug, Clone, PartialEq)]
pub enum AbstractShape<'a> {
    /// No `AbstractText` element (or an explicit null)
    Missing,
    /// Text-only element, possibly empty
    Plain(String),
    /// Repeated `AbstractText` elements, usually labeled sections
    Sections(&'a [Value]),
    /// A single element with attributes or inline markup
    Fields(&'a Map<String, Value>),
}

impl<'a> AbstractShape<'a> {
    pub fn classify(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => AbstractShape::Missing,
            Some(Value::String(text)) => AbstractShape::Plain(text.clone()),
            // Numeric abstracts only exist because the tree coerces numeric text
            Some(Value::Number(number)) => AbstractShape::Plain(number.to_string()),
            Some(Value::Bool(flag)) => AbstractShape::Plain(flag.to_string()),
            Some(Value::Array(items)) => AbstractShape::Sections(items),
            Some(Value::Object(fields)) => AbstractShape::Fields(fields),
        }
    }

    /// Render the summary text, falling back to [`NO_ABSTRACT`]
    pub fn render(&self) -> String {
        let rendered = match self {
            AbstractShape::Missing => None,
            AbstractShape::Plain(text) => Some(text.clone()),
            AbstractShape::Sections(items) => {
                let sections: Vec<String> = items.iter().filter_map(labeled_section).collect();
                (!sections.is_empty()).then(|| sections.join("\n"))
            }
            AbstractShape::Fields(fields) => {
                let strings: Vec<&str> = fields.values().filter_map(Value::as_str).collect();
                (!strings.is_empty()).then(|| strings.join("\n"))
            }
        };

        rendered.unwrap_or_else(|| NO_ABSTRACT.to_string())
    }
}

/// `LABEL: text` for a section carrying both a label and text
fn labeled_section(section: &Value) -> Option<String> {
    let label = section.get(LABEL_KEY)?;
    let text = section.get(TEXT_KEY)?;
    Some(format!("{}: {}", scalar_text(label)?, scalar_text(text)?))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Parse EFetch XML into a [`DocumentTree`]; never fails
pub fn parse_document_tree(xml: &str) -> DocumentTree {
    DocumentTree::parse(xml)
}

/// Extract normalized metadata for `uid` from a parsed EFetch document
///
/// Missing fields degrade to their defaults instead of failing.
#[instrument(skip(tree), fields(uid = %uid))]
pub fn extract_metadata(uid: &str, tree: &DocumentTree) -> ArticleMetadata {
    let empty = Value::Null;
    let body = match tree.get_path(ARTICLE_PATH).or_else(|| tree.get_path(BOOK_PATH)) {
        Some(body) => body,
        None => {
            debug!("Neither article nor book chapter body found");
            &empty
        }
    };

    ArticleMetadata {
        uid: uid.to_string(),
        title: extract_title(lookup(body, &["ArticleTitle"])),
        published: format_publication_date(lookup(body, &["ArticleDate"])),
        copyright_information: lookup(body, &["Abstract", "CopyrightInformation"])
            .and_then(scalar_text)
            .unwrap_or_default(),
        summary: AbstractShape::classify(lookup(body, &["Abstract", "AbstractText"])).render(),
    }
}

/// Parse and extract in one step
pub fn parse_metadata_from_xml(uid: &str, xml: &str) -> ArticleMetadata {
    extract_metadata(uid, &parse_document_tree(xml))
}

fn extract_title(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(title)) => title.clone(),
        // Titles with inline markup arrive as nested values
        Some(other) => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Join the present `Year`, `Month` and `Day` parts with `-`
///
/// Month and day are zero-padded to two digits; the year is used as-is.
fn format_publication_date(value: Option<&Value>) -> String {
    let Some(date) = value else {
        return String::new();
    };

    let year = lookup(date, &["Year"]).and_then(scalar_text);
    let month = lookup(date, &["Month"]).and_then(scalar_text).map(pad2);
    let day = lookup(date, &["Day"]).and_then(scalar_text).map(pad2);

    [year, month, day]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn pad2(part: String) -> String {
    format!("{part:0>2}")
}
