//! Rendering of raw vector-search hits.
//!
//! Pure functions: hits go in, text or structured items come out. Hits
//! that are not objects or carry no usable score are skipped and reported
//! as diagnostics; nothing here fails.

use std::fmt::Write as _;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const NO_RESULTS: &str = "No relevant documents found in the knowledge base.";

/// The two indexed collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Per-page summaries
    Pages,
    /// Text chunks with source locations
    Chunks,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pages => "pages",
            Self::Chunks => "chunks",
        }
    }

    /// The `type` tag of structured items from this collection.
    pub fn item_type(self) -> ItemType {
        match self {
            Self::Pages => ItemType::Page,
            Self::Chunks => ItemType::Chunk,
        }
    }

    /// The field holding the item's main text.
    fn content_field(self) -> &'static str {
        match self {
            Self::Pages => "summary",
            Self::Chunks => "chunk_text",
        }
    }

    fn section_title(self) -> &'static str {
        match self {
            Self::Pages => "RELEVANT PAGES:",
            Self::Chunks => "DETAILED CONTENT:",
        }
    }
}

impl FromStr for Collection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pages" => Ok(Self::Pages),
            "chunks" => Ok(Self::Chunks),
            other => Err(format!(
                "unknown collection '{other}' (expected \"pages\" or \"chunks\")"
            )),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Page,
    Chunk,
}

/// Hits from one collection, in the order the store returned them.
#[derive(Debug, Clone)]
pub struct RawResults {
    pub collection: Collection,
    pub hits: Vec<Value>,
}

impl RawResults {
    pub fn new(collection: Collection, hits: Vec<Value>) -> Self {
        Self { collection, hits }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatMode {
    Text { include_scores: bool },
    Structured,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Formatted {
    Text(String),
    Structured(StructuredResult),
}

/// Items for a UI, best match first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StructuredResult {
    pub items: Vec<ResultItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultItem {
    #[serde(rename = "type")]
    pub kind: ItemType,
    pub score: f64,
    pub metadata: Map<String, Value>,
    pub content: String,
}

/// A hit that passed validation.
struct Hit<'a> {
    score: f64,
    fields: &'a Map<String, Value>,
}

fn valid_hits(batch: &RawResults) -> (Vec<Hit<'_>>, usize) {
    let mut hits = Vec::with_capacity(batch.hits.len());
    let mut skipped = 0;
    for raw in &batch.hits {
        let usable = raw.as_object().and_then(|fields| {
            let score = fields.get("score")?.as_f64().filter(|s| s.is_finite())?;
            Some(Hit { score, fields })
        });
        match usable {
            Some(hit) => hits.push(hit),
            None => skipped += 1,
        }
    }
    (hits, skipped)
}

/// Render a field the way it reads in text, `N/A` when absent or empty.
fn field(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        None | Some(Value::Null) => "N/A".into(),
        Some(Value::String(s)) if s.is_empty() => "N/A".into(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn text_of(fields: &Map<String, Value>, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

fn render_batch(batch: &RawResults, include_scores: bool) -> String {
    let (hits, _) = valid_hits(batch);
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    hits.iter()
        .enumerate()
        .map(|(index, hit)| {
            let mut block = format!("[Result {}]", index + 1);
            if include_scores {
                let _ = write!(block, " (Similarity: {:.1}%)", hit.score * 100.0);
            }
            block.push('\n');

            let f = hit.fields;
            match batch.collection {
                Collection::Pages => {
                    let _ = write!(
                        block,
                        "File: {}\nPage: {}\nSummary:\n{}\n\n---",
                        field(f, "file_id"),
                        field(f, "local_page_num"),
                        text_of(f, "summary"),
                    );
                }
                Collection::Chunks => {
                    let _ = write!(
                        block,
                        "Source: {} (Page {})\nLocation: {}\n\nContent:\n{}\n\n---",
                        field(f, "filename"),
                        field(f, "page"),
                        field(f, "location"),
                        text_of(f, "chunk_text"),
                    );
                }
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn format_text(batches: &[RawResults], include_scores: bool) -> String {
    match batches {
        [] => NO_RESULTS.to_string(),
        [single] => render_batch(single, include_scores),
        many => many
            .iter()
            .map(|batch| {
                format!(
                    "{}\n\n{}",
                    batch.collection.section_title(),
                    render_batch(batch, include_scores)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn format_structured(batches: &[RawResults]) -> StructuredResult {
    let mut result = StructuredResult::default();

    for batch in batches {
        let (hits, skipped) = valid_hits(batch);
        if skipped > 0 {
            result.diagnostics.push(format!(
                "skipped {skipped} malformed {} result(s)",
                batch.collection
            ));
        }
        if hits.is_empty() {
            result
                .diagnostics
                .push(format!("no usable {} results", batch.collection));
            continue;
        }

        let content_field = batch.collection.content_field();
        result.items.extend(hits.into_iter().map(|hit| {
            let metadata: Map<String, Value> = hit
                .fields
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "score" | "embedding") && k.as_str() != content_field)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            ResultItem {
                kind: batch.collection.item_type(),
                score: hit.score,
                metadata,
                content: text_of(hit.fields, content_field),
            }
        }));
    }

    result
        .items
        .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    result
}

/// Format one or more result batches.
pub fn format(batches: &[RawResults], mode: FormatMode) -> Formatted {
    match mode {
        FormatMode::Text { include_scores } => Formatted::Text(format_text(batches, include_scores)),
        FormatMode::Structured => Formatted::Structured(format_structured(batches)),
    }
}

/// Shorthand for [`format`] in text mode.
pub fn format_text_results(batches: &[RawResults], include_scores: bool) -> String {
    format_text(batches, include_scores)
}

/// Shorthand for [`format`] in structured mode.
pub fn format_structured_results(batches: &[RawResults]) -> StructuredResult {
    format_structured(batches)
}
