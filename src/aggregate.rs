//! Collection-level entry points: counting across documents, concurrent
//! extraction, and tabulation of candidates for export.

use crate::candidate::{CandidateSkill, SkillCounts};
use crate::document::Document;
use crate::error::{Result, SkillError};
use crate::extractors::SkillExtractor;
use polars::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Totals over a document collection, with the documents that were skipped.
#[derive(Debug, Default)]
pub struct CollectionCounts {
    pub counts: SkillCounts,
    /// Documents whose candidates were counted
    pub processed: usize,
    /// (document id, error) for every skipped document
    pub failures: Vec<(String, SkillError)>,
}

/// Fold `document_skill_counts` over a collection.
///
/// A document that fails is logged and skipped; it never stops the
/// remaining documents from being counted.
pub fn collection_skill_counts<'d, E, I>(extractor: &E, documents: I) -> CollectionCounts
where
    E: SkillExtractor + ?Sized,
    I: IntoIterator<Item = &'d Arc<Document>>,
{
    let mut result = CollectionCounts::default();

    for document in documents {
        match extractor.document_skill_counts(document) {
            Ok(counts) => {
                result.counts.merge(&counts);
                result.processed += 1;
            }
            Err(e) => {
                tracing::warn!(
                    extractor = extractor.name(),
                    "Skipping document {}: {}",
                    document.id,
                    e
                );
                result.failures.push((document.id.clone(), e));
            }
        }
    }

    tracing::info!(
        extractor = extractor.name(),
        processed = result.processed,
        skipped = result.failures.len(),
        distinct_skills = result.counts.len(),
        "Counted candidate skills"
    );
    result
}

/// Outcome of extracting one document.
#[derive(Debug)]
pub struct DocumentResult {
    pub document_id: String,
    /// That document's complete, ordered candidate list, or why it failed
    pub outcome: Result<Vec<CandidateSkill>>,
}

/// Extract every document on blocking worker threads, keeping up to
/// `concurrency` documents in flight.
///
/// A new document starts as soon as any worker finishes, so one slow
/// document does not hold back the rest. Results come back in input order
/// and each document's candidates are never interleaved with another's.
pub async fn extract_concurrently(
    extractor: Arc<dyn SkillExtractor>,
    documents: Vec<Arc<Document>>,
    concurrency: usize,
) -> Result<Vec<DocumentResult>> {
    if concurrency == 0 {
        return Err(SkillError::Config("concurrency must be at least 1".to_string()));
    }

    let mut slots: Vec<Option<DocumentResult>> = Vec::new();
    slots.resize_with(documents.len(), || None);

    let mut pending = documents.into_iter().enumerate();
    let mut workers = JoinSet::new();
    for (index, document) in pending.by_ref().take(concurrency) {
        spawn_extraction(&mut workers, &extractor, index, document);
    }

    while let Some(joined) = workers.join_next().await {
        let (index, result) =
            joined.map_err(|e| SkillError::Task(format!("Extraction worker failed: {}", e)))?;
        if let Err(e) = &result.outcome {
            tracing::warn!("Extraction failed for document {}: {}", result.document_id, e);
        }
        slots[index] = Some(result);

        if let Some((index, document)) = pending.next() {
            spawn_extraction(&mut workers, &extractor, index, document);
        }
    }

    let results: Vec<DocumentResult> = slots.into_iter().flatten().collect();
    tracing::debug!(
        extractor = extractor.name(),
        "Extracted {} documents",
        results.len()
    );
    Ok(results)
}

fn spawn_extraction(
    workers: &mut JoinSet<(usize, DocumentResult)>,
    extractor: &Arc<dyn SkillExtractor>,
    index: usize,
    document: Arc<Document>,
) {
    let extractor = Arc::clone(extractor);
    workers.spawn_blocking(move || {
        let outcome = extractor
            .candidate_skills(&document)
            .map(|candidates| candidates.collect::<Vec<_>>());
        let result = DocumentResult {
            document_id: document.id.clone(),
            outcome,
        };
        (index, result)
    });
}

/// Tabulate candidates: `job title`, `matched skill`, `skill name`,
/// `context`, `start index`, `confidence`, `extractor`.
///
/// The title is read from `title_field` of each candidate's source document.
pub fn candidates_frame<'c, I>(candidates: I, title_field: &str) -> Result<DataFrame>
where
    I: IntoIterator<Item = &'c CandidateSkill>,
{
    let mut titles: Vec<Option<String>> = Vec::new();
    let mut matched: Vec<Option<String>> = Vec::new();
    let mut names: Vec<String> = Vec::new();
    let mut contexts: Vec<String> = Vec::new();
    let mut starts: Vec<u64> = Vec::new();
    let mut confidences: Vec<Option<f64>> = Vec::new();
    let mut extractors: Vec<String> = Vec::new();

    for candidate in candidates {
        titles.push(candidate.source_object().field_str(title_field).map(str::to_string));
        matched.push(candidate.matched_skill_identifier().map(str::to_string));
        names.push(candidate.skill_name().to_string());
        contexts.push(candidate.context().to_string());
        starts.push(candidate.start_index() as u64);
        confidences.push(candidate.confidence());
        extractors.push(candidate.skill_extractor_name().to_string());
    }

    Ok(DataFrame::new(vec![
        Series::new("job title", titles),
        Series::new("matched skill", matched),
        Series::new("skill name", names),
        Series::new("context", contexts),
        Series::new("start index", starts),
        Series::new("confidence", confidences),
        Series::new("extractor", extractors),
    ])?)
}

/// Write a frame as CSV with a header row.
pub fn write_csv(frame: &mut DataFrame, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut file = std::fs::File::create(path)?;
    CsvWriter::new(&mut file).finish(frame)?;
    tracing::info!("Wrote {} rows to {}", frame.height(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractionConfig;
    use crate::extractors::NounPhraseEndingExtractor;

    fn extractor() -> NounPhraseEndingExtractor {
        let config = ExtractionConfig {
            only_bulleted_lines: false,
            text_fields: vec!["description".to_string()],
            ..ExtractionConfig::default()
        };
        NounPhraseEndingExtractor::skills(&config).unwrap()
    }

    #[test]
    fn test_bad_documents_are_skipped() {
        let documents = vec![
            Arc::new(Document::from_text("a", "description", "Typing skills\nFiling skills")),
            Arc::new(Document::from_text("b", "title", "Clerk")),
            Arc::new(Document::from_text("c", "description", "Typing skills")),
        ];

        let result = collection_skill_counts(&extractor(), &documents);
        assert_eq!(result.processed, 2);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].0, "b");
        assert!(result.failures[0].1.is_document_error());
        assert_eq!(result.counts.get("Typing skills"), 2);
        assert_eq!(result.counts.get("Filing skills"), 1);
    }

    #[test]
    fn test_candidates_frame_columns() {
        let mut document = Document::from_text("a", "description", "Typing skills");
        document
            .fields
            .insert("title".to_string(), serde_json::Value::String("Clerk".to_string()));
        let document = Arc::new(document);
        let candidates: Vec<_> = extractor().candidate_skills(&document).unwrap().collect();

        let frame = candidates_frame(&candidates, "title").unwrap();
        assert_eq!(frame.height(), 1);
        assert_eq!(
            frame.get_column_names(),
            vec!["job title", "matched skill", "skill name", "context", "start index", "confidence", "extractor"]
        );
        let titles = frame.column("job title").unwrap().str().unwrap();
        assert_eq!(titles.get(0), Some("Clerk"));
        assert_eq!(frame.column("confidence").unwrap().null_count(), 1);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_rejected() {
        let extractor: Arc<dyn SkillExtractor> = Arc::new(extractor());
        let err = extract_concurrently(extractor, Vec::new(), 0).await.unwrap_err();
        assert!(matches!(err, SkillError::Config(_)));
    }
}
