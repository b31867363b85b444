use polars::prelude::*;
use serde_json::json;
use skillmatch::extractors::CandidateSkills;
use skillmatch::{
    candidates_frame, collection_skill_counts, extract_concurrently, read_json_lines, write_csv, Competency,
    CandidateSkill, Document, DocumentType, ExactMatchSkillExtractor, ExtractionConfig, NounPhraseEndingExtractor,
    SkillError, SkillExtractor,
};
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn config() -> ExtractionConfig {
    ExtractionConfig {
        text_fields: vec!["description".to_string()],
        ..ExtractionConfig::default()
    }
}

fn postings() -> Vec<Arc<Document>> {
    let records = vec![
        json!({ "id": "a", "title": "Cashier", "description": "Store cashier\n- Customer service skills\n- Cash handling skills" }),
        json!({ "id": "b", "title": "Clerk", "description": "Office clerk\n- Typing skills\n- Customer service skills" }),
        json!({ "id": "c", "title": "Driver" }),
        json!({ "id": "d", "title": "Nurse", "description": "Nurse\n- Customer service skills\n• Patient care skills" }),
        json!({ "id": "e", "title": "Welder", "description": "Welder with no bulleted requirements" }),
    ];
    records
        .into_iter()
        .map(|r| Arc::new(Document::from_json(r, "id", DocumentType::JobPosting).unwrap()))
        .collect()
}

#[test]
fn test_collection_counts_skip_bad_documents() {
    let extractor = NounPhraseEndingExtractor::skills(&config()).unwrap();
    let result = collection_skill_counts(&extractor, &postings());

    assert_eq!(result.processed, 4);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].0, "c");
    assert!(matches!(result.failures[0].1, SkillError::MissingField { .. }));

    assert_eq!(
        result.counts.most_common(2),
        vec![("Customer service skills".to_string(), 3), ("Cash handling skills".to_string(), 1)]
    );
    assert_eq!(result.counts.total(), 6);
}

#[tokio::test]
async fn test_concurrent_extraction_matches_sequential() {
    let extractor = NounPhraseEndingExtractor::skills(&config()).unwrap();
    let documents = postings();

    let sequential: Vec<Option<Vec<String>>> = documents
        .iter()
        .map(|d| {
            extractor
                .candidate_skills(d)
                .ok()
                .map(|c| c.map(|c| c.skill_name().to_string()).collect())
        })
        .collect();

    let shared: Arc<dyn SkillExtractor> = Arc::new(extractor);
    for concurrency in [1, 2, 3, 16] {
        let results = extract_concurrently(Arc::clone(&shared), documents.clone(), concurrency)
            .await
            .unwrap();

        let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"], "concurrency {}", concurrency);

        let concurrent: Vec<Option<Vec<String>>> = results
            .iter()
            .map(|r| {
                r.outcome
                    .as_ref()
                    .ok()
                    .map(|c| c.iter().map(|c| c.skill_name().to_string()).collect())
            })
            .collect();
        assert_eq!(concurrent, sequential, "concurrency {}", concurrency);
    }
}

#[tokio::test]
async fn test_concurrent_candidates_belong_to_their_document() {
    let competencies = vec![Competency::new("c1", "Customer Service"), Competency::new("c2", "Typing")];
    let extractor: Arc<dyn SkillExtractor> = Arc::new(ExactMatchSkillExtractor::new(&competencies, &config()).unwrap());

    let results = extract_concurrently(extractor, postings(), 2).await.unwrap();
    for result in &results {
        if let Ok(candidates) = &result.outcome {
            assert!(candidates.iter().all(|c| c.document_id() == result.document_id));
            let starts: Vec<usize> = candidates.iter().map(|c| c.start_index()).collect();
            assert!(starts.windows(2).all(|w| w[0] < w[1]));
        }
    }
    assert!(results[2].outcome.is_err());
    assert_eq!(results[1].outcome.as_ref().unwrap().len(), 2);
}

/// Emits the document id as its only candidate, stalling on the "slow" document.
#[derive(Default)]
struct StallingExtractor {
    finished: Mutex<Vec<String>>,
}

impl SkillExtractor for StallingExtractor {
    fn name(&self) -> &str {
        "stalling"
    }

    fn candidate_skills<'a>(&'a self, document: &Arc<Document>) -> skillmatch::Result<CandidateSkills<'a>> {
        if document.id == "slow" {
            thread::sleep(Duration::from_millis(300));
        }
        self.finished.lock().unwrap().push(document.id.clone());
        let candidate = CandidateSkill::new(document.id.clone(), "", 0, document, self.name());
        Ok(Box::new(std::iter::once(candidate)))
    }
}

#[tokio::test]
async fn test_slow_document_does_not_stall_other_workers() {
    let documents: Vec<Arc<Document>> = ["slow", "a", "b", "c", "d"]
        .iter()
        .map(|id| Arc::new(Document::from_json(json!({ "id": id }), "id", DocumentType::JobPosting).unwrap()))
        .collect();
    let extractor = Arc::new(StallingExtractor::default());

    let results = extract_concurrently(extractor.clone(), documents, 2).await.unwrap();

    // Every fast document finished on the free worker while "slow" was running
    let finished = extractor.finished.lock().unwrap().clone();
    assert_eq!(finished, vec!["a", "b", "c", "d", "slow"]);

    let ids: Vec<&str> = results.iter().map(|r| r.document_id.as_str()).collect();
    assert_eq!(ids, vec!["slow", "a", "b", "c", "d"]);
    for result in &results {
        let candidates = result.outcome.as_ref().unwrap();
        assert_eq!(candidates[0].skill_name(), result.document_id);
    }
}

#[test]
fn test_bad_corpus_line_does_not_lose_other_documents() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("postings.jsonl");
    fs::write(
        &path,
        "{\"id\": \"1\", \"description\": \"Clerk\\n- Typing skills\"}\n\
         {\"description\": \"- Filing skills\"}\n\
         \n\
         {\"id\": 3, \"description\": \"Clerk\\n- Typing skills\"}\n",
    )
    .unwrap();

    let batch = read_json_lines(&path, "id", DocumentType::JobPosting).unwrap();
    let ids: Vec<&str> = batch.documents.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(batch.documents[0].document_type, DocumentType::JobPosting);

    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].0, 2);
    assert!(matches!(batch.failures[0].1, SkillError::InvalidDocument(_)));

    let extractor = NounPhraseEndingExtractor::skills(&config()).unwrap();
    let result = collection_skill_counts(&extractor, &batch.documents);
    assert_eq!(result.processed, 2);
    assert_eq!(result.counts.get("Typing skills"), 2);
    assert_eq!(result.counts.get("Filing skills"), 0);
}

#[test]
fn test_export_candidate_table() {
    let extractor = NounPhraseEndingExtractor::skills(&config()).unwrap();
    let documents = postings();
    let candidates: Vec<_> = documents
        .iter()
        .filter_map(|d| extractor.candidate_skills(d).ok())
        .flatten()
        .collect();

    let mut frame = candidates_frame(&candidates, "title").unwrap();
    assert_eq!(frame.height(), 6);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("skill_match.csv");
    write_csv(&mut frame, &path).unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(str::to_string).collect();
    assert_eq!(
        headers,
        vec!["job title", "matched skill", "skill name", "context", "start index", "confidence", "extractor"]
    );

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), 6);
    assert_eq!(&rows[0][0], "Cashier");
    assert_eq!(&rows[0][2], "Customer service skills");
    assert_eq!(&rows[5][0], "Nurse");
    assert_eq!(&rows[5][6], "skill_ending_pattern");
}

#[test]
fn test_counts_frame_is_sorted() {
    let extractor = NounPhraseEndingExtractor::skills(&config()).unwrap();
    let counts = collection_skill_counts(&extractor, &postings()).counts;

    let frame = counts.into_frame().unwrap();
    let names = frame.column("skill name").unwrap().str().unwrap();
    assert_eq!(names.get(0), Some("Customer service skills"));
    let totals = frame.column("count").unwrap().u64().unwrap();
    assert_eq!(totals.get(0), Some(3));
}
