use super::types::{Competency, EdgeMetadata, EdgeRecord, EdgeRef, Occupation};
use crate::error::{Result, SkillError};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;

/// Competencies and occupations connected by "occupation uses competency" edges.
///
/// Nodes live in arenas shared through `Arc`; edges are plain index records.
/// Instances are never mutated after construction: filtering rebuilds a new
/// arena and index, so a base ontology can be matched and filtered from many
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct CompetencyOntology {
    competencies: Vec<Arc<Competency>>,
    occupations: Vec<Arc<Occupation>>,
    edges: Vec<EdgeRecord>,

    /// Map from competency identifier to arena index
    competency_index: HashMap<String, usize>,

    /// Map from occupation identifier to arena index
    occupation_index: HashMap<String, usize>,

    /// Occupation arena index -> competency arena indexes (deduplicated, edge order)
    adjacency: Vec<Vec<usize>>,
}

/// Node and edge counts of an ontology.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OntologySummary {
    pub competencies: usize,
    pub occupations: usize,
    pub edges: usize,
}

impl std::fmt::Display for OntologySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} competencies, {} occupations, {} edges",
            self.competencies, self.occupations, self.edges
        )
    }
}

impl CompetencyOntology {
    pub fn builder() -> OntologyBuilder {
        OntologyBuilder::default()
    }

    /// Assemble an ontology from arenas that are already consistent.
    fn from_parts(
        competencies: Vec<Arc<Competency>>,
        occupations: Vec<Arc<Occupation>>,
        edges: Vec<EdgeRecord>,
    ) -> Self {
        let competency_index = competencies
            .iter()
            .enumerate()
            .map(|(i, c)| (c.identifier.clone(), i))
            .collect();
        let occupation_index = occupations
            .iter()
            .enumerate()
            .map(|(i, o)| (o.identifier.clone(), i))
            .collect();

        let mut adjacency = vec![Vec::new(); occupations.len()];
        for edge in &edges {
            let linked: &mut Vec<usize> = &mut adjacency[edge.occupation];
            if !linked.contains(&edge.competency) {
                linked.push(edge.competency);
            }
        }

        Self {
            competencies,
            occupations,
            edges,
            competency_index,
            occupation_index,
            adjacency,
        }
    }

    /// All competencies, in insertion order. Call again to restart.
    pub fn competencies(&self) -> impl Iterator<Item = &Competency> + '_ {
        self.competencies.iter().map(|c| c.as_ref())
    }

    /// All occupations, in insertion order. Call again to restart.
    pub fn occupations(&self) -> impl Iterator<Item = &Occupation> + '_ {
        self.occupations.iter().map(|o| o.as_ref())
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef<'_>> + '_ {
        self.edges.iter().map(move |record| self.edge_ref(record))
    }

    fn edge_ref<'a>(&'a self, record: &'a EdgeRecord) -> EdgeRef<'a> {
        EdgeRef {
            occupation: &self.occupations[record.occupation],
            competency: &self.competencies[record.competency],
            metadata: &record.metadata,
        }
    }

    pub fn competency(&self, identifier: &str) -> Option<&Competency> {
        self.competency_index
            .get(identifier)
            .map(|&i| self.competencies[i].as_ref())
    }

    pub fn occupation(&self, identifier: &str) -> Option<&Occupation> {
        self.occupation_index
            .get(identifier)
            .map(|&i| self.occupations[i].as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.competencies.is_empty() && self.occupations.is_empty()
    }

    /// Resolve an occupation tag to occupations.
    ///
    /// An exact code (or identifier) match wins. Otherwise the tag is treated
    /// as a truncated classification prefix and every occupation in that
    /// broader group is returned. Empty when nothing resolves.
    pub fn occupations_with_code(&self, tag: &str) -> Vec<&Occupation> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Vec::new();
        }

        let exact: Vec<&Occupation> = self
            .occupations()
            .filter(|o| o.code == tag || o.identifier == tag)
            .collect();
        if !exact.is_empty() {
            return exact;
        }

        self.occupations()
            .filter(|o| o.code.starts_with(tag))
            .collect()
    }

    /// Competencies linked to an occupation by at least one edge.
    pub fn competencies_for_occupation(&self, occupation_id: &str) -> Vec<&Competency> {
        match self.occupation_index.get(occupation_id) {
            Some(&occ) => self.adjacency[occ]
                .iter()
                .map(|&c| self.competencies[c].as_ref())
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn competencies_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a Competency> + 'a {
        self.competencies().filter(move |c| c.in_category(category))
    }

    pub fn categories(&self) -> BTreeSet<&str> {
        self.competencies()
            .flat_map(|c| c.categories.iter().map(String::as_str))
            .collect()
    }

    /// Keep only edges satisfying `predicate`.
    ///
    /// Returns a new ontology whose nodes are exactly those referenced by the
    /// surviving edges. A predicate that matches nothing yields an empty
    /// ontology. `self` is left untouched.
    pub fn filter_by<F>(&self, mut predicate: F) -> CompetencyOntology
    where
        F: FnMut(&EdgeRef<'_>) -> bool,
    {
        match self.try_filter_by(|edge| Ok::<bool, Infallible>(predicate(edge))) {
            Ok(filtered) => filtered,
            Err(never) => match never {},
        }
    }

    /// Like [`filter_by`](Self::filter_by) with a fallible predicate; the
    /// first predicate error is returned unchanged.
    pub fn try_filter_by<E, F>(&self, mut predicate: F) -> std::result::Result<CompetencyOntology, E>
    where
        F: FnMut(&EdgeRef<'_>) -> std::result::Result<bool, E>,
    {
        let mut surviving = Vec::new();
        for record in &self.edges {
            if predicate(&self.edge_ref(record))? {
                surviving.push(record);
            }
        }

        // Remap arena indexes, preserving the original relative order
        let mut competency_map: Vec<Option<usize>> = vec![None; self.competencies.len()];
        let mut occupation_map: Vec<Option<usize>> = vec![None; self.occupations.len()];
        for record in &surviving {
            competency_map[record.competency] = Some(0);
            occupation_map[record.occupation] = Some(0);
        }

        let mut competencies = Vec::new();
        for (i, slot) in competency_map.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(competencies.len());
                competencies.push(Arc::clone(&self.competencies[i]));
            }
        }
        let mut occupations = Vec::new();
        for (i, slot) in occupation_map.iter_mut().enumerate() {
            if slot.is_some() {
                *slot = Some(occupations.len());
                occupations.push(Arc::clone(&self.occupations[i]));
            }
        }

        let edges = surviving
            .into_iter()
            .filter_map(|record| {
                Some(EdgeRecord {
                    occupation: occupation_map[record.occupation]?,
                    competency: competency_map[record.competency]?,
                    metadata: record.metadata.clone(),
                })
            })
            .collect();

        Ok(Self::from_parts(competencies, occupations, edges))
    }

    pub fn summary(&self) -> OntologySummary {
        OntologySummary {
            competencies: self.competencies.len(),
            occupations: self.occupations.len(),
            edges: self.edges.len(),
        }
    }

    /// Log node and edge counts.
    pub fn print_summary_stats(&self) -> OntologySummary {
        let summary = self.summary();
        tracing::info!(
            competencies = summary.competencies,
            occupations = summary.occupations,
            edges = summary.edges,
            categories = self.categories().len(),
            "Ontology summary: {}",
            summary
        );
        summary
    }
}

impl PartialEq for CompetencyOntology {
    fn eq(&self, other: &Self) -> bool {
        self.competencies == other.competencies
            && self.occupations == other.occupations
            && self.edges().map(|e| (&e.occupation.identifier, &e.competency.identifier, e.metadata)).eq(
                other
                    .edges()
                    .map(|e| (&e.occupation.identifier, &e.competency.identifier, e.metadata)),
            )
    }
}

/// Collects nodes and edges and validates them into a [`CompetencyOntology`].
#[derive(Debug, Clone, Default)]
pub struct OntologyBuilder {
    competencies: Vec<Competency>,
    occupations: Vec<Occupation>,
    edges: Vec<(String, String, EdgeMetadata)>,
}

impl OntologyBuilder {
    pub fn add_competency(&mut self, competency: Competency) -> &mut Self {
        self.competencies.push(competency);
        self
    }

    pub fn add_occupation(&mut self, occupation: Occupation) -> &mut Self {
        self.occupations.push(occupation);
        self
    }

    pub fn add_edge(
        &mut self,
        occupation_id: impl Into<String>,
        competency_id: impl Into<String>,
        metadata: EdgeMetadata,
    ) -> &mut Self {
        self.edges.push((occupation_id.into(), competency_id.into(), metadata));
        self
    }

    /// Validate and build. Duplicate node identifiers and edges naming
    /// unknown nodes are rejected; repeated identical edges collapse to one.
    pub fn build(&self) -> Result<CompetencyOntology> {
        let mut competency_index = HashMap::new();
        for (i, competency) in self.competencies.iter().enumerate() {
            if competency.identifier.trim().is_empty() {
                return Err(SkillError::Ontology(format!(
                    "Competency '{}' has an empty identifier",
                    competency.name
                )));
            }
            if competency_index.insert(competency.identifier.as_str(), i).is_some() {
                return Err(SkillError::Ontology(format!(
                    "Duplicate competency identifier: {}",
                    competency.identifier
                )));
            }
        }

        let mut occupation_index = HashMap::new();
        for (i, occupation) in self.occupations.iter().enumerate() {
            if occupation_index.insert(occupation.identifier.as_str(), i).is_some() {
                return Err(SkillError::Ontology(format!(
                    "Duplicate occupation identifier: {}",
                    occupation.identifier
                )));
            }
        }

        let mut seen = HashSet::new();
        let mut edges = Vec::with_capacity(self.edges.len());
        for (occupation_id, competency_id, metadata) in &self.edges {
            let occupation = *occupation_index.get(occupation_id.as_str()).ok_or_else(|| {
                SkillError::Ontology(format!(
                    "Edge references unknown occupation '{}' (competency '{}')",
                    occupation_id, competency_id
                ))
            })?;
            let competency = *competency_index.get(competency_id.as_str()).ok_or_else(|| {
                SkillError::Ontology(format!(
                    "Edge references unknown competency '{}' (occupation '{}')",
                    competency_id, occupation_id
                ))
            })?;

            let record = EdgeRecord {
                occupation,
                competency,
                metadata: metadata.clone(),
            };
            if seen.insert(record.clone()) {
                edges.push(record);
            }
        }

        let ontology = CompetencyOntology::from_parts(
            self.competencies.iter().cloned().map(Arc::new).collect(),
            self.occupations.iter().cloned().map(Arc::new).collect(),
            edges,
        );
        tracing::debug!("Built ontology: {}", ontology.summary());
        Ok(ontology)
    }
}
