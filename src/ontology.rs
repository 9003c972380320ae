//! Disease ontology loaded from an OBO-style definition file.
//!
//! Only `[Term]` stanzas are read. Every `is_a: <id> ! <name>` line becomes a
//! [`Relationship`] of the term to its parent. The graph is immutable after
//! loading and is shared read-only by the merge step.

use crate::error::OntologyError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    IsA,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub subject: String,
    pub kind: RelationshipKind,
    pub object: String,
}

#[derive(Debug, Clone)]
pub struct DiseaseTerm {
    pub id: String,
    pub name: String,
    /// All `key: value` lines of the stanza in file order per key.
    pub fields: BTreeMap<String, Vec<String>>,
    pub relationships: Vec<Relationship>,
}

impl DiseaseTerm {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Ids of the direct `is_a` parents.
    pub fn parents(&self) -> impl Iterator<Item = &str> {
        self.relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::IsA)
            .map(|r| r.object.as_str())
    }
}

impl PartialEq for DiseaseTerm {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DiseaseTerm {}

impl Hash for DiseaseTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Ways to look a term up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermQuery<'a> {
    /// Full id such as `DOID:4947`
    Id(&'a str),
    /// Numeric part of an id, `4947`
    Number(u64),
    /// Case-insensitive term name
    Name(&'a str),
}

impl<'a> From<&'a str> for TermQuery<'a> {
    fn from(query: &'a str) -> Self {
        let query = query.trim();
        if query.contains(':') {
            TermQuery::Id(query)
        } else if let Ok(number) = query.parse::<u64>() {
            TermQuery::Number(number)
        } else {
            TermQuery::Name(query)
        }
    }
}

impl<'a> From<&'a String> for TermQuery<'a> {
    fn from(query: &'a String) -> Self {
        TermQuery::from(query.as_str())
    }
}

impl From<u64> for TermQuery<'_> {
    fn from(number: u64) -> Self {
        TermQuery::Number(number)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiseaseOntology {
    terms: Vec<DiseaseTerm>,
    by_id: HashMap<String, usize>,
    by_number: HashMap<u64, usize>,
    by_name: HashMap<String, usize>,
}

impl DiseaseOntology {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, OntologyError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(&id.to_ascii_lowercase())
    }

    pub fn terms(&self) -> impl Iterator<Item = &DiseaseTerm> {
        self.terms.iter()
    }

    /// Resolve a term by id, numeric id suffix or name. Absent terms yield `None`.
    pub fn get<'q, Q: Into<TermQuery<'q>>>(&self, query: Q) -> Option<&DiseaseTerm> {
        self.index_of(query.into()).map(|idx| &self.terms[idx])
    }

    fn index_of(&self, query: TermQuery<'_>) -> Option<usize> {
        match query {
            TermQuery::Id(id) => self.by_id.get(&id.to_ascii_lowercase()).copied(),
            TermQuery::Number(number) => self.by_number.get(&number).copied(),
            TermQuery::Name(name) => self.by_name.get(&name.to_lowercase()).copied(),
        }
    }

    /// All terms reachable from the query over `is_a` edges.
    ///
    /// Unresolved queries give an empty set. The traversal keeps a visited set
    /// and therefore terminates on cyclic input as well.
    pub fn get_all_ancestors<'q, Q: Into<TermQuery<'q>>>(
        &self,
        query: Q,
        include_self: bool,
    ) -> HashSet<&DiseaseTerm> {
        let mut ancestors = HashSet::new();
        let Some(start) = self.index_of(query.into()) else {
            return ancestors;
        };

        if include_self {
            ancestors.insert(&self.terms[start]);
        }

        let mut visited = HashSet::from([start]);
        let mut stack = vec![start];

        while let Some(current) = stack.pop() {
            for parent_id in self.terms[current].parents() {
                let Some(parent) = self.index_of(TermQuery::Id(parent_id)) else {
                    log::debug!(
                        "Term {} refers to unknown parent {}",
                        self.terms[current].id,
                        parent_id
                    );
                    continue;
                };
                if visited.insert(parent) {
                    ancestors.insert(&self.terms[parent]);
                    stack.push(parent);
                }
            }
        }

        ancestors
    }

    /// Ids of the ancestors, lower-cased for case-insensitive membership tests.
    pub fn ancestor_ids<'q, Q: Into<TermQuery<'q>>>(
        &self,
        query: Q,
        include_self: bool,
    ) -> HashSet<String> {
        self.get_all_ancestors(query, include_self)
            .into_iter()
            .map(|t| t.id.to_ascii_lowercase())
            .collect()
    }

    fn insert(&mut self, term: DiseaseTerm) -> Result<(), OntologyError> {
        let key = term.id.to_ascii_lowercase();
        if self.by_id.contains_key(&key) {
            return Err(OntologyError::DuplicateId(term.id));
        }

        let idx = self.terms.len();
        self.by_id.insert(key, idx);

        if let Some(number) = term
            .id
            .rsplit_once(':')
            .and_then(|(_, suffix)| suffix.parse::<u64>().ok())
        {
            self.by_number.entry(number).or_insert(idx);
        }

        if !term.name.is_empty() {
            self.by_name.entry(term.name.to_lowercase()).or_insert(idx);
        }

        self.terms.push(term);
        Ok(())
    }
}

impl FromStr for DiseaseOntology {
    type Err = OntologyError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut ontology = DiseaseOntology::default();
        let mut stanza: Option<StanzaBuilder> = None;
        let mut in_term = false;

        for (idx, raw_line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw_line.trim();

            if line.starts_with('[') && line.ends_with(']') {
                if let Some(builder) = stanza.take() {
                    ontology.insert(builder.finish(line_no - 1)?)?;
                }
                in_term = line == "[Term]";
                if in_term {
                    stanza = Some(StanzaBuilder::default());
                }
                continue;
            }

            if line.is_empty() {
                if let Some(builder) = stanza.take() {
                    ontology.insert(builder.finish(line_no)?)?;
                }
                in_term = false;
                continue;
            }

            // header lines and non-term stanzas
            if !in_term || line.starts_with('!') {
                continue;
            }

            let (key, value) = line
                .split_once(": ")
                .or_else(|| line.split_once(':'))
                .ok_or_else(|| OntologyError::MalformedLine {
                    line: line_no,
                    content: raw_line.to_string(),
                })?;

            if let Some(builder) = stanza.as_mut() {
                builder.push(key.trim(), value.trim());
            }
        }

        if let Some(builder) = stanza.take() {
            ontology.insert(builder.finish(content.lines().count())?)?;
        }

        log::debug!("Loaded {} disease ontology terms", ontology.len());
        Ok(ontology)
    }
}

#[derive(Debug, Default)]
struct StanzaBuilder {
    fields: BTreeMap<String, Vec<String>>,
    parents: Vec<String>,
}

impl StanzaBuilder {
    fn push(&mut self, key: &str, value: &str) {
        if key == "is_a" {
            let parent = value.split(" ! ").next().unwrap_or(value).trim();
            self.parents.push(parent.to_string());
        }
        self.fields
            .entry(key.to_string())
            .or_default()
            .push(value.to_string());
    }

    fn finish(self, line_no: usize) -> Result<DiseaseTerm, OntologyError> {
        let id = self
            .fields
            .get("id")
            .and_then(|v| v.first())
            .cloned()
            .ok_or(OntologyError::MissingId(line_no))?;
        let name = self
            .fields
            .get("name")
            .and_then(|v| v.first())
            .cloned()
            .unwrap_or_default();

        let relationships = self
            .parents
            .into_iter()
            .map(|object| Relationship {
                subject: id.clone(),
                kind: RelationshipKind::IsA,
                object,
            })
            .collect();

        Ok(DiseaseTerm {
            id,
            name,
            fields: self.fields,
            relationships,
        })
    }
}
