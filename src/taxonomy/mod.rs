//! Subject → topic → subtopic hierarchy.
//!
//! The taxonomy is plain immutable data, constructed once at start-up and
//! shared through `AppState`. Aggregators take it by reference so tests can
//! substitute a smaller tree.

pub mod handlers;
pub mod standard;

use serde::Serialize;
use std::collections::HashSet;

pub use handlers::configure_taxonomy_routes;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TaxonomyError {
    #[error("Duplicate leaf topic: {0}")]
    DuplicateLeaf(String),
    #[error("Topic {0} has no subtopics")]
    EmptyTopic(String),
    #[error("Duplicate subject: {0}")]
    DuplicateSubject(String),
}

/// A top-level topic (strand) and its leaf subtopics.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TopicNode {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Children")]
    pub subtopics: Vec<String>,
}

impl TopicNode {
    pub fn new(name: impl Into<String>, subtopics: &[&str]) -> Self {
        Self {
            name: name.into(),
            subtopics: subtopics.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubjectNode {
    pub name: String,
    pub topics: Vec<TopicNode>,
}

impl SubjectNode {
    pub fn new(name: impl Into<String>, topics: Vec<TopicNode>) -> Self {
        Self {
            name: name.into(),
            topics,
        }
    }
}

/// Where a leaf sits in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement<'a> {
    pub subject: &'a SubjectNode,
    pub topic: &'a TopicNode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Taxonomy {
    subjects: Vec<SubjectNode>,
}

impl Taxonomy {
    /// Validates that leaf names are unique across the whole tree, since
    /// they are used as map keys by every aggregation.
    pub fn new(subjects: Vec<SubjectNode>) -> Result<Self, TaxonomyError> {
        let mut seen_subjects = HashSet::new();
        let mut seen_leaves = HashSet::new();

        for subject in &subjects {
            if !seen_subjects.insert(subject.name.as_str()) {
                return Err(TaxonomyError::DuplicateSubject(subject.name.clone()));
            }
            for topic in &subject.topics {
                if topic.subtopics.is_empty() {
                    return Err(TaxonomyError::EmptyTopic(topic.name.clone()));
                }
                for leaf in &topic.subtopics {
                    if !seen_leaves.insert(leaf.as_str()) {
                        return Err(TaxonomyError::DuplicateLeaf(leaf.clone()));
                    }
                }
            }
        }

        Ok(Self { subjects })
    }

    pub fn subjects(&self) -> &[SubjectNode] {
        &self.subjects
    }

    pub fn subject(&self, name: &str) -> Option<&SubjectNode> {
        self.subjects
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Top-level topics in declaration order, subject by subject.
    pub fn strands(&self) -> impl Iterator<Item = Placement<'_>> {
        self.subjects.iter().flat_map(|subject| {
            subject
                .topics
                .iter()
                .map(move |topic| Placement { subject, topic })
        })
    }

    pub fn leaves(&self) -> impl Iterator<Item = &str> {
        self.strands()
            .flat_map(|p| p.topic.subtopics.iter().map(String::as_str))
    }

    pub fn placement_of(&self, leaf: &str) -> Option<Placement<'_>> {
        self.strands()
            .find(|p| p.topic.subtopics.iter().any(|s| s == leaf))
    }

    pub fn contains_leaf(&self, leaf: &str) -> bool {
        self.placement_of(leaf).is_some()
    }
}
