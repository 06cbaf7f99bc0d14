//! Paper-conflict ontology vocabulary and Turtle export.

use oxrdf::vocab::{rdf, rdfs};
use oxrdf::{Literal, NamedNode, NamedNodeRef, Triple};
use oxttl::TurtleSerializer;

use dissonyx_common::{DissonyxError, Result};

use crate::store::KnowledgeStore;

pub const PCO_NAMESPACE: &str = "http://example.org/paper_conflict_ontology#";
pub const TOPIC_BASE: &str = "http://example.org/topic/";
pub const PAPER_BASE: &str = "http://example.org/paper/";
pub const CONFLICT_BASE: &str = "http://example.org/conflict/";

const OWL_NAMESPACE: &str = "http://www.w3.org/2002/07/owl#";
const OWL_OBJECT_PROPERTY: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#ObjectProperty");
const OWL_SYMMETRIC_PROPERTY: NamedNodeRef<'static> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#SymmetricProperty");

const PREFIXES: [(&str, &str); 5] = [
    ("owl", OWL_NAMESPACE),
    ("pco", PCO_NAMESPACE),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
];

pub fn topic_uri(id: &str) -> String {
    format!("{TOPIC_BASE}{}", urlencoding::encode(id))
}

pub fn paper_uri(id: &str) -> String {
    format!("{PAPER_BASE}{}", urlencoding::encode(id))
}

pub fn conflict_uri(key: &str) -> String {
    format!("{CONFLICT_BASE}{}", urlencoding::encode(key))
}

/// Term of the `pco:` vocabulary.
fn pco(local: &str) -> NamedNode {
    NamedNode::new_unchecked(format!("{PCO_NAMESPACE}{local}"))
}

fn node(iri: String) -> Result<NamedNode> {
    NamedNode::new(iri).map_err(|e| DissonyxError::Store(format!("invalid IRI: {e}")))
}

impl KnowledgeStore {
    /// Every statement of the store as RDF triples.
    ///
    /// `hasConflictWith` is materialised in both directions so consumers
    /// without a reasoner still see the symmetric closure. Scores are
    /// `xsd:float`.
    pub fn to_triples(&self) -> Result<Vec<Triple>> {
        let has_conflict_with = pco("hasConflictWith");
        let paper_class = pco("Paper");

        let mut triples = vec![
            Triple::new(has_conflict_with.clone(), rdf::TYPE, OWL_OBJECT_PROPERTY.into_owned()),
            Triple::new(has_conflict_with.clone(), rdf::TYPE, OWL_SYMMETRIC_PROPERTY.into_owned()),
            Triple::new(has_conflict_with.clone(), rdfs::DOMAIN, paper_class.clone()),
            Triple::new(has_conflict_with.clone(), rdfs::RANGE, paper_class.clone()),
        ];

        for topic in self.all_topics() {
            let subject = node(topic_uri(&topic.id))?;
            triples.push(Triple::new(subject.clone(), rdf::TYPE, pco("Topic")));
            triples.push(Triple::new(subject, pco("has_name"), Literal::new_simple_literal(topic.name)));
        }

        for paper in self.papers() {
            let subject = node(paper_uri(&paper.id))?;
            triples.push(Triple::new(subject.clone(), rdf::TYPE, paper_class.clone()));
            triples.push(Triple::new(subject.clone(), pco("has_name"), Literal::new_simple_literal(&paper.name)));
            triples.push(Triple::new(
                subject.clone(),
                pco("has_conclusion"),
                Literal::new_simple_literal(&paper.conclusion),
            ));
            for topic in &paper.topics {
                triples.push(Triple::new(subject.clone(), pco("has_topic"), node(topic_uri(topic))?));
            }
            for other in self.conflicting_papers(&paper.id) {
                triples.push(Triple::new(subject.clone(), has_conflict_with.clone(), node(paper_uri(&other))?));
            }
        }

        for conflict in self.conflicts() {
            let subject = node(conflict_uri(&conflict.key()))?;
            triples.push(Triple::new(subject.clone(), rdf::TYPE, pco("Conflict")));
            triples.push(Triple::new(
                subject.clone(),
                pco("has_conflicting_sentence_1"),
                Literal::new_simple_literal(&conflict.sentence1),
            ));
            triples.push(Triple::new(
                subject.clone(),
                pco("has_conflicting_sentence_2"),
                Literal::new_simple_literal(&conflict.sentence2),
            ));
            triples.push(Triple::new(
                subject.clone(),
                pco("has_distance_score"),
                Literal::from(conflict.similarity as f32),
            ));
            triples.push(Triple::new(
                subject.clone(),
                pco("has_conflict_score"),
                Literal::from(conflict.divergence as f32),
            ));
            triples.push(Triple::new(subject.clone(), pco("related_to_paper_1"), node(paper_uri(&conflict.paper1))?));
            triples.push(Triple::new(subject, pco("related_to_paper_2"), node(paper_uri(&conflict.paper2))?));
        }

        Ok(triples)
    }

    /// Render the store as Turtle.
    pub fn to_turtle(&self) -> Result<String> {
        let mut serializer = TurtleSerializer::new();
        for (prefix, iri) in PREFIXES {
            serializer = serializer
                .with_prefix(prefix, iri)
                .map_err(|e| DissonyxError::Store(format!("prefix {prefix}: {e}")))?;
        }

        let mut writer = serializer.for_writer(Vec::new());
        for triple in self.to_triples()? {
            writer.serialize_triple(&triple)?;
        }
        let bytes = writer.finish()?;
        String::from_utf8(bytes).map_err(|e| DissonyxError::Store(format!("turtle output: {e}")))
    }
}
