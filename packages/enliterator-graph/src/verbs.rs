//! The Verb Glossary: a closed, compile-time table of graph edge types.
//!
//! The glossary is the authoritative contract for Edge Loading. It is
//! represented as a static table rather than a dynamic/reflective lookup,
//! per the "Dynamic verb dispatch" design note: each entry carries its
//! source/target label constraint and its reverse/symmetric metadata
//! alongside the verb name itself.

/// Which labels a verb's source or target may bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMatch {
    Any,
    One(&'static str),
    AnyOf(&'static [&'static str]),
}

impl LabelMatch {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            LabelMatch::Any => true,
            LabelMatch::One(l) => *l == label,
            LabelMatch::AnyOf(ls) => ls.contains(&label),
        }
    }
}

/// One entry of the Verb Glossary (§4.4.4).
#[derive(Debug, Clone, Copy)]
pub struct VerbEntry {
    pub name: &'static str,
    pub source_label: LabelMatch,
    pub target_label: LabelMatch,
    pub reverse: Option<&'static str>,
    pub symmetric: bool,
}

/// The closed set of verbs recognized by Graph Assembly, plus `has_rights`
/// which every content-bearing entity additionally requires (§4.4.4 step 5).
pub const VERB_GLOSSARY: &[VerbEntry] = &[
    VerbEntry {
        name: "embodies",
        source_label: LabelMatch::One("Idea"),
        target_label: LabelMatch::One("Manifest"),
        reverse: Some("is_embodiment_of"),
        symmetric: false,
    },
    VerbEntry {
        name: "elicits",
        source_label: LabelMatch::One("Manifest"),
        target_label: LabelMatch::One("Experience"),
        reverse: Some("is_elicited_by"),
        symmetric: false,
    },
    VerbEntry {
        name: "influences",
        source_label: LabelMatch::AnyOf(&["Idea", "Emanation"]),
        target_label: LabelMatch::Any,
        reverse: Some("is_influenced_by"),
        symmetric: false,
    },
    VerbEntry {
        name: "refines",
        source_label: LabelMatch::One("Evolutionary"),
        target_label: LabelMatch::One("Idea"),
        reverse: Some("is_refined_by"),
        symmetric: false,
    },
    VerbEntry {
        name: "version_of",
        source_label: LabelMatch::One("Evolutionary"),
        target_label: LabelMatch::One("Manifest"),
        reverse: Some("has_version"),
        symmetric: false,
    },
    VerbEntry {
        name: "co_occurs_with",
        source_label: LabelMatch::One("Relational"),
        target_label: LabelMatch::One("Relational"),
        reverse: None,
        symmetric: true,
    },
    VerbEntry {
        name: "located_at",
        source_label: LabelMatch::One("Manifest"),
        target_label: LabelMatch::One("Spatial"),
        reverse: Some("hosts"),
        symmetric: false,
    },
    VerbEntry {
        name: "adjacent_to",
        source_label: LabelMatch::One("Spatial"),
        target_label: LabelMatch::One("Spatial"),
        reverse: None,
        symmetric: true,
    },
    VerbEntry {
        name: "validated_by",
        source_label: LabelMatch::One("Practical"),
        target_label: LabelMatch::One("Experience"),
        reverse: Some("validates"),
        symmetric: false,
    },
    VerbEntry {
        name: "supports",
        source_label: LabelMatch::One("Evidence"),
        target_label: LabelMatch::One("Idea"),
        reverse: None,
        symmetric: false,
    },
    VerbEntry {
        name: "refutes",
        source_label: LabelMatch::One("Evidence"),
        target_label: LabelMatch::One("Idea"),
        reverse: None,
        symmetric: false,
    },
    VerbEntry {
        name: "codifies",
        source_label: LabelMatch::One("Idea"),
        target_label: LabelMatch::One("Practical"),
        reverse: Some("derived_from"),
        symmetric: false,
    },
    VerbEntry {
        name: "feeds_back",
        source_label: LabelMatch::One("Emanation"),
        target_label: LabelMatch::One("Idea"),
        reverse: Some("is_fed_by"),
        symmetric: false,
    },
    VerbEntry {
        name: "has_rights",
        source_label: LabelMatch::Any,
        target_label: LabelMatch::One("ProvenanceAndRights"),
        reverse: None,
        symmetric: false,
    },
];

pub fn lookup(verb: &str) -> Option<&'static VerbEntry> {
    VERB_GLOSSARY.iter().find(|v| v.name == verb)
}

/// Cypher relationship type for a verb: the glossary's lowercase name,
/// uppercased (§6, "Persisted state layout").
pub fn edge_type(verb: &str) -> String {
    verb.to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embodies_reverses_to_is_embodiment_of() {
        let entry = lookup("embodies").unwrap();
        assert_eq!(entry.reverse, Some("is_embodiment_of"));
        assert!(!entry.symmetric);
    }

    #[test]
    fn symmetric_verbs_have_no_reverse() {
        for name in ["co_occurs_with", "adjacent_to"] {
            let entry = lookup(name).unwrap();
            assert!(entry.symmetric);
            assert!(entry.reverse.is_none());
        }
    }

    #[test]
    fn unknown_verb_is_none() {
        assert!(lookup("transmutes").is_none());
    }

    #[test]
    fn influences_accepts_either_source_label() {
        let entry = lookup("influences").unwrap();
        assert!(entry.source_label.matches("Idea"));
        assert!(entry.source_label.matches("Emanation"));
        assert!(!entry.source_label.matches("Spatial"));
    }

    #[test]
    fn edge_type_is_uppercased() {
        assert_eq!(edge_type("embodies"), "EMBODIES");
    }
}
