use crate::postings::AdjMode;
use crate::schema::{DocId, FieldId};

/// A parsed query tree (spec.md §4.6.4): leaves are term/wildcard lookups,
/// internal nodes are the C6 operators. The core never parses query syntax
/// itself — trees arrive already built (spec.md §1).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryNode {
    Term {
        term: Vec<u8>,
        fields: Option<Vec<FieldId>>,
    },
    Wildcard {
        pattern: Vec<u8>,
        fields: Option<Vec<FieldId>>,
    },
    And(Box<QueryNode>, Box<QueryNode>),
    Or(Box<QueryNode>, Box<QueryNode>),
    Not(Box<QueryNode>, Box<QueryNode>),
    Xor(Box<QueryNode>, Box<QueryNode>),
    Adj(Box<QueryNode>, Box<QueryNode>, u32, AdjMode),
    /// Restricts a subtree's postings to an explicit set of doc ids (an
    /// externally supplied filter list, spec.md §4.6.4).
    Filter(Box<QueryNode>, Vec<DocId>),
}
