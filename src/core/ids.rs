//! Identifier conventions shared by every layer
//!
//! Settlements, factions and formations are addressed by caller-supplied
//! string ids. Edges and regions get canonical composite keys so the same
//! pair always maps to the same string.

/// Settlement id as supplied by the map loader
pub type SettlementId = String;

/// Faction id
pub type FactionId = String;

/// Formation id
pub type FormationId = String;

/// Canonical undirected edge key, `"{lo}__{hi}"`
pub type EdgeId = String;

/// Separator between the two settlement ids of an edge key
pub const EDGE_ID_SEPARATOR: &str = "__";

/// Separator between the two faction ids of a region key
pub const REGION_ID_SEPARATOR: &str = "--";

/// Canonical edge id for an unordered settlement pair.
pub fn edge_id_for(a: &str, b: &str) -> EdgeId {
    if a <= b {
        format!("{a}{EDGE_ID_SEPARATOR}{b}")
    } else {
        format!("{b}{EDGE_ID_SEPARATOR}{a}")
    }
}

/// Splits a canonical edge id back into its endpoints.
///
/// Returns None for ids without exactly one separator, with empty
/// endpoints, or with endpoints out of canonical order.
pub fn split_edge_id(edge_id: &str) -> Option<(SettlementId, SettlementId)> {
    let (a, b) = edge_id.split_once(EDGE_ID_SEPARATOR)?;
    if a.is_empty() || b.is_empty() || b.contains(EDGE_ID_SEPARATOR) || a > b {
        return None;
    }
    Some((a.to_string(), b.to_string()))
}

/// Canonical region id for an unordered faction pair.
pub fn region_id_for(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a}{REGION_ID_SEPARATOR}{b}")
    } else {
        format!("{b}{REGION_ID_SEPARATOR}{a}")
    }
}
