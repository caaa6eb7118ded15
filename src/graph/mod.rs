//! Read-side queries over a recorded index
//!
//! Provides lookups for:
//! - Symbols by name
//! - Incoming/outgoing references with their locations
//! - Members of a symbol
//! - Definition and scope locations

use crate::db::Database;
use crate::error::Result;
use crate::name::NameHierarchy;
use crate::types::{LocationKind, LocationRecord, ReferenceRecord, SymbolRecord};

/// A reference together with the symbol on its other end
#[derive(Debug, Clone)]
pub struct ReferenceHit {
    pub reference: ReferenceRecord,
    /// Source for incoming references, target for outgoing ones
    pub symbol: SymbolRecord,
    pub locations: Vec<LocationRecord>,
}

/// Query operations on the symbol database
pub struct SymbolGraph<'a> {
    db: &'a Database,
}

impl<'a> SymbolGraph<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn find_symbol(&self, name: &NameHierarchy) -> Result<Option<SymbolRecord>> {
        self.db.find_symbol(name)
    }

    /// All references that point at the symbol
    pub fn references_to(&self, symbol_id: i64) -> Result<Vec<ReferenceHit>> {
        let references = self.db.get_incoming_references(symbol_id)?;
        self.collect_hits(references, |r| r.source_id)
    }

    /// All references the symbol makes
    pub fn references_from(&self, symbol_id: i64) -> Result<Vec<ReferenceHit>> {
        let references = self.db.get_outgoing_references(symbol_id)?;
        self.collect_hits(references, |r| r.target_id)
    }

    /// Symbols nested directly inside the given symbol
    pub fn members(&self, symbol_id: i64) -> Result<Vec<SymbolRecord>> {
        let mut members = Vec::new();
        for id in self.db.get_member_ids(symbol_id)? {
            if let Some(symbol) = self.db.get_symbol(id)? {
                members.push(symbol);
            }
        }
        Ok(members)
    }

    /// Location of the symbol's name, if recorded
    pub fn definition(&self, symbol_id: i64) -> Result<Option<LocationRecord>> {
        self.location_of_kind(symbol_id, LocationKind::Token)
    }

    pub fn scope(&self, symbol_id: i64) -> Result<Option<LocationRecord>> {
        self.location_of_kind(symbol_id, LocationKind::Scope)
    }

    fn location_of_kind(
        &self,
        element_id: i64,
        kind: LocationKind,
    ) -> Result<Option<LocationRecord>> {
        Ok(self
            .db
            .get_locations(element_id)?
            .into_iter()
            .find(|l| l.kind == kind))
    }

    fn collect_hits(
        &self,
        references: Vec<ReferenceRecord>,
        other_end: impl Fn(&ReferenceRecord) -> i64,
    ) -> Result<Vec<ReferenceHit>> {
        let mut hits = Vec::new();
        for reference in references {
            let symbol = match self.db.get_symbol(other_end(&reference))? {
                Some(symbol) => symbol,
                None => continue,
            };
            let locations = self.db.get_locations(reference.id)?;
            hits.push(ReferenceHit {
                reference,
                symbol,
                locations,
            });
        }
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeKind, FileMetadata, ReferenceKind, SourceRange};

    fn encoded(parts: &[&str]) -> String {
        NameHierarchy::from_names(".", parts.iter().copied())
            .encode()
            .unwrap()
    }

    #[test]
    fn test_references_to_and_from() {
        let db = Database::in_memory().unwrap();
        let file = db.add_file("a.py", &FileMetadata::default()).unwrap();
        let caller = db.add_node(&encoded(&["main"])).unwrap();
        let callee = db.add_node(&encoded(&["helper"])).unwrap();
        let call = db
            .add_edge(caller, callee, EdgeKind::Reference(ReferenceKind::Call))
            .unwrap();
        db.record_occurrence(call, &SourceRange::new(file, 3, 5, 3, 10), LocationKind::Reference)
            .unwrap();

        let graph = SymbolGraph::new(&db);
        let incoming = graph.references_to(callee).unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].symbol.id, caller);
        assert_eq!(incoming[0].locations.len(), 1);

        let outgoing = graph.references_from(caller).unwrap();
        assert_eq!(outgoing[0].symbol.id, callee);
        assert!(graph.references_from(callee).unwrap().is_empty());
    }

    #[test]
    fn test_members_and_definition() {
        let db = Database::in_memory().unwrap();
        let file = db.add_file("a.py", &FileMetadata::default()).unwrap();
        let parent = db.add_node(&encoded(&["A"])).unwrap();
        let child = db.add_node(&encoded(&["A", "b"])).unwrap();
        db.add_edge(parent, child, EdgeKind::Member).unwrap();
        db.record_occurrence(child, &SourceRange::new(file, 2, 5, 2, 5), LocationKind::Token)
            .unwrap();

        let graph = SymbolGraph::new(&db);
        let members = graph.members(parent).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name.display_name(), "A.b");
        assert_eq!(graph.definition(child).unwrap().unwrap().range.start_line, 2);
        assert!(graph.scope(child).unwrap().is_none());
    }
}
