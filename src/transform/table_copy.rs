//! Table-copy origin tracking
//!
//! A Source local like `Pool memory pool = pools[pid];` lowers to a
//! copy-by-value out of a table entry. If the function then mutates the
//! copy, the mutation must flow back into the table — on the Target nothing
//! aliases. Each such binding is recorded here with its origin table, its
//! already-translated key expressions and a mutation bit; the function
//! transformer asks for the write-back statements at every exit and drains
//! the map when the function ends.

use crate::move_ast::{MoveExpr, MoveStmt};

/// Provenance of one local copied out of a collection entry
#[derive(Debug, Clone)]
pub struct TableCopyOrigin {
    /// Target-side local name
    pub local: String,
    /// The table the copy came from, e.g. `state.pools`
    pub table: MoveExpr,
    /// Translated key expressions, outermost first (1 or 2 entries)
    pub keys: Vec<MoveExpr>,
    /// Resource group holding the origin table; the write-back needs it
    /// borrowed mutably
    pub group: String,
    /// Set once any field of the local is assigned
    pub mutated: bool,
}

/// Per-function origin map, first-capture order
#[derive(Debug, Default)]
pub struct TableCopyOrigins {
    entries: Vec<TableCopyOrigin>,
}

impl TableCopyOrigins {
    pub fn new() -> Self {
        TableCopyOrigins::default()
    }

    /// Record a fresh capture. A rebinding of the same local replaces the
    /// earlier origin — the old copy is dead.
    pub fn record(&mut self, local: &str, table: MoveExpr, keys: Vec<MoveExpr>, group: &str) {
        self.entries.retain(|e| e.local != local);
        self.entries.push(TableCopyOrigin {
            local: local.to_string(),
            table,
            keys,
            group: group.to_string(),
            mutated: false,
        });
    }

    /// Group of a tracked local's origin table
    pub fn group_of(&self, local: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|e| e.local == local)
            .map(|e| e.group.clone())
    }

    /// Mark the local's copy as mutated, if it is tracked
    pub fn mark_mutated(&mut self, local: &str) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.local == local) {
            entry.mutated = true;
        }
    }

    /// A local ceased to alias its entry (reassigned to something else)
    pub fn forget(&mut self, local: &str) {
        self.entries.retain(|e| e.local != local);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upserts for every mutated origin, in first-capture order. Emitted at
    /// each scope exit; the map itself is left intact because later exits
    /// need the same statements.
    pub fn writeback_stmts(&self) -> Vec<MoveStmt> {
        self.entries
            .iter()
            .filter(|e| e.mutated)
            .map(|e| upsert_stmt(e))
            .collect()
    }

    /// Drop every entry; the function transformation is done. Returns how
    /// many entries were live so the caller can sanity-check.
    pub fn drain(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

/// `table::upsert(&mut t, k, local)`, or the nested two-key form
fn upsert_stmt(origin: &TableCopyOrigin) -> MoveStmt {
    let value = MoveExpr::ident(&origin.local);
    match origin.keys.as_slice() {
        [key] => MoveStmt::Expr(MoveExpr::call(
            Some("table"),
            "upsert",
            vec![
                MoveExpr::borrow(true, origin.table.clone()),
                key.clone(),
                value,
            ],
        )),
        [outer, inner] => {
            let inner_table = MoveExpr::call(
                Some("table"),
                "borrow_mut",
                vec![MoveExpr::borrow(true, origin.table.clone()), outer.clone()],
            );
            MoveStmt::Expr(MoveExpr::call(
                Some("table"),
                "upsert",
                vec![inner_table, inner.clone(), value],
            ))
        }
        // Origins are only ever captured with one or two keys.
        _ => MoveStmt::Unsupported {
            pattern: format!("write-back of `{}` with unexpected key depth", origin.local),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::move_ast::MoveExprKind;

    fn table_expr() -> MoveExpr {
        MoveExpr::field(MoveExpr::ident("state"), "pools")
    }

    #[test]
    fn unmutated_origins_produce_no_writebacks() {
        let mut origins = TableCopyOrigins::new();
        origins.record("pool", table_expr(), vec![MoveExpr::ident("pid")], "State");
        assert!(origins.writeback_stmts().is_empty());
    }

    #[test]
    fn mutation_produces_an_upsert() {
        let mut origins = TableCopyOrigins::new();
        origins.record("pool", table_expr(), vec![MoveExpr::ident("pid")], "State");
        origins.mark_mutated("pool");
        let stmts = origins.writeback_stmts();
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            MoveStmt::Expr(expr) => match &expr.kind {
                MoveExprKind::Call { module, func, args, .. } => {
                    assert_eq!(module.as_deref(), Some("table"));
                    assert_eq!(func, "upsert");
                    assert_eq!(args.len(), 3);
                }
                other => panic!("Expected call, got {:?}", other),
            },
            other => panic!("Expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn writebacks_keep_first_capture_order() {
        let mut origins = TableCopyOrigins::new();
        origins.record("a", table_expr(), vec![MoveExpr::ident("k1")], "State");
        origins.record("b", table_expr(), vec![MoveExpr::ident("k2")], "State");
        origins.mark_mutated("b");
        origins.mark_mutated("a");
        let stmts = origins.writeback_stmts();
        assert_eq!(stmts.len(), 2);
        // `a` was captured first, so its upsert comes first.
        let first = format!("{:?}", stmts[0]);
        assert!(first.contains("\"a\""), "unexpected order: {}", first);
    }

    #[test]
    fn drain_empties_the_map() {
        let mut origins = TableCopyOrigins::new();
        origins.record("pool", table_expr(), vec![MoveExpr::ident("pid")], "State");
        assert_eq!(origins.drain(), 1);
        assert!(origins.is_empty());
    }
}
