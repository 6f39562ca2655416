//! The scoped symbol table.
//!
//! Scopes are created once, during the symbol-table build pass, and kept for
//! the whole compilation. Later passes re-enter them in creation order via
//! `enter_scope`, so a pass that traverses the AST in the same preorder as
//! the build pass sees exactly the scopes the build pass created.
//!
//! Class scopes carry their owner's name, the name of the extended class,
//! and the names of implemented interfaces. Storing names instead of scope
//! indices lets a class reference another class declared later in the file;
//! the chain is re-resolved on every walk.

use rustc_hash::FxHashMap;
use shrew_frontend::Symbol;
use shrew_identity::DeclId;
use tracing::trace;

#[derive(Debug, Default)]
pub struct Scope {
    symbols: FxHashMap<Symbol, DeclId>,
    owner: Option<Symbol>,
    parent_owner: Option<Symbol>,
    interfaces: Vec<Symbol>,
}

impl Scope {
    pub fn owner(&self) -> Option<Symbol> {
        self.owner
    }

    pub fn parent_owner(&self) -> Option<Symbol> {
        self.parent_owner
    }

    pub fn interfaces(&self) -> &[Symbol] {
        &self.interfaces
    }

    pub fn entries(&self) -> impl Iterator<Item = (Symbol, DeclId)> + '_ {
        self.symbols.iter().map(|(sym, id)| (*sym, *id))
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    /// Indices of the scopes lexically active right now, outermost first.
    /// Index 0 (the global scope) is always present.
    active: Vec<usize>,
    /// Most recently created or re-entered scope; advances through the
    /// scope vector in creation order.
    cursor: usize,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
            active: vec![0],
            cursor: 0,
        }
    }

    /// Reset the active stack to just the global scope and rewind the
    /// re-entry cursor. Created scopes are kept.
    pub fn reset(&mut self) {
        trace!("reset symbol table");
        self.active.clear();
        self.active.push(0);
        self.cursor = 0;
    }

    /// Append a fresh scope and make it current (build pass only).
    pub fn generate_scope(&mut self, owner: Option<Symbol>) {
        self.cursor += 1;
        trace!(scope = self.cursor, ?owner, "generate scope");
        debug_assert_eq!(self.cursor, self.scopes.len());
        self.scopes.push(Scope {
            owner,
            ..Scope::default()
        });
        self.active.push(self.cursor);
    }

    /// Re-enter the next scope in creation order (check passes only).
    pub fn enter_scope(&mut self) {
        self.cursor += 1;
        trace!(scope = self.cursor, "enter scope");
        debug_assert!(
            self.cursor < self.scopes.len(),
            "scope re-entry ran past the scopes built by the declaration pass"
        );
        self.active.push(self.cursor);
    }

    pub fn exit_scope(&mut self) {
        trace!(scope = self.current(), "exit scope");
        debug_assert!(self.active.len() > 1, "cannot exit the global scope");
        self.active.pop();
    }

    fn current(&self) -> usize {
        *self.active.last().expect("global scope always active")
    }

    /// Record that the current (class) scope extends the named class.
    pub fn set_parent(&mut self, parent: Symbol) {
        let current = self.current();
        self.scopes[current].parent_owner = Some(parent);
    }

    /// Record that the current (class) scope implements the named interface.
    pub fn add_interface(&mut self, interface: Symbol) {
        let current = self.current();
        self.scopes[current].interfaces.push(interface);
    }

    pub fn insert(&mut self, name: Symbol, decl: DeclId) {
        let current = self.current();
        trace!(scope = current, %decl, "insert symbol");
        self.scopes[current].symbols.insert(name, decl);
    }

    /// Look up in the current scope only.
    pub fn local_lookup(&self, name: Symbol) -> Option<DeclId> {
        self.scopes[self.current()].symbols.get(&name).copied()
    }

    /// Index of the scope owned by `owner`, if any.
    fn scope_owned_by(&self, owner: Symbol) -> Option<usize> {
        self.scopes.iter().position(|s| s.owner == Some(owner))
    }

    /// Walk a scope's parent-owner chain looking for `name`. The starting
    /// scope itself is not consulted. Bounded against ownership cycles.
    fn lookup_in_parents(&self, start: usize, name: Symbol) -> Option<DeclId> {
        let mut visited = vec![start];
        let mut scope = &self.scopes[start];
        while let Some(parent) = scope.parent_owner {
            let index = self.scope_owned_by(parent)?;
            if visited.contains(&index) {
                return None;
            }
            visited.push(index);
            scope = &self.scopes[index];
            if let Some(decl) = scope.symbols.get(&name) {
                return Some(*decl);
            }
        }
        None
    }

    /// Full lookup: walk the active stack from innermost outward; at each
    /// level, follow the scope's class-inheritance chain before moving on.
    pub fn lookup(&self, name: Symbol) -> Option<DeclId> {
        for &index in self.active.iter().rev() {
            let scope = &self.scopes[index];
            if let Some(decl) = scope.symbols.get(&name) {
                return Some(*decl);
            }
            if let Some(decl) = self.lookup_in_parents(index, name) {
                return Some(decl);
            }
        }
        None
    }

    /// Look up `name` along the current scope's parent-owner chain only.
    pub fn find_parent(&self, name: Symbol) -> Option<DeclId> {
        self.lookup_in_parents(self.current(), name)
    }

    /// Look up `name` in each interface scope the current scope implements.
    pub fn find_interface(&self, name: Symbol) -> Option<DeclId> {
        let scope = &self.scopes[self.current()];
        for &interface in &scope.interfaces {
            if let Some(index) = self.scope_owned_by(interface)
                && let Some(decl) = self.scopes[index].symbols.get(&name)
            {
                return Some(*decl);
            }
        }
        None
    }

    /// Find `field` in the scope owned by `base`, else along that scope's
    /// parent-owner chain.
    pub fn look_for_field(&self, base: Symbol, field: Symbol) -> Option<DeclId> {
        let index = self.scope_owned_by(base)?;
        if let Some(decl) = self.scopes[index].symbols.get(&field) {
            return Some(*decl);
        }
        self.lookup_in_parents(index, field)
    }

    /// The global decl of the innermost enclosing class, if the current
    /// position is inside one.
    pub fn find_this(&self) -> Option<DeclId> {
        for &index in self.active.iter().rev() {
            if let Some(owner) = self.scopes[index].owner
                && let Some(decl) = self.scopes[0].symbols.get(&owner)
            {
                return Some(*decl);
            }
        }
        None
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(n: u32) -> Symbol {
        Symbol(n)
    }

    fn decl(n: u32) -> DeclId {
        DeclId::new(n)
    }

    #[test]
    fn lookup_walks_active_stack() {
        let mut table = SymbolTable::new();
        table.insert(sym(0), decl(0));
        table.generate_scope(None);
        table.insert(sym(1), decl(1));
        table.generate_scope(None);

        assert_eq!(table.lookup(sym(1)), Some(decl(1)));
        assert_eq!(table.lookup(sym(0)), Some(decl(0)));
        assert_eq!(table.local_lookup(sym(1)), None);
    }

    #[test]
    fn reentry_follows_creation_order() {
        let mut table = SymbolTable::new();
        table.generate_scope(None);
        table.insert(sym(1), decl(1));
        table.exit_scope();
        table.generate_scope(None);
        table.insert(sym(2), decl(2));
        table.exit_scope();

        table.reset();
        table.enter_scope();
        assert_eq!(table.local_lookup(sym(1)), Some(decl(1)));
        table.exit_scope();
        table.enter_scope();
        assert_eq!(table.local_lookup(sym(2)), Some(decl(2)));
        table.exit_scope();
    }

    #[test]
    fn lookup_follows_parent_owner_chain() {
        let mut table = SymbolTable::new();
        // class 10 { field 3 }
        table.generate_scope(Some(sym(10)));
        table.insert(sym(3), decl(3));
        table.exit_scope();
        // class 11 extends 10 {}
        table.generate_scope(Some(sym(11)));
        table.set_parent(sym(10));
        assert_eq!(table.lookup(sym(3)), Some(decl(3)));
        assert_eq!(table.find_parent(sym(3)), Some(decl(3)));
        table.exit_scope();
    }

    #[test]
    fn look_for_field_reaches_inherited_fields() {
        let mut table = SymbolTable::new();
        table.generate_scope(Some(sym(10)));
        table.insert(sym(3), decl(3));
        table.exit_scope();
        table.generate_scope(Some(sym(11)));
        table.set_parent(sym(10));
        table.insert(sym(4), decl(4));
        table.exit_scope();

        assert_eq!(table.look_for_field(sym(11), sym(4)), Some(decl(4)));
        assert_eq!(table.look_for_field(sym(11), sym(3)), Some(decl(3)));
        assert_eq!(table.look_for_field(sym(10), sym(4)), None);
    }

    #[test]
    fn find_this_reports_innermost_owner() {
        let mut table = SymbolTable::new();
        table.insert(sym(10), decl(0));
        table.generate_scope(Some(sym(10)));
        table.generate_scope(None); // method scope
        assert_eq!(table.find_this(), Some(decl(0)));
        table.exit_scope();
        table.exit_scope();
        assert_eq!(table.find_this(), None);
    }

    #[test]
    fn parent_walks_survive_ownership_cycles() {
        let mut table = SymbolTable::new();
        table.generate_scope(Some(sym(10)));
        table.set_parent(sym(10));
        assert_eq!(table.lookup(sym(99)), None);
        assert_eq!(table.find_parent(sym(99)), None);
        table.exit_scope();
    }

    #[test]
    fn find_interface_searches_implemented_scopes() {
        let mut table = SymbolTable::new();
        table.generate_scope(Some(sym(20)));
        table.insert(sym(5), decl(5));
        table.exit_scope();
        table.generate_scope(Some(sym(11)));
        table.add_interface(sym(20));
        assert_eq!(table.find_interface(sym(5)), Some(decl(5)));
        assert_eq!(table.find_interface(sym(6)), None);
        table.exit_scope();
    }
}
