//! The declaration arena.
//!
//! Every declaration the program introduces is registered here once, during
//! the symbol-table build pass, and addressed by `DeclId` from then on.
//! Later passes fill in the computed fields (resolved types, member lists,
//! layout results) through `get_mut`.

use crate::types::Type;
use rustc_hash::FxHashMap;
use shrew_frontend::{Span, Symbol};
use shrew_identity::DeclId;

#[derive(Debug)]
pub enum DeclInfo {
    Var(VarInfo),
    Fn(FnInfo),
    Class(ClassInfo),
    Interface(InterfaceInfo),
}

#[derive(Debug)]
pub struct VarInfo {
    pub name: Symbol,
    pub span: Span,
    /// Resolved declared type; `None` until the decl-check pass, or forever
    /// if resolution failed (downstream checks skip it).
    pub ty: Option<Type>,
    /// Declaring class, when this is a field.
    pub owner: Option<Symbol>,
    /// Instance offset for fields; fields pack upward from 4.
    pub field_offset: Option<i32>,
    /// Offset off the global pointer for top-level variables.
    pub global_offset: Option<i32>,
}

#[derive(Debug)]
pub struct FnInfo {
    pub name: Symbol,
    pub span: Span,
    /// Resolved return type; `None` until the decl-check pass.
    pub return_ty: Option<Type>,
    pub formals: Vec<DeclId>,
    pub has_body: bool,
    /// Declaring class or interface, when this is a method.
    pub owner: Option<Symbol>,
    pub owner_is_interface: bool,
    /// Dispatch-table slot for methods; slot n lives at vtable offset 4n.
    pub vtable_slot: Option<usize>,
    /// Emitted label, assigned by the layout pass: `_Class.method` for
    /// methods, `_name` for free functions, bare `main` for the entry point.
    pub label: Option<String>,
}

#[derive(Debug)]
pub struct ClassInfo {
    pub name: Symbol,
    pub span: Span,
    pub extends: Option<Symbol>,
    pub implements: Vec<Symbol>,
    /// Declared members in source order.
    pub members: Vec<DeclId>,
    /// All fields, inherited first, computed by the layout pass.
    pub var_members: Vec<DeclId>,
    /// Dispatch table in slot order: inherited methods keep their slot, an
    /// override replaces the inherited entry in place.
    pub fn_members: Vec<DeclId>,
    pub inst_size: i32,
    pub vtable_size: i32,
}

#[derive(Debug)]
pub struct InterfaceInfo {
    pub name: Symbol,
    pub span: Span,
    pub members: Vec<DeclId>,
}

#[derive(Debug, Default)]
pub struct DeclTable {
    decls: Vec<DeclInfo>,
    /// Global class/interface names; only top-level types register here.
    type_by_name: FxHashMap<Symbol, DeclId>,
}

impl DeclTable {
    pub fn insert(&mut self, info: DeclInfo) -> DeclId {
        let id = DeclId::new(self.decls.len() as u32);
        self.decls.push(info);
        id
    }

    /// Register a top-level class/interface for name-based hierarchy walks.
    pub fn register_type(&mut self, name: Symbol, id: DeclId) {
        self.type_by_name.entry(name).or_insert(id);
    }

    pub fn type_by_name(&self, name: Symbol) -> Option<DeclId> {
        self.type_by_name.get(&name).copied()
    }

    pub fn get(&self, id: DeclId) -> &DeclInfo {
        &self.decls[id.index() as usize]
    }

    pub fn get_mut(&mut self, id: DeclId) -> &mut DeclInfo {
        &mut self.decls[id.index() as usize]
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn name(&self, id: DeclId) -> Symbol {
        match self.get(id) {
            DeclInfo::Var(v) => v.name,
            DeclInfo::Fn(f) => f.name,
            DeclInfo::Class(c) => c.name,
            DeclInfo::Interface(i) => i.name,
        }
    }

    pub fn span(&self, id: DeclId) -> Span {
        match self.get(id) {
            DeclInfo::Var(v) => v.span,
            DeclInfo::Fn(f) => f.span,
            DeclInfo::Class(c) => c.span,
            DeclInfo::Interface(i) => i.span,
        }
    }

    pub fn var(&self, id: DeclId) -> Option<&VarInfo> {
        match self.get(id) {
            DeclInfo::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn var_mut(&mut self, id: DeclId) -> Option<&mut VarInfo> {
        match self.get_mut(id) {
            DeclInfo::Var(v) => Some(v),
            _ => None,
        }
    }

    pub fn function(&self, id: DeclId) -> Option<&FnInfo> {
        match self.get(id) {
            DeclInfo::Fn(f) => Some(f),
            _ => None,
        }
    }

    pub fn function_mut(&mut self, id: DeclId) -> Option<&mut FnInfo> {
        match self.get_mut(id) {
            DeclInfo::Fn(f) => Some(f),
            _ => None,
        }
    }

    pub fn class(&self, id: DeclId) -> Option<&ClassInfo> {
        match self.get(id) {
            DeclInfo::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn class_mut(&mut self, id: DeclId) -> Option<&mut ClassInfo> {
        match self.get_mut(id) {
            DeclInfo::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn interface(&self, id: DeclId) -> Option<&InterfaceInfo> {
        match self.get(id) {
            DeclInfo::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn interface_mut(&mut self, id: DeclId) -> Option<&mut InterfaceInfo> {
        match self.get_mut(id) {
            DeclInfo::Interface(i) => Some(i),
            _ => None,
        }
    }

    pub fn is_var(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclInfo::Var(_))
    }

    pub fn is_fn(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclInfo::Fn(_))
    }

    pub fn is_class(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclInfo::Class(_))
    }

    pub fn is_interface(&self, id: DeclId) -> bool {
        matches!(self.get(id), DeclInfo::Interface(_))
    }

    /// The type a reference to this decl evaluates to: a variable's declared
    /// type or a function's return type.
    pub fn decl_type(&self, id: DeclId) -> Option<&Type> {
        match self.get(id) {
            DeclInfo::Var(v) => v.ty.as_ref(),
            DeclInfo::Fn(f) => f.return_ty.as_ref(),
            _ => None,
        }
    }

    /// True when `child` names a class that is `ancestor` or derives from it
    /// (directly or transitively), or implements it when `ancestor` is an
    /// interface. Bounded against inheritance cycles so it can run before
    /// the cycle diagnostic fires.
    pub fn is_child_of(&self, child: Symbol, ancestor: Symbol) -> bool {
        if child == ancestor {
            return true;
        }
        let ancestor_is_interface = self
            .type_by_name(ancestor)
            .is_some_and(|id| self.is_interface(id));

        let mut visited = Vec::new();
        let mut cursor = child;
        loop {
            if cursor == ancestor {
                return true;
            }
            if visited.contains(&cursor) {
                return false;
            }
            visited.push(cursor);

            let Some(info) = self.type_by_name(cursor).and_then(|id| self.class(id)) else {
                return false;
            };
            if ancestor_is_interface && info.implements.contains(&ancestor) {
                return true;
            }
            match info.extends {
                Some(parent) => cursor = parent,
                None => return false,
            }
        }
    }

    /// Signature equivalence for override and interface checks: same return
    /// type, same formal count, element-wise equivalent formal types. False
    /// when either signature failed to resolve.
    pub fn signatures_equivalent(&self, a: DeclId, b: DeclId) -> bool {
        let (Some(fa), Some(fb)) = (self.function(a), self.function(b)) else {
            return false;
        };
        match (&fa.return_ty, &fb.return_ty) {
            (Some(ra), Some(rb)) if ra == rb => {}
            _ => return false,
        }
        if fa.formals.len() != fb.formals.len() {
            return false;
        }
        fa.formals.iter().zip(fb.formals.iter()).all(|(x, y)| {
            matches!(
                (
                    self.var(*x).and_then(|v| v.ty.as_ref()),
                    self.var(*y).and_then(|v| v.ty.as_ref()),
                ),
                (Some(tx), Some(ty)) if tx == ty
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn class(name: u32, extends: Option<u32>, implements: Vec<u32>) -> DeclInfo {
        DeclInfo::Class(ClassInfo {
            name: Symbol(name),
            span: Span::default(),
            extends: extends.map(Symbol),
            implements: implements.into_iter().map(Symbol).collect(),
            members: Vec::new(),
            var_members: Vec::new(),
            fn_members: Vec::new(),
            inst_size: 4,
            vtable_size: 0,
        })
    }

    fn interface(name: u32) -> DeclInfo {
        DeclInfo::Interface(InterfaceInfo {
            name: Symbol(name),
            span: Span::default(),
            members: Vec::new(),
        })
    }

    fn register(table: &mut DeclTable, info: DeclInfo) {
        let name = match &info {
            DeclInfo::Class(c) => c.name,
            DeclInfo::Interface(i) => i.name,
            _ => unreachable!(),
        };
        let id = table.insert(info);
        table.register_type(name, id);
    }

    #[test]
    fn child_of_walks_extends_chain() {
        let mut table = DeclTable::default();
        register(&mut table, class(0, None, vec![]));
        register(&mut table, class(1, Some(0), vec![]));
        register(&mut table, class(2, Some(1), vec![]));

        assert!(table.is_child_of(Symbol(2), Symbol(0)));
        assert!(table.is_child_of(Symbol(1), Symbol(1)));
        assert!(!table.is_child_of(Symbol(0), Symbol(2)));
    }

    #[test]
    fn child_of_sees_interfaces_anywhere_on_the_chain() {
        let mut table = DeclTable::default();
        register(&mut table, interface(9));
        register(&mut table, class(0, None, vec![9]));
        register(&mut table, class(1, Some(0), vec![]));

        assert!(table.is_child_of(Symbol(0), Symbol(9)));
        assert!(table.is_child_of(Symbol(1), Symbol(9)));
        assert!(!table.is_child_of(Symbol(9), Symbol(0)));
    }

    #[test]
    fn child_of_terminates_on_cycles() {
        let mut table = DeclTable::default();
        register(&mut table, class(0, Some(1), vec![]));
        register(&mut table, class(1, Some(0), vec![]));
        assert!(!table.is_child_of(Symbol(0), Symbol(7)));
    }

    #[test]
    fn signature_equivalence_needs_resolved_types() {
        let mut table = DeclTable::default();
        let formal = |table: &mut DeclTable, ty| {
            table.insert(DeclInfo::Var(VarInfo {
                name: Symbol(100),
                span: Span::default(),
                ty,
                owner: None,
                field_offset: None,
                global_offset: None,
            }))
        };
        let func = |table: &mut DeclTable, ret: Option<Type>, formals: Vec<DeclId>| {
            table.insert(DeclInfo::Fn(FnInfo {
                name: Symbol(5),
                span: Span::default(),
                return_ty: ret,
                formals,
                has_body: true,
                owner: None,
                owner_is_interface: false,
                vtable_slot: None,
                label: None,
            }))
        };

        let x = formal(&mut table, Some(Type::Int));
        let y = formal(&mut table, Some(Type::Int));
        let a = func(&mut table, Some(Type::Bool), vec![x]);
        let b = func(&mut table, Some(Type::Bool), vec![y]);
        assert!(table.signatures_equivalent(a, b));

        let z = formal(&mut table, None);
        let c = func(&mut table, Some(Type::Bool), vec![z]);
        assert!(!table.signatures_equivalent(a, c));

        let d = func(&mut table, Some(Type::Int), vec![y]);
        assert!(!table.signatures_equivalent(a, d));
    }
}
