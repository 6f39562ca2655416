use crate::ast::Symbol;
use rustc_hash::FxHashMap;

/// String interner: every distinct name in a compilation unit maps to one
/// `Symbol`, so the analysis passes compare names by id instead of text.
#[derive(Debug, Default)]
pub struct Interner {
    ids: FxHashMap<String, Symbol>,
    names: Vec<String>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        match self.ids.get(name) {
            Some(&sym) => sym,
            None => {
                let sym = Symbol(self.names.len() as u32);
                self.names.push(name.to_owned());
                self.ids.insert(name.to_owned(), sym);
                sym
            }
        }
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.names[sym.0 as usize]
    }

    /// Lookup without interning; used by passes that only ever read.
    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.ids.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_symbol() {
        let mut interner = Interner::new();
        let first = interner.intern("vtable");
        let again = interner.intern("vtable");
        let other = interner.intern("dispatch");

        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn symbols_resolve_back_and_get_never_interns() {
        let mut interner = Interner::new();
        let sym = interner.intern("main");
        assert_eq!(interner.resolve(sym), "main");
        assert_eq!(interner.get("main"), Some(sym));

        assert_eq!(interner.get("absent"), None);
        // A failed get must not have created the symbol.
        assert_eq!(interner.get("absent"), None);
        assert_ne!(interner.intern("absent"), sym);
    }
}
