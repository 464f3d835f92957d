//! The Orrery type universe.
//!
//! ============================================================================
//! TYPE THEORY
//! ============================================================================
//!
//! Orrery's checker works over a small, closed universe of five shapes:
//!
//! - `TV(id)`        - a type variable, to be solved by unification.
//! - `TCon(id, args, name)` - a nominal constructor: a built-in (`Int`,
//!   `String`, `Bool`) or a user struct/enum, applied to zero or more
//!   argument types. Two `TCon`s are the same type iff their `DefId`s match
//!   and their argument lists unify pointwise; the display name is carried
//!   only for diagnostics and plays no role in equality.
//! - `TArrow(params, result)` - a function type.
//! - `TTuple(elements)` - a tuple type.
//! - `Any` - the universal sentinel returned when resolution or inference
//!   fails; it unifies successfully with everything so that one missing
//!   binding does not cascade into unrelated diagnostics.
//!
//! There is no separate representation for primitives: `Int`, `String`, and
//! `Bool` are ordinary `TCon`s whose `DefId`s are minted once, at checker
//! startup, and threaded through as [`Builtins`].
//!
//! ============================================================================
//! SUBSTITUTION
//! ============================================================================
//!
//! A substitution is a partial map from type-variable ids to types. It is
//! insertion-only: a solved variable is never rebound, and resolving a
//! variable walks the chain until it reaches an unbound variable or a
//! non-variable type (path compression is applied as each link is walked).

use std::collections::HashSet;

use orryc_util::{DefId, DefIdGenerator, Symbol};

/// The five-case type universe.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// An unsolved type variable.
    TV(u32),
    /// A nominal constructor applied to argument types.
    TCon(DefId, Vec<Type>, Symbol),
    /// A function type.
    TArrow(Vec<Type>, Box<Type>),
    /// A tuple type.
    TTuple(Vec<Type>),
    /// The top/error sentinel: unifies with anything, recorded once a name
    /// or expression could not be given a real type.
    Any,
}

impl Type {
    pub fn arrow(params: Vec<Type>, result: Type) -> Self {
        Type::TArrow(params, Box::new(result))
    }

    pub fn is_var(&self) -> bool {
        matches!(self, Type::TV(_))
    }

    pub fn is_any(&self) -> bool {
        matches!(self, Type::Any)
    }

    /// The free type variables mentioned anywhere in this type (duplicates
    /// are possible; callers that need a set should collect into one).
    pub fn free_vars(&self) -> Vec<u32> {
        let mut out = Vec::new();
        collect_free_vars(self, &mut out);
        out
    }

    /// Whether type variable `v` occurs anywhere within this type.
    pub fn has_var(&self, v: u32) -> bool {
        match self {
            Type::TV(id) => *id == v,
            Type::TCon(_, args, _) => args.iter().any(|a| a.has_var(v)),
            Type::TArrow(params, ret) => params.iter().any(|p| p.has_var(v)) || ret.has_var(v),
            Type::TTuple(elems) => elems.iter().any(|e| e.has_var(v)),
            Type::Any => false,
        }
    }
}

fn collect_free_vars(ty: &Type, out: &mut Vec<u32>) {
    match ty {
        Type::TV(id) => out.push(*id),
        Type::TCon(_, args, _) => args.iter().for_each(|a| collect_free_vars(a, out)),
        Type::TArrow(params, ret) => {
            params.iter().for_each(|p| collect_free_vars(p, out));
            collect_free_vars(ret, out);
        }
        Type::TTuple(elems) => elems.iter().for_each(|e| collect_free_vars(e, out)),
        Type::Any => {}
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::TV(id) => write!(f, "?{}", id),
            Type::TCon(_, args, name) => {
                if args.is_empty() {
                    write!(f, "{}", name.as_str())
                } else {
                    let parts: Vec<String> = args.iter().map(|a| a.to_string()).collect();
                    write!(f, "{}<{}>", name.as_str(), parts.join(", "))
                }
            }
            Type::TArrow(params, ret) => {
                let parts: Vec<String> = params.iter().map(|p| p.to_string()).collect();
                write!(f, "({}) -> {}", parts.join(", "), ret)
            }
            Type::TTuple(elems) => {
                let parts: Vec<String> = elems.iter().map(|e| e.to_string()).collect();
                write!(f, "({})", parts.join(", "))
            }
            Type::Any => write!(f, "Any"),
        }
    }
}

/// `DefId`s for the three primitive constructors, minted once when the
/// checker starts so that every `Int`/`String`/`Bool` occurrence in a
/// program refers to the same nominal type.
#[derive(Debug, Clone, Copy)]
pub struct Builtins {
    pub int: DefId,
    pub string: DefId,
    pub bool_: DefId,
}

impl Builtins {
    pub fn new(def_id_gen: &DefIdGenerator) -> Self {
        Self {
            int: def_id_gen.next(),
            string: def_id_gen.next(),
            bool_: def_id_gen.next(),
        }
    }

    pub fn int_ty(&self) -> Type {
        Type::TCon(self.int, Vec::new(), Symbol::intern("Int"))
    }

    pub fn string_ty(&self) -> Type {
        Type::TCon(self.string, Vec::new(), Symbol::intern("String"))
    }

    pub fn bool_ty(&self) -> Type {
        Type::TCon(self.bool_, Vec::new(), Symbol::intern("Bool"))
    }
}

/// Per-definition type table, the substitution built up by the solver, and
/// the minted built-in constructors - the state a whole checking session
/// accumulates.
pub struct TypeContext {
    def_types: std::collections::HashMap<DefId, Type>,
    subst: Vec<Option<Type>>,
    next_var: u32,
    pub builtins: Builtins,
}

impl TypeContext {
    pub fn new(def_id_gen: &DefIdGenerator) -> Self {
        Self {
            def_types: std::collections::HashMap::new(),
            subst: Vec::new(),
            next_var: 0,
            builtins: Builtins::new(def_id_gen),
        }
    }

    pub fn type_of_def(&self, def_id: DefId) -> Option<&Type> {
        self.def_types.get(&def_id)
    }

    pub fn set_def_type(&mut self, def_id: DefId, ty: Type) {
        self.def_types.insert(def_id, ty);
    }

    /// Allocate a fresh, globally unique type variable.
    pub fn new_type_var(&mut self) -> Type {
        let id = self.next_var;
        self.next_var += 1;
        self.subst.push(None);
        Type::TV(id)
    }

    /// Record `v := ty` in the substitution. Only ever called once per
    /// variable id during a single solving session.
    pub fn bind(&mut self, v: u32, ty: Type) {
        self.subst[v as usize] = Some(ty);
    }

    pub fn binding(&self, v: u32) -> Option<&Type> {
        self.subst.get(v as usize).and_then(|s| s.as_ref())
    }

    /// Resolve the *head* of a type: if it is a bound variable, follow the
    /// substitution chain (with path compression) until an unbound variable
    /// or a non-variable type is reached.
    pub fn resolve_head(&self, ty: &Type) -> Type {
        let mut current = ty.clone();
        loop {
            match current {
                Type::TV(id) => match self.binding(id) {
                    Some(next) => current = next.clone(),
                    None => return Type::TV(id),
                },
                other => return other,
            }
        }
    }

    /// Fully resolve a type, substituting every nested variable that has a
    /// binding. Used to produce the types shown in diagnostics.
    pub fn resolve_deep(&self, ty: &Type) -> Type {
        let head = self.resolve_head(ty);
        match head {
            Type::TCon(id, args, name) => {
                Type::TCon(id, args.iter().map(|a| self.resolve_deep(a)).collect(), name)
            }
            Type::TArrow(params, ret) => Type::TArrow(
                params.iter().map(|p| self.resolve_deep(p)).collect(),
                Box::new(self.resolve_deep(&ret)),
            ),
            Type::TTuple(elems) => {
                Type::TTuple(elems.iter().map(|e| self.resolve_deep(e)).collect())
            }
            other => other,
        }
    }

    /// The subset of `vars` that are still unbound at this point in the
    /// session - what a closing scope may legally generalize over.
    pub fn unbound(&self, vars: &HashSet<u32>) -> HashSet<u32> {
        vars.iter()
            .copied()
            .filter(|v| self.binding(*v).is_none())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orryc_util::DefIdGenerator;

    fn ctx() -> TypeContext {
        TypeContext::new(&DefIdGenerator::new())
    }

    #[test]
    fn builtins_have_distinct_ids() {
        let c = ctx();
        assert_ne!(c.builtins.int, c.builtins.string);
        assert_ne!(c.builtins.string, c.builtins.bool_);
        assert_ne!(c.builtins.int, c.builtins.bool_);
    }

    #[test]
    fn int_and_string_tcons_are_not_equal() {
        let c = ctx();
        assert_ne!(c.builtins.int_ty(), c.builtins.string_ty());
    }

    #[test]
    fn fresh_vars_are_distinct() {
        let mut c = ctx();
        let a = c.new_type_var();
        let b = c.new_type_var();
        assert_ne!(a, b);
    }

    #[test]
    fn free_vars_collects_nested_occurrences() {
        let ty = Type::TArrow(
            vec![Type::TV(1), Type::TTuple(vec![Type::TV(2)])],
            Box::new(Type::TV(1)),
        );
        let mut vars = ty.free_vars();
        vars.sort_unstable();
        vars.dedup();
        assert_eq!(vars, vec![1, 2]);
    }

    #[test]
    fn has_var_detects_arrow_result_occurrence() {
        let ty = Type::TArrow(vec![], Box::new(Type::TV(7)));
        assert!(ty.has_var(7));
        assert!(!ty.has_var(8));
    }

    #[test]
    fn any_has_no_free_vars() {
        assert!(Type::Any.free_vars().is_empty());
        assert!(!Type::Any.has_var(0));
    }

    #[test]
    fn resolve_head_follows_chain_with_compression() {
        let mut c = ctx();
        let v0 = c.new_type_var();
        let v1 = c.new_type_var();
        let (id0, id1) = match (&v0, &v1) {
            (Type::TV(a), Type::TV(b)) => (*a, *b),
            _ => unreachable!(),
        };
        c.bind(id0, Type::TV(id1));
        c.bind(id1, c.builtins.int_ty());
        assert_eq!(c.resolve_head(&v0), c.builtins.int_ty());
    }

    #[test]
    fn resolve_deep_substitutes_nested_variables() {
        let mut c = ctx();
        let v = c.new_type_var();
        let id = match v {
            Type::TV(id) => id,
            _ => unreachable!(),
        };
        c.bind(id, c.builtins.int_ty());
        let wrapped = Type::TTuple(vec![Type::TV(id)]);
        assert_eq!(c.resolve_deep(&wrapped), Type::TTuple(vec![c.builtins.int_ty()]));
    }

    #[test]
    fn unbound_filters_out_solved_variables() {
        let mut c = ctx();
        let v0 = c.new_type_var();
        let v1 = c.new_type_var();
        let (id0, id1) = match (&v0, &v1) {
            (Type::TV(a), Type::TV(b)) => (*a, *b),
            _ => unreachable!(),
        };
        c.bind(id0, c.builtins.int_ty());
        let mut set = HashSet::new();
        set.insert(id0);
        set.insert(id1);
        assert_eq!(c.unbound(&set), [id1].into_iter().collect());
    }

    #[test]
    fn def_types_round_trip() {
        let mut c = ctx();
        let def_id_gen = DefIdGenerator::new();
        let def_id = def_id_gen.next();
        c.set_def_type(def_id, c.builtins.int_ty());
        assert_eq!(c.type_of_def(def_id), Some(&c.builtins.int_ty()));
    }
}
