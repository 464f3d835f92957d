//! Constraint generation and solving.
//!
//! ============================================================================
//! HINDLEY-MILNER, CONSTRAINT STYLE
//! ============================================================================
//!
//! Rather than unifying eagerly as each expression is visited, the checker
//! walks a declaration once to *emit* [`Constraint::Equal`] obligations, then
//! hands the accumulated set to [`solve`] in one pass. This is what lets a
//! group of mutually recursive declarations be inferred together: every
//! declaration in the group gets a fresh type variable for its return type
//! up front, the bodies are inferred against those variables, and only then
//! does the solver decide whether everything was consistent.
//!
//! Frames ([`InferContext`]) track, for the declaration or group currently
//! being inferred: which type variables it minted (so a closing scope knows
//! what it may generalize), which constraints were attached to it (so
//! generalization can carry deferred obligations forward), and its binding
//! environment of [`Scheme`]s. Pushing and popping frames must balance - an
//! imbalance is a checker bug, not a user diagnostic, so it panics rather
//! than being reported.
//!
//! [`add_constraint`] decides where an emitted constraint lives: it walks
//! frames from innermost to outermost and attaches the constraint to the
//! first one whose type variables intersect either side, falling back to
//! the root frame. A constraint that only mentions a function's own fresh
//! param/return variables stays local to that function; one that also
//! mentions an outer variable floats up to where that variable lives.

use crate::types::{Type, TypeContext};
use orryc_util::{DiagnosticBuilder, DiagnosticCode, Handler, Span, Symbol};
use std::collections::{HashMap, HashSet, VecDeque};

/// A deferred type-equality obligation, or a group of them.
#[derive(Debug, Clone)]
pub enum Constraint {
    Equal(Type, Type, Span),
    Many(Vec<Constraint>),
}

/// A (possibly) generalized type: `vars` are the variables that get
/// freshened on every instantiation, `deferred` are constraints that were
/// local to those variables and must be re-emitted (with the same
/// freshening) whenever the scheme is instantiated, and `body` is the type
/// itself.
#[derive(Debug, Clone)]
pub struct Scheme {
    pub vars: Vec<u32>,
    pub deferred: Vec<Constraint>,
    pub body: Type,
}

impl Scheme {
    pub fn monomorphic(ty: Type) -> Self {
        Self {
            vars: Vec::new(),
            deferred: Vec::new(),
            body: ty,
        }
    }
}

struct Frame {
    type_vars: HashSet<u32>,
    constraints: Vec<Constraint>,
    env: HashMap<Symbol, Scheme>,
    return_type: Option<Type>,
}

impl Frame {
    fn new(return_type: Option<Type>) -> Self {
        Self {
            type_vars: HashSet::new(),
            constraints: Vec::new(),
            env: HashMap::new(),
            return_type,
        }
    }
}

/// Drives constraint generation: mints fresh variables, tracks the frame
/// stack, and routes `Equal` constraints to the right frame.
pub struct InferEngine {
    frames: Vec<Frame>,
}

impl InferEngine {
    /// Build an engine with a root frame preloaded with the built-in
    /// environment (`Int`, `String`, `Bool`'s nullary constructors,
    /// arithmetic, equality, boolean negation).
    pub fn new(ctx: &mut TypeContext) -> Self {
        let mut root = Frame::new(None);
        let int = ctx.builtins.int_ty();
        let bool_ = ctx.builtins.bool_ty();

        root.env.insert(Symbol::intern("True"), Scheme::monomorphic(bool_.clone()));
        root.env.insert(Symbol::intern("False"), Scheme::monomorphic(bool_.clone()));
        for op in ["+", "-", "*", "/"] {
            root.env.insert(
                Symbol::intern(op),
                Scheme::monomorphic(Type::arrow(vec![int.clone(), int.clone()], int.clone())),
            );
        }
        root.env.insert(
            Symbol::intern("not"),
            Scheme::monomorphic(Type::arrow(vec![bool_.clone()], bool_.clone())),
        );
        let eq_var = match ctx.new_type_var() {
            Type::TV(id) => id,
            _ => unreachable!(),
        };
        root.env.insert(
            Symbol::intern("=="),
            Scheme {
                vars: vec![eq_var],
                deferred: Vec::new(),
                body: Type::arrow(vec![Type::TV(eq_var), Type::TV(eq_var)], bool_.clone()),
            },
        );

        Self { frames: vec![root] }
    }

    /// Push a new, empty frame. `return_type` is the type a `return`
    /// statement inside this frame's body must unify with, when present.
    pub fn push_frame(&mut self, return_type: Option<Type>) {
        self.frames.push(Frame::new(return_type));
    }

    /// Pop the current frame. Panics if it would pop the root frame - a
    /// push/pop imbalance is an analyzer bug.
    fn pop_frame_raw(&mut self) -> Frame {
        assert!(self.frames.len() > 1, "cannot pop the root inference frame");
        self.frames.pop().expect("push/pop must balance")
    }

    /// Pop the current frame and fold its type variables and constraints
    /// into its new parent - used when a group of mutually recursive
    /// declarations share one generalization scope.
    pub fn pop_and_merge(&mut self) {
        let frame = self.pop_frame_raw();
        let parent = self.frames.last_mut().expect("root frame must remain");
        parent.type_vars.extend(frame.type_vars);
        parent.constraints.extend(frame.constraints);
    }

    /// Pop the current frame without merging it into its parent, returning
    /// its collected type variables and constraints - used to build the
    /// [`Scheme`] for a `let` binding being generalized in isolation.
    pub fn pop_for_generalization(&mut self) -> (HashSet<u32>, Vec<Constraint>) {
        let frame = self.pop_frame_raw();
        (frame.type_vars, frame.constraints)
    }

    pub fn fresh_var(&mut self, ctx: &mut TypeContext) -> Type {
        let ty = ctx.new_type_var();
        if let Type::TV(id) = ty {
            self.frames.last_mut().expect("a frame must be active").type_vars.insert(id);
        }
        ty
    }

    pub fn return_type(&self) -> Option<Type> {
        self.frames.iter().rev().find_map(|f| f.return_type.clone())
    }

    pub fn bind_in_current(&mut self, name: Symbol, scheme: Scheme) {
        self.frames.last_mut().expect("a frame must be active").env.insert(name, scheme);
    }

    pub fn lookup_scheme(&self, name: Symbol) -> Option<&Scheme> {
        self.frames.iter().rev().find_map(|f| f.env.get(&name))
    }

    /// Attach a constraint to the innermost frame whose minted type
    /// variables intersect either side of an `Equal`, falling back to the
    /// root frame when no frame (other than the root) matches.
    pub fn add_constraint(&mut self, c: Constraint) {
        match c {
            Constraint::Many(cs) => {
                for c in cs {
                    self.add_constraint(c);
                }
            }
            Constraint::Equal(l, r, span) => {
                let vars: HashSet<u32> = l.free_vars().into_iter().chain(r.free_vars()).collect();
                for i in (0..self.frames.len()).rev() {
                    if i == 0 || self.frames[i].type_vars.iter().any(|v| vars.contains(v)) {
                        self.frames[i].constraints.push(Constraint::Equal(l, r, span));
                        return;
                    }
                }
            }
        }
    }

    /// Instantiate a scheme: allocate a fresh variable per generalized
    /// variable, substitute it through the body, and re-emit the deferred
    /// constraints (with the same substitution) into the current frame.
    pub fn instantiate(&mut self, scheme: &Scheme, ctx: &mut TypeContext) -> Type {
        if scheme.vars.is_empty() {
            return scheme.body.clone();
        }
        let mut mapping = HashMap::new();
        for &v in &scheme.vars {
            let fresh = self.fresh_var(ctx);
            mapping.insert(v, fresh);
        }
        for c in &scheme.deferred {
            let c = substitute_constraint_vars(c, &mapping);
            self.add_constraint(c);
        }
        substitute_vars(&scheme.body, &mapping)
    }

    /// Take ownership of the root frame's accumulated constraints, wrapped
    /// for the solver. Used once, at the very end of a checking session.
    pub fn take_root_constraints(&mut self) -> Constraint {
        let root = self.frames.first_mut().expect("root frame must exist");
        Constraint::Many(std::mem::take(&mut root.constraints))
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }
}

fn substitute_vars(ty: &Type, mapping: &HashMap<u32, Type>) -> Type {
    match ty {
        Type::TV(id) => mapping.get(id).cloned().unwrap_or_else(|| ty.clone()),
        Type::TCon(def_id, args, name) => Type::TCon(
            *def_id,
            args.iter().map(|a| substitute_vars(a, mapping)).collect(),
            *name,
        ),
        Type::TArrow(params, ret) => Type::TArrow(
            params.iter().map(|p| substitute_vars(p, mapping)).collect(),
            Box::new(substitute_vars(ret, mapping)),
        ),
        Type::TTuple(elems) => Type::TTuple(elems.iter().map(|e| substitute_vars(e, mapping)).collect()),
        Type::Any => Type::Any,
    }
}

fn substitute_constraint_vars(c: &Constraint, mapping: &HashMap<u32, Type>) -> Constraint {
    match c {
        Constraint::Equal(l, r, span) => {
            Constraint::Equal(substitute_vars(l, mapping), substitute_vars(r, mapping), *span)
        }
        Constraint::Many(cs) => {
            Constraint::Many(cs.iter().map(|c| substitute_constraint_vars(c, mapping)).collect())
        }
    }
}

/// Run the explicit worklist solver over `root` against `ctx`'s
/// substitution, reporting any failures through `handler`. Diagnostics are
/// not fatal to the pass - unification continues past a failed compound
/// subterm so more than one problem can surface from a single run.
pub fn solve(ctx: &mut TypeContext, root: Constraint, handler: &mut Handler) {
    let mut worklist: VecDeque<Constraint> = VecDeque::new();
    worklist.push_back(root);

    while let Some(c) = worklist.pop_front() {
        match c {
            Constraint::Many(cs) => worklist.extend(cs),
            Constraint::Equal(l, r, span) => unify_step(ctx, l, r, span, handler, &mut worklist),
        }
    }
}

fn unify_step(
    ctx: &mut TypeContext,
    l: Type,
    r: Type,
    span: Span,
    handler: &mut Handler,
    worklist: &mut VecDeque<Constraint>,
) {
    let l = ctx.resolve_head(&l);
    let r = ctx.resolve_head(&r);

    if l == r {
        return;
    }

    match (&l, &r) {
        (Type::Any, _) | (_, Type::Any) => {}
        (Type::TV(v), _) => bind_or_occurs_check(ctx, *v, r, span, handler),
        (_, Type::TV(v)) => bind_or_occurs_check(ctx, *v, l, span, handler),
        // A zero-argument arrow models a thunk/value binding: forcing it
        // against any other type unifies its result with that type.
        (Type::TArrow(p, res), _) if p.is_empty() => {
            worklist.push_back(Constraint::Equal((**res).clone(), r, span));
        }
        (_, Type::TArrow(p, res)) if p.is_empty() => {
            worklist.push_back(Constraint::Equal(l, (**res).clone(), span));
        }
        (Type::TArrow(p1, r1), Type::TArrow(p2, r2)) => {
            if p1.len() != p2.len() {
                arity_mismatch(ctx, &l, &r, span, handler);
            } else {
                for (a, b) in p1.iter().zip(p2.iter()) {
                    worklist.push_back(Constraint::Equal(a.clone(), b.clone(), span));
                }
            }
            worklist.push_back(Constraint::Equal((**r1).clone(), (**r2).clone(), span));
        }
        (Type::TCon(id1, args1, _), Type::TCon(id2, args2, _)) => {
            if id1 != id2 || args1.len() != args2.len() {
                unification_failed(ctx, &l, &r, span, handler);
            } else {
                for (a, b) in args1.iter().zip(args2.iter()) {
                    worklist.push_back(Constraint::Equal(a.clone(), b.clone(), span));
                }
            }
        }
        (Type::TTuple(e1), Type::TTuple(e2)) => {
            if e1.len() != e2.len() {
                unification_failed(ctx, &l, &r, span, handler);
            } else {
                for (a, b) in e1.iter().zip(e2.iter()) {
                    worklist.push_back(Constraint::Equal(a.clone(), b.clone(), span));
                }
            }
        }
        _ => unification_failed(ctx, &l, &r, span, handler),
    }
}

fn bind_or_occurs_check(ctx: &mut TypeContext, v: u32, other: Type, span: Span, handler: &mut Handler) {
    if other.has_var(v) {
        let shown = ctx.resolve_deep(&other);
        DiagnosticBuilder::error(format!(
            "cannot construct the infinite type `?{}` = `{}`",
            v, shown
        ))
        .code(DiagnosticCode::E_SEMANTIC_INFINITE_TYPE)
        .span(span)
        .emit(handler);
        return;
    }
    ctx.bind(v, other);
}

fn arity_mismatch(ctx: &TypeContext, l: &Type, r: &Type, span: Span, handler: &mut Handler) {
    DiagnosticBuilder::error(format!(
        "expected `{}`, found `{}`: argument counts differ",
        ctx.resolve_deep(l),
        ctx.resolve_deep(r)
    ))
    .code(DiagnosticCode::E_SEMANTIC_ARITY_MISMATCH)
    .span(span)
    .emit(handler);
}

fn unification_failed(ctx: &TypeContext, l: &Type, r: &Type, span: Span, handler: &mut Handler) {
    DiagnosticBuilder::error(format!(
        "type mismatch: expected `{}`, found `{}`",
        ctx.resolve_deep(l),
        ctx.resolve_deep(r)
    ))
    .code(DiagnosticCode::E_SEMANTIC_TYPE_MISMATCH)
    .span(span)
    .emit(handler);
}

#[cfg(test)]
mod tests {
    use super::*;
    use orryc_util::DefIdGenerator;

    fn ctx() -> TypeContext {
        TypeContext::new(&DefIdGenerator::new())
    }

    #[test]
    fn unifying_a_variable_with_int_binds_it() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        let v = ctx.new_type_var();
        let id = match v { Type::TV(id) => id, _ => unreachable!() };
        solve(&mut ctx, Constraint::Equal(v, ctx.builtins.int_ty(), Span::DUMMY), &mut handler);
        assert_eq!(ctx.binding(id), Some(&ctx.builtins.int_ty()));
        assert!(!handler.has_errors());
    }

    #[test]
    fn mismatched_constructors_report_type_mismatch() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        solve(
            &mut ctx,
            Constraint::Equal(ctx.builtins.int_ty(), ctx.builtins.string_ty(), Span::DUMMY),
            &mut handler,
        );
        assert!(handler.has_errors());
    }

    #[test]
    fn mismatched_arrow_arity_reports_arity_mismatch() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        let l = Type::arrow(vec![ctx.builtins.int_ty()], ctx.builtins.int_ty());
        let r = Type::arrow(vec![ctx.builtins.int_ty(), ctx.builtins.int_ty()], ctx.builtins.int_ty());
        solve(&mut ctx, Constraint::Equal(l, r, Span::DUMMY), &mut handler);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == Some(DiagnosticCode::E_SEMANTIC_ARITY_MISMATCH)));
    }

    #[test]
    fn self_referential_type_reports_infinite_type() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        let v = ctx.new_type_var();
        let id = match v { Type::TV(id) => id, _ => unreachable!() };
        let cyclic = Type::TTuple(vec![Type::TV(id)]);
        solve(&mut ctx, Constraint::Equal(v, cyclic, Span::DUMMY), &mut handler);
        assert!(handler
            .diagnostics()
            .iter()
            .any(|d| d.code == Some(DiagnosticCode::E_SEMANTIC_INFINITE_TYPE)));
    }

    #[test]
    fn any_unifies_with_a_concrete_type_without_error() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        solve(&mut ctx, Constraint::Equal(Type::Any, ctx.builtins.int_ty(), Span::DUMMY), &mut handler);
        assert!(!handler.has_errors());
    }

    #[test]
    fn zero_arg_arrow_forces_against_its_result() {
        let mut ctx = ctx();
        let mut handler = Handler::new();
        let thunk = Type::arrow(vec![], ctx.builtins.int_ty());
        solve(&mut ctx, Constraint::Equal(thunk, ctx.builtins.int_ty(), Span::DUMMY), &mut handler);
        assert!(!handler.has_errors());
    }

    #[test]
    fn instantiate_freshens_generalized_variables_per_call() {
        let mut ctx = ctx();
        let mut engine = InferEngine::new(&mut ctx);
        let scheme = Scheme {
            vars: vec![100],
            deferred: Vec::new(),
            body: Type::arrow(vec![Type::TV(100)], Type::TV(100)),
        };
        let t1 = engine.instantiate(&scheme, &mut ctx);
        let t2 = engine.instantiate(&scheme, &mut ctx);
        assert_ne!(t1, t2);
    }

    #[test]
    fn add_constraint_attaches_to_frame_owning_the_variable() {
        let mut ctx = ctx();
        let mut engine = InferEngine::new(&mut ctx);
        engine.push_frame(None);
        let v = engine.fresh_var(&mut ctx);
        engine.add_constraint(Constraint::Equal(v, ctx.builtins.int_ty(), Span::DUMMY));
        let (vars, constraints) = engine.pop_for_generalization();
        assert_eq!(vars.len(), 1);
        assert_eq!(constraints.len(), 1);
    }

    #[test]
    fn builtin_equality_operator_is_polymorphic() {
        let mut ctx = ctx();
        let engine = InferEngine::new(&mut ctx);
        let scheme = engine.lookup_scheme(Symbol::intern("==")).unwrap();
        assert_eq!(scheme.vars.len(), 1);
    }
}
