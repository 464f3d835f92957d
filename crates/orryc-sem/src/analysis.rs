//! Name resolution and type checking, producing HIR.
//!
//! ============================================================================
//! PIPELINE
//! ============================================================================
//!
//! `analyze_items` runs in three passes:
//!
//! 1. `collect_items` binds every top-level name up front (so mutually
//!    recursive and forward references resolve) and, for structs/enums,
//!    eagerly computes their canonical nominal type and constructor shape -
//!    there is no inference to defer for a declaration with no body.
//! 2. Functions are grouped by strongly-connected component
//!    ([`RefGraph::sccs`]) and inferred one component at a time: every
//!    function in the group gets fresh parameter/return type variables up
//!    front, bodies are checked against those variables, and the whole
//!    group's accumulated type variables are generalized together once every
//!    body has been walked.
//! 3. [`infer::solve`] runs once, over every constraint emitted by every
//!    group, and the resulting substitution is applied to the produced HIR so
//!    every node shows its fully-resolved type.

use crate::hir::*;
use crate::infer::{self, Constraint, InferEngine, Scheme};
use crate::refgraph::RefGraph;
use crate::scope::{kind_mask, BindingKind, RibKind, ScopeTree};
use crate::types::{Type, TypeContext};
use orryc_syntax as ast;
use orryc_util::{DefId, DefIdGenerator, DiagnosticBuilder, DiagnosticCode, Handler, Span, Symbol};
use std::collections::HashMap;

/// The shape of values that construct a nominal type: what a `Call` whose
/// callee is this constructor's `DefId` must supply as arguments.
#[derive(Debug, Clone)]
enum CtorShape {
    Unit,
    Tuple(Vec<Type>),
    Struct(Vec<(Symbol, Type)>),
}

#[derive(Debug, Clone)]
struct Ctor {
    def_id: DefId,
    owner: DefId,
    display_name: Symbol,
    shape: CtorShape,
}

/// Main semantic analyzer: name resolution and Hindley-Milner type
/// inference, driven in per-SCC groups.
pub struct SemanticAnalyzer<'a> {
    pub type_context: &'a mut TypeContext,
    pub scope_tree: ScopeTree,
    pub def_id_gen: &'a DefIdGenerator,
    pub handler: &'a mut Handler,
    engine: InferEngine,
    struct_fields: HashMap<DefId, Vec<FieldDef>>,
    enum_variants: HashMap<DefId, Vec<VariantDef>>,
    struct_ctors: HashMap<Symbol, Ctor>,
    enum_ctors: HashMap<(Symbol, Symbol), Ctor>,
    error_count: usize,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(
        type_context: &'a mut TypeContext,
        def_id_gen: &'a DefIdGenerator,
        handler: &'a mut Handler,
    ) -> Self {
        let engine = InferEngine::new(&mut *type_context);
        let mut scope_tree = ScopeTree::new();

        let int_id = type_context.builtins.int;
        let string_id = type_context.builtins.string;
        let bool_id = type_context.builtins.bool_;
        let int_ty = type_context.builtins.int_ty();
        let string_ty = type_context.builtins.string_ty();
        let bool_ty = type_context.builtins.bool_ty();
        type_context.set_def_type(int_id, int_ty);
        type_context.set_def_type(string_id, string_ty);
        type_context.set_def_type(bool_id, bool_ty);
        scope_tree.add_binding_kind(Symbol::intern("Int"), int_id, BindingKind::Type);
        scope_tree.add_binding_kind(Symbol::intern("String"), string_id, BindingKind::Type);
        scope_tree.add_binding_kind(Symbol::intern("Bool"), bool_id, BindingKind::Type);

        Self {
            type_context,
            scope_tree,
            def_id_gen,
            handler,
            engine,
            struct_fields: HashMap::new(),
            enum_variants: HashMap::new(),
            struct_ctors: HashMap::new(),
            enum_ctors: HashMap::new(),
            error_count: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// A name did not resolve against any scope or inference-engine
    /// environment. Reported once, then recovered as `Any` so the rest of
    /// the enclosing declaration still gets checked.
    fn binding_not_found(&mut self, name: Symbol, span: Span) {
        self.error_count += 1;
        DiagnosticBuilder::error(format!("no binding found for `{}`", name.as_str()))
            .code(DiagnosticCode::E_SEMANTIC_BINDING_NOT_FOUND)
            .span(span)
            .emit(self.handler);
    }

    fn type_error(&mut self, message: impl Into<String>, span: Span) {
        self.error_count += 1;
        DiagnosticBuilder::error(message).span(span).emit(self.handler);
    }

    /// Translate a surface type annotation. A struct/enum/builtin name
    /// resolves to its canonical nominal type; an omitted annotation becomes
    /// a fresh variable rather than `Any`, so real inference still pins it
    /// down. Constructs this language has no use for (references, pointers,
    /// slices, arrays, trait objects, `impl Trait`, generics, `!`) map to
    /// `Any`.
    fn ast_type_to_hir(&mut self, ty: &ast::Type) -> Type {
        match ty {
            ast::Type::Unit => Type::TTuple(Vec::new()),
            ast::Type::Inferred => self.engine.fresh_var(&mut *self.type_context),
            ast::Type::Path(path) => match path.segments.last() {
                Some(seg) => match self.scope_tree.lookup(seg.ident, kind_mask::TYPE) {
                    Some(def_id) => self
                        .type_context
                        .type_of_def(def_id)
                        .cloned()
                        .unwrap_or(Type::Any),
                    None => {
                        self.binding_not_found(seg.ident, Span::DUMMY);
                        Type::Any
                    },
                },
                None => Type::Any,
            },
            ast::Type::Fn(params, ret) => {
                let params = params.iter().map(|p| self.ast_type_to_hir(p)).collect();
                let ret = self.ast_type_to_hir(ret);
                Type::arrow(params, ret)
            },
            ast::Type::Tuple(tys) => {
                Type::TTuple(tys.iter().map(|t| self.ast_type_to_hir(t)).collect())
            },
            ast::Type::Never
            | ast::Type::Generic(_, _)
            | ast::Type::Reference(_, _)
            | ast::Type::Pointer(_, _)
            | ast::Type::Slice(_)
            | ast::Type::Array(_, _)
            | ast::Type::TraitObject(_)
            | ast::Type::ImplTrait(_) => Type::Any,
        }
    }

    /// Bind every top-level name so forward and mutually recursive
    /// references resolve, and compute structs'/enums' canonical types and
    /// constructor shapes - there is no body to infer for these, so this is
    /// the only pass they need.
    fn collect_items(&mut self, items: &[ast::Item]) {
        for item in items {
            match item {
                ast::Item::Fn(f) => {
                    let def_id = self.def_id_gen.next();
                    self.scope_tree.add_binding(f.name, def_id);
                },
                ast::Item::Struct(s) => {
                    let def_id = self.def_id_gen.next();
                    self.scope_tree.add_binding_kind(s.name, def_id, BindingKind::Type);
                    self.scope_tree.add_binding_kind(s.name, def_id, BindingKind::Var);
                },
                ast::Item::Enum(e) => {
                    let def_id = self.def_id_gen.next();
                    self.scope_tree.add_binding_kind(e.name, def_id, BindingKind::Type);
                },
                ast::Item::Const(c) => {
                    let def_id = self.def_id_gen.next();
                    self.scope_tree.add_binding(c.name, def_id);
                },
                ast::Item::Static(s) => {
                    let def_id = self.def_id_gen.next();
                    self.scope_tree.add_binding(s.name, def_id);
                },
                ast::Item::Use(u) => {
                    let def_id = self.def_id_gen.next();
                    if let Some(seg) = u.path.segments.first() {
                        self.scope_tree.add_binding(seg.ident, def_id);
                    }
                },
                // Traits and impls have no counterpart in this checker.
                ast::Item::Trait(_) | ast::Item::Impl(_) => {},
            }
        }

        for item in items {
            match item {
                ast::Item::Struct(s) => self.collect_struct(s),
                ast::Item::Enum(e) => self.collect_enum(e),
                _ => {},
            }
        }
    }

    fn collect_struct(&mut self, s: &ast::StructItem) {
        let def_id = match self.scope_tree.lookup(s.name, kind_mask::TYPE) {
            Some(id) => id,
            None => return,
        };
        let fields: Vec<FieldDef> = s
            .fields
            .iter()
            .map(|f| FieldDef { name: f.name, ty: self.ast_type_to_hir(&f.ty) })
            .collect();
        let arg_types: Vec<Type> = fields.iter().map(|f| f.ty.clone()).collect();
        let canonical = Type::TCon(def_id, arg_types, s.name);
        self.type_context.set_def_type(def_id, canonical);
        self.struct_ctors.insert(
            s.name,
            Ctor {
                def_id,
                owner: def_id,
                display_name: s.name,
                shape: CtorShape::Struct(fields.iter().map(|f| (f.name, f.ty.clone())).collect()),
            },
        );
        self.struct_fields.insert(def_id, fields);
    }

    fn collect_enum(&mut self, e: &ast::EnumItem) {
        let def_id = match self.scope_tree.lookup(e.name, kind_mask::TYPE) {
            Some(id) => id,
            None => return,
        };
        // Orrery enums are not parameterized: the nominal type's own arg
        // list is empty regardless of what its variants carry.
        self.type_context
            .set_def_type(def_id, Type::TCon(def_id, Vec::new(), e.name));

        let mut variants = Vec::new();
        for variant in &e.variants {
            let variant_id = self.def_id_gen.next();
            self.scope_tree.add_binding_kind(variant.name, variant_id, BindingKind::Var);

            let (hir_data, shape) = match &variant.data {
                ast::VariantData::Unit => (VariantData::Unit, CtorShape::Unit),
                ast::VariantData::Tuple(tys) => {
                    let tys: Vec<Type> = tys.iter().map(|t| self.ast_type_to_hir(t)).collect();
                    (VariantData::Tuple(tys.clone()), CtorShape::Tuple(tys))
                },
                ast::VariantData::Struct(fields) => {
                    let fields: Vec<FieldDef> = fields
                        .iter()
                        .map(|f| FieldDef { name: f.name, ty: self.ast_type_to_hir(&f.ty) })
                        .collect();
                    let shape_fields = fields.iter().map(|f| (f.name, f.ty.clone())).collect();
                    (VariantData::Struct(fields), CtorShape::Struct(shape_fields))
                },
            };

            self.enum_ctors.insert(
                (e.name, variant.name),
                Ctor { def_id: variant_id, owner: def_id, display_name: variant.name, shape },
            );
            variants.push(VariantDef { def_id: variant_id, name: variant.name, data: hir_data });
        }
        self.enum_variants.insert(def_id, variants);
    }

    fn struct_item_hir(&self, s: &ast::StructItem) -> Option<Item> {
        let def_id = self.scope_tree.lookup(s.name, kind_mask::TYPE)?;
        let fields = self.struct_fields.get(&def_id).cloned().unwrap_or_default();
        Some(Item::Struct(StructItem { def_id, name: s.name, fields }))
    }

    fn enum_item_hir(&self, e: &ast::EnumItem) -> Option<Item> {
        let def_id = self.scope_tree.lookup(e.name, kind_mask::TYPE)?;
        let variants = self.enum_variants.get(&def_id).cloned().unwrap_or_default();
        Some(Item::Enum(EnumItem { def_id, name: e.name, variants }))
    }

    /// Analyze a whole program: collect names, check each function group in
    /// callee-before-caller order, solve every deferred constraint once, and
    /// substitute the result through the produced HIR.
    pub fn analyze_items(&mut self, items: Vec<ast::Item>) -> Vec<Item> {
        tracing::debug!(count = items.len(), "analyzing items");
        self.collect_items(&items);
        let graph = RefGraph::build(&items);
        let sccs = graph.sccs();

        let mut hir_items = Vec::new();
        let mut slots: Vec<Option<ast::Item>> = items.into_iter().map(Some).collect();

        for slot in slots.iter_mut() {
            let hir = match slot.as_ref() {
                Some(ast::Item::Struct(s)) => self.struct_item_hir(s),
                Some(ast::Item::Enum(e)) => self.enum_item_hir(e),
                _ => None,
            };
            if hir.is_some() {
                slot.take();
            }
            if let Some(item) = hir {
                hir_items.push(item);
            }
        }

        for component in &sccs {
            let fn_items: Vec<ast::FnItem> = component
                .iter()
                .filter_map(|&idx| match slots[idx].take() {
                    Some(ast::Item::Fn(f)) => Some(f),
                    _ => None,
                })
                .collect();
            hir_items.extend(self.analyze_fn_group(fn_items));
        }

        let root = self.engine.take_root_constraints();
        infer::solve(self.type_context, root, self.handler);

        for item in &mut hir_items {
            resolve_item_types(item, self.type_context);
        }

        tracing::debug!(count = hir_items.len(), "generated HIR items");
        hir_items
    }

    /// Infer a strongly-connected component of mutually recursive functions
    /// together: every function gets fresh parameter/return variables before
    /// any body is checked, and the whole group's variables are generalized
    /// as one scheme per function once every body has been walked.
    fn analyze_fn_group(&mut self, fn_items: Vec<ast::FnItem>) -> Vec<Item> {
        self.engine.push_frame(None);

        struct Prepared {
            def_id: DefId,
            name: Symbol,
            param_vars: Vec<Type>,
            return_var: Type,
            ast_fn: ast::FnItem,
        }

        let mut prepared = Vec::new();
        for ast_fn in fn_items {
            let def_id = match self.scope_tree.resolve(ast_fn.name) {
                Some(id) => id,
                None => continue,
            };
            let param_vars: Vec<Type> = ast_fn
                .params
                .iter()
                .map(|_| self.engine.fresh_var(&mut *self.type_context))
                .collect();
            let return_var = self.engine.fresh_var(&mut *self.type_context);
            let arrow = Type::arrow(param_vars.clone(), return_var.clone());
            self.engine.bind_in_current(ast_fn.name, Scheme::monomorphic(arrow.clone()));
            self.type_context.set_def_type(def_id, arrow);
            prepared.push(Prepared { def_id, name: ast_fn.name, param_vars, return_var, ast_fn });
        }

        let mut checked = Vec::new();
        for p in prepared {
            self.engine.push_frame(Some(p.return_var.clone()));
            self.scope_tree.enter_scope(RibKind::Function);

            let mut params = Vec::new();
            for (i, param) in p.ast_fn.params.iter().enumerate() {
                let var_ty = p.param_vars[i].clone();
                let param_def_id = self.def_id_gen.next();
                self.scope_tree.add_binding(param.name, param_def_id);
                self.type_context.set_def_type(param_def_id, var_ty.clone());

                if !matches!(param.ty, ast::Type::Inferred) {
                    let declared = self.ast_type_to_hir(&param.ty);
                    self.engine.add_constraint(Constraint::Equal(var_ty.clone(), declared, Span::DUMMY));
                }
                params.push(Param {
                    pat: Pattern::Binding { name: param.name, ty: var_ty.clone(), mutability: param.mutable },
                    ty: var_ty,
                });
            }

            let body_expr = self.analyze_block(p.ast_fn.body.clone());
            self.scope_tree.exit_scope();

            let Some(body_expr) = body_expr else {
                self.engine.pop_and_merge();
                continue;
            };

            let body_ty = body_expr.ty();
            self.engine.add_constraint(Constraint::Equal(body_ty, p.return_var.clone(), Span::DUMMY));

            if let Some(declared_ret) = p.ast_fn.ret_type.clone() {
                let declared = self.ast_type_to_hir(&declared_ret);
                self.engine.add_constraint(Constraint::Equal(p.return_var.clone(), declared, Span::DUMMY));
            } else {
                self.engine.add_constraint(Constraint::Equal(
                    p.return_var.clone(),
                    Type::TTuple(Vec::new()),
                    Span::DUMMY,
                ));
            }

            self.engine.pop_and_merge();
            let param_pats: Vec<Pattern> = params.iter().map(|pp| pp.pat.clone()).collect();
            checked.push((p.def_id, p.name, Body { params: param_pats, value: body_expr }, params));
        }

        let (group_vars, group_constraints) = self.engine.pop_for_generalization();
        let deferred = vec![Constraint::Many(group_constraints)];

        let mut result = Vec::new();
        for (def_id, name, body, params) in checked {
            let arrow = self.type_context.type_of_def(def_id).cloned().unwrap_or(Type::Any);
            let mut vars: Vec<u32> = arrow.free_vars().into_iter().filter(|v| group_vars.contains(v)).collect();
            vars.sort_unstable();
            vars.dedup();
            self.engine.bind_in_current(
                name,
                Scheme { vars, deferred: deferred.clone(), body: arrow.clone() },
            );

            let ret_type = match &arrow {
                Type::TArrow(_, ret) => (**ret).clone(),
                other => other.clone(),
            };
            result.push(Item::Function(FnItem { def_id, name, params, ret_type, body }));
        }
        result
    }

    fn analyze_block(&mut self, block: ast::Block) -> Option<Expr> {
        self.scope_tree.enter_scope(RibKind::Block);

        let mut stmts = Vec::new();
        for stmt in block.stmts {
            if let Some(s) = self.analyze_stmt(stmt) {
                stmts.push(s);
            }
        }

        let (ty, expr) = match block.trailing {
            Some(trailing) => match self.analyze_expr(*trailing) {
                Some(e) => (e.ty(), Some(Box::new(e))),
                None => (Type::Any, None),
            },
            None => (Type::TTuple(Vec::new()), None),
        };

        self.scope_tree.exit_scope();
        Some(Expr::Block { stmts, expr, ty })
    }

    fn analyze_stmt(&mut self, stmt: ast::Stmt) -> Option<Stmt> {
        match stmt {
            ast::Stmt::Let(l) => self.analyze_let(l),
            ast::Stmt::If(if_stmt) => {
                let if_expr = self.analyze_if(ast::IfExpr {
                    cond: Box::new(if_stmt.cond),
                    then_block: if_stmt.then_block,
                    else_block: if_stmt.else_clause.map(|c| else_clause_to_expr(*c)),
                })?;
                Some(Stmt::Expr(if_expr))
            },
            ast::Stmt::Expr(e) => self.analyze_expr(e).map(Stmt::Expr),
            ast::Stmt::Return(value) => self.analyze_return(value.map(Box::new)).map(Stmt::Expr),
            _ => None,
        }
    }

    /// A `let` with an initializer is generalized in isolation: the type
    /// variables minted while checking the initializer are popped off into
    /// their own scheme rather than merged into the enclosing function, so
    /// `let id = |x| x` can be used at more than one type within the same
    /// body without the surrounding function's own variables leaking in.
    fn analyze_let(&mut self, l: ast::LetStmt) -> Option<Stmt> {
        let (name, mutability) = match &l.pattern {
            ast::Pattern::Ident(s, m) => (*s, matches!(m, ast::Mutability::Mutable)),
            _ => (Symbol::intern("_"), false),
        };

        let (ty, init) = match l.init {
            Some(init_ast) => {
                self.engine.push_frame(None);
                let init_expr = self.analyze_expr(init_ast);
                let init_ty = init_expr.as_ref().map(|e| e.ty()).unwrap_or(Type::Any);
                if let Some(declared) = l.ty.as_ref() {
                    let declared = self.ast_type_to_hir(declared);
                    self.engine.add_constraint(Constraint::Equal(init_ty.clone(), declared, Span::DUMMY));
                }
                let (vars, constraints) = self.engine.pop_for_generalization();
                let scheme = Scheme { vars: vars.into_iter().collect(), deferred: constraints, body: init_ty.clone() };
                self.engine.bind_in_current(name, scheme);
                (init_ty, init_expr)
            },
            None => {
                let fresh = self.engine.fresh_var(&mut *self.type_context);
                (fresh, None)
            },
        };

        let def_id = self.def_id_gen.next();
        self.scope_tree.add_binding(name, def_id);
        self.type_context.set_def_type(def_id, ty.clone());

        Some(Stmt::Let {
            pat: Pattern::Binding { name, ty: ty.clone(), mutability },
            ty,
            init,
        })
    }

    fn analyze_expr(&mut self, expr: ast::Expr) -> Option<Expr> {
        match expr {
            ast::Expr::Literal(lit) => self.analyze_literal(lit),
            ast::Expr::Path(path) => self.analyze_path(path),
            ast::Expr::Binary(bin) => self.analyze_binary(bin),
            ast::Expr::Unary(unary) => self.analyze_unary(unary),
            ast::Expr::If(if_expr) => self.analyze_if(if_expr),
            ast::Expr::Call(call) => self.analyze_call(call),
            ast::Expr::Block(block) => self.analyze_block(block),
            ast::Expr::Tuple(items) => self.analyze_tuple(items),
            ast::Expr::Match(match_expr) => self.analyze_match(match_expr),
            ast::Expr::Return(ret) => self.analyze_return(ret),
            ast::Expr::StructLiteral(lit) => self.analyze_struct_literal(*lit),
            ast::Expr::EnumVariant(ev) => self.analyze_enum_variant(*ev),
            // Arrays, indexing, field access, closures, assignment, ranges,
            // casts, and async/await are outside this checker's scope.
            _ => None,
        }
    }

    fn analyze_literal(&mut self, lit: ast::Literal) -> Option<Expr> {
        let b = self.type_context.builtins;
        let (lit_kind, ty) = match lit {
            ast::Literal::Int(n) => (Literal::Int(n), b.int_ty()),
            ast::Literal::Float(f) => (Literal::Float(f), b.int_ty()),
            ast::Literal::String(s) => (Literal::String(s), b.string_ty()),
            ast::Literal::Bool(bv) => (Literal::Bool(bv), b.bool_ty()),
            ast::Literal::Char(c) => (Literal::Char(c), b.string_ty()),
            ast::Literal::Unit => (Literal::Unit, Type::TTuple(Vec::new())),
        };
        Some(Expr::Literal { lit: lit_kind, ty })
    }

    /// Resolve a name. A generalized binding (a function or a generalized
    /// `let`) is looked up in the inference engine's environment and
    /// instantiated fresh; a monomorphic binding (a parameter, a `let`
    /// without an initializer) is looked up through the definition table. An
    /// unresolved name is not fatal: it is reported once and recovered as
    /// `Any`, so the rest of the enclosing declaration still gets checked.
    fn analyze_path(&mut self, path: ast::Path) -> Option<Expr> {
        let name = match path.segments.last() {
            Some(seg) => seg.ident,
            None => return None,
        };

        if let Some(scheme) = self.engine.lookup_scheme(name).cloned() {
            let ty = self.engine.instantiate(&scheme, &mut *self.type_context);
            let def_id = self.scope_tree.resolve(name).unwrap_or(DefId::DUMMY);
            return Some(Expr::Var { def_id, ty });
        }
        if let Some(def_id) = self.scope_tree.resolve(name) {
            let ty = self.type_context.type_of_def(def_id).cloned().unwrap_or(Type::Any);
            return Some(Expr::Var { def_id, ty });
        }

        self.binding_not_found(name, Span::DUMMY);
        Some(Expr::Var { def_id: DefId::DUMMY, ty: Type::Any })
    }

    fn analyze_binary(&mut self, expr: ast::BinaryExpr) -> Option<Expr> {
        let left = self.analyze_expr(*expr.left)?;
        let right = self.analyze_expr(*expr.right)?;
        let op = self.convert_binop(expr.op, expr.span)?;

        let left_ty = left.ty();
        let right_ty = right.ty();
        let int_ty = self.type_context.builtins.int_ty();
        let bool_ty = self.type_context.builtins.bool_ty();

        let ty = match op {
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Mod => {
                self.engine.add_constraint(Constraint::Equal(left_ty, int_ty.clone(), expr.span));
                self.engine.add_constraint(Constraint::Equal(right_ty, int_ty.clone(), expr.span));
                int_ty
            },
            BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                self.engine.add_constraint(Constraint::Equal(left_ty, int_ty.clone(), expr.span));
                self.engine.add_constraint(Constraint::Equal(right_ty, int_ty, expr.span));
                bool_ty
            },
            BinOp::Eq | BinOp::Ne => {
                self.engine.add_constraint(Constraint::Equal(left_ty, right_ty, expr.span));
                bool_ty
            },
            BinOp::And | BinOp::Or => {
                self.engine.add_constraint(Constraint::Equal(left_ty, bool_ty.clone(), expr.span));
                self.engine.add_constraint(Constraint::Equal(right_ty, bool_ty.clone(), expr.span));
                bool_ty
            },
        };

        Some(Expr::Binary { op, left: Box::new(left), right: Box::new(right), ty })
    }

    fn convert_binop(&mut self, op: ast::BinOp, span: Span) -> Option<BinOp> {
        match op {
            ast::BinOp::Add => Some(BinOp::Add),
            ast::BinOp::Sub => Some(BinOp::Sub),
            ast::BinOp::Mul => Some(BinOp::Mul),
            ast::BinOp::Div => Some(BinOp::Div),
            ast::BinOp::Mod => Some(BinOp::Mod),
            ast::BinOp::Eq => Some(BinOp::Eq),
            ast::BinOp::Ne => Some(BinOp::Ne),
            ast::BinOp::Lt => Some(BinOp::Lt),
            ast::BinOp::Gt => Some(BinOp::Gt),
            ast::BinOp::Le => Some(BinOp::Le),
            ast::BinOp::Ge => Some(BinOp::Ge),
            ast::BinOp::And => Some(BinOp::And),
            ast::BinOp::Or => Some(BinOp::Or),
            ast::BinOp::BitAnd | ast::BinOp::BitOr | ast::BinOp::BitXor
            | ast::BinOp::Shl | ast::BinOp::Shr => {
                self.type_error("bitwise operators are not part of this language", span);
                None
            },
        }
    }

    fn analyze_unary(&mut self, expr: ast::UnaryExpr) -> Option<Expr> {
        let inner = self.analyze_expr(*expr.expr)?;
        let inner_ty = inner.ty();
        let int_ty = self.type_context.builtins.int_ty();
        let bool_ty = self.type_context.builtins.bool_ty();

        let (op, ty) = match expr.op {
            ast::UnOp::Neg => {
                self.engine.add_constraint(Constraint::Equal(inner_ty, int_ty.clone(), expr.span));
                (UnOp::Neg, int_ty)
            },
            ast::UnOp::Not => {
                self.engine.add_constraint(Constraint::Equal(inner_ty, bool_ty.clone(), expr.span));
                (UnOp::Not, bool_ty)
            },
            ast::UnOp::BitNot | ast::UnOp::Deref | ast::UnOp::Ref(_) => {
                self.type_error("this unary operator is not part of this language", expr.span);
                return None;
            },
        };

        Some(Expr::Unary { op, expr: Box::new(inner), ty })
    }

    fn analyze_call(&mut self, call: ast::CallExpr) -> Option<Expr> {
        let func = self.analyze_expr(*call.func)?;
        let args: Vec<Expr> = call.args.into_iter().filter_map(|a| self.analyze_expr(a)).collect();

        let func_ty = func.ty();
        let fresh_ret = self.engine.fresh_var(&mut *self.type_context);
        let arg_tys = args.iter().map(|a| a.ty()).collect();
        self.engine.add_constraint(Constraint::Equal(
            func_ty,
            Type::arrow(arg_tys, fresh_ret.clone()),
            call.span,
        ));

        Some(Expr::Call { func: Box::new(func), args, ty: fresh_ret })
    }

    /// `Point { x: 1, y: 2 }` elaborates into a call to the struct's
    /// constructor `DefId`, with the provided fields reordered to the
    /// struct's declared field order. Each field's inferred type is checked
    /// against the struct's declared field type; the call's own result type
    /// is the struct's canonical type, not rebuilt from the argument types.
    fn analyze_struct_literal(&mut self, lit: ast::StructLiteralExpr) -> Option<Expr> {
        let name = lit.path.segments.last()?.ident;
        let ctor = self.struct_ctors.get(&name).cloned();
        let Some(ctor) = ctor else {
            self.binding_not_found(name, Span::DUMMY);
            return Some(Expr::Literal { lit: Literal::Unit, ty: Type::Any });
        };
        let CtorShape::Struct(declared_fields) = ctor.shape.clone() else {
            self.type_error(format!("`{}` is not a struct", name.as_str()), Span::DUMMY);
            return Some(Expr::Literal { lit: Literal::Unit, ty: Type::Any });
        };

        let mut provided: HashMap<Symbol, Expr> = HashMap::new();
        for field in lit.fields {
            if let Some(e) = self.analyze_expr(field.expr) {
                provided.insert(field.name, e);
            }
        }

        let mut args = Vec::new();
        for (field_name, declared_ty) in &declared_fields {
            match provided.remove(field_name) {
                Some(e) => {
                    self.engine.add_constraint(Constraint::Equal(e.ty(), declared_ty.clone(), Span::DUMMY));
                    args.push(e);
                },
                None => {
                    self.type_error(
                        format!("missing field `{}` in `{}`", field_name.as_str(), name.as_str()),
                        Span::DUMMY,
                    );
                },
            }
        }

        let result_ty = self.type_context.type_of_def(ctor.owner).cloned().unwrap_or(Type::Any);
        let func = Expr::Var { def_id: ctor.def_id, ty: Type::Any };
        Some(Expr::Call { func: Box::new(func), args, ty: result_ty })
    }

    /// `Color::Red` / `Option::Some(x)` elaborate the same way: a call to
    /// the variant's own `DefId`, with the enum's own (argument-less)
    /// nominal type as the result.
    fn analyze_enum_variant(&mut self, ev: ast::EnumVariantExpr) -> Option<Expr> {
        let enum_name = ev.path.segments.last()?.ident;
        let ctor = self.enum_ctors.get(&(enum_name, ev.variant)).cloned();
        let Some(ctor) = ctor else {
            self.binding_not_found(ev.variant, Span::DUMMY);
            return Some(Expr::Literal { lit: Literal::Unit, ty: Type::Any });
        };

        let args = match (ev.data, ctor.shape.clone()) {
            (ast::EnumVariantData::Unit, CtorShape::Unit) => Vec::new(),
            (ast::EnumVariantData::Tuple(exprs), CtorShape::Tuple(tys)) => exprs
                .into_iter()
                .zip(tys.iter())
                .filter_map(|(e, declared)| {
                    let e = self.analyze_expr(e)?;
                    self.engine.add_constraint(Constraint::Equal(e.ty(), declared.clone(), Span::DUMMY));
                    Some(e)
                })
                .collect(),
            (ast::EnumVariantData::Struct(fields), CtorShape::Struct(declared_fields)) => {
                let mut provided: HashMap<Symbol, Expr> = HashMap::new();
                for field in fields {
                    if let Some(e) = self.analyze_expr(field.expr) {
                        provided.insert(field.name, e);
                    }
                }
                declared_fields
                    .iter()
                    .filter_map(|(fname, declared)| {
                        let e = provided.remove(fname)?;
                        self.engine.add_constraint(Constraint::Equal(e.ty(), declared.clone(), Span::DUMMY));
                        Some(e)
                    })
                    .collect()
            },
            _ => {
                self.type_error(
                    format!(
                        "`{}::{}` constructed with the wrong shape",
                        enum_name.as_str(),
                        ctor.display_name.as_str()
                    ),
                    Span::DUMMY,
                );
                Vec::new()
            },
        };

        let result_ty = self.type_context.type_of_def(ctor.owner).cloned().unwrap_or(Type::Any);
        let func = Expr::Var { def_id: ctor.def_id, ty: Type::Any };
        Some(Expr::Call { func: Box::new(func), args, ty: result_ty })
    }

    fn analyze_tuple(&mut self, items: Vec<ast::Expr>) -> Option<Expr> {
        let analyzed: Vec<Expr> = items.into_iter().filter_map(|e| self.analyze_expr(e)).collect();
        let ty = Type::TTuple(analyzed.iter().map(|e| e.ty()).collect());
        Some(Expr::Tuple { elems: analyzed, ty })
    }

    fn analyze_match(&mut self, match_expr: ast::MatchExpr) -> Option<Expr> {
        let scrutinee = self.analyze_expr(*match_expr.scrutinee)?;
        let scrutinee_ty = scrutinee.ty();
        let result_ty = self.engine.fresh_var(&mut *self.type_context);

        let mut arms = Vec::new();
        for arm in match_expr.arms {
            self.scope_tree.enter_scope(RibKind::Block);
            let pat = self.analyze_pattern(arm.pattern, &scrutinee_ty);
            let guard = arm.guard.and_then(|g| self.analyze_expr(g));
            let body = self.analyze_expr(arm.body);
            self.scope_tree.exit_scope();

            let (Some(pat), Some(body)) = (pat, body) else { continue };
            self.engine.add_constraint(Constraint::Equal(body.ty(), result_ty.clone(), Span::DUMMY));
            arms.push(Arm { pat, guard, body });
        }

        Some(Expr::Match { scrutinee: Box::new(scrutinee), arms, ty: result_ty })
    }

    /// Analyze a pattern against the type it is expected to match, unifying
    /// every name it binds with the corresponding piece of `expected`.
    fn analyze_pattern(&mut self, pat: ast::Pattern, expected: &Type) -> Option<Pattern> {
        match pat {
            ast::Pattern::Wildcard => Some(Pattern::Wildcard),
            ast::Pattern::Ident(name, mutability) => {
                let def_id = self.def_id_gen.next();
                self.scope_tree.add_binding(name, def_id);
                self.type_context.set_def_type(def_id, expected.clone());
                Some(Pattern::Binding {
                    name,
                    ty: expected.clone(),
                    mutability: matches!(mutability, ast::Mutability::Mutable),
                })
            },
            ast::Pattern::Literal(lit) => {
                let lit_expr = self.analyze_literal(lit)?;
                if let Expr::Literal { ty, .. } = &lit_expr {
                    self.engine.add_constraint(Constraint::Equal(ty.clone(), expected.clone(), Span::DUMMY));
                }
                Some(Pattern::Binding { name: Symbol::intern("_"), ty: expected.clone(), mutability: false })
            },
            ast::Pattern::Path(path) => {
                let name = path.segments.last()?.ident;
                match self.scope_tree.resolve(name) {
                    Some(def_id) => Some(Pattern::Path { def_id }),
                    None => {
                        self.binding_not_found(name, Span::DUMMY);
                        Some(Pattern::Path { def_id: DefId::DUMMY })
                    },
                }
            },
            ast::Pattern::Tuple(pats) => {
                let elem_expected: Vec<Type> = match expected {
                    Type::TTuple(elems) if elems.len() == pats.len() => elems.clone(),
                    _ => (0..pats.len()).map(|_| self.engine.fresh_var(&mut *self.type_context)).collect(),
                };
                let analyzed: Vec<Pattern> = pats
                    .into_iter()
                    .zip(elem_expected)
                    .filter_map(|(p, t)| self.analyze_pattern(p, &t))
                    .collect();
                Some(Pattern::Tuple { pats: analyzed })
            },
            ast::Pattern::TupleStruct(path, pats) => {
                let enum_name = path.segments.first()?.ident;
                let variant_name = path.segments.last()?.ident;
                let ctor = self.enum_ctors.get(&(enum_name, variant_name)).cloned();
                let Some(ctor) = ctor else {
                    self.binding_not_found(variant_name, Span::DUMMY);
                    return None;
                };
                let declared = match ctor.shape {
                    CtorShape::Tuple(tys) => tys,
                    _ => Vec::new(),
                };
                let analyzed: Vec<Pattern> = pats
                    .into_iter()
                    .zip(declared.iter().cloned().chain(std::iter::repeat(Type::Any)))
                    .filter_map(|(p, t)| self.analyze_pattern(p, &t))
                    .collect();
                Some(Pattern::Struct {
                    def_id: ctor.def_id,
                    fields: analyzed
                        .into_iter()
                        .enumerate()
                        .map(|(i, pat)| FieldPattern { field: DefId(i as u32), pat })
                        .collect(),
                })
            },
            ast::Pattern::Struct(path, fields) => {
                let name = path.segments.last()?.ident;
                let ctor = self.struct_ctors.get(&name).cloned();
                let Some(ctor) = ctor else {
                    self.binding_not_found(name, Span::DUMMY);
                    return None;
                };
                let declared = match ctor.shape {
                    CtorShape::Struct(fs) => fs,
                    _ => Vec::new(),
                };
                let analyzed: Vec<FieldPattern> = fields
                    .into_iter()
                    .filter_map(|fp| {
                        let declared_ty = declared
                            .iter()
                            .find(|(n, _)| *n == fp.field)
                            .map(|(_, t)| t.clone())
                            .unwrap_or(Type::Any);
                        let pat = self.analyze_pattern(fp.pattern, &declared_ty)?;
                        let def_id = declared
                            .iter()
                            .position(|(n, _)| *n == fp.field)
                            .map(|i| DefId(i as u32))
                            .unwrap_or(DefId::DUMMY);
                        Some(FieldPattern { field: def_id, pat })
                    })
                    .collect();
                Some(Pattern::Struct { def_id: ctor.def_id, fields: analyzed })
            },
            ast::Pattern::Slice(_) => {
                self.type_error("slice patterns are not part of this language", Span::DUMMY);
                None
            },
        }
    }

    fn analyze_return(&mut self, value: Option<Box<ast::Expr>>) -> Option<Expr> {
        let val = value.and_then(|v| self.analyze_expr(*v));
        let val_ty = val.as_ref().map(|e| e.ty()).unwrap_or(Type::TTuple(Vec::new()));
        if let Some(ret_ty) = self.engine.return_type() {
            self.engine.add_constraint(Constraint::Equal(val_ty, ret_ty, Span::DUMMY));
        }
        Some(Expr::Return(val.map(Box::new)))
    }

    fn analyze_if(&mut self, expr: ast::IfExpr) -> Option<Expr> {
        let cond = self.analyze_expr(*expr.cond)?;
        let bool_ty = self.type_context.builtins.bool_ty();
        self.engine.add_constraint(Constraint::Equal(cond.ty(), bool_ty, Span::DUMMY));

        let then_expr = self.analyze_block(expr.then_block)?;
        let result_ty = self.engine.fresh_var(&mut *self.type_context);
        self.engine.add_constraint(Constraint::Equal(then_expr.ty(), result_ty.clone(), Span::DUMMY));

        let else_expr = match expr.else_block {
            Some(e) => {
                let e = self.analyze_expr(*e)?;
                self.engine.add_constraint(Constraint::Equal(e.ty(), result_ty.clone(), Span::DUMMY));
                Some(Box::new(e))
            },
            None => {
                self.engine.add_constraint(Constraint::Equal(
                    result_ty.clone(),
                    Type::TTuple(Vec::new()),
                    Span::DUMMY,
                ));
                None
            },
        };

        Some(Expr::If { cond: Box::new(cond), then_expr: Box::new(then_expr), else_expr, ty: result_ty })
    }
}

fn else_clause_to_expr(clause: ast::ElseClause) -> Box<ast::Expr> {
    match clause {
        ast::ElseClause::Block(b) => Box::new(ast::Expr::Block(b)),
        ast::ElseClause::If(i) => Box::new(ast::Expr::If(ast::IfExpr {
            cond: Box::new(i.cond),
            then_block: i.then_block,
            else_block: i.else_clause.map(|c| else_clause_to_expr(*c)),
        })),
    }
}

/// Substitute the final solution through every type carried by a produced
/// HIR item, so the tree a caller receives shows concrete types rather than
/// unsolved variables.
fn resolve_item_types(item: &mut Item, ctx: &TypeContext) {
    match item {
        Item::Function(f) => {
            for param in &mut f.params {
                param.ty = ctx.resolve_deep(&param.ty);
                resolve_pattern_types(&mut param.pat, ctx);
            }
            f.ret_type = ctx.resolve_deep(&f.ret_type);
            for pat in &mut f.body.params {
                resolve_pattern_types(pat, ctx);
            }
            resolve_expr_types(&mut f.body.value, ctx);
        },
        Item::Struct(s) => {
            for field in &mut s.fields {
                field.ty = ctx.resolve_deep(&field.ty);
            }
        },
        Item::Enum(e) => {
            for variant in &mut e.variants {
                match &mut variant.data {
                    VariantData::Unit => {},
                    VariantData::Tuple(tys) => {
                        for ty in tys {
                            *ty = ctx.resolve_deep(ty);
                        }
                    },
                    VariantData::Struct(fields) => {
                        for field in fields {
                            field.ty = ctx.resolve_deep(&field.ty);
                        }
                    },
                }
            }
        },
    }
}

fn resolve_pattern_types(pat: &mut Pattern, ctx: &TypeContext) {
    match pat {
        Pattern::Binding { ty, .. } => *ty = ctx.resolve_deep(ty),
        Pattern::Tuple { pats } | Pattern::Or(pats) => {
            for p in pats {
                resolve_pattern_types(p, ctx);
            }
        },
        Pattern::Struct { fields, .. } => {
            for f in fields {
                resolve_pattern_types(&mut f.pat, ctx);
            }
        },
        Pattern::Wildcard | Pattern::Path { .. } => {},
    }
}

fn resolve_expr_types(expr: &mut Expr, ctx: &TypeContext) {
    match expr {
        Expr::Literal { ty, .. } | Expr::Var { ty, .. } => *ty = ctx.resolve_deep(ty),
        Expr::Binary { left, right, ty, .. } => {
            resolve_expr_types(left, ctx);
            resolve_expr_types(right, ctx);
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Unary { expr, ty, .. } => {
            resolve_expr_types(expr, ctx);
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Call { func, args, ty } => {
            resolve_expr_types(func, ctx);
            for arg in args {
                resolve_expr_types(arg, ctx);
            }
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Block { stmts, expr, ty } => {
            for stmt in stmts {
                match stmt {
                    Stmt::Let { pat, ty, init } => {
                        resolve_pattern_types(pat, ctx);
                        *ty = ctx.resolve_deep(ty);
                        if let Some(init) = init {
                            resolve_expr_types(init, ctx);
                        }
                    },
                    Stmt::Expr(e) => resolve_expr_types(e, ctx),
                }
            }
            if let Some(e) = expr {
                resolve_expr_types(e, ctx);
            }
            *ty = ctx.resolve_deep(ty);
        },
        Expr::If { cond, then_expr, else_expr, ty } => {
            resolve_expr_types(cond, ctx);
            resolve_expr_types(then_expr, ctx);
            if let Some(e) = else_expr {
                resolve_expr_types(e, ctx);
            }
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Match { scrutinee, arms, ty } => {
            resolve_expr_types(scrutinee, ctx);
            for arm in arms {
                resolve_pattern_types(&mut arm.pat, ctx);
                if let Some(g) = &mut arm.guard {
                    resolve_expr_types(g, ctx);
                }
                resolve_expr_types(&mut arm.body, ctx);
            }
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Tuple { elems, ty } => {
            for e in elems {
                resolve_expr_types(e, ctx);
            }
            *ty = ctx.resolve_deep(ty);
        },
        Expr::Return(val) => {
            if let Some(v) = val {
                resolve_expr_types(v, ctx);
            }
        },
    }
}
