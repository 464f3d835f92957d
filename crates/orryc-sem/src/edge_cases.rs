//! End-to-end checks against the full lex -> parse -> analyze pipeline,
//! plus a few direct unit tests of [`ScopeTree`] and [`TypeContext`] in
//! isolation. Named `edge_cases` because most of what is worth testing
//! here is the boundary behavior of inference, not the happy path already
//! exercised by `orryc-driver`'s own tests.

use crate::analysis::SemanticAnalyzer;
use crate::hir::{self, Item};
use crate::scope::{kind_mask, BindingKind, RibKind, ScopeTree};
use crate::types::{Type, TypeContext};
use orryc_lex::{Lexer, Token};
use orryc_syntax::Parser;
use orryc_util::{DefIdGenerator, DiagnosticCode, Handler, Symbol};

/// Run the whole pipeline over a source string and hand back the produced
/// HIR items together with the handler they were diagnosed into.
fn check(src: &str) -> (Vec<Item>, Handler) {
    let mut handler = Handler::new();

    let tokens = {
        let mut lexer = Lexer::new(src, &mut handler);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            if token == Token::Eof {
                break;
            }
            tokens.push(token);
        }
        tokens
    };

    let ast = {
        let mut parser = Parser::new(tokens, &mut handler);
        parser.parse()
    };

    let def_id_gen = DefIdGenerator::new();
    let mut type_context = TypeContext::new(&def_id_gen);
    let items = {
        let mut analyzer = SemanticAnalyzer::new(&mut type_context, &def_id_gen, &mut handler);
        analyzer.analyze_items(ast)
    };

    (items, handler)
}

fn codes(handler: &Handler) -> Vec<Option<DiagnosticCode>> {
    handler.diagnostics().iter().map(|d| d.code).collect()
}

fn find_fn<'a>(items: &'a [Item], name: &str) -> &'a hir::FnItem {
    items
        .iter()
        .find_map(|item| match item {
            Item::Function(f) if f.name.as_str() == name => Some(f),
            _ => None,
        })
        .unwrap_or_else(|| panic!("no function named `{}` in checked output", name))
}

// ============================================================================
// scenario 1: identity via equality
// ============================================================================

#[test]
fn identity_generalizes_over_two_call_sites() {
    let (items, handler) = check(
        r#"
        fn id(x: _) -> _ { x }
        fn main() -> _ {
            let a = id(1);
            let b = id("s");
            0
        }
        "#,
    );
    assert!(!handler.has_errors(), "diagnostics: {:?}", codes(&handler));
    assert_eq!(find_fn(&items, "id").params.len(), 1);
}

// ============================================================================
// scenario 2: mutual recursion
// ============================================================================

#[test]
fn mutually_recursive_functions_infer_to_bool() {
    let (items, handler) = check(
        r#"
        fn is_even(n: _) -> _ {
            if n == 0 { true } else { is_odd(n - 1) }
        }
        fn is_odd(n: _) -> _ {
            if n == 0 { false } else { is_even(n - 1) }
        }
        "#,
    );
    assert!(!handler.has_errors(), "diagnostics: {:?}", codes(&handler));

    let is_even_ret = &find_fn(&items, "is_even").ret_type;
    let is_odd_ret = &find_fn(&items, "is_odd").ret_type;
    assert!(matches!(is_even_ret, Type::TCon(_, args, _) if args.is_empty()));
    assert_eq!(is_even_ret, is_odd_ret);
}

// ============================================================================
// scenario 3: arity mismatch
// ============================================================================

#[test]
fn calling_a_function_with_too_few_arguments_reports_arity_mismatch() {
    let (_items, handler) = check(
        r#"
        fn f(x: Int, y: Int) -> Int { x + y }
        fn main() -> Int {
            let r = f(1);
            0
        }
        "#,
    );
    assert!(codes(&handler).contains(&Some(DiagnosticCode::E_SEMANTIC_ARITY_MISMATCH)));
}

// ============================================================================
// scenario 4: constant typing across branches
// ============================================================================

#[test]
fn if_branches_returning_different_constant_types_report_type_mismatch() {
    let (_items, handler) = check(
        r#"
        fn f(n: Int) -> _ {
            if n == 0 { 1 } else { "hi" }
        }
        "#,
    );
    assert!(codes(&handler).contains(&Some(DiagnosticCode::E_SEMANTIC_TYPE_MISMATCH)));
}

// ============================================================================
// scenario 5: unknown name recovery
// ============================================================================

#[test]
fn unknown_name_is_reported_once_and_recovered_as_any() {
    let (items, handler) = check(
        r#"
        fn g(x: Int) -> Int {
            frobnicate(x) + 1
        }
        "#,
    );
    let found = codes(&handler);
    assert_eq!(
        found
            .iter()
            .filter(|c| **c == Some(DiagnosticCode::E_SEMANTIC_BINDING_NOT_FOUND))
            .count(),
        1,
        "diagnostics: {:?}",
        found
    );
    // the `+ 1` half still resolves once `frobnicate(x)` recovers as `Any`,
    // so `g`'s own declared `Int -> Int` signature is untouched.
    let g = find_fn(&items, "g");
    assert_eq!(g.ret_type, g.params[0].ty);
}

// ============================================================================
// scenario 6: type assert enforcement
// ============================================================================

#[test]
fn calling_a_typed_function_with_a_mismatched_argument_reports_type_mismatch() {
    let (_items, handler) = check(
        r#"
        fn h(x: Int) -> Int { x }
        fn main() -> Int {
            let r = h("a");
            0
        }
        "#,
    );
    assert!(codes(&handler).contains(&Some(DiagnosticCode::E_SEMANTIC_TYPE_MISMATCH)));
}

// ============================================================================
// universal properties
// ============================================================================

#[test]
fn checking_is_deterministic_across_two_runs() {
    let src = r#"
        fn is_even(n: _) -> _ {
            if n == 0 { true } else { is_odd(n - 1) }
        }
        fn is_odd(n: _) -> _ {
            if n == 0 { false } else { is_even(n - 1) }
        }
        fn g(x: Int) -> Int {
            frobnicate(x) + 1
        }
        "#;
    let (first_items, first) = check(src);
    let (second_items, second) = check(src);
    assert_eq!(codes(&first), codes(&second));
    assert_eq!(first_items.len(), second_items.len());
}

#[test]
fn occurs_check_rejects_self_application() {
    // `x` applied to itself tries to unify `x`'s own type variable with a
    // function type built over that same variable.
    let (_items, handler) = check(
        r#"
        fn omega(x: _) -> _ { x(x) }
        "#,
    );
    assert!(codes(&handler).contains(&Some(DiagnosticCode::E_SEMANTIC_INFINITE_TYPE)));
}

#[test]
fn two_instantiations_of_the_same_scheme_solve_independently() {
    let (items, handler) = check(
        r#"
        fn id(x: _) -> _ { x }
        fn main() -> _ {
            let a = id(1);
            let b = id(a);
            0
        }
        "#,
    );
    assert!(!handler.has_errors(), "diagnostics: {:?}", codes(&handler));
    // `id` itself is left fully polymorphic: its own signature still
    // carries an unbound variable even though both call sites (one on an
    // `Int` literal, one on the result of the other) solved cleanly.
    assert!(matches!(find_fn(&items, "id").ret_type, Type::TV(_)));
}

// ============================================================================
// scope tree
// ============================================================================

#[test]
fn new_scope_tree_has_only_the_root_rib() {
    let tree = ScopeTree::new();
    assert_eq!(tree.resolve(Symbol::intern("missing")), None);
}

#[test]
fn entering_and_exiting_a_scope_drops_its_bindings() {
    let mut tree = ScopeTree::new();
    let name = Symbol::intern("x");
    tree.enter_scope(RibKind::Block);
    tree.add_binding(name, orryc_util::DefId(1));
    assert_eq!(tree.resolve(name), Some(orryc_util::DefId(1)));
    tree.exit_scope();
    assert_eq!(tree.resolve(name), None);
}

#[test]
fn nested_scopes_see_outer_bindings() {
    let mut tree = ScopeTree::new();
    let outer = Symbol::intern("outer");
    tree.add_binding(outer, orryc_util::DefId(1));
    tree.enter_scope(RibKind::Block);
    tree.enter_scope(RibKind::Block);
    assert_eq!(tree.resolve(outer), Some(orryc_util::DefId(1)));
}

#[test]
fn shadowing_resolves_to_the_innermost_binding() {
    let mut tree = ScopeTree::new();
    let name = Symbol::intern("x");
    tree.add_binding(name, orryc_util::DefId(1));
    tree.enter_scope(RibKind::Block);
    tree.add_binding(name, orryc_util::DefId(2));
    assert_eq!(tree.resolve(name), Some(orryc_util::DefId(2)));
    tree.exit_scope();
    assert_eq!(tree.resolve(name), Some(orryc_util::DefId(1)));
}

#[test]
fn a_name_can_be_bound_as_both_a_type_and_a_value() {
    let mut tree = ScopeTree::new();
    let name = Symbol::intern("Point");
    tree.add_binding_kind(name, orryc_util::DefId(1), BindingKind::Type);
    tree.add_binding_kind(name, orryc_util::DefId(1), BindingKind::Var);
    assert_eq!(tree.lookup(name, kind_mask::TYPE), Some(orryc_util::DefId(1)));
    assert_eq!(tree.lookup(name, kind_mask::VAR), Some(orryc_util::DefId(1)));
}

#[test]
fn function_scope_bindings_do_not_escape_to_a_sibling_function() {
    let mut tree = ScopeTree::new();
    let param = Symbol::intern("x");
    tree.enter_scope(RibKind::Function);
    tree.add_binding(param, orryc_util::DefId(1));
    tree.exit_scope();
    tree.enter_scope(RibKind::Function);
    assert_eq!(tree.resolve(param), None);
    tree.exit_scope();
}

// ============================================================================
// type context
// ============================================================================

#[test]
fn fresh_type_variables_have_strictly_increasing_ids() {
    let def_id_gen = DefIdGenerator::new();
    let mut ctx = TypeContext::new(&def_id_gen);
    let first = match ctx.new_type_var() {
        Type::TV(id) => id,
        other => panic!("expected TV, got {:?}", other),
    };
    let second = match ctx.new_type_var() {
        Type::TV(id) => id,
        other => panic!("expected TV, got {:?}", other),
    };
    assert!(second > first);
}

#[test]
fn resolving_an_unbound_variable_returns_itself() {
    let def_id_gen = DefIdGenerator::new();
    let mut ctx = TypeContext::new(&def_id_gen);
    let v = ctx.new_type_var();
    assert_eq!(ctx.resolve_head(&v), v);
    assert_eq!(ctx.resolve_deep(&v), v);
}

#[test]
fn binding_a_variable_makes_it_resolve_to_its_target() {
    let def_id_gen = DefIdGenerator::new();
    let mut ctx = TypeContext::new(&def_id_gen);
    let v = ctx.new_type_var();
    let id = match &v {
        Type::TV(id) => *id,
        _ => unreachable!(),
    };
    ctx.bind(id, ctx.builtins.int_ty());
    assert_eq!(ctx.resolve_head(&v), ctx.builtins.int_ty());
}

#[test]
fn resolve_deep_substitutes_through_a_tuple() {
    let def_id_gen = DefIdGenerator::new();
    let mut ctx = TypeContext::new(&def_id_gen);
    let v = ctx.new_type_var();
    let id = match &v {
        Type::TV(id) => *id,
        _ => unreachable!(),
    };
    ctx.bind(id, ctx.builtins.int_ty());
    let wrapped = Type::TTuple(vec![v]);
    assert_eq!(ctx.resolve_deep(&wrapped), Type::TTuple(vec![ctx.builtins.int_ty()]));
}

#[test]
fn def_types_round_trip_through_set_and_get() {
    let def_id_gen = DefIdGenerator::new();
    let def_id = def_id_gen.next();
    let mut ctx = TypeContext::new(&def_id_gen);
    ctx.set_def_type(def_id, ctx.builtins.int_ty());
    assert_eq!(ctx.type_of_def(def_id), Some(&ctx.builtins.int_ty()));
}

#[test]
fn the_three_builtin_nominal_types_are_pairwise_distinct() {
    let def_id_gen = DefIdGenerator::new();
    let ctx = TypeContext::new(&def_id_gen);
    assert_ne!(ctx.builtins.int_ty(), ctx.builtins.string_ty());
    assert_ne!(ctx.builtins.int_ty(), ctx.builtins.bool_ty());
    assert_ne!(ctx.builtins.string_ty(), ctx.builtins.bool_ty());
}

// ============================================================================
// semantic analyzer
// ============================================================================

#[test]
fn an_empty_program_checks_clean() {
    let def_id_gen = DefIdGenerator::new();
    let mut type_context = TypeContext::new(&def_id_gen);
    let mut handler = Handler::new();
    let mut analyzer = SemanticAnalyzer::new(&mut type_context, &def_id_gen, &mut handler);
    let items = analyzer.analyze_items(Vec::new());
    assert!(items.is_empty());
    assert!(!analyzer.has_errors());
}

#[test]
fn struct_and_enum_declarations_need_no_inference_pass() {
    let (items, handler) = check(
        r#"
        struct Point { x: Int, y: Int }
        enum Color { Red, Green, Blue }
        "#,
    );
    assert!(!handler.has_errors(), "diagnostics: {:?}", codes(&handler));
    assert_eq!(items.len(), 2);
}

#[test]
fn a_struct_literal_elaborates_into_a_constructor_call() {
    let (items, handler) = check(
        r#"
        struct Point { x: Int, y: Int }
        fn origin() -> Point { Point { x: 0, y: 0 } }
        "#,
    );
    assert!(!handler.has_errors(), "diagnostics: {:?}", codes(&handler));
    let origin = find_fn(&items, "origin");
    match &origin.body.value {
        hir::Expr::Block { expr: Some(tail), .. } => {
            assert!(matches!(**tail, hir::Expr::Call { .. }));
        },
        other => panic!("expected a block body, got {:?}", other),
    }
}
