//! Reference graph over top-level function items and Tarjan SCC ordering.
//!
//! Before constraint generation, top-level `fn` items are grouped by mutual
//! recursion so a group can be generalized together (let-polymorphism over a
//! whole strongly-connected component) instead of one binding at a time.
//! Edges point from a function to every other top-level function its body
//! mentions by name; Tarjan's algorithm then yields components in reverse
//! topological (finish) order, so a callee's group is always ready before
//! its caller's.

use orryc_syntax as ast;
use orryc_util::Symbol;
use std::collections::{HashMap, HashSet};

/// A directed graph over the indices of a flat item slice, restricted to
/// `fn` items. Non-fn items have no node and are never referenced.
pub struct RefGraph {
    /// `fn` item index -> indices of other `fn` items its body calls by name
    edges: HashMap<usize, Vec<usize>>,
    names: HashMap<Symbol, usize>,
}

impl RefGraph {
    /// Build the reference graph for the `fn` items in `items`, keyed by
    /// their position in the slice.
    pub fn build(items: &[ast::Item]) -> Self {
        let mut names = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            if let ast::Item::Fn(f) = item {
                names.insert(f.name, idx);
            }
        }

        let mut edges = HashMap::new();
        for (idx, item) in items.iter().enumerate() {
            if let ast::Item::Fn(f) = item {
                let mut referenced = HashSet::new();
                collect_called_names(&f.body, &mut referenced);
                let targets = referenced
                    .into_iter()
                    .filter_map(|name| names.get(&name).copied())
                    .filter(|&target| target != idx)
                    .collect();
                edges.insert(idx, targets);
            }
        }

        Self { edges, names }
    }

    fn successors(&self, idx: usize) -> Vec<usize> {
        self.edges.get(&idx).cloned().unwrap_or_default()
    }

    /// All `fn` item indices, strongly-connected components in reverse
    /// topological order (a callee's SCC precedes its caller's).
    pub fn sccs(&self) -> Vec<Vec<usize>> {
        let mut tarjan = Tarjan::new(self);
        for &idx in self.names.values() {
            if !tarjan.indices.contains_key(&idx) {
                tarjan.strong_connect(idx);
            }
        }
        tarjan.output
    }
}

fn collect_called_names(body: &ast::Block, out: &mut HashSet<Symbol>) {
    for stmt in &body.stmts {
        collect_stmt(stmt, out);
    }
    if let Some(trailing) = &body.trailing {
        collect_expr(trailing, out);
    }
}

fn collect_stmt(stmt: &ast::Stmt, out: &mut HashSet<Symbol>) {
    use ast::Stmt as S;
    match stmt {
        S::Let(l) => {
            if let Some(init) = &l.init {
                collect_expr(init, out);
            }
        }
        S::Expr(e) => collect_expr(e, out),
        S::Return(Some(e)) => collect_expr(e, out),
        S::If(i) => {
            collect_expr(&i.cond, out);
            collect_called_names(&i.then_block, out);
            collect_else(&i.else_clause, out);
        }
        S::While(w) => {
            collect_expr(&w.cond, out);
            collect_called_names(&w.body, out);
        }
        S::For(f) => {
            collect_expr(&f.iter, out);
            collect_called_names(&f.body, out);
        }
        S::Return(None) | S::Break(_) | S::Continue(_) | S::Item(_) => {}
    }
}

fn collect_else(clause: &Option<Box<ast::ElseClause>>, out: &mut HashSet<Symbol>) {
    match clause.as_deref() {
        Some(ast::ElseClause::Block(b)) => collect_called_names(b, out),
        Some(ast::ElseClause::If(i)) => {
            collect_expr(&i.cond, out);
            collect_called_names(&i.then_block, out);
            collect_else(&i.else_clause, out);
        }
        None => {}
    }
}

fn collect_expr(expr: &ast::Expr, out: &mut HashSet<Symbol>) {
    use ast::Expr as E;
    match expr {
        E::Path(p) => {
            if let Some(seg) = p.segments.first() {
                out.insert(seg.ident);
            }
        }
        E::Call(c) => {
            collect_expr(&c.func, out);
            for a in &c.args {
                collect_expr(a, out);
            }
        }
        E::MethodCall(m) => {
            collect_expr(&m.receiver, out);
            for a in &m.call_args {
                collect_expr(a, out);
            }
        }
        E::Binary(b) => {
            collect_expr(&b.left, out);
            collect_expr(&b.right, out);
        }
        E::Unary(u) => collect_expr(&u.expr, out),
        E::Cast(e, _) => collect_expr(e, out),
        E::Field(f) => collect_expr(&f.object, out),
        E::Index(i) => {
            collect_expr(&i.object, out);
            collect_expr(&i.index, out);
        }
        E::Assign(a) => {
            collect_expr(&a.place, out);
            collect_expr(&a.value, out);
        }
        E::CompoundAssign(a) => {
            collect_expr(&a.place, out);
            collect_expr(&a.value, out);
        }
        E::If(i) => {
            collect_expr(&i.cond, out);
            collect_called_names(&i.then_block, out);
            if let Some(else_block) = &i.else_block {
                collect_expr(else_block, out);
            }
        }
        E::Match(m) => {
            collect_expr(&m.scrutinee, out);
            for arm in &m.arms {
                if let Some(guard) = &arm.guard {
                    collect_expr(guard, out);
                }
                collect_expr(&arm.body, out);
            }
        }
        E::Block(b) => collect_called_names(b, out),
        E::Return(Some(e)) => collect_expr(e, out),
        E::Break(Some(e), _) => collect_expr(e, out),
        E::Closure(c) => collect_expr(&c.body, out),
        E::Tuple(items) | E::Array(items) => {
            for item in items {
                collect_expr(item, out);
            }
        }
        E::Range(r) => {
            if let Some(start) = &r.start {
                collect_expr(start, out);
            }
            if let Some(end) = &r.end {
                collect_expr(end, out);
            }
        }
        E::Async(a) => collect_called_names(&a.body, out),
        E::Await(e) => collect_expr(e, out),
        E::StructLiteral(s) => {
            for field in &s.fields {
                collect_expr(&field.expr, out);
            }
            if let Some(base) = &s.base {
                collect_expr(base, out);
            }
        }
        E::EnumVariant(v) => match &v.data {
            ast::EnumVariantData::Unit => {}
            ast::EnumVariantData::Tuple(args) => {
                for a in args {
                    collect_expr(a, out);
                }
            }
            ast::EnumVariantData::Struct(fields) => {
                for field in fields {
                    collect_expr(&field.expr, out);
                }
            }
        },
        E::Literal(_) | E::Return(None) | E::Break(None, _) | E::Continue(_) => {}
    }
}

/// Standard recursive Tarjan SCC, emitting components in the order they
/// finish (a component finishes only after all of its successors have),
/// which is already reverse topological order.
struct Tarjan<'g> {
    graph: &'g RefGraph,
    indices: HashMap<usize, usize>,
    low_links: HashMap<usize, usize>,
    on_stack: HashSet<usize>,
    stack: Vec<usize>,
    next_index: usize,
    output: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    fn new(graph: &'g RefGraph) -> Self {
        Self {
            graph,
            indices: HashMap::new(),
            low_links: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            next_index: 0,
            output: Vec::new(),
        }
    }

    fn strong_connect(&mut self, v: usize) {
        self.indices.insert(v, self.next_index);
        self.low_links.insert(v, self.next_index);
        self.next_index += 1;
        self.stack.push(v);
        self.on_stack.insert(v);

        for w in self.graph.successors(v) {
            if !self.indices.contains_key(&w) {
                self.strong_connect(w);
                let low_w = self.low_links[&w];
                let low_v = self.low_links[&v];
                self.low_links.insert(v, low_v.min(low_w));
            } else if self.on_stack.contains(&w) {
                let idx_w = self.indices[&w];
                let low_v = self.low_links[&v];
                self.low_links.insert(v, low_v.min(idx_w));
            }
        }

        if self.low_links[&v] == self.indices[&v] {
            let mut component = Vec::new();
            loop {
                let w = self.stack.pop().unwrap();
                self.on_stack.remove(&w);
                component.push(w);
                if w == v {
                    break;
                }
            }
            self.output.push(component);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orryc_lex::Lexer;
    use orryc_syntax::Parser;
    use orryc_util::Handler;

    fn parse(source: &str) -> ast::Ast {
        let mut handler = Handler::new();
        let mut lexer = Lexer::new(source, &mut handler);
        let tokens: Vec<_> = std::iter::from_fn(|| Some(lexer.next_token()))
            .take_while(|t| *t != orryc_lex::Token::Eof)
            .collect();
        let mut parser = Parser::new(tokens, &mut handler);
        parser.parse()
    }

    #[test]
    fn independent_functions_form_singleton_sccs() {
        let items = parse("fn a() -> int { 1 } fn b() -> int { 2 }");
        let graph = RefGraph::build(&items);
        let sccs = graph.sccs();
        assert_eq!(sccs.len(), 2);
        assert!(sccs.iter().all(|c| c.len() == 1));
    }

    #[test]
    fn mutually_recursive_functions_share_an_scc() {
        let items = parse(
            "fn is_even(n: int) -> bool { is_odd(n) } fn is_odd(n: int) -> bool { is_even(n) }",
        );
        let graph = RefGraph::build(&items);
        let sccs = graph.sccs();
        assert_eq!(sccs.len(), 1);
        assert_eq!(sccs[0].len(), 2);
    }

    #[test]
    fn caller_scc_comes_after_callee_scc() {
        let items = parse("fn callee() -> int { 1 } fn caller() -> int { callee() }");
        let graph = RefGraph::build(&items);
        let sccs = graph.sccs();
        assert_eq!(sccs.len(), 2);
        let callee_pos = sccs.iter().position(|c| c == &vec![0]).unwrap();
        let caller_pos = sccs.iter().position(|c| c == &vec![1]).unwrap();
        assert!(callee_pos < caller_pos);
    }
}
