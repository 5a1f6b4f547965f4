//! Content expressions and the automata that validate child sequences.
//!
//! An expression like `"paragraph (block | list_item)*"` is parsed, compiled
//! to an NFA, and then determinized into states stored in the schema's match
//! arena. A [`ContentMatch`] is a handle to one of those states.

use super::schema::SchemaError;
use super::{Fragment, NodeType, Schema};
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// Arena index of the state that accepts only the empty sequence.
pub(crate) const EMPTY: usize = 0;

#[derive(Debug, Clone, Default)]
pub(crate) struct MatchState {
    pub(crate) valid_end: bool,
    /// Outgoing edges: (node type index, target state index).
    pub(crate) next: Vec<(usize, usize)>,
}

pub(crate) struct TypeTable<'a> {
    pub(crate) names: Vec<&'a str>,
    pub(crate) groups: &'a [Vec<String>],
    pub(crate) is_block: &'a [bool],
}

impl TypeTable<'_> {
    fn resolve(&self, name: &str) -> Vec<usize> {
        if let Some(index) = self.names.iter().position(|n| *n == name) {
            return vec![index];
        }
        (0..self.names.len())
            .filter(|&i| self.groups[i].iter().any(|g| g == name))
            .collect()
    }
}

enum Expr {
    Choice(Vec<Expr>),
    Seq(Vec<Expr>),
    Plus(Box<Expr>),
    Star(Box<Expr>),
    Opt(Box<Expr>),
    Range {
        min: usize,
        max: Option<usize>,
        expr: Box<Expr>,
    },
    Name(usize),
}

fn is_word(token: &str) -> bool {
    token.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn tokenize(source: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut chars = source.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c.is_alphanumeric() || c == '_' {
            let mut end = start;
            while let Some(&(i, c)) = chars.peek() {
                if !(c.is_alphanumeric() || c == '_') {
                    break;
                }
                end = i + c.len_utf8();
                chars.next();
            }
            tokens.push(&source[start..end]);
        } else {
            tokens.push(&source[start..start + c.len_utf8()]);
            chars.next();
        }
    }
    tokens
}

struct TokenStream<'a> {
    source: &'a str,
    tokens: Vec<&'a str>,
    pos: usize,
    inline: Option<bool>,
    types: &'a TypeTable<'a>,
}

impl<'a> TokenStream<'a> {
    fn next(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    fn eat(&mut self, token: &str) -> bool {
        if self.next() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn err(&self, message: impl Into<String>) -> SchemaError {
        SchemaError::ContentExpression {
            expr: self.source.to_string(),
            message: message.into(),
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = vec![self.parse_seq()?];
        while self.eat("|") {
            exprs.push(self.parse_seq()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }

    fn parse_seq(&mut self) -> Result<Expr, SchemaError> {
        let mut exprs = Vec::new();
        while let Some(next) = self.next() {
            if next == ")" || next == "|" {
                break;
            }
            exprs.push(self.parse_subscript()?);
        }
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Seq(exprs)
        })
    }

    fn parse_subscript(&mut self) -> Result<Expr, SchemaError> {
        let mut expr = self.parse_atom()?;
        loop {
            if self.eat("+") {
                expr = Expr::Plus(Box::new(expr));
            } else if self.eat("*") {
                expr = Expr::Star(Box::new(expr));
            } else if self.eat("?") {
                expr = Expr::Opt(Box::new(expr));
            } else if self.eat("{") {
                expr = self.parse_range(expr)?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_num(&mut self) -> Result<usize, SchemaError> {
        let token = self.next().unwrap_or_default();
        let value = token
            .parse::<usize>()
            .map_err(|_| self.err(format!("expected number, got {token:?}")))?;
        self.pos += 1;
        Ok(value)
    }

    fn parse_range(&mut self, expr: Expr) -> Result<Expr, SchemaError> {
        let min = self.parse_num()?;
        let mut max = Some(min);
        if self.eat(",") {
            max = if self.next() == Some("}") {
                None
            } else {
                Some(self.parse_num()?)
            };
        }
        if !self.eat("}") {
            return Err(self.err("unclosed braced range"));
        }
        Ok(Expr::Range {
            min,
            max,
            expr: Box::new(expr),
        })
    }

    fn parse_atom(&mut self) -> Result<Expr, SchemaError> {
        if self.eat("(") {
            let expr = self.parse_expr()?;
            if !self.eat(")") {
                return Err(self.err("missing closing paren"));
            }
            return Ok(expr);
        }
        let Some(name) = self.next() else {
            return Err(self.err("unexpected end of expression"));
        };
        if !is_word(name) {
            return Err(self.err(format!("unexpected token {name:?}")));
        }
        let types = self.types.resolve(name);
        if types.is_empty() {
            return Err(self.err(format!("no node type or group {name:?} found")));
        }
        for &ty in &types {
            let inline = !self.types.is_block[ty];
            match self.inline {
                None => self.inline = Some(inline),
                Some(prev) if prev != inline => {
                    return Err(self.err("mixing inline and block content"));
                }
                Some(_) => {}
            }
        }
        self.pos += 1;
        let mut exprs: Vec<Expr> = types.into_iter().map(Expr::Name).collect();
        Ok(if exprs.len() == 1 {
            exprs.remove(0)
        } else {
            Expr::Choice(exprs)
        })
    }
}

struct NfaEdge {
    term: Option<usize>,
    to: Option<usize>,
}

/// (node index, edge index) of an edge whose target is not yet connected.
type Dangling = (usize, usize);

struct Nfa {
    nodes: Vec<Vec<NfaEdge>>,
}

impl Nfa {
    fn build(expr: &Expr) -> Self {
        let mut nfa = Nfa {
            nodes: vec![Vec::new()],
        };
        let out = nfa.compile(expr, 0);
        let accept = nfa.node();
        nfa.connect(&out, accept);
        nfa
    }

    fn accepting(&self) -> usize {
        self.nodes.len() - 1
    }

    fn node(&mut self) -> usize {
        self.nodes.push(Vec::new());
        self.nodes.len() - 1
    }

    fn edge(&mut self, from: usize, to: Option<usize>, term: Option<usize>) -> Dangling {
        self.nodes[from].push(NfaEdge { term, to });
        (from, self.nodes[from].len() - 1)
    }

    fn connect(&mut self, edges: &[Dangling], to: usize) {
        for &(node, edge) in edges {
            self.nodes[node][edge].to = Some(to);
        }
    }

    fn compile(&mut self, expr: &Expr, from: usize) -> Vec<Dangling> {
        match expr {
            Expr::Choice(exprs) => {
                let mut out = Vec::new();
                for expr in exprs {
                    out.extend(self.compile(expr, from));
                }
                out
            }
            Expr::Seq(exprs) => {
                let Some((last, init)) = exprs.split_last() else {
                    return vec![self.edge(from, None, None)];
                };
                let mut cur = from;
                for expr in init {
                    let out = self.compile(expr, cur);
                    cur = self.node();
                    self.connect(&out, cur);
                }
                self.compile(last, cur)
            }
            Expr::Star(expr) => {
                let repeat = self.node();
                self.edge(from, Some(repeat), None);
                let out = self.compile(expr, repeat);
                self.connect(&out, repeat);
                vec![self.edge(repeat, None, None)]
            }
            Expr::Plus(expr) => {
                let repeat = self.node();
                let first = self.compile(expr, from);
                self.connect(&first, repeat);
                let again = self.compile(expr, repeat);
                self.connect(&again, repeat);
                vec![self.edge(repeat, None, None)]
            }
            Expr::Opt(expr) => {
                let mut out = vec![self.edge(from, None, None)];
                out.extend(self.compile(expr, from));
                out
            }
            Expr::Range { min, max, expr } => {
                let mut cur = from;
                for _ in 0..*min {
                    let next = self.node();
                    let out = self.compile(expr, cur);
                    self.connect(&out, next);
                    cur = next;
                }
                match max {
                    None => {
                        let out = self.compile(expr, cur);
                        self.connect(&out, cur);
                    }
                    Some(max) => {
                        for _ in *min..*max {
                            let next = self.node();
                            self.edge(cur, Some(next), None);
                            let out = self.compile(expr, cur);
                            self.connect(&out, next);
                            cur = next;
                        }
                    }
                }
                vec![self.edge(cur, None, None)]
            }
            Expr::Name(ty) => vec![self.edge(from, None, Some(*ty))],
        }
    }

    /// The set of NFA nodes reachable from `node` through untyped edges.
    fn null_from(&self, node: usize) -> Vec<usize> {
        let mut result = Vec::new();
        self.scan(node, &mut result);
        result.sort_unstable();
        result.dedup();
        result
    }

    fn scan(&self, node: usize, result: &mut Vec<usize>) {
        let edges = &self.nodes[node];
        if let [
            NfaEdge {
                term: None,
                to: Some(to),
            },
        ] = edges.as_slice()
        {
            return self.scan(*to, result);
        }
        result.push(node);
        for edge in edges {
            if let (None, Some(to)) = (edge.term, edge.to)
                && !result.contains(&to)
            {
                self.scan(to, result);
            }
        }
    }
}

struct DfaBuilder<'a> {
    nfa: &'a Nfa,
    arena: &'a mut Vec<MatchState>,
    labeled: HashMap<Vec<usize>, usize>,
}

impl DfaBuilder<'_> {
    fn explore(&mut self, states: Vec<usize>) -> usize {
        let mut out: Vec<(usize, Vec<usize>)> = Vec::new();
        for &node in &states {
            for edge in &self.nfa.nodes[node] {
                let (Some(term), Some(to)) = (edge.term, edge.to) else {
                    continue;
                };
                let slot = match out.iter().position(|(t, _)| *t == term) {
                    Some(slot) => slot,
                    None => {
                        out.push((term, Vec::new()));
                        out.len() - 1
                    }
                };
                for reached in self.nfa.null_from(to) {
                    if !out[slot].1.contains(&reached) {
                        out[slot].1.push(reached);
                    }
                }
            }
        }

        let index = self.arena.len();
        self.arena.push(MatchState {
            valid_end: states.contains(&self.nfa.accepting()),
            next: Vec::new(),
        });
        self.labeled.insert(states, index);

        for (term, mut set) in out {
            set.sort_unstable();
            let next = match self.labeled.get(&set) {
                Some(&next) => next,
                None => self.explore(set),
            };
            self.arena[index].next.push((term, next));
        }
        index
    }
}

/// Compile a content expression into the match arena and return the index of
/// its start state.
pub(crate) fn compile(
    source: &str,
    types: &TypeTable<'_>,
    arena: &mut Vec<MatchState>,
) -> Result<usize, SchemaError> {
    let tokens = tokenize(source);
    if tokens.is_empty() {
        return Ok(EMPTY);
    }
    let mut stream = TokenStream {
        source,
        tokens,
        pos: 0,
        inline: None,
        types,
    };
    let expr = stream.parse_expr()?;
    if let Some(token) = stream.next() {
        return Err(stream.err(format!("unexpected trailing token {token:?}")));
    }
    let nfa = Nfa::build(&expr);
    let start = nfa.null_from(0);
    let mut dfa = DfaBuilder {
        nfa: &nfa,
        arena,
        labeled: HashMap::new(),
    };
    Ok(dfa.explore(start))
}

/// A state in a node type's content automaton.
#[derive(Clone)]
pub struct ContentMatch {
    schema: Schema,
    index: usize,
}

impl ContentMatch {
    pub(crate) fn new(schema: Schema, index: usize) -> Self {
        Self { schema, index }
    }

    fn state(&self) -> &MatchState {
        self.schema.match_state(self.index)
    }

    fn at(&self, index: usize) -> ContentMatch {
        ContentMatch::new(self.schema.clone(), index)
    }

    /// True when the sequence matched so far is a complete, valid content.
    pub fn valid_end(&self) -> bool {
        self.state().valid_end
    }

    pub fn edge_count(&self) -> usize {
        self.state().next.len()
    }

    pub fn edge(&self, n: usize) -> Option<(NodeType, ContentMatch)> {
        let &(ty, next) = self.state().next.get(n)?;
        Some((self.schema.node_type_at(ty), self.at(next)))
    }

    pub fn match_type(&self, node_type: &NodeType) -> Option<ContentMatch> {
        self.state()
            .next
            .iter()
            .find(|(ty, _)| *ty == node_type.index())
            .map(|&(_, next)| self.at(next))
    }

    pub fn match_fragment(&self, fragment: &Fragment) -> Option<ContentMatch> {
        self.match_fragment_range(fragment, 0, fragment.child_count())
    }

    pub fn match_fragment_range(
        &self,
        fragment: &Fragment,
        start: usize,
        end: usize,
    ) -> Option<ContentMatch> {
        let mut cur = self.clone();
        for i in start..end {
            cur = cur.match_type(fragment.child(i).node_type())?;
        }
        Some(cur)
    }

    pub fn inline_content(&self) -> bool {
        self.state()
            .next
            .first()
            .is_some_and(|&(ty, _)| self.schema.node_type_at(ty).is_inline())
    }

    /// The first type that could be generated here without any input.
    pub fn default_type(&self) -> Option<NodeType> {
        self.state()
            .next
            .iter()
            .map(|&(ty, _)| self.schema.node_type_at(ty))
            .find(|ty| !(ty.is_text() || ty.has_required_attrs()))
    }

    pub fn compatible(&self, other: &ContentMatch) -> bool {
        self.state()
            .next
            .iter()
            .any(|(a, _)| other.state().next.iter().any(|(b, _)| a == b))
    }

    /// Find the smallest sequence of generated nodes that makes
    /// `after[start_index..]` match from this state. With `to_end`, the
    /// result must also leave the match at a valid end.
    pub fn fill_before(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
    ) -> Option<Fragment> {
        let mut seen = vec![self.index];
        let mut types = Vec::new();
        self.search_fill(after, to_end, start_index, &mut seen, &mut types)
    }

    fn search_fill(
        &self,
        after: &Fragment,
        to_end: bool,
        start_index: usize,
        seen: &mut Vec<usize>,
        types: &mut Vec<NodeType>,
    ) -> Option<Fragment> {
        if let Some(finished) =
            self.match_fragment_range(after, start_index.min(after.child_count()), after.child_count())
            && (!to_end || finished.valid_end())
        {
            let filled = types
                .iter()
                .map(|ty| ty.create_and_fill(None, Fragment::empty(), Vec::new()))
                .collect::<Option<Vec<_>>>()?;
            return Some(Fragment::from_array(filled));
        }
        for &(ty, next) in &self.state().next {
            let node_type = self.schema.node_type_at(ty);
            if node_type.is_text() || node_type.has_required_attrs() || seen.contains(&next) {
                continue;
            }
            seen.push(next);
            types.push(node_type);
            let found = self.at(next).search_fill(after, to_end, start_index, seen, types);
            types.pop();
            if found.is_some() {
                return found;
            }
        }
        None
    }

    /// Find a chain of wrapper types that would allow a node of `target` to
    /// appear at this point. An empty result means it fits directly.
    pub fn find_wrapping(&self, target: &NodeType) -> Option<Vec<NodeType>> {
        struct Candidate {
            matcher: ContentMatch,
            node_type: Option<usize>,
            via: Option<usize>,
        }

        let mut seen: Vec<usize> = Vec::new();
        let mut candidates = vec![Candidate {
            matcher: self.clone(),
            node_type: None,
            via: None,
        }];
        let mut queue = VecDeque::from([0]);
        while let Some(current) = queue.pop_front() {
            let matcher = candidates[current].matcher.clone();
            if matcher.match_type(target).is_some() {
                let mut result = Vec::new();
                let mut at = current;
                while let Some(ty) = candidates[at].node_type {
                    result.push(self.schema.node_type_at(ty));
                    at = candidates[at].via?;
                }
                result.reverse();
                return Some(result);
            }
            for &(ty, next) in &matcher.state().next {
                let node_type = self.schema.node_type_at(ty);
                let first_level = candidates[current].node_type.is_none();
                if !node_type.is_leaf()
                    && !node_type.has_required_attrs()
                    && !seen.contains(&ty)
                    && (first_level || self.schema.match_state(next).valid_end)
                {
                    candidates.push(Candidate {
                        matcher: node_type.content_match(),
                        node_type: Some(ty),
                        via: Some(current),
                    });
                    queue.push_back(candidates.len() - 1);
                    seen.push(ty);
                }
            }
        }
        None
    }
}

impl PartialEq for ContentMatch {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.schema.same(&other.schema)
    }
}

impl fmt::Debug for ContentMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let next: Vec<String> = self
            .state()
            .next
            .iter()
            .map(|&(ty, next)| format!("{}->{}", self.schema.node_type_at(ty).name(), next))
            .collect();
        write!(
            f,
            "ContentMatch({}{}, [{}])",
            self.index,
            if self.valid_end() { "*" } else { "" },
            next.join(", ")
        )
    }
}
