//! Bounded regex handling: literal synthesis and finite literal extraction.
//!
//! Patterns are parsed with a small recursive-descent parser that only understands a safe
//! subset of ECMA-262 syntax. Anything outside that subset, anything above the size caps and
//! anything with nested unbounded quantifiers is refused, so callers treat the pattern as
//! "no literal available" and move on.

use regex::{Regex, RegexBuilder};
use std::collections::BTreeSet;

const MAX_PATTERN_LEN: usize = 256;
const MAX_NODES: usize = 512;
const MAX_REPEAT: u32 = 256;
const MAX_ENUM_REPEAT: u32 = 8;
const MAX_CLASS_ENUM: u32 = 16;
const MAX_LITERALS: usize = 64;
const REGEX_SIZE_LIMIT: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Empty,
    Char(char),
    Class { ranges: Vec<(char, char)>, negated: bool },
    Any,
    Start,
    End,
    Concat(Vec<Node>),
    Alt(Vec<Node>),
    Repeat { node: Box<Node>, min: u32, max: Option<u32> },
}

/// Compile a pattern with a size cap. `None` when the pattern is malformed or too large.
pub fn bounded_regex(pattern: &str) -> Option<Regex> {
    if pattern.len() > MAX_PATTERN_LEN * 4 {
        return None;
    }
    RegexBuilder::new(pattern)
        .size_limit(REGEX_SIZE_LIMIT)
        .build()
        .ok()
}

/// Smallest literal this pattern accepts, verified against the compiled regex.
pub fn literal_for_pattern(pattern: &str) -> Option<String> {
    let ast = parse_guarded(pattern)?;
    let literal = synthesize(&ast)?;
    let re = bounded_regex(pattern)?;
    re.is_match(&literal).then_some(literal)
}

/// Finite set of strings a fully anchored pattern accepts, sorted by UTF-16 code units.
///
/// Returns `None` for unanchored patterns, infinite languages and sets above the cap.
pub fn extract_literals(pattern: &str) -> Option<Vec<String>> {
    let ast = parse_guarded(pattern)?;
    let branches = match &ast {
        Node::Alt(branches) => branches.clone(),
        other => vec![other.clone()],
    };

    let mut out = BTreeSet::new();
    for branch in branches {
        let inner = strip_anchors(branch)?;
        for s in enumerate(&inner)? {
            out.insert(s);
            if out.len() > MAX_LITERALS {
                return None;
            }
        }
    }

    let re = bounded_regex(pattern)?;
    let mut literals: Vec<String> = out.into_iter().filter(|s| re.is_match(s)).collect();
    literals.sort_by(|a, b| a.encode_utf16().cmp(b.encode_utf16()));
    Some(literals)
}

fn parse_guarded(pattern: &str) -> Option<Node> {
    if pattern.chars().count() > MAX_PATTERN_LEN {
        return None;
    }
    let mut parser = Parser {
        chars: pattern.chars().collect(),
        pos: 0,
        nodes: 0,
    };
    let ast = parser.parse_alt()?;
    if parser.pos != parser.chars.len() {
        return None;
    }
    if has_nested_unbounded(&ast, false) {
        return None;
    }
    Some(ast)
}

fn strip_anchors(node: Node) -> Option<Node> {
    let Node::Concat(mut items) = node else {
        return None;
    };
    if items.first() != Some(&Node::Start) || items.last() != Some(&Node::End) || items.len() < 2
    {
        return None;
    }
    items.remove(0);
    items.pop();
    Some(Node::Concat(items))
}

/// `(a+)+`, `(a*)*`, `(a|b+)*`: an unbounded repeat under another unbounded repeat.
fn has_nested_unbounded(node: &Node, inside_unbounded: bool) -> bool {
    match node {
        Node::Repeat { node, max, .. } => {
            let unbounded = max.is_none();
            if unbounded && inside_unbounded {
                return true;
            }
            has_nested_unbounded(node, inside_unbounded || unbounded)
        }
        Node::Concat(items) | Node::Alt(items) => items
            .iter()
            .any(|n| has_nested_unbounded(n, inside_unbounded)),
        _ => false,
    }
}

fn synthesize(node: &Node) -> Option<String> {
    match node {
        Node::Empty | Node::Start | Node::End => Some(String::new()),
        Node::Char(c) => Some(c.to_string()),
        Node::Any => Some("a".to_string()),
        Node::Class { ranges, negated } => class_representative(ranges, *negated).map(String::from),
        Node::Concat(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&synthesize(item)?);
            }
            Some(out)
        }
        Node::Alt(branches) => branches.iter().find_map(synthesize),
        Node::Repeat { node, min, .. } => {
            if *min == 0 {
                return Some(String::new());
            }
            let one = synthesize(node)?;
            Some(one.repeat(*min as usize))
        }
    }
}

fn class_representative(ranges: &[(char, char)], negated: bool) -> Option<char> {
    if !negated {
        return ranges.first().map(|(lo, _)| *lo);
    }
    "abcdefghijklmnopqrstuvwxyz0123456789_-"
        .chars()
        .find(|c| !ranges.iter().any(|(lo, hi)| lo <= c && c <= hi))
}

fn enumerate(node: &Node) -> Option<Vec<String>> {
    match node {
        Node::Empty => Some(vec![String::new()]),
        Node::Char(c) => Some(vec![c.to_string()]),
        Node::Any | Node::Start | Node::End => None,
        Node::Class { ranges, negated } => {
            if *negated {
                return None;
            }
            let size: u32 = ranges
                .iter()
                .map(|(lo, hi)| (*hi as u32).saturating_sub(*lo as u32) + 1)
                .sum();
            if size > MAX_CLASS_ENUM {
                return None;
            }
            let mut out = Vec::new();
            for (lo, hi) in ranges {
                for code in (*lo as u32)..=(*hi as u32) {
                    out.push(char::from_u32(code)?.to_string());
                }
            }
            Some(out)
        }
        Node::Concat(items) => {
            let mut acc = vec![String::new()];
            for item in items {
                let parts = enumerate(item)?;
                acc = product(&acc, &parts)?;
            }
            Some(acc)
        }
        Node::Alt(branches) => {
            let mut out = Vec::new();
            for b in branches {
                out.extend(enumerate(b)?);
                if out.len() > MAX_LITERALS {
                    return None;
                }
            }
            Some(out)
        }
        Node::Repeat { node, min, max } => {
            let max = (*max)?;
            if max > MAX_ENUM_REPEAT {
                return None;
            }
            let parts = enumerate(node)?;
            let mut out = Vec::new();
            for count in *min..=max {
                let mut acc = vec![String::new()];
                for _ in 0..count {
                    acc = product(&acc, &parts)?;
                }
                out.extend(acc);
                if out.len() > MAX_LITERALS {
                    return None;
                }
            }
            Some(out)
        }
    }
}

fn product(left: &[String], right: &[String]) -> Option<Vec<String>> {
    if left.len().saturating_mul(right.len()) > MAX_LITERALS {
        return None;
    }
    let mut out = Vec::with_capacity(left.len() * right.len());
    for l in left {
        for r in right {
            out.push(format!("{l}{r}"));
        }
    }
    Some(out)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    nodes: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn node(&mut self, n: Node) -> Option<Node> {
        self.nodes += 1;
        (self.nodes <= MAX_NODES).then_some(n)
    }

    fn parse_alt(&mut self) -> Option<Node> {
        let mut branches = vec![self.parse_concat()?];
        while self.eat('|') {
            branches.push(self.parse_concat()?);
        }
        if branches.len() == 1 {
            branches.pop()
        } else {
            self.node(Node::Alt(branches))
        }
    }

    fn parse_concat(&mut self) -> Option<Node> {
        let mut items = Vec::new();
        while let Some(c) = self.peek() {
            if c == '|' || c == ')' {
                break;
            }
            let atom = self.parse_atom()?;
            let atom = self.parse_quantifier(atom)?;
            items.push(atom);
        }
        match items.len() {
            0 => Some(Node::Empty),
            1 => items.pop(),
            _ => self.node(Node::Concat(items)),
        }
    }

    fn parse_atom(&mut self) -> Option<Node> {
        let c = self.bump()?;
        let node = match c {
            '(' => {
                if self.eat('?') {
                    match self.bump()? {
                        ':' => {}
                        'P' if self.eat('<') => self.skip_group_name()?,
                        // `(?<=` and `(?<!` are lookbehinds.
                        '<' if !matches!(self.peek(), Some('=') | Some('!')) => {
                            self.skip_group_name()?
                        }
                        _ => return None,
                    }
                }
                let inner = self.parse_alt()?;
                if !self.eat(')') {
                    return None;
                }
                inner
            }
            '[' => self.parse_class()?,
            '.' => Node::Any,
            '^' => Node::Start,
            '$' => Node::End,
            '\\' => self.parse_escape()?,
            '*' | '+' | '?' | ')' => return None,
            '{' if self.looks_like_bounds() => return None,
            other => Node::Char(other),
        };
        self.node(node)
    }

    fn skip_group_name(&mut self) -> Option<()> {
        while self.bump()? != '>' {}
        Some(())
    }

    fn looks_like_bounds(&self) -> bool {
        self.peek().is_some_and(|c| c.is_ascii_digit())
    }

    fn parse_escape(&mut self) -> Option<Node> {
        let c = self.bump()?;
        let node = match c {
            'd' => digit_class(false),
            'D' => digit_class(true),
            'w' => word_class(false),
            'W' => word_class(true),
            's' => space_class(false),
            'S' => space_class(true),
            'n' => Node::Char('\n'),
            't' => Node::Char('\t'),
            'r' => Node::Char('\r'),
            'u' => Node::Char(self.parse_hex(4)?),
            'x' => Node::Char(self.parse_hex(2)?),
            // Backreferences, word boundaries and unicode properties are out of scope.
            '1'..='9' | 'b' | 'B' | 'p' | 'P' | 'k' => return None,
            other => Node::Char(other),
        };
        Some(node)
    }

    fn parse_hex(&mut self, digits: usize) -> Option<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            code = code * 16 + self.bump()?.to_digit(16)?;
        }
        char::from_u32(code)
    }

    fn parse_class(&mut self) -> Option<Node> {
        let negated = self.eat('^');
        let mut ranges = Vec::new();
        let mut first = true;
        loop {
            let c = self.bump()?;
            if c == ']' && !first {
                break;
            }
            first = false;
            let lo = if c == '\\' {
                match self.bump()? {
                    'd' => {
                        ranges.push(('0', '9'));
                        continue;
                    }
                    'w' => {
                        ranges.extend([('0', '9'), ('A', 'Z'), ('_', '_'), ('a', 'z')]);
                        continue;
                    }
                    's' => {
                        ranges.extend([(' ', ' '), ('\t', '\t'), ('\n', '\n')]);
                        continue;
                    }
                    'n' => '\n',
                    't' => '\t',
                    'u' => self.parse_hex(4)?,
                    'D' | 'W' | 'S' | 'p' | 'P' => return None,
                    other => other,
                }
            } else {
                c
            };
            if self.peek() == Some('-') && self.chars.get(self.pos + 1).is_some_and(|n| *n != ']')
            {
                self.pos += 1;
                let mut hi = self.bump()?;
                if hi == '\\' {
                    hi = self.bump()?;
                }
                if hi < lo {
                    return None;
                }
                ranges.push((lo, hi));
            } else {
                ranges.push((lo, lo));
            }
        }
        Some(Node::Class { ranges, negated })
    }

    fn parse_quantifier(&mut self, atom: Node) -> Option<Node> {
        let (min, max) = match self.peek() {
            Some('*') => {
                self.pos += 1;
                (0, None)
            }
            Some('+') => {
                self.pos += 1;
                (1, None)
            }
            Some('?') => {
                self.pos += 1;
                (0, Some(1))
            }
            Some('{') if self.chars.get(self.pos + 1).is_some_and(|c| c.is_ascii_digit()) => {
                self.pos += 1;
                let min = self.parse_number()?;
                let max = if self.eat(',') {
                    if self.peek() == Some('}') {
                        None
                    } else {
                        Some(self.parse_number()?)
                    }
                } else {
                    Some(min)
                };
                if !self.eat('}') {
                    return None;
                }
                (min, max)
            }
            _ => return Some(atom),
        };
        if min > MAX_REPEAT || max.is_some_and(|m| m > MAX_REPEAT || m < min) {
            return None;
        }
        // Lazy / possessive suffixes do not change the accepted language.
        if !self.eat('?') {
            self.eat('+');
        }
        if matches!(atom, Node::Start | Node::End | Node::Repeat { .. }) {
            return None;
        }
        self.node(Node::Repeat {
            node: Box::new(atom),
            min,
            max,
        })
    }

    fn parse_number(&mut self) -> Option<u32> {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        self.chars[start..self.pos]
            .iter()
            .collect::<String>()
            .parse()
            .ok()
    }
}

fn digit_class(negated: bool) -> Node {
    Node::Class {
        ranges: vec![('0', '9')],
        negated,
    }
}

fn word_class(negated: bool) -> Node {
    Node::Class {
        ranges: vec![('a', 'z'), ('A', 'Z'), ('0', '9'), ('_', '_')],
        negated,
    }
}

fn space_class(negated: bool) -> Node {
    Node::Class {
        ranges: vec![(' ', ' '), ('\t', '\t'), ('\n', '\n'), ('\r', '\r')],
        negated,
    }
}
