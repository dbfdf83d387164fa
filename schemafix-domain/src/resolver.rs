//! Maps oracle-reported schema pointers back to origin and canonical schema nodes.

use crate::pointer;
use schemafix_types::compose::ComposeResult;
use serde_json::Value;
use std::collections::HashMap;

/// Best-matching origin pointer and its canonical counterpart.
///
/// `canon` is `None` when nothing matched; callers skip the repair in that case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPointer {
    pub origin: String,
    pub canon: Option<String>,
}

struct Candidate {
    canon: String,
    canon_tokens: Vec<String>,
    origin: String,
    origin_tokens: Vec<String>,
}

/// Per-item resolver. The cache lives as long as one item's repair session.
pub struct PointerResolver<'a> {
    schema: &'a Value,
    compose: &'a ComposeResult,
    candidates: Option<Vec<Candidate>>,
    cache: HashMap<(String, Option<String>), ResolvedPointer>,
}

impl<'a> PointerResolver<'a> {
    pub fn new(schema: &'a Value, compose: &'a ComposeResult) -> Self {
        Self {
            schema,
            compose,
            candidates: None,
            cache: HashMap::new(),
        }
    }

    pub fn schema(&self) -> &'a Value {
        self.schema
    }

    /// Origin schema node for a resolved pointer.
    pub fn origin_node(&self, resolved: &ResolvedPointer) -> Option<&'a Value> {
        pointer::resolve_schema(self.schema, &resolved.origin).map(|(node, _)| node)
    }

    pub fn resolve(&mut self, raw: &str, property: Option<&str>) -> ResolvedPointer {
        let key = (pointer::normalize(raw), property.map(str::to_string));
        if let Some(hit) = self.cache.get(&key) {
            return hit.clone();
        }
        let resolved = self.resolve_uncached(&key.0, property);
        self.cache.insert(key, resolved.clone());
        resolved
    }

    fn resolve_uncached(&mut self, raw: &str, property: Option<&str>) -> ResolvedPointer {
        if let Some((_, origin)) = pointer::resolve_schema(self.schema, raw) {
            let canon = self
                .canon_for_origin(&origin)
                .or_else(|| self.canon_for_origin(raw))
                .or_else(|| self.compose.rev_ptr_map.contains_key(raw).then(|| raw.to_string()));
            return ResolvedPointer { origin, canon };
        }

        // Raw already names a canonical node.
        if let Some(origins) = self.compose.rev_ptr_map.get(raw) {
            let mut sorted = origins.clone();
            sorted.sort();
            if let Some(origin) = sorted
                .into_iter()
                .find(|o| pointer::resolve_schema(self.schema, o).is_some())
            {
                return ResolvedPointer {
                    origin,
                    canon: Some(raw.to_string()),
                };
            }
        }

        self.scan_suffixes(raw, property).unwrap_or_else(|| ResolvedPointer {
            origin: raw.to_string(),
            canon: None,
        })
    }

    fn canon_for_origin(&self, origin: &str) -> Option<String> {
        self.compose
            .rev_ptr_map
            .iter()
            .filter(|(_, origins)| origins.iter().any(|o| pointer::normalize(o) == origin))
            .map(|(canon, _)| canon.clone())
            .min_by(|a, b| {
                pointer::split(a)
                    .len()
                    .cmp(&pointer::split(b).len())
                    .then_with(|| a.cmp(b))
            })
    }

    fn scan_suffixes(&mut self, raw: &str, property: Option<&str>) -> Option<ResolvedPointer> {
        let raw_tokens = pointer::split(raw);
        let schema = self.schema;
        let compose = self.compose;
        let candidates = self.candidates.get_or_insert_with(|| build_candidates(compose));

        let matching: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| {
                (!c.origin_tokens.is_empty() && pointer::is_suffix(&raw_tokens, &c.origin_tokens))
                    || (!c.canon_tokens.is_empty()
                        && pointer::is_suffix(&raw_tokens, &c.canon_tokens))
            })
            .collect();
        if matching.is_empty() {
            return None;
        }

        let shortlist: Vec<&Candidate> = match property {
            Some(name) => matching
                .iter()
                .copied()
                .filter(|c| declares_or_not_object(schema, &c.origin, name))
                .collect(),
            None => matching.clone(),
        };
        let pool = if shortlist.is_empty() { matching } else { shortlist };

        pool.into_iter()
            .min_by(|a, b| {
                a.origin_tokens
                    .len()
                    .cmp(&b.origin_tokens.len())
                    .then_with(|| a.origin.cmp(&b.origin))
            })
            .map(|c| ResolvedPointer {
                origin: c.origin.clone(),
                canon: Some(c.canon.clone()),
            })
    }
}

fn build_candidates(compose: &ComposeResult) -> Vec<Candidate> {
    let mut out = Vec::new();
    for (canon, origins) in &compose.rev_ptr_map {
        for origin in origins {
            out.push(Candidate {
                canon: canon.clone(),
                canon_tokens: pointer::split(canon),
                origin: pointer::normalize(origin),
                origin_tokens: pointer::split(origin),
            });
        }
    }
    out
}

fn declares_or_not_object(schema: &Value, origin: &str, property: &str) -> bool {
    let Some((node, _)) = pointer::resolve_schema(schema, origin) else {
        return false;
    };
    match node.get("properties").and_then(Value::as_object) {
        Some(props) => props.contains_key(property),
        None => true,
    }
}
