//! Step 6: `contains` / `minContains` / `maxContains`, solved for every obligation on the array.

use super::{ItemSession, Located};
use crate::pointer;
use crate::synth;
use schemafix_types::codes;
use schemafix_types::compose::ContainsNeed;
use schemafix_types::repair::ActionKind;
use schemafix_types::validation::ValidationError;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use tracing::debug;

/// Repair one array against every contains obligation that applies to it.
///
/// `errors` all share one instance path. Obligations come from the nodes that reported them
/// and from their `allOf` siblings, so grow and shrink see the whole conjunction at once.
pub(super) fn repair(
    session: &mut ItemSession<'_>,
    working: &mut Value,
    errors: &[&ValidationError],
) -> bool {
    let Some(first) = errors.first() else {
        return false;
    };
    let instance_path = first.instance_path.clone();
    let Some(items) = pointer::get(working, &instance_path).and_then(Value::as_array) else {
        return false;
    };
    let mut items = items.clone();
    let located: Vec<Located<'_>> = errors
        .iter()
        .filter_map(|e| session.locate(&e.schema_path, None))
        .collect();
    let Some(at) = located.first() else {
        return false;
    };
    let needs = obligations(session, &located);
    if needs.is_empty() {
        return false;
    }

    let validator = session.env.validator;
    let matches = |need: &ContainsNeed, v: &Value| validator.is_match(&need.schema, v);
    let counts = |items: &[Value]| -> Vec<u64> {
        needs
            .iter()
            .map(|n| items.iter().filter(|v| matches(n, v)).count() as u64)
            .collect()
    };

    let mut changed = false;

    // Grow: append synthesized matches for each shortfall.
    for (i, need) in needs.iter().enumerate() {
        let have = counts(&items)[i];
        if have >= need.min {
            continue;
        }
        let candidate = synth::minimal_value(session.env.schema, &need.schema);
        if !matches(need, &candidate) {
            session.diagnose(
                codes::REPAIR_CONTAINS_UNSAT,
                &at.canon,
                json!({"obligation": i, "reason": "noSynthesizedMatch"}),
            );
            continue;
        }
        let added = need.min - have;
        for _ in 0..added {
            items.push(candidate.clone());
        }
        session.record(
            ActionKind::ContainsAdd,
            at,
            &instance_path,
            json!({"obligation": i, "added": added}),
        );
        changed = true;
    }

    // Shrink: drop matches from the end while no other obligation falls below its minimum.
    for (i, need) in needs.iter().enumerate() {
        let Some(max) = need.max else {
            continue;
        };
        let mut removed = 0u64;
        let mut idx = items.len();
        while counts(&items)[i] > max && idx > 0 {
            idx -= 1;
            if !matches(need, &items[idx]) {
                continue;
            }
            let current = counts(&items);
            let safe = needs.iter().enumerate().all(|(j, other)| {
                j == i || !matches(other, &items[idx]) || current[j] > other.min
            });
            if safe {
                items.remove(idx);
                removed += 1;
            }
        }
        if removed > 0 {
            session.record(
                ActionKind::ContainsRemove,
                at,
                &instance_path,
                json!({"obligation": i, "removed": removed}),
            );
            changed = true;
        }
        if counts(&items)[i] > max {
            debug!(canon_path = %at.canon, obligation = i, "no safe contains removal");
            session.diagnose(
                codes::REPAIR_CONTAINS_UNSAT,
                &at.canon,
                json!({"obligation": i, "reason": "noSafeRemoval"}),
            );
        }
    }

    changed && pointer::replace(working, &instance_path, Value::Array(items))
}

/// Union of the obligations on every reporting node and on its `allOf` siblings.
///
/// Composition entries win. A reporting node without one falls back to its own keywords.
fn obligations(session: &ItemSession<'_>, located: &[Located<'_>]) -> Vec<ContainsNeed> {
    let mut roots: Vec<Vec<String>> = Vec::new();
    for at in located {
        let root = conjunction_root(&at.canon);
        if !roots.contains(&root) {
            roots.push(root);
        }
    }

    let mut needs = Vec::new();
    let mut covered = BTreeSet::new();
    for (canon, bag) in &session.env.compose.contains_bag {
        if !bag.is_empty() && roots.iter().any(|r| within_conjunction(r, canon)) {
            needs.extend(bag.iter().cloned());
            covered.insert(canon.as_str());
        }
    }
    for at in located {
        if !covered.insert(at.canon.as_str()) {
            continue;
        }
        if let Some(schema) = at.node.get("contains") {
            needs.push(ContainsNeed {
                schema: schema.clone(),
                min: at.node.get("minContains").and_then(Value::as_u64).unwrap_or(1),
                max: at.node.get("maxContains").and_then(Value::as_u64),
            });
        }
    }
    needs
}

/// Tokens of `canon` with trailing `allOf/<n>` steps removed.
fn conjunction_root(canon: &str) -> Vec<String> {
    let mut tokens = pointer::split(canon);
    loop {
        let n = tokens.len();
        if n < 2 || tokens[n - 2] != "allOf" || tokens[n - 1].parse::<usize>().is_err() {
            return tokens;
        }
        tokens.truncate(n - 2);
    }
}

/// `canon` is `root` followed by zero or more `allOf/<n>` steps.
fn within_conjunction(root: &[String], canon: &str) -> bool {
    let tokens = pointer::split(canon);
    let Some(rest) = tokens.strip_prefix(root) else {
        return false;
    };
    rest.len() % 2 == 0
        && rest
            .chunks(2)
            .all(|step| step[0] == "allOf" && step[1].parse::<usize>().is_ok())
}
