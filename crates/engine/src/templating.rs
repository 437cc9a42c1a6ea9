//! Bridges the engine's running state into [`template::TemplateContext`]
//! and applies it across an action's arg map (C2's "arg-map evaluation").

use std::collections::HashMap;

use indexmap::IndexMap;
use template::TemplateContext;
use value::Value;

/// Builds the template context for the current tick: `.Now` captured at
/// evaluation time, `.Bases` from the plan/config, and `.Variables`
/// projected to only the string-typed entries of the store (non-strings
/// render as empty, uniformly across every call site).
pub fn build_context(variables: &value::VariableStore, bases: &IndexMap<String, String>, now: chrono::DateTime<chrono::Utc>) -> TemplateContext {
    let mut projected = HashMap::new();
    for (k, v) in variables.as_map() {
        if let Value::String(s) = v {
            projected.insert(k.clone(), s.clone());
        }
    }
    TemplateContext {
        variables: projected,
        bases: bases.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        now: now.to_rfc3339(),
    }
}

/// Templates every string-valued arg; non-string args (numbers, bools,
/// nested maps/lists) pass through untouched.
pub fn render_args(args: &IndexMap<String, Value>, ctx: &TemplateContext) -> IndexMap<String, Value> {
    args.iter()
        .map(|(k, v)| {
            let rendered = match v {
                Value::String(s) => Value::String(template::render(s, ctx)),
                other => other.clone(),
            };
            (k.clone(), rendered)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_string_entries_render_as_absent() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), Value::String("tacos".to_string()));
        map.insert("count".to_string(), Value::Int(3));
        let store = value::VariableStore::from_map(map);
        let ctx = build_context(&store, &IndexMap::new(), chrono::Utc::now());
        assert_eq!(ctx.variables.get("name"), Some(&"tacos".to_string()));
        assert!(!ctx.variables.contains_key("count"));
    }
}
