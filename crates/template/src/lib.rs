//! Minimal `<<`/`>>`-delimited template substitution.
//!
//! General-purpose templating crates assume `{{`/`}}` delimiters and pull
//! in control flow, partials, and whitespace trimming this system never
//! needs - it only ever substitutes one of three fixed reference forms
//! (`.Variables.name`, `.Bases.name`, `.Now`) into a string. A hand-rolled
//! scanner is therefore the proportionate choice, not a corner cut.

use std::collections::HashMap;

/// Everything a template may reference. `variables` must already be
/// filtered to string-typed entries by the caller - non-string values
/// are simply absent here and resolve as empty.
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    pub variables: HashMap<String, String>,
    pub bases: HashMap<String, String>,
    pub now: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Reference {
    Variable(String),
    Base(String),
    Now,
}

fn parse_reference(inner: &str) -> Option<Reference> {
    let inner = inner.trim();
    let rest = inner.strip_prefix('.')?;
    if rest == "Now" {
        return Some(Reference::Now);
    }
    if let Some(name) = rest.strip_prefix("Variables.") {
        if name.is_empty() || name.contains(['.', '[', ']']) {
            return None;
        }
        return Some(Reference::Variable(name.to_string()));
    }
    if let Some(name) = rest.strip_prefix("Bases.") {
        if name.is_empty() || name.contains(['.', '[', ']']) {
            return None;
        }
        return Some(Reference::Base(name.to_string()));
    }
    None
}

/// Renders `input` against `ctx`. On any malformed reference (unbalanced
/// delimiters or a path this evaluator doesn't recognize) the *entire*
/// input is returned unchanged - templates must never abort the
/// transaction they're embedded in. A recognized reference to a variable
/// or base that doesn't exist renders as an empty string rather than
/// failing the whole template.
pub fn render(input: &str, ctx: &TemplateContext) -> String {
    match try_render(input, ctx) {
        Ok(out) => out,
        Err(reason) => {
            tracing::warn!(%reason, template = %input, "template render failed, returning input verbatim");
            input.to_string()
        },
    }
}

fn try_render(input: &str, ctx: &TemplateContext) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        let Some(start) = rest.find("<<") else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find(">>") else {
            return Err("unbalanced << delimiter".to_string());
        };
        let inner = &after_open[..end];
        let reference = parse_reference(inner).ok_or_else(|| format!("unrecognized reference {inner:?}"))?;
        let resolved = match reference {
            Reference::Now => ctx.now.clone(),
            Reference::Variable(name) => ctx.variables.get(&name).cloned().unwrap_or_default(),
            Reference::Base(name) => ctx.bases.get(&name).cloned().unwrap_or_default(),
        };
        out.push_str(&resolved);
        rest = &after_open[end + 2..];
    }
    Ok(out)
}

/// Substitutes `[[ name ]]`-delimited parameters from a flat string map.
/// Used only by the config loader for `txninclude` parameter
/// substitution at load time, never against the live Variable Store.
pub fn render_include_params(input: &str, params: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    loop {
        let Some(start) = rest.find("[[") else {
            out.push_str(rest);
            break;
        };
        out.push_str(&rest[..start]);
        let after_open = &rest[start + 2..];
        let Some(end) = after_open.find("]]") else {
            out.push_str("[[");
            out.push_str(after_open);
            break;
        };
        let name = after_open[..end].trim();
        match params.get(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push_str("[[");
                out.push_str(name);
                out.push_str("]]");
            },
        }
        rest = &after_open[end + 2..];
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TemplateContext {
        TemplateContext {
            variables: HashMap::from([("name".to_string(), "tacos".to_string())]),
            bases: HashMap::from([("api".to_string(), "http://stub".to_string())]),
            now: "2026-07-30T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn substitutes_variable_and_base() {
        let out = render("I love <<.Variables.name>> from <<.Bases.api>>", &ctx());
        assert_eq!(out, "I love tacos from http://stub");
    }

    #[test]
    fn substitutes_now() {
        let out = render("at <<.Now>>", &ctx());
        assert_eq!(out, "at 2026-07-30T00:00:00Z");
    }

    #[test]
    fn missing_variable_renders_empty() {
        let out = render("<<.Variables.missing>>end", &ctx());
        assert_eq!(out, "end");
    }

    #[test]
    fn malformed_template_returns_input_verbatim() {
        let input = "broken <<.Variables.name";
        assert_eq!(render(input, &ctx()), input);
    }

    #[test]
    fn unrecognized_reference_returns_input_verbatim() {
        let input = "<<.Nonsense.foo>>";
        assert_eq!(render(input, &ctx()), input);
    }

    #[test]
    fn include_param_substitution() {
        let params = HashMap::from([("env".to_string(), "prod".to_string())]);
        assert_eq!(render_include_params("host-[[env]]", &params), "host-prod");
    }
}
