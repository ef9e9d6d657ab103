//! Template interpolation for config files
//!
//! Handles `{{ variable }}` interpolation in configuration values so that
//! secrets such as the cluster password can stay out of the file, e.g.
//! `password: "{{ env.DWH_DB_PASSWORD }}"`.

use crate::error::{Error, Result};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// `{{ env.NAME }}`, `{{ vars.name }}` or `{{ name }}`
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)*)\s*\}\}").unwrap()
});

/// Context for template interpolation
#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    /// Environment variables, addressed as `env.NAME`
    env: HashMap<String, String>,
    /// Additional variables, addressed as `vars.name` or bare `name`
    vars: HashMap<String, String>,
}

impl TemplateContext {
    /// Create a new empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context holding the current process environment
    pub fn from_env() -> Self {
        Self {
            env: std::env::vars().collect(),
            vars: HashMap::new(),
        }
    }

    /// Set an environment entry
    pub fn set_env(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.env.insert(name.into(), value.into());
        self
    }

    /// Set an additional variable
    pub fn set_var(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Get a value by path (e.g., "env.DWH_DB_PASSWORD")
    pub fn get(&self, path: &str) -> Option<&str> {
        match path.split_once('.') {
            Some(("env", name)) => self.env.get(name).map(String::as_str),
            Some(("vars", name)) => self.vars.get(name).map(String::as_str),
            Some(_) => None,
            None => self.vars.get(path).map(String::as_str),
        }
    }
}

/// Substitute every `{{ path }}` in `template`.
///
/// All unresolved paths are reported together in one error.
pub fn render(template: &str, ctx: &TemplateContext) -> Result<String> {
    let mut missing: Vec<String> = Vec::new();

    let rendered = TEMPLATE_REGEX.replace_all(template, |caps: &regex::Captures<'_>| {
        let path = caps.get(1).map_or("", |m| m.as_str());
        match ctx.get(path) {
            Some(value) => value.to_string(),
            None => {
                missing.push(path.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(Error::undefined_var(missing.join(", ")))
    }
}

/// Whether `s` contains at least one `{{ ... }}` placeholder
pub fn has_templates(s: &str) -> bool {
    TEMPLATE_REGEX.is_match(s)
}

/// Render every string inside a parsed config document; keys are left alone
pub fn render_value(value: &Value, ctx: &TemplateContext) -> Result<Value> {
    Ok(match value {
        Value::String(s) if has_templates(s) => Value::String(render(s, ctx)?),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| render_value(v, ctx).map(|v| (k.clone(), v)))
                .collect::<Result<serde_json::Map<_, _>>>()?,
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| render_value(v, ctx))
                .collect::<Result<Vec<_>>>()?,
        ),
        other => other.clone(),
    })
}
