//! CLI/env configuration (via [`clap`]) and YAML plan/config loading (C11).
//!
//! Loading is deliberately forgiving: a malformed `planinclude` or
//! `txninclude` entry is logged and dropped rather than aborting the whole
//! load, mirroring the engine's own non-authoritative stance on plan
//! correctness (§4.10). Only the top-level config file itself is fatal to
//! miss.

use std::path::{Path, PathBuf};

use clap::Parser;
use engine::Config;
use errors::{EngineError, EngineResult};
use indexmap::IndexMap;
use serde::Deserialize;
use value::Value;

/// CLI flags, each also readable from its namesake environment variable
/// (an explicit flag wins over the environment, matching the original
/// tool's precedence).
#[derive(Parser, Debug, Clone)]
#[command(name = "stubsim", about = "Scripted HTTP-interaction simulator")]
pub struct Cli {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    #[arg(long, env = "APILISTENHOST", default_value = "0.0.0.0")]
    pub api_listen_host: String,

    #[arg(long, env = "APIAUTHUSERNAME", default_value = "")]
    pub api_auth_username: String,

    #[arg(long, env = "APIAUTHPASSWORD", default_value = "")]
    pub api_auth_password: String,

    #[arg(long, env = "LOGLEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "CONFIGFILE")]
    pub config_file: PathBuf,

    #[arg(long, env = "TESTMODE", default_value_t = false)]
    pub test_mode: bool,

    #[arg(long, env = "TESTURL")]
    pub test_url: Option<String>,

    /// Comma-separated `name=value` pairs, e.g. `payments=http://stub:9001`.
    #[arg(long, env = "BASES", default_value = "")]
    pub bases: String,
}

fn parse_bases(raw: &str) -> IndexMap<String, String> {
    raw.split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect()
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    default_plan: Option<String>,
    #[serde(default)]
    plan: Vec<RawPlan>,
    #[serde(default)]
    planinclude: Vec<String>,
    #[serde(default)]
    bases: IndexMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawPlan {
    name: String,
    start_transaction: Option<String>,
    stop_var: Option<String>,
    #[serde(default)]
    bases: IndexMap<String, String>,
    #[serde(default)]
    variables: IndexMap<String, Value>,
    externalvars: Option<String>,
    #[serde(default)]
    txn: Vec<engine::model::TransactionDef>,
    #[serde(default)]
    txninclude: Vec<TxnInclude>,
}

#[derive(Debug, Deserialize)]
struct TxnInclude {
    file: String,
    #[serde(default)]
    params: std::collections::HashMap<String, String>,
}

fn read_validated(path: &str, base: Option<&Path>) -> EngineResult<String> {
    let resolved = paths::validate(path, base)?;
    std::fs::read_to_string(&resolved).map_err(|e| EngineError::io(format!("reading {path:?}: {e}")))
}

fn build_plan(raw: RawPlan, config_dir: Option<&Path>) -> EngineResult<engine::model::PlanDef> {
    let mut variables = match &raw.externalvars {
        Some(path) => {
            let content = read_validated(path, config_dir)?;
            let parsed: serde_yaml::Value =
                serde_yaml::from_str(&content).map_err(|e| EngineError::config(format!("externalvars {path:?}: {e}")))?;
            match Value::from(parsed) {
                Value::Map(m) => m,
                _ => IndexMap::new(),
            }
        },
        None => IndexMap::new(),
    };
    for (k, v) in raw.variables {
        variables.insert(k, v);
    }

    let mut txn = raw.txn;
    for include in raw.txninclude {
        match read_validated(&include.file, config_dir) {
            Ok(content) => {
                let substituted = template::render_include_params(&content, &include.params);
                match serde_yaml::from_str::<engine::model::TransactionDef>(&substituted) {
                    Ok(parsed) => txn.push(parsed),
                    Err(err) => tracing::warn!(file = %include.file, error = %err, "skipping malformed txninclude"),
                }
            },
            Err(err) => tracing::warn!(file = %include.file, error = %err, "skipping unreadable txninclude"),
        }
    }

    Ok(engine::model::PlanDef { name: raw.name, start_transaction: raw.start_transaction, stop_var: raw.stop_var, bases: raw.bases, variables, txn })
}

/// Loads the top-level config file and every `planinclude`/`txninclude`/
/// `externalvars` it references, producing the fully-merged in-memory
/// [`Config`]. Returns the config file's directory alongside it, used as
/// the base directory for every runtime file access (`payload`,
/// `match_file`, `response`).
pub fn load(cli: &Cli) -> EngineResult<(Config, PathBuf)> {
    let config_dir = cli.config_file.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let content = std::fs::read_to_string(&cli.config_file)
        .map_err(|e| EngineError::config(format!("reading config file {:?}: {e}", cli.config_file)))?;
    let raw: RawConfig = serde_yaml::from_str(&content).map_err(|e| EngineError::config(format!("parsing config file: {e}")))?;

    let mut plans = Vec::with_capacity(raw.plan.len() + raw.planinclude.len());
    for plan in raw.plan {
        let name = plan.name.clone();
        match build_plan(plan, Some(&config_dir)) {
            Ok(built) => plans.push(built),
            Err(err) => tracing::warn!(plan = %name, error = %err, "skipping malformed plan"),
        }
    }
    for include in raw.planinclude {
        match read_validated(&include, Some(&config_dir)) {
            Ok(content) => match serde_yaml::from_str::<RawPlan>(&content) {
                Ok(raw_plan) => match build_plan(raw_plan, Some(&config_dir)) {
                    Ok(built) => plans.push(built),
                    Err(err) => tracing::warn!(file = %include, error = %err, "skipping malformed planinclude"),
                },
                Err(err) => tracing::warn!(file = %include, error = %err, "skipping malformed planinclude"),
            },
            Err(err) => tracing::warn!(file = %include, error = %err, "skipping unreadable planinclude"),
        }
    }

    let mut bases = raw.bases;
    for (k, v) in parse_bases(&cli.bases) {
        bases.insert(k, v);
    }
    if let Some(test_url) = &cli.test_url {
        bases.insert("testurl".to_string(), test_url.clone());
    }

    Ok((Config { default_plan: raw.default_plan, plan: plans, bases }, config_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_bases() {
        let parsed = parse_bases("payments=http://stub:1,invoicing=http://stub:2");
        assert_eq!(parsed.get("payments").map(String::as_str), Some("http://stub:1"));
        assert_eq!(parsed.get("invoicing").map(String::as_str), Some("http://stub:2"));
    }

    #[test]
    fn empty_bases_string_yields_empty_map() {
        assert!(parse_bases("").is_empty());
    }
}
