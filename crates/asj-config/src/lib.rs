//! asj-config: layered YAML show configuration.
//!
//! A show's configuration is a stack of YAML documents (site defaults, then
//! per-show overrides) deep-merged in order. The merged document is hashed
//! over its canonical JSON form so operators can confirm two machines run
//! the same configuration, and every leaf string is screened against known
//! secret formats: credentials belong in the environment, never in config
//! files that get committed and mailed around.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

mod show;

pub use show::{ShowConfig, SquareConfig, TelegramConfig};

/// Known secret-like prefixes. If any leaf string value in the effective
/// config starts with one of these, loading aborts.
const SECRET_PREFIXES: &[&str] = &[
    "EAAA",       // Square access token (production)
    "sq0atp-",    // Square access token (legacy)
    "sq0csp-",    // Square application secret
    "sq0idp-",    // Square OAuth
    "AKIA",       // AWS access key ID
    "-----BEGIN", // PEM private keys
    "ghp_",       // GitHub PAT
    "xoxb-",      // Slack bot token
];

/// The merged configuration with its canonical form and hash.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config_hash: String,
    pub canonical_json: String,
    pub config_json: Value,
}

impl LoadedConfig {
    /// Deserialize the typed show view from the merged document.
    pub fn show(&self) -> Result<ShowConfig> {
        ShowConfig::from_json(&self.config_json)
    }
}

/// Load and merge YAML documents from paths, earlier paths being the base.
pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut docs: Vec<String> = Vec::new();
    for p in paths {
        let p = p.as_ref();
        let raw = fs::read_to_string(p)
            .with_context(|| format!("failed to read yaml path: {}", p.display()))?;
        docs.push(raw);
    }
    let doc_refs: Vec<&str> = docs.iter().map(|s| s.as_str()).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

/// Merge YAML documents in order: earlier docs are base, later docs override.
pub fn load_layered_yaml_from_strings(yaml_docs: &[&str]) -> Result<LoadedConfig> {
    let mut merged = serde_json::json!({});
    for raw in yaml_docs {
        let v_yaml: serde_yaml::Value = serde_yaml::from_str(raw).context("invalid yaml")?;
        let v_json = serde_json::to_value(v_yaml).context("yaml->json conversion failed")?;
        merged = deep_merge(merged, v_json);
    }

    enforce_no_secret_literals(&merged)?;

    let canonical_json = canonicalize_json(&merged)?;
    let config_hash = sha256_hex(canonical_json.as_bytes());
    Ok(LoadedConfig {
        config_hash,
        canonical_json,
        config_json: merged,
    })
}

fn deep_merge(a: Value, b: Value) -> Value {
    match (a, b) {
        (Value::Object(mut a_map), Value::Object(b_map)) => {
            for (k, b_val) in b_map {
                let a_val = a_map.remove(&k).unwrap_or(Value::Null);
                a_map.insert(k, deep_merge(a_val, b_val));
            }
            Value::Object(a_map)
        }
        (_, b_other) => b_other,
    }
}

fn canonicalize_json(v: &Value) -> Result<String> {
    // Compact form; key order is deterministic given deterministic YAML
    // input ordering plus the merge above.
    serde_json::to_string(v).context("canonical json serialize failed")
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Secret guard
// ---------------------------------------------------------------------------

fn enforce_no_secret_literals(v: &Value) -> Result<()> {
    let mut leaves = Vec::new();
    collect_leaf_pointers(v, "", &mut leaves);

    for ptr in leaves {
        if let Some(val) = v.pointer(&ptr) {
            if let Some(s) = val.as_str() {
                if looks_like_secret(s) {
                    bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", ptr);
                }
            }
        }
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if t.len() < 8 {
        return false;
    }
    if SECRET_PREFIXES.iter().any(|p| t.starts_with(p)) {
        return true;
    }
    // Telegram bot tokens: "<digits>:<35 base64ish chars>".
    if let Some((id, rest)) = t.split_once(':') {
        if !id.is_empty()
            && id.chars().all(|c| c.is_ascii_digit())
            && rest.len() >= 30
            && rest
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return true;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Unused-key guard
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnusedKeyPolicy {
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct UnusedKeyReport {
    /// Consumed JSON-pointer prefixes used for this analysis (sorted, unique)
    pub consumed_prefixes: Vec<String>,
    /// Minimal set of unused leaf pointers (sorted)
    pub unused_leaf_pointers: Vec<String>,
}

impl UnusedKeyReport {
    pub fn is_clean(&self) -> bool {
        self.unused_leaf_pointers.is_empty()
    }
}

/// JSON-pointer prefixes the code actually reads.
///
/// Must reflect real reads (see `ShowConfig::from_json`); do not
/// wish-consume broad sections.
pub fn consumed_pointers() -> &'static [&'static str] {
    &[
        "/show",
        "/money",
        "/pieces",
        "/bidder_ids",
        "/square",
        "/telegram",
        "/mail",
    ]
}

/// Report config leaves nothing reads. `Fail` turns a dirty report into an
/// error; `Warn` always returns the report for the caller to log.
pub fn report_unused_keys(config_json: &Value, policy: UnusedKeyPolicy) -> Result<UnusedKeyReport> {
    let mut consumed: BTreeSet<String> = BTreeSet::new();
    for p in consumed_pointers() {
        consumed.insert(normalize_pointer(p));
    }
    let consumed_prefixes: Vec<String> = consumed.iter().cloned().collect();

    let mut leaves: Vec<String> = Vec::new();
    collect_leaf_pointers(config_json, "", &mut leaves);

    let mut unused: Vec<String> = Vec::new();
    'leaf: for lp in leaves {
        for cp in &consumed_prefixes {
            if is_prefix_pointer(cp, &lp) {
                continue 'leaf;
            }
        }
        unused.push(lp);
    }
    unused.sort();
    unused.dedup();

    let report = UnusedKeyReport {
        consumed_prefixes,
        unused_leaf_pointers: unused,
    };

    if policy == UnusedKeyPolicy::Fail && !report.is_clean() {
        bail!(
            "CONFIG_UNUSED_KEYS: {} unused config leaf key(s) detected. \
             Remove them or update the consumed registry. First few: {:?}",
            report.unused_leaf_pointers.len(),
            report
                .unused_leaf_pointers
                .iter()
                .take(12)
                .collect::<Vec<_>>()
        );
    }

    Ok(report)
}

fn normalize_pointer(p: &str) -> String {
    let mut s = p.trim().to_string();
    if s.is_empty() {
        return "/".to_string();
    }
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    while s.ends_with('/') && s.len() > 1 {
        s.pop();
    }
    s
}

/// True if `prefix` is a JSON-pointer prefix of `leaf`:
/// "/a/b" covers "/a/b/c" but not "/a/bc".
fn is_prefix_pointer(prefix: &str, leaf: &str) -> bool {
    if prefix == "/" || leaf == prefix {
        return true;
    }
    if leaf.starts_with(prefix) {
        return leaf
            .get(prefix.len()..prefix.len() + 1)
            .map(|c| c == "/")
            .unwrap_or(false);
    }
    false
}

fn collect_leaf_pointers(v: &Value, prefix: &str, out: &mut Vec<String>) {
    match v {
        Value::Object(map) => {
            for (k, vv) in map.iter() {
                let next = format!("{}/{}", prefix, escape_pointer_token(k));
                collect_leaf_pointers(vv, &next, out);
            }
        }
        Value::Array(arr) => {
            for (i, vv) in arr.iter().enumerate() {
                let next = format!("{}/{}", prefix, i);
                collect_leaf_pointers(vv, &next, out);
            }
        }
        _ => {
            let p = if prefix.is_empty() {
                "/".to_string()
            } else {
                prefix.to_string()
            };
            out.push(p);
        }
    }
}

fn escape_pointer_token(s: &str) -> String {
    s.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = r#"
show:
  name: Generic Art Show
  year: "1999"
money:
  tax_rate: "0.10"
  commission: "0.10"
  invoice_prefix: "1999-"
"#;

    const OVERRIDE: &str = r#"
show:
  year: "2026"
money:
  invoice_prefix: "2026-"
"#;

    #[test]
    fn later_documents_override_earlier() {
        let cfg = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        assert_eq!(cfg.config_json["show"]["year"], "2026");
        assert_eq!(cfg.config_json["show"]["name"], "Generic Art Show");
        assert_eq!(cfg.config_json["money"]["invoice_prefix"], "2026-");
        assert_eq!(cfg.config_json["money"]["tax_rate"], "0.10");
    }

    #[test]
    fn hash_is_stable_across_reloads() {
        let a = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        assert_eq!(a.config_hash, b.config_hash);
        assert_eq!(a.config_hash.len(), 64);
    }

    #[test]
    fn hash_changes_when_config_changes() {
        let a = load_layered_yaml_from_strings(&[BASE]).unwrap();
        let b = load_layered_yaml_from_strings(&[BASE, OVERRIDE]).unwrap();
        assert_ne!(a.config_hash, b.config_hash);
    }

    #[test]
    fn square_token_literal_is_rejected() {
        let doc = "square:\n  access_token: EAAAlongsecrettokenvalue\n";
        let err = load_layered_yaml_from_strings(&[doc]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
        assert!(!err.to_string().contains("EAAAlong"), "value must be redacted");
    }

    #[test]
    fn telegram_token_literal_is_rejected() {
        let doc = "telegram:\n  token: \"110201543:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsaw\"\n";
        let err = load_layered_yaml_from_strings(&[doc]).unwrap_err();
        assert!(err.to_string().contains("CONFIG_SECRET_DETECTED"));
    }

    #[test]
    fn short_or_plain_strings_pass() {
        let doc = "show:\n  name: \"A:B gallery\"\n";
        assert!(load_layered_yaml_from_strings(&[doc]).is_ok());
    }

    #[test]
    fn unused_keys_reported() {
        let doc = "show:\n  name: X\nlegacy:\n  paypal_url: http://example.com\n";
        let cfg = load_layered_yaml_from_strings(&[doc]).unwrap();
        let report = report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Warn).unwrap();
        assert_eq!(report.unused_leaf_pointers, vec!["/legacy/paypal_url"]);
        assert!(report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Fail).is_err());
    }
}
