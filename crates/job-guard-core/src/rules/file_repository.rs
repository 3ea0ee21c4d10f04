use std::{collections::HashSet, fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::OnceCell;
use regex::Regex;

use super::{RedFlagRule, RuleKind, RuleRepository};

/// Loads rules from `keywords.txt` and `patterns.json` under a base directory.
pub struct FileRuleRepository {
    base_path: PathBuf,
    cache: OnceCell<Vec<RedFlagRule>>,
}

impl FileRuleRepository {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            cache: OnceCell::new(),
        }
    }

    fn keywords_path(&self) -> PathBuf {
        self.base_path.join("keywords.txt")
    }

    fn patterns_path(&self) -> PathBuf {
        self.base_path.join("patterns.json")
    }

    /// Parse `id|description|pattern` lines; blank lines and `#` comments are skipped.
    fn load_keywords(&self, seen: &mut HashSet<String>) -> Result<Vec<RedFlagRule>> {
        let path = self.keywords_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read keyword rule file at {}", path.display()))?;
        let mut rules = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let parts: Vec<_> = trimmed.splitn(3, '|').map(str::trim).collect();
            let [id, description, pattern] = parts.as_slice() else {
                return Err(anyhow!(
                    "invalid keyword rule format at {}:{} (expected id|description|pattern)",
                    path.display(),
                    idx + 1
                ));
            };
            if !seen.insert(id.to_string()) {
                return Err(anyhow!("duplicate rule id `{id}`"));
            }
            rules.push(RedFlagRule::new(
                *id,
                *description,
                RuleKind::Keyword,
                *pattern,
            )?);
        }
        Ok(rules)
    }

    fn load_patterns(&self, seen: &mut HashSet<String>) -> Result<Vec<RedFlagRule>> {
        let path = self.patterns_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read pattern rule file at {}", path.display()))?;
        let items: Vec<JsonRule> = serde_json::from_str(&raw).with_context(|| {
            format!(
                "invalid JSON structure in pattern rule file at {}",
                path.display()
            )
        })?;
        let mut rules = Vec::with_capacity(items.len());
        for item in items {
            if !seen.insert(item.id.clone()) {
                return Err(anyhow!("duplicate rule id `{}`", item.id));
            }
            Regex::new(&item.pattern).with_context(|| {
                format!(
                    "invalid regex for rule `{}` in {}",
                    item.id,
                    path.display()
                )
            })?;
            rules.push(RedFlagRule::new(
                item.id,
                item.description,
                RuleKind::Regex,
                item.pattern,
            )?);
        }
        Ok(rules)
    }
}

#[async_trait::async_trait]
impl RuleRepository for FileRuleRepository {
    async fn load_rules(&self) -> Result<Vec<RedFlagRule>> {
        let rules = self.cache.get_or_try_init(|| {
            let mut seen = HashSet::new();
            let mut rules = self.load_keywords(&mut seen)?;
            rules.extend(self.load_patterns(&mut seen)?);
            Ok::<_, anyhow::Error>(rules)
        })?;
        Ok(rules.clone())
    }

    async fn get_rule(&self, rule_id: &str) -> Result<Option<RedFlagRule>> {
        let rules = self.load_rules().await?;
        Ok(rules.into_iter().find(|rule| rule.id == rule_id))
    }
}

#[derive(serde::Deserialize)]
struct JsonRule {
    id: String,
    description: String,
    pattern: String,
}
