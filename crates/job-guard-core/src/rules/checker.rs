use std::{collections::BTreeMap, sync::Arc};

use aho_corasick::AhoCorasick;
use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, instrument, trace};

use super::{RedFlag, RedFlagDetector, RedFlagRule, RuleKind, RuleRepository, Span};

const DEFAULT_CONTEXT_WINDOW: usize = 48;
const MAX_EXCERPT_CHARS: usize = 160;

/// Detector backed by a rule repository, combining keyword and regex matching.
pub struct RedFlagChecker<R: RuleRepository> {
    rule_repo: Arc<R>,
    context_window: usize,
}

impl<R: RuleRepository> RedFlagChecker<R> {
    pub fn new(rule_repo: Arc<R>) -> Self {
        Self {
            rule_repo,
            context_window: DEFAULT_CONTEXT_WINDOW,
        }
    }

    /// Number of bytes captured on each side of a match for the excerpt.
    pub fn with_context_window(mut self, window: usize) -> Self {
        self.context_window = window;
        self
    }

    fn compile_keyword_automaton(
        rules: &[RedFlagRule],
    ) -> Result<Option<(AhoCorasick, Vec<&RedFlagRule>)>> {
        let keyword_rules: Vec<_> = rules
            .iter()
            .filter(|rule| rule.kind == RuleKind::Keyword)
            .collect();
        if keyword_rules.is_empty() {
            return Ok(None);
        }
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(keyword_rules.iter().map(|rule| rule.pattern.as_str()))
            .context("failed to build keyword automaton from rules")?;
        Ok(Some((automaton, keyword_rules)))
    }

    fn compile_regex_rules(rules: &[RedFlagRule]) -> Result<Vec<(Regex, &RedFlagRule)>> {
        rules
            .iter()
            .filter(|rule| rule.kind == RuleKind::Regex)
            .map(|rule| {
                Regex::new(&rule.pattern)
                    .with_context(|| format!("invalid regex pattern for rule {}", rule.id))
                    .map(|regex| (regex, rule))
            })
            .collect()
    }

    fn record_first_match(
        &self,
        hits: &mut BTreeMap<String, RedFlag>,
        input: &str,
        rule: &RedFlagRule,
        span: Span,
    ) {
        if span.0 >= span.1 {
            return;
        }
        if let Some(existing) = hits.get(&rule.id) {
            if existing.span.0 <= span.0 {
                return;
            }
        }
        hits.insert(
            rule.id.clone(),
            RedFlag {
                rule_id: rule.id.clone(),
                description: rule.description.clone(),
                span,
                excerpt: extract_excerpt(input, span, self.context_window),
            },
        );
    }
}

#[async_trait::async_trait]
impl<R> RedFlagDetector for RedFlagChecker<R>
where
    R: RuleRepository + 'static,
{
    #[instrument(name = "check_red_flags", skip(self, text), fields(text_len = text.len()))]
    async fn detect(&self, text: &str) -> Result<Vec<RedFlag>> {
        let rules = self.rule_repo.load_rules().await?;
        let keyword_automaton = Self::compile_keyword_automaton(&rules)?;
        let regex_rules = Self::compile_regex_rules(&rules)?;

        let mut hits = BTreeMap::new();

        if let Some((automaton, keyword_rules)) = keyword_automaton {
            trace!(count = keyword_rules.len(), "checking keyword rules");
            for mat in automaton.find_overlapping_iter(text) {
                if let Some(rule) = keyword_rules.get(mat.pattern().as_usize()) {
                    self.record_first_match(&mut hits, text, rule, (mat.start(), mat.end()));
                }
            }
        }

        for (regex, rule) in &regex_rules {
            trace!(rule_id = %rule.id, "checking regex rule");
            if let Some(found) = regex.find_iter(text).find(|m| m.start() < m.end()) {
                self.record_first_match(&mut hits, text, rule, (found.start(), found.end()));
            }
        }

        let mut flags: Vec<_> = hits.into_values().collect();
        flags.sort_by(|a, b| {
            a.span
                .0
                .cmp(&b.span.0)
                .then_with(|| a.rule_id.cmp(&b.rule_id))
        });
        debug!(flags = flags.len(), "red flag check completed");
        Ok(flags)
    }
}

fn extract_excerpt(input: &str, span: Span, window: usize) -> String {
    let start = char_boundary_back(input, span.0.saturating_sub(window));
    let end = char_boundary_forward(input, span.1.saturating_add(window));
    input[start..end]
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .take(MAX_EXCERPT_CHARS)
        .collect()
}

fn char_boundary_back(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn char_boundary_forward(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while idx < text.len() && !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::builtin::BuiltinRuleRepository;

    struct StaticRepo {
        rules: Vec<RedFlagRule>,
    }

    #[async_trait::async_trait]
    impl RuleRepository for StaticRepo {
        async fn load_rules(&self) -> Result<Vec<RedFlagRule>> {
            Ok(self.rules.clone())
        }

        async fn get_rule(&self, rule_id: &str) -> Result<Option<RedFlagRule>> {
            Ok(self.rules.iter().find(|rule| rule.id == rule_id).cloned())
        }
    }

    fn ids(flags: &[RedFlag]) -> Vec<&str> {
        flags.iter().map(|flag| flag.rule_id.as_str()).collect()
    }

    #[tokio::test]
    async fn builtin_rules_flag_classic_scam_posting() {
        let checker = RedFlagChecker::new(Arc::new(BuiltinRuleRepository));
        let text = "URGENT hiring! Work from home and earn $900 weekly. \
                    Message us on Telegram and send your details to jobs@gmail.com.";
        let flags = checker.detect(text).await.unwrap();
        assert_eq!(
            ids(&flags),
            vec![
                "urgency_tactics",
                "too_good_to_be_true",
                "unrealistic_salary",
                "messaging_app_contact",
                "upfront_personal_info",
                "free_email_domain",
            ]
        );
    }

    #[tokio::test]
    async fn clean_posting_has_no_flags() {
        let checker = RedFlagChecker::new(Arc::new(BuiltinRuleRepository));
        let text = "Acme Corp is hiring a backend engineer. Apply through careers.acme.com \
                    with your portfolio. Salary band published on our site.";
        let flags = checker.detect(text).await.unwrap();
        assert!(flags.is_empty(), "unexpected flags: {:?}", ids(&flags));
    }

    #[tokio::test]
    async fn each_rule_fires_once_at_first_match() {
        let repo = Arc::new(StaticRepo {
            rules: vec![
                RedFlagRule::new("wire", "wire transfer", RuleKind::Keyword, "wire transfer")
                    .unwrap(),
                RedFlagRule::new("fee", "upfront fee", RuleKind::Regex, r"(?i)fee").unwrap(),
            ],
        });
        let checker = RedFlagChecker::new(repo);
        let text = "Pay a FEE by Wire Transfer, then another fee by wire transfer.";
        let flags = checker.detect(text).await.unwrap();
        assert_eq!(ids(&flags), vec!["fee", "wire"]);
        assert_eq!(flags[0].span, (6, 9));
        assert_eq!(flags[1].span.0, 13);
    }

    #[tokio::test]
    async fn context_window_bounds_excerpt() {
        let repo = Arc::new(StaticRepo {
            rules: vec![RedFlagRule::new("fee", "upfront fee", RuleKind::Keyword, "fee").unwrap()],
        });
        let text = "first pay a fee\nto start";
        let narrow = RedFlagChecker::new(repo.clone()).with_context_window(2);
        let flags = narrow.detect(text).await.unwrap();
        assert_eq!(flags[0].excerpt, "a fee t");

        let none = RedFlagChecker::new(repo).with_context_window(0);
        let flags = none.detect(text).await.unwrap();
        assert_eq!(flags[0].excerpt, "fee");
    }

    #[tokio::test]
    async fn overlapping_keywords_both_fire() {
        let repo = Arc::new(StaticRepo {
            rules: vec![
                RedFlagRule::new("easy", "easy money", RuleKind::Keyword, "easy money").unwrap(),
                RedFlagRule::new("money", "money talk", RuleKind::Keyword, "money").unwrap(),
            ],
        });
        let checker = RedFlagChecker::new(repo);
        let flags = checker.detect("make easy money today").await.unwrap();
        assert_eq!(ids(&flags), vec!["easy", "money"]);
    }

    #[tokio::test]
    async fn skips_zero_width_matches() {
        let repo = Arc::new(StaticRepo {
            rules: vec![RedFlagRule::new("EMPTY", "zero-width", RuleKind::Regex, r"^").unwrap()],
        });
        let checker = RedFlagChecker::new(repo);
        assert!(checker.detect("hello").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_regex_is_reported() {
        let repo = Arc::new(StaticRepo {
            rules: vec![RedFlagRule::new("BROKEN", "bad", RuleKind::Regex, r"(unclosed").unwrap()],
        });
        let checker = RedFlagChecker::new(repo);
        let err = checker.detect("anything").await.unwrap_err();
        assert!(err.to_string().contains("BROKEN"));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        let text = "héllo wörld";
        let excerpt = extract_excerpt(text, (0, 5), 2);
        assert!(excerpt.contains('h'));
        assert!(excerpt.contains('é'));
        let tail = extract_excerpt(text, (8, 9), 1);
        assert!(tail.contains('ö'));
    }
}
