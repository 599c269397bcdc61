//! Compiling raw `ExclusionRule`/`RenameRule` rows into matchers.
//!
//! `regex`/`wildcard` modes compile a [`regex::Regex`] eagerly, at
//! construction time, so a malformed pattern is rejected before a sync run
//! starts rather than failing mid-traversal.

use regex::{Regex, RegexBuilder};

use sharesync_core::domain::{BaseFileInfo, ExclusionRule, ItemType, MatchMode, RenameRule, RenameScope, RuleTarget};
use sharesync_core::ports::ListingFilter;

use crate::error::RuleError;

/// A compiled exclusion rule, ready to test against items.
pub struct CompiledExclusionRule {
    pattern: String,
    target: RuleTarget,
    item_type: ItemType,
    mode: MatchMode,
    case_sensitive: bool,
    regex: Option<Regex>,
}

impl CompiledExclusionRule {
    /// Compile one rule. `index` is only used to label regex errors.
    pub fn compile(rule: &ExclusionRule, index: usize) -> Result<Self, RuleError> {
        let pattern = if rule.case_sensitive {
            rule.pattern.clone()
        } else {
            rule.pattern.to_lowercase()
        };

        let regex = match rule.mode {
            MatchMode::Regex => Some(build_regex(&pattern, rule.case_sensitive, index, &rule.pattern)?),
            MatchMode::Wildcard => {
                let escaped = wildcard_to_regex(&pattern);
                Some(build_regex(&escaped, rule.case_sensitive, index, &rule.pattern)?)
            }
            MatchMode::Exact | MatchMode::Contains => None,
        };

        Ok(Self {
            pattern,
            target: rule.target,
            item_type: rule.item_type,
            mode: rule.mode,
            case_sensitive: rule.case_sensitive,
            regex,
        })
    }

    fn value_for(&self, item: &BaseFileInfo) -> Option<String> {
        let raw = match self.target {
            RuleTarget::Name => Some(item.file_name.clone()),
            RuleTarget::Path => Some(item.file_path.clone()),
            RuleTarget::Extension => {
                if item.is_folder {
                    None
                } else {
                    item.extension().map(str::to_string)
                }
            }
        }?;

        Some(if self.case_sensitive { raw } else { raw.to_lowercase() })
    }

    /// `true` iff this rule matches `item`.
    pub fn matches(&self, item: &BaseFileInfo) -> bool {
        match self.item_type {
            ItemType::File if item.is_folder => return false,
            ItemType::Folder if !item.is_folder => return false,
            _ => {}
        }

        let Some(value) = self.value_for(item) else { return false };

        match self.mode {
            MatchMode::Exact => value == self.pattern,
            MatchMode::Contains => value.contains(&self.pattern),
            MatchMode::Regex | MatchMode::Wildcard => {
                self.regex.as_ref().is_some_and(|re| re.is_match(&value))
            }
        }
    }
}

/// A compiled set of exclusion rules, tested in order; the first match wins.
pub struct ItemFilter {
    rules: Vec<CompiledExclusionRule>,
}

impl ItemFilter {
    /// Compile every rule in `rules`, failing on the first invalid pattern.
    pub fn compile(rules: &[ExclusionRule]) -> Result<Self, RuleError> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| CompiledExclusionRule::compile(rule, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules: compiled })
    }

    /// An `ItemFilter` with no rules; never excludes anything.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// `true` iff any compiled rule matches `item`.
    pub fn should_exclude(&self, item: &BaseFileInfo) -> bool {
        self.rules.iter().any(|rule| rule.matches(item))
    }

    /// `true` iff `item` is a folder that should be excluded *and* pruned
    /// from further traversal (its children are never visited).
    pub fn should_prune_folder(&self, item: &BaseFileInfo) -> bool {
        item.is_folder && self.should_exclude(item)
    }
}

impl ListingFilter for ItemFilter {
    fn excludes(&self, item: &BaseFileInfo) -> bool {
        self.should_exclude(item)
    }
}

/// A compiled rename rule.
pub struct CompiledRenameRule {
    regex: Regex,
    replace_string: String,
    target_scope: RenameScope,
}

impl CompiledRenameRule {
    pub fn compile(rule: &RenameRule, index: usize) -> Result<Self, RuleError> {
        let regex = RegexBuilder::new(&rule.match_regex)
            .case_insensitive(!rule.case_sensitive)
            .build()
            .map_err(|source| RuleError::InvalidRenamePattern {
                index,
                pattern: rule.match_regex.clone(),
                source,
            })?;

        Ok(Self {
            regex,
            replace_string: rule.replace_string.clone(),
            target_scope: rule.target_scope,
        })
    }

    /// Apply this rule to `item`, returning the new full path if it changed
    /// anything, or `None` if the pattern didn't match.
    pub fn generate_new_path(&self, item: &BaseFileInfo) -> Option<String> {
        match self.target_scope {
            RenameScope::Name => {
                let new_name = self.regex.replace(&item.file_name, self.replace_string.as_str());
                if new_name == item.file_name {
                    return None;
                }
                Some(replace_final_component(&item.file_path, &item.file_name, &new_name))
            }
            RenameScope::Path => {
                let new_path = self.regex.replace(&item.file_path, self.replace_string.as_str());
                if new_path == item.file_path {
                    return None;
                }
                Some(new_path.into_owned())
            }
        }
    }
}

/// A compiled set of rename rules. The first rule (in order) that changes
/// an item wins; later rules are not consulted for that item.
pub struct RenameSet {
    rules: Vec<CompiledRenameRule>,
}

impl RenameSet {
    pub fn compile(rules: &[RenameRule]) -> Result<Self, RuleError> {
        let compiled = rules
            .iter()
            .enumerate()
            .map(|(i, rule)| CompiledRenameRule::compile(rule, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { rules: compiled })
    }

    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Applies the first matching rule to `item`, returning a renamed copy,
    /// or `None` if no rule changed anything.
    pub fn apply(&self, item: &BaseFileInfo) -> Option<BaseFileInfo> {
        for rule in &self.rules {
            if let Some(new_path) = rule.generate_new_path(item) {
                let new_name = new_path.rsplit('/').next().unwrap_or(&new_path).to_string();
                return Some(BaseFileInfo {
                    file_name: new_name,
                    file_path: new_path,
                    ..item.clone()
                });
            }
        }
        None
    }
}

fn build_regex(
    pattern: &str,
    case_sensitive: bool,
    index: usize,
    original_pattern: &str,
) -> Result<Regex, RuleError> {
    RegexBuilder::new(pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|source| RuleError::InvalidExclusionPattern {
            index,
            pattern: original_pattern.to_string(),
            source,
        })
}

/// Escapes every regex metacharacter in `pattern`, then reinstates `*` as
/// `.*` and `?` as `.`, matching the shell-glob semantics rules are
/// documented with.
fn wildcard_to_regex(pattern: &str) -> String {
    regex::escape(pattern).replace(r"\*", ".*").replace(r"\?", ".")
}

fn replace_final_component(path: &str, old_name: &str, new_name: &str) -> String {
    if path == old_name {
        return new_name.to_string();
    }
    match path.rfind('/') {
        Some(idx) => format!("{}/{}", &path[..idx], new_name),
        None => new_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, path: &str, is_folder: bool) -> BaseFileInfo {
        BaseFileInfo {
            file_id: "f1".to_string(),
            file_name: name.to_string(),
            file_path: path.to_string(),
            is_folder,
            file_size: 0,
            parent_id: "root".to_string(),
            created_at: None,
            updated_at: None,
            file_ext: Default::default(),
        }
    }

    #[test]
    fn contains_mode_is_case_insensitive_by_default() {
        let rule = ExclusionRule {
            pattern: "TMP".to_string(),
            target: RuleTarget::Name,
            item_type: ItemType::Any,
            mode: MatchMode::Contains,
            case_sensitive: false,
        };
        let compiled = CompiledExclusionRule::compile(&rule, 0).unwrap();
        assert!(compiled.matches(&file("cache.tmp", "/cache.tmp", false)));
    }

    #[test]
    fn wildcard_matches_suffix() {
        let rule = ExclusionRule {
            pattern: "*.tmp".to_string(),
            target: RuleTarget::Name,
            item_type: ItemType::Any,
            mode: MatchMode::Wildcard,
            case_sensitive: false,
        };
        let compiled = CompiledExclusionRule::compile(&rule, 0).unwrap();
        assert!(compiled.matches(&file("session.tmp", "/session.tmp", false)));
        assert!(!compiled.matches(&file("session.txt", "/session.txt", false)));
    }

    #[test]
    fn item_type_gate_excludes_folders_for_file_rules() {
        let rule = ExclusionRule {
            pattern: "node_modules".to_string(),
            target: RuleTarget::Name,
            item_type: ItemType::File,
            mode: MatchMode::Exact,
            case_sensitive: false,
        };
        let compiled = CompiledExclusionRule::compile(&rule, 0).unwrap();
        assert!(!compiled.matches(&file("node_modules", "/node_modules", true)));
    }

    #[test]
    fn extension_target_skips_folders() {
        let rule = ExclusionRule {
            pattern: "jpg".to_string(),
            target: RuleTarget::Extension,
            item_type: ItemType::Any,
            mode: MatchMode::Exact,
            case_sensitive: false,
        };
        let compiled = CompiledExclusionRule::compile(&rule, 0).unwrap();
        assert!(!compiled.matches(&file("Photos", "/Photos", true)));
        assert!(compiled.matches(&file("a.jpg", "/a.jpg", false)));
    }

    #[test]
    fn invalid_regex_reports_rule_index() {
        let rule = ExclusionRule {
            pattern: "(unterminated".to_string(),
            target: RuleTarget::Name,
            item_type: ItemType::Any,
            mode: MatchMode::Regex,
            case_sensitive: false,
        };
        let err = CompiledExclusionRule::compile(&rule, 2).unwrap_err();
        match err {
            RuleError::InvalidExclusionPattern { index, .. } => assert_eq!(index, 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rename_name_scope_rewrites_path() {
        let rule = RenameRule {
            match_regex: r"^draft_".to_string(),
            replace_string: String::new(),
            target_scope: RenameScope::Name,
            case_sensitive: false,
        };
        let compiled = CompiledRenameRule::compile(&rule, 0).unwrap();
        let renamed = compiled.generate_new_path(&file("draft_report.pdf", "/in/draft_report.pdf", false));
        assert_eq!(renamed.as_deref(), Some("/in/report.pdf"));
    }

    #[test]
    fn rename_set_stops_at_first_match() {
        let rules = vec![
            RenameRule {
                match_regex: "never".to_string(),
                replace_string: "x".to_string(),
                target_scope: RenameScope::Name,
                case_sensitive: false,
            },
            RenameRule {
                match_regex: r"\.bak$".to_string(),
                replace_string: String::new(),
                target_scope: RenameScope::Name,
                case_sensitive: false,
            },
        ];
        let set = RenameSet::compile(&rules).unwrap();
        let renamed = set.apply(&file("report.pdf.bak", "/in/report.pdf.bak", false)).unwrap();
        assert_eq!(renamed.file_name, "report.pdf");
        assert_eq!(renamed.file_path, "/in/report.pdf");
    }

    #[test]
    fn rename_set_returns_none_when_nothing_matches() {
        let set = RenameSet::empty();
        assert!(set.apply(&file("report.pdf", "/in/report.pdf", false)).is_none());
    }
}
