use crate::error::ScrapeError;
use scraper::Selector as CssSelector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Language a selector path is written in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorLanguage {
    #[default]
    Css,
    Xpath,
    Jsonld,
    Js,
}

impl fmt::Display for SelectorLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SelectorLanguage::Css => "css",
            SelectorLanguage::Xpath => "xpath",
            SelectorLanguage::Jsonld => "jsonld",
            SelectorLanguage::Js => "js",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorStatus {
    Valid,
    Invalid,
}

/// An extraction rule: a locator expression identifying one element of a page.
///
/// `status` is either absent or matches the current `path`; changing the path
/// clears it until the selector is validated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selector {
    #[serde(default)]
    path: String,

    #[serde(default)]
    language: SelectorLanguage,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<SelectorStatus>,
}

impl Selector {
    pub fn new(path: impl Into<String>, language: SelectorLanguage) -> Self {
        Self {
            path: path.into(),
            language,
            status: None,
        }
    }

    /// A CSS selector, the default language
    pub fn css(path: impl Into<String>) -> Self {
        Self::new(path, SelectorLanguage::Css)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> SelectorLanguage {
        self.language
    }

    pub fn status(&self) -> Option<SelectorStatus> {
        self.status
    }

    pub fn is_blank(&self) -> bool {
        self.path.trim().is_empty()
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if path != self.path {
            self.path = path;
            self.status = None;
        }
    }

    fn with_status(mut self, status: SelectorStatus) -> Self {
        self.status = Some(status);
        self
    }
}

/// Verdict of a [`SyntaxChecker`]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyntaxReport {
    pub valid: bool,
    pub diagnostics: Vec<String>,
}

impl SyntaxReport {
    fn invalid(diagnostic: impl Into<String>) -> Self {
        Self {
            valid: false,
            diagnostics: vec![diagnostic.into()],
        }
    }
}

/// Checks the syntax of a stylesheet rule
pub trait SyntaxChecker: Send + Sync {
    fn check_rule(&self, rule: &str) -> SyntaxReport;
}

/// Accepts exactly one rule with an empty declaration block whose prelude
/// parses as a selector list.
#[derive(Debug, Clone, Copy, Default)]
pub struct CssRuleChecker;

impl SyntaxChecker for CssRuleChecker {
    fn check_rule(&self, rule: &str) -> SyntaxReport {
        let rule = rule.trim();
        let Some(open) = rule.rfind('{') else {
            return SyntaxReport::invalid("missing declaration block");
        };
        if rule[open + 1..].trim() != "}" {
            return SyntaxReport::invalid("declaration block must be empty");
        }

        let prelude = rule[..open].trim();
        if prelude.is_empty() {
            return SyntaxReport::invalid("empty selector");
        }

        match CssSelector::parse(prelude) {
            Ok(_) => SyntaxReport {
                valid: true,
                diagnostics: Vec::new(),
            },
            Err(e) => SyntaxReport::invalid(format!("error parsing '{}': {}", prelude, e)),
        }
    }
}

/// Result of validating a [`Selector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectorValidity {
    pub selector: Selector,
    pub diagnostics: Vec<String>,
}

/// Page-independent syntax check of selector paths
#[derive(Clone)]
pub struct SelectorSyntaxValidator {
    checker: Arc<dyn SyntaxChecker>,
}

impl Default for SelectorSyntaxValidator {
    fn default() -> Self {
        Self::new(Arc::new(CssRuleChecker))
    }
}

impl fmt::Debug for SelectorSyntaxValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectorSyntaxValidator").finish_non_exhaustive()
    }
}

impl SelectorSyntaxValidator {
    pub fn new(checker: Arc<dyn SyntaxChecker>) -> Self {
        Self { checker }
    }

    /// Runs the checker on `path` wrapped as a blank rule
    pub fn check(&self, path: &str) -> SyntaxReport {
        if path.trim().is_empty() {
            return SyntaxReport::invalid("blank selector");
        }
        // the checker validates rules, not bare selectors
        let report = self.checker.check_rule(&format!("{} {{}}", path));
        ::log::debug!("validated selector '{}': {}", path, report.valid);
        report
    }

    pub fn validate(&self, path: &str) -> SelectorStatus {
        if self.check(path).valid {
            SelectorStatus::Valid
        } else {
            SelectorStatus::Invalid
        }
    }

    /// Recomputes the selector's status, ignoring whatever status it carried
    pub fn validate_selector(&self, selector: &Selector) -> Result<SelectorValidity, ScrapeError> {
        if selector.language() != SelectorLanguage::Css {
            return Err(ScrapeError::UnsupportedLanguage(
                selector.language().to_string(),
            ));
        }

        let report = self.check(selector.path());
        let status = if report.valid {
            SelectorStatus::Valid
        } else {
            SelectorStatus::Invalid
        };
        Ok(SelectorValidity {
            selector: selector.clone().with_status(status),
            diagnostics: report.diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_path_is_invalid() {
        let validator = SelectorSyntaxValidator::default();
        assert_eq!(validator.validate("1"), SelectorStatus::Invalid);
    }

    #[test]
    fn test_class_path_is_valid() {
        let validator = SelectorSyntaxValidator::default();
        assert_eq!(validator.validate(".valid-class"), SelectorStatus::Valid);
        assert_eq!(validator.validate("div > p.lead, #main a[href]"), SelectorStatus::Valid);
    }

    #[test]
    fn test_blank_path_is_invalid_not_an_error() {
        let validator = SelectorSyntaxValidator::default();
        assert_eq!(validator.validate(""), SelectorStatus::Invalid);
        assert_eq!(validator.validate("   "), SelectorStatus::Invalid);
    }

    #[test]
    fn test_path_cannot_smuggle_a_second_rule() {
        let validator = SelectorSyntaxValidator::default();
        assert_eq!(validator.validate(".a {} .b"), SelectorStatus::Invalid);
        assert_eq!(validator.validate(".a { color: red; }"), SelectorStatus::Invalid);
    }

    #[test]
    fn test_braces_inside_attribute_values() {
        let validator = SelectorSyntaxValidator::default();
        assert_eq!(validator.validate("[title=\"{x}\"]"), SelectorStatus::Valid);
    }

    #[test]
    fn test_diagnostics_only_when_invalid() {
        let validator = SelectorSyntaxValidator::default();
        assert!(validator.check(".ok").diagnostics.is_empty());
        assert!(!validator.check("??").diagnostics.is_empty());
    }

    #[test]
    fn test_validate_selector_recomputes_stale_status() {
        let validator = SelectorSyntaxValidator::default();
        let stale: Selector =
            serde_json::from_str(r#"{"path": "1", "status": "valid"}"#).unwrap();
        assert_eq!(stale.language(), SelectorLanguage::Css);

        let validity = validator.validate_selector(&stale).unwrap();
        assert_eq!(validity.selector.status(), Some(SelectorStatus::Invalid));
        assert!(!validity.diagnostics.is_empty());
    }

    #[test]
    fn test_validate_selector_rejects_other_languages() {
        let validator = SelectorSyntaxValidator::default();
        let xpath = Selector::new("//div", SelectorLanguage::Xpath);
        let err = validator.validate_selector(&xpath).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported language xpath, only CSS is currently supported"
        );
    }

    #[test]
    fn test_set_path_clears_status() {
        let validator = SelectorSyntaxValidator::default();
        let mut selector = validator
            .validate_selector(&Selector::css(".a"))
            .unwrap()
            .selector;
        assert_eq!(selector.status(), Some(SelectorStatus::Valid));

        selector.set_path(".a");
        assert_eq!(selector.status(), Some(SelectorStatus::Valid));

        selector.set_path("1");
        assert_eq!(selector.status(), None);
    }

    #[test]
    fn test_custom_checker_receives_wrapped_rule() {
        struct Recording;
        impl SyntaxChecker for Recording {
            fn check_rule(&self, rule: &str) -> SyntaxReport {
                SyntaxReport {
                    valid: rule == ".x {}",
                    diagnostics: Vec::new(),
                }
            }
        }

        let validator = SelectorSyntaxValidator::new(Arc::new(Recording));
        assert_eq!(validator.validate(".x"), SelectorStatus::Valid);
        assert_eq!(validator.validate(".y"), SelectorStatus::Invalid);
    }
}
