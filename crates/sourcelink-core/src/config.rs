use crate::error::CoreError;
use crate::links::{BugLinkExtractor, LinkPatterns};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Default tracker status/resolution codes, matching the common workflow
/// where 80 = resolved, 20 = fixed, 30 = reopened, 40+ = not fixed.
pub const STATUS_RESOLVED: i32 = 80;
pub const RESOLUTION_FIXED: i32 = 20;
pub const RESOLUTION_REOPENED: i32 = 30;
pub const RESOLUTION_NOT_FIXED_THRESHOLD: i32 = 40;
pub const ACCESS_DEVELOPER: i32 = 55;

/// Sentinel for `fixed_status`: don't set an explicit status, bump the
/// issue to the resolved threshold instead (when resolving is enabled).
pub const FIXED_STATUS_RESOLVE: i32 = -1;

pub const DEFAULT_BUGLINK_OUTER: &str =
    r"(?i)(?:bugs?|issues?|reports?)\s*:?\s*#?\d+(?:[,\.\s]+#?\d+)*";
pub const DEFAULT_BUGLINK_INNER: &str = r"(\d+)";
pub const DEFAULT_BUGFIX_OUTER: &str =
    r"(?i)(?:fix(?:e[sd])?|resolve[sd]?)\s*:?\s+(?:(?:bugs?|issues?|reports?)\s*:?\s*)?#?\d+(?:[,\.\s]+#?\d+)*";
pub const DEFAULT_BUGFIX_INNER: &str = r"(\d+)";

pub const DEFAULT_MESSAGE_TEMPLATE: &str = "Fix committed to $1 branch.";

/// Everything the resolution pipeline can be configured with.
///
/// All fields have defaults, so a partial TOML/JSON document works; an empty
/// pattern or template is a configuration error caught by [`compile`].
///
/// [`compile`]: ResolveConfig::compile
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolveConfig {
    /// Outer/inner pattern pair for plain issue references.
    pub buglink_outer: String,
    pub buglink_inner: String,
    /// Outer/inner pattern pair for fix claims.
    pub bugfix_outer: String,
    pub bugfix_inner: String,

    /// Bump issues to the resolved threshold when `fixed_status` is the
    /// resolve sentinel.
    pub enable_resolving: bool,
    /// Post a note on each fixed issue.
    pub enable_message: bool,
    /// Resolve target versions through branch mappings.
    pub enable_mapping: bool,
    /// Update the per-version status matrix instead of the issue itself.
    pub enable_product_matrix: bool,
    /// Assign the issue handler (and allow any field updates at all).
    pub assign_handler: bool,

    /// Explicit status for fixed issues; 0 = leave alone,
    /// [`FIXED_STATUS_RESOLVE`] = use the resolved threshold.
    pub fixed_status: i32,
    /// Status code written into the version matrix in product-matrix mode.
    pub fixed_status_pvm: i32,
    /// Resolution code for fixed issues.
    pub fixed_resolution: i32,

    /// Note template; $1 branch, $2 revision, $3 timestamp, $4 message,
    /// $5 repository name, $6 changeset id.
    pub message_template: String,
    /// Post notes with private visibility.
    pub note_private: bool,

    /// Minimum access level to be made handler of an issue.
    pub handle_issue_threshold: i32,
    pub resolved_threshold: i32,
    pub fixed_threshold: i32,
    pub not_fixed_threshold: i32,
    /// Resolution value meaning "reopened", which sits between the fixed and
    /// not-fixed thresholds and needs its own check.
    pub reopened_resolution: i32,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            buglink_outer: DEFAULT_BUGLINK_OUTER.into(),
            buglink_inner: DEFAULT_BUGLINK_INNER.into(),
            bugfix_outer: DEFAULT_BUGFIX_OUTER.into(),
            bugfix_inner: DEFAULT_BUGFIX_INNER.into(),
            enable_resolving: true,
            enable_message: true,
            enable_mapping: true,
            enable_product_matrix: false,
            assign_handler: true,
            fixed_status: FIXED_STATUS_RESOLVE,
            fixed_status_pvm: 0,
            fixed_resolution: RESOLUTION_FIXED,
            message_template: DEFAULT_MESSAGE_TEMPLATE.into(),
            note_private: false,
            handle_issue_threshold: ACCESS_DEVELOPER,
            resolved_threshold: STATUS_RESOLVED,
            fixed_threshold: RESOLUTION_FIXED,
            not_fixed_threshold: RESOLUTION_NOT_FIXED_THRESHOLD,
            reopened_resolution: RESOLUTION_REOPENED,
        }
    }
}

impl ResolveConfig {
    /// Validate the configuration and compile its patterns.
    pub fn compile(self) -> Result<CompiledConfig, CoreError> {
        let references = LinkPatterns::new(
            compile_pattern("buglink_outer", &self.buglink_outer)?,
            compile_pattern("buglink_inner", &self.buglink_inner)?,
        );
        let fixes = LinkPatterns::new(
            compile_pattern("bugfix_outer", &self.bugfix_outer)?,
            compile_pattern("bugfix_inner", &self.bugfix_inner)?,
        );
        if self.enable_message && self.message_template.trim().is_empty() {
            return Err(CoreError::MissingConfig("message_template"));
        }
        Ok(CompiledConfig {
            extractor: BugLinkExtractor::new(references, fixes),
            options: self,
        })
    }
}

fn compile_pattern(name: &'static str, raw: &str) -> Result<Regex, CoreError> {
    if raw.trim().is_empty() {
        return Err(CoreError::MissingConfig(name));
    }
    Regex::new(raw).map_err(|source| CoreError::InvalidPattern { name, source })
}

/// A validated configuration with its extractor ready to use.
#[derive(Debug, Clone)]
pub struct CompiledConfig {
    pub options: ResolveConfig,
    pub extractor: BugLinkExtractor,
}
