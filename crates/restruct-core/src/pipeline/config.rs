use crate::error::CoreError;

/// Configuration for debug dumps during the pipeline.
///
/// When enabled, dumps the input CFG and/or the raw structured tree to
/// stderr. An optional function filter restricts output to matching
/// functions (see [`DebugConfig::should_dump`] for matching rules).
#[derive(Debug, Clone, Default)]
pub struct DebugConfig {
    /// Dump each function's CFG before structuring.
    pub dump_cfg: bool,
    /// Dump the structured tree before cleanup passes run.
    pub dump_tree: bool,
    /// Filter dumps to functions whose name matches this string.
    pub function_filter: Option<String>,
}

impl DebugConfig {
    /// A config with all dumps disabled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns `true` if no filter is set, or if the function name matches
    /// the filter under any of these strategies (tried in order):
    ///
    /// 1. **Case-sensitive substring**: `"step"` matches `"Player::step_2"`.
    /// 2. **Case-insensitive substring**: `"STEP"` matches `"Player::step_2"`.
    /// 3. **Split-part matching**: if the filter contains `.` or `::`, split
    ///    on those separators and require every part to appear in the name
    ///    case-insensitively, so `"player.step"` matches `"Player::step_2"`.
    pub fn should_dump(&self, func_name: &str) -> bool {
        let Some(filter) = self.function_filter.as_deref() else {
            return true;
        };

        if func_name.contains(filter) {
            return true;
        }

        let name_lower = func_name.to_lowercase();
        if name_lower.contains(&filter.to_lowercase()) {
            return true;
        }

        if filter.contains('.') || filter.contains("::") {
            let parts: Vec<String> = filter
                .split(['.', ':'])
                .filter(|p| !p.is_empty())
                .map(str::to_lowercase)
                .collect();
            if !parts.is_empty() && parts.iter().all(|p| name_lower.contains(p.as_str())) {
                return true;
            }
        }

        false
    }
}

/// Which cleanup passes to run on the structured tree.
///
/// All passes are enabled by default. Disable individual passes by setting
/// their fields to `false`, or use `from_skip_list` with pass names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassConfig {
    pub fold_if_breaks: bool,
    pub elide_trailing_breaks: bool,
    pub flatten_unused_blocks: bool,
    pub simplify_ifs: bool,
    /// Repeat all passes until none report changes.
    pub fixpoint: bool,
}

/// Pass names accepted by `--skip-pass`, in pipeline order.
pub const VALID_PASS_NAMES: &[&str] = &[
    "fold-if-breaks",
    "elide-trailing-breaks",
    "flatten-unused-blocks",
    "simplify-ifs",
    "fixpoint",
];

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            fold_if_breaks: true,
            elide_trailing_breaks: true,
            flatten_unused_blocks: true,
            simplify_ifs: true,
            fixpoint: true,
        }
    }
}

impl PassConfig {
    /// No cleanup at all: the tree exactly as synthesized.
    pub fn none() -> Self {
        Self {
            fold_if_breaks: false,
            elide_trailing_breaks: false,
            flatten_unused_blocks: false,
            simplify_ifs: false,
            fixpoint: false,
        }
    }

    /// All passes enabled except those in the skip list.
    pub fn from_skip_list(skip: &[&str]) -> Result<Self, CoreError> {
        let mut config = Self::default();
        config.skip(skip)?;
        Ok(config)
    }

    fn skip(&mut self, names: &[&str]) -> Result<(), CoreError> {
        for name in names {
            match *name {
                "fold-if-breaks" => self.fold_if_breaks = false,
                "elide-trailing-breaks" => self.elide_trailing_breaks = false,
                "flatten-unused-blocks" => self.flatten_unused_blocks = false,
                "simplify-ifs" => self.simplify_ifs = false,
                "fixpoint" => self.fixpoint = false,
                other => return Err(CoreError::UnknownPass(other.to_string())),
            }
        }
        Ok(())
    }
}

/// A named pass configuration.
///
/// - **`literal`**: the synthesized tree as is. Every jump and wrapper
///   block stays explicit.
/// - **`optimized`** (default): all cleanup passes, to a fixpoint.
pub struct Preset;

impl Preset {
    pub const NAMES: &'static [&'static str] = &["literal", "optimized"];

    /// Resolve a preset name, then apply `skip_passes` on top of it.
    pub fn resolve(name: &str, skip_passes: &[&str]) -> Result<PassConfig, CoreError> {
        let mut config = match name {
            "literal" => PassConfig::none(),
            "optimized" => PassConfig::default(),
            other => return Err(CoreError::UnknownPreset(other.to_string())),
        };
        config.skip(skip_passes)?;
        Ok(config)
    }
}
