use crate::error::{DocsweepError, Result};
use crate::paths;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// CorpusConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusConfig {
    #[serde(default = "default_include")]
    pub include: Vec<String>,
    #[serde(default = "default_exclude")]
    pub exclude: Vec<String>,
    /// Directory names pruned during the walk, at any depth.
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_include() -> Vec<String> {
    vec![
        "**/*.md".to_string(),
        "**/*.markdown".to_string(),
        "**/*.mdx".to_string(),
    ]
}

fn default_exclude() -> Vec<String> {
    vec![
        ".git/**".to_string(),
        "target/**".to_string(),
        "node_modules/**".to_string(),
        "vendor/**".to_string(),
    ]
}

fn default_skip_dirs() -> Vec<String> {
    vec![
        ".git".to_string(),
        "target".to_string(),
        "node_modules".to_string(),
        ".venv".to_string(),
        "__pycache__".to_string(),
    ]
}

fn default_max_file_size() -> u64 {
    1024 * 1024
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            include: default_include(),
            exclude: default_exclude(),
            skip_dirs: default_skip_dirs(),
            max_file_size: default_max_file_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// LinkConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_true")]
    pub check_anchors: bool,
    /// Globs matched against the raw link target; matching links are skipped.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            check_anchors: true,
            ignore: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// DuplicateConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateConfig {
    #[serde(default = "default_shingle_size")]
    pub shingle_size: usize,
    #[serde(default = "default_num_hashes")]
    pub num_hashes: usize,
    #[serde(default = "default_bands")]
    pub bands: usize,
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
}

fn default_shingle_size() -> usize {
    5
}

fn default_num_hashes() -> usize {
    128
}

fn default_bands() -> usize {
    32
}

fn default_threshold() -> f64 {
    0.8
}

fn default_min_words() -> usize {
    12
}

impl Default for DuplicateConfig {
    fn default() -> Self {
        Self {
            shingle_size: default_shingle_size(),
            num_hashes: default_num_hashes(),
            bands: default_bands(),
            threshold: default_threshold(),
            min_words: default_min_words(),
        }
    }
}

impl DuplicateConfig {
    pub fn rows_per_band(&self) -> usize {
        if self.bands == 0 {
            0
        } else {
            self.num_hashes / self.bands
        }
    }
}

// ---------------------------------------------------------------------------
// StalenessConfig
// ---------------------------------------------------------------------------

/// Explicit doc → source correlation, for code the docs never name by path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMapping {
    pub docs: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StalenessConfig {
    #[serde(default)]
    pub min_lag_days: u32,
    #[serde(default = "default_true")]
    pub detect_mentions: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<SourceMapping>,
}

impl Default for StalenessConfig {
    fn default() -> Self {
        Self {
            min_lag_days: 0,
            detect_mentions: true,
            mappings: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub corpus: CorpusConfig,
    /// Entry documents; everything reachable from them via links is kept.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// Globs that are never reported as prune candidates.
    #[serde(default = "default_protected")]
    pub protected: Vec<String>,
    #[serde(default)]
    pub links: LinkConfig,
    #[serde(default)]
    pub duplicates: DuplicateConfig,
    #[serde(default)]
    pub staleness: StalenessConfig,
}

fn default_version() -> u32 {
    1
}

fn default_roots() -> Vec<String> {
    vec![
        "README.md".to_string(),
        "docs/README.md".to_string(),
        "docs/index.md".to_string(),
    ]
}

fn default_protected() -> Vec<String> {
    vec![
        "**/README.md".to_string(),
        "CHANGELOG.md".to_string(),
        "LICENSE*".to_string(),
        "CONTRIBUTING.md".to_string(),
        "SECURITY.md".to_string(),
        "CODE_OF_CONDUCT.md".to_string(),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            corpus: CorpusConfig::default(),
            roots: default_roots(),
            protected: default_protected(),
            links: LinkConfig::default(),
            duplicates: DuplicateConfig::default(),
            staleness: StalenessConfig::default(),
        }
    }
}

impl Config {
    /// Load `.docsweep.yaml` from `root`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load an explicitly named config file; a missing file is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DocsweepError::ConfigNotFound(path.display().to_string()));
        }
        let data = std::fs::read_to_string(path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    pub fn protected_set(&self) -> Result<GlobSet> {
        compile_globs(&self.protected)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self, root: &Path) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        // 1. Every glob must compile
        let glob_lists: [(&str, &[String]); 4] = [
            ("corpus.include", &self.corpus.include),
            ("corpus.exclude", &self.corpus.exclude),
            ("protected", &self.protected),
            ("links.ignore", &self.links.ignore),
        ];
        for (field, patterns) in glob_lists {
            for pattern in patterns {
                if let Err(e) = Glob::new(pattern) {
                    warnings.push(error(format!("invalid glob '{pattern}' in {field}: {e}")));
                }
            }
        }
        for mapping in &self.staleness.mappings {
            for pattern in std::iter::once(&mapping.docs).chain(mapping.sources.iter()) {
                if let Err(e) = Glob::new(pattern) {
                    warnings.push(error(format!(
                        "invalid glob '{pattern}' in staleness.mappings: {e}"
                    )));
                }
            }
            if mapping.sources.is_empty() {
                warnings.push(warning(format!(
                    "staleness mapping for '{}' has no sources",
                    mapping.docs
                )));
            }
        }

        if self.corpus.include.is_empty() {
            warnings.push(error("corpus.include is empty: no documents would be scanned"));
        }

        // 2. Duplicate detector parameters
        let d = &self.duplicates;
        if !(d.threshold > 0.0 && d.threshold <= 1.0) {
            warnings.push(error(format!(
                "duplicates.threshold={} must be in (0, 1]",
                d.threshold
            )));
        }
        if d.shingle_size == 0 {
            warnings.push(error("duplicates.shingle_size must be at least 1"));
        }
        if d.bands == 0 || d.num_hashes == 0 || d.num_hashes % d.bands != 0 {
            warnings.push(error(format!(
                "duplicates.num_hashes={} must be a positive multiple of duplicates.bands={}",
                d.num_hashes, d.bands
            )));
        }

        // 3. Roots should exist, otherwise orphan detection degrades
        if !self.roots.is_empty() && !self.roots.iter().any(|r| root.join(r).is_file()) {
            warnings.push(warning(format!(
                "none of the configured roots exist ({}); orphans fall back to inbound-link counting",
                self.roots.join(", ")
            )));
        }

        warnings
    }
}

fn warning(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Warning,
        message: message.into(),
    }
}

fn error(message: impl Into<String>) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Error,
        message: message.into(),
    }
}

/// Compile a list of glob patterns into a single matcher.
pub fn compile_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
