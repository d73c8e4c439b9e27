use docsweep_core::paths;
use std::path::{Path, PathBuf};

/// Resolve the repository root to scan.
///
/// Priority:
/// 1. `--root` flag / `DOCSWEEP_ROOT` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `.docsweep.yaml`
/// 3. Walk upward from `cwd` looking for `.git/`
/// 4. Fall back to `cwd`
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_root_from(&cwd)
}

fn find_upward(start: &Path, marker: impl Fn(&Path) -> bool) -> Option<PathBuf> {
    start.ancestors().find(|dir| marker(*dir)).map(Path::to_path_buf)
}

fn find_root_from(start: &Path) -> PathBuf {
    find_upward(start, |d| paths::config_path(d).is_file())
        .or_else(|| find_upward(start, |d| d.join(paths::GIT_DIR).exists()))
        .unwrap_or_else(|| start.to_path_buf())
}
