//! Path helpers: home directory lookup, `~` expansion, absolute normalization.

use std::env;
use std::path::{Component, Path, PathBuf};

/// The user's home directory, falling back to `/tmp` when `HOME` is unset.
pub fn home_dir() -> PathBuf {
    env::var_os("HOME")
        .filter(|raw| !raw.is_empty())
        .map_or_else(
            || {
                eprintln!("[TMP-CONFIG] WARNING: HOME not set, falling back to /tmp");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        )
}

/// Default watched directory: the desktop under the home directory.
pub fn default_watch_dir() -> PathBuf {
    home_dir().join("Desktop")
}

/// Expand a leading `~` or `~/` to the home directory. Other paths are returned as-is.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => home_dir().join(components.as_path()),
        _ => path.to_path_buf(),
    }
}

/// Resolve a path to an absolute, normalized path.
///
/// Uses `fs::canonicalize` when the path exists so symlinks are resolved;
/// otherwise joins onto the current directory and folds `.`/`..` syntactically.
pub fn resolve_absolute_path(path: &Path) -> PathBuf {
    let expanded = expand_tilde(path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        env::current_dir().map_or_else(|_| expanded.clone(), |cwd| cwd.join(&expanded))
    };

    std::fs::canonicalize(&absolute).unwrap_or_else(|_| fold_dots(&absolute))
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut kept: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(kept.last(), Some(Component::Normal(_))) {
                    kept.pop();
                }
            }
            other => kept.push(other),
        }
    }
    kept.into_iter().collect()
}
