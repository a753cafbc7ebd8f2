//! Pathname Expansion
//!
//! Expands a glob pattern against the filesystem, relative to the runner's
//! working directory (never the process's). Results come back sorted and
//! spelled the way the pattern spelled them: `*.txt` yields `a.txt`, not an
//! absolute path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::shell::pattern::{has_glob_chars, unescape_glob, Pattern, PatternOptions};

#[derive(Debug, Clone, Copy, Default)]
pub struct GlobOptions {
    pub dotglob: bool,
    pub nocaseglob: bool,
    pub extglob: bool,
    pub globstar: bool,
}

/// A match in progress: what to print, and where it is on disk.
#[derive(Debug, Clone)]
struct Candidate {
    display: String,
    path: PathBuf,
}

impl Candidate {
    fn join(&self, name: &str) -> Candidate {
        let display = if self.display.is_empty() {
            name.to_string()
        } else if self.display.ends_with('/') {
            format!("{}{}", self.display, name)
        } else {
            format!("{}/{}", self.display, name)
        };
        Candidate { display, path: self.path.join(name) }
    }
}

/// Split on `/`, keeping escapes intact.
fn split_components(pattern: &str) -> Vec<&str> {
    pattern.split('/').collect()
}

fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Hidden entries only match when the pattern itself starts with a dot.
fn visible(name: &str, component: &str, dotglob: bool) -> bool {
    !name.starts_with('.') || component.starts_with('.') || component.starts_with("\\.") || dotglob
}

/// Every directory below `start` (including `start`), skipping hidden ones.
fn walk_dirs(start: &Candidate, dotglob: bool, out: &mut Vec<Candidate>) {
    out.push(start.clone());
    for name in list_dir(&start.path) {
        if name.starts_with('.') && !dotglob {
            continue;
        }
        let child = start.join(&name);
        let is_link = fs::symlink_metadata(&child.path).map(|m| m.file_type().is_symlink()).unwrap_or(false);
        if !is_link && is_dir(&child.path) {
            walk_dirs(&child, dotglob, out);
        }
    }
}

/// Expand `pattern`. An empty result means no match; the caller decides
/// between passing the word through, dropping it, or failing.
pub fn expand_glob(pattern: &str, cwd: &Path, options: GlobOptions) -> Vec<String> {
    let (root, rest) = match pattern.strip_prefix('/') {
        Some(rest) => (Candidate { display: "/".to_string(), path: PathBuf::from("/") }, rest),
        None => (Candidate { display: String::new(), path: cwd.to_path_buf() }, pattern),
    };
    let dirs_only = rest.ends_with('/');
    let rest = rest.trim_end_matches('/');
    let components: Vec<&str> = split_components(rest).into_iter().filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Vec::new();
    }

    let pattern_options = PatternOptions { extglob: options.extglob, nocase: options.nocaseglob };
    let mut candidates = vec![root];

    for (index, component) in components.iter().enumerate() {
        let last = index + 1 == components.len();
        let mut next = Vec::new();

        if options.globstar && *component == "**" {
            for candidate in &candidates {
                let mut dirs = Vec::new();
                walk_dirs(candidate, options.dotglob, &mut dirs);
                if last {
                    // Trailing `**` matches files as well as directories.
                    for dir in dirs {
                        for name in list_dir(&dir.path) {
                            if name.starts_with('.') && !options.dotglob {
                                continue;
                            }
                            let child = dir.join(&name);
                            if !is_dir(&child.path) {
                                next.push(child);
                            }
                        }
                        if !dir.display.is_empty() {
                            next.push(dir);
                        }
                    }
                } else {
                    next.extend(dirs);
                }
            }
        } else if !has_glob_chars(component, options.extglob) {
            let name = unescape_glob(component);
            for candidate in &candidates {
                let child = candidate.join(&name);
                if (last && exists(&child.path)) || (!last && is_dir(&child.path)) {
                    next.push(child);
                }
            }
        } else {
            let matcher = Pattern::new(component, pattern_options);
            for candidate in &candidates {
                for name in list_dir(&candidate.path) {
                    if !visible(&name, component, options.dotglob) || !matcher.is_match(&name) {
                        continue;
                    }
                    let child = candidate.join(&name);
                    if last || is_dir(&child.path) {
                        next.push(child);
                    }
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            return Vec::new();
        }
    }

    let mut results: Vec<String> = candidates
        .into_iter()
        .filter(|c| !dirs_only || is_dir(&c.path))
        .map(|c| if dirs_only { format!("{}/", c.display) } else { c.display })
        .collect();
    results.sort();
    results.dedup();
    results
}
