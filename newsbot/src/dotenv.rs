//! `.env` and `.env.<profile>` loading
//!
//! The base file never overrides variables already set in the process. A
//! profile file fills unset variables and overrides keys that came from the
//! base file; with `NEWSBOT_DOTENV_OVERRIDE=true` it overrides everything.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

const BASE_FILE: &str = ".env";

/// What was loaded, reported once logging is up
#[derive(Debug, Default)]
pub struct DotenvReport {
    pub base_loaded: bool,
    pub profile_path: Option<PathBuf>,
    pub profile_loaded: bool,
    pub warnings: Vec<String>,
}

pub fn load(profile: Option<&str>) -> DotenvReport {
    let mut report = DotenvReport::default();

    let base = read_file(Path::new(BASE_FILE), &mut report.warnings);
    report.base_loaded = !base.is_empty();
    let base_keys: HashSet<String> = base.iter().map(|(key, _)| key.clone()).collect();
    apply(select(base, &HashSet::new(), false, is_set));

    if let Some(profile) = profile {
        if std::env::var_os("NEWSBOT_PROFILE").is_none() {
            std::env::set_var("NEWSBOT_PROFILE", profile);
        }

        let path = PathBuf::from(format!("{}.{}", BASE_FILE, profile));
        if path.exists() {
            let override_all = std::env::var("NEWSBOT_DOTENV_OVERRIDE")
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(false);
            let values = read_file(&path, &mut report.warnings);
            apply(select(values, &base_keys, override_all, is_set));
            report.profile_loaded = true;
        }
        report.profile_path = Some(path);
    }

    report
}

/// Entries from a dotenv file; a missing file is simply empty
fn read_file(path: &Path, warnings: &mut Vec<String>) -> Vec<(String, String)> {
    if !path.exists() {
        return Vec::new();
    }

    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter
            .filter_map(|item| match item {
                Ok(pair) => Some(pair),
                Err(e) => {
                    warnings.push(format!("Skipping line in {}: {}", path.display(), e));
                    None
                }
            })
            .collect(),
        Err(e) => {
            warnings.push(format!("Failed to load {}: {}", path.display(), e));
            Vec::new()
        }
    }
}

/// Pick the entries that should be written to the environment
pub fn select<F>(
    values: Vec<(String, String)>,
    override_keys: &HashSet<String>,
    override_all: bool,
    is_set: F,
) -> Vec<(String, String)>
where
    F: Fn(&str) -> bool,
{
    values
        .into_iter()
        .filter(|(key, _)| override_all || override_keys.contains(key) || !is_set(key))
        .collect()
}

fn is_set(key: &str) -> bool {
    std::env::var_os(key).is_some()
}

fn apply(values: Vec<(String, String)>) {
    for (key, value) in values {
        std::env::set_var(key, value);
    }
}
