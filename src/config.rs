//! Persistent command-line defaults.
//!
//! A config file is a list of flag tokens, one or more per line, `#`
//! starting a comment. The global file lives in the platform config
//! directory; a `.codeplayrc` in the working directory overrides it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

const APP_DIR: &str = "codeplay";
const LOCAL_FILE: &str = ".codeplayrc";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigFlags {
    pub watch: bool,
    pub fast_forward: bool,
    pub perf: bool,
    pub headless: bool,
    pub locale: Option<String>,
    pub trace_log: Option<PathBuf>,
    pub texts: Option<PathBuf>,
}

impl ConfigFlags {
    /// Merge with `other`; switches add up, `other`'s values win.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            watch: self.watch || other.watch,
            fast_forward: self.fast_forward || other.fast_forward,
            perf: self.perf || other.perf,
            headless: self.headless || other.headless,
            locale: other.locale.clone().or_else(|| self.locale.clone()),
            trace_log: other.trace_log.clone().or_else(|| self.trace_log.clone()),
            texts: other.texts.clone().or_else(|| self.texts.clone()),
        }
    }

    /// The flags as tokens, in the form [`parse_flag_tokens`] reads back.
    pub fn to_tokens(&self) -> Vec<String> {
        let switches = [
            (self.watch, "--watch"),
            (self.fast_forward, "--fast-forward"),
            (self.perf, "--perf"),
            (self.headless, "--headless"),
        ];
        let mut tokens: Vec<String> = switches
            .into_iter()
            .filter(|&(on, _)| on)
            .map(|(_, flag)| flag.to_string())
            .collect();
        if let Some(locale) = &self.locale {
            tokens.push(format!("--locale={locale}"));
        }
        if let Some(path) = &self.trace_log {
            tokens.push(format!("--trace-log={}", path.display()));
        }
        if let Some(path) = &self.texts {
            tokens.push(format!("--texts={}", path.display()));
        }
        tokens
    }
}

pub fn global_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join(APP_DIR).join("config");
        }
    }

    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join(APP_DIR)
                .join("config");
        }
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
            return PathBuf::from(xdg).join(APP_DIR).join("config");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".config").join(APP_DIR).join("config");
        }
    }

    local_override_path()
}

pub fn local_override_path() -> PathBuf {
    PathBuf::from(LOCAL_FILE)
}

pub fn load_config_flags(path: &Path) -> Result<ConfigFlags> {
    if !path.exists() {
        return Ok(ConfigFlags::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let tokens = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .flat_map(|line| line.split_whitespace().map(ToOwned::to_owned))
        .collect::<Vec<_>>();
    Ok(parse_flag_tokens(&tokens))
}

pub fn save_config_flags(path: &Path, flags: &ConfigFlags) -> Result<()> {
    let mut lines = vec!["# codeplay defaults (saved with --save)".to_string()];
    lines.extend(flags.to_tokens());
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config dir {}", parent.display()))?;
    }
    fs::write(path, format!("{}\n", lines.join("\n")))
        .with_context(|| format!("Failed to write config {}", path.display()))
}

pub fn clear_config_flags(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_file(path).with_context(|| format!("Failed to remove {}", path.display()))?;
    }
    Ok(())
}

/// Pick the known flags out of `tokens`. Anything else is ignored.
pub fn parse_flag_tokens(tokens: &[String]) -> ConfigFlags {
    let mut flags = ConfigFlags::default();
    let mut rest = tokens.iter();
    while let Some(token) = rest.next() {
        let (name, inline) = match token.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (token.as_str(), None),
        };
        match name {
            "--watch" => flags.watch = true,
            "--fast-forward" => flags.fast_forward = true,
            "--perf" => flags.perf = true,
            "--headless" => flags.headless = true,
            "--locale" | "--trace-log" | "--texts" => {
                let Some(value) = inline.or_else(|| rest.next().cloned()) else {
                    continue;
                };
                match name {
                    "--locale" => flags.locale = Some(value),
                    "--trace-log" => flags.trace_log = Some(PathBuf::from(value)),
                    _ => flags.texts = Some(PathBuf::from(value)),
                }
            }
            _ => {}
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn tokens(args: &[&str]) -> Vec<String> {
        args.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_flag_tokens_extracts_known_flags() {
        let flags = parse_flag_tokens(&tokens(&[
            "codeplay",
            "--watch",
            "--fast-forward",
            "--locale",
            "ru",
            "--trace-log=trace.log",
            "--texts",
            "ru.json5",
            "lesson.json5",
        ]));
        assert!(flags.watch);
        assert!(flags.fast_forward);
        assert!(!flags.headless);
        assert_eq!(flags.locale.as_deref(), Some("ru"));
        assert_eq!(flags.trace_log, Some(PathBuf::from("trace.log")));
        assert_eq!(flags.texts, Some(PathBuf::from("ru.json5")));
    }

    #[test]
    fn test_dangling_value_flag_is_ignored() {
        let flags = parse_flag_tokens(&tokens(&["--perf", "--locale"]));
        assert!(flags.perf);
        assert_eq!(flags.locale, None);
    }

    #[test]
    fn test_config_union_merges_cli_over_file_for_options() {
        let file = ConfigFlags {
            watch: true,
            locale: Some("en".into()),
            ..ConfigFlags::default()
        };
        let cli = ConfigFlags {
            headless: true,
            locale: Some("ru".into()),
            ..ConfigFlags::default()
        };
        let merged = file.union(&cli);
        assert!(merged.watch);
        assert!(merged.headless);
        assert_eq!(merged.locale.as_deref(), Some("ru"));
    }

    #[test]
    fn test_save_load_and_clear_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(LOCAL_FILE);
        let flags = ConfigFlags {
            watch: true,
            fast_forward: true,
            perf: true,
            headless: true,
            locale: Some("ru".into()),
            trace_log: Some(PathBuf::from("trace.log")),
            texts: Some(PathBuf::from("texts.json5")),
        };

        save_config_flags(&path, &flags).unwrap();
        assert_eq!(load_config_flags(&path).unwrap(), flags);

        clear_config_flags(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(load_config_flags(&path).unwrap(), ConfigFlags::default());
    }
}
