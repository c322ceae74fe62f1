//! Line-oriented `key = value` reader for Enzo parameter files.
//!
//! All knowledge of the parameter/checkpoint text format lives here. The parser
//! is tolerant: lines without `=` are ignored, `#` starts a comment, and keys and
//! values are trimmed. Anything it cannot make sense of is skipped, never fatal.

use std::collections::HashMap;
use std::path::Path;

use crate::error::FraggleError;

/// Phrase Enzo writes into the parameter file of an interpolated output.
pub const INTERPOLATED_MARKER: &str = "WARNING! Interpolated output";

/// Split one line into `(key, value)`, or `None` if it is not an assignment.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let content = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let (key, value) = content.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Key/value pairs read from a parameter file. Later assignments win.
#[derive(Debug, Clone, Default)]
pub struct ParameterMap {
    values: HashMap<String, String>,
}

impl ParameterMap {
    pub fn parse(text: &str) -> Self {
        let values = text
            .lines()
            .filter_map(parse_line)
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { values }
    }

    pub fn read(path: &Path) -> Result<Self, FraggleError> {
        let text = read_lossy(path)?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Non-empty value of `key`, or `default`.
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.get(key) {
            Some(v) if !v.is_empty() => v,
            _ => default,
        }
    }
}

/// Read a text file, replacing invalid UTF-8 rather than failing on it.
pub fn read_lossy(path: &Path) -> Result<String, FraggleError> {
    let bytes = std::fs::read(path).map_err(|e| FraggleError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Rewrite every assignment of `key` in `text`, keeping all other lines intact.
pub fn replace_value(text: &str, key: &str, value: &str) -> String {
    let mut out: Vec<String> = text
        .lines()
        .map(|line| match parse_line(line) {
            Some((k, _)) if k == key => format!("{key} = {value}"),
            _ => line.to_string(),
        })
        .collect();
    if text.ends_with('\n') {
        out.push(String::new());
    }
    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_and_skips_noise() {
        let map = ParameterMap::parse(
            "# header\nDataDumpDir   = out/DD  \nno equals here\n = orphan\nInitialTime = 1.5 # code units\n",
        );
        assert_eq!(map.get("DataDumpDir"), Some("out/DD"));
        assert_eq!(map.get("InitialTime"), Some("1.5"));
        assert_eq!(map.get("no equals here"), None);
        assert_eq!(map.get(""), None);
    }

    #[test]
    fn empty_value_falls_back_to_default() {
        let map = ParameterMap::parse("DataDumpName =\n");
        assert_eq!(map.get_or("DataDumpName", "DD"), "DD");
        assert_eq!(map.get_or("RedshiftDumpName", "RD"), "RD");
    }

    #[test]
    fn replace_value_touches_only_the_key() {
        let text = "dtDataDump = 2.0\nStopTime = 10\n";
        let out = replace_value(text, "dtDataDump", "1");
        assert_eq!(out, "dtDataDump = 1\nStopTime = 10\n");
    }
}
