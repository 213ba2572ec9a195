//! `.properties` file source.
//!
//! Every key has the form `group.name`; the key is split on its last dot,
//! so `db.primary.url = ...` lands in group `db.primary` as field `url`.
//! All records are enabled and carry the file's modification time.

use crate::loader::{modified_time, read_source, Loader, LoaderError};
use crate::record::Record;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct PropertiesLoader {
    path: PathBuf,
}

impl PropertiesLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn parse_error(&self, line: usize, message: String) -> LoaderError {
        LoaderError::Parse {
            path: self.path.clone(),
            line,
            message,
        }
    }
}

impl Loader for PropertiesLoader {
    fn load(&self) -> Result<Vec<Record>, LoaderError> {
        let text = read_source(&self.path)?;
        let update_time = modified_time(&self.path);

        let entries = parse(&text).map_err(|(line, message)| self.parse_error(line, message))?;

        let mut records = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some((group, name)) = entry.key.rsplit_once('.') else {
                return Err(self.parse_error(
                    entry.line,
                    format!("key `{}` has no group prefix", entry.key),
                ));
            };
            if group.is_empty() || name.is_empty() {
                return Err(self.parse_error(
                    entry.line,
                    format!("key `{}` needs both a group and a name", entry.key),
                ));
            }

            let mut record = Record::new(group, name, entry.value);
            record.update_time = update_time;
            records.push(record);
        }

        tracing::trace!(path = %self.path.display(), size = records.len(), "Loaded properties");
        Ok(records)
    }

    fn describe(&self) -> String {
        format!("properties:{}", self.path.display())
    }
}

#[derive(Debug, PartialEq, Eq)]
struct Entry {
    line: usize,
    key: String,
    value: String,
}

/// Parse properties text into entries, in file order.
///
/// A repeated key overrides the earlier value but keeps its first position.
fn parse(text: &str) -> Result<Vec<Entry>, (usize, String)> {
    let mut entries: Vec<Entry> = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, line)) = lines.next() {
        let trimmed = line.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let line_no = index + 1;
        let mut logical = String::new();
        let mut current = trimmed;
        loop {
            if !continues(current) {
                logical.push_str(current);
                break;
            }
            logical.push_str(&current[..current.len() - 1]);
            match lines.next() {
                Some((_, next)) => current = next.trim_start(),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        let entry = Entry {
            line: line_no,
            key: unescape(key).map_err(|e| (line_no, e))?,
            value: unescape(value).map_err(|e| (line_no, e))?,
        };

        match seen.get(&entry.key) {
            Some(&position) => entries[position] = entry,
            None => {
                seen.insert(entry.key.clone(), entries.len());
                entries.push(entry);
            }
        }
    }

    Ok(entries)
}

/// A line continues when it ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..i], line[i + 1..].trim_start()),
            c if c.is_whitespace() => {
                let rest = line[i..].trim_start();
                let rest = rest
                    .strip_prefix(|c: char| c == '=' || c == ':')
                    .map(str::trim_start)
                    .unwrap_or(rest);
                return (&line[..i], rest);
            }
            _ => {}
        }
    }
    (line, "")
}

fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("malformed \\u escape `\\u{}`", hex))?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    Ok(out)
}
