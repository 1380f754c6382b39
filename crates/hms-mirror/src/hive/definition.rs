//! Editing `SHOW CREATE TABLE` output.
//!
//! Hive reports a table's DDL as a list of lines. Every generated CREATE
//! statement is produced by taking the source lines and rewriting the parts
//! that differ on the target: the table name, EXTERNAL-ness, the LOCATION
//! clause and the TBLPROPERTIES block. Column, partition and storage clauses
//! are carried over untouched.

use regex::Regex;
use std::sync::OnceLock;

use crate::core::identifier::{quote_hive, unquote_hive};

pub const TRANSACTIONAL: &str = "transactional";
pub const TRANSACTIONAL_PROPERTIES: &str = "transactional_properties";
pub const EXTERNAL_TABLE_PURGE: &str = "external.table.purge";
pub const DISCOVER_PARTITIONS: &str = "discover.partitions";
pub const SHADOW_TABLE_MARKER: &str = "hms-mirror_shadow_table";
pub const DOWNGRADED_FROM_ACID: &str = "downgraded_from_acid";

const LOCATION: &str = "LOCATION";
const TBLPROPERTIES: &str = "TBLPROPERTIES";
const PARTITIONED_BY: &str = "PARTITIONED BY";

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(r"(?i)^(\s*CREATE\s+(?:EXTERNAL\s+|TRANSACTIONAL\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?)([^\s(]+)(.*)$")
            .expect("header pattern is valid")
    })
}

/// A table's DDL as editable lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableDefinition {
    lines: Vec<String>,
}

impl TableDefinition {
    pub fn new(lines: Vec<String>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }

    /// The CREATE statement as a single string.
    pub fn sql(&self) -> String {
        self.lines.join("\n")
    }

    fn header_index(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.trim_start().to_ascii_uppercase().starts_with("CREATE"))
    }

    pub fn is_external(&self) -> bool {
        self.header_index()
            .map(|i| self.lines[i].to_ascii_uppercase().contains("CREATE EXTERNAL TABLE"))
            .unwrap_or(false)
    }

    /// Table name from the CREATE line, without database qualifier or quotes.
    pub fn table_name(&self) -> Option<String> {
        let header = &self.lines[self.header_index()?];
        let caps = header_regex().captures(header)?;
        let qualified = caps.get(2)?.as_str();
        let name = match qualified.rfind("`.`") {
            Some(pos) => &qualified[pos + 2..],
            None => qualified.rsplit('.').next().unwrap_or(qualified),
        };
        Some(unquote_hive(name))
    }

    /// Point the CREATE line at another table name.
    pub fn rename(&mut self, new_name: &str) {
        let Some(idx) = self.header_index() else {
            return;
        };
        let rewritten = header_regex().captures(&self.lines[idx]).map(|caps| {
            format!(
                "{}{}{}",
                &caps[1],
                quote_hive(new_name),
                caps.get(3).map_or("", |m| m.as_str())
            )
        });
        if let Some(line) = rewritten {
            self.lines[idx] = line;
        }
    }

    pub fn make_external(&mut self) {
        if self.is_external() {
            return;
        }
        if let Some(idx) = self.header_index() {
            let line = &self.lines[idx];
            let upper = line.to_ascii_uppercase();
            if let Some(pos) = upper.find("TABLE") {
                let prefix = line[..pos].replace("TRANSACTIONAL ", "").replace("transactional ", "");
                self.lines[idx] = format!("{}EXTERNAL {}", prefix, &line[pos..]);
            }
        }
    }

    fn keyword_index(&self, keyword: &str) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.trim_start().to_ascii_uppercase().starts_with(keyword))
    }

    fn location_index(&self) -> Option<usize> {
        self.lines
            .iter()
            .position(|l| l.trim().eq_ignore_ascii_case(LOCATION))
    }

    pub fn location(&self) -> Option<String> {
        let idx = self.location_index()?;
        let value = self.lines.get(idx + 1)?.trim();
        Some(value.trim_matches('\'').trim_matches('"').to_string())
    }

    pub fn set_location(&mut self, location: &str) {
        let rendered = format!("  '{}'", location);
        match self.location_index() {
            Some(idx) if idx + 1 < self.lines.len() => self.lines[idx + 1] = rendered,
            Some(_) => self.lines.push(rendered),
            None => {
                let at = self.keyword_index(TBLPROPERTIES).unwrap_or(self.lines.len());
                self.lines.insert(at, LOCATION.to_string());
                self.lines.insert(at + 1, rendered);
            }
        }
    }

    pub fn remove_location(&mut self) {
        if let Some(idx) = self.location_index() {
            let end = (idx + 2).min(self.lines.len());
            self.lines.drain(idx..end);
        }
    }

    /// Locate a parenthesised clause: (first line, last line, body text).
    fn clause(&self, keyword: &str) -> Option<(usize, usize, String)> {
        let start = self.keyword_index(keyword)?;
        let mut depth = 0usize;
        let mut in_quote = false;
        let mut body = String::new();
        let mut opened = false;

        for (offset, line) in self.lines[start..].iter().enumerate() {
            let text = if offset == 0 {
                &line.trim_start()[keyword.len()..]
            } else {
                line.as_str()
            };
            for ch in text.chars() {
                match ch {
                    '\'' => {
                        in_quote = !in_quote;
                        if opened {
                            body.push(ch);
                        }
                    }
                    '(' if !in_quote => {
                        if opened {
                            body.push(ch);
                        }
                        depth += 1;
                        opened = true;
                    }
                    ')' if !in_quote => {
                        depth = depth.saturating_sub(1);
                        if opened && depth == 0 {
                            return Some((start, start + offset, body));
                        }
                        if opened {
                            body.push(ch);
                        }
                    }
                    _ if opened => body.push(ch),
                    _ => {}
                }
            }
            if opened {
                body.push('\n');
            }
        }
        None
    }

    pub fn is_partitioned(&self) -> bool {
        self.keyword_index(PARTITIONED_BY).is_some()
    }

    /// Partition column names in declaration order.
    pub fn partition_columns(&self) -> Vec<String> {
        let Some((_, _, body)) = self.clause(PARTITIONED_BY) else {
            return Vec::new();
        };
        split_top_level(&body)
            .iter()
            .filter_map(|entry| entry.split_whitespace().next())
            .map(unquote_hive)
            .collect()
    }

    /// TBLPROPERTIES in declaration order.
    pub fn properties(&self) -> Vec<(String, String)> {
        let Some((_, _, body)) = self.clause(TBLPROPERTIES) else {
            return Vec::new();
        };
        split_top_level(&body)
            .iter()
            .filter_map(|entry| parse_property(entry))
            .collect()
    }

    pub fn property(&self, key: &str) -> Option<String> {
        self.properties()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    }

    pub fn set_property(&mut self, key: &str, value: &str) {
        let mut props = self.properties();
        match props.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some(entry) => entry.1 = value.to_string(),
            None => props.push((key.to_string(), value.to_string())),
        }
        self.write_properties(&props);
    }

    pub fn remove_property(&mut self, key: &str) {
        let props: Vec<_> = self
            .properties()
            .into_iter()
            .filter(|(k, _)| !k.eq_ignore_ascii_case(key))
            .collect();
        self.write_properties(&props);
    }

    fn write_properties(&mut self, props: &[(String, String)]) {
        let mut rendered = Vec::with_capacity(props.len() + 1);
        if !props.is_empty() {
            rendered.push(format!("{} (", TBLPROPERTIES));
            for (i, (k, v)) in props.iter().enumerate() {
                let tail = if i + 1 == props.len() { ")" } else { ", " };
                rendered.push(format!("  '{}'='{}'{}", k, v, tail));
            }
        }
        match self.clause(TBLPROPERTIES) {
            Some((start, end, _)) => {
                self.lines.splice(start..=end, rendered);
            }
            None => self.lines.extend(rendered),
        }
    }

    pub fn is_acid(&self) -> bool {
        self.property(TRANSACTIONAL)
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }

    /// Remove the properties that make a table transactional.
    pub fn strip_transactional(&mut self) {
        self.remove_property(TRANSACTIONAL);
        self.remove_property(TRANSACTIONAL_PROPERTIES);
    }

    /// Lines describing the table's shape: columns, partitioning and storage.
    fn shape(&self) -> Vec<String> {
        let Some(header) = self.header_index() else {
            return Vec::new();
        };
        let end = self
            .location_index()
            .or_else(|| self.keyword_index(TBLPROPERTIES))
            .unwrap_or(self.lines.len());
        let mut shape = Vec::new();
        if let Some(pos) = self.lines[header].find('(') {
            shape.push(self.lines[header][pos..].to_string());
        }
        shape.extend(self.lines[header + 1..end].iter().cloned());
        shape
            .into_iter()
            .map(|l| l.trim().trim_end_matches(',').trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }

    /// Whether two definitions describe the same columns, partitions and
    /// storage, ignoring name, location and properties.
    pub fn schema_matches(&self, other: &TableDefinition) -> bool {
        let mine = self.shape();
        !mine.is_empty() && mine == other.shape()
    }
}

/// Split on commas that are outside quotes and parentheses.
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_quote = false;
    for ch in body.chars() {
        match ch {
            '\'' => {
                in_quote = !in_quote;
                current.push(ch);
            }
            '(' if !in_quote => {
                depth += 1;
                current.push(ch);
            }
            ')' if !in_quote => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if !in_quote && depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts.retain(|p| !p.is_empty());
    parts
}

fn parse_property(entry: &str) -> Option<(String, String)> {
    let mut in_quote = false;
    for (i, ch) in entry.char_indices() {
        match ch {
            '\'' | '"' => in_quote = !in_quote,
            '=' if !in_quote => {
                let key = entry[..i].trim().trim_matches(|c| c == '\'' || c == '"');
                let value = entry[i + 1..].trim().trim_matches(|c| c == '\'' || c == '"');
                return Some((key.to_string(), value.to_string()));
            }
            _ => {}
        }
    }
    None
}
