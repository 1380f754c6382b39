//! Namespace and warehouse rewriting for generated locations.
//!
//! A location is `<namespace><path>` where the namespace is the
//! `scheme://authority` part (`hdfs://HDP50`, `s3a://bucket`). Moving a table
//! to another cluster swaps the namespace; aligning it to a warehouse replaces
//! the path with `<warehouse dir>/<db>.db/<table>`.

use serde::{Deserialize, Serialize};

/// Split a URI into its namespace and path.
///
/// ```ignore
/// assert_eq!(split_namespace("hdfs://HDP50/apps/x"), (Some("hdfs://HDP50"), "/apps/x"));
/// assert_eq!(split_namespace("/apps/x"), (None, "/apps/x"));
/// ```
pub fn split_namespace(uri: &str) -> (Option<&str>, &str) {
    let Some(scheme_end) = uri.find("://") else {
        return (None, uri);
    };
    let authority_start = scheme_end + 3;
    match uri[authority_start..].find('/') {
        Some(pos) => {
            let split = authority_start + pos;
            (Some(&uri[..split]), &uri[split..])
        }
        None => (Some(uri), ""),
    }
}

pub fn namespace_of(uri: &str) -> Option<&str> {
    split_namespace(uri).0
}

/// Join path segments with single slashes.
pub fn join_path(base: &str, segments: &[&str]) -> String {
    let mut out = base.trim_end_matches('/').to_string();
    for segment in segments {
        let segment = segment.trim_matches('/');
        if segment.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(segment);
    }
    out
}

/// Managed tables live under the managed warehouse, everything else under
/// the external one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    Managed,
    External,
}

/// Warehouse base directories (paths without namespace).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_directory: Option<String>,
}

impl Warehouse {
    pub fn directory(&self, kind: TableKind) -> Option<&str> {
        match kind {
            TableKind::Managed => self.managed_directory.as_deref(),
            TableKind::External => self.external_directory.as_deref(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.managed_directory.is_some() && self.external_directory.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.managed_directory.is_none() && self.external_directory.is_none()
    }
}

/// Rewrites source locations into target locations for one database.
#[derive(Debug, Clone)]
pub struct LocationTranslator {
    source_db: String,
    target_db: String,
    namespace: Option<String>,
    warehouse: Warehouse,
    align: bool,
}

impl LocationTranslator {
    pub fn new(source_db: impl Into<String>, target_db: impl Into<String>) -> Self {
        Self {
            source_db: source_db.into(),
            target_db: target_db.into(),
            namespace: None,
            warehouse: Warehouse::default(),
            align: false,
        }
    }

    /// Namespace every generated location is moved to.
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace.map(|ns| ns.trim_end_matches('/').to_string());
        self
    }

    /// Warehouse directories replace the base path of generated locations.
    /// With `align`, locations are built as `<dir>/<db>.db/<table>` whatever
    /// the source layout.
    pub fn with_warehouse(mut self, warehouse: Warehouse, align: bool) -> Self {
        self.warehouse = warehouse;
        self.align = align;
        self
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn target_db(&self) -> &str {
        &self.target_db
    }

    /// `<ns><warehouse dir>/<db>.db[/<table>]`, when a directory is set for `kind`.
    fn warehouse_location(&self, original: Option<&str>, kind: TableKind, table: Option<&str>) -> Option<String> {
        let dir = self.warehouse.directory(kind)?;
        let ns = self
            .namespace
            .as_deref()
            .or_else(|| original.and_then(namespace_of))
            .unwrap_or("");
        let db_dir = format!("{}.db", self.target_db);
        let mut segments = vec![db_dir.as_str()];
        if let Some(table) = table {
            segments.push(table);
        }
        Some(format!("{}{}", ns, join_path(dir, &segments)))
    }

    /// Relocate `original` and swap the base path in front of `/<db>.db`
    /// for the warehouse directory of `kind`. Paths outside a database
    /// directory keep their layout.
    fn translate(&self, original: &str, kind: TableKind) -> String {
        let relocated = self.relocate(original);
        let Some(dir) = self.warehouse.directory(kind) else {
            return relocated;
        };
        let (ns, path) = split_namespace(&relocated);
        let db_dir = format!("/{}.db", self.target_db);
        let base_end = path.match_indices(&db_dir).map(|(pos, _)| pos).find(|pos| {
            let rest = &path[pos + db_dir.len()..];
            rest.is_empty() || rest.starts_with('/')
        });
        match base_end {
            Some(pos) => format!("{}{}", ns.unwrap_or(""), join_path(dir, &[&path[pos..]])),
            None => relocated,
        }
    }

    /// Move a location to the target namespace, renaming the database
    /// directory when the database is renamed.
    pub fn relocate(&self, original: &str) -> String {
        let (ns, path) = split_namespace(original);
        let path = self.rename_db_segment(path);
        let ns = self.namespace.as_deref().or(ns).unwrap_or("");
        format!("{}{}", ns, path)
    }

    fn rename_db_segment(&self, path: &str) -> String {
        if self.source_db == self.target_db {
            return path.to_string();
        }
        let from = format!("/{}.db", self.source_db);
        let to = format!("/{}.db", self.target_db);
        match path.find(&from) {
            Some(pos)
                if path[pos + from.len()..].is_empty()
                    || path[pos + from.len()..].starts_with('/') =>
            {
                format!("{}{}{}", &path[..pos], to, &path[pos + from.len()..])
            }
            _ => path.to_string(),
        }
    }

    /// Target location of a table.
    pub fn table_location(&self, original: Option<&str>, table: &str, kind: TableKind) -> Option<String> {
        if self.align {
            if let Some(location) = self.warehouse_location(original, kind, Some(table)) {
                return Some(location);
            }
        }
        original.map(|o| self.translate(o, kind))
    }

    /// Target location of the database directory. A configured warehouse
    /// directory supplies one even when LEFT's is unknown.
    pub fn database_location(&self, original: Option<&str>, kind: TableKind) -> Option<String> {
        if self.align {
            if let Some(location) = self.warehouse_location(original, kind, None) {
                return Some(location);
            }
        }
        match original {
            Some(o) => Some(self.translate(o, kind)),
            None => self.warehouse_location(None, kind, None),
        }
    }
}
