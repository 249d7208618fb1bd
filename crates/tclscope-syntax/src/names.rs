//! Qualified-name machinery.
//!
//! Tcl identifiers live in a hierarchical namespace tree whose path segments
//! are joined by `::`. A name is *absolute* when its namespace part begins
//! with the delimiter (`::A::B`); a bare leading `::` denotes the global
//! namespace itself.

/// The namespace path delimiter.
pub const DELIMITER: &str = "::";

/// A name split into an optional namespace part and a leaf.
///
/// Splitting cuts at the *last* occurrence of the delimiter, so the namespace
/// part may itself contain nested delimiters. A present-but-empty namespace
/// part means the global namespace (`::Leaf`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    pub namespace: Option<String>,
    pub name: String,
}

impl QualifiedName {
    /// Split `name` at the last `::`.
    pub fn split(name: &str) -> Self {
        match name.rfind(DELIMITER) {
            None => Self { namespace: None, name: name.to_string() },
            Some(pos) => Self {
                namespace: Some(name[..pos].to_string()),
                name: name[pos + DELIMITER.len()..].to_string(),
            },
        }
    }

    /// True when the namespace part is present and anchored at the root:
    /// either empty (`::Leaf`) or itself starting with the delimiter.
    pub fn is_absolute(&self) -> bool {
        match &self.namespace {
            None => false,
            Some(ns) => ns.is_empty() || ns.starts_with(DELIMITER),
        }
    }

    /// The namespace part as path segments, without any leading delimiter.
    pub fn namespace_segments(&self) -> Vec<&str> {
        match &self.namespace {
            None => Vec::new(),
            Some(ns) if self.is_absolute() => path_segments(ns),
            Some(ns) => path_segments_relative(ns),
        }
    }

    /// Rewrite a relative name against an enclosing absolute namespace path;
    /// absolute names pass through unchanged.
    pub fn to_absolute(&self, enclosing: &str) -> QualifiedName {
        if self.is_absolute() {
            return self.clone();
        }
        let namespace = match &self.namespace {
            None => enclosing.to_string(),
            Some(rel) => format!("{enclosing}{DELIMITER}{rel}"),
        };
        QualifiedName { namespace: Some(namespace), name: self.name.clone() }
    }

    /// Join the parts back into a single name.
    pub fn path(&self) -> String {
        match &self.namespace {
            None => self.name.clone(),
            Some(ns) => format!("{ns}{DELIMITER}{}", self.name),
        }
    }
}

/// Split an absolute namespace path (`""`, `::A`, `::A::B`) into segments.
pub fn path_segments(path: &str) -> Vec<&str> {
    let path = path.strip_prefix(DELIMITER).unwrap_or(path);
    path_segments_relative(path)
}

fn path_segments_relative(path: &str) -> Vec<&str> {
    if path.is_empty() {
        return Vec::new();
    }
    path.split(DELIMITER).collect()
}
