//! Caller-supplied filters and their normalization.
//!
//! Normalization runs before any cache or store access, construction
//! included: identifier criteria must be strictly positive, text criteria
//! are trimmed and HTML-escaped and must be non-empty afterwards.

use lodestar_core::{CatalogId, FilterError};

/// Filter identifying one catalog, by direct id or by type + code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    pub id: Option<CatalogId>,
    pub catalog_type: Option<String>,
    pub code: Option<String>,
}

impl CatalogFilter {
    /// Filter by direct catalog id.
    pub fn by_id(id: CatalogId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Filter by the composite natural key.
    pub fn by_type_code(catalog_type: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            id: None,
            catalog_type: Some(catalog_type.into()),
            code: Some(code.into()),
        }
    }

    /// Validate and canonicalize every present criterion.
    pub fn normalized(self) -> Result<Self, FilterError> {
        let id = self.id.map(|id| ensure_positive("id", id)).transpose()?;
        let catalog_type = self
            .catalog_type
            .map(|v| sanitize("type", &v))
            .transpose()?;
        let code = self.code.map(|v| sanitize("code", &v)).transpose()?;

        Ok(Self {
            id,
            catalog_type,
            code,
        })
    }
}

/// Reject non-positive identifiers.
pub(crate) fn ensure_positive(
    criterion: &'static str,
    id: i64,
) -> Result<i64, FilterError> {
    if id <= 0 {
        return Err(FilterError::InvalidCriterion {
            criterion,
            reason: format!("must be strictly positive, got {id}"),
        });
    }
    Ok(id)
}

/// Trim and escape a text criterion, rejecting values that end up empty.
pub(crate) fn sanitize(criterion: &'static str, raw: &str) -> Result<String, FilterError> {
    let cleaned = escape_text(raw.trim());
    if cleaned.is_empty() {
        return Err(FilterError::InvalidCriterion {
            criterion,
            reason: "empty after normalization".to_string(),
        });
    }
    Ok(cleaned)
}

/// Escape HTML-special characters so criteria echoed into error messages
/// or templates are inert.
fn escape_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
