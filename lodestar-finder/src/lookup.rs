//! Lookup requests and shard routing.
//!
//! Accessors construct a [`LookupRequest`] explicitly; the variant fixes
//! the required criteria, the answering shard, and the scalar type of the
//! result. There is no dispatch on the shape of a criteria mapping.

use std::fmt;

use lodestar_core::{CatalogId, FinderError, LookupKind};

/// Named cache partition. Shards populate and invalidate independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shard {
    /// Catalog id/type/code lookups.
    Catalogs,
    /// Field id and field enum id lookups.
    Fields,
}

impl Shard {
    /// Key the shard is stored under within the family directory.
    pub const fn key(self) -> &'static str {
        match self {
            Shard::Catalogs => "catalogs",
            Shard::Fields => "fields",
        }
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One resolution request, carrying every criterion its kind requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupRequest {
    /// Catalog id by type + code.
    Id { catalog_type: String, code: String },
    /// Catalog type by id.
    Type { id: CatalogId },
    /// Catalog code by id.
    Code { id: CatalogId },
    /// Field id by catalog id + field code.
    FieldId { id: CatalogId, field_code: String },
    /// Enum value id by catalog id + field code + external id.
    FieldEnumId {
        id: CatalogId,
        field_code: String,
        external_id: String,
    },
}

impl LookupRequest {
    /// The discriminant of this request.
    pub fn kind(&self) -> LookupKind {
        match self {
            LookupRequest::Id { .. } => LookupKind::Id,
            LookupRequest::Type { .. } => LookupKind::Type,
            LookupRequest::Code { .. } => LookupKind::Code,
            LookupRequest::FieldId { .. } => LookupKind::FieldId,
            LookupRequest::FieldEnumId { .. } => LookupKind::FieldEnumId,
        }
    }

    /// Shard that must hold the answer. A constant function of the kind,
    /// consulted on every resolve.
    pub fn shard(&self) -> Shard {
        match self {
            LookupRequest::Id { .. } | LookupRequest::Type { .. } | LookupRequest::Code { .. } => {
                Shard::Catalogs
            }
            LookupRequest::FieldId { .. } | LookupRequest::FieldEnumId { .. } => Shard::Fields,
        }
    }

    /// Criteria rendering used in not-found messages.
    pub(crate) fn criteria(&self) -> String {
        match self {
            LookupRequest::Id { catalog_type, code } => {
                format!("type \"{catalog_type}\" and code \"{code}\"")
            }
            LookupRequest::Type { id } | LookupRequest::Code { id } => {
                format!("catalog #{id}")
            }
            LookupRequest::FieldId { id, field_code } => {
                format!("catalog #{id} and field code \"{field_code}\"")
            }
            LookupRequest::FieldEnumId {
                id,
                field_code,
                external_id,
            } => {
                format!(
                    "catalog #{id}, field code \"{field_code}\" and external id \"{external_id}\""
                )
            }
        }
    }

    /// The terminal error for a key path absent from a warm shard.
    pub(crate) fn not_found(&self) -> FinderError {
        FinderError::NotFound {
            lookup: self.kind(),
            criteria: self.criteria(),
        }
    }
}

/// Scalar produced by a resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupValue {
    /// A numeric primary key.
    Id(i64),
    /// A type or code string.
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_routing() {
        let id = LookupRequest::Id {
            catalog_type: "catalog".to_string(),
            code: "main".to_string(),
        };
        assert_eq!(id.shard(), Shard::Catalogs);
        assert_eq!(LookupRequest::Type { id: 5 }.shard(), Shard::Catalogs);
        assert_eq!(LookupRequest::Code { id: 5 }.shard(), Shard::Catalogs);

        let field = LookupRequest::FieldId {
            id: 5,
            field_code: "COLOR".to_string(),
        };
        assert_eq!(field.shard(), Shard::Fields);
        let value = LookupRequest::FieldEnumId {
            id: 5,
            field_code: "COLOR".to_string(),
            external_id: "RED".to_string(),
        };
        assert_eq!(value.shard(), Shard::Fields);
    }

    #[test]
    fn test_not_found_message_names_criteria() {
        let request = LookupRequest::FieldEnumId {
            id: 5,
            field_code: "COLOR".to_string(),
            external_id: "BLUE".to_string(),
        };
        let msg = request.not_found().to_string();
        assert!(msg.contains("field enum id"));
        assert!(msg.contains("catalog #5"));
        assert!(msg.contains("COLOR"));
        assert!(msg.contains("BLUE"));
    }

    #[test]
    fn test_kind_discriminants() {
        assert_eq!(LookupRequest::Type { id: 1 }.kind(), LookupKind::Type);
        assert_eq!(LookupRequest::Code { id: 1 }.kind(), LookupKind::Code);
    }
}
