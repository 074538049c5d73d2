use serde::{Deserialize, Serialize};

/// SQL type metadata for a column as reported by the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// Vendor type name (e.g. `varchar`, `int4`).
    pub type_name: String,
    /// Numeric type code (`java.sql.Types` style) when the source provides one.
    pub type_code: Option<i32>,
    /// Declared length or precision. Zero when not applicable.
    pub length: i32,
    pub decimal_digits: i32,
}

impl ColumnType {
    /// Build a type from its name with no size information.
    pub fn named(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, type_code: i32) -> Self {
        self.type_code = Some(type_code);
        self
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    /// Placeholder columns carry no type name.
    pub fn is_unknown(&self) -> bool {
        self.type_name.is_empty() && self.type_code.is_none()
    }

    /// Whether a value of this type could reference a key of `other`.
    ///
    /// Types agree when both codes are present and equal, or when the names
    /// match ignoring case. The declared lengths must always be equal.
    pub fn is_compatible_with(&self, other: &ColumnType) -> bool {
        let same_code = matches!(
            (self.type_code, other.type_code),
            (Some(ours), Some(theirs)) if ours == theirs
        );
        let same_name = self.type_name.eq_ignore_ascii_case(&other.type_name);

        (same_code || same_name) && self.length == other.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_compare_case_insensitively() {
        let int = ColumnType::named("INT");
        let other = ColumnType::named("int").with_code(4);
        assert!(int.is_compatible_with(&other));
    }

    #[test]
    fn codes_win_over_differing_names() {
        let serial = ColumnType::named("serial").with_code(4);
        let int = ColumnType::named("int4").with_code(4);
        assert!(serial.is_compatible_with(&int));
    }

    #[test]
    fn lengths_must_agree() {
        let short = ColumnType::named("varchar").with_length(20);
        let long = ColumnType::named("varchar").with_length(160);
        assert!(!short.is_compatible_with(&long));
    }
}
