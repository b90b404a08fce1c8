//! Column binding for basic values

use quarry_types::{Column, Dialect};

use super::annotations::{Annotated, AnnotationKind};
use super::model::MemberDetails;
use super::BindingContext;
use crate::Result;

/// A column resolved from a member, plus the logical table it targets
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoundColumn {
    pub column: Column,
    /// `@Column(table = ...)`; `None` for the owner's primary table
    pub table: Option<String>,
    pub insertable: bool,
    pub updatable: bool,
}

/// Binds `@Column` (or its absence) to a [`Column`]
pub struct ColumnBinding;

impl ColumnBinding {
    /// Bind the column of a basic member at `attribute_path`
    pub fn bind(
        member: &MemberDetails,
        attribute_path: &str,
        context: &BindingContext,
    ) -> Result<BoundColumn> {
        let naming = context.naming();
        let (sql_type, primitive) = sql_type_for(&member.type_name, context.dialect());

        let Some(usage) = member.annotation(AnnotationKind::Column) else {
            let mut column = Column::from_identifier(naming.column_name(None, attribute_path)).sql_type(sql_type);
            column.nullable = !primitive;
            apply_type_defaults(&mut column, &member.type_name, None, None, None);
            return Ok(BoundColumn {
                column,
                table: None,
                insertable: true,
                updatable: true,
            });
        };

        let name = usage.find_string("name")?;
        let mut column = Column::from_identifier(naming.column_name(name.as_deref(), attribute_path));
        match usage.find_string("columnDefinition")? {
            Some(definition) => column.sql_type = Some(definition),
            None => {
                column.sql_type = Some(sql_type.to_string());
                apply_type_defaults(
                    &mut column,
                    &member.type_name,
                    Some(usage.get_int("length")?),
                    Some(usage.get_int("precision")?),
                    Some(usage.get_int("scale")?),
                );
            }
        }
        column.nullable = usage.get_bool("nullable")? && !primitive;
        column.unique = usage.get_bool("unique")?;
        column.comment = usage.find_string("comment")?;
        column.check = usage.find_string("check")?;

        Ok(BoundColumn {
            column,
            table: usage.find_string("table")?,
            insertable: usage.get_bool("insertable")?,
            updatable: usage.get_bool("updatable")?,
        })
    }
}

/// Length, precision and scale for character and decimal types
fn apply_type_defaults(
    column: &mut Column,
    type_name: &str,
    length: Option<i64>,
    precision: Option<i64>,
    scale: Option<i64>,
) {
    match simple_type_name(type_name) {
        "String" => {
            let length = length.and_then(|l| u64::try_from(l).ok()).unwrap_or(quarry_types::DEFAULT_LENGTH);
            column.length = Some(length);
        }
        "BigDecimal" => {
            let precision = precision.and_then(|p| u32::try_from(p).ok()).filter(|p| *p > 0).unwrap_or(38);
            let scale = scale.and_then(|s| u32::try_from(s).ok()).unwrap_or(2);
            column.precision = Some(precision);
            column.scale = Some(scale);
        }
        _ => {}
    }
}

fn simple_type_name(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// SQL type for a member type, and whether the type is primitive
#[must_use]
pub fn sql_type_for(type_name: &str, dialect: Dialect) -> (&'static str, bool) {
    match simple_type_name(type_name) {
        "long" => ("bigint", true),
        "Long" | "BigInteger" => ("bigint", false),
        "int" => ("integer", true),
        "Integer" => ("integer", false),
        "short" => ("smallint", true),
        "Short" => ("smallint", false),
        "byte" => ("smallint", true),
        "Byte" => ("smallint", false),
        "boolean" => ("boolean", true),
        "Boolean" => ("boolean", false),
        "char" => ("char(1)", true),
        "Character" => ("char(1)", false),
        "double" => ("float(53)", true),
        "Double" => ("float(53)", false),
        "float" => ("float(24)", true),
        "Float" => ("float(24)", false),
        "BigDecimal" => ("numeric", false),
        "LocalDate" | "Date" => ("date", false),
        "LocalTime" => ("time", false),
        "LocalDateTime" | "Instant" | "Timestamp" | "OffsetDateTime" | "ZonedDateTime" => {
            ("timestamp", false)
        }
        "UUID" => match dialect {
            Dialect::PostgreSQL => ("uuid", false),
            Dialect::SQLite | Dialect::MySQL => ("char(36)", false),
        },
        "byte[]" | "Byte[]" => match dialect {
            Dialect::PostgreSQL => ("bytea", false),
            Dialect::SQLite | Dialect::MySQL => ("blob", false),
        },
        _ => ("varchar", false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::annotations::AnnotationUsage;
    use crate::bind::BindingOptions;

    fn context() -> BindingContext {
        BindingContext::new(BindingOptions::default()).unwrap()
    }

    fn member(type_name: &str) -> MemberDetails {
        MemberDetails {
            type_name: type_name.into(),
            annotations: Vec::new(),
        }
    }

    #[test]
    fn test_implicit_column() {
        let bound = ColumnBinding::bind(&member("java.lang.String"), "email", &context()).unwrap();
        assert_eq!(bound.column.name(), "email");
        assert_eq!(bound.column.sql_type_string(), "varchar(255)");
        assert!(bound.column.nullable);
        assert!(bound.table.is_none());
    }

    #[test]
    fn test_primitive_is_not_null() {
        let bound = ColumnBinding::bind(&member("int"), "quantity", &context()).unwrap();
        assert!(!bound.column.nullable);
        assert_eq!(bound.column.sql_type_string(), "integer");
    }

    #[test]
    fn test_explicit_column() {
        let mut details = member("BigDecimal");
        details.annotations.push(
            AnnotationUsage::new(AnnotationKind::Column)
                .with("name", "`Total`")
                .with("nullable", false)
                .with("precision", 10i64)
                .with("updatable", false)
                .with("table", "ORDER_TOTALS"),
        );
        let bound = ColumnBinding::bind(&details, "total", &context()).unwrap();
        assert!(bound.column.is_quoted());
        assert_eq!(bound.column.sql_type_string(), "numeric(10,0)");
        assert!(!bound.column.nullable);
        assert!(!bound.updatable);
        assert_eq!(bound.table.as_deref(), Some("ORDER_TOTALS"));
    }

    #[test]
    fn test_column_definition_wins() {
        let mut details = member("String");
        details.annotations.push(
            AnnotationUsage::new(AnnotationKind::Column).with("columnDefinition", "text"),
        );
        let bound = ColumnBinding::bind(&details, "notes", &context()).unwrap();
        assert_eq!(bound.column.sql_type_string(), "text");
    }

    #[test]
    fn test_dialect_specific_types() {
        assert_eq!(sql_type_for("java.util.UUID", Dialect::PostgreSQL).0, "uuid");
        assert_eq!(sql_type_for("UUID", Dialect::MySQL).0, "char(36)");
    }
}
