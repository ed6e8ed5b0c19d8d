//! Casting string-encoded values to their native representation.
//!
//! Every caller that receives values as text (rows, search literals,
//! CSV fields) goes through these functions. Disallowed key types come
//! back as [`DbError::NotIndexable`] rather than being coerced.

use crate::constants::TRUE_LITERALS;
use crate::error::{DbError, DbResult};
use crate::types::{ColumnType, Key, TypeTag, Value};

/// Parses a BOOL literal.
///
/// Case-insensitive; surrounding whitespace is ignored. Anything outside
/// the true vocabulary is false.
#[must_use]
pub fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_lowercase();
    TRUE_LITERALS.contains(&lowered.as_str())
}

/// Returns the longest prefix of `s` that fits in `width` bytes without
/// splitting a char.
#[must_use]
pub fn truncate_to_width(s: &str, width: usize) -> &str {
    if s.len() <= width {
        return s;
    }
    let mut end = width;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Casts a literal to a value of the given column type.
pub fn cast_value(ty: ColumnType, raw: &str) -> DbResult<Value> {
    match ty.tag() {
        TypeTag::Bool => Ok(Value::Bool(parse_bool(raw))),
        TypeTag::Int => raw
            .trim()
            .parse::<i32>()
            .map(Value::Int)
            .map_err(|_| DbError::malformed(TypeTag::Int, raw)),
        TypeTag::Float => raw
            .trim()
            .parse::<f32>()
            .map(Value::Float)
            .map_err(|_| DbError::malformed(TypeTag::Float, raw)),
        TypeTag::Varchar => Ok(Value::Varchar(
            truncate_to_width(raw, ty.size()).to_string(),
        )),
    }
}

/// Casts a literal to a primary key. Only INT and FLOAT are accepted.
pub fn key_cast(ty: ColumnType, raw: &str) -> DbResult<Key> {
    ensure_key_type(ty.tag())?;
    Key::from_value(cast_value(ty, raw)?)
}

/// Casts a literal to a secondary index key. INT, FLOAT and VARCHAR are
/// accepted.
pub fn index_cast(ty: ColumnType, raw: &str) -> DbResult<Key> {
    ensure_indexable(ty.tag())?;
    Key::from_value(cast_value(ty, raw)?)
}

/// Fails unless `tag` can be a primary key.
pub fn ensure_key_type(tag: TypeTag) -> DbResult<()> {
    if tag.is_key_type() {
        Ok(())
    } else {
        Err(DbError::NotIndexable { tag })
    }
}

/// Fails unless `tag` can carry a secondary index.
pub fn ensure_indexable(tag: TypeTag) -> DbResult<()> {
    if tag.is_indexable() {
        Ok(())
    } else {
        Err(DbError::NotIndexable { tag })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn test_parse_bool_vocabulary() {
        for raw in ["yes", "Y", "si", "S", "v", "Verdadero", "t", "TRUE", "1", " true "] {
            assert!(parse_bool(raw), "{raw} should be true");
        }
        for raw in ["no", "0", "false", "", "2", "yess"] {
            assert!(!parse_bool(raw), "{raw} should be false");
        }
    }

    #[test]
    fn test_cast_numbers() {
        assert_eq!(cast_value(ColumnType::int(), " 12 ").unwrap(), Value::Int(12));
        assert_eq!(cast_value(ColumnType::float(), "2.5").unwrap(), Value::Float(2.5));

        let err = cast_value(ColumnType::int(), "12a").unwrap_err();
        assert_eq!(err.code(), ErrorCode::MalformedLiteral);
        assert!(cast_value(ColumnType::int(), "3.0").is_err());
        assert!(cast_value(ColumnType::float(), "").is_err());
    }

    #[test]
    fn test_cast_varchar_truncates() {
        let ty = ColumnType::varchar(3).unwrap();
        assert_eq!(cast_value(ty, "abcdef").unwrap(), Value::Varchar("abc".into()));
    }

    #[test]
    fn test_key_cast_rejects_non_keys() {
        assert_eq!(key_cast(ColumnType::int(), "5").unwrap(), Key::Int(5));
        assert_eq!(key_cast(ColumnType::float(), "1.5").unwrap(), Key::Float(1.5));

        let err = key_cast(ColumnType::bool(), "true").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotIndexable);
        let err = key_cast(ColumnType::varchar(4).unwrap(), "ab").unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotIndexable);
    }

    #[test]
    fn test_index_cast_accepts_varchar() {
        let ty = ColumnType::varchar(4).unwrap();
        assert_eq!(index_cast(ty, "ab").unwrap(), Key::Varchar("ab".into()));
        assert!(index_cast(ColumnType::bool(), "1").is_err());
    }
}
