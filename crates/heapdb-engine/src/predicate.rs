//! Row predicates.

use std::cmp::Ordering;
use std::fmt;

use heapdb_common::{ColumnType, DbResult, Value};
use heapdb_storage::Record;

/// Comparison operators accepted by [`get_comparator`](crate::Engine::get_comparator).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    /// `=`
    Equal,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
}

impl Comparison {
    /// Every operator.
    pub const ALL: [Comparison; 5] = [
        Comparison::Equal,
        Comparison::Less,
        Comparison::LessEqual,
        Comparison::Greater,
        Comparison::GreaterEqual,
    ];

    /// Parses an operator symbol.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol.trim() {
            "=" | "==" => Some(Self::Equal),
            "<" => Some(Self::Less),
            "<=" => Some(Self::LessEqual),
            ">" => Some(Self::Greater),
            ">=" => Some(Self::GreaterEqual),
            _ => None,
        }
    }

    /// Operator symbol.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::Less => "<",
            Self::LessEqual => "<=",
            Self::Greater => ">",
            Self::GreaterEqual => ">=",
        }
    }

    fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Equal => ord == Ordering::Equal,
            Self::Less => ord == Ordering::Less,
            Self::LessEqual => ord != Ordering::Greater,
            Self::Greater => ord == Ordering::Greater,
            Self::GreaterEqual => ord != Ordering::Less,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A boxed test over full (unprojected) records.
pub type Predicate = Box<dyn Fn(&Record) -> bool + Send + Sync>;

/// A predicate accepting every record.
pub fn accept_all() -> Predicate {
    Box::new(|_| true)
}

/// Builds `record[column] <cmp> literal` for a column at `idx` of type `ty`.
///
/// The literal is cast once here; a malformed literal is an error. Records
/// whose field cannot be decoded never match.
pub(crate) fn comparator(
    idx: usize,
    ty: ColumnType,
    cmp: Comparison,
    literal: &str,
    float_epsilon: f32,
) -> DbResult<Predicate> {
    let rhs = match Value::parse(ty, literal)? {
        Value::Varchar(s) => Value::Varchar(s.trim().to_string()),
        other => other,
    };

    Ok(Box::new(move |record: &Record| {
        let Ok(lhs) = record.value(idx, ty) else {
            return false;
        };
        match (&lhs, &rhs) {
            (Value::Float(a), Value::Float(b)) => {
                if (a - b).abs() < float_epsilon {
                    cmp.holds(Ordering::Equal)
                } else {
                    a.partial_cmp(b).map_or(false, |ord| cmp.holds(ord))
                }
            }
            (Value::Varchar(a), Value::Varchar(b)) => cmp.holds(a.trim().cmp(b.as_str())),
            _ => lhs.compare(&rhs).map_or(false, |ord| cmp.holds(ord)),
        }
    }))
}

/// Equality predicate used when a searched column has no index.
pub(crate) fn equals(idx: usize, ty: ColumnType, literal: &str, float_epsilon: f32) -> DbResult<Predicate> {
    comparator(idx, ty, Comparison::Equal, literal, float_epsilon)
}

/// `begin <= record[idx] <= end` over already-cast bounds. BOOL orders
/// `false` before `true`.
pub(crate) fn between(idx: usize, ty: ColumnType, begin: Value, end: Value) -> Predicate {
    Box::new(move |record: &Record| {
        record.value(idx, ty).map_or(false, |v| {
            v.compare(&begin) != Some(Ordering::Less) && v.compare(&end) != Some(Ordering::Greater)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(values: &[Value], types: &[ColumnType]) -> Record {
        Record::from_values(values, types).unwrap()
    }

    #[test]
    fn test_int_operators() {
        let types = [ColumnType::int()];
        let row = record(&[Value::Int(5)], &types);
        let expect = [
            (Comparison::Equal, false),
            (Comparison::Less, true),
            (Comparison::LessEqual, true),
            (Comparison::Greater, false),
            (Comparison::GreaterEqual, false),
        ];
        for (cmp, holds) in expect {
            let p = comparator(0, types[0], cmp, "7", 0.001).unwrap();
            assert_eq!(p(&row), holds, "5 {} 7", cmp);
        }
    }

    #[test]
    fn test_float_equality_uses_epsilon() {
        let types = [ColumnType::float()];
        let row = record(&[Value::Float(1.0004)], &types);
        let eq = comparator(0, types[0], Comparison::Equal, "1.0", 0.001).unwrap();
        assert!(eq(&row));
        let lt = comparator(0, types[0], Comparison::Less, "1.0", 0.001).unwrap();
        assert!(!lt(&row));
        let tight = comparator(0, types[0], Comparison::Equal, "1.0", 0.0001).unwrap();
        assert!(!tight(&row));
    }

    #[test]
    fn test_varchar_and_bool() {
        let types = [ColumnType::varchar(8).unwrap(), ColumnType::bool()];
        let row = record(
            &[Value::Varchar("bob".into()), Value::Bool(true)],
            &types,
        );
        assert!(comparator(0, types[0], Comparison::Equal, " bob ", 0.001).unwrap()(&row));
        assert!(comparator(0, types[0], Comparison::Greater, "alice", 0.001).unwrap()(&row));
        assert!(comparator(1, types[1], Comparison::Greater, "no", 0.001).unwrap()(&row));
        assert!(comparator(1, types[1], Comparison::Equal, "YES", 0.001).unwrap()(&row));
    }

    #[test]
    fn test_malformed_literal() {
        assert!(comparator(0, ColumnType::int(), Comparison::Equal, "x1", 0.001).is_err());
    }

    #[test]
    fn test_between() {
        let types = [ColumnType::int()];
        let p = between(0, types[0], Value::Int(3), Value::Int(8));
        assert!(p(&record(&[Value::Int(3)], &types)));
        assert!(p(&record(&[Value::Int(8)], &types)));
        assert!(!p(&record(&[Value::Int(9)], &types)));
    }

    #[test]
    fn test_symbols() {
        for cmp in Comparison::ALL {
            assert_eq!(Comparison::from_symbol(cmp.symbol()), Some(cmp));
        }
        assert_eq!(Comparison::from_symbol("!="), None);
    }
}
