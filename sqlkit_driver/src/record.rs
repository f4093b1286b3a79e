use crate::Value;
use indexmap::IndexMap;

/// An ordered column-name to value mapping.
///
/// Used both as an INSERT/UPDATE payload and as a decoded SELECT row. Key
/// iteration order is the column order used wherever SQL text is generated
/// from a record.
pub type Record = IndexMap<String, Value>;

/// Build a [`Record`] from `key => value` pairs, preserving order.
///
/// Values are converted through [`Value::from`], so literals, strings and
/// `Value` variants all work:
///
/// ```
/// use sqlkit_driver::{record, Value};
///
/// let row = record! { "name" => "Ana", "age" => 30i64, "note" => Value::Null };
/// assert_eq!(row.keys().collect::<Vec<_>>(), ["name", "age", "note"]);
/// ```
#[macro_export]
macro_rules! record {
    () => { $crate::Record::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::Record::new();
        $(
            record.insert(($key).to_string(), $crate::Value::from($value));
        )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use crate::Value;

    #[test]
    fn test_record_preserves_insertion_order() {
        let record = record! { "b" => 1i64, "a" => 2i64, "c" => Value::Null };
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, ["b", "a", "c"]);
        assert_eq!(record["b"], Value::I64(1));
        assert_eq!(record["c"], Value::Null);
    }

    #[test]
    fn test_empty_record() {
        let record = record! {};
        assert!(record.is_empty());
    }
}
