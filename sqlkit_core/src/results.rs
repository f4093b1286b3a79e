use sqlkit_driver::{Record, Value};

/// Tagged outcome of executing one statement.
#[derive(Clone, Debug, PartialEq)]
pub enum ExecutionResult {
    /// SELECT: fully materialized, decoded rows.
    Rows(Vec<Record>),
    /// INSERT: generated keys drained from the driver.
    Keys(Vec<Value>),
    /// UPDATE/DELETE/DDL: affected-row count.
    Affected(u64),
    /// Batch entry the driver reported as applied without a count.
    AffectedUnknown,
    /// Statement refused by the injection filter before reaching the driver.
    Rejected { message: String },
    /// Batch entry the driver reported as failed.
    Failed,
}

impl ExecutionResult {
    pub(crate) fn rejected() -> Self {
        ExecutionResult::Rejected {
            message: "attempted sql injection".to_string(),
        }
    }

    /// `true` for the rejected and failed outcomes.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ExecutionResult::Rejected { .. } | ExecutionResult::Failed
        )
    }

    /// The decoded rows of a SELECT outcome.
    #[must_use]
    pub fn rows(&self) -> Option<&[Record]> {
        match self {
            ExecutionResult::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    /// The generated keys of an INSERT outcome.
    #[must_use]
    pub fn keys(&self) -> Option<&[Value]> {
        match self {
            ExecutionResult::Keys(keys) => Some(keys),
            _ => None,
        }
    }

    /// The affected-row count of an update outcome.
    #[must_use]
    pub fn affected(&self) -> Option<u64> {
        match self {
            ExecutionResult::Affected(count) => Some(*count),
            _ => None,
        }
    }
}

/// Result of inserting records: the generated key for exactly one record,
/// per-row outcomes (in input order) for more.
#[derive(Clone, Debug, PartialEq)]
pub enum InsertResult {
    One(ExecutionResult),
    Many(Vec<ExecutionResult>),
}

impl InsertResult {
    /// The single-record outcome.
    #[must_use]
    pub fn one(&self) -> Option<&ExecutionResult> {
        match self {
            InsertResult::One(result) => Some(result),
            InsertResult::Many(_) => None,
        }
    }

    /// The per-row outcomes of a multi-record insert.
    #[must_use]
    pub fn many(&self) -> Option<&[ExecutionResult]> {
        match self {
            InsertResult::One(_) => None,
            InsertResult::Many(results) => Some(results),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert!(ExecutionResult::rejected().is_error());
        assert!(ExecutionResult::Failed.is_error());
        assert!(!ExecutionResult::Affected(0).is_error());

        assert_eq!(ExecutionResult::Affected(3).affected(), Some(3));
        assert_eq!(ExecutionResult::AffectedUnknown.affected(), None);
        assert_eq!(
            ExecutionResult::Keys(vec![Value::I64(1)]).keys(),
            Some(&[Value::I64(1)][..])
        );
        assert_eq!(ExecutionResult::Rows(Vec::new()).rows(), Some(&[][..]));
    }

    #[test]
    fn test_insert_result_shape() {
        let one = InsertResult::One(ExecutionResult::Keys(vec![Value::I64(1)]));
        assert!(one.one().is_some());
        assert!(one.many().is_none());

        let many = InsertResult::Many(vec![ExecutionResult::Affected(1)]);
        assert_eq!(many.many().map(<[ExecutionResult]>::len), Some(1));
    }
}
