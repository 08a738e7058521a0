use sqlx::{Postgres, QueryBuilder};

use crate::application::repos::RepoError;
use crate::domain::types::FieldValue;

pub fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        sqlx::Error::PoolTimedOut => RepoError::Timeout,
        other => RepoError::from_persistence(other),
    }
}

pub(crate) fn convert_count(value: i64) -> Result<u64, RepoError> {
    value
        .try_into()
        .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
}

/// Bind a field value. `Null` is written as a literal since it carries no type.
pub(crate) fn push_value(qb: &mut QueryBuilder<'static, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Int(value) => {
            qb.push_bind(*value);
        }
        FieldValue::Bool(value) => {
            qb.push_bind(*value);
        }
        FieldValue::Float(value) => {
            qb.push_bind(*value);
        }
        FieldValue::Text(value) => {
            qb.push_bind(value.clone());
        }
        FieldValue::Date(value) => {
            qb.push_bind(*value);
        }
        FieldValue::Timestamp(value) => {
            qb.push_bind(*value);
        }
        FieldValue::Null => {
            qb.push("NULL");
        }
    }
}
