//! Value expressions for update assignments (`grade = grade + 1`).

use super::predicates::column;
use super::to_sql_value;
use crate::schema::TableSchema;
use crate::types::Result;
use rusqlite::types::Value as SqlValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
        }
    }
}

/// Expression evaluated by the backend per row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Literal value
    Value(Value),
    /// Current value of a column
    Column(String),
    Binary {
        op: ArithOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(name.into())
    }

    fn binary(self, op: ArithOp, rhs: Expr) -> Self {
        Self::Binary {
            op,
            lhs: Box::new(self),
            rhs: Box::new(rhs),
        }
    }

    /// Render as SQL, appending literals to `params`.
    pub fn to_sql(&self, schema: &TableSchema, params: &mut Vec<SqlValue>) -> Result<String> {
        match self {
            Self::Value(value) => {
                params.push(to_sql_value(value));
                Ok("?".to_string())
            }
            Self::Column(name) => column(schema, name),
            Self::Binary { op, lhs, rhs } => {
                let lhs = lhs.to_sql(schema, params)?;
                let rhs = rhs.to_sql(schema, params)?;
                Ok(format!("({} {} {})", lhs, op.as_sql(), rhs))
            }
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Self::Value(value.into())
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Self::Value(value.into())
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Self::Value(value.into())
    }
}

impl From<&str> for Expr {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

impl From<String> for Expr {
    fn from(value: String) -> Self {
        Self::Value(value.into())
    }
}

macro_rules! arith_ops {
    ($($trait:ident $method:ident => $op:ident),*) => {
        $(
            impl<T: Into<Expr>> std::ops::$trait<T> for Expr {
                type Output = Expr;

                fn $method(self, rhs: T) -> Expr {
                    self.binary(ArithOp::$op, rhs.into())
                }
            }
        )*
    };
}

arith_ops!(Add add => Add, Sub sub => Sub, Mul mul => Mul, Div div => Div);

/// `column = expr` in an update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub column: String,
    pub value: Expr,
}

impl Assignment {
    pub fn set(column: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }
}
