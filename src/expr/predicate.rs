//! Predicate builder
//!
//! ```rust
//! use quarry::expr::prop;
//!
//! let name = String::from("quarry");
//! let predicate = prop("Title").eq(name).and(prop("Blog").then("Id").eq(3));
//! ```
//!
//! Only equality joined by `and` is translatable. `ne`, `lt`, `gt`, `or` and
//! `not` build predicates that the parser rejects with a named construct.

use sea_query::Value;

use crate::value::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Gt,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompareOp::Eq => "equality",
            CompareOp::Ne => "inequality (ne)",
            CompareOp::Lt => "ordering comparison (lt)",
            CompareOp::Gt => "ordering comparison (gt)",
        };
        f.write_str(s)
    }
}

/// Dotted property access rooted at the queried entity: `Title`, `Blog.Id`.
#[derive(Debug, Clone)]
pub struct PropertyPath(pub(crate) Vec<String>);

/// Start a property path.
pub fn prop(name: impl Into<String>) -> PropertyPath {
    PropertyPath(vec![name.into()])
}

/// A literal operand, for `eq_to`.
pub fn value(v: impl ValueType) -> Operand {
    Operand::Value(v.into_value())
}

/// Compare two arbitrary operands.
pub fn compare(left: impl Into<Operand>, op: CompareOp, right: impl Into<Operand>) -> Predicate {
    Predicate::Compare {
        op,
        left: left.into(),
        right: right.into(),
    }
}

impl PropertyPath {
    /// Step through a navigation: `prop("Blog").then("Id")`.
    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.0.push(name.into());
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn eq(self, v: impl ValueType) -> Predicate {
        compare(self, CompareOp::Eq, value(v))
    }

    /// Compare against a value computed when the predicate is parsed.
    pub fn eq_with<V, F>(self, f: F) -> Predicate
    where
        V: ValueType,
        F: FnOnce() -> V + Send + 'static,
    {
        compare(
            self,
            CompareOp::Eq,
            Operand::Deferred(Box::new(move || f().into_value())),
        )
    }

    pub fn eq_to(self, other: impl Into<Operand>) -> Predicate {
        compare(self, CompareOp::Eq, other)
    }

    pub fn ne(self, v: impl ValueType) -> Predicate {
        compare(self, CompareOp::Ne, value(v))
    }

    pub fn lt(self, v: impl ValueType) -> Predicate {
        compare(self, CompareOp::Lt, value(v))
    }

    pub fn gt(self, v: impl ValueType) -> Predicate {
        compare(self, CompareOp::Gt, value(v))
    }
}

impl std::fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

pub enum Operand {
    Property(PropertyPath),
    Value(Value),
    /// Evaluated once, at parse time
    Deferred(Box<dyn FnOnce() -> Value + Send>),
}

impl From<PropertyPath> for Operand {
    fn from(path: PropertyPath) -> Self {
        Operand::Property(path)
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Operand::Value(v)
    }
}

impl std::fmt::Debug for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operand::Property(path) => f.debug_tuple("Property").field(path).finish(),
            Operand::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Operand::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

#[derive(Debug)]
pub enum Predicate {
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn and(self, other: Predicate) -> Predicate {
        Predicate::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Predicate) -> Predicate {
        Predicate::Or(Box::new(self), Box::new(other))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }
}
