use sea_query::Value;

use crate::value::FieldType;

/// Portable predicate tree.
///
/// Produced by the parser with every value already evaluated; compared
/// structurally.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A mapped property of the queried entity
    Property {
        name: String,
        declared_type: FieldType,
    },
    Value(Value),
    /// The identity of the entity held by a to-one navigation, stored on the
    /// queried entity's table as a foreign key
    EntityReference { navigation: String, identity: String },
    Equals(Box<Expression>, Box<Expression>),
    /// Conjunction, never nested
    And(Vec<Expression>),
}

impl Expression {
    pub fn equals(left: Expression, right: Expression) -> Self {
        Expression::Equals(Box::new(left), Box::new(right))
    }

    /// Conjunction of `terms` in order, with nested conjunctions spliced in
    /// place. A single term is returned as is.
    pub fn and(terms: impl IntoIterator<Item = Expression>) -> Self {
        let mut flat = Vec::new();
        for term in terms {
            match term {
                Expression::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Expression::And(flat)
        }
    }

    /// The top-level terms: the members of an `And`, or the expression itself.
    pub fn terms(&self) -> &[Expression] {
        match self {
            Expression::And(terms) => terms,
            other => std::slice::from_ref(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eq(name: &str, v: i32) -> Expression {
        Expression::equals(
            Expression::Property {
                name: name.to_string(),
                declared_type: FieldType::Int,
            },
            Expression::Value(Value::Int(Some(v))),
        )
    }

    #[test]
    fn test_and_flattens_in_order() {
        let nested = Expression::and([Expression::and([eq("A", 1), eq("B", 2)]), eq("C", 3)]);
        assert_eq!(nested, Expression::And(vec![eq("A", 1), eq("B", 2), eq("C", 3)]));
        assert_eq!(nested.terms().len(), 3);
    }

    #[test]
    fn test_single_term_and_is_the_term() {
        assert_eq!(Expression::and([eq("A", 1)]), eq("A", 1));
        assert_eq!(eq("A", 1).terms(), &[eq("A", 1)]);
    }
}
