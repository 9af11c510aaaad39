//! Predicate to AST translation

use sea_query::Value;

use crate::convention::ConventionReader;
use crate::entity::{Entity, EntityInfo};
use crate::error::{ConfigurationError, Result, TranslationError};
use crate::expr::ast::Expression;
use crate::expr::predicate::{CompareOp, Operand, Predicate, PropertyPath};
use crate::value::{describe, is_null, FieldType};

/// Resolved comparison side
enum Side {
    Member {
        expr: Expression,
        label: String,
        field_type: FieldType,
    },
    Literal(Value),
}

/// Translates predicates about one entity into [`Expression`] trees.
///
/// ```rust
/// use quarry::expr::{prop, Expression, ExpressionParser};
/// use quarry::{ConventionReader, Entity, FieldType};
/// use sea_query::Value;
///
/// #[derive(Default, Entity)]
/// pub struct User { pub id: i32, pub username: String }
///
/// let reader = ConventionReader::default();
/// let ast = ExpressionParser::new(&reader)
///     .parse::<User>(prop("Username").eq("ada".to_string()))
///     .unwrap();
/// assert_eq!(
///     ast,
///     Expression::equals(
///         Expression::Property { name: "Username".into(), declared_type: FieldType::String },
///         Expression::Value(Value::String(Some("ada".into()))),
///     )
/// );
/// ```
pub struct ExpressionParser<'a> {
    reader: &'a ConventionReader,
}

impl<'a> ExpressionParser<'a> {
    pub fn new(reader: &'a ConventionReader) -> Self {
        Self { reader }
    }

    pub fn parse<E: Entity>(&self, predicate: Predicate) -> Result<Expression> {
        self.parse_for(E::info(), predicate)
    }

    pub fn parse_for(&self, info: &'static EntityInfo, predicate: Predicate) -> Result<Expression> {
        match predicate {
            Predicate::And(left, right) => {
                let left = self.parse_for(info, *left)?;
                let right = self.parse_for(info, *right)?;
                Ok(Expression::and([left, right]))
            }
            Predicate::Or(..) => Err(TranslationError::unsupported("disjunction (or)").into()),
            Predicate::Not(..) => Err(TranslationError::unsupported("negation (not)").into()),
            Predicate::Compare { op, left, right } => {
                if op != CompareOp::Eq {
                    return Err(TranslationError::unsupported(op.to_string()).into());
                }
                let left = self.resolve(info, left)?;
                let right = self.resolve(info, right)?;
                match (left, right) {
                    (member @ Side::Member { .. }, Side::Literal(v))
                    | (Side::Literal(v), member @ Side::Member { .. }) => {
                        self.member_equals(member, v)
                    }
                    (Side::Member { .. }, Side::Member { .. }) => Err(
                        TranslationError::unsupported("member-to-member comparison").into(),
                    ),
                    (Side::Literal(_), Side::Literal(_)) => Err(
                        TranslationError::unsupported("value-to-value comparison").into(),
                    ),
                }
            }
        }
    }

    fn member_equals(&self, member: Side, value: Value) -> Result<Expression> {
        let Side::Member {
            expr,
            label,
            field_type,
        } = member
        else {
            return Err(TranslationError::unsupported("value-to-value comparison").into());
        };
        if !is_null(&value) && !field_type.accepts(&value) {
            return Err(TranslationError::TypeMismatch {
                property: label,
                expected: field_type.to_string(),
                value: describe(&value),
            }
            .into());
        }
        Ok(Expression::equals(expr, Expression::Value(value)))
    }

    fn resolve(&self, info: &'static EntityInfo, operand: Operand) -> Result<Side> {
        match operand {
            Operand::Value(v) => Ok(Side::Literal(v)),
            Operand::Deferred(f) => {
                let v = f();
                if matches!(v, Value::Json(_)) {
                    return Err(TranslationError::unsupported(
                        "deferred call returning a non-scalar value",
                    )
                    .into());
                }
                Ok(Side::Literal(v))
            }
            Operand::Property(path) => self.resolve_path(info, &path),
        }
    }

    fn resolve_path(&self, info: &'static EntityInfo, path: &PropertyPath) -> Result<Side> {
        match path.segments() {
            [name] => {
                let metadata = self.reader.metadata_for(info)?;
                let mapping = metadata.require_property(name)?;
                Ok(Side::Member {
                    expr: Expression::Property {
                        name: name.clone(),
                        declared_type: mapping.property.field_type,
                    },
                    label: name.clone(),
                    field_type: mapping.property.field_type,
                })
            }
            [navigation, identity] => {
                let nav = info.navigation(navigation).ok_or_else(|| {
                    ConfigurationError::MissingNavigation {
                        entity: info.name.to_string(),
                        navigation: navigation.clone(),
                    }
                })?;
                if nav.is_collection() {
                    return Err(TranslationError::unsupported(format!(
                        "navigation through collection `{}`",
                        navigation
                    ))
                    .into());
                }
                let target_identity = self.reader.identity_property(nav.target())?;
                if target_identity.name() != identity {
                    return Err(TranslationError::unsupported(format!(
                        "`{}` is not the identity of `{}`",
                        path,
                        nav.target().name
                    ))
                    .into());
                }
                Ok(Side::Member {
                    expr: Expression::EntityReference {
                        navigation: navigation.clone(),
                        identity: identity.clone(),
                    },
                    label: path.to_string(),
                    field_type: target_identity.property.field_type,
                })
            }
            _ => Err(TranslationError::unsupported(format!("navigation chain `{}`", path)).into()),
        }
    }
}
