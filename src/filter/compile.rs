//! Lowering of parsed expressions into evaluable [`Condition`]s.
//!
//! The parser accepts the shape of the grammar; this pass enforces what the grammar cannot
//! express: every comparison is between exactly one allowed field and one constant, chains
//! have at most two operators, and a bare operand is never a condition by itself.

use std::fmt;

use super::parser::{BoolOp, CmpOp, Expr, Literal, Parser};
use crate::error::{PivotError, PivotOutcome};
use crate::types::{Row, Value, compare_i64_f64};

/// Desugared, validated filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Every child holds (short-circuits on the first `false`).
    All(Vec<Condition>),
    /// Some child holds (short-circuits on the first `true`).
    Any(Vec<Condition>),
    /// `field <op> literal`, always with the field on the left.
    Compare {
        field: String,
        op: CmpOp,
        literal: Literal,
    },
}

impl Condition {
    pub fn evaluate(&self, row: &Row<'_>) -> bool {
        match self {
            Condition::All(children) => children.iter().all(|c| c.evaluate(row)),
            Condition::Any(children) => children.iter().any(|c| c.evaluate(row)),
            Condition::Compare { field, op, literal } => {
                compare(row.get(field).unwrap_or(&Value::Null), *op, literal)
            }
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Condition::All(children) | Condition::Any(children) => {
                children.iter().for_each(|c| c.collect_fields(out));
            }
            Condition::Compare { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (children, joiner) = match self {
            Condition::All(children) => (children, " and "),
            Condition::Any(children) => (children, " or "),
            Condition::Compare { field, op, literal } => {
                if is_plain_identifier(field) {
                    return write!(f, "{field} {} {literal}", op.symbol());
                }
                return write!(f, "`{field}` {} {literal}", op.symbol());
            }
        };
        f.write_str("(")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(joiner)?;
            }
            write!(f, "{child}")?;
        }
        f.write_str(")")
    }
}

/// A filter expression that passed validation, together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    condition: Condition,
}

impl CompiledExpression {
    /// Parse and validate `text`, allowing only the field names in `allowed_vars`.
    pub fn compile<S: AsRef<str>>(text: &str, allowed_vars: &[S]) -> PivotOutcome<Self> {
        let expr = Parser::new(text).parse()?;
        let lowering = Lowering {
            source: text,
            allowed_vars,
        };
        Ok(Self {
            source: text.to_string(),
            condition: lowering.lower(expr)?,
        })
    }

    /// The expression as typed by the user.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The lowered condition tree.
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Field names referenced by the expression, in first-use order.
    pub fn referenced_fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.condition.collect_fields(&mut out);
        out
    }

    /// Test one row; fields missing from the row compare as null.
    pub fn evaluate(&self, row: &Row<'_>) -> bool {
        self.condition.evaluate(row)
    }
}

impl fmt::Display for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.condition.fmt(f)
    }
}

struct Lowering<'a, S> {
    source: &'a str,
    allowed_vars: &'a [S],
}

impl<S: AsRef<str>> Lowering<'_, S> {
    fn lower(&self, expr: Expr) -> PivotOutcome<Condition> {
        match expr {
            Expr::BoolOp { op, values } => {
                let children = values
                    .into_iter()
                    .map(|v| self.lower(v))
                    .collect::<PivotOutcome<Vec<_>>>()?;
                Ok(match op {
                    BoolOp::And => Condition::All(children),
                    BoolOp::Or => Condition::Any(children),
                })
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                if ops.len() > 2 {
                    return Err(self.disallowed(format!(
                        "comparison chains of {} operators are not allowed (at most 2)",
                        ops.len()
                    )));
                }
                let mut operands = Vec::with_capacity(comparators.len() + 1);
                operands.push(*left);
                operands.extend(comparators);

                let mut parts = ops
                    .iter()
                    .enumerate()
                    .map(|(i, op)| self.binary(&operands[i], *op, &operands[i + 1]))
                    .collect::<PivotOutcome<Vec<_>>>()?;
                if parts.len() == 1 {
                    Ok(parts.remove(0))
                } else {
                    Ok(Condition::All(parts))
                }
            }
            Expr::Name(name) => Err(self.disallowed(format!(
                "bare field '{name}' is not a condition; compare it to a constant"
            ))),
            Expr::Literal(literal) => Err(self.disallowed(format!(
                "bare constant {literal} is not a condition"
            ))),
        }
    }

    fn binary(&self, left: &Expr, op: CmpOp, right: &Expr) -> PivotOutcome<Condition> {
        match (left, right) {
            (Expr::Name(field), Expr::Literal(literal)) => self.comparison(field, op, literal),
            (Expr::Literal(literal), Expr::Name(field)) => {
                self.comparison(field, op.mirror(), literal)
            }
            (Expr::Name(a), Expr::Name(b)) => Err(self.disallowed(format!(
                "comparing field '{a}' with field '{b}' is not allowed"
            ))),
            (Expr::Literal(a), Expr::Literal(b)) => Err(self.disallowed(format!(
                "comparing constant {a} with constant {b} is not allowed"
            ))),
            _ => Err(self.disallowed(
                "comparison operands must be a field name or a constant",
            )),
        }
    }

    fn comparison(&self, field: &str, op: CmpOp, literal: &Literal) -> PivotOutcome<Condition> {
        if !self.allowed_vars.iter().any(|v| v.as_ref() == field) {
            return Err(self.disallowed(format!("name '{field}' is not an allowed field")));
        }
        Ok(Condition::Compare {
            field: field.to_string(),
            op,
            literal: literal.clone(),
        })
    }

    fn disallowed(&self, reason: impl Into<String>) -> PivotError {
        PivotError::DisallowedExpression {
            expression: self.source.to_string(),
            reason: reason.into(),
        }
    }
}

/// `value <op> literal`.
///
/// `None` only answers `==`/`!=`. Otherwise a null or differently-typed value is unequal to the
/// literal and unordered with it, as is NaN.
fn compare(value: &Value, op: CmpOp, literal: &Literal) -> bool {
    let ordering = match literal {
        Literal::None => {
            return match op {
                CmpOp::Eq => value.is_null(),
                CmpOp::NotEq => !value.is_null(),
                _ => false,
            };
        }
        Literal::Int(l) => match value {
            Value::Int64(v) => Some(v.cmp(l)),
            Value::Float64(v) if v.is_nan() => None,
            Value::Float64(v) => Some(compare_i64_f64(*l, *v).reverse()),
            _ => None,
        },
        Literal::Float(l) => match value {
            Value::Int64(_) if l.is_nan() => None,
            Value::Int64(v) => Some(compare_i64_f64(*v, *l)),
            Value::Float64(v) => v.partial_cmp(l),
            _ => None,
        },
        Literal::Str(l) => match value {
            Value::Utf8(v) => Some(v.as_str().cmp(l.as_str())),
            _ => None,
        },
        Literal::Bool(l) => match value {
            Value::Bool(v) => Some(v.cmp(l)),
            _ => None,
        },
    };

    match ordering {
        Some(ordering) => op.holds(ordering),
        None => op == CmpOp::NotEq,
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic());
    starts_ok
        && chars.all(|c| c == '_' || c.is_alphanumeric())
        && !matches!(
            name,
            "and" | "or" | "not" | "in" | "is" | "True" | "False" | "None"
        )
}

#[cfg(test)]
mod tests {
    use super::{CompiledExpression, Condition};
    use crate::error::PivotError;
    use crate::filter::parser::{CmpOp, Literal};
    use crate::types::{DataType, Field, Row, Schema, Value};

    const VARS: &[&str] = &["Fruit", "Year", "Weight", "Price/kg"];

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("Fruit", DataType::Utf8),
            Field::new("Year", DataType::Int64),
            Field::new("Weight", DataType::Float64),
            Field::new("Price/kg", DataType::Float64),
        ])
    }

    fn eval(expr: &str, values: &[Value]) -> bool {
        let schema = schema();
        let compiled = CompiledExpression::compile(expr, VARS).unwrap();
        compiled.evaluate(&Row::new(&schema, values))
    }

    fn row(fruit: &str, year: i64, weight: f64) -> Vec<Value> {
        vec![
            Value::text(fruit),
            Value::Int64(year),
            Value::Float64(weight),
            Value::Null,
        ]
    }

    #[test]
    fn chained_comparison_desugars_to_conjunction() {
        let compiled = CompiledExpression::compile("2022 <= Year < 2024", VARS).unwrap();
        assert_eq!(
            compiled.condition(),
            &Condition::All(vec![
                Condition::Compare {
                    field: "Year".to_string(),
                    op: CmpOp::GtE,
                    literal: Literal::Int(2022),
                },
                Condition::Compare {
                    field: "Year".to_string(),
                    op: CmpOp::Lt,
                    literal: Literal::Int(2024),
                },
            ])
        );
        assert_eq!(compiled.to_string(), "(Year >= 2022 and Year < 2024)");
    }

    #[test]
    fn mirrors_operator_when_field_is_on_the_right() {
        assert!(eval("5 < Weight", &row("Apple", 2022, 6.0)));
        assert!(!eval("5 < Weight", &row("Apple", 2022, 4.0)));
        assert!(eval("'Apple' == Fruit", &row("Apple", 2022, 4.0)));
    }

    #[test]
    fn evaluates_boolean_combinations() {
        let expr = r#"((Fruit == "Apple") and (Year == 2023)) or (Weight >= 4)"#;
        assert!(eval(expr, &row("Apple", 2023, 1.0)));
        assert!(eval(expr, &row("Pear", 2022, 4.0)));
        assert!(!eval(expr, &row("Apple", 2022, 1.0)));
    }

    #[test]
    fn numeric_literals_compare_across_int_and_float() {
        assert!(eval("Weight == 2", &row("Apple", 2022, 2.0)));
        assert!(eval("Year < 2022.5", &row("Apple", 2022, 2.0)));
    }

    #[test]
    fn large_integers_are_not_rounded_against_float_literals() {
        let year = 9_007_199_254_740_993;
        assert!(eval("Year > 9007199254740992.0", &row("Apple", year, 2.0)));
        assert!(!eval("Year == 9007199254740992.0", &row("Apple", year, 2.0)));
        assert!(eval("Weight < 9007199254740993", &row("Apple", 2022, 9_007_199_254_740_992.0)));
    }

    #[test]
    fn type_mismatch_and_null_are_unequal_and_unordered() {
        assert!(!eval("Fruit > 3", &row("Apple", 2022, 1.0)));
        assert!(eval("Fruit != 3", &row("Apple", 2022, 1.0)));
        assert!(!eval("`Price/kg` >= 0", &row("Apple", 2022, 1.0)));
        assert!(eval("`Price/kg` == None", &row("Apple", 2022, 1.0)));
        assert!(!eval("Fruit == None", &row("Apple", 2022, 1.0)));
    }

    #[test]
    fn quoted_identifier_round_trips_through_display() {
        let compiled = CompiledExpression::compile("`Price/kg` > 1.5", VARS).unwrap();
        assert_eq!(compiled.to_string(), "`Price/kg` > 1.5");
        assert_eq!(compiled.referenced_fields(), vec!["Price/kg"]);
    }

    #[test]
    fn rejects_invalid_comparisons() {
        for input in [
            "Year == Weight",
            "1 == 1",
            "Year",
            "2022",
            "1 < Year < 3 < 4",
            "Colour == 'red'",
            "(Year == 1) == True",
        ] {
            assert!(
                matches!(
                    CompiledExpression::compile(input, VARS),
                    Err(PivotError::DisallowedExpression { .. })
                ),
                "{input} should be disallowed"
            );
        }
    }
}
