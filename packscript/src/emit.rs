use crate::ast::{BinaryOperator, Expression, UnaryOperator, UNARY_PRECEDENCE};
use crate::lower::Lowered;
use std::fmt::Write;

const CONDITIONAL_PRECEDENCE: u8 = 0;
const ATOM_PRECEDENCE: u8 = u8::MAX;

pub fn emit_statements(statements: &[Lowered]) -> String {
    let mut output = String::new();
    for statement in statements {
        emit_statement(statement, &mut output);
    }
    output
}

fn emit_statement(statement: &Lowered, output: &mut String) {
    match statement {
        Lowered::Assign { target, value } => {
            let _ = write!(output, "{}={};", emit_expression(target), emit_expression(value));
        }
        Lowered::Eval(expression) => {
            let _ = write!(output, "{};", emit_expression(expression));
        }
        Lowered::Return(Some(expression)) => {
            let _ = write!(output, "return {};", emit_expression(expression));
        }
        Lowered::Return(None) => output.push_str("return;"),
        Lowered::Branch {
            condition,
            satisfied,
            unsatisfied,
        } => {
            if satisfied.is_empty() && unsatisfied.is_empty() {
                return;
            }
            output.push_str(&emit_condition(condition));
            output.push_str("?{");
            output.push_str(&emit_statements(satisfied));
            output.push('}');
            if !unsatisfied.is_empty() {
                output.push_str(":{");
                output.push_str(&emit_statements(unsatisfied));
                output.push('}');
            }
            output.push(';');
        }
    }
}

/// Condition of a conditional. `??` binds looser than `?:` at runtime, so any
/// condition using it is parenthesized as a whole. So are nested conditionals,
/// spliced or not.
fn emit_condition(condition: &Expression) -> String {
    let text = emit_expression(condition);
    let nested = match condition {
        Expression::Conditional { .. } => true,
        Expression::Raw(text) => text.contains('?') && !is_atomic(text),
        _ => false,
    };
    if nested || condition.contains_operator(BinaryOperator::Coalesce) {
        format!("({text})")
    } else {
        text
    }
}

pub fn emit_expression(expression: &Expression) -> String {
    match expression {
        Expression::Int(value) => value.to_string(),
        Expression::Float(value) => format_float(*value),
        Expression::Bool(value) => value.to_string(),
        Expression::String(value) => format!("'{value}'"),
        Expression::Variable(name) => name.to_string(),
        Expression::Placeholder(placeholder) => format!("$[{}]", placeholder.name),
        Expression::Raw(text) => text.clone(),
        Expression::Call {
            function,
            arguments,
        } => format!(
            "{function}({})",
            arguments
                .iter()
                .map(emit_expression)
                .collect::<Vec<_>>()
                .join(",")
        ),
        Expression::Index { target, index } => format!(
            "{}[{}]",
            emit_operand(target, ATOM_PRECEDENCE, false),
            emit_expression(index)
        ),
        Expression::Binary {
            operator,
            first,
            second,
        } => {
            let precedence = operator.precedence();
            let additive = matches!(operator, BinaryOperator::Add | BinaryOperator::Subtract);
            format!(
                "{}{operator}{}",
                emit_operand(first, precedence, false),
                emit_operand(second, precedence + 1, additive)
            )
        }
        Expression::Unary {
            operator,
            expression,
        } => {
            let operand = emit_operand(expression, UNARY_PRECEDENCE, true);
            match operator {
                UnaryOperator::Not => format!("!{operand}"),
                UnaryOperator::Negate => format!("-{operand}"),
            }
        }
        Expression::Conditional {
            condition,
            satisfied,
            unsatisfied,
        } => {
            let mut text = format!(
                "{}?{}",
                emit_condition(condition),
                emit_branch(satisfied, CONDITIONAL_PRECEDENCE + 1)
            );
            if let Some(unsatisfied) = unsatisfied {
                text.push(':');
                text.push_str(&emit_branch(unsatisfied, CONDITIONAL_PRECEDENCE));
            }
            text
        }
    }
}

/// Branch of a conditional. A top-level `??` would swallow the conditional
/// around it, so it keeps its parens.
fn emit_branch(expression: &Expression, min_precedence: u8) -> String {
    let coalesces = match expression {
        Expression::Binary { operator, .. } => *operator == BinaryOperator::Coalesce,
        Expression::Raw(text) => text.contains("??") && !is_atomic(text),
        _ => false,
    };
    let text = emit_operand(expression, min_precedence, false);
    if coalesces && precedence_of(expression) >= min_precedence {
        format!("({text})")
    } else {
        text
    }
}

/// Emits `expression` as an operand, parenthesized when it binds looser than
/// `min_precedence`. With `wrap_negative` negative literals get parens too, so
/// `a - -1` prints as `a-(-1)`.
fn emit_operand(expression: &Expression, min_precedence: u8, wrap_negative: bool) -> String {
    let text = emit_expression(expression);
    let negative_literal = match expression {
        Expression::Int(value) => *value < 0,
        Expression::Float(value) => value.is_sign_negative(),
        _ => false,
    };
    if precedence_of(expression) < min_precedence || (wrap_negative && negative_literal) {
        format!("({text})")
    } else {
        text
    }
}

fn precedence_of(expression: &Expression) -> u8 {
    match expression {
        Expression::Binary { operator, .. } => operator.precedence(),
        Expression::Unary { .. } => UNARY_PRECEDENCE,
        Expression::Conditional { .. } => CONDITIONAL_PRECEDENCE,
        Expression::Raw(text) if !is_atomic(text) => CONDITIONAL_PRECEDENCE,
        _ => ATOM_PRECEDENCE,
    }
}

/// Whether spliced text can sit next to an operator without parens: a name,
/// a number, a call or a fully parenthesized group.
pub fn is_atomic(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }
    let name_end = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
        .unwrap_or(text.len());
    if name_end == text.len() {
        return true;
    }
    if !text[name_end..].starts_with('(') {
        return false;
    }
    // The group opened at `name_end` has to close on the last character.
    let mut depth = 0usize;
    let mut in_string = false;
    for (offset, c) in text[name_end..].char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return name_end + offset == text.len() - 1;
                }
            }
            _ => {}
        }
    }
    false
}

pub fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() && value.abs() < 1e15 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::parse_expression;

    fn round_trip(source: &str) -> String {
        emit_expression(&parse_expression(source).unwrap())
    }

    #[test]
    fn parens_follow_precedence() {
        assert_eq!(round_trip("(a + b) * c"), "(a+b)*c");
        assert_eq!(round_trip("a + (b * c)"), "a+b*c");
        assert_eq!(round_trip("a - (b - c)"), "a-(b-c)");
        assert_eq!(round_trip("(a - b) - c"), "a-b-c");
        assert_eq!(round_trip("!(a && b)"), "!(a&&b)");
        assert_eq!(round_trip("a - -1"), "a-(-1)");
        assert_eq!(round_trip("a == -1"), "a==-1");
    }

    #[test]
    fn coalescing_conditions_are_wrapped() {
        assert_eq!(round_trip("v.a ?? 0 ? 1 : 2"), "(v.a??0)?1:2");
        assert_eq!(round_trip("a ? b : c ? d : e"), "a?b:c?d:e");
    }

    #[test]
    fn coalescing_branches_keep_their_parens() {
        assert_eq!(round_trip("v.c ? 1 : (v.y ?? 0)"), "v.c?1:(v.y??0)");
        assert_eq!(round_trip("v.c ? (v.y ?? 0) : 1"), "v.c?(v.y??0):1");
        let spliced = Expression::Conditional {
            condition: Box::new(Expression::Variable("v.c".into())),
            satisfied: Box::new(Expression::Int(1)),
            unsatisfied: Some(Box::new(Expression::Raw("v.y??0".to_string()))),
        };
        assert_eq!(emit_expression(&spliced), "v.c?1:(v.y??0)");
    }

    #[test]
    fn spliced_text_is_wrapped_when_needed() {
        let sum = Expression::binary(
            BinaryOperator::Multiply,
            Expression::Raw("v.a+1".to_string()),
            Expression::Raw("math.abs(v.b)".to_string()),
        );
        assert_eq!(emit_expression(&sum), "(v.a+1)*math.abs(v.b)");
        assert!(is_atomic("(a?b:c)"));
        assert!(!is_atomic("(a)+(b)"));
        assert!(!is_atomic("q.f(1)+2"));
        let spliced = Expression::Conditional {
            condition: Box::new(Expression::Raw("v.i==0?1:0".to_string())),
            satisfied: Box::new(Expression::Int(2)),
            unsatisfied: Some(Box::new(Expression::Int(3))),
        };
        assert_eq!(emit_expression(&spliced), "(v.i==0?1:0)?2:3");
    }

    #[test]
    fn strings_and_floats() {
        assert_eq!(round_trip("q.f('slot', 1.0, 0.125)"), "q.f('slot',1.0,0.125)");
    }
}
