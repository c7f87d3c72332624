use crate::ast::{Accessor, BinaryOperator, Expression, Placeholder, Program, Statement, StatementId};
use crate::environment::{Bindings, ScopeStack};
use crate::error::CompileError;
use crate::variant::Value;

/// Loop-free statement tree, every placeholder replaced by its value.
#[derive(Clone, Debug, PartialEq)]
pub enum Lowered {
    Assign {
        target: Expression,
        value: Expression,
    },
    Eval(Expression),
    Return(Option<Expression>),
    Branch {
        condition: Expression,
        satisfied: Vec<Lowered>,
        unsatisfied: Vec<Lowered>,
    },
}

/// Loop iterations a single procedure may unroll in total, nested loops
/// included.
pub const ITERATION_LIMIT: usize = 1 << 16;

pub fn lower(program: &Program, bindings: &Bindings) -> Result<Vec<Lowered>, CompileError> {
    lower_with_limit(program, bindings, ITERATION_LIMIT)
}

pub fn lower_with_limit(
    program: &Program,
    bindings: &Bindings,
    iteration_limit: usize,
) -> Result<Vec<Lowered>, CompileError> {
    let mut lowerer = Lowerer {
        program,
        bindings,
        scope: ScopeStack::new(),
        iterations_left: iteration_limit,
    };
    let mut lowered = Vec::new();
    lowerer.lower_block(&program.body, &mut lowered)?;
    Ok(lowered)
}

struct Lowerer<'a> {
    program: &'a Program,
    bindings: &'a Bindings,
    scope: ScopeStack,
    iterations_left: usize,
}
impl<'a> Lowerer<'a> {
    fn lower_block(
        &mut self,
        block: &[StatementId],
        out: &mut Vec<Lowered>,
    ) -> Result<(), CompileError> {
        for id in block {
            self.lower_statement(*id, out)?;
        }
        Ok(())
    }
    fn lower_statement(&mut self, id: StatementId, out: &mut Vec<Lowered>) -> Result<(), CompileError> {
        let program = self.program;
        match program.statement(id) {
            Statement::Assign {
                target,
                operator,
                value,
            } => {
                let target = self.resolve(target)?;
                let value = self.resolve(value)?;
                let value = match operator {
                    Some(operator) => Expression::binary(*operator, target.clone(), value),
                    None => value,
                };
                out.push(Lowered::Assign { target, value });
            }
            Statement::Eval { expression } => out.push(Lowered::Eval(self.resolve(expression)?)),
            Statement::Return { expression } => out.push(Lowered::Return(
                expression
                    .as_ref()
                    .map(|expression| self.resolve(expression))
                    .transpose()?,
            )),
            Statement::If {
                condition,
                satisfied,
                unsatisfied,
            } => {
                let condition = self.resolve(condition)?;
                let mut satisfied_out = Vec::new();
                self.lower_block(satisfied, &mut satisfied_out)?;
                let mut unsatisfied_out = Vec::new();
                if let Some(unsatisfied) = unsatisfied {
                    self.lower_block(unsatisfied, &mut unsatisfied_out)?;
                }
                out.push(Lowered::Branch {
                    condition,
                    satisfied: satisfied_out,
                    unsatisfied: unsatisfied_out,
                });
            }
            Statement::For {
                variable,
                start,
                end,
                inclusive,
                body,
            } => {
                let bound = |lowerer: &Self, expression: &Expression| {
                    match lowerer.resolve(expression)? {
                        Expression::Int(value) => Ok(value),
                        Expression::Float(value) if value.fract() == 0.0 => Ok(value as i64),
                        _ => Err(CompileError::NonConstantLoopBound {
                            variable: variable.to_string(),
                        }),
                    }
                };
                let start = bound(self, start)?;
                let end = bound(self, end)?;
                let end = if *inclusive { end.saturating_add(1) } else { end };
                let count = usize::try_from(end.saturating_sub(start)).unwrap_or(0);
                if count > self.iterations_left {
                    return Err(CompileError::UnsupportedLoop {
                        message: format!(
                            "loop over \"{variable}\" unrolls {count} iterations, only {} are left",
                            self.iterations_left
                        ),
                    });
                }
                self.iterations_left -= count;
                for value in start..end {
                    self.scope.push(variable.clone(), value);
                    let result = self.lower_block(body, out);
                    self.scope.pop();
                    result?;
                }
            }
        }
        Ok(())
    }
    fn resolve(&self, expression: &Expression) -> Result<Expression, CompileError> {
        Ok(match expression {
            Expression::Variable(name) => match self.scope.get_variable(name.as_ref()) {
                Some(value) => Expression::Int(value),
                None => expression.clone(),
            },
            Expression::Placeholder(placeholder) => self.resolve_placeholder(placeholder)?,
            Expression::Call {
                function,
                arguments,
            } => Expression::Call {
                function: function.clone(),
                arguments: arguments
                    .iter()
                    .map(|argument| self.resolve(argument))
                    .collect::<Result<_, _>>()?,
            },
            Expression::Index { target, index } => Expression::Index {
                target: Box::new(self.resolve(target)?),
                index: Box::new(self.resolve(index)?),
            },
            Expression::Binary {
                operator,
                first,
                second,
            } => Expression::binary(*operator, self.resolve(first)?, self.resolve(second)?),
            Expression::Unary {
                operator,
                expression,
            } => Expression::Unary {
                operator: *operator,
                expression: Box::new(self.resolve(expression)?),
            },
            Expression::Conditional {
                condition,
                satisfied,
                unsatisfied,
            } => Expression::Conditional {
                condition: Box::new(self.resolve(condition)?),
                satisfied: Box::new(self.resolve(satisfied)?),
                unsatisfied: unsatisfied
                    .as_ref()
                    .map(|unsatisfied| self.resolve(unsatisfied).map(Box::new))
                    .transpose()?,
            },
            literal => literal.clone(),
        })
    }
    fn resolve_placeholder(&self, placeholder: &Placeholder) -> Result<Expression, CompileError> {
        let name = placeholder.name.as_ref();
        let loop_value = self.scope.get_variable(name).map(Value::Int);
        let value = match (&loop_value, self.bindings.get(name)) {
            (Some(value), _) | (None, Some(value)) => value,
            (None, None) => {
                return Err(CompileError::UnresolvedBinding {
                    name: name.to_string(),
                });
            }
        };
        let value = match &placeholder.accessor {
            None => value,
            Some(accessor) => self.access(name, value, accessor)?,
        };
        if !value.is_scalar() {
            return Err(CompileError::NotScalar {
                name: name.to_string(),
            });
        }
        match &placeholder.adjustment {
            None => Ok(value_to_expression(value)),
            Some((operator, operand)) => adjust(name, value, *operator, operand),
        }
    }
    fn access<'v>(
        &self,
        name: &str,
        value: &'v Value,
        accessor: &Accessor,
    ) -> Result<&'v Value, CompileError> {
        let index = match accessor {
            Accessor::Index(index) => *index,
            Accessor::Variable(variable) => self
                .scope
                .get_variable(variable.as_ref())
                .or_else(|| self.bindings.get(variable.as_ref()).and_then(Value::as_integer))
                .ok_or_else(|| CompileError::UnresolvedBinding {
                    name: variable.to_string(),
                })?,
            Accessor::Field(field) => {
                return match value {
                    Value::Mapping(values) => {
                        values
                            .get(field.as_ref())
                            .ok_or_else(|| CompileError::FieldNotFound {
                                name: name.to_string(),
                                field: field.to_string(),
                            })
                    }
                    _ => Err(CompileError::NotIndexable {
                        name: name.to_string(),
                        kind: value.type_name(),
                    }),
                };
            }
        };
        match value {
            Value::Sequence(values) => usize::try_from(index)
                .ok()
                .and_then(|index| values.get(index))
                .ok_or(CompileError::IndexOutOfRange {
                    name: name.to_string(),
                    index,
                    length: values.len(),
                }),
            Value::Mapping(values) => {
                values
                    .get(&index.to_string())
                    .ok_or_else(|| CompileError::FieldNotFound {
                        name: name.to_string(),
                        field: index.to_string(),
                    })
            }
            _ => Err(CompileError::NotIndexable {
                name: name.to_string(),
                kind: value.type_name(),
            }),
        }
    }
}

pub(crate) fn value_to_expression(value: &Value) -> Expression {
    match value {
        Value::Int(value) => Expression::Int(*value),
        Value::Float(value) => Expression::Float(*value),
        Value::Bool(value) => Expression::Bool(*value),
        Value::Expression(text) => Expression::Raw(text.clone()),
        Value::Sequence(_) | Value::Mapping(_) => Expression::Raw(value.to_string()),
    }
}

/// Applies `$[name OP operand]`. Numbers fold to a literal; expressions keep
/// the operation for the runtime.
fn adjust(
    name: &str,
    value: &Value,
    operator: BinaryOperator,
    operand: &Value,
) -> Result<Expression, CompileError> {
    if let Value::Expression(text) = value {
        return Ok(Expression::binary(
            operator,
            Expression::Raw(text.clone()),
            value_to_expression(operand),
        ));
    }
    let non_numeric = || CompileError::NonNumericAdjustment {
        name: name.to_string(),
        operator: operator.to_string(),
    };
    if let (Value::Int(first), Value::Int(second)) = (value, operand) {
        let folded = match operator {
            BinaryOperator::Add => first.checked_add(*second),
            BinaryOperator::Subtract => first.checked_sub(*second),
            BinaryOperator::Multiply => first.checked_mul(*second),
            BinaryOperator::Divide if *second != 0 && first % second == 0 => Some(first / second),
            _ => None,
        };
        if let Some(folded) = folded {
            return Ok(Expression::Int(folded));
        }
    }
    let first = value.as_f64().ok_or_else(non_numeric)?;
    let second = operand.as_f64().ok_or_else(non_numeric)?;
    Ok(Expression::Float(match operator {
        BinaryOperator::Add => first + second,
        BinaryOperator::Subtract => first - second,
        BinaryOperator::Multiply => first * second,
        BinaryOperator::Divide => first / second,
        _ => return Err(non_numeric()),
    }))
}
