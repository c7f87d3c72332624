use crate::ast::{BinaryOperator, Expression, UnaryOperator};
use crate::ast::Parser;
use crate::error::{CompileError, EvalError};
use crate::lex::{Token, TokenReader};
use fxhash::FxHashMap;
use std::fmt::{Display, Formatter};

/// Runtime value of the target dialect. Booleans are numbers.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalValue {
    Number(f64),
    String(String),
}
impl EvalValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Number(value) => Some(*value),
            EvalValue::String(_) => None,
        }
    }
    pub fn is_truthy(&self) -> bool {
        match self {
            EvalValue::Number(value) => *value != 0.0,
            EvalValue::String(value) => !value.is_empty(),
        }
    }
}
impl From<bool> for EvalValue {
    fn from(value: bool) -> Self {
        EvalValue::Number(if value { 1.0 } else { 0.0 })
    }
}
impl Display for EvalValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalValue::Number(value) => write!(f, "{value}"),
            EvalValue::String(value) => write!(f, "'{value}'"),
        }
    }
}

/// Statement of emitted code: `a=b;`, `c?{..}:{..};`, `return x;` or a bare
/// expression.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalStatement {
    Assign {
        target: String,
        value: Expression,
    },
    Eval(Expression),
    Return(Option<Expression>),
    Branch {
        condition: Expression,
        satisfied: Vec<EvalStatement>,
        unsatisfied: Vec<EvalStatement>,
    },
}

pub type NativeFunction = Box<dyn Fn(&[EvalValue]) -> Result<EvalValue, EvalError>>;

enum Flow {
    Continue,
    Return(Option<EvalValue>),
}

/// Small interpreter for emitted expressions and scripts, used to check that
/// compiled output behaves like its source. Unset variables read as 0.
pub struct Evaluator {
    variables: FxHashMap<String, EvalValue>,
    functions: FxHashMap<String, NativeFunction>,
}
impl Evaluator {
    pub fn new() -> Self {
        Evaluator {
            variables: FxHashMap::default(),
            functions: FxHashMap::default(),
        }
    }
    pub fn set(&mut self, name: &str, value: EvalValue) {
        self.variables.insert(name.to_string(), value);
    }
    pub fn set_number(&mut self, name: &str, value: f64) {
        self.set(name, EvalValue::Number(value));
    }
    pub fn get(&self, name: &str) -> Option<&EvalValue> {
        self.variables.get(name)
    }
    pub fn number(&self, name: &str) -> f64 {
        self.get(name).and_then(EvalValue::as_number).unwrap_or(0.0)
    }
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[EvalValue]) -> Result<EvalValue, EvalError> + 'static,
    {
        self.functions.insert(name.to_string(), Box::new(function));
    }
    pub fn evaluate_source(&mut self, source: &str) -> Result<EvalValue, EvalError> {
        let expression = crate::ast::parse_expression(source)?;
        self.evaluate(&expression)
    }
    /// Runs a script and returns the value of its `return`, if one ran.
    pub fn execute_source(&mut self, source: &str) -> Result<Option<EvalValue>, EvalError> {
        let statements = parse_script(source)?;
        self.execute(&statements)
    }
    pub fn execute(&mut self, statements: &[EvalStatement]) -> Result<Option<EvalValue>, EvalError> {
        match self.execute_block(statements)? {
            Flow::Continue => Ok(None),
            Flow::Return(value) => Ok(value),
        }
    }
    fn execute_block(&mut self, statements: &[EvalStatement]) -> Result<Flow, EvalError> {
        for statement in statements {
            match statement {
                EvalStatement::Assign { target, value } => {
                    let value = self.evaluate(value)?;
                    self.variables.insert(target.clone(), value);
                }
                EvalStatement::Eval(expression) => {
                    self.evaluate(expression)?;
                }
                EvalStatement::Return(expression) => {
                    let value = expression
                        .as_ref()
                        .map(|expression| self.evaluate(expression))
                        .transpose()?;
                    return Ok(Flow::Return(value));
                }
                EvalStatement::Branch {
                    condition,
                    satisfied,
                    unsatisfied,
                } => {
                    let arm = if self.evaluate(condition)?.is_truthy() {
                        satisfied
                    } else {
                        unsatisfied
                    };
                    if let Flow::Return(value) = self.execute_block(arm)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }
    pub fn evaluate(&self, expression: &Expression) -> Result<EvalValue, EvalError> {
        Ok(match expression {
            Expression::Int(value) => EvalValue::Number(*value as f64),
            Expression::Float(value) => EvalValue::Number(*value),
            Expression::Bool(value) => EvalValue::from(*value),
            Expression::String(value) => EvalValue::String(value.to_string()),
            Expression::Variable(name) => self
                .variables
                .get(name.as_ref())
                .cloned()
                .unwrap_or(EvalValue::Number(0.0)),
            Expression::Raw(text) => {
                let expression = crate::ast::parse_expression(text)?;
                self.evaluate(&expression)?
            }
            Expression::Placeholder(placeholder) => {
                return Err(EvalError::Unsupported(format!(
                    "unresolved placeholder $[{}]",
                    placeholder.name
                )));
            }
            Expression::Index { .. } => {
                return Err(EvalError::Unsupported("indexing".to_string()));
            }
            Expression::Call {
                function,
                arguments,
            } => {
                let arguments = arguments
                    .iter()
                    .map(|argument| self.evaluate(argument))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(function.as_ref(), &arguments)?
            }
            Expression::Unary {
                operator,
                expression,
            } => {
                let value = self.evaluate(expression)?;
                match operator {
                    UnaryOperator::Not => EvalValue::from(!value.is_truthy()),
                    UnaryOperator::Negate => EvalValue::Number(-number(&value)?),
                }
            }
            Expression::Conditional {
                condition,
                satisfied,
                unsatisfied,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(satisfied)?
                } else {
                    match unsatisfied {
                        Some(unsatisfied) => self.evaluate(unsatisfied)?,
                        None => EvalValue::Number(0.0),
                    }
                }
            }
            Expression::Binary {
                operator,
                first,
                second,
            } => self.evaluate_binary(*operator, first, second)?,
        })
    }
    fn evaluate_binary(
        &self,
        operator: BinaryOperator,
        first: &Expression,
        second: &Expression,
    ) -> Result<EvalValue, EvalError> {
        match operator {
            BinaryOperator::Coalesce => {
                if let Expression::Variable(name) = first {
                    return match self.variables.get(name.as_ref()) {
                        Some(value) => Ok(value.clone()),
                        None => self.evaluate(second),
                    };
                }
                return self.evaluate(first);
            }
            BinaryOperator::Or => {
                return Ok(EvalValue::from(
                    self.evaluate(first)?.is_truthy() || self.evaluate(second)?.is_truthy(),
                ));
            }
            BinaryOperator::And => {
                return Ok(EvalValue::from(
                    self.evaluate(first)?.is_truthy() && self.evaluate(second)?.is_truthy(),
                ));
            }
            _ => {}
        }
        let first = self.evaluate(first)?;
        let second = self.evaluate(second)?;
        if let (EvalValue::String(a), EvalValue::String(b)) = (&first, &second) {
            return match operator {
                BinaryOperator::Equals => Ok(EvalValue::from(a == b)),
                BinaryOperator::NotEquals => Ok(EvalValue::from(a != b)),
                _ => Err(EvalError::TypeMismatch(format!(
                    "'{operator}' is not defined for strings"
                ))),
            };
        }
        let (a, b) = (number(&first)?, number(&second)?);
        Ok(match operator {
            BinaryOperator::Equals => EvalValue::from(a == b),
            BinaryOperator::NotEquals => EvalValue::from(a != b),
            BinaryOperator::Less => EvalValue::from(a < b),
            BinaryOperator::LessEquals => EvalValue::from(a <= b),
            BinaryOperator::Greater => EvalValue::from(a > b),
            BinaryOperator::GreaterEquals => EvalValue::from(a >= b),
            BinaryOperator::Add => EvalValue::Number(a + b),
            BinaryOperator::Subtract => EvalValue::Number(a - b),
            BinaryOperator::Multiply => EvalValue::Number(a * b),
            BinaryOperator::Divide => EvalValue::Number(a / b),
            BinaryOperator::Modulo => EvalValue::Number(a % b),
            BinaryOperator::Coalesce | BinaryOperator::Or | BinaryOperator::And => {
                unreachable!("handled above")
            }
        })
    }
    fn call(&self, function: &str, arguments: &[EvalValue]) -> Result<EvalValue, EvalError> {
        if let Some(native) = self.functions.get(function) {
            return native(arguments);
        }
        let numbers = arguments.iter().map(number).collect::<Result<Vec<_>, _>>()?;
        let argument = |index: usize| {
            numbers.get(index).copied().ok_or_else(|| {
                EvalError::TypeMismatch(format!("{function} expects {} arguments", index + 1))
            })
        };
        Ok(EvalValue::Number(match function {
            "math.floor" => argument(0)?.floor(),
            "math.ceil" => argument(0)?.ceil(),
            "math.round" => argument(0)?.round(),
            "math.abs" => argument(0)?.abs(),
            "math.mod" => argument(0)? % argument(1)?,
            "math.min" => argument(0)?.min(argument(1)?),
            "math.max" => argument(0)?.max(argument(1)?),
            _ => return Err(EvalError::UnknownFunction(function.to_string())),
        }))
    }
}
impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn number(value: &EvalValue) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| EvalError::TypeMismatch(format!("expected a number, found {value}")))
}

/// Parses emitted script text. Reuses the expression grammar and adds the
/// statement forms emission produces.
pub fn parse_script(source: &str) -> Result<Vec<EvalStatement>, CompileError> {
    let mut parser = Parser::new(TokenReader::lex(source)?);
    let statements = parse_statements(&mut parser)?;
    if !parser.tokens.is_eof() {
        return Err(parser.unexpected("end of script"));
    }
    Ok(statements)
}

fn parse_statements(parser: &mut Parser) -> Result<Vec<EvalStatement>, CompileError> {
    let mut statements = Vec::new();
    loop {
        match parser.tokens.peek() {
            Token::RBrace | Token::EOF => return Ok(statements),
            Token::SemiColon => {
                parser.tokens.pop();
            }
            _ => {
                statements.push(parse_statement(parser)?);
                match parser.tokens.peek() {
                    Token::SemiColon => {
                        parser.tokens.pop();
                    }
                    Token::RBrace | Token::EOF => {}
                    _ => return Err(parser.unexpected("';'")),
                }
            }
        }
    }
}

fn parse_statement(parser: &mut Parser) -> Result<EvalStatement, CompileError> {
    if *parser.tokens.peek() == Token::Return {
        parser.tokens.pop();
        return Ok(EvalStatement::Return(match parser.tokens.peek() {
            Token::SemiColon | Token::RBrace | Token::EOF => None,
            _ => Some(parser.parse_expression()?),
        }));
    }
    let first = parser.parse_binary(BinaryOperator::Coalesce.precedence())?;
    match parser.tokens.peek() {
        Token::Assign => {
            let position = parser.tokens.position();
            parser.tokens.pop();
            let Expression::Variable(target) = first else {
                return Err(CompileError::syntax(position, "invalid assignment target"));
            };
            Ok(EvalStatement::Assign {
                target: target.to_string(),
                value: parser.parse_expression()?,
            })
        }
        Token::Question if *parser.tokens.peek_more(1) == Token::LBrace => {
            parser.tokens.pop();
            let satisfied = parse_braced(parser)?;
            let unsatisfied = if *parser.tokens.peek() == Token::Colon {
                parser.tokens.pop();
                parse_braced(parser)?
            } else {
                Vec::new()
            };
            Ok(EvalStatement::Branch {
                condition: first,
                satisfied,
                unsatisfied,
            })
        }
        _ => Ok(EvalStatement::Eval(parser.parse_conditional_tail(first)?)),
    }
}

fn parse_braced(parser: &mut Parser) -> Result<Vec<EvalStatement>, CompileError> {
    parser.expect(Token::LBrace, "'{'")?;
    let statements = parse_statements(parser)?;
    parser.expect(Token::RBrace, "'}'")?;
    Ok(statements)
}
