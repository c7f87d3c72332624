use crate::error::CompileError;
use crate::lex::{Token, TokenReader};
use crate::variant::Value;
use immutable_string::ImmutableString;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatementId(u32);

/// Statements live in one arena and refer to their children by id, so each
/// lowering pass walks the tree without owning or cloning it.
#[derive(Debug, Default)]
pub struct Program {
    statements: Vec<Statement>,
    pub body: Vec<StatementId>,
}
impl Program {
    pub fn statement(&self, id: StatementId) -> &Statement {
        &self.statements[id.0 as usize]
    }
    fn alloc(&mut self, statement: Statement) -> StatementId {
        self.statements.push(statement);
        StatementId((self.statements.len() - 1) as u32)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `target = value`, or `target op= value` when `operator` is set.
    /// Increments parse as `+= 1`.
    Assign {
        target: Expression,
        operator: Option<BinaryOperator>,
        value: Expression,
    },
    Eval {
        expression: Expression,
    },
    If {
        condition: Expression,
        satisfied: Vec<StatementId>,
        unsatisfied: Option<Vec<StatementId>>,
    },
    For {
        variable: ImmutableString,
        start: Expression,
        end: Expression,
        inclusive: bool,
        body: Vec<StatementId>,
    },
    Return {
        expression: Option<Expression>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(ImmutableString),
    Variable(ImmutableString),
    Placeholder(Placeholder),
    /// Expression text spliced in from a binding.
    Raw(String),
    Call {
        function: ImmutableString,
        arguments: Vec<Expression>,
    },
    Index {
        target: Box<Expression>,
        index: Box<Expression>,
    },
    Binary {
        operator: BinaryOperator,
        first: Box<Expression>,
        second: Box<Expression>,
    },
    Unary {
        operator: UnaryOperator,
        expression: Box<Expression>,
    },
    Conditional {
        condition: Box<Expression>,
        satisfied: Box<Expression>,
        unsatisfied: Option<Box<Expression>>,
    },
}
impl Expression {
    pub fn binary(operator: BinaryOperator, first: Expression, second: Expression) -> Self {
        Expression::Binary {
            operator,
            first: Box::new(first),
            second: Box::new(second),
        }
    }
    pub fn contains_operator(&self, wanted: BinaryOperator) -> bool {
        match self {
            Expression::Binary {
                operator,
                first,
                second,
            } => {
                *operator == wanted
                    || first.contains_operator(wanted)
                    || second.contains_operator(wanted)
            }
            Expression::Unary { expression, .. } => expression.contains_operator(wanted),
            Expression::Index { target, index } => {
                target.contains_operator(wanted) || index.contains_operator(wanted)
            }
            Expression::Call { arguments, .. } => arguments
                .iter()
                .any(|argument| argument.contains_operator(wanted)),
            Expression::Conditional {
                condition,
                satisfied,
                unsatisfied,
            } => {
                condition.contains_operator(wanted)
                    || satisfied.contains_operator(wanted)
                    || unsatisfied
                        .as_ref()
                        .is_some_and(|unsatisfied| unsatisfied.contains_operator(wanted))
            }
            Expression::Raw(text) => text.contains(wanted.as_ref()),
            _ => false,
        }
    }
}

/// `$[name]`, `$[name[2]]`, `$[name.field]`, `$[name[i]-1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub name: ImmutableString,
    pub accessor: Option<Accessor>,
    pub adjustment: Option<(BinaryOperator, Value)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Index(i64),
    /// Index taken from an enclosing loop variable.
    Variable(ImmutableString),
    Field(ImmutableString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum BinaryOperator {
    #[strum(serialize = "??")]
    Coalesce,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "==")]
    Equals,
    #[strum(serialize = "!=")]
    NotEquals,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEquals,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEquals,
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "%")]
    Modulo,
}
impl BinaryOperator {
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Coalesce => 1,
            BinaryOperator::Or => 2,
            BinaryOperator::And => 3,
            BinaryOperator::Equals | BinaryOperator::NotEquals => 4,
            BinaryOperator::Less
            | BinaryOperator::LessEquals
            | BinaryOperator::Greater
            | BinaryOperator::GreaterEquals => 5,
            BinaryOperator::Add | BinaryOperator::Subtract => 6,
            BinaryOperator::Multiply | BinaryOperator::Divide | BinaryOperator::Modulo => 7,
        }
    }
}
pub const UNARY_PRECEDENCE: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum UnaryOperator {
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "-")]
    Negate,
}

pub fn parse_program(source: &str) -> Result<Program, CompileError> {
    let mut parser = Parser::new(TokenReader::lex(source)?);
    let body = parser.parse_statements()?;
    if !parser.tokens.is_eof() {
        return Err(parser.unexpected("end of input"));
    }
    parser.program.body = body;
    Ok(parser.program)
}
pub fn parse_expression(source: &str) -> Result<Expression, CompileError> {
    let mut parser = Parser::new(TokenReader::lex(source)?);
    let expression = parser.parse_expression()?;
    if !parser.tokens.is_eof() {
        return Err(parser.unexpected("end of expression"));
    }
    Ok(expression)
}

pub(crate) struct Parser {
    pub(crate) tokens: TokenReader,
    program: Program,
}
impl Parser {
    pub(crate) fn new(tokens: TokenReader) -> Self {
        Parser {
            tokens,
            program: Program::default(),
        }
    }
    pub(crate) fn unexpected(&self, expected: &str) -> CompileError {
        CompileError::syntax(
            self.tokens.position(),
            format!("expected {expected}, found {:?}", self.tokens.peek()),
        )
    }
    pub(crate) fn expect(&mut self, token: Token, expected: &str) -> Result<(), CompileError> {
        if *self.tokens.peek() == token {
            self.tokens.pop();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }
    fn parse_statements(&mut self) -> Result<Vec<StatementId>, CompileError> {
        let mut statements = Vec::new();
        while !matches!(self.tokens.peek(), Token::RBrace | Token::EOF) {
            if let Some(statement) = self.parse_statement()? {
                statements.push(statement);
            }
        }
        Ok(statements)
    }
    fn parse_block(&mut self) -> Result<Vec<StatementId>, CompileError> {
        if *self.tokens.peek() != Token::LBrace {
            return Ok(self.parse_statement()?.into_iter().collect());
        }
        self.tokens.pop();
        let statements = self.parse_statements()?;
        self.expect(Token::RBrace, "'}'")?;
        Ok(statements)
    }
    fn parse_statement(&mut self) -> Result<Option<StatementId>, CompileError> {
        let statement = match self.tokens.peek() {
            Token::SemiColon => {
                self.tokens.pop();
                return Ok(None);
            }
            Token::If => return self.parse_if().map(Some),
            Token::For => return self.parse_for().map(Some),
            Token::Let => return Err(CompileError::UnsupportedDeclaration),
            Token::Return => {
                self.tokens.pop();
                let expression = match self.tokens.peek() {
                    Token::SemiColon | Token::RBrace | Token::EOF => None,
                    _ => Some(self.parse_expression()?),
                };
                Statement::Return { expression }
            }
            _ => self.parse_simple_statement()?,
        };
        self.expect_statement_end()?;
        Ok(Some(self.program.alloc(statement)))
    }
    fn expect_statement_end(&mut self) -> Result<(), CompileError> {
        match self.tokens.peek() {
            Token::SemiColon => {
                self.tokens.pop();
                Ok(())
            }
            Token::RBrace | Token::EOF => Ok(()),
            _ => Err(self.unexpected("';'")),
        }
    }
    fn parse_simple_statement(&mut self) -> Result<Statement, CompileError> {
        if matches!(self.tokens.peek(), Token::Increment | Token::Decrement) {
            let operator = match self.tokens.pop() {
                Token::Increment => BinaryOperator::Add,
                _ => BinaryOperator::Subtract,
            };
            let target = self.parse_assign_target()?;
            return Ok(Statement::Assign {
                target,
                operator: Some(operator),
                value: Expression::Int(1),
            });
        }
        let expression = self.parse_expression()?;
        let statement = match self.tokens.peek().clone() {
            Token::Assign => {
                self.tokens.pop();
                Statement::Assign {
                    target: Self::check_assign_target(expression, self.tokens.position())?,
                    operator: None,
                    value: self.parse_expression()?,
                }
            }
            Token::CompoundAssign(operator) => {
                let position = self.tokens.position();
                self.tokens.pop();
                Statement::Assign {
                    target: Self::check_assign_target(expression, position)?,
                    operator: Some(BinaryOperator::from_str(operator.as_ref()).map_err(|_| {
                        CompileError::syntax(position, format!("unknown operator {operator}="))
                    })?),
                    value: self.parse_expression()?,
                }
            }
            Token::Increment | Token::Decrement => {
                let position = self.tokens.position();
                let operator = match self.tokens.pop() {
                    Token::Increment => BinaryOperator::Add,
                    _ => BinaryOperator::Subtract,
                };
                Statement::Assign {
                    target: Self::check_assign_target(expression, position)?,
                    operator: Some(operator),
                    value: Expression::Int(1),
                }
            }
            _ => Statement::Eval { expression },
        };
        Ok(statement)
    }
    fn parse_assign_target(&mut self) -> Result<Expression, CompileError> {
        let position = self.tokens.position();
        let target = self.parse_postfix()?;
        Self::check_assign_target(target, position)
    }
    fn check_assign_target(target: Expression, position: usize) -> Result<Expression, CompileError> {
        match target {
            Expression::Variable(_) | Expression::Index { .. } => Ok(target),
            _ => Err(CompileError::syntax(position, "invalid assignment target")),
        }
    }
    fn parse_if(&mut self) -> Result<StatementId, CompileError> {
        self.expect(Token::If, "'if'")?;
        self.expect(Token::LParan, "'('")?;
        let condition = self.parse_expression()?;
        self.expect(Token::RParan, "')'")?;
        let satisfied = self.parse_block()?;
        let unsatisfied = if *self.tokens.peek() == Token::Else {
            self.tokens.pop();
            if *self.tokens.peek() == Token::If {
                // `else if (...)` becomes `else { if (...) }`
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block()?)
            }
        } else {
            None
        };
        Ok(self.program.alloc(Statement::If {
            condition,
            satisfied,
            unsatisfied,
        }))
    }
    fn parse_for(&mut self) -> Result<StatementId, CompileError> {
        self.expect(Token::For, "'for'")?;
        self.expect(Token::LParan, "'('")?;
        if *self.tokens.peek() == Token::Let {
            self.tokens.pop();
        }
        let variable = self.parse_loop_variable()?;
        self.expect(Token::Assign, "'='")?;
        let start = self.parse_expression()?;
        self.expect(Token::SemiColon, "';'")?;

        let compared = self.parse_loop_variable()?;
        let inclusive = match self.tokens.pop() {
            Token::Operator(operator) if operator.as_ref() == "<" => false,
            Token::Operator(operator) if operator.as_ref() == "<=" => true,
            other => {
                return Err(CompileError::UnsupportedLoop {
                    message: format!("loop condition must be '<' or '<=', found {other:?}"),
                });
            }
        };
        let end = self.parse_binary(BinaryOperator::Coalesce.precedence())?;
        self.expect(Token::SemiColon, "';'")?;

        let incremented = match (self.tokens.pop(), self.tokens.pop()) {
            (Token::Identifier(name), Token::Increment) | (Token::Increment, Token::Identifier(name)) => name,
            (first, second) => {
                return Err(CompileError::UnsupportedLoop {
                    message: format!("loop step must be '++', found {first:?} {second:?}"),
                });
            }
        };
        self.expect(Token::RParan, "')'")?;
        if compared != variable || incremented != variable {
            return Err(CompileError::UnsupportedLoop {
                message: format!("loop header must only use \"{variable}\""),
            });
        }
        let body = self.parse_block()?;
        Ok(self.program.alloc(Statement::For {
            variable,
            start,
            end,
            inclusive,
            body,
        }))
    }
    fn parse_loop_variable(&mut self) -> Result<ImmutableString, CompileError> {
        match self.tokens.pop() {
            Token::Identifier(name) => Ok(name),
            other => Err(CompileError::UnsupportedLoop {
                message: format!("expected loop variable, found {other:?}"),
            }),
        }
    }
    pub(crate) fn parse_expression(&mut self) -> Result<Expression, CompileError> {
        let condition = self.parse_binary(BinaryOperator::Coalesce.precedence())?;
        self.parse_conditional_tail(condition)
    }
    /// Continues `condition ? a : b` after its condition has been parsed.
    pub(crate) fn parse_conditional_tail(
        &mut self,
        condition: Expression,
    ) -> Result<Expression, CompileError> {
        if *self.tokens.peek() != Token::Question {
            return Ok(condition);
        }
        self.tokens.pop();
        let satisfied = self.parse_expression()?;
        let unsatisfied = if *self.tokens.peek() == Token::Colon {
            self.tokens.pop();
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        Ok(Expression::Conditional {
            condition: Box::new(condition),
            satisfied: Box::new(satisfied),
            unsatisfied,
        })
    }
    pub(crate) fn parse_binary(&mut self, min_precedence: u8) -> Result<Expression, CompileError> {
        let mut first = self.parse_unary()?;
        loop {
            let operator = match self.tokens.peek() {
                Token::Operator(operator) => match BinaryOperator::from_str(operator.as_ref()) {
                    Ok(operator) if operator.precedence() >= min_precedence => operator,
                    _ => break,
                },
                _ => break,
            };
            self.tokens.pop();
            let second = self.parse_binary(operator.precedence() + 1)?;
            first = Expression::binary(operator, first, second);
        }
        Ok(first)
    }
    fn parse_unary(&mut self) -> Result<Expression, CompileError> {
        let operator = match self.tokens.peek() {
            Token::Operator(operator) => UnaryOperator::from_str(operator.as_ref()).ok(),
            _ => None,
        };
        let Some(operator) = operator else {
            return self.parse_postfix();
        };
        self.tokens.pop();
        let expression = self.parse_unary()?;
        Ok(match (operator, expression) {
            (UnaryOperator::Negate, Expression::Int(value)) => Expression::Int(-value),
            (UnaryOperator::Negate, Expression::Float(value)) => Expression::Float(-value),
            (operator, expression) => Expression::Unary {
                operator,
                expression: Box::new(expression),
            },
        })
    }
    fn parse_postfix(&mut self) -> Result<Expression, CompileError> {
        let mut expression = self.parse_primary()?;
        while *self.tokens.peek() == Token::LBracket {
            self.tokens.pop();
            let index = self.parse_expression()?;
            self.expect(Token::RBracket, "']'")?;
            expression = Expression::Index {
                target: Box::new(expression),
                index: Box::new(index),
            };
        }
        Ok(expression)
    }
    fn parse_primary(&mut self) -> Result<Expression, CompileError> {
        let position = self.tokens.position();
        match self.tokens.pop() {
            Token::Int(value) => Ok(Expression::Int(value)),
            Token::Float(value) => Ok(Expression::Float(value)),
            Token::Bool(value) => Ok(Expression::Bool(value)),
            Token::String(value) => Ok(Expression::String(value)),
            Token::Identifier(name) => {
                if *self.tokens.peek() != Token::LParan {
                    return Ok(Expression::Variable(name));
                }
                self.tokens.pop();
                let mut arguments = Vec::new();
                while *self.tokens.peek() != Token::RParan {
                    arguments.push(self.parse_expression()?);
                    if *self.tokens.peek() == Token::Comma {
                        self.tokens.pop();
                    } else {
                        break;
                    }
                }
                self.expect(Token::RParan, "')'")?;
                Ok(Expression::Call {
                    function: name,
                    arguments,
                })
            }
            Token::LParan => {
                let expression = self.parse_expression()?;
                self.expect(Token::RParan, "')'")?;
                Ok(expression)
            }
            Token::Dollar => self.parse_placeholder().map(Expression::Placeholder),
            other => Err(CompileError::syntax(
                position,
                format!("expected expression, found {other:?}"),
            )),
        }
    }
    fn parse_placeholder(&mut self) -> Result<Placeholder, CompileError> {
        self.expect(Token::LBracket, "'[' after '$'")?;
        let position = self.tokens.position();
        let (name, mut accessor) = match self.tokens.pop() {
            Token::Identifier(name) => match name.split_once('.') {
                Some((name, field)) => (
                    ImmutableString::from(name),
                    Some(Accessor::Field(field.into())),
                ),
                None => (name, None),
            },
            other => {
                return Err(CompileError::syntax(
                    position,
                    format!("expected variable name, found {other:?}"),
                ));
            }
        };
        if accessor.is_none() && *self.tokens.peek() == Token::LBracket {
            self.tokens.pop();
            let position = self.tokens.position();
            accessor = Some(match self.tokens.pop() {
                Token::Int(index) => Accessor::Index(index),
                Token::Identifier(variable) => Accessor::Variable(variable),
                other => {
                    return Err(CompileError::syntax(
                        position,
                        format!("expected index, found {other:?}"),
                    ));
                }
            });
            self.expect(Token::RBracket, "']'")?;
        }
        let adjustment = match self.tokens.peek().clone() {
            Token::Operator(operator) => {
                let position = self.tokens.position();
                let operator = match BinaryOperator::from_str(operator.as_ref()) {
                    Ok(
                        operator @ (BinaryOperator::Add
                        | BinaryOperator::Subtract
                        | BinaryOperator::Multiply
                        | BinaryOperator::Divide),
                    ) => operator,
                    _ => {
                        return Err(CompileError::syntax(
                            position,
                            format!("unsupported placeholder operator {operator}"),
                        ));
                    }
                };
                self.tokens.pop();
                let operand = match self.tokens.pop() {
                    Token::Int(value) => Value::Int(value),
                    Token::Float(value) => Value::Float(value),
                    other => {
                        return Err(CompileError::syntax(
                            position,
                            format!("expected numeric operand, found {other:?}"),
                        ));
                    }
                };
                Some((operator, operand))
            }
            _ => None,
        };
        self.expect(Token::RBracket, "']'")?;
        Ok(Placeholder {
            name,
            accessor,
            adjustment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn else_if_nests_inside_else() {
        let program =
            parse_program("if (a) { x = 1; } else if (b) { x = 2; } else { x = 3; }").unwrap();
        assert_eq!(program.body.len(), 1);
        let Statement::If {
            unsatisfied: Some(unsatisfied),
            ..
        } = program.statement(program.body[0])
        else {
            panic!("expected if");
        };
        assert_eq!(unsatisfied.len(), 1);
        let Statement::If {
            condition,
            unsatisfied: Some(last),
            ..
        } = program.statement(unsatisfied[0])
        else {
            panic!("expected nested if");
        };
        assert_eq!(*condition, Expression::Variable("b".into()));
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn precedence_is_respected() {
        assert_eq!(
            parse_expression("a + b * c").unwrap(),
            Expression::binary(
                BinaryOperator::Add,
                Expression::Variable("a".into()),
                Expression::binary(
                    BinaryOperator::Multiply,
                    Expression::Variable("b".into()),
                    Expression::Variable("c".into())
                )
            )
        );
        assert_eq!(
            parse_expression("a - b - c").unwrap(),
            Expression::binary(
                BinaryOperator::Subtract,
                Expression::binary(
                    BinaryOperator::Subtract,
                    Expression::Variable("a".into()),
                    Expression::Variable("b".into())
                ),
                Expression::Variable("c".into())
            )
        );
    }

    #[test]
    fn parses_placeholder_forms() {
        let Expression::Placeholder(placeholder) = parse_expression("$[size[1]-1]").unwrap() else {
            panic!("expected placeholder");
        };
        assert_eq!(placeholder.name.as_ref(), "size");
        assert_eq!(placeholder.accessor, Some(Accessor::Index(1)));
        assert_eq!(
            placeholder.adjustment,
            Some((BinaryOperator::Subtract, Value::Int(1)))
        );
        let Expression::Placeholder(placeholder) = parse_expression("$[ACTIONS.ROTATE]").unwrap()
        else {
            panic!("expected placeholder");
        };
        assert_eq!(placeholder.name.as_ref(), "ACTIONS");
        assert_eq!(placeholder.accessor, Some(Accessor::Field("ROTATE".into())));
    }

    #[test]
    fn parses_compound_assignment_and_increment() {
        let program = parse_program("v.a *= 2; v.b++; --v.c;").unwrap();
        let operators: Vec<Option<BinaryOperator>> = program
            .body
            .iter()
            .map(|id| match program.statement(*id) {
                Statement::Assign { operator, .. } => *operator,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(
            operators,
            vec![
                Some(BinaryOperator::Multiply),
                Some(BinaryOperator::Add),
                Some(BinaryOperator::Subtract)
            ]
        );
    }

    #[test]
    fn rejects_unsupported_loops_and_declarations() {
        assert!(matches!(
            parse_program("for (let i = 0; i > 3; i++) {}"),
            Err(CompileError::UnsupportedLoop { .. })
        ));
        assert!(matches!(
            parse_program("for (let i = 0; j < 3; i++) {}"),
            Err(CompileError::UnsupportedLoop { .. })
        ));
        assert_eq!(
            parse_program("let x = 1;").unwrap_err(),
            CompileError::UnsupportedDeclaration
        );
        assert!(matches!(
            parse_program("1 = 2;"),
            Err(CompileError::Syntax { .. })
        ));
    }
}
