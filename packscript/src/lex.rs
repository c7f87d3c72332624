use crate::error::CompileError;
use immutable_string::ImmutableString;
use std::fmt::{Debug, Formatter};
use std::str::FromStr;

pub struct TokenReader {
    tokens: Vec<(Token, usize)>,
    end: usize,
}
impl TokenReader {
    /// Splits source text into tokens. Comments and whitespace never reach the
    /// parser.
    pub fn lex(text: &str) -> Result<TokenReader, CompileError> {
        let text: Vec<char> = text.chars().collect();
        let mut tokens = Vec::new();

        let mut i = 0;
        while i < text.len() {
            let start = i;
            let next = text.get(i + 1).cloned();
            match CharacterType::from_char(text[i]) {
                CharacterType::Alpha(char) => {
                    let mut string = String::new();
                    string.push(char);
                    while let Some(alpha) = text
                        .get(i + 1)
                        .cloned()
                        .and_then(|char| CharacterType::from_char(char).as_identifier_part())
                    {
                        string.push(alpha);
                        i += 1;
                    }
                    tokens.push((
                        match string.as_str() {
                            "if" => Token::If,
                            "else" => Token::Else,
                            "for" => Token::For,
                            "let" | "var" => Token::Let,
                            "return" => Token::Return,
                            "true" => Token::Bool(true),
                            "false" => Token::Bool(false),
                            identifier => Token::Identifier(identifier.into()),
                        },
                        start,
                    ));
                }
                CharacterType::Number(digit) => {
                    let mut numbers = String::new();
                    numbers.push(digit);
                    let mut got_dot = false;
                    while let Some(char) = text.get(i + 1).cloned() {
                        let continues_fraction = char == '.'
                            && !got_dot
                            && text.get(i + 2).is_some_and(|char| char.is_ascii_digit());
                        if !(char.is_ascii_digit() || continues_fraction) {
                            break;
                        }
                        if char == '.' {
                            got_dot = true;
                        }
                        numbers.push(char);
                        i += 1;
                    }
                    let token = if got_dot {
                        f64::from_str(numbers.as_str()).map(Token::Float).ok()
                    } else {
                        i64::from_str(numbers.as_str()).map(Token::Int).ok()
                    };
                    tokens.push((
                        token.ok_or_else(|| CompileError::syntax(start, "malformed number"))?,
                        start,
                    ));
                }
                CharacterType::Quote(quote) => {
                    let mut string = String::new();
                    loop {
                        i += 1;
                        match text.get(i) {
                            Some(char) if *char == quote => break,
                            Some(char) => string.push(*char),
                            None => {
                                return Err(CompileError::syntax(start, "unterminated string"));
                            }
                        }
                    }
                    tokens.push((Token::String(string.into()), start));
                }
                CharacterType::Operator(op) => {
                    let (token, length) = match (op, next) {
                        ('/', Some('/')) => {
                            while i < text.len() && text[i] != '\n' {
                                i += 1;
                            }
                            continue;
                        }
                        ('/', Some('*')) => {
                            i += 2;
                            while i < text.len() && !(text[i] == '*' && text.get(i + 1) == Some(&'/')) {
                                i += 1;
                            }
                            if i >= text.len() {
                                return Err(CompileError::syntax(start, "unterminated comment"));
                            }
                            i += 2;
                            continue;
                        }
                        ('+', Some('+')) => (Token::Increment, 2),
                        ('-', Some('-')) => (Token::Decrement, 2),
                        ('?', Some('?')) => {
                            if text.get(i + 2) == Some(&'=') {
                                (Token::CompoundAssign("??".into()), 3)
                            } else {
                                (Token::Operator("??".into()), 2)
                            }
                        }
                        ('&', Some('&')) => (Token::Operator("&&".into()), 2),
                        ('|', Some('|')) => (Token::Operator("||".into()), 2),
                        ('=', Some('=')) => (Token::Operator("==".into()), 2),
                        ('!', Some('=')) => (Token::Operator("!=".into()), 2),
                        ('<' | '>', Some('=')) => (Token::Operator(format!("{op}=").into()), 2),
                        ('+' | '-' | '*' | '/', Some('=')) => {
                            (Token::CompoundAssign(op.to_string().into()), 2)
                        }
                        ('=', _) => (Token::Assign, 1),
                        ('?', _) => (Token::Question, 1),
                        ('+' | '-' | '*' | '/' | '%' | '<' | '>' | '!', _) => {
                            (Token::Operator(op.to_string().into()), 1)
                        }
                        _ => {
                            return Err(CompileError::syntax(
                                start,
                                format!("unexpected character '{op}'"),
                            ));
                        }
                    };
                    tokens.push((token, start));
                    i += length;
                    continue;
                }
                CharacterType::Empty => {}
                CharacterType::Dot if next.is_some_and(|char| char.is_ascii_digit()) => {
                    let mut numbers = String::from("0.");
                    i += 1;
                    while let Some(char) = text.get(i).filter(|char| char.is_ascii_digit()) {
                        numbers.push(*char);
                        i += 1;
                    }
                    let value = f64::from_str(numbers.as_str())
                        .map_err(|_| CompileError::syntax(start, "malformed number"))?;
                    tokens.push((Token::Float(value), start));
                    continue;
                }
                CharacterType::Dot => {
                    return Err(CompileError::syntax(start, "unexpected character '.'"));
                }
                CharacterType::Unknown(char) => {
                    return Err(CompileError::syntax(
                        start,
                        format!("unexpected character '{char}'"),
                    ));
                }
                literal => tokens.push((
                    match literal {
                        CharacterType::LParan => Token::LParan,
                        CharacterType::RParan => Token::RParan,
                        CharacterType::LBrace => Token::LBrace,
                        CharacterType::RBrace => Token::RBrace,
                        CharacterType::LBracket => Token::LBracket,
                        CharacterType::RBracket => Token::RBracket,
                        CharacterType::Comma => Token::Comma,
                        CharacterType::SemiColon => Token::SemiColon,
                        CharacterType::Colon => Token::Colon,
                        CharacterType::Dollar => Token::Dollar,
                        _ => unreachable!(),
                    },
                    start,
                )),
            }
            i += 1;
        }

        tokens.reverse();
        Ok(Self {
            tokens,
            end: text.len(),
        })
    }
    pub fn pop(&mut self) -> Token {
        self.tokens
            .pop()
            .map(|(token, _)| token)
            .unwrap_or(Token::EOF)
    }
    pub fn peek(&self) -> &Token {
        self.peek_more(0)
    }
    pub fn peek_more(&self, more: usize) -> &Token {
        self.tokens
            .len()
            .checked_sub(1 + more)
            .and_then(|index| self.tokens.get(index))
            .map(|(token, _)| token)
            .unwrap_or(&Token::EOF)
    }
    /// Source offset of the next token.
    pub fn position(&self) -> usize {
        self.tokens
            .last()
            .map(|(_, position)| *position)
            .unwrap_or(self.end)
    }
    pub fn is_eof(&self) -> bool {
        self.tokens.is_empty()
    }
}
impl Debug for TokenReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "TokenReader[{}]",
            self.tokens
                .iter()
                .rev()
                .map(|(token, _)| format!("{:?}", token))
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    EOF,
    Int(i64),
    Float(f64),
    Bool(bool),
    Identifier(ImmutableString),
    String(ImmutableString),
    LParan,
    RParan,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    SemiColon,
    Colon,
    Question,
    Dollar,
    Operator(ImmutableString),
    CompoundAssign(ImmutableString),
    Increment,
    Decrement,
    Assign,
    If,
    Else,
    For,
    Let,
    Return,
}
#[derive(Copy, Clone)]
pub enum CharacterType {
    Alpha(char),
    Number(char),
    Quote(char),
    LParan,
    RParan,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    SemiColon,
    Colon,
    Dollar,
    Dot,
    Empty,
    Operator(char),
    Unknown(char),
}
impl CharacterType {
    pub fn from_char(char: char) -> Self {
        match char {
            '"' | '\'' => CharacterType::Quote(char),
            '(' => CharacterType::LParan,
            ')' => CharacterType::RParan,
            '{' => CharacterType::LBrace,
            '}' => CharacterType::RBrace,
            '[' => CharacterType::LBracket,
            ']' => CharacterType::RBracket,
            ',' => CharacterType::Comma,
            ';' => CharacterType::SemiColon,
            ':' => CharacterType::Colon,
            '$' => CharacterType::Dollar,
            '.' => CharacterType::Dot,
            ' ' | '\t' | '\n' | '\r' => CharacterType::Empty,
            '0'..='9' => CharacterType::Number(char),
            '+' | '-' | '*' | '/' | '%' | '<' | '>' | '=' | '!' | '?' | '&' | '|' => {
                CharacterType::Operator(char)
            }
            char if char.is_alphabetic() || char == '_' => CharacterType::Alpha(char),
            char => CharacterType::Unknown(char),
        }
    }
    /// Identifiers may contain dots, so `v.hologram.layer` is a single token.
    pub fn as_identifier_part(self) -> Option<char> {
        match self {
            CharacterType::Alpha(char) | CharacterType::Number(char) => Some(char),
            CharacterType::Dot => Some('.'),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(text: &str) -> Vec<Token> {
        let mut reader = TokenReader::lex(text).unwrap();
        let mut tokens = Vec::new();
        while !reader.is_eof() {
            tokens.push(reader.pop());
        }
        tokens
    }

    #[test]
    fn lexes_dotted_identifiers_and_operators() {
        assert_eq!(
            lex_all("v.hologram.layer += 2.5; t.i++ ?? 'a'"),
            vec![
                Token::Identifier("v.hologram.layer".into()),
                Token::CompoundAssign("+".into()),
                Token::Float(2.5),
                Token::SemiColon,
                Token::Identifier("t.i".into()),
                Token::Increment,
                Token::Operator("??".into()),
                Token::String("a".into()),
            ]
        );
    }

    #[test]
    fn dots_continue_names_but_never_start_them() {
        assert_eq!(
            lex_all("math.mod(q.is_sneaking, .5) $[ACTIONS.ROTATE]"),
            vec![
                Token::Identifier("math.mod".into()),
                Token::LParan,
                Token::Identifier("q.is_sneaking".into()),
                Token::Comma,
                Token::Float(0.5),
                Token::RParan,
                Token::Dollar,
                Token::LBracket,
                Token::Identifier("ACTIONS.ROTATE".into()),
                Token::RBracket,
            ]
        );
        assert!(TokenReader::lex("a = .b").is_err());
    }

    #[test]
    fn strips_comments() {
        assert_eq!(
            lex_all("a = 1; // trailing\n/* block\n comment */ b"),
            vec![
                Token::Identifier("a".into()),
                Token::Assign,
                Token::Int(1),
                Token::SemiColon,
                Token::Identifier("b".into()),
            ]
        );
    }

    #[test]
    fn lexes_placeholders() {
        assert_eq!(
            lex_all("$[size[0]/2]"),
            vec![
                Token::Dollar,
                Token::LBracket,
                Token::Identifier("size".into()),
                Token::LBracket,
                Token::Int(0),
                Token::RBracket,
                Token::Operator("/".into()),
                Token::Int(2),
                Token::RBracket,
            ]
        );
    }

    #[test]
    fn reports_positions_of_bad_input() {
        match TokenReader::lex("a = #") {
            Err(CompileError::Syntax { position, .. }) => assert_eq!(position, 4),
            other => panic!("unexpected {other:?}"),
        }
        assert!(TokenReader::lex("'open").is_err());
    }
}
