use crate::evaluation::symbolic::algebra::{Expr, Func, Rational};
use crate::evaluation::{EvaluationError, EvaluationResult};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(Rational),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

/// Parses an expression in `x` directly into its canonical sum of terms.
pub(crate) fn parse(input: &str) -> EvaluationResult<Expr> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(EvaluationError::parse("empty expression"));
    }

    let mut parser = Parser { tokens, position: 0 };
    let expr = parser.sum()?;
    if let Some(token) = parser.peek() {
        return Err(EvaluationError::parse(format!(
            "unexpected {token:?} at token {}",
            parser.position
        )));
    }
    Ok(expr)
}

fn tokenize(input: &str) -> EvaluationResult<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut end = start;
                while let Some(&(index, c)) = chars.peek() {
                    if c.is_ascii_digit() || c == '.' {
                        end = index + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Number(parse_number(&input[start..end])?));
            }
            c if c.is_ascii_alphabetic() => {
                let mut end = start;
                while let Some(&(index, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        end = index + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..end].to_string()));
            }
            '*' => {
                chars.next();
                if matches!(chars.peek(), Some((_, '*'))) {
                    chars.next();
                    tokens.push(Token::Power);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '^' => {
                chars.next();
                tokens.push(Token::Power);
            }
            '+' | '-' | '/' | '(' | ')' => {
                chars.next();
                tokens.push(match ch {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
            }
            other => {
                return Err(EvaluationError::parse(format!(
                    "unexpected character '{other}' at offset {start}"
                )));
            }
        }
    }

    Ok(tokens)
}

fn parse_number(text: &str) -> EvaluationResult<Rational> {
    let invalid = || EvaluationError::parse(format!("invalid number '{text}'"));
    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    if (whole.is_empty() && fraction.is_empty()) || fraction.contains('.') {
        return Err(invalid());
    }
    if whole.len() + fraction.len() > 30 {
        return Err(EvaluationError::unsupported(format!("number '{text}' is too long")));
    }

    let digits = format!("{whole}{fraction}");
    let numerator: i128 = digits.parse().map_err(|_| invalid())?;
    let denominator = 10_i128.pow(fraction.len() as u32);
    Rational::new(numerator, denominator)
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> EvaluationResult<()> {
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(EvaluationError::parse(format!(
                "expected {expected:?}, found {token:?}"
            ))),
            None => Err(EvaluationError::parse(format!(
                "expected {expected:?}, found end of expression"
            ))),
        }
    }

    // sum := product (('+' | '-') product)*
    fn sum(&mut self) -> EvaluationResult<Expr> {
        let mut value = self.product()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.next();
                    value = value.add(&self.product()?)?;
                }
                Some(Token::Minus) => {
                    self.next();
                    value = value.sub(&self.product()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    // product := unary (('*' | '/') unary)*
    fn product(&mut self) -> EvaluationResult<Expr> {
        let mut value = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.next();
                    value = value.mul(&self.unary()?)?;
                }
                Some(Token::Slash) => {
                    self.next();
                    value = value.div(&self.unary()?)?;
                }
                _ => return Ok(value),
            }
        }
    }

    // unary := ('+' | '-') unary | power
    fn unary(&mut self) -> EvaluationResult<Expr> {
        match self.peek() {
            Some(Token::Minus) => {
                self.next();
                self.unary()?.neg()
            }
            Some(Token::Plus) => {
                self.next();
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := atom ('**' unary)?, right associative
    fn power(&mut self) -> EvaluationResult<Expr> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Power)) {
            self.next();
            let exponent = self.unary()?;
            return base.pow(&exponent);
        }
        Ok(base)
    }

    fn atom(&mut self) -> EvaluationResult<Expr> {
        match self.next() {
            Some(Token::Number(value)) => Ok(Expr::constant(value)),
            Some(Token::LParen) => {
                let inner = self.sum()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Ident(name)) => self.identifier(&name),
            Some(token) => Err(EvaluationError::parse(format!("unexpected {token:?}"))),
            None => Err(EvaluationError::parse("unexpected end of expression")),
        }
    }

    fn identifier(&mut self, name: &str) -> EvaluationResult<Expr> {
        if name == "x" {
            return Ok(Expr::x());
        }

        let func = match name {
            "sin" => Func::Sin,
            "cos" => Func::Cos,
            "exp" => Func::Exp,
            "log" | "ln" => Func::Log,
            _ => {
                return Err(EvaluationError::unsupported(format!(
                    "unknown symbol '{name}'"
                )));
            }
        };

        self.expect(Token::LParen)?;
        let argument = self.sum()?;
        self.expect(Token::RParen)?;
        Expr::apply(func, &argument)
    }
}
