//! The expression evaluator.
//!
//! Assignment right-hand sides, `return` expressions, call-argument buffers,
//! and MATH-frame buffers are all evaluated here, against a snapshot of the
//! current environment. The grammar is deliberately small: literals,
//! (dotted) identifier references, unary minus, the binary operators
//! `+ - * / % ^` with `^` as right-associative exponentiation, parentheses,
//! and postfix calls on identifiers (`math_utils.square(3)`,
//! `systemreturn("ls")`).
//!
//! String literals (`"…"` or `'…'`, no escape processing) evaluate directly
//! to the string-like kind, and `+` with a string-like operand on either
//! side concatenates to string-like.

use crate::environment::Environment;
use crate::error::{Error, RunResult};
use crate::io::HostIo;
use crate::value::Value;

/// Evaluates a single expression against `env`.
pub fn eval_expr(text: &str, env: &Environment, io: &mut impl HostIo) -> RunResult<Value> {
    let tokens = tokenize(text)?;
    let mut eval = Eval { tokens, pos: 0, env, io };
    if eval.at_end() {
        return Err(Error::syntax("empty expression").stage("evaluate"));
    }
    let value = eval.expression()?;
    if !eval.at_end() {
        return Err(Error::syntax(format!("unexpected trailing input in expression '{}'", text.trim()))
            .stage("evaluate"));
    }
    Ok(value)
}

/// Evaluates a call-argument buffer: top-level commas separate arguments,
/// an empty buffer yields zero arguments.
pub fn eval_args(text: &str, env: &Environment, io: &mut impl HostIo) -> RunResult<Vec<Value>> {
    let tokens = tokenize(text)?;
    let mut eval = Eval { tokens, pos: 0, env, io };
    if eval.at_end() {
        return Ok(Vec::new());
    }
    let mut args = vec![eval.expression()?];
    while eval.eat(&Token::Comma) {
        args.push(eval.expression()?);
    }
    if !eval.at_end() {
        return Err(Error::syntax(format!("unexpected trailing input in arguments '{}'", text.trim()))
            .stage("evaluate"));
    }
    Ok(args)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
    Comma,
}

fn tokenize(text: &str) -> RunResult<Vec<Token>> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            _ if ch.is_whitespace() => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '"' | '\'' => {
                let quote = ch;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end == chars.len() {
                    return Err(Error::syntax("unterminated string literal in expression").stage("evaluate"));
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            _ if ch.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                let mut float = false;
                if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
                    float = true;
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                if float {
                    let value = literal
                        .parse::<f64>()
                        .map_err(|_| Error::syntax(format!("invalid number literal '{literal}'")).stage("evaluate"))?;
                    tokens.push(Token::Float(value));
                } else {
                    let value = literal
                        .parse::<i64>()
                        .map_err(|_| Error::value(format!("integer literal '{literal}' out of range")).stage("evaluate"))?;
                    tokens.push(Token::Int(value));
                }
            }
            _ if ch.is_alphabetic() || ch == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                return Err(Error::syntax(format!("unexpected character '{ch}' in expression")).stage("evaluate"));
            }
        }
    }
    Ok(tokens)
}

struct Eval<'e, IO: HostIo> {
    tokens: Vec<Token>,
    pos: usize,
    env: &'e Environment,
    io: &'e mut IO,
}

impl<IO: HostIo> Eval<'_, IO> {
    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// `expression := term (('+' | '-') term)*`
    fn expression(&mut self) -> RunResult<Value> {
        let mut left = self.term()?;
        loop {
            if self.eat(&Token::Plus) {
                left = add(left, self.term()?)?;
            } else if self.eat(&Token::Minus) {
                left = numeric_op('-', left, self.term()?)?;
            } else {
                return Ok(left);
            }
        }
    }

    /// `term := factor (('*' | '/' | '%') factor)*`
    fn term(&mut self) -> RunResult<Value> {
        let mut left = self.factor()?;
        loop {
            if self.eat(&Token::Star) {
                left = numeric_op('*', left, self.factor()?)?;
            } else if self.eat(&Token::Slash) {
                left = numeric_op('/', left, self.factor()?)?;
            } else if self.eat(&Token::Percent) {
                left = numeric_op('%', left, self.factor()?)?;
            } else {
                return Ok(left);
            }
        }
    }

    /// `factor := unary ('^' factor)?` — exponentiation is right-associative.
    fn factor(&mut self) -> RunResult<Value> {
        let base = self.unary()?;
        if self.eat(&Token::Caret) {
            let exponent = self.factor()?;
            return power(base, exponent);
        }
        Ok(base)
    }

    fn unary(&mut self) -> RunResult<Value> {
        if self.eat(&Token::Minus) {
            return match self.unary()? {
                Value::Int(v) => Ok(Value::Int(-v)),
                Value::Float(v) => Ok(Value::Float(-v)),
                other => Err(Error::type_error(format!(
                    "cannot negate {} value",
                    other.type_name()
                ))
                .stage("evaluate")),
            };
        }
        self.primary()
    }

    fn primary(&mut self) -> RunResult<Value> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| Error::syntax("unexpected end of expression").stage("evaluate"))?;
        self.pos += 1;
        match token {
            Token::Int(v) => Ok(Value::Int(v)),
            Token::Float(v) => Ok(Value::Float(v)),
            Token::Str(s) => Ok(Value::Str(s)),
            Token::LParen => {
                let value = self.expression()?;
                if !self.eat(&Token::RParen) {
                    return Err(Error::syntax("expected ')' in expression").stage("evaluate"));
                }
                Ok(value)
            }
            Token::Ident(name) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.call_arguments()?;
                    self.invoke(&name, args)
                } else {
                    Ok(self.env.find_variable(&name)?.value)
                }
            }
            other => Err(Error::syntax(format!("unexpected token {other:?} in expression")).stage("evaluate")),
        }
    }

    fn call_arguments(&mut self) -> RunResult<Vec<Value>> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        args.push(self.expression()?);
        while self.eat(&Token::Comma) {
            args.push(self.expression()?);
        }
        if !self.eat(&Token::RParen) {
            return Err(Error::syntax("expected ')' after call arguments").stage("evaluate"));
        }
        Ok(args)
    }

    fn invoke(&mut self, name: &str, args: Vec<Value>) -> RunResult<Value> {
        let variable = self.env.find_variable(name)?;
        match variable.value {
            Value::Native(native) => native.call(args, self.io),
            Value::Function(function) => function.call(args, self.io),
            _ => Err(Error::type_error(format!("variable '{name}' is not callable")).stage("evaluate")),
        }
    }
}

/// `+`: string-like on either side concatenates, otherwise numeric addition.
fn add(left: Value, right: Value) -> RunResult<Value> {
    if matches!(left, Value::Str(_)) || matches!(right, Value::Str(_)) {
        let mut text = left.stringify();
        text.push_str(&right.stringify());
        return Ok(Value::Str(text));
    }
    numeric_op('+', left, right)
}

fn numeric_op(op: char, left: Value, right: Value) -> RunResult<Value> {
    match (left, right) {
        (Value::Int(l), Value::Int(r)) => int_op(op, l, r),
        (l @ (Value::Int(_) | Value::Float(_)), r @ (Value::Int(_) | Value::Float(_))) => {
            let (l, r) = (to_float(&l), to_float(&r));
            Ok(Value::Float(match op {
                '+' => l + r,
                '-' => l - r,
                '*' => l * r,
                '/' => l / r,
                '%' => l % r,
                _ => unreachable!("unknown operator"),
            }))
        }
        (l, r) => Err(Error::type_error(format!(
            "unsupported operand types for '{op}': {} and {}",
            l.type_name(),
            r.type_name()
        ))
        .stage("evaluate")),
    }
}

fn int_op(op: char, l: i64, r: i64) -> RunResult<Value> {
    match op {
        '+' => Ok(Value::Int(l.wrapping_add(r))),
        '-' => Ok(Value::Int(l.wrapping_sub(r))),
        '*' => Ok(Value::Int(l.wrapping_mul(r))),
        '/' => {
            if r == 0 {
                Err(Error::zero_division("integer division or modulo by zero").stage("evaluate"))
            } else {
                Ok(Value::Int(l.wrapping_div(r)))
            }
        }
        '%' => {
            if r == 0 {
                Err(Error::zero_division("integer division or modulo by zero").stage("evaluate"))
            } else {
                Ok(Value::Int(l.wrapping_rem(r)))
            }
        }
        _ => unreachable!("unknown operator"),
    }
}

/// `^`: exponentiation. Int^Int with a non-negative exponent stays Int
/// (falling back to Float on overflow); everything else is Float.
fn power(base: Value, exponent: Value) -> RunResult<Value> {
    match (&base, &exponent) {
        (Value::Int(b), Value::Int(e)) => {
            if *e >= 0 {
                if let Ok(small) = u32::try_from(*e) {
                    if let Some(result) = b.checked_pow(small) {
                        return Ok(Value::Int(result));
                    }
                }
            }
            Ok(Value::Float((*b as f64).powf(*e as f64)))
        }
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            Ok(Value::Float(to_float(&base).powf(to_float(&exponent))))
        }
        _ => Err(Error::type_error(format!(
            "unsupported operand types for '^': {} and {}",
            base.type_name(),
            exponent.type_name()
        ))
        .stage("evaluate")),
    }
}

fn to_float(value: &Value) -> f64 {
    match value {
        Value::Int(v) => *v as f64,
        Value::Float(v) => *v,
        _ => unreachable!("checked by caller"),
    }
}
