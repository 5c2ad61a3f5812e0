//! Arithmetic expression evaluator
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := unary (('*' | '/' | '%') unary)*
//! unary  := ('-' | '+') unary | power
//! power  := atom ('^' unary)?
//! atom   := number | '(' expr ')'
//! ```

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use asyncterm_core::CommandHandler;

pub const STARTUP_MESSAGE: &str = "🎯 Async Calculator Ready! Type math expressions...";

/// Evaluates each line as an arithmetic expression
pub struct Calculator;

#[async_trait]
impl CommandHandler for Calculator {
    type Resource = ();
    type Output = f64;

    async fn handle(&self, line: &str, _: Option<&()>) -> Result<f64> {
        evaluate(line)
    }

    fn format_output(&self, line: &str, value: &f64) -> String {
        format!("🧮 {} = {}", line.trim(), value)
    }
}

/// Evaluate an expression
pub fn evaluate(input: &str) -> Result<f64> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    let value = parser.expr()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        bail!("unexpected '{}' at column {}", c, parser.pos + 1);
    }
    if !value.is_finite() {
        bail!("result is not a finite number");
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn expr(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        loop {
            match self.next_op(&['+', '-']) {
                Some('+') => value += self.term()?,
                Some('-') => value -= self.term()?,
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        loop {
            match self.next_op(&['*', '/', '%']) {
                Some('*') => value *= self.unary()?,
                Some(op) => {
                    let rhs = self.unary()?;
                    if rhs == 0.0 {
                        bail!("division by zero");
                    }
                    if op == '/' {
                        value /= rhs;
                    } else {
                        value %= rhs;
                    }
                }
                None => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> Result<f64> {
        match self.next_op(&['-', '+']) {
            Some('-') => Ok(-self.unary()?),
            Some(_) => self.unary(),
            None => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.atom()?;
        if self.next_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                let value = self.expr()?;
                if self.next_op(&[')']).is_none() {
                    bail!("missing ')'");
                }
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(anyhow!("unexpected '{}' at column {}", c, self.pos + 1)),
            None => Err(anyhow!("unexpected end of expression")),
        }
    }

    fn number(&mut self) -> Result<f64> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit() || c == '.') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        text.parse()
            .map_err(|_| anyhow!("invalid number '{}'", text))
    }

    /// Consume the next operator if it is one of `ops`
    fn next_op(&mut self, ops: &[char]) -> Option<char> {
        self.skip_whitespace();
        let c = self.peek().filter(|c| ops.contains(c))?;
        self.pos += 1;
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
}
