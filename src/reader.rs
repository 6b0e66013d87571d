//! S-expression reader.
//!
//! Turns source text into `Value` data: fixnums, booleans, characters,
//! strings, symbols, and (possibly dotted) lists. `'x` reads as
//! `(quote x)`. Comments run from `;` to end of line.

use crate::error::ReadError;
use crate::symbols::SymbolTable;
use crate::value::repr::{Value, FIXNUM_MAX, FIXNUM_MIN};
use crate::value::{cons, heap};

/// Read a single datum from `src`. Trailing input after the datum is an
/// error, except whitespace and comments.
pub fn read_str(src: &str, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
    let mut reader = Reader::new(src);
    let datum = reader.read_datum(symbols)?;
    reader.skip_atmosphere();
    match reader.peek() {
        None => Ok(datum),
        Some(c) => Err(ReadError::UnexpectedChar(c)),
    }
}

/// Read every datum in `src`, in order.
pub fn read_all(src: &str, symbols: &mut SymbolTable) -> Result<Vec<Value>, ReadError> {
    let mut reader = Reader::new(src);
    let mut out = Vec::new();
    loop {
        reader.skip_atmosphere();
        if reader.peek().is_none() {
            return Ok(out);
        }
        out.push(reader.read_datum(symbols)?);
    }
}

struct Reader<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Reader { chars: src.chars().peekable() }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        self.chars.next()
    }

    fn skip_atmosphere(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
            } else if c == ';' {
                while let Some(c) = self.bump() {
                    if c == '\n' {
                        break;
                    }
                }
            } else {
                return;
            }
        }
    }

    fn read_datum(&mut self, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
        self.skip_atmosphere();
        match self.peek() {
            None => Err(ReadError::UnexpectedEof),
            Some('(') => {
                self.bump();
                self.read_list(symbols)
            }
            Some(')') => Err(ReadError::UnbalancedParen),
            Some('\'') => {
                self.bump();
                let datum = self.read_datum(symbols)?;
                let quote = symbols.intern("quote");
                Ok(cons(quote, cons(datum, Value::NIL)))
            }
            Some('"') => {
                self.bump();
                self.read_string()
            }
            Some('#') => {
                self.bump();
                self.read_hash()
            }
            Some(_) => self.read_atom(symbols),
        }
    }

    fn read_list(&mut self, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
        let mut items = Vec::new();
        let mut tail = Value::NIL;
        loop {
            self.skip_atmosphere();
            match self.peek() {
                None => return Err(ReadError::UnexpectedEof),
                Some(')') => {
                    self.bump();
                    break;
                }
                Some('.') => {
                    // A lone dot ends the proper prefix; leading-dot
                    // atoms are rejected, so a dot followed by a
                    // delimiter is the only legal use.
                    self.bump();
                    match self.peek() {
                        Some(c) if c.is_whitespace() || c == '(' || c == '\'' || c == '"' => {}
                        _ => return Err(ReadError::MisplacedDot),
                    }
                    if items.is_empty() {
                        return Err(ReadError::MisplacedDot);
                    }
                    tail = self.read_datum(symbols)?;
                    self.skip_atmosphere();
                    match self.bump() {
                        Some(')') => break,
                        _ => return Err(ReadError::MisplacedDot),
                    }
                }
                Some(_) => items.push(self.read_datum(symbols)?),
            }
        }
        let mut lst = tail;
        for item in items.into_iter().rev() {
            lst = cons(item, lst);
        }
        Ok(lst)
    }

    fn read_string(&mut self) -> Result<Value, ReadError> {
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(ReadError::UnterminatedString),
                Some('"') => return Ok(heap::alloc_string(&out)),
                Some('\\') => match self.bump() {
                    Some('n') => out.push('\n'),
                    Some('t') => out.push('\t'),
                    Some('\\') => out.push('\\'),
                    Some('"') => out.push('"'),
                    Some(c) => return Err(ReadError::UnexpectedChar(c)),
                    None => return Err(ReadError::UnterminatedString),
                },
                Some(c) => out.push(c),
            }
        }
    }

    fn read_hash(&mut self) -> Result<Value, ReadError> {
        match self.bump() {
            Some('t') => Ok(Value::TRUE),
            Some('f') => Ok(Value::FALSE),
            Some('\\') => {
                let mut name = String::new();
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '(' || c == ')' {
                        break;
                    }
                    name.push(c);
                    self.bump();
                }
                match name.as_str() {
                    "" => Err(ReadError::UnexpectedEof),
                    "space" => Ok(Value::char(' ')),
                    "newline" => Ok(Value::char('\n')),
                    "tab" => Ok(Value::char('\t')),
                    s if s.chars().count() == 1 => {
                        Ok(Value::char(s.chars().next().unwrap()))
                    }
                    s => Err(ReadError::BadHashSyntax(format!("\\{}", s))),
                }
            }
            Some(c) => Err(ReadError::BadHashSyntax(c.to_string())),
            None => Err(ReadError::UnexpectedEof),
        }
    }

    fn read_atom(&mut self, symbols: &mut SymbolTable) -> Result<Value, ReadError> {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == ';' || c == '"' || c == '\'' {
                break;
            }
            text.push(c);
            self.bump();
        }
        debug_assert!(!text.is_empty());
        // a dot only ever marks an improper tail; leading-dot atoms are
        // rejected in every position
        if text.starts_with('.') {
            return Err(ReadError::MisplacedDot);
        }
        let numeric = {
            let digits = text.strip_prefix(['-', '+']).unwrap_or(&text);
            !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
        };
        if numeric {
            let n: i64 = text
                .parse()
                .map_err(|_| ReadError::IntegerOverflow(text.clone()))?;
            if !(FIXNUM_MIN..=FIXNUM_MAX).contains(&n) {
                return Err(ReadError::IntegerOverflow(text));
            }
            Ok(Value::fixnum(n))
        } else {
            Ok(symbols.intern(&text))
        }
    }
}
