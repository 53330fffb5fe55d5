use thiserror::Error;

/// Maximum width of a list rendered on a single line by [`SExp::to_pretty_string`].
const INLINE_WIDTH: usize = 72;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Unexpected token: {0}")]
    UnexpectedToken(String),
    #[error("Parse error at position {0}: {1}")]
    ParseError(usize, String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SExp {
    Atom(String),
    List(Vec<SExp>),
}

impl SExp {
    pub fn atom(value: impl Into<String>) -> Self {
        SExp::Atom(value.into())
    }

    /// Build `(key value)`.
    pub fn pair(key: &str, value: impl Into<String>) -> Self {
        SExp::List(vec![SExp::atom(key), SExp::atom(value)])
    }

    /// Build `(key child child ...)`.
    pub fn node(key: &str, children: impl IntoIterator<Item = SExp>) -> Self {
        let mut items = vec![SExp::atom(key)];
        items.extend(children);
        SExp::List(items)
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            SExp::Atom(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExp]> {
        match self {
            SExp::List(items) => Some(items),
            _ => None,
        }
    }

    /// The leading atom of a list, e.g. `symbol` for `(symbol "D" ...)`.
    pub fn head(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(|first| first.as_atom())
    }

    /// Atom at position `index` of a list (0 is the head).
    pub fn atom_at(&self, index: usize) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.get(index))
            .and_then(|item| item.as_atom())
    }

    /// Direct children lists whose head is `key`.
    pub fn children<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a SExp> + 'a {
        self.as_list()
            .unwrap_or(&[])
            .iter()
            .filter(move |item| item.head() == Some(key))
    }

    /// First direct child list whose head is `key`.
    pub fn child(&self, key: &str) -> Option<&SExp> {
        self.as_list()?.iter().find(|item| item.head() == Some(key))
    }

    /// First atom argument of the child list `key`, e.g. `"K"` for
    /// `(name "K" (effects ...))`.
    pub fn first_arg(&self, key: &str) -> Option<&str> {
        self.child(key).and_then(|c| c.atom_at(1))
    }

    fn depth(&self) -> usize {
        match self {
            SExp::Atom(_) => 0,
            SExp::List(items) => 1 + items.iter().map(SExp::depth).max().unwrap_or(0),
        }
    }

    /// Render in the layout KiCad uses for generated files: heads bare, every
    /// other atom quoted, shallow lists on one line and deeper ones broken
    /// with two-space indentation.
    pub fn to_pretty_string(&self) -> String {
        let mut out = String::new();
        self.write_pretty(&mut out, 0);
        out.push('\n');
        out
    }

    fn write_pretty(&self, out: &mut String, indent: usize) {
        match self {
            SExp::Atom(s) => out.push_str(&quote(s)),
            SExp::List(items) => {
                let inline = self.inline();
                if self.depth() <= 2 && indent * 2 + inline.len() <= INLINE_WIDTH {
                    out.push_str(&inline);
                    return;
                }
                out.push('(');
                let mut broke = false;
                for (i, item) in items.iter().enumerate() {
                    match item {
                        SExp::Atom(s) if i == 0 => out.push_str(s),
                        SExp::Atom(s) if !broke => {
                            out.push(' ');
                            out.push_str(&quote(s));
                        }
                        _ => {
                            broke = true;
                            out.push('\n');
                            out.push_str(&"  ".repeat(indent + 1));
                            item.write_pretty(out, indent + 1);
                        }
                    }
                }
                out.push(')');
            }
        }
    }

    fn inline(&self) -> String {
        match self {
            SExp::Atom(s) => quote(s),
            SExp::List(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| match item {
                        SExp::Atom(s) if i == 0 => s.clone(),
                        other => other.inline(),
                    })
                    .collect();
                format!("({})", parts.join(" "))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

pub struct SExpParser {
    input: Vec<char>,
    pos: usize,
}

impl SExpParser {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    /// Parse a single expression; anything but whitespace after it is an error.
    pub fn parse(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }
        let sexp = self.parse_sexp()?;
        self.skip_whitespace();
        if !self.is_eof() {
            return Err(ParseError::ParseError(
                self.pos,
                "trailing content after expression".to_string(),
            ));
        }
        Ok(sexp)
    }

    fn parse_sexp(&mut self) -> Result<SExp, ParseError> {
        self.skip_whitespace();

        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        match self.peek() {
            '(' => self.parse_list(),
            ')' => Err(ParseError::ParseError(self.pos, "unbalanced ')'".to_string())),
            _ => self.parse_atom(),
        }
    }

    fn parse_list(&mut self) -> Result<SExp, ParseError> {
        self.expect_char('(')?;
        let mut items = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_eof() {
                return Err(ParseError::UnexpectedEof);
            }

            if self.peek() == ')' {
                self.advance();
                break;
            }

            items.push(self.parse_sexp()?);
        }

        Ok(SExp::List(items))
    }

    fn parse_atom(&mut self) -> Result<SExp, ParseError> {
        if self.peek() == '"' {
            self.parse_string()
        } else {
            self.parse_symbol()
        }
    }

    fn parse_string(&mut self) -> Result<SExp, ParseError> {
        let start = self.pos;
        self.expect_char('"')?;
        let mut s = String::new();
        let mut escaped = false;

        while !self.is_eof() {
            let ch = self.peek();
            self.advance();

            if escaped {
                match ch {
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    'r' => s.push('\r'),
                    _ => s.push(ch),
                }
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                return Ok(SExp::Atom(s));
            } else {
                s.push(ch);
            }
        }

        Err(ParseError::ParseError(start, "unterminated string".to_string()))
    }

    fn parse_symbol(&mut self) -> Result<SExp, ParseError> {
        let mut s = String::new();

        while !self.is_eof() {
            let ch = self.peek();
            if ch.is_whitespace() || ch == '(' || ch == ')' {
                break;
            }
            s.push(ch);
            self.advance();
        }

        if s.is_empty() {
            Err(ParseError::UnexpectedToken("empty symbol".to_string()))
        } else {
            Ok(SExp::Atom(s))
        }
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.peek().is_whitespace() {
            self.advance();
        }
    }

    fn peek(&self) -> char {
        self.input.get(self.pos).copied().unwrap_or('\0')
    }

    fn advance(&mut self) {
        if self.pos < self.input.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        if self.is_eof() {
            return Err(ParseError::UnexpectedEof);
        }

        let ch = self.peek();
        if ch == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!(
                "Expected '{}', found '{}'",
                expected, ch
            )))
        }
    }
}
