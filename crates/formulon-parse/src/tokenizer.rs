//! Turns formula source text into a flat token stream. Operates over
//! `char` positions rather than byte offsets, since sheet names and text
//! literals may contain arbitrary Unicode and the grammar itself is ASCII.

use std::fmt;

use formulon_common::error::ErrorKind;

use crate::precedence::Assoc;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Text(String),
    Boolean(bool),
    ErrorLit(ErrorKind),
    /// Identifier immediately followed by `(` — a function call head.
    FuncHead(String),
    /// Identifier not otherwise classified — a named reference.
    Ident(String),
    /// Raw reference text (sheet prefix, `$` markers, and all), deferred
    /// to the parser for structural decoding.
    Reference(String),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Op(&'static str),
    /// Synthetic token for a significant single space between two
    /// reference-shaped tokens (the intersection operator).
    Intersect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    /// True for token kinds that can stand as the left or right side of
    /// the intersection operator (a bare significant space).
    pub fn is_reference_shaped(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Reference(_) | TokenKind::Ident(_) | TokenKind::RParen
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TokenizerError {
    pub message: String,
    pub pos: usize,
}

impl fmt::Display for TokenizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tokenizer error at position {}: {}", self.pos, self.message)
    }
}

impl std::error::Error for TokenizerError {}

const ERROR_CODES: &[&str] = &[
    "#NULL!", "#DIV/0!", "#VALUE!", "#REF!", "#NUM!", "#NAME?", "#N/A",
];

/// Strips the optional leading `=` (and, for array-entered formulas, the
/// wrapping `{` `}`) so the remainder can be tokenized as a plain
/// expression. Array-entry itself carries no further meaning here since
/// array-formula broadcast semantics are out of scope.
pub fn strip_formula_prefix(src: &str) -> &str {
    let mut s = src.trim();
    if let Some(inner) = s.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
        s = inner.trim();
    }
    s.strip_prefix('=').unwrap_or(s).trim_start()
}

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
    /// True if a (non-intersection) space was skipped since the last
    /// token was pushed, pending a decision on whether it forms an
    /// intersection operator.
    pending_space: bool,
}

impl Tokenizer {
    pub fn tokenize(src: &str) -> Result<Vec<Token>, TokenizerError> {
        let body = strip_formula_prefix(src);
        let mut t = Tokenizer {
            chars: body.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
            pending_space: false,
        };
        t.run()?;
        Ok(t.tokens)
    }

    fn run(&mut self) -> Result<(), TokenizerError> {
        while self.pos < self.chars.len() {
            let c = self.chars[self.pos];
            if c.is_whitespace() {
                self.consume_whitespace();
                continue;
            }
            let start = self.pos;
            let kind = self.lex_one()?;
            let end = self.pos;
            self.push(Token { kind, start, end });
        }
        Ok(())
    }

    fn consume_whitespace(&mut self) {
        while self.pos < self.chars.len() && self.chars[self.pos].is_whitespace() {
            self.pos += 1;
        }
        if !self.tokens.is_empty() {
            self.pending_space = true;
        }
    }

    fn push(&mut self, token: Token) {
        if self.pending_space {
            self.pending_space = false;
            if let Some(prev) = self.tokens.last() {
                if prev.is_reference_shaped() && token.is_reference_shaped() {
                    let at = token.start;
                    self.tokens.push(Token {
                        kind: TokenKind::Intersect,
                        start: at,
                        end: at,
                    });
                }
            }
        }
        self.tokens.push(token);
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    /// First non-whitespace character from the current position onward,
    /// without consuming anything. Used to look past optional whitespace
    /// before a `(` when deciding whether an identifier is a function head.
    fn peek_past_whitespace(&self) -> Option<char> {
        let mut i = self.pos;
        while self.chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        self.chars.get(i).copied()
    }

    fn lex_one(&mut self) -> Result<TokenKind, TokenizerError> {
        let c = self.chars[self.pos];
        if c == '#' {
            return self.lex_error_literal();
        }
        if c == '{' {
            self.pos += 1;
            return Ok(TokenKind::LBrace);
        }
        if c == '}' {
            self.pos += 1;
            return Ok(TokenKind::RBrace);
        }
        if c == '"' {
            return self.lex_string();
        }
        if c == '\'' {
            return self.lex_reference_or_fail();
        }
        if c == '(' {
            self.pos += 1;
            return Ok(TokenKind::LParen);
        }
        if c == ')' {
            self.pos += 1;
            return Ok(TokenKind::RParen);
        }
        if c == ',' {
            self.pos += 1;
            return Ok(TokenKind::Comma);
        }
        if c == ';' {
            self.pos += 1;
            return Ok(TokenKind::Semicolon);
        }
        if c == '%' {
            self.pos += 1;
            return Ok(TokenKind::Op("%"));
        }
        if c == ':' {
            self.pos += 1;
            return Ok(TokenKind::Op(":"));
        }
        if c == '&' {
            self.pos += 1;
            return Ok(TokenKind::Op("&"));
        }
        if c == '^' {
            self.pos += 1;
            return Ok(TokenKind::Op("^"));
        }
        if c == '*' {
            self.pos += 1;
            return Ok(TokenKind::Op("*"));
        }
        if c == '/' {
            self.pos += 1;
            return Ok(TokenKind::Op("/"));
        }
        if c == '+' {
            self.pos += 1;
            return Ok(TokenKind::Op("+"));
        }
        if c == '-' {
            self.pos += 1;
            return Ok(TokenKind::Op("-"));
        }
        if c == '<' {
            self.pos += 1;
            if self.peek() == Some('=') {
                self.pos += 1;
                return Ok(TokenKind::Op("<="));
            }
            if self.peek() == Some('>') {
                self.pos += 1;
                return Ok(TokenKind::Op("<>"));
            }
            return Ok(TokenKind::Op("<"));
        }
        if c == '>' {
            self.pos += 1;
            if self.peek() == Some('=') {
                self.pos += 1;
                return Ok(TokenKind::Op(">="));
            }
            return Ok(TokenKind::Op(">"));
        }
        if c == '=' {
            self.pos += 1;
            return Ok(TokenKind::Op("="));
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return Ok(self.lex_number());
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_word_or_reference();
        }
        if c == '$' && self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic() || n.is_ascii_digit())
        {
            return self.lex_reference_or_fail();
        }
        Err(TokenizerError {
            message: format!("unrecognised character '{c}'"),
            pos: self.pos,
        })
    }

    fn lex_error_literal(&mut self) -> Result<TokenKind, TokenizerError> {
        let start = self.pos;
        for code in ERROR_CODES {
            let n = code.chars().count();
            if self.pos + n <= self.chars.len() {
                let candidate: String = self.chars[self.pos..self.pos + n].iter().collect();
                if candidate.eq_ignore_ascii_case(code) {
                    self.pos += n;
                    return Ok(TokenKind::ErrorLit(ErrorKind::parse(code).unwrap()));
                }
            }
        }
        Err(TokenizerError {
            message: "unterminated or unknown error literal".into(),
            pos: start,
        })
    }

    fn lex_string(&mut self) -> Result<TokenKind, TokenizerError> {
        let start = self.pos;
        self.pos += 1; // opening quote
        let mut s = String::new();
        loop {
            match self.peek() {
                None => {
                    return Err(TokenizerError {
                        message: "unterminated string literal".into(),
                        pos: start,
                    })
                }
                Some('"') => {
                    self.pos += 1;
                    if self.peek() == Some('"') {
                        s.push('"');
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.pos += 1;
                }
            }
        }
        Ok(TokenKind::Text(s))
    }

    fn lex_number(&mut self) -> TokenKind {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        } else if self.peek() == Some('.') {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        TokenKind::Number(text.parse().unwrap_or(f64::NAN))
    }

    /// Lexes an identifier-led token: boolean, function head, named
    /// reference, or (via `lex_word_as_reference`) a cell/range reference.
    fn lex_word_or_reference(&mut self) -> Result<TokenKind, TokenizerError> {
        if let Some(kind) = self.try_lex_reference()? {
            return Ok(kind);
        }
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '.')
        {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        if word.eq_ignore_ascii_case("TRUE") {
            return Ok(TokenKind::Boolean(true));
        }
        if word.eq_ignore_ascii_case("FALSE") {
            return Ok(TokenKind::Boolean(false));
        }
        // A function head is recognised even when whitespace separates the
        // name from `(` (`SUM (1)`); the intervening space is plain
        // whitespace, consumed normally by the run loop afterward.
        if self.peek_past_whitespace() == Some('(') {
            return Ok(TokenKind::FuncHead(word));
        }
        Ok(TokenKind::Ident(word))
    }

    fn lex_reference_or_fail(&mut self) -> Result<TokenKind, TokenizerError> {
        match self.try_lex_reference()? {
            Some(kind) => Ok(kind),
            None => Err(TokenizerError {
                message: "expected a cell or range reference".into(),
                pos: self.pos,
            }),
        }
    }

    /// Attempts to greedily match a (possibly sheet-qualified) cell
    /// range, whole-column range, whole-row range, or single cell
    /// reference starting at the current position. Returns `Ok(None)`
    /// without consuming input if the shape does not match, so the
    /// caller can fall back to identifier lexing.
    fn try_lex_reference(&mut self) -> Result<Option<TokenKind>, TokenizerError> {
        let start = self.pos;
        let mut cursor = self.pos;

        if let Some(after_sheet) = self.try_match_sheet_prefix(cursor) {
            cursor = after_sheet;
        }

        let Some((kind1, after1)) = self.match_ref_component(cursor) else {
            self.pos = start;
            return Ok(None);
        };
        cursor = after1;

        if self.chars.get(cursor) == Some(&':') {
            let after_colon = cursor + 1;
            if let Some((kind2, after2)) = self.match_ref_component(after_colon) {
                let compatible = matches!(
                    (&kind1, &kind2),
                    (RefComponent::Cell(..), RefComponent::Cell(..))
                        | (RefComponent::Col(_), RefComponent::Col(_))
                        | (RefComponent::Row(_), RefComponent::Row(_))
                );
                if compatible {
                    cursor = after2;
                    self.pos = cursor;
                    let text: String = self.chars[start..cursor].iter().collect();
                    return Ok(Some(TokenKind::Reference(text)));
                }
            }
        }

        // Bare column-only or row-only components are only meaningful as
        // half of a range; standing alone they are not a reference.
        if matches!(kind1, RefComponent::Col(_) | RefComponent::Row(_)) {
            self.pos = start;
            return Ok(None);
        }

        self.pos = cursor;
        let text: String = self.chars[start..cursor].iter().collect();
        Ok(Some(TokenKind::Reference(text)))
    }

    /// If a sheet prefix (`Sheet1!` or `'Quoted Sheet'!`) starts at
    /// `from`, returns the position right after the `!`.
    fn try_match_sheet_prefix(&self, from: usize) -> Option<usize> {
        let mut cursor = from;
        if self.chars.get(cursor) == Some(&'\'') {
            cursor += 1;
            loop {
                match self.chars.get(cursor)? {
                    '\'' => {
                        cursor += 1;
                        if self.chars.get(cursor) == Some(&'\'') {
                            cursor += 1;
                            continue;
                        }
                        break;
                    }
                    _ => cursor += 1,
                }
            }
        } else {
            let word_start = cursor;
            while self
                .chars
                .get(cursor)
                .is_some_and(|c| c.is_alphanumeric() || *c == '_' || *c == '.')
            {
                cursor += 1;
            }
            if cursor == word_start {
                return None;
            }
        }
        if self.chars.get(cursor) == Some(&'!') {
            Some(cursor + 1)
        } else {
            None
        }
    }

    /// Matches one `$?letters$?digits`, `$?letters`, or `$?digits`
    /// component starting at `from`.
    fn match_ref_component(&self, from: usize) -> Option<(RefComponent, usize)> {
        let mut cursor = from;
        if self.chars.get(cursor) == Some(&'$') {
            cursor += 1;
        }
        let letters_start = cursor;
        while self.chars.get(cursor).is_some_and(|c| c.is_ascii_alphabetic()) {
            cursor += 1;
        }
        let letters: String = self.chars[letters_start..cursor].iter().collect();

        let mut has_dollar_row = false;
        if self.chars.get(cursor) == Some(&'$') {
            has_dollar_row = true;
            cursor += 1;
        }
        let digits_start = cursor;
        while self.chars.get(cursor).is_some_and(|c| c.is_ascii_digit()) {
            cursor += 1;
        }
        let digits: String = self.chars[digits_start..cursor].iter().collect();

        if !letters.is_empty() && !digits.is_empty() {
            let col = formulon_common::address::column_to_number(&letters)?;
            let row: u32 = digits.parse().ok()?;
            Some((RefComponent::Cell(col, row), cursor))
        } else if !letters.is_empty() && digits.is_empty() && !has_dollar_row {
            let col = formulon_common::address::column_to_number(&letters)?;
            Some((RefComponent::Col(col), cursor))
        } else if letters.is_empty() && !digits.is_empty() {
            let row: u32 = digits.parse().ok()?;
            Some((RefComponent::Row(row), cursor))
        } else {
            None
        }
    }

    /// Re-renders the token stream back into formula text. Used to check
    /// the parse-stability testable property (pretty-print then re-parse).
    pub fn render(tokens: &[Token]) -> String {
        let mut out = String::new();
        for (i, t) in tokens.iter().enumerate() {
            if i > 0 {
                match &t.kind {
                    TokenKind::RParen | TokenKind::RBrace => {}
                    _ => match &tokens[i - 1].kind {
                        TokenKind::LParen | TokenKind::LBrace => {}
                        _ => out.push(' '),
                    },
                }
            }
            render_token(&mut out, &t.kind);
        }
        out
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefComponent {
    Cell(u32, u32),
    Col(u32),
    Row(u32),
}

fn render_token(out: &mut String, kind: &TokenKind) {
    match kind {
        TokenKind::Number(n) => out.push_str(&n.to_string()),
        TokenKind::Text(s) => {
            out.push('"');
            out.push_str(&s.replace('"', "\"\""));
            out.push('"');
        }
        TokenKind::Boolean(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
        TokenKind::ErrorLit(e) => out.push_str(&e.to_string()),
        TokenKind::FuncHead(n) => out.push_str(n),
        TokenKind::Ident(n) => out.push_str(n),
        TokenKind::Reference(r) => out.push_str(r),
        TokenKind::LParen => out.push('('),
        TokenKind::RParen => out.push(')'),
        TokenKind::LBrace => out.push('{'),
        TokenKind::RBrace => out.push('}'),
        TokenKind::Comma => out.push(','),
        TokenKind::Semicolon => out.push(';'),
        TokenKind::Op(s) => out.push_str(s),
        TokenKind::Intersect => out.push(' '),
    }
}

/// Resolved precedence/associativity for an infix operator token, used by
/// the parser's precedence-climbing loop.
pub fn infix_precedence(op: &str) -> Option<(u8, Assoc)> {
    crate::precedence::binary_precedence(op)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Tokenizer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn tokenizes_simple_arithmetic() {
        assert_eq!(
            kinds("=1+2*3"),
            vec![
                TokenKind::Number(1.0),
                TokenKind::Op("+"),
                TokenKind::Number(2.0),
                TokenKind::Op("*"),
                TokenKind::Number(3.0),
            ]
        );
    }

    #[test]
    fn scientific_notation_exponent_sign_is_not_a_separate_token() {
        assert_eq!(kinds("=1.5E+10"), vec![TokenKind::Number(1.5e10)]);
    }

    #[test]
    fn string_literal_unescapes_doubled_quotes() {
        assert_eq!(
            kinds(r#"="say ""hi"""#),
            vec![TokenKind::Text("say \"hi\"".to_string())]
        );
    }

    #[test]
    fn recognises_error_literals_case_insensitively() {
        assert_eq!(kinds("=#div/0!"), vec![TokenKind::ErrorLit(ErrorKind::DivZero)]);
    }

    #[test]
    fn function_head_with_immediate_paren() {
        assert_eq!(
            kinds("=SUM(1)"),
            vec![
                TokenKind::FuncHead("SUM".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn function_head_recognised_across_whitespace_before_paren() {
        assert_eq!(
            kinds("=SUM (1)"),
            vec![
                TokenKind::FuncHead("SUM".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn plain_cell_reference() {
        assert_eq!(kinds("=A1"), vec![TokenKind::Reference("A1".into())]);
    }

    #[test]
    fn sheet_qualified_range_reference() {
        assert_eq!(
            kinds("=Sheet1!A1:B2"),
            vec![TokenKind::Reference("Sheet1!A1:B2".into())]
        );
    }

    #[test]
    fn quoted_sheet_reference() {
        assert_eq!(
            kinds("='My Sheet'!A1"),
            vec![TokenKind::Reference("'My Sheet'!A1".into())]
        );
    }

    #[test]
    fn whole_column_and_whole_row_ranges() {
        assert_eq!(kinds("=A:A"), vec![TokenKind::Reference("A:A".into())]);
        assert_eq!(kinds("=1:10"), vec![TokenKind::Reference("1:10".into())]);
    }

    #[test]
    fn absolute_markers_are_retained_in_raw_text() {
        assert_eq!(kinds("=$A$1"), vec![TokenKind::Reference("$A$1".into())]);
    }

    #[test]
    fn intersection_operator_between_two_references() {
        assert_eq!(
            kinds("=A1 B1"),
            vec![
                TokenKind::Reference("A1".into()),
                TokenKind::Intersect,
                TokenKind::Reference("B1".into()),
            ]
        );
    }

    #[test]
    fn space_inside_function_args_is_not_intersection() {
        assert_eq!(
            kinds("=SUM(1, 2)"),
            vec![
                TokenKind::FuncHead("SUM".into()),
                TokenKind::LParen,
                TokenKind::Number(1.0),
                TokenKind::Comma,
                TokenKind::Number(2.0),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn named_reference_vs_short_identifier() {
        assert_eq!(kinds("=MyRange"), vec![TokenKind::Ident("MyRange".into())]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Tokenizer::tokenize(r#"="abc"#).is_err());
    }
}
