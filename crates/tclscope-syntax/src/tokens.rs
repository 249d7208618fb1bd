//! Host parser adapter: word-level command tokenisation and list splitting.
//!
//! The rest of the crate consumes two primitives with the classic Tcl parser
//! contract and stays ignorant of how they are produced:
//!
//! - [`parse_command`] yields one command's flat token array. A word-level
//!   token ([`TokenKind::Word`], [`TokenKind::SimpleWord`],
//!   [`TokenKind::ExpandWord`], [`TokenKind::Variable`]) is followed by its
//!   component tokens; `components` counts the token's entire subtree.
//! - [`split_list`] yields the element spans of a list-formatted string.
//!
//! Spans are byte ranges into the text the caller handed in, so nested
//! scripts (bracket interiors, brace bodies) can be re-parsed in place.

use thiserror::Error;

use crate::source::Span;

/// Token kinds, mirroring the host parser's token layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// A word containing substitutions; components follow.
    Word,
    /// A word that is exactly one `Text` component (possibly brace/quote
    /// delimited); the component follows.
    SimpleWord,
    /// A word prefixed by the `{*}` expansion marker.
    ExpandWord,
    /// A literal run of characters.
    Text,
    /// A backslash escape sequence.
    Bs,
    /// A `[...]` command substitution; the span includes both brackets and
    /// the interior is re-parsed by the caller.
    Command,
    /// A `$name`, `${name}` or `$name(index)` substitution; the first
    /// component is the name text, the rest tokenise the array index.
    Variable,
}

/// One entry of the flat token array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Number of tokens in this token's subtree (excluding itself).
    pub components: usize,
}

/// The result of parsing a single command out of a byte range.
#[derive(Debug, Clone)]
pub struct ParsedCommand {
    /// Span of the leading comment block, if any (without its final newline).
    pub comment: Option<Span>,
    /// Span of the command text, excluding leading trivia and the terminator.
    pub span: Span,
    /// Offset at which parsing of the next command should resume.
    pub next: usize,
    /// Number of top-level words.
    pub words: usize,
    pub tokens: Vec<Token>,
}

/// A tokenisation failure at a specific byte offset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing close-brace at offset {offset}")]
    MissingCloseBrace { offset: usize },
    #[error("missing close-bracket at offset {offset}")]
    MissingCloseBracket { offset: usize },
    #[error("missing closing quote at offset {offset}")]
    MissingQuote { offset: usize },
    #[error("missing close-paren in array reference at offset {offset}")]
    MissingParen { offset: usize },
    #[error("extra characters after close-brace at offset {offset}")]
    ExtraAfterCloseBrace { offset: usize },
    #[error("extra characters after close-quote at offset {offset}")]
    ExtraAfterCloseQuote { offset: usize },
    #[error("unbalanced list element at offset {offset}")]
    BadListElement { offset: usize },
}

impl ParseError {
    /// The offset the failure was detected at.
    pub fn offset(&self) -> usize {
        match *self {
            ParseError::MissingCloseBrace { offset }
            | ParseError::MissingCloseBracket { offset }
            | ParseError::MissingQuote { offset }
            | ParseError::MissingParen { offset }
            | ParseError::ExtraAfterCloseBrace { offset }
            | ParseError::ExtraAfterCloseQuote { offset }
            | ParseError::BadListElement { offset } => offset,
        }
    }
}

/// True for bytes that terminate a command.
pub fn is_command_terminator(byte: u8) -> bool {
    byte == b'\n' || byte == b';'
}

fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\r')
}

fn is_name_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Parse one command from `text[range]`.
///
/// Leading whitespace, blank lines and `#` comments are consumed first; the
/// returned `words` is zero when the range held nothing but trivia or a bare
/// terminator.
pub fn parse_command(text: &str, range: Span) -> Result<ParsedCommand, ParseError> {
    Tokenizer::new(text, range).run()
}

/// Split `text[range]` into list element spans, following the Tcl list rules:
/// brace-quoted elements preserve their contents verbatim, quoted elements
/// pass substitution source text through, backslashes escape the next byte.
pub fn split_list(text: &str, range: Span) -> Result<Vec<Span>, ParseError> {
    let bytes = text.as_bytes();
    let mut pos = range.start;
    let end = range.end;
    let mut elements = Vec::new();

    loop {
        while pos < end && (is_space(bytes[pos]) || bytes[pos] == b'\n') {
            pos += 1;
        }
        if pos >= end {
            break;
        }
        match bytes[pos] {
            b'{' => {
                let open = pos;
                let mut depth = 1usize;
                pos += 1;
                let start = pos;
                while pos < end && depth > 0 {
                    match bytes[pos] {
                        b'\\' => pos += 2,
                        b'{' => {
                            depth += 1;
                            pos += 1;
                        }
                        b'}' => {
                            depth -= 1;
                            pos += 1;
                        }
                        _ => pos += 1,
                    }
                }
                if depth > 0 || pos > end {
                    return Err(ParseError::BadListElement { offset: open });
                }
                elements.push(Span::new(start, pos - 1));
                if pos < end && !is_space(bytes[pos]) && bytes[pos] != b'\n' {
                    return Err(ParseError::BadListElement { offset: pos });
                }
            }
            b'"' => {
                let open = pos;
                pos += 1;
                let start = pos;
                while pos < end && bytes[pos] != b'"' {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
                if pos >= end {
                    return Err(ParseError::BadListElement { offset: open });
                }
                elements.push(Span::new(start, pos));
                pos += 1;
                if pos < end && !is_space(bytes[pos]) && bytes[pos] != b'\n' {
                    return Err(ParseError::BadListElement { offset: pos });
                }
            }
            _ => {
                let start = pos;
                while pos < end && !is_space(bytes[pos]) && bytes[pos] != b'\n' {
                    if bytes[pos] == b'\\' {
                        pos += 1;
                    }
                    pos += 1;
                }
                elements.push(Span::new(start, pos.min(end)));
            }
        }
    }

    Ok(elements)
}

/// Token-scanning context: what ends a run of tokens.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Stop {
    /// Bare word: whitespace, a terminator, or backslash-newline.
    Bare,
    /// Quoted word: an unescaped `"`.
    Quote,
    /// Array index: an unescaped `)`.
    Paren,
}

struct Tokenizer<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
    tokens: Vec<Token>,
}

impl<'a> Tokenizer<'a> {
    fn new(text: &'a str, range: Span) -> Self {
        Self { bytes: text.as_bytes(), pos: range.start, end: range.end, tokens: Vec::new() }
    }

    fn run(mut self) -> Result<ParsedCommand, ParseError> {
        let comment = self.skip_trivia();
        let start = self.pos;
        let mut words = 0usize;

        let (cmd_end, next) = loop {
            self.skip_word_separators();
            if self.pos >= self.end {
                break (self.end, self.end);
            }
            let byte = self.bytes[self.pos];
            if is_command_terminator(byte) {
                break (self.pos, self.pos + 1);
            }
            self.word()?;
            words += 1;
        };

        Ok(ParsedCommand {
            comment,
            span: Span::new(start.min(cmd_end), cmd_end),
            next,
            words,
            tokens: self.tokens,
        })
    }

    /// Consume leading whitespace (newlines included) and `#` comment lines,
    /// returning the comment block's span.
    fn skip_trivia(&mut self) -> Option<Span> {
        let mut comment: Option<Span> = None;
        loop {
            while self.pos < self.end {
                let byte = self.bytes[self.pos];
                if is_space(byte) || byte == b'\n' {
                    self.pos += 1;
                } else if self.at_backslash_newline() {
                    self.pos += 2;
                } else {
                    break;
                }
            }
            if self.pos < self.end && self.bytes[self.pos] == b'#' {
                let line_start = self.pos;
                while self.pos < self.end && self.bytes[self.pos] != b'\n' {
                    if self.bytes[self.pos] == b'\\' && self.pos + 1 < self.end {
                        self.pos += 1;
                    }
                    self.pos += 1;
                }
                let first = comment.map_or(line_start, |span: Span| span.start);
                comment = Some(Span::new(first, self.pos));
                continue;
            }
            return comment;
        }
    }

    /// Skip whitespace between words: spaces, tabs, CR, and backslash-newline
    /// continuations (with any indentation that follows them).
    fn skip_word_separators(&mut self) {
        loop {
            if self.pos < self.end && is_space(self.bytes[self.pos]) {
                self.pos += 1;
            } else if self.at_backslash_newline() {
                self.pos += 2;
                while self.pos < self.end && is_space(self.bytes[self.pos]) {
                    self.pos += 1;
                }
            } else {
                return;
            }
        }
    }

    fn at_backslash_newline(&self) -> bool {
        self.pos + 1 < self.end
            && self.bytes[self.pos] == b'\\'
            && self.bytes[self.pos + 1] == b'\n'
    }

    /// Parse one word, emitting its word-level token followed by components.
    fn word(&mut self) -> Result<(), ParseError> {
        let word_start = self.pos;
        let mut expand = false;

        // {*} marks an expansion word unless it is the entire word.
        if self.bytes[self.pos..self.end.min(self.pos + 3)] == *b"{*}"
            && self.pos + 3 < self.end
            && !is_space(self.bytes[self.pos + 3])
            && !is_command_terminator(self.bytes[self.pos + 3])
        {
            expand = true;
            self.pos += 3;
        }

        let word_index = self.tokens.len();
        self.tokens.push(Token { kind: TokenKind::Word, span: Span::default(), components: 0 });

        if self.pos < self.end && self.bytes[self.pos] == b'{' {
            self.braced_word(word_start)?;
        } else if self.pos < self.end && self.bytes[self.pos] == b'"' {
            self.pos += 1;
            let interior = self.pos;
            let before = self.tokens.len();
            self.tokens_until(Stop::Quote, word_start)?;
            if self.tokens.len() == before {
                self.push(TokenKind::Text, Span::new(interior, self.pos));
            }
            self.pos += 1;
            if self.pos < self.end
                && !is_space(self.bytes[self.pos])
                && !is_command_terminator(self.bytes[self.pos])
                && !self.at_backslash_newline()
            {
                return Err(ParseError::ExtraAfterCloseQuote { offset: self.pos });
            }
        } else {
            self.tokens_until(Stop::Bare, word_start)?;
        }

        let components = self.tokens.len() - word_index - 1;
        let kind = if expand {
            TokenKind::ExpandWord
        } else if components == 1 && self.tokens[word_index + 1].kind == TokenKind::Text {
            TokenKind::SimpleWord
        } else {
            TokenKind::Word
        };
        self.tokens[word_index] =
            Token { kind, span: Span::new(word_start, self.pos), components };
        Ok(())
    }

    /// A `{...}` word: verbatim text, except that backslash-newline splits the
    /// interior into text runs joined by `Bs` tokens.
    fn braced_word(&mut self, word_start: usize) -> Result<(), ParseError> {
        self.pos += 1;
        let interior = self.pos;
        let mut depth = 1usize;
        while self.pos < self.end {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        if depth > 0 {
            return Err(ParseError::MissingCloseBrace { offset: word_start });
        }
        let interior_end = self.pos;
        self.pos += 1;
        if self.pos < self.end
            && !is_space(self.bytes[self.pos])
            && !is_command_terminator(self.bytes[self.pos])
            && !self.at_backslash_newline()
        {
            return Err(ParseError::ExtraAfterCloseBrace { offset: self.pos });
        }

        // Emit the interior: text runs split at backslash-newline junctions.
        let mut cursor = interior;
        let mut run_start = interior;
        let mut emitted = false;
        while cursor < interior_end {
            if self.bytes[cursor] == b'\\' && cursor + 1 < interior_end {
                if self.bytes[cursor + 1] == b'\n' {
                    if cursor > run_start {
                        self.push(TokenKind::Text, Span::new(run_start, cursor));
                        emitted = true;
                    }
                    let bs_start = cursor;
                    cursor += 2;
                    while cursor < interior_end && is_space(self.bytes[cursor]) {
                        cursor += 1;
                    }
                    self.push(TokenKind::Bs, Span::new(bs_start, cursor));
                    emitted = true;
                    run_start = cursor;
                } else {
                    cursor += 2;
                }
            } else {
                cursor += 1;
            }
        }
        if cursor > run_start || !emitted {
            self.push(TokenKind::Text, Span::new(run_start, interior_end));
        }
        Ok(())
    }

    /// Scan a run of `Text`/`Bs`/`Variable`/`Command` tokens up to the
    /// context's stop character.
    fn tokens_until(&mut self, stop: Stop, word_start: usize) -> Result<(), ParseError> {
        let mut run_start = self.pos;
        loop {
            if self.pos >= self.end {
                match stop {
                    Stop::Bare => break,
                    Stop::Quote => return Err(ParseError::MissingQuote { offset: word_start }),
                    Stop::Paren => return Err(ParseError::MissingParen { offset: word_start }),
                }
            }
            let byte = self.bytes[self.pos];
            let stopped = match stop {
                Stop::Bare => {
                    is_space(byte) || is_command_terminator(byte) || self.at_backslash_newline()
                }
                Stop::Quote => byte == b'"',
                Stop::Paren => byte == b')',
            };
            if stopped {
                break;
            }
            match byte {
                b'\\' => {
                    if self.pos > run_start {
                        self.push(TokenKind::Text, Span::new(run_start, self.pos));
                    }
                    let bs_start = self.pos;
                    if self.pos + 1 >= self.end {
                        self.pos = self.end;
                    } else if self.bytes[self.pos + 1] == b'\n' {
                        // Quoted/index context: the escape swallows the
                        // newline and any indentation after it.
                        self.pos += 2;
                        while self.pos < self.end && is_space(self.bytes[self.pos]) {
                            self.pos += 1;
                        }
                    } else {
                        self.pos += 2;
                    }
                    self.push(TokenKind::Bs, Span::new(bs_start, self.pos));
                    run_start = self.pos;
                }
                b'$' => {
                    if self.peek_variable() {
                        if self.pos > run_start {
                            self.push(TokenKind::Text, Span::new(run_start, self.pos));
                        }
                        self.variable(word_start)?;
                        run_start = self.pos;
                    } else {
                        // A bare `$` is literal text.
                        self.pos += 1;
                    }
                }
                b'[' => {
                    if self.pos > run_start {
                        self.push(TokenKind::Text, Span::new(run_start, self.pos));
                    }
                    self.bracket_command()?;
                    run_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }
        if self.pos > run_start {
            self.push(TokenKind::Text, Span::new(run_start, self.pos));
        }
        Ok(())
    }

    /// True if the `$` under the cursor starts a substitution rather than a
    /// literal dollar sign.
    fn peek_variable(&self) -> bool {
        let p = self.pos + 1;
        if p >= self.end {
            return false;
        }
        let byte = self.bytes[p];
        byte == b'{'
            || is_name_byte(byte)
            || (byte == b':' && p + 1 < self.end && self.bytes[p + 1] == b':')
    }

    /// Parse a `$` substitution; the caller has already checked
    /// [`Self::peek_variable`].
    fn variable(&mut self, word_start: usize) -> Result<(), ParseError> {
        let start = self.pos;
        let mut p = self.pos + 1;

        if self.bytes[p] == b'{' {
            p += 1;
            let name_start = p;
            while p < self.end && self.bytes[p] != b'}' {
                p += 1;
            }
            if p >= self.end {
                return Err(ParseError::MissingCloseBrace { offset: start });
            }
            let name = Span::new(name_start, p);
            self.pos = p + 1;
            self.push_with(TokenKind::Variable, Span::new(start, self.pos), 1);
            self.push(TokenKind::Text, name);
            return Ok(());
        }

        let name_start = p;
        while p < self.end {
            let byte = self.bytes[p];
            if is_name_byte(byte) {
                p += 1;
            } else if byte == b':' && p + 1 < self.end && self.bytes[p + 1] == b':' {
                p += 2;
            } else {
                break;
            }
        }

        if p < self.end && self.bytes[p] == b'(' {
            let var_index = self.tokens.len();
            self.tokens.push(Token {
                kind: TokenKind::Variable,
                span: Span::default(),
                components: 0,
            });
            self.push(TokenKind::Text, Span::new(name_start, p));
            self.pos = p + 1;
            self.tokens_until(Stop::Paren, word_start)?;
            self.pos += 1;
            self.tokens[var_index] = Token {
                kind: TokenKind::Variable,
                span: Span::new(start, self.pos),
                components: self.tokens.len() - var_index - 1,
            };
        } else {
            self.pos = p;
            self.push_with(TokenKind::Variable, Span::new(start, self.pos), 1);
            self.push(TokenKind::Text, Span::new(name_start, p));
        }
        Ok(())
    }

    /// Scan a `[...]` substitution to its matching close bracket, honouring
    /// nested brackets, braces, quotes and backslash escapes. The interior is
    /// left for the caller to re-parse.
    fn bracket_command(&mut self) -> Result<(), ParseError> {
        let open = self.pos;
        let mut depth = 1usize;
        self.pos += 1;
        while self.pos < self.end {
            match self.bytes[self.pos] {
                b'\\' => self.pos += 2,
                b'[' => {
                    depth += 1;
                    self.pos += 1;
                }
                b']' => {
                    depth -= 1;
                    self.pos += 1;
                    if depth == 0 {
                        self.push_with(
                            TokenKind::Command,
                            Span::new(open, self.pos),
                            0,
                        );
                        return Ok(());
                    }
                }
                b'{' => {
                    let mut braces = 1usize;
                    self.pos += 1;
                    while self.pos < self.end && braces > 0 {
                        match self.bytes[self.pos] {
                            b'\\' => self.pos += 2,
                            b'{' => {
                                braces += 1;
                                self.pos += 1;
                            }
                            b'}' => {
                                braces -= 1;
                                self.pos += 1;
                            }
                            _ => self.pos += 1,
                        }
                    }
                }
                b'"' => {
                    self.pos += 1;
                    while self.pos < self.end && self.bytes[self.pos] != b'"' {
                        if self.bytes[self.pos] == b'\\' {
                            self.pos += 1;
                        }
                        self.pos += 1;
                    }
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
        Err(ParseError::MissingCloseBracket { offset: open })
    }

    fn push(&mut self, kind: TokenKind, span: Span) {
        self.push_with(kind, span, 0);
    }

    fn push_with(&mut self, kind: TokenKind, span: Span, components: usize) {
        self.tokens.push(Token { kind, span, components });
    }
}
