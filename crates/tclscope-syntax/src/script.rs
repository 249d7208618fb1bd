//! Script trees: words, calls, and the recursive parser.
//!
//! [`parse_script`] drives the host tokeniser across a byte range, turning
//! each command into a [`Call`] of [`Word`]s. A small closed set of commands
//! that introduce scope or structure (`proc`, `while`, `for`, `foreach`,
//! `namespace eval`) is recognised by first-word dispatch and re-parsed with
//! typed shapes: literal body words become nested [`Script`]s, argument specs
//! become lists. Everything else is a plain `User` call.

use std::sync::Arc;

use log::debug;

use crate::names::QualifiedName;
use crate::source::{SourceFile, SourceLocation, Span};
use crate::tokens::{self, ParsedCommand, Token, TokenKind};

/// State threaded through a parse: the file and the lexical namespace,
/// which only `namespace eval` bodies change.
pub struct ParseContext {
    pub file: Arc<SourceFile>,
    namespace: String,
}

impl ParseContext {
    /// A context rooted in the global namespace.
    pub fn new(file: Arc<SourceFile>) -> Self {
        Self { file, namespace: String::new() }
    }

    /// The absolute namespace path currently in effect (`""` is global).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// The payload of a [`Word`], a direct rendering of the host token shapes.
#[derive(Debug)]
pub enum WordPayload {
    /// Literal text; the word's slice is the value.
    Text,
    /// A variable substitution; the word's slice is the variable name.
    Variable,
    /// An array access `$name(index…)`.
    ArrayAccess { name: String, index: Vec<Word> },
    /// A nested script: a `[…]` substitution or a recognised body word.
    Script(Box<Script>),
    /// A word made of several syntactic fragments.
    TokenList(Vec<Word>),
    /// A word prefixed by the `{*}` expansion marker.
    Expand(Vec<Word>),
    /// A word reinterpreted as list elements (argument specs).
    List(Vec<Word>),
    /// A parse problem local to this word.
    Error(String),
}

/// One syntactic unit of a command.
#[derive(Debug)]
pub struct Word {
    pub location: SourceLocation,
    pub span: Span,
    pub payload: WordPayload,
}

impl Word {
    /// The word's literal source slice.
    pub fn text(&self) -> &str {
        self.location.file.slice(self.span)
    }

    pub fn is_text(&self) -> bool {
        matches!(self.payload, WordPayload::Text)
    }

    fn new(location: SourceLocation, span: Span, payload: WordPayload) -> Self {
        Self { location, span, payload }
    }
}

/// How a call was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    User,
    Proc,
    While,
    For,
    Foreach,
    If,
    NamespaceEval,
}

/// One command: its words, recognition, and the lexical namespace at the
/// call site.
#[derive(Debug)]
pub struct Call {
    pub kind: CallKind,
    pub words: Vec<Word>,
    /// Absolute namespace path in effect where the call appears.
    pub namespace: String,
    /// Span of the comment block immediately preceding the command.
    pub comment: Option<Span>,
}

/// A parsed sequence of commands, in source order.
#[derive(Debug)]
pub struct Script {
    pub location: SourceLocation,
    pub commands: Vec<Call>,
}

/// Parse `range` of the context's file into a [`Script`].
///
/// Failures are recovered locally: the cursor advances to the next
/// command-terminator byte and parsing resumes, so commands before and after
/// a broken stretch survive.
pub fn parse_script(ctx: &mut ParseContext, range: Span) -> Script {
    let file = Arc::clone(&ctx.file);
    let text = file.contents();
    let mut script =
        Script { location: SourceLocation::new(&file, range.start), commands: Vec::new() };

    let mut cursor = range.start;
    while cursor < range.end {
        match tokens::parse_command(text, Span::new(cursor, range.end)) {
            Ok(cmd) => {
                if cmd.words > 0 {
                    parse_call(ctx, &cmd, &mut script);
                }
                cursor = if cmd.next > cursor { cmd.next } else { cursor + 1 };
            }
            Err(err) => {
                debug!("recovering from {err}");
                let bytes = text.as_bytes();
                let mut pos = cursor + 1;
                while pos < range.end && !tokens::is_command_terminator(bytes[pos]) {
                    pos += 1;
                }
                cursor = pos;
            }
        }
    }

    script
}

fn parse_call(ctx: &mut ParseContext, cmd: &ParsedCommand, script: &mut Script) {
    let call = Call {
        kind: CallKind::User,
        words: Vec::with_capacity(cmd.words),
        namespace: ctx.namespace.clone(),
        comment: cmd.comment,
    };
    let mut builder = CallBuilder { ctx, cmd, next: 0, call };
    builder.run();
    script.commands.push(builder.call);
}

/// Builds one [`Call`], dispatching the recognised-command shapes.
struct CallBuilder<'a> {
    ctx: &'a mut ParseContext,
    cmd: &'a ParsedCommand,
    next: usize,
    call: Call,
}

impl CallBuilder<'_> {
    fn run(&mut self) {
        let first = self.parse_word();
        if !self.call.words[first].is_text() {
            self.parse_rest();
            return;
        }

        let name = self.call.words[first].text().to_string();
        match (name.as_str(), self.cmd.words) {
            ("proc", 4) => {
                // Only promote the body once the name and arg spec check
                // out; a shape mismatch leaves every word generic.
                let name_word = self.parse_word();
                if self.call.words[name_word].is_text() {
                    let args = self.parse_args();
                    if matches!(self.call.words[args].payload, WordPayload::List(_)) {
                        self.call.kind = CallKind::Proc;
                        self.parse_body();
                    }
                }
            }
            ("while", 3) => {
                self.call.kind = CallKind::While;
                self.parse_word(); // condition expression
                self.parse_body();
            }
            ("for", 5) => {
                self.call.kind = CallKind::For;
                self.parse_body(); // init
                self.parse_word(); // condition expression
                self.parse_body(); // step
                self.parse_body(); // loop body
            }
            ("foreach", 4) => {
                self.call.kind = CallKind::Foreach;
                self.parse_word(); // loop variables
                self.parse_word(); // list
                self.parse_body();
            }
            ("namespace", words) if words > 1 => {
                let sub = self.parse_word();
                let sub_word = &self.call.words[sub];
                if sub_word.is_text() && sub_word.text() == "eval" && self.cmd.words == 4 {
                    self.call.kind = CallKind::NamespaceEval;

                    let arg = self.parse_word();
                    let old = self.ctx.namespace.clone();
                    if self.call.words[arg].is_text() {
                        let qn = QualifiedName::split(self.call.words[arg].text());
                        self.ctx.namespace = qn.to_absolute(&old).path();
                    }
                    self.parse_body();
                    self.ctx.namespace = old;
                }
            }
            _ => {}
        }

        self.parse_rest();
    }

    fn parse_rest(&mut self) {
        while self.next < self.cmd.tokens.len() {
            let word = word_from_tokens(self.ctx, &self.cmd.tokens, &mut self.next);
            self.call.words.push(word);
        }
    }

    /// Parse the next word generically. Returns its index in `call.words`.
    fn parse_word(&mut self) -> usize {
        if self.next >= self.cmd.tokens.len() {
            return self.error_word("expected word");
        }
        let word = word_from_tokens(self.ctx, &self.cmd.tokens, &mut self.next);
        self.push(word)
    }

    /// Parse the next word as an argument spec: a list whose elements are
    /// themselves re-split, so `{name default}` pairs become sub-lists.
    ///
    /// The word is only promoted to a `List` when every element is a plain
    /// name or a two-element pair; otherwise it is pushed as parsed, so the
    /// caller sees an ordinary word and leaves the call unrecognised.
    fn parse_args(&mut self) -> usize {
        if self.next >= self.cmd.tokens.len() {
            return self.error_word("expected list");
        }
        let word = word_from_tokens(self.ctx, &self.cmd.tokens, &mut self.next);
        if !word.is_text() {
            return self.push(word);
        }

        let file = Arc::clone(&self.ctx.file);
        let Ok(spans) = tokens::split_list(file.contents(), word.span) else {
            return self.push(word);
        };

        let mut elements = Vec::with_capacity(spans.len());
        for span in spans {
            let element =
                Word::new(SourceLocation::new(&file, span.start), span, WordPayload::Text);
            let element = element_to_list(&file, element);
            let usable = match &element.payload {
                WordPayload::Text => true,
                WordPayload::List(items) => items.len() == 2,
                _ => false,
            };
            if !usable {
                return self.push(word);
            }
            elements.push(element);
        }
        let listed = Word::new(word.location, word.span, WordPayload::List(elements));
        self.push(listed)
    }

    /// Parse the next word and, when it is simple text, re-parse its interior
    /// as a script under the current lexical namespace.
    fn parse_body(&mut self) -> usize {
        if self.next >= self.cmd.tokens.len() {
            return self.error_word("expected body");
        }
        let mut word = word_from_tokens(self.ctx, &self.cmd.tokens, &mut self.next);
        if word.is_text() {
            let body = parse_script(self.ctx, word.span);
            word.payload = WordPayload::Script(Box::new(body));
        }
        self.push(word)
    }

    fn error_word(&mut self, message: &str) -> usize {
        let at = self.cmd.span.start;
        let word = Word::new(
            SourceLocation::new(&self.ctx.file, at),
            Span::new(at, at),
            WordPayload::Error(message.to_string()),
        );
        self.push(word)
    }

    fn push(&mut self, word: Word) -> usize {
        self.call.words.push(word);
        self.call.words.len() - 1
    }
}

/// Re-split one list element; two or more inner elements make it a sub-list
/// (the `{name default}` form), otherwise the element stays literal text.
fn element_to_list(file: &Arc<SourceFile>, element: Word) -> Word {
    match tokens::split_list(file.contents(), element.span) {
        Err(_) => element,
        Ok(spans) if spans.len() < 2 => element,
        Ok(spans) => {
            let items = spans
                .into_iter()
                .map(|span| Word::new(SourceLocation::new(file, span.start), span, WordPayload::Text))
                .collect();
            Word::new(element.location, element.span, WordPayload::List(items))
        }
    }
}

/// Build one [`Word`] from the flat token stream, consuming the token's
/// entire subtree.
fn word_from_tokens(ctx: &mut ParseContext, tokens: &[Token], next: &mut usize) -> Word {
    let token = tokens[*next];
    *next += 1;

    match token.kind {
        // A wrapper around a single text component: take the contents.
        TokenKind::SimpleWord => word_from_tokens(ctx, tokens, next),

        TokenKind::Word | TokenKind::ExpandWord => {
            let max = *next + token.components;
            let mut sub = Vec::with_capacity(token.components);
            while *next < max {
                sub.push(word_from_tokens(ctx, tokens, next));
            }
            let payload = if token.kind == TokenKind::ExpandWord {
                WordPayload::Expand(sub)
            } else {
                WordPayload::TokenList(sub)
            };
            Word::new(SourceLocation::new(&ctx.file, token.span.start), token.span, payload)
        }

        TokenKind::Text | TokenKind::Bs => {
            Word::new(SourceLocation::new(&ctx.file, token.span.start), token.span, WordPayload::Text)
        }

        TokenKind::Command => {
            // The span includes the brackets; parse only the interior.
            let interior = Span::new(token.span.start + 1, token.span.end - 1);
            let body = parse_script(ctx, interior);
            Word::new(
                SourceLocation::new(&ctx.file, token.span.start),
                token.span,
                WordPayload::Script(Box::new(body)),
            )
        }

        TokenKind::Variable => {
            if token.components == 1 {
                // Scalar: the single text component is the name.
                let mut word = word_from_tokens(ctx, tokens, next);
                word.payload = WordPayload::Variable;
                word
            } else {
                let max = *next + token.components;
                let name_word = word_from_tokens(ctx, tokens, next);
                let name = name_word.text().to_string();
                let mut index = Vec::new();
                while *next < max {
                    index.push(word_from_tokens(ctx, tokens, next));
                }
                Word::new(
                    SourceLocation::new(&ctx.file, token.span.start),
                    token.span,
                    WordPayload::ArrayAccess { name, index },
                )
            }
        }
    }
}
