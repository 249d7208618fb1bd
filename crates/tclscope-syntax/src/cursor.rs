//! Position-to-syntax queries.
//!
//! Given a line/column, [`find_position`] walks a [`Script`] in source order
//! and returns the innermost call/argument/word triple whose word encloses or
//! immediately precedes the target. Safe to run on a shared reference while
//! readers hold the index lock.

use crate::script::{Call, Script, Word, WordPayload};
use crate::source::LinePos;

/// The innermost syntax under a source position.
#[derive(Debug)]
pub struct ScriptCursor<'a> {
    pub call: &'a Call,
    /// Index of the word within the call (0 is the command name).
    pub argument: usize,
    pub word: &'a Word,
}

/// Locate `pos` within `script`.
///
/// Returns `None` when the position precedes every word in the script.
pub fn find_position(script: &Script, pos: LinePos) -> Option<ScriptCursor<'_>> {
    let mut best = None;
    walk_script(script, pos, &mut best);
    best
}

/// Walk commands and words in source order; true means a word past the
/// target was reached and the caller should stop too.
fn walk_script<'a>(
    script: &'a Script,
    pos: LinePos,
    best: &mut Option<ScriptCursor<'a>>,
) -> bool {
    for call in &script.commands {
        for (argument, word) in call.words.iter().enumerate() {
            if word.location.line_pos() > pos {
                return true;
            }
            *best = Some(ScriptCursor { call, argument, word });
            if walk_word(call, argument, word, pos, best) {
                return true;
            }
        }
    }
    false
}

fn walk_word<'a>(
    call: &'a Call,
    argument: usize,
    word: &'a Word,
    pos: LinePos,
    best: &mut Option<ScriptCursor<'a>>,
) -> bool {
    match &word.payload {
        WordPayload::Script(body) => walk_script(body, pos, best),
        WordPayload::TokenList(sub) | WordPayload::Expand(sub) => {
            for inner in sub {
                if inner.location.line_pos() > pos {
                    return true;
                }
                *best = Some(ScriptCursor { call, argument, word: inner });
                if walk_word(call, argument, inner, pos, best) {
                    return true;
                }
            }
            false
        }
        _ => false,
    }
}
