//! Tokenizer capability used for chunk planning and budget measurement.
//!
//! The pipeline only needs an ordered list of token fragments per text. The
//! fragments follow SentencePiece conventions: a leading `▁` stands for a
//! space and `<0x0A>` stands for a newline. [`tidy_pieces`] turns a run of
//! concatenated fragments back into plain text.

/// SentencePiece word-boundary marker (U+2581).
pub const WORD_BOUNDARY: char = '\u{2581}';

/// Byte-fallback fragment for `\n`.
pub const NEWLINE_PIECE: &str = "<0x0A>";

/// Default maximum number of alphanumeric characters in one word piece.
pub const DEFAULT_MAX_PIECE_CHARS: usize = 6;

/// Splits text into an ordered sequence of token fragments.
pub trait Tokenizer: Send + Sync {
    /// Tokenize `text` into fragments. Concatenating the fragments and
    /// applying [`tidy_pieces`] must reproduce the input.
    fn tokenize(&self, text: &str) -> Result<Vec<String>, String>;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> Result<usize, String> {
        Ok(self.tokenize(text)?.len())
    }
}

/// Replace fragment markers with the literal whitespace they encode.
pub fn tidy_pieces(text: &str) -> String {
    text.replace(WORD_BOUNDARY, " ").replace(NEWLINE_PIECE, "\n")
}

/// Deterministic SentencePiece-style pre-tokenizer.
///
/// Alphanumeric runs become word pieces of at most `max_piece_chars`
/// characters, a single preceding space is folded into the next piece as
/// `▁`, newlines become `<0x0A>`, and any other character is a piece of its
/// own. No vocabulary is involved, so counts approximate rather than match a
/// model's real tokenizer.
#[derive(Debug, Clone)]
pub struct PieceTokenizer {
    max_piece_chars: usize,
}

impl Default for PieceTokenizer {
    fn default() -> Self {
        Self {
            max_piece_chars: DEFAULT_MAX_PIECE_CHARS,
        }
    }
}

impl PieceTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sub-word split length. Values below 1 are clamped to 1.
    pub fn with_max_piece_chars(mut self, max: usize) -> Self {
        self.max_piece_chars = max.max(1);
        self
    }
}

impl Tokenizer for PieceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>, String> {
        let mut pieces = Vec::new();
        let mut word = String::new();
        let mut word_chars = 0usize;
        let mut pending_space = false;

        for ch in text.chars() {
            if ch.is_alphanumeric() {
                if word_chars == self.max_piece_chars {
                    pieces.push(std::mem::take(&mut word));
                    word_chars = 0;
                }
                if word.is_empty() && pending_space {
                    word.push(WORD_BOUNDARY);
                    pending_space = false;
                }
                word.push(ch);
                word_chars += 1;
                continue;
            }

            if !word.is_empty() {
                pieces.push(std::mem::take(&mut word));
                word_chars = 0;
            }

            match ch {
                ' ' => {
                    if pending_space {
                        pieces.push(WORD_BOUNDARY.to_string());
                    }
                    pending_space = true;
                }
                '\n' => {
                    if pending_space {
                        pieces.push(WORD_BOUNDARY.to_string());
                        pending_space = false;
                    }
                    pieces.push(NEWLINE_PIECE.to_string());
                }
                other => {
                    let mut piece = String::with_capacity(4);
                    if pending_space {
                        piece.push(WORD_BOUNDARY);
                        pending_space = false;
                    }
                    piece.push(other);
                    pieces.push(piece);
                }
            }
        }

        if !word.is_empty() {
            pieces.push(word);
        }
        if pending_space {
            pieces.push(WORD_BOUNDARY.to_string());
        }

        Ok(pieces)
    }
}
