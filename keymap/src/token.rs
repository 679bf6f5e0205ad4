//! Keymap source scanning.
//!
//! Turns raw `.kmf` text into a flat token stream in a single greedy pass.
//! Keywords match case-insensitively; multiword keywords (`on hold`,
//! `switch to`, `mouse move up`, ...) fuse into one token, and a failed
//! fusion never consumes past its first word.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Error from any stage of keymap compilation.
///
/// Rendered as `Line N: <message>`, the shape the display and the CDC
/// status line expect.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

impl CompileError {
    pub fn at(line: u32, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Line {}: {}", self.line, self.message)
    }
}

/// Token classification.
///
/// `Hash`, `Quote` and `Newline` are consumed by the scanner (comments,
/// string delimiters, line accounting) and never appear in its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TokenKind {
    Hash,
    Comma,
    Colon,
    Quote,
    Newline,
    Plus,
    StringLit,
    RowLit,
    KeyLit,
    NumLit,
    HexLit,
    Ident,
    OpPress,
    OpClick,
    OpHold,
    OpDoubleClick,
    OpRelease,
    ActPress,
    ActRelease,
    ActClick,
    ActWait,
    ActSwitchTo,
    ActToggle,
    ActLeave,
    ActType,
    ActResetKeyboard,
    ActBootloader,
    ActHome,
    ActNothing,
    ActPassThrough,
    ActReloadKeyMaps,
    ActMouseMoveUp,
    ActMouseMoveDown,
    ActMouseMoveLeft,
    ActMouseMoveRight,
    ActMouseScrollUp,
    ActMouseScrollDown,
    ActMouseScrollLeft,
    ActMouseScrollRight,
    ActMouseClickLeft,
    ActMouseClickRight,
    ActMouseClickCenter,
    ActMouseClickBackwards,
    ActMouseClickForwards,
    ParamQuickly,
    ParamSlowly,
    ParamRepeatedly,
    ParamAtHumanSpeed,
    ParamUntilReleased,
    ParamTimeMs,
    ParamTimeSec,
    ParamTimeMin,
    OtherKeysFallThrough,
    BlockOtherKeys,
}

impl TokenKind {
    /// Operation tags: `on press`, `on click`, `on hold`, ...
    pub fn is_operation(self) -> bool {
        matches!(
            self,
            TokenKind::OpPress
                | TokenKind::OpClick
                | TokenKind::OpHold
                | TokenKind::OpDoubleClick
                | TokenKind::OpRelease
        )
    }

    pub fn is_parameter(self) -> bool {
        matches!(
            self,
            TokenKind::ParamQuickly
                | TokenKind::ParamSlowly
                | TokenKind::ParamRepeatedly
                | TokenKind::ParamAtHumanSpeed
                | TokenKind::ParamUntilReleased
                | TokenKind::ParamTimeMs
                | TokenKind::ParamTimeSec
                | TokenKind::ParamTimeMin
        )
    }

    pub fn is_action(self) -> bool {
        matches!(
            self,
            TokenKind::ActPress
                | TokenKind::ActRelease
                | TokenKind::ActClick
                | TokenKind::ActWait
                | TokenKind::ActSwitchTo
                | TokenKind::ActToggle
                | TokenKind::ActLeave
                | TokenKind::ActType
                | TokenKind::ActResetKeyboard
                | TokenKind::ActBootloader
                | TokenKind::ActHome
                | TokenKind::ActNothing
                | TokenKind::ActPassThrough
                | TokenKind::ActReloadKeyMaps
                | TokenKind::ActMouseMoveUp
                | TokenKind::ActMouseMoveDown
                | TokenKind::ActMouseMoveLeft
                | TokenKind::ActMouseMoveRight
                | TokenKind::ActMouseScrollUp
                | TokenKind::ActMouseScrollDown
                | TokenKind::ActMouseScrollLeft
                | TokenKind::ActMouseScrollRight
                | TokenKind::ActMouseClickLeft
                | TokenKind::ActMouseClickRight
                | TokenKind::ActMouseClickCenter
                | TokenKind::ActMouseClickBackwards
                | TokenKind::ActMouseClickForwards
        )
    }

    /// Tokens an action run may contain.
    pub fn allowed_in_run(self) -> bool {
        matches!(
            self,
            TokenKind::Comma
                | TokenKind::Plus
                | TokenKind::StringLit
                | TokenKind::NumLit
                | TokenKind::HexLit
                | TokenKind::Ident
        ) || self.is_action()
            || self.is_parameter()
    }

    /// Tokens that may not open an action run.
    pub fn disallowed_at_run_start(self) -> bool {
        matches!(
            self,
            TokenKind::Comma | TokenKind::Plus | TokenKind::StringLit
        ) || self.is_parameter()
    }

    /// Tokens that may not close an action run.
    pub fn disallowed_at_run_end(self) -> bool {
        matches!(self, TokenKind::Comma | TokenKind::Plus)
    }
}

/// One token, addressing its source text by offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub len: usize,
    pub line: u32,
}

impl Token {
    /// The source slice this token covers.
    pub fn lexeme<'s>(&self, source: &'s str) -> &'s str {
        &source[self.start..self.start + self.len]
    }
}

/// Source text spanned by a token run, first to last inclusive.
///
/// Keeps whatever spacing the source had between the tokens, which is how
/// multiword layer names survive into hashing.
pub fn token_run_str<'s>(source: &'s str, first: &Token, last: &Token) -> &'s str {
    &source[first.start..last.start + last.len]
}

/// Scans `source` into tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut index = 0;
    let mut line: u32 = 1;

    while index < bytes.len() {
        let c = bytes[index];
        match c {
            b' ' | b'\t' => {
                index += 1;
            }
            b'\n' => {
                line += 1;
                index += 1;
            }
            b'#' => {
                while index < bytes.len() && bytes[index] != b'\n' {
                    index += 1;
                }
                line += 1;
                index += 1;
            }
            b',' => {
                tokens.push(Token {
                    kind: TokenKind::Comma,
                    start: index,
                    len: 1,
                    line,
                });
                index += 1;
            }
            b'+' => {
                tokens.push(Token {
                    kind: TokenKind::Plus,
                    start: index,
                    len: 1,
                    line,
                });
                index += 1;
            }
            b':' => {
                tokens.push(Token {
                    kind: TokenKind::Colon,
                    start: index,
                    len: 1,
                    line,
                });
                index += 1;
            }
            b'"' => {
                let start = index;
                index += 1;
                while index < bytes.len() && bytes[index] != b'"' {
                    index += 1;
                }
                if index >= bytes.len() {
                    return Err(CompileError::at(line, "Unterminated string"));
                }
                index += 1;
                tokens.push(Token {
                    kind: TokenKind::StringLit,
                    start,
                    len: index - start,
                    line,
                });
            }
            b'0' if bytes.get(index + 1) == Some(&b'x') => {
                let start = index;
                index += 2;
                if index >= bytes.len() || !bytes[index].is_ascii_hexdigit() {
                    return Err(CompileError::at(line, "Hex literal must have a digit"));
                }
                while index < bytes.len() && bytes[index].is_ascii_hexdigit() {
                    index += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::HexLit,
                    start,
                    len: index - start,
                    line,
                });
            }
            _ if c.is_ascii_digit() => {
                let start = index;
                while index < bytes.len() && bytes[index].is_ascii_digit() {
                    index += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::NumLit,
                    start,
                    len: index - start,
                    line,
                });
            }
            _ if c.is_ascii_alphanumeric() => {
                let start = index;
                let (kind, end) = scan_word(source, start);
                tokens.push(Token {
                    kind,
                    start,
                    len: end - start,
                    line,
                });
                index = end;
            }
            _ => {
                let offender = source[index..].chars().next().unwrap_or(c as char);
                return Err(CompileError::at(
                    line,
                    format!("Unexpected character '{offender}'"),
                ));
            }
        }
    }

    Ok(tokens)
}

/// True when the source at `at` continues with `phrase`, case-insensitively.
fn phrase_follows(source: &str, at: usize, phrase: &str) -> bool {
    source.len() >= at + phrase.len()
        && source.as_bytes()[at..at + phrase.len()].eq_ignore_ascii_case(phrase.as_bytes())
}

/// Scans one word starting at `start` and attempts every keyword fusion.
/// Returns the resolved kind and the end index.
fn scan_word(source: &str, start: usize) -> (TokenKind, usize) {
    let bytes = source.as_bytes();
    let mut index = start;
    while index < bytes.len() && bytes[index].is_ascii_alphanumeric() {
        index += 1;
    }

    let word = &source[start..index];

    // Row and key literals: an uppercase R or K followed by digits only.
    if (bytes[start] == b'R' || bytes[start] == b'K')
        && word.len() > 1
        && word.bytes().skip(1).all(|b| b.is_ascii_digit())
    {
        let kind = if bytes[start] == b'R' {
            TokenKind::RowLit
        } else {
            TokenKind::KeyLit
        };
        return (kind, index);
    }

    let ident = word.to_ascii_lowercase();
    let mut kind = TokenKind::Ident;

    if ident == "on" && bytes.get(index) == Some(&b' ') {
        // The '-' admits "double-click" into the trigger word.
        let mut ahead = index + 1;
        while ahead < bytes.len() && (bytes[ahead].is_ascii_alphanumeric() || bytes[ahead] == b'-')
        {
            ahead += 1;
        }
        let fused = match source[start..ahead].to_ascii_lowercase().as_str() {
            "on press" => Some(TokenKind::OpPress),
            "on click" => Some(TokenKind::OpClick),
            "on hold" => Some(TokenKind::OpHold),
            "on double-click" => Some(TokenKind::OpDoubleClick),
            "on release" => Some(TokenKind::OpRelease),
            _ => None,
        };
        if let Some(op) = fused {
            kind = op;
            index = ahead;
        }
    }

    if ident == "mouse" && bytes.get(index) == Some(&b' ') {
        if let Some((mouse, ahead)) = scan_mouse_action(source, index) {
            kind = mouse;
            index = ahead;
        }
    }

    kind = match ident.as_str() {
        "press" => TokenKind::ActPress,
        "release" => TokenKind::ActRelease,
        "click" => TokenKind::ActClick,
        "wait" => TokenKind::ActWait,
        "toggle" => TokenKind::ActToggle,
        "leave" => TokenKind::ActLeave,
        "type" => TokenKind::ActType,
        "bootloader" => TokenKind::ActBootloader,
        "home" => TokenKind::ActHome,
        "nothing" => TokenKind::ActNothing,
        "quickly" => TokenKind::ParamQuickly,
        "slowly" => TokenKind::ParamSlowly,
        "repeatedly" => TokenKind::ParamRepeatedly,
        "ms" | "millisecond" | "milliseconds" => TokenKind::ParamTimeMs,
        "sec" | "second" | "seconds" => TokenKind::ParamTimeSec,
        "min" | "minute" | "minutes" => TokenKind::ParamTimeMin,
        _ => kind,
    };

    match ident.as_str() {
        "switch" if phrase_follows(source, index, " to") => {
            kind = TokenKind::ActSwitchTo;
            index += " to".len();
        }
        "reset" if phrase_follows(source, index, " keyboard") => {
            kind = TokenKind::ActResetKeyboard;
            index += " keyboard".len();
        }
        "pass" if phrase_follows(source, index, " through") => {
            kind = TokenKind::ActPassThrough;
            index += " through".len();
        }
        "reload" if phrase_follows(source, index, " key maps") => {
            kind = TokenKind::ActReloadKeyMaps;
            index += " key maps".len();
        }
        "at" if phrase_follows(source, index, " human speed") => {
            kind = TokenKind::ParamAtHumanSpeed;
            index += " human speed".len();
        }
        "until" if phrase_follows(source, index, " released") => {
            kind = TokenKind::ParamUntilReleased;
            index += " released".len();
        }
        "other" if phrase_follows(source, index, " keys fall through") => {
            kind = TokenKind::OtherKeysFallThrough;
            index += " keys fall through".len();
        }
        "block" if phrase_follows(source, index, " other keys") => {
            kind = TokenKind::BlockOtherKeys;
            index += " other keys".len();
        }
        _ => {}
    }

    (kind, index)
}

/// Lookahead for `mouse (move|scroll|click) <direction>`. `space` is the
/// index of the blank after "mouse". None means no fusion; the caller keeps
/// scanning from the first word.
fn scan_mouse_action(source: &str, space: usize) -> Option<(TokenKind, usize)> {
    let bytes = source.as_bytes();

    let verb_start = space + 1;
    let mut index = verb_start;
    while index < bytes.len() && bytes[index].is_ascii_alphabetic() {
        index += 1;
    }
    let verb = source[verb_start..index].to_ascii_lowercase();
    if verb != "move" && verb != "scroll" && verb != "click" {
        return None;
    }

    if bytes.get(index) != Some(&b' ') {
        return None;
    }
    let dir_start = index + 1;
    index = dir_start;
    while index < bytes.len() && bytes[index].is_ascii_alphabetic() {
        index += 1;
    }
    let dir = source[dir_start..index].to_ascii_lowercase();

    let kind = match (verb.as_str(), dir.as_str()) {
        ("move", "up") => TokenKind::ActMouseMoveUp,
        ("move", "down") => TokenKind::ActMouseMoveDown,
        ("move", "left") => TokenKind::ActMouseMoveLeft,
        ("move", "right") => TokenKind::ActMouseMoveRight,
        ("scroll", "up") => TokenKind::ActMouseScrollUp,
        ("scroll", "down") => TokenKind::ActMouseScrollDown,
        ("scroll", "left") => TokenKind::ActMouseScrollLeft,
        ("scroll", "right") => TokenKind::ActMouseScrollRight,
        ("click", "left") => TokenKind::ActMouseClickLeft,
        ("click", "right") => TokenKind::ActMouseClickRight,
        ("click", "center") => TokenKind::ActMouseClickCenter,
        ("click", "backwards" | "back") => TokenKind::ActMouseClickBackwards,
        ("click", "forwards") => TokenKind::ActMouseClickForwards,
        _ => return None,
    };
    Some((kind, index))
}
