//! Lexical content analysis for format detection.
//!
//! A finite-state scanner, not a parser: it skips strings (including
//! template literals with nested `${}`) and both comment kinds, then looks
//! for `import`/`export` as standalone identifiers (ESM) and for
//! `require(`, `module.exports`, `exports.` (CommonJS). When both appear,
//! ESM wins.

use super::ModuleFormat;

struct Scanner<'a> {
    content: &'a [u8],
    pos: usize,
    has_esm: bool,
    has_cjs: bool,
}

fn is_identifier_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c == b'$'
}

fn is_identifier_part(c: u8) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

impl<'a> Scanner<'a> {
    fn new(content: &'a str) -> Self {
        Scanner {
            content: content.as_bytes(),
            pos: 0,
            has_esm: false,
            has_cjs: false,
        }
    }

    fn peek(&self) -> u8 {
        self.content.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.content.get(self.pos + 1).copied().unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.pos < self.content.len() {
            self.pos += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.content.len() && self.peek() != b'\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) {
        while self.pos < self.content.len() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
    }

    /// Skip a string literal. Template literals recurse into `${}`
    /// substitutions, which may themselves contain strings.
    fn skip_string(&mut self, quote: u8) {
        self.advance(); // opening quote
        while self.pos < self.content.len() {
            let c = self.peek();

            if c == b'\\' {
                self.advance();
                self.advance();
                continue;
            }

            if c == quote {
                self.advance();
                return;
            }

            if quote == b'`' && c == b'$' && self.peek_next() == b'{' {
                self.advance();
                self.advance();
                let mut depth = 1usize;
                while self.pos < self.content.len() && depth > 0 {
                    match self.peek() {
                        b'{' => depth += 1,
                        b'}' => depth -= 1,
                        b'"' | b'\'' | b'`' => {
                            self.skip_string(self.peek());
                            continue;
                        }
                        _ => {}
                    }
                    self.advance();
                }
                continue;
            }

            self.advance();
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            let c = self.peek();
            if c == b' ' || c == b'\t' || c == b'\n' || c == b'\r' {
                self.advance();
                continue;
            }
            if c == b'/' && self.peek_next() == b'/' {
                self.skip_line_comment();
                continue;
            }
            if c == b'/' && self.peek_next() == b'*' {
                self.advance();
                self.advance();
                self.skip_block_comment();
                continue;
            }
            break;
        }
    }

    /// Match a keyword at the current position with identifier boundaries
    /// on both sides; advances past it on success.
    fn match_keyword(&mut self, keyword: &str) -> bool {
        let kw = keyword.as_bytes();
        if self.pos + kw.len() > self.content.len() {
            return false;
        }
        if &self.content[self.pos..self.pos + kw.len()] != kw {
            return false;
        }
        if self.pos > 0 && is_identifier_part(self.content[self.pos - 1]) {
            return false;
        }
        if let Some(&next) = self.content.get(self.pos + kw.len()) {
            if is_identifier_part(next) {
                return false;
            }
        }
        self.pos += kw.len();
        true
    }

    fn scan(&mut self) {
        while self.pos < self.content.len() {
            self.skip_whitespace_and_comments();

            let c = self.peek();
            if c == 0 {
                break;
            }

            if c == b'"' || c == b'\'' || c == b'`' {
                self.skip_string(c);
                continue;
            }

            if self.match_keyword("import") || self.match_keyword("export") {
                self.has_esm = true;
                continue;
            }

            if self.match_keyword("require") {
                self.skip_whitespace_and_comments();
                if self.peek() == b'(' {
                    self.has_cjs = true;
                }
                continue;
            }

            if self.match_keyword("module") {
                self.skip_whitespace_and_comments();
                if self.peek() == b'.' {
                    self.advance();
                    self.skip_whitespace_and_comments();
                    if self.match_keyword("exports") {
                        self.has_cjs = true;
                    }
                }
                continue;
            }

            if self.match_keyword("exports") {
                self.skip_whitespace_and_comments();
                if self.peek() == b'.' {
                    self.has_cjs = true;
                }
                continue;
            }

            self.advance();
        }
    }
}

/// Analyze source text for module-format patterns. Returns `Unknown` when
/// nothing conclusive appears.
pub fn analyze(content: &str) -> ModuleFormat {
    if content.is_empty() {
        return ModuleFormat::Unknown;
    }

    let mut scanner = Scanner::new(content);
    scanner.scan();

    // Modern code often contains both; prefer ESM.
    if scanner.has_esm {
        ModuleFormat::Esm
    } else if scanner.has_cjs {
        ModuleFormat::CommonJs
    } else {
        ModuleFormat::Unknown
    }
}
