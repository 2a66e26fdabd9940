//! Statement assembly: physical lines in, logical statements out.
//!
//! Comment forms (`%` line comments, `%{ ... %}` block comments, trailing
//! comments outside string literals) are resolved here, and `...`
//! continuations are merged so the rest of the front end only ever sees one
//! complete statement at a time.

/// Classification of one physical line, resolved against the running
/// block-comment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    Normal,
    Comment,
    BlockCommentOpen,
    BlockCommentClose,
    Continuation,
}

/// One logical statement with the index of its first physical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// 0-based index of the first physical line of the statement.
    pub line_index: u32,
}

/// Lazy, restartable iterator over the logical statements of one source.
/// Clone it before consuming to restart from the top.
#[derive(Debug, Clone)]
pub struct Statements<'a> {
    lines: Vec<&'a str>,
    pos: usize,
    in_block_comment: bool,
}

impl<'a> Statements<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lines: source.lines().collect(),
            pos: 0,
            in_block_comment: false,
        }
    }
}

/// Leading whitespace of `line`, kept on merged statements so downstream
/// rewriting can realign with the original code.
pub fn leading_indent(line: &str) -> &str {
    let end = line
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| i)
        .unwrap_or(line.len());
    &line[..end]
}

/// Cut the line at the first `%` that is not inside a string literal.
pub fn strip_comment(line: &str) -> &str {
    let mut in_string: Option<char> = None;
    let mut prev_code: Option<char> = None;
    for (i, c) in line.char_indices() {
        match in_string {
            Some(quote) => {
                if c == quote {
                    in_string = None;
                }
            }
            None => match c {
                '%' => return &line[..i],
                '"' => in_string = Some('"'),
                // A quote right after an identifier, closing bracket or
                // number is the transpose operator, not a string open.
                '\'' => {
                    if !matches!(prev_code, Some(p) if p.is_alphanumeric() || p == '_' || p == ')' || p == ']' || p == '}' || p == '\'')
                    {
                        in_string = Some('\'');
                    }
                }
                _ => {}
            },
        }
        if !c.is_whitespace() {
            prev_code = Some(c);
        }
    }
    line
}

fn is_continuation(code: &str) -> bool {
    let t = code.trim_end();
    t.ends_with("...") || t.ends_with('{')
}

/// Remove the trailing continuation marker, matching the permissive
/// dot-and-space stripping of the merge step.
fn trim_marker(code: &str) -> &str {
    code.trim().trim_end_matches(['.', ' '])
}

/// Classify a physical line given whether a block comment is currently open.
pub fn classify(line: &str, in_block_comment: bool) -> LineClass {
    let t = line.trim();
    if in_block_comment {
        if t.ends_with("%}") {
            return LineClass::BlockCommentClose;
        }
        return LineClass::Comment;
    }
    if t.starts_with("%{") {
        return LineClass::BlockCommentOpen;
    }
    if t.starts_with('%') {
        return LineClass::Comment;
    }
    if is_continuation(strip_comment(line)) {
        return LineClass::Continuation;
    }
    LineClass::Normal
}

impl<'a> Iterator for Statements<'a> {
    type Item = Statement;

    fn next(&mut self) -> Option<Statement> {
        while self.pos < self.lines.len() {
            let raw = self.lines[self.pos];
            self.pos += 1;
            match classify(raw, self.in_block_comment) {
                LineClass::BlockCommentOpen => {
                    self.in_block_comment = true;
                    continue;
                }
                LineClass::BlockCommentClose => {
                    self.in_block_comment = false;
                    continue;
                }
                LineClass::Comment => continue,
                LineClass::Normal => {
                    let code = strip_comment(raw);
                    if code.trim().is_empty() {
                        continue;
                    }
                    return Some(Statement {
                        text: format!("{}{}", leading_indent(raw), code.trim()),
                        line_index: (self.pos - 1) as u32,
                    });
                }
                LineClass::Continuation => {
                    return Some(self.merge_continuation(raw));
                }
            }
        }
        None
    }
}

impl<'a> Statements<'a> {
    /// Concatenate the buffered continuation run, marker lines first, up to
    /// and including the first line that does not end with a marker. The
    /// merged statement keeps the indentation of its first physical line.
    fn merge_continuation(&mut self, first: &str) -> Statement {
        let start = (self.pos - 1) as u32;
        let indent = leading_indent(first);
        let mut parts = vec![trim_marker(strip_comment(first)).to_string()];

        while self.pos < self.lines.len() {
            let raw = self.lines[self.pos];
            self.pos += 1;
            match classify(raw, self.in_block_comment) {
                LineClass::BlockCommentOpen => {
                    self.in_block_comment = true;
                    continue;
                }
                LineClass::BlockCommentClose => {
                    self.in_block_comment = false;
                    continue;
                }
                LineClass::Comment => continue,
                LineClass::Continuation => {
                    parts.push(trim_marker(strip_comment(raw)).to_string());
                }
                LineClass::Normal => {
                    let code = strip_comment(raw);
                    if !code.trim().is_empty() {
                        parts.push(code.trim().to_string());
                    }
                    break;
                }
            }
        }

        tracing::trace!(
            start,
            lines = parts.len(),
            "merged continuation run into one statement"
        );
        Statement {
            text: format!("{}{}", indent, parts.join(" ")),
            line_index: start,
        }
    }
}
