/// A statement location inside one source file. Lines are stored 0-based,
/// matching the indices the statement assembler yields; error output is
/// 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub line: u32,
}

impl Span {
    pub fn new(line: u32) -> Span {
        Span { line }
    }

    /// 1-based line number for user-facing messages.
    pub fn display_line(&self) -> u32 {
        self.line + 1
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}", self.display_line())
    }
}
