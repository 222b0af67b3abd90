use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSource {
    Serial,
    Console,
}

impl fmt::Display for LineSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSource::Serial => write!(f, "serial"),
            LineSource::Console => write!(f, "console"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub source: LineSource,
    pub text: String,
}

impl InputLine {
    pub fn serial(text: impl Into<String>) -> Self {
        Self {
            source: LineSource::Serial,
            text: text.into(),
        }
    }

    pub fn console(text: impl Into<String>) -> Self {
        Self {
            source: LineSource::Console,
            text: text.into(),
        }
    }
}
