use colored::*;
use std::fmt;
use std::io;

mod defect;

pub use defect::{Defect, DefectKind, Severity};

pub type BindResult<T = ()> = Result<T, BindError>;

/// Problems with the declaration set itself. When any of these occur no
/// graph is built; everything else is reported as a [`Defect`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Hash)]
pub enum BindErrorKind {
    Parse,
    UnknownModule,
    UnknownComponent,
    Hierarchy,
    Creator,
    Manifest,
    IO,
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                BindErrorKind::Parse => "parse error",
                BindErrorKind::UnknownModule => "unknown module",
                BindErrorKind::UnknownComponent => "unknown component",
                BindErrorKind::Hierarchy => "component hierarchy error",
                BindErrorKind::Creator => "creator error",
                BindErrorKind::Manifest => "manifest error",
                BindErrorKind::IO => "i/o error",
            }
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct BindError {
    pub msg: String,
    pub kind: BindErrorKind,
}

impl BindError {
    pub fn new<S: Into<String>>(kind: BindErrorKind, msg: S) -> BindError {
        BindError {
            msg: msg.into(),
            kind,
        }
    }

    pub fn emit(self) {
        let kind = format!("{}:", self.kind);
        eprintln!("{} {}", kind.bold().red(), hanging(&kind, &self.msg).bold());
        eprintln!()
    }
}

/// Joins the lines of `msg`, indenting continuation lines past `prefix`.
pub(crate) fn hanging(prefix: &str, msg: &str) -> String {
    let indent = " ".repeat(prefix.len() + 1);
    msg.lines()
        .enumerate()
        .map(|(i, s)| {
            if i == 0 {
                s.to_string()
            } else {
                format!("{}{}", indent, s)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for BindError {}

impl From<BindError> for Vec<BindError> {
    fn from(err: BindError) -> Vec<BindError> {
        vec![err]
    }
}

impl From<io::Error> for BindError {
    fn from(err: io::Error) -> BindError {
        BindError::new(BindErrorKind::IO, err.to_string())
    }
}

impl From<serde_json::Error> for BindError {
    fn from(err: serde_json::Error) -> BindError {
        BindError::new(BindErrorKind::Manifest, err.to_string())
    }
}
