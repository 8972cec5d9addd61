// BSD 2-Clause License
//
// Copyright (c) 2019, 2020 Alasdair Armstrong
//
// All rights reserved.
//
// Redistribution and use in source and binary forms, with or without
// modification, are permitted provided that the following conditions are
// met:
//
// 1. Redistributions of source code must retain the above copyright
// notice, this list of conditions and the following disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright
// notice, this list of conditions and the following disclaimer in the
// documentation and/or other materials provided with the distribution.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS
// "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES, INCLUDING, BUT NOT
// LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR
// A PARTICULAR PURPOSE ARE DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT
// HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT
// LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR SERVICES; LOSS OF USE,
// DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY
// THEORY OF LIABILITY, WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT
// (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE USE
// OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

use std::error;
use std::fmt;

use crate::source_loc::SourceLoc;
use crate::value::Ty;

/// Errors raised when ordering values, for example when building a
/// set out of elements of different types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompError {
    Heterogeneous(Ty, Ty),
    Universe,
    Incomparable(Ty),
}

impl fmt::Display for CompError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use CompError::*;
        match self {
            Heterogeneous(ty1, ty2) => write!(f, "heterogeneous set elements: types {} and {}", ty1, ty2),
            Universe => write!(f, "cannot compare the universe"),
            Incomparable(ty) => write!(f, "values of type {} cannot be compared", ty),
        }
    }
}

/// Errors raised by built-in functions. These are turned into
/// ordinary interpreter errors naming the primitive at the call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PrimError {
    Arity { expected: usize, got: usize },
    Arg { expected: &'static str, got: Ty },
    Failed(String),
}

impl fmt::Display for PrimError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PrimError::*;
        match self {
            Arity { expected, got } => write!(f, "expected {} arguments, got {}", expected, got),
            Arg { expected, got } => write!(f, "expected argument of type {}, got {}", expected, got),
            Failed(msg) => write!(f, "{}", msg),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Fail silently. This is the only error that `try ... with` catches.
    Abort(String),
    /// A mistake in the model, such as an unbound variable.
    User(String),
    Comp(CompError),
    IllegalRecursion { name: String, ty: Ty },
    Include(String),
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorKind::*;
        match self {
            Abort(msg) | User(msg) => write!(f, "{}", msg),
            Comp(err) => write!(f, "{}", err),
            IllegalRecursion { name, ty } => write!(f, "illegal recursion on type {} for {}", ty, name),
            Include(msg) => write!(f, "include failed: {}", msg),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Error {
    kind: ErrorKind,
    loc: SourceLoc,
    calls: Vec<SourceLoc>,
}

impl Error {
    pub fn from_kind(kind: ErrorKind, loc: SourceLoc) -> Self {
        Error { kind, loc, calls: vec![] }
    }

    pub fn abort<S: Into<String>>(loc: SourceLoc, msg: S) -> Self {
        Self::from_kind(ErrorKind::Abort(msg.into()), loc)
    }

    pub fn user<S: Into<String>>(loc: SourceLoc, msg: S) -> Self {
        Self::from_kind(ErrorKind::User(msg.into()), loc)
    }

    pub fn comp(loc: SourceLoc, err: CompError) -> Self {
        Self::from_kind(ErrorKind::Comp(err), loc)
    }

    pub fn illegal_recursion(loc: SourceLoc, name: &str, ty: Ty) -> Self {
        Self::from_kind(ErrorKind::IllegalRecursion { name: name.to_string(), ty }, loc)
    }

    pub fn include<S: Into<String>>(loc: SourceLoc, msg: S) -> Self {
        Self::from_kind(ErrorKind::Include(msg.into()), loc)
    }

    pub fn prim(loc: SourceLoc, name: &str, err: PrimError) -> Self {
        Self::abort(loc, format!("primitive {}: {}", name, err))
    }

    pub fn is_abort(&self) -> bool {
        matches!(self.kind, ErrorKind::Abort(_))
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn loc(&self) -> SourceLoc {
        self.loc
    }

    /// The call sites of the procedures being executed when the error
    /// was raised, innermost last.
    pub fn calls(&self) -> &[SourceLoc] {
        &self.calls
    }

    /// Attach a call stack, unless one is already present from a more
    /// deeply nested statement.
    pub fn with_calls(mut self, calls: &[SourceLoc]) -> Self {
        if self.calls.is_empty() {
            self.calls = calls.to_vec()
        }
        self
    }

    pub fn message(&self, files: &[&str]) -> String {
        let mut msg = format!("{}: {}", self.loc.location_string(files), self.kind);
        for call in self.calls.iter().rev() {
            msg.push_str(&format!("\n  called from {}", call.location_string(files)))
        }
        msg
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.loc.is_unknown() {
            write!(f, "{}", self.kind)?
        } else {
            write!(f, "{}: {}", self.loc, self.kind)?
        }
        for call in self.calls.iter().rev() {
            write!(f, "\n  called from {}", call)?
        }
        Ok(())
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let loc = SourceLoc::new(0, 4, 1, 4, 10);
        let err = Error::comp(loc, CompError::Heterogeneous(Ty::Rel, Ty::Set));
        assert_eq!(format!("{}", err), "4:1 - 4:10: heterogeneous set elements: types relation and set");
        assert!(!err.is_abort())
    }

    #[test]
    fn test_call_stack() {
        let call1 = SourceLoc::new(0, 1, 0, 1, 5);
        let call2 = SourceLoc::new(0, 7, 2, 7, 9);
        let err = Error::abort(SourceLoc::unknown(), "pattern matching failed").with_calls(&[call1, call2]);
        assert!(err.is_abort());
        assert_eq!(
            err.message(&["x86tso.cat"]),
            "0:0 - 0:0: pattern matching failed\n  called from x86tso.cat 7:2 - 7:9\n  called from x86tso.cat 1:0 - 1:5"
        );
        // an inner stack is not overwritten
        let err = err.with_calls(&[]);
        assert_eq!(err.calls().len(), 2)
    }
}
