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

use std::convert::TryInto;
use std::fmt;

use serde::Serialize;

pub static RED: &str = "\x1b[0;31m";
pub static BLUE: &str = "\x1b[0;34m";
pub static NO_COLOR: &str = "\x1b[0m";

/// A span in a model file. The file is an index into whatever list of
/// file names the caller used when building the AST, so that locations
/// stay `Copy` and small.
#[derive(Copy, Clone, Debug, Serialize, PartialEq, Eq, Hash)]
pub struct SourceLoc {
    file: i16,
    line1: u32,
    char1: u16,
    line2: u32,
    char2: u16,
}

impl SourceLoc {
    pub fn unknown() -> Self {
        SourceLoc { file: -1, line1: 0, char1: 0, line2: 0, char2: 0 }
    }

    pub fn is_unknown(self) -> bool {
        self.file == -1
    }

    pub fn new(file: i16, line1: u32, char1: u16, line2: u32, char2: u16) -> Self {
        if file < 0 {
            SourceLoc::unknown()
        } else {
            SourceLoc { file, line1, char1, line2, char2 }
        }
    }

    pub fn file(self) -> Option<usize> {
        self.file.try_into().ok()
    }

    pub fn line(self) -> u32 {
        self.line1
    }

    pub fn location_string(self, files: &[&str]) -> String {
        if let Some(file) = self.file().and_then(|i| files.get(i)) {
            format!("{} {}:{} - {}:{}", file, self.line1, self.char1, self.line2, self.char2)
        } else {
            format!("{}:{} - {}:{}", self.line1, self.char1, self.line2, self.char2)
        }
    }

    /// Render `message` together with the first line of the span in
    /// `buf`, underlining the located characters.
    pub fn message_file_contents(self, buf_name: &str, buf: &str, message: &str, use_colors: bool) -> String {
        let red = if use_colors { RED } else { "" };
        let blue = if use_colors { BLUE } else { "" };
        let no_color = if use_colors { NO_COLOR } else { "" };

        let header = format!(
            "{}error{}: {}\n{}-->{} {}:{}:{}",
            red, no_color, message, blue, no_color, buf_name, self.line1, self.char1
        );

        let line = match buf.lines().nth(self.line1.saturating_sub(1) as usize) {
            Some(line) if !self.is_unknown() => line,
            _ => return header,
        };

        let line_number = self.line1.to_string();
        let width = line_number.len();
        let highlight_len = if self.line1 == self.line2 && self.char2 > self.char1 {
            (self.char2 - self.char1) as usize
        } else {
            line.len().saturating_sub(self.char1 as usize).max(1)
        };

        format!(
            "{}\n{:width$} {}|{}\n{}{} |{} {}\n{:width$} {}|{} {:gap$}{}{}{}",
            header,
            "",
            blue,
            no_color,
            blue,
            line_number,
            no_color,
            line,
            "",
            blue,
            no_color,
            "",
            red,
            "^".repeat(highlight_len),
            no_color,
            width = width,
            gap = self.char1 as usize
        )
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown location>")
        } else {
            write!(f, "{}", self.location_string(&[]))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown() {
        assert!(SourceLoc::new(-3, 1, 2, 3, 4).is_unknown());
        assert_eq!(format!("{}", SourceLoc::unknown()), "<unknown location>");
    }

    #[test]
    fn test_location_string() {
        let loc = SourceLoc::new(0, 3, 4, 3, 9);
        assert_eq!(loc.location_string(&["aarch64.cat"]), "aarch64.cat 3:4 - 3:9");
        assert_eq!(loc.location_string(&[]), "3:4 - 3:9");
    }

    #[test]
    fn test_message_underlines_span() {
        let loc = SourceLoc::new(0, 2, 8, 2, 11);
        let contents = "let a = po\nacyclic foo as x\n";
        let msg = loc.message_file_contents("x.cat", contents, "unbound var: foo", false);
        assert!(msg.contains("acyclic foo as x"));
        assert!(msg.ends_with("        ^^^"))
    }
}
