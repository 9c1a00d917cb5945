//! Textual native signatures such as `(POINTER,POINTER,POINTER,UINT64):POINTER`.
//!
//! A signature lists the argument kinds between parentheses, followed by a
//! colon and the return kind. Whitespace around kinds is ignored and kind names
//! are matched case-sensitively in upper case.

use crate::errors::ResolveError;
use std::fmt;
use std::str::FromStr;

/// Argument/return kinds understood by the native call mechanism
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Void,
    Pointer,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    SInt8,
    SInt16,
    SInt32,
    SInt64,
    Float,
    Double,
}

impl NativeKind {
    pub fn name(self) -> &'static str {
        match self {
            NativeKind::Void => "VOID",
            NativeKind::Pointer => "POINTER",
            NativeKind::UInt8 => "UINT8",
            NativeKind::UInt16 => "UINT16",
            NativeKind::UInt32 => "UINT32",
            NativeKind::UInt64 => "UINT64",
            NativeKind::SInt8 => "SINT8",
            NativeKind::SInt16 => "SINT16",
            NativeKind::SInt32 => "SINT32",
            NativeKind::SInt64 => "SINT64",
            NativeKind::Float => "FLOAT",
            NativeKind::Double => "DOUBLE",
        }
    }

    fn parse(text: &str) -> Option<NativeKind> {
        let kind = match text.trim() {
            "VOID" => NativeKind::Void,
            "POINTER" => NativeKind::Pointer,
            "UINT8" => NativeKind::UInt8,
            "UINT16" => NativeKind::UInt16,
            "UINT32" => NativeKind::UInt32,
            "UINT64" => NativeKind::UInt64,
            "SINT8" => NativeKind::SInt8,
            "SINT16" => NativeKind::SInt16,
            "SINT32" => NativeKind::SInt32,
            "SINT64" => NativeKind::SInt64,
            "FLOAT" => NativeKind::Float,
            "DOUBLE" => NativeKind::Double,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A parsed native calling signature
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    params: Vec<NativeKind>,
    ret: NativeKind,
}

impl Signature {
    pub fn new(params: Vec<NativeKind>, ret: NativeKind) -> Self {
        Signature { params, ret }
    }

    /// Parse the textual form. `VOID` is only accepted as the return kind.
    pub fn parse(text: &str) -> Result<Signature, ResolveError> {
        let invalid = |reason: &str| ResolveError::InvalidSignature {
            signature: text.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = text.trim();
        let rest = trimmed
            .strip_prefix('(')
            .ok_or_else(|| invalid("expected '('"))?;
        let close = rest.find(')').ok_or_else(|| invalid("missing ')'"))?;
        let params_str = &rest[..close];
        let ret_str = rest[close + 1..]
            .trim_start()
            .strip_prefix(':')
            .ok_or_else(|| invalid("expected ':' before the return kind"))?;

        let ret = NativeKind::parse(ret_str)
            .ok_or_else(|| invalid(&format!("unknown return kind '{}'", ret_str.trim())))?;

        let mut params = Vec::new();
        if !params_str.trim().is_empty() {
            for param in params_str.split(',') {
                match NativeKind::parse(param) {
                    Some(NativeKind::Void) => {
                        return Err(invalid("VOID is not a valid argument kind"));
                    }
                    Some(kind) => params.push(kind),
                    None => {
                        return Err(invalid(&format!(
                            "unknown argument kind '{}'",
                            param.trim()
                        )));
                    }
                }
            }
        }

        Ok(Signature { params, ret })
    }

    pub fn params(&self) -> &[NativeKind] {
        &self.params
    }

    pub fn ret(&self) -> NativeKind {
        self.ret
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl FromStr for Signature {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Signature::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, kind) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(kind.name())?;
        }
        write!(f, "):{}", self.ret)
    }
}
