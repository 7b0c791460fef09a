//! JVM field and method descriptors.
//!
//! Descriptors are parsed into structured types so that class names inside
//! them can be remapped and the result re-serialized exactly:
//!
//! ```
//! use remap_core::mapping::descriptor::remap_descriptor;
//!
//! let out = remap_descriptor("(Lold/Arg;[I)Lold/Ret;", |name| {
//!     name.strip_prefix("old/").map(|rest| format!("new/{}", rest))
//! })
//! .unwrap();
//! assert_eq!(out, "(Lnew/Arg;[I)Lnew/Ret;");
//! ```

use std::fmt;

use thiserror::Error;
use winnow::combinator::{alt, delimited, preceded, repeat};
use winnow::prelude::*;
use winnow::token::{any, take_till};
use winnow::ModalResult;

/// A descriptor that could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid descriptor '{input}': {message}")]
pub struct DescriptorError {
    pub input: String,
    pub message: String,
}

/// A field type: primitive, object, or array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
    /// Internal (slash-separated) class name.
    Object(String),
    Array(Box<FieldType>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReturnType {
    Void,
    Value(FieldType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    pub params: Vec<FieldType>,
    pub ret: ReturnType,
}

/// Either kind of descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Descriptor {
    Field(FieldType),
    Method(MethodDescriptor),
}

impl FieldType {
    fn from_base_char(c: char) -> Option<FieldType> {
        Some(match c {
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'D' => FieldType::Double,
            'F' => FieldType::Float,
            'I' => FieldType::Int,
            'J' => FieldType::Long,
            'S' => FieldType::Short,
            'Z' => FieldType::Boolean,
            _ => return None,
        })
    }

    /// Rewrite object class names with `lookup`; names it returns `None` for
    /// are kept.
    pub fn map_classes(&self, lookup: &mut impl FnMut(&str) -> Option<String>) -> FieldType {
        match self {
            FieldType::Object(name) => FieldType::Object(lookup(name).unwrap_or_else(|| name.clone())),
            FieldType::Array(inner) => FieldType::Array(Box::new(inner.map_classes(lookup))),
            other => other.clone(),
        }
    }

    fn collect_classes<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            FieldType::Object(name) => out.push(name),
            FieldType::Array(inner) => inner.collect_classes(out),
            _ => {}
        }
    }
}

impl MethodDescriptor {
    pub fn map_classes(&self, lookup: &mut impl FnMut(&str) -> Option<String>) -> MethodDescriptor {
        MethodDescriptor {
            params: self.params.iter().map(|p| p.map_classes(lookup)).collect(),
            ret: match &self.ret {
                ReturnType::Void => ReturnType::Void,
                ReturnType::Value(t) => ReturnType::Value(t.map_classes(lookup)),
            },
        }
    }
}

impl Descriptor {
    pub fn map_classes(&self, mut lookup: impl FnMut(&str) -> Option<String>) -> Descriptor {
        match self {
            Descriptor::Field(t) => Descriptor::Field(t.map_classes(&mut lookup)),
            Descriptor::Method(m) => Descriptor::Method(m.map_classes(&mut lookup)),
        }
    }

    /// Every class name mentioned, in order of appearance.
    pub fn class_names(&self) -> Vec<&str> {
        let mut out = Vec::new();
        match self {
            Descriptor::Field(t) => t.collect_classes(&mut out),
            Descriptor::Method(m) => {
                for p in &m.params {
                    p.collect_classes(&mut out);
                }
                if let ReturnType::Value(t) = &m.ret {
                    t.collect_classes(&mut out);
                }
            }
        }
        out
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Byte => f.write_str("B"),
            FieldType::Char => f.write_str("C"),
            FieldType::Double => f.write_str("D"),
            FieldType::Float => f.write_str("F"),
            FieldType::Int => f.write_str("I"),
            FieldType::Long => f.write_str("J"),
            FieldType::Short => f.write_str("S"),
            FieldType::Boolean => f.write_str("Z"),
            FieldType::Object(name) => write!(f, "L{};", name),
            FieldType::Array(inner) => write!(f, "[{}", inner),
        }
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{}", p)?;
        }
        f.write_str(")")?;
        match &self.ret {
            ReturnType::Void => f.write_str("V"),
            ReturnType::Value(t) => write!(f, "{}", t),
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Field(t) => write!(f, "{}", t),
            Descriptor::Method(m) => write!(f, "{}", m),
        }
    }
}

// ============================================================================
// Parsing
// ============================================================================

pub fn parse_field_descriptor(input: &str) -> Result<FieldType, DescriptorError> {
    field_type.parse(input).map_err(|e| DescriptorError {
        input: input.to_string(),
        message: format!("{:?}", e),
    })
}

pub fn parse_method_descriptor(input: &str) -> Result<MethodDescriptor, DescriptorError> {
    method_descriptor.parse(input).map_err(|e| DescriptorError {
        input: input.to_string(),
        message: format!("{:?}", e),
    })
}

/// Parse a field or method descriptor, chosen by the leading `(`.
pub fn parse_descriptor(input: &str) -> Result<Descriptor, DescriptorError> {
    if input.starts_with('(') {
        parse_method_descriptor(input).map(Descriptor::Method)
    } else {
        parse_field_descriptor(input).map(Descriptor::Field)
    }
}

/// Parse `desc`, rewrite its class names with `lookup`, and serialize.
pub fn remap_descriptor(
    desc: &str,
    lookup: impl FnMut(&str) -> Option<String>,
) -> Result<String, DescriptorError> {
    Ok(parse_descriptor(desc)?.map_classes(lookup).to_string())
}

fn field_type(input: &mut &str) -> ModalResult<FieldType> {
    alt((
        any.verify_map(FieldType::from_base_char),
        delimited('L', take_till(1.., |c| c == ';' || c == '(' || c == ')'), ';')
            .map(|s: &str| FieldType::Object(s.to_string())),
        preceded('[', field_type).map(|t| FieldType::Array(Box::new(t))),
    ))
    .parse_next(input)
}

fn return_type(input: &mut &str) -> ModalResult<ReturnType> {
    alt(('V'.value(ReturnType::Void), field_type.map(ReturnType::Value))).parse_next(input)
}

fn method_descriptor(input: &mut &str) -> ModalResult<MethodDescriptor> {
    let params: Vec<FieldType> = delimited('(', repeat(0.., field_type), ')').parse_next(input)?;
    let ret = return_type(input)?;
    Ok(MethodDescriptor { params, ret })
}
