//! Mapping file loading: tiny v1 and tiny v2.
//!
//! ```text
//! tiny	2	0	intermediary	named
//! c	net/C_1	net/Foo
//! 	f	I	f_1	count
//! 	m	(Lnet/C_2;)V	m_1	apply
//! ```
//!
//! ```text
//! v1	intermediary	named
//! CLASS	net/C_1	net/Foo
//! FIELD	net/C_1	I	f_1	count
//! METHOD	net/C_1	(Lnet/C_2;)V	m_1	apply
//! ```
//!
//! Parameters, locals and comments carry no names this tool rewrites and are
//! skipped.

use std::fs;
use std::path::Path;

use tracing::debug;

use remap_core::error::RemapError;
use remap_core::mapping::table::{ClassEntry, FieldEntry, MappingTable, MethodEntry};
use remap_core::mapping::MappingError;

/// Read and parse a mapping file.
pub fn load_table(path: &Path) -> Result<MappingTable, RemapError> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => RemapError::file_not_found(path.display().to_string()),
        _ => RemapError::internal(format!("failed to read {}: {}", path.display(), e)),
    })?;
    let table = parse_mappings(&text).map_err(|e| RemapError::Mapping {
        message: format!("{}: {}", path.display(), e),
    })?;
    debug!(path = %path.display(), classes = table.class_count(), "loaded mapping table");
    Ok(table)
}

/// Parse tiny v1 or v2 text, chosen by the header.
pub fn parse_mappings(text: &str) -> Result<MappingTable, MappingError> {
    let header = text.lines().next().unwrap_or_default();
    let fields: Vec<&str> = header.split('\t').collect();
    match fields.as_slice() {
        ["tiny", "2", _, namespaces @ ..] => parse_tiny_v2(text, namespaces),
        ["v1", namespaces @ ..] => parse_tiny_v1(text, namespaces),
        _ => Err(MappingError::UnsupportedFormat {
            header: header.chars().take(40).collect(),
        }),
    }
}

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn parse_error(line: usize, message: impl Into<String>) -> MappingError {
    MappingError::Parse {
        line: line + 1,
        message: message.into(),
    }
}

// ============================================================================
// Tiny v2
// ============================================================================

fn parse_tiny_v2(text: &str, namespaces: &[&str]) -> Result<MappingTable, MappingError> {
    let mut table = MappingTable::new(owned(namespaces))?;
    let width = namespaces.len();
    let mut escaped = false;
    let mut class: Option<ClassEntry> = None;

    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let depth = line.chars().take_while(|&c| c == '\t').count();
        let parts: Vec<&str> = line[depth..].split('\t').collect();
        let unescaping = escaped;
        let names = |from: usize| -> Result<Vec<String>, MappingError> {
            let names = parts.get(from..from + width).ok_or_else(|| {
                parse_error(index, format!("expected {} names, found {}", width, parts.len().saturating_sub(from)))
            })?;
            Ok(names.iter().map(|n| unescape(n, unescaping)).collect())
        };

        match (depth, parts[0]) {
            (0, "c") => {
                if let Some(done) = class.take() {
                    table.insert_class(done);
                }
                class = Some(ClassEntry::new(names(1)?));
            }
            (1, "f") | (1, "m") if class.is_some() => {
                let desc = parts
                    .get(1)
                    .map(|d| unescape(d, unescaping))
                    .ok_or_else(|| parse_error(index, "missing descriptor"))?;
                let member_names = names(2)?;
                if let Some(entry) = class.as_mut() {
                    if parts[0] == "f" {
                        entry.fields.push(FieldEntry {
                            names: member_names,
                            desc: Some(desc),
                        });
                    } else {
                        entry.methods.push(MethodEntry {
                            names: member_names,
                            desc,
                        });
                    }
                }
            }
            (1, "escaped-names") if class.is_none() => escaped = true,
            (0, other) => return Err(parse_error(index, format!("unknown section '{}'", other))),
            // Properties, parameters, locals and comments.
            _ => {}
        }
    }
    if let Some(done) = class.take() {
        table.insert_class(done);
    }
    Ok(table)
}

/// Undo tiny v2 name escaping when the file declares `escaped-names`.
fn unescape(name: &str, escaped: bool) -> String {
    if !escaped || !name.contains('\\') {
        return name.to_string();
    }
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// Tiny v1
// ============================================================================

fn parse_tiny_v1(text: &str, namespaces: &[&str]) -> Result<MappingTable, MappingError> {
    let mut table = MappingTable::new(owned(namespaces))?;
    let width = namespaces.len();

    for (index, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split('\t').collect();
        let names = |from: usize| -> Result<Vec<String>, MappingError> {
            parts
                .get(from..from + width)
                .map(owned)
                .ok_or_else(|| parse_error(index, format!("expected {} names", width)))
        };

        match parts[0] {
            "CLASS" => {
                let names = names(1)?;
                match table.class_mut(&names[0]) {
                    // Members can precede their class line.
                    Some(existing) => existing.names = names,
                    None => table.insert_class(ClassEntry::new(names)),
                }
            }
            kind @ ("FIELD" | "METHOD") => {
                let (owner, desc) = match (parts.get(1), parts.get(2)) {
                    (Some(owner), Some(desc)) => (owner.to_string(), desc.to_string()),
                    _ => return Err(parse_error(index, "missing owner or descriptor")),
                };
                let member_names = names(3)?;
                if table.get_class(&owner).is_none() {
                    table.insert_class(ClassEntry::new(vec![owner.clone()]));
                }
                if let Some(entry) = table.class_mut(&owner) {
                    if kind == "FIELD" {
                        entry.fields.push(FieldEntry {
                            names: member_names,
                            desc: Some(desc),
                        });
                    } else {
                        entry.methods.push(MethodEntry {
                            names: member_names,
                            desc,
                        });
                    }
                }
            }
            other => return Err(parse_error(index, format!("unknown entry kind '{}'", other))),
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use remap_core::mapping::NamespaceId;

    const TINY_V2: &str = "tiny\t2\t0\tintermediary\tnamed\n\
                           c\tnet/C_1\tnet/Foo\n\
                           \tc\tA comment\n\
                           \tf\tI\tf_1\tcount\n\
                           \tm\t(Lnet/C_2;)V\tm_1\tapply\n\
                           \t\tp\t1\t\tother\n\
                           c\tnet/C_2\tnet/Bar\n";

    mod tiny_v2 {
        use super::*;

        #[test]
        fn classes_and_members_are_read() {
            let table = parse_mappings(TINY_V2).unwrap();
            assert_eq!(table.namespaces(), ["intermediary", "named"]);
            assert_eq!(table.class_count(), 2);
            let foo = table.get_class("net/C_1").unwrap();
            let named = NamespaceId(1);
            assert_eq!(foo.name(named), Some("net/Foo"));
            assert_eq!(foo.field("f_1", None).and_then(|f| f.name(named)), Some("count"));
            assert_eq!(foo.method("m_1", "(Lnet/C_2;)V").and_then(|m| m.name(named)), Some("apply"));
        }

        #[test]
        fn escaped_names_are_decoded() {
            let text = "tiny\t2\t0\ta\tb\n\tescaped-names\nc\tx/A\\tB\tx/C\n";
            let table = parse_mappings(text).unwrap();
            assert!(table.get_class("x/A\tB").is_some());
        }

        #[test]
        fn short_lines_report_their_line_number() {
            let err = parse_mappings("tiny\t2\t0\ta\tb\nc\tonly\n").unwrap_err();
            assert!(matches!(err, MappingError::Parse { line: 2, .. }), "{err}");
        }
    }

    mod tiny_v1 {
        use super::*;

        #[test]
        fn members_before_their_class_are_kept() {
            let text = "v1\tofficial\tintermediary\n\
                        FIELD\ta\tI\tb\tfield_1\n\
                        CLASS\ta\tnet/C_1\n\
                        METHOD\ta\t()V\tc\tmethod_1\n";
            let table = parse_mappings(text).unwrap();
            let class = table.get_class("a").unwrap();
            assert_eq!(class.name(NamespaceId(1)), Some("net/C_1"));
            assert_eq!(class.fields.len(), 1);
            assert_eq!(class.methods.len(), 1);
        }
    }

    #[test]
    fn unknown_header_is_unsupported() {
        let err = parse_mappings("PK\u{3}\u{4}").unwrap_err();
        assert!(matches!(err, MappingError::UnsupportedFormat { .. }));
    }

    #[test]
    fn missing_file_is_file_not_found() {
        let err = load_table(Path::new("/nonexistent/mappings.tiny")).unwrap_err();
        assert!(matches!(err, RemapError::FileNotFound { .. }));
    }
}
