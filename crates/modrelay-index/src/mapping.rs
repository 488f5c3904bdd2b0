//! Parsing of SRG-style mapping text into class, field and method entities.
//!
//! The mapping resource is line oriented. Only lines tagged `CL: `, `FD: ` or
//! `MD: ` are considered; everything else (package records, blank lines) is
//! ignored. A tagged line with the wrong number of columns aborts the build.

use std::collections::HashSet;

use serde::Serialize;

use crate::error::{IndexError, RecordKind, Result};

const CLASS_TAG: &str = "CL: ";
const FIELD_TAG: &str = "FD: ";
const METHOD_TAG: &str = "MD: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingClass {
    pub display_name: String,
    pub full_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingField {
    pub deobf_name: String,
    pub obf_name: String,
    pub owner_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MappingMethod {
    pub deobf_name: String,
    pub obf_name: String,
    /// Raw JVM descriptor, e.g. `(ILjava/lang/String;)V`.
    pub signature: String,
    pub owner_path: String,
    pub is_static: bool,
}

/// Every entity parsed from one mapping resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingTables {
    pub classes: Vec<MappingClass>,
    pub fields: Vec<MappingField>,
    pub methods: Vec<MappingMethod>,
}

/// Parse the full mapping text. `static_names` lists obfuscated method names
/// that are statically dispatched.
pub fn parse_mappings(text: &str, static_names: &[String]) -> Result<MappingTables> {
    let statics: HashSet<&str> = static_names.iter().map(String::as_str).collect();
    let mut tables = MappingTables::default();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim_end_matches('\r');

        if let Some(rest) = line.strip_prefix(CLASS_TAG) {
            tables.classes.push(class_from_record(line_no, rest)?);
        } else if let Some(rest) = line.strip_prefix(FIELD_TAG) {
            tables.fields.push(field_from_record(line_no, rest)?);
        } else if let Some(rest) = line.strip_prefix(METHOD_TAG) {
            tables
                .methods
                .push(method_from_record(line_no, rest, &statics)?);
        }
    }

    tracing::debug!(
        classes = tables.classes.len(),
        fields = tables.fields.len(),
        methods = tables.methods.len(),
        "parsed mapping text"
    );

    Ok(tables)
}

/// Parse a newline-delimited list of statically dispatched obfuscated names.
pub fn parse_static_names(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a class from the body of a `CL: ` record. Only the first column,
/// the deobfuscated path, is used.
pub fn class_from_record(line_no: usize, record: &str) -> Result<MappingClass> {
    let path = record
        .split_whitespace()
        .next()
        .ok_or(IndexError::MalformedMappingRecord {
            line: line_no,
            kind: RecordKind::Class,
            expected: 1,
            found: 0,
        })?;

    Ok(MappingClass {
        display_name: last_segment(path).to_string(),
        full_path: path.to_string(),
    })
}

/// Build a field from the body of a `<deobfPath> <obfPath>` record.
pub fn field_from_record(line_no: usize, record: &str) -> Result<MappingField> {
    let [path, obf_path] = columns::<2>(line_no, RecordKind::Field, record)?;

    Ok(MappingField {
        deobf_name: last_segment(path).to_string(),
        obf_name: last_segment(obf_path).to_string(),
        owner_path: owner_path(path).to_string(),
    })
}

/// Build a method from the body of a `<deobfPath> <signature> <obfPath>` record.
pub fn method_from_record(
    line_no: usize,
    record: &str,
    static_names: &HashSet<&str>,
) -> Result<MappingMethod> {
    let [path, signature, obf_path] = columns::<3>(line_no, RecordKind::Method, record)?;
    let obf_name = last_segment(obf_path);

    Ok(MappingMethod {
        deobf_name: last_segment(path).to_string(),
        obf_name: obf_name.to_string(),
        signature: signature.to_string(),
        owner_path: owner_path(path).to_string(),
        is_static: static_names.contains(obf_name),
    })
}

fn columns<'a, const N: usize>(
    line_no: usize,
    kind: RecordKind,
    record: &'a str,
) -> Result<[&'a str; N]> {
    let parts: Vec<&str> = record.split_whitespace().collect();
    let found = parts.len();
    parts
        .try_into()
        .map_err(|_| IndexError::MalformedMappingRecord {
            line: line_no,
            kind,
            expected: N,
            found,
        })
}

/// Final `/`-delimited segment of a path.
pub fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Path with its final `/`-delimited segment removed. A single-segment path
/// has an empty owner.
pub fn owner_path(path: &str) -> &str {
    path.rsplit_once('/').map(|(owner, _)| owner).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_and_field_records() {
        let text = "CL: com/foo/Bar baz/Qux\nFD: com/foo/Bar/x baz/Qux/a\n";
        let tables = parse_mappings(text, &[]).unwrap();

        assert_eq!(
            tables.classes,
            vec![MappingClass {
                display_name: "Bar".to_string(),
                full_path: "com/foo/Bar".to_string(),
            }]
        );
        assert_eq!(
            tables.fields,
            vec![MappingField {
                deobf_name: "x".to_string(),
                obf_name: "a".to_string(),
                owner_path: "com/foo/Bar".to_string(),
            }]
        );
        assert!(tables.methods.is_empty());
    }

    #[test]
    fn method_static_flag_follows_static_list() {
        let text = "MD: net/minecraft/client/Minecraft/getMinecraft ()Lnet/minecraft/client/Minecraft; bao/func_71410_x\n\
                    MD: net/minecraft/client/Minecraft/shutdown ()V bao/func_71400_g\n";
        let statics = vec!["func_71410_x".to_string()];
        let tables = parse_mappings(text, &statics).unwrap();

        assert_eq!(tables.methods.len(), 2);
        assert!(tables.methods[0].is_static);
        assert!(!tables.methods[1].is_static);
        assert_eq!(tables.methods[0].owner_path, "net/minecraft/client/Minecraft");
        assert_eq!(tables.methods[0].obf_name, "func_71410_x");
        assert_eq!(
            tables.methods[0].signature,
            "()Lnet/minecraft/client/Minecraft;"
        );
    }

    #[test]
    fn static_membership_is_verbatim() {
        let text = "MD: a/B/run ()V c/func_1_a\n";
        let statics = vec!["func_1".to_string(), "FUNC_1_A".to_string()];
        let tables = parse_mappings(text, &statics).unwrap();
        assert!(!tables.methods[0].is_static);
    }

    #[test]
    fn malformed_field_record_is_fatal() {
        let err = parse_mappings("CL: a/B c/D\nFD: onlyOneColumn\n", &[]).unwrap_err();
        match err {
            IndexError::MalformedMappingRecord {
                line,
                kind,
                expected,
                found,
            } => {
                assert_eq!(line, 2);
                assert_eq!(kind, RecordKind::Field);
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_method_record_is_fatal() {
        let err = parse_mappings("MD: a/B/run ()V\n", &[]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::MalformedMappingRecord {
                kind: RecordKind::Method,
                expected: 3,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn untagged_lines_are_ignored() {
        let text = "PK: net/minecraft net/minecraft\n\nFD: a/B/c d/e\r\n";
        let tables = parse_mappings(text, &[]).unwrap();
        assert_eq!(tables.fields.len(), 1);
        assert_eq!(tables.fields[0].obf_name, "e");
    }

    #[test]
    fn owner_of_single_segment_is_empty() {
        assert_eq!(owner_path("x"), "");
        assert_eq!(last_segment("x"), "x");
        assert_eq!(owner_path("a/b/c"), "a/b");
    }

    #[test]
    fn static_names_skip_blank_lines() {
        let names = parse_static_names("func_1_a\n\n func_2_b \n");
        assert_eq!(names, vec!["func_1_a", "func_2_b"]);
    }
}
