//! Documentation-tree input model and the derivation of searchable doc entities.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

pub const DEFAULT_DOCS_BASE_URL: &str = "https://chattriggers.com/javadocs";

/// Output of the external documentation generator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocTree {
    #[serde(default)]
    pub classes: Vec<DocClass>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocClass {
    /// Simple name, e.g. `Player`.
    pub name: String,
    /// Package-qualified id, e.g. `com.chattriggers.ctjs.minecraft.wrappers.Player`.
    pub id: String,
    pub package: String,
    pub kind: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub methods: Vec<DocMethod>,
    #[serde(default)]
    pub fields: Vec<DocField>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMethod {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
    #[serde(default)]
    pub receiver: Option<DocParameter>,
    #[serde(default)]
    pub parameters: Vec<DocParameter>,
    pub return_value: DocReturn,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocParameter {
    pub name: String,
    #[serde(default)]
    pub signature: Vec<SignatureToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocReturn {
    pub name: String,
    #[serde(default)]
    pub signature: Vec<SignatureToken>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignatureToken {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DocField {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<String>,
}

/// A searchable documentation term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocEntity {
    pub name: String,
    pub url: String,
    pub descriptor: String,
}

/// Closed set of documented class kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Object,
    Enum,
}

impl ClassKind {
    /// Character joining the class name and a member in a descriptor.
    pub fn member_separator(self) -> char {
        match self {
            ClassKind::Object | ClassKind::Enum => '.',
            ClassKind::Class | ClassKind::Interface => '#',
        }
    }
}

impl FromStr for ClassKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Class" => Ok(ClassKind::Class),
            "Interface" => Ok(ClassKind::Interface),
            "Object" => Ok(ClassKind::Object),
            "Enum" => Ok(ClassKind::Enum),
            other => Err(other.to_string()),
        }
    }
}

fn is_public(modifiers: &[String]) -> bool {
    !modifiers.iter().any(|m| m == "internal" || m == "private")
}

fn join_tokens(tokens: &[SignatureToken]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

/// Derive doc entities for every publicly visible class and member.
pub fn doc_entities(tree: &DocTree, base_url: &str) -> Result<Vec<DocEntity>> {
    let base_url = base_url.trim_end_matches('/');
    let mut entities = Vec::new();

    for class in tree.classes.iter().filter(|c| is_public(&c.modifiers)) {
        let kind = class
            .kind
            .parse::<ClassKind>()
            .map_err(|kind| IndexError::UnrecognizedClassKind {
                class: class.id.clone(),
                kind,
            })?;

        let url_base = class_url(base_url, class);
        let local_name = local_name(class);

        entities.push(DocEntity {
            name: class.name.clone(),
            url: url_base.clone(),
            descriptor: format!("{} {}", class.kind.to_lowercase(), local_name),
        });

        for method in class.methods.iter().filter(|m| is_public(&m.modifiers)) {
            entities.push(DocEntity {
                name: method.name.clone(),
                url: method_url(&url_base, method),
                descriptor: method_descriptor(&class.name, kind, method),
            });
        }

        for field in class.fields.iter().filter(|f| is_public(&f.modifiers)) {
            entities.push(DocEntity {
                name: field.name.clone(),
                url: format!("{url_base}#{}", field.name),
                descriptor: format!("field {}", field.name),
            });
        }
    }

    Ok(entities)
}

/// Class id with the package prefix removed; nested classes keep their outer name.
fn local_name(class: &DocClass) -> &str {
    class
        .id
        .strip_prefix(&class.package)
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(&class.id)
}

fn class_url(base_url: &str, class: &DocClass) -> String {
    let pkg = class.package.replace('.', "/");
    format!("{base_url}/{pkg}/{}.html", local_name(class))
}

/// Anchor naming follows the generator: `#name-` then `:Dreceiver-` for
/// extension methods, then parameter names joined by `-`, then a closing `-`.
pub fn method_url(url_base: &str, method: &DocMethod) -> String {
    let mut url = format!("{url_base}#{}-", method.name);
    if method.receiver.is_some() {
        url.push_str(":Dreceiver-");
    }
    let params: Vec<&str> = method.parameters.iter().map(|p| p.name.as_str()).collect();
    url.push_str(&params.join("-"));
    url.push('-');
    url
}

pub fn method_descriptor(class_name: &str, kind: ClassKind, method: &DocMethod) -> String {
    let return_type = if method.return_value.name == "()" {
        "Unit".to_string()
    } else {
        join_tokens(&method.return_value.signature)
    };
    let params: Vec<String> = method
        .parameters
        .iter()
        .map(|p| join_tokens(&p.signature))
        .collect();

    format!(
        "{class_name}{}{}({}): {return_type}",
        kind.member_separator(),
        method.name,
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(parts: &[&str]) -> Vec<SignatureToken> {
        parts
            .iter()
            .map(|text| SignatureToken {
                text: text.to_string(),
            })
            .collect()
    }

    fn param(name: &str, ty: &[&str]) -> DocParameter {
        DocParameter {
            name: name.to_string(),
            signature: tokens(ty),
        }
    }

    fn method(name: &str, params: Vec<DocParameter>, ret: &str) -> DocMethod {
        DocMethod {
            name: name.to_string(),
            modifiers: vec!["public".to_string()],
            receiver: None,
            parameters: params,
            return_value: DocReturn {
                name: ret.to_string(),
                signature: tokens(&[ret]),
            },
        }
    }

    fn class(kind: &str) -> DocClass {
        DocClass {
            name: "Player".to_string(),
            id: "com.ct.wrappers.Player".to_string(),
            package: "com.ct.wrappers".to_string(),
            kind: kind.to_string(),
            modifiers: vec![],
            methods: vec![],
            fields: vec![],
        }
    }

    #[test]
    fn object_methods_use_dot_separator() {
        let mut player = class("Object");
        player.methods.push(method(
            "getX",
            vec![param("partial", &["Float"])],
            "Double",
        ));
        let tree = DocTree {
            classes: vec![player],
        };

        let entities = doc_entities(&tree, DEFAULT_DOCS_BASE_URL).unwrap();
        assert_eq!(entities.len(), 2);
        assert_eq!(entities[0].descriptor, "object Player");
        assert_eq!(
            entities[0].url,
            "https://chattriggers.com/javadocs/com/ct/wrappers/Player.html"
        );
        assert_eq!(entities[1].descriptor, "Player.getX(Float): Double");
        assert_eq!(
            entities[1].url,
            "https://chattriggers.com/javadocs/com/ct/wrappers/Player.html#getX-partial-"
        );
    }

    #[test]
    fn unit_return_and_receiver_anchor() {
        let mut m = method(
            "send",
            vec![param("a", &["String"]), param("b", &["Int", "?"])],
            "()",
        );
        m.receiver = Some(param("receiver", &["Player"]));

        assert_eq!(
            method_descriptor("Chat", ClassKind::Class, &m),
            "Chat#send(String, Int?): Unit"
        );
        assert_eq!(method_url("u", &m), "u#send-:Dreceiver-a-b-");
    }

    #[test]
    fn private_and_internal_members_are_excluded() {
        let mut player = class("Class");
        let mut hidden = method("secret", vec![], "()");
        hidden.modifiers = vec!["private".to_string()];
        player.methods.push(hidden);
        player.fields.push(DocField {
            name: "health".to_string(),
            modifiers: vec![],
        });
        player.fields.push(DocField {
            name: "cache".to_string(),
            modifiers: vec!["internal".to_string()],
        });
        let mut internal_class = class("Class");
        internal_class.modifiers = vec!["internal".to_string()];

        let tree = DocTree {
            classes: vec![player, internal_class],
        };
        let entities = doc_entities(&tree, "https://docs/").unwrap();

        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Player", "health"]);
        assert_eq!(entities[1].descriptor, "field health");
        assert_eq!(
            entities[1].url,
            "https://docs/com/ct/wrappers/Player.html#health"
        );
    }

    #[test]
    fn unknown_class_kind_fails() {
        let tree = DocTree {
            classes: vec![class("Annotation")],
        };
        let err = doc_entities(&tree, DEFAULT_DOCS_BASE_URL).unwrap_err();
        assert!(matches!(
            err,
            IndexError::UnrecognizedClassKind { ref kind, .. } if kind == "Annotation"
        ));
    }

    #[test]
    fn deserializes_generator_output() {
        let json = r#"{
            "classes": [{
                "name": "World",
                "id": "com.ct.World",
                "package": "com.ct",
                "kind": "Object",
                "modifiers": ["public"],
                "methods": [{
                    "name": "isLoaded",
                    "modifiers": [],
                    "parameters": [],
                    "returnValue": {"name": "Boolean", "signature": [{"text": "Boolean"}]}
                }],
                "fields": []
            }]
        }"#;
        let tree: DocTree = serde_json::from_str(json).unwrap();
        let entities = doc_entities(&tree, DEFAULT_DOCS_BASE_URL).unwrap();
        assert_eq!(entities[1].descriptor, "World.isLoaded(): Boolean");
    }
}
