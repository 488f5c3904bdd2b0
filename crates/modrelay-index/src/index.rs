use std::fs;
use std::path::{Path, PathBuf};

use crate::docs::{self, DEFAULT_DOCS_BASE_URL, DocEntity, DocTree};
use crate::error::{IndexError, Result};
use crate::fuzzy::{self, top_matches};
use crate::mapping::{self, MappingClass, MappingField, MappingMethod};

/// Number of results returned by the name lookups.
pub const DEFAULT_LIMIT: usize = 5;

const OBFUSCATED_PREFIXES: [&str; 2] = ["func_", "field_"];

/// Whether a user-supplied name looks like an obfuscated SRG name.
pub fn is_obfuscated(name: &str) -> bool {
    OBFUSCATED_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Immutable lookup collections built once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    classes: Vec<MappingClass>,
    fields: Vec<MappingField>,
    methods: Vec<MappingMethod>,
    docs: Vec<DocEntity>,
}

/// On-disk locations of the index inputs.
#[derive(Clone, Debug)]
pub struct IndexSources {
    pub mappings: PathBuf,
    pub static_methods: PathBuf,
    pub docs: Option<PathBuf>,
    pub docs_base_url: String,
}

impl ReferenceIndex {
    pub fn build(
        mapping_text: &str,
        static_names: &[String],
        doc_tree: &DocTree,
    ) -> Result<Self> {
        Self::build_with_base_url(mapping_text, static_names, doc_tree, DEFAULT_DOCS_BASE_URL)
    }

    pub fn build_with_base_url(
        mapping_text: &str,
        static_names: &[String],
        doc_tree: &DocTree,
        docs_base_url: &str,
    ) -> Result<Self> {
        let tables = mapping::parse_mappings(mapping_text, static_names)?;
        let docs = docs::doc_entities(doc_tree, docs_base_url)?;

        Ok(Self {
            classes: tables.classes,
            fields: tables.fields,
            methods: tables.methods,
            docs,
        })
    }

    /// Read every input from disk and build the index.
    pub fn load(sources: &IndexSources) -> Result<Self> {
        let mapping_text = read(&sources.mappings)?;
        let static_names = mapping::parse_static_names(&read(&sources.static_methods)?);
        let doc_tree = match &sources.docs {
            Some(path) => serde_json::from_str(&read(path)?)?,
            None => {
                tracing::warn!("no documentation tree supplied; docs lookups will be empty");
                DocTree::default()
            }
        };

        let index = Self::build_with_base_url(
            &mapping_text,
            &static_names,
            &doc_tree,
            &sources.docs_base_url,
        )?;
        tracing::info!(
            classes = index.classes.len(),
            fields = index.fields.len(),
            methods = index.methods.len(),
            docs = index.docs.len(),
            "reference index built"
        );
        Ok(index)
    }

    pub fn classes(&self) -> &[MappingClass] {
        &self.classes
    }

    pub fn fields(&self) -> &[MappingField] {
        &self.fields
    }

    pub fn methods(&self) -> &[MappingMethod] {
        &self.methods
    }

    pub fn docs(&self) -> &[DocEntity] {
        &self.docs
    }

    /// Fields matching `name`, compared against the obfuscated or the
    /// deobfuscated name depending on `obfuscated`.
    pub fn fields_from_name(
        &self,
        name: &str,
        obfuscated: bool,
        limit: usize,
    ) -> Vec<&MappingField> {
        top_matches(
            name,
            &self.fields,
            |f| if obfuscated { f.obf_name.as_str() } else { f.deobf_name.as_str() },
            limit,
        )
    }

    pub fn methods_from_name(
        &self,
        name: &str,
        obfuscated: bool,
        limit: usize,
    ) -> Vec<&MappingMethod> {
        top_matches(
            name,
            &self.methods,
            |m| if obfuscated { m.obf_name.as_str() } else { m.deobf_name.as_str() },
            limit,
        )
    }

    pub fn classes_from_name(&self, name: &str, limit: usize) -> Vec<&MappingClass> {
        top_matches(name, &self.classes, |c| c.display_name.as_str(), limit)
    }

    pub fn docs_from_name(&self, query: &str, limit: usize) -> Vec<&DocEntity> {
        top_matches(query, &self.docs, |d| d.name.as_str(), limit)
    }

    /// Field lookup with the direction inferred from the name and an optional
    /// owner re-rank.
    pub fn lookup_fields(&self, name: &str, owner_hint: Option<&str>) -> Vec<&MappingField> {
        let found = self.fields_from_name(name, is_obfuscated(name), DEFAULT_LIMIT);
        fuzzy::reorder_by_affinity(found, owner_hint, |f| f.owner_path.as_str())
    }

    pub fn lookup_methods(&self, name: &str, owner_hint: Option<&str>) -> Vec<&MappingMethod> {
        let found = self.methods_from_name(name, is_obfuscated(name), DEFAULT_LIMIT);
        fuzzy::reorder_by_affinity(found, owner_hint, |m| m.owner_path.as_str())
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| IndexError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAPPINGS: &str = "\
CL: net/minecraft/client/Minecraft bao
CL: net/minecraft/world/World ahb
FD: net/minecraft/client/Minecraft/thePlayer bao/field_71439_g
FD: net/minecraft/world/World/playerEntities ahb/field_73010_i
MD: net/minecraft/client/Minecraft/getMinecraft ()Lnet/minecraft/client/Minecraft; bao/func_71410_x
MD: net/minecraft/world/World/getPlayerEntityByName (Ljava/lang/String;)Lnet/minecraft/entity/player/EntityPlayer; ahb/func_72924_a
";

    fn index() -> ReferenceIndex {
        let statics = vec!["func_71410_x".to_string()];
        ReferenceIndex::build(MAPPINGS, &statics, &DocTree::default()).unwrap()
    }

    #[test]
    fn obfuscation_heuristic() {
        assert!(is_obfuscated("func_71410_x"));
        assert!(is_obfuscated("field_71439_g"));
        assert!(!is_obfuscated("getMinecraft"));
        assert!(!is_obfuscated("myfunc_1"));
    }

    #[test]
    fn direction_selects_projection() {
        let index = index();

        let by_obf = index.fields_from_name("field_71439_g", true, 1);
        assert_eq!(by_obf[0].deobf_name, "thePlayer");

        let by_name = index.fields_from_name("playerEntities", false, 1);
        assert_eq!(by_name[0].obf_name, "field_73010_i");
    }

    #[test]
    fn lookup_methods_infers_direction() {
        let index = index();
        let found = index.lookup_methods("func_71410_x", None);
        assert_eq!(found[0].deobf_name, "getMinecraft");
        assert!(found[0].is_static);
    }

    #[test]
    fn owner_hint_reorders_results() {
        let index = index();
        let found = index.lookup_fields("player", Some("net/minecraft/world/World"));
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].owner_path, "net/minecraft/world/World");
    }

    #[test]
    fn classes_match_display_name() {
        let index = index();
        let found = index.classes_from_name("World", DEFAULT_LIMIT);
        assert_eq!(found[0].full_path, "net/minecraft/world/World");
    }

    #[test]
    fn failed_build_returns_no_index() {
        let result = ReferenceIndex::build("FD: lonely\n", &[], &DocTree::default());
        assert!(matches!(
            result,
            Err(IndexError::MalformedMappingRecord { .. })
        ));
    }
}
