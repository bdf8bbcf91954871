//! Language profiles and the entity-kind table.
//!
//! A [`LanguageProfile`] is plain immutable data: comment symbols, prototype
//! enders per entity kind, and a handful of switches. The extraction stages
//! read it and never modify it, so one profile can be shared across worker
//! threads.

use crate::error::{ProfileError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// -- Entity kinds -------------------------------------------------------------

/// How an entity of a given kind affects the running scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    #[default]
    Normal,
    Start,
    End,
    AlwaysGlobal,
}

/// Where enum members are placed in the symbol tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumPlacement {
    Global,
    #[default]
    UnderType,
    UnderParent,
}

/// A kind of documented entity (function, class, enumeration, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityKind {
    pub name: String,
    /// Header keywords that introduce this kind in a comment, lowercase.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default, rename = "enum")]
    pub is_enum: bool,
    /// Class hierarchy this kind opens, e.g. `class` or `database`.
    #[serde(default)]
    pub hierarchy: Option<String>,
}

impl EntityKind {
    fn new(name: &str, keywords: &[&str], scope: Scope) -> Self {
        EntityKind {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            scope,
            is_enum: false,
            hierarchy: None,
        }
    }

    fn with_hierarchy(mut self, hierarchy: &str) -> Self {
        self.hierarchy = Some(hierarchy.to_string());
        self
    }

    fn as_enum(mut self) -> Self {
        self.is_enum = true;
        self
    }
}

/// All entity kinds known to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindTable {
    kinds: Vec<EntityKind>,
}

impl Default for KindTable {
    fn default() -> Self {
        use Scope::*;
        KindTable {
            kinds: vec![
                EntityKind::new("file", &["file", "program", "script"], AlwaysGlobal),
                EntityKind::new("group", &["group"], Normal),
                EntityKind::new("section", &["section", "title"], End),
                EntityKind::new("class", &["class", "structure", "struct", "package"], Start)
                    .with_hierarchy("class"),
                EntityKind::new("interface", &["interface"], Start).with_hierarchy("class"),
                EntityKind::new("namespace", &["namespace", "module"], Start),
                EntityKind::new("function", &["function", "func", "method", "procedure", "routine", "constructor", "destructor", "operator"], Normal),
                EntityKind::new("variable", &["variable", "var", "field", "member"], Normal),
                EntityKind::new("property", &["property", "prop"], Normal),
                EntityKind::new("constant", &["constant", "const"], Normal),
                EntityKind::new("type", &["type", "typedef"], Normal),
                EntityKind::new("enumeration", &["enumeration", "enum"], Normal).as_enum(),
                EntityKind::new("macro", &["macro", "define"], AlwaysGlobal),
            ],
        }
    }
}

impl KindTable {
    pub fn new(kinds: Vec<EntityKind>) -> Self {
        KindTable { kinds }
    }

    pub fn get(&self, name: &str) -> Option<&EntityKind> {
        self.kinds.iter().find(|k| k.name.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Kind introduced by a header keyword. A trailing `s` is accepted as a plural.
    pub fn by_keyword(&self, keyword: &str) -> Option<&EntityKind> {
        let keyword = keyword.to_ascii_lowercase();
        let singular = keyword.strip_suffix('s');
        self.kinds.iter().find(|k| {
            k.keywords
                .iter()
                .any(|kw| *kw == keyword || Some(kw.as_str()) == singular)
        })
    }

    /// Add `kind`, replacing any existing kind with the same name.
    pub fn insert(&mut self, kind: EntityKind) {
        match self.kinds.iter_mut().find(|k| k.name.eq_ignore_ascii_case(&kind.name)) {
            Some(existing) => *existing = kind,
            None => self.kinds.push(kind),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityKind> {
        self.kinds.iter()
    }

    pub fn validate(&self) -> Result<()> {
        for kind in &self.kinds {
            if kind.hierarchy.is_some() && kind.scope != Scope::Start {
                return Err(ProfileError::HierarchyWithoutScope {
                    kind: kind.name.clone(),
                });
            }
        }
        Ok(())
    }
}

// -- Comment symbols ----------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockCommentSymbols {
    pub open: String,
    pub close: String,
}

impl BlockCommentSymbols {
    pub fn new(open: &str, close: &str) -> Self {
        BlockCommentSymbols {
            open: open.to_string(),
            close: close.to_string(),
        }
    }
}

/// Line comment whose first line uses a different symbol than the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCommentPair {
    pub first: String,
    pub following: String,
}

// -- Prototype enders ---------------------------------------------------------

/// What ends a prototype for one entity kind.
///
/// In configuration this is written as a list of strings; the entry `"\n"`
/// means a line break ends the prototype.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PrototypeEnders {
    pub symbols: Vec<String>,
    pub include_line_breaks: bool,
}

impl From<Vec<String>> for PrototypeEnders {
    fn from(list: Vec<String>) -> Self {
        let mut enders = PrototypeEnders::default();
        for entry in list {
            if entry == "\n" || entry == "\\n" {
                enders.include_line_breaks = true;
            } else if !entry.is_empty() {
                enders.symbols.push(entry);
            }
        }
        enders
    }
}

impl From<PrototypeEnders> for Vec<String> {
    fn from(enders: PrototypeEnders) -> Self {
        let mut list = enders.symbols;
        if enders.include_line_breaks {
            list.push("\n".to_string());
        }
        list
    }
}

impl PrototypeEnders {
    pub fn new(list: &[&str]) -> Self {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into()
    }
}

// -- Language profile ---------------------------------------------------------

/// How much the extraction pipeline can do for a language on its own.
///
/// Full grammar support is not declared here; a [`crate::pipeline::FullParser`]
/// is attached to a pipeline at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileSupport {
    #[default]
    Basic,
    TextOnly,
    Container,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LanguageProfile {
    pub name: String,
    pub extensions: Vec<String>,
    pub support: ProfileSupport,
    pub line_comments: Vec<String>,
    pub block_comments: Vec<BlockCommentSymbols>,
    pub javadoc_line_comments: Vec<LineCommentPair>,
    pub javadoc_block_comments: Vec<BlockCommentSymbols>,
    pub xml_line_comments: Vec<String>,
    pub block_comments_nest: bool,
    pub member_operator: String,
    pub line_extender: Option<String>,
    pub case_sensitive: bool,
    pub enum_values: EnumPlacement,
    /// Keyed by entity kind name.
    pub prototype_enders: BTreeMap<String, PrototypeEnders>,
    /// Built-in type names, used to tell linkable types from primitives.
    pub type_keywords: BTreeSet<String>,
}

impl Default for LanguageProfile {
    fn default() -> Self {
        LanguageProfile {
            name: String::new(),
            extensions: Vec::new(),
            support: ProfileSupport::Basic,
            line_comments: Vec::new(),
            block_comments: Vec::new(),
            javadoc_line_comments: Vec::new(),
            javadoc_block_comments: Vec::new(),
            xml_line_comments: Vec::new(),
            block_comments_nest: false,
            member_operator: ".".to_string(),
            line_extender: None,
            case_sensitive: true,
            enum_values: EnumPlacement::UnderType,
            prototype_enders: BTreeMap::new(),
            type_keywords: default_type_keywords(),
        }
    }
}

const TYPE_KEYWORDS: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "signed", "unsigned", "integer", "long", "ulong", "short", "ushort", "real", "float",
    "double", "decimal", "float32", "float64", "float80", "void", "char", "string", "wchar",
    "wchar_t", "byte", "ubyte", "sbyte", "bool", "boolean",
];

pub fn default_type_keywords() -> BTreeSet<String> {
    TYPE_KEYWORDS.iter().map(|s| s.to_string()).collect()
}

impl LanguageProfile {
    pub fn new(name: &str) -> Self {
        LanguageProfile {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Prototype enders for `kind`, if the language extracts prototypes for it.
    pub fn enders_for(&self, kind: &str) -> Option<&PrototypeEnders> {
        self.prototype_enders
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(kind))
            .map(|(_, enders)| enders)
    }

    pub fn is_builtin_type(&self, word: &str) -> bool {
        self.type_keywords.contains(word)
            || (!self.case_sensitive && self.type_keywords.contains(&word.to_ascii_lowercase()))
    }

    /// Fill in Javadoc and XML comment symbols the profile does not set itself.
    ///
    /// `/* */` gains `/** */`, `//` gains the `///` + `//` Javadoc pair and the
    /// `///` XML form, and a one-character symbol like `'` becomes `'''`.
    pub fn derive_comment_symbols(&mut self) {
        if self.javadoc_block_comments.is_empty() {
            self.javadoc_block_comments = self
                .block_comments
                .iter()
                .filter(|b| {
                    b.open.len() == 2
                        && b.close.len() == 2
                        && b.open.ends_with('*')
                        && b.close.starts_with('*')
                })
                .map(|b| BlockCommentSymbols::new(&format!("{}*", b.open), &b.close))
                .collect();
        }

        if self.javadoc_line_comments.is_empty() {
            self.javadoc_line_comments = self
                .line_comments
                .iter()
                .filter_map(|l| {
                    let last = l.chars().last()?;
                    Some(LineCommentPair {
                        first: format!("{}{}", l, last),
                        following: l.clone(),
                    })
                })
                .collect();
        }

        if self.xml_line_comments.is_empty() {
            self.xml_line_comments = self
                .line_comments
                .iter()
                .filter_map(|l| {
                    let last = l.chars().last()?;
                    Some(if l.chars().count() == 1 {
                        format!("{0}{0}{0}", l)
                    } else {
                        format!("{}{}", l, last)
                    })
                })
                .collect();
        }
    }

    /// Check the profile against the kinds it will be used with.
    pub fn validate(&self, kinds: &KindTable) -> Result<()> {
        let empty_block = self
            .block_comments
            .iter()
            .chain(&self.javadoc_block_comments)
            .any(|b| b.open.is_empty() || b.close.is_empty());
        if empty_block {
            return Err(ProfileError::EmptyCommentSymbol {
                language: self.name.clone(),
            });
        }

        for kind in self.prototype_enders.keys() {
            if !kinds.contains(kind) {
                return Err(ProfileError::UnknownEnderKind {
                    language: self.name.clone(),
                    kind: kind.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn handles_extension(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }
}

// -- Built-in profiles --------------------------------------------------------

fn enders(pairs: &[(&str, &[&str])]) -> BTreeMap<String, PrototypeEnders> {
    pairs
        .iter()
        .map(|(kind, list)| (kind.to_string(), PrototypeEnders::new(list)))
        .collect()
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Languages available without a configuration file.
pub fn builtin_profiles() -> Vec<LanguageProfile> {
    let mut profiles = vec![
        LanguageProfile {
            name: "c".to_string(),
            extensions: strings(&[
                "c", "h", "cpp", "hpp", "cc", "cxx", "cs", "java", "js", "ts", "go", "rs", "swift",
                "kt", "scala",
            ]),
            line_comments: strings(&["//"]),
            block_comments: vec![BlockCommentSymbols::new("/*", "*/")],
            xml_line_comments: strings(&["///"]),
            prototype_enders: enders(&[
                ("function", &[";", "{"]),
                ("variable", &[";", "=", "{"]),
                ("property", &[";", "{"]),
                ("constant", &[";", "=", ","]),
                ("type", &[";", "{"]),
                ("class", &[";", "{"]),
                ("interface", &[";", "{"]),
                ("enumeration", &[";", "{"]),
                ("macro", &["\n"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "pascal".to_string(),
            extensions: strings(&["pas", "pp", "dpr", "inc"]),
            line_comments: strings(&["//"]),
            block_comments: vec![
                BlockCommentSymbols::new("(*", "*)"),
                BlockCommentSymbols::new("{", "}"),
            ],
            case_sensitive: false,
            prototype_enders: enders(&[
                ("function", &[";"]),
                ("variable", &[";", "="]),
                ("property", &[";"]),
                ("constant", &[";"]),
                ("type", &[";", "="]),
                ("class", &[";", "="]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "python".to_string(),
            extensions: strings(&["py", "pyw"]),
            line_comments: strings(&["#"]),
            enum_values: EnumPlacement::UnderType,
            prototype_enders: enders(&[
                ("function", &[":"]),
                ("class", &[":"]),
                ("variable", &["=", "\n"]),
                ("constant", &["=", "\n"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "perl".to_string(),
            extensions: strings(&["pl", "pm"]),
            line_comments: strings(&["#"]),
            member_operator: "::".to_string(),
            enum_values: EnumPlacement::Global,
            prototype_enders: enders(&[
                ("function", &[";", "{"]),
                ("variable", &[";", "="]),
                ("class", &[";", "{"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "shell".to_string(),
            extensions: strings(&["sh", "bash", "zsh"]),
            line_comments: strings(&["#"]),
            line_extender: Some("\\".to_string()),
            prototype_enders: enders(&[
                ("function", &["{", "\n"]),
                ("variable", &["=", "\n"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "sql".to_string(),
            extensions: strings(&["sql"]),
            line_comments: strings(&["--"]),
            block_comments: vec![BlockCommentSymbols::new("/*", "*/")],
            case_sensitive: false,
            enum_values: EnumPlacement::Global,
            prototype_enders: enders(&[
                ("function", &[";", "as", "is", "begin"]),
                ("variable", &[";", ",", ")", ":=", "default"]),
                ("class", &[";", "("]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "lua".to_string(),
            extensions: strings(&["lua"]),
            line_comments: strings(&["--"]),
            block_comments: vec![BlockCommentSymbols::new("--[[", "]]")],
            prototype_enders: enders(&[
                ("function", &["end", "\n"]),
                ("variable", &["=", "\n"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "visualbasic".to_string(),
            extensions: strings(&["vb", "vbs", "bas"]),
            line_comments: strings(&["'"]),
            line_extender: Some("_".to_string()),
            case_sensitive: false,
            enum_values: EnumPlacement::UnderType,
            prototype_enders: enders(&[
                ("function", &["\n"]),
                ("variable", &["=", "\n"]),
                ("property", &["\n"]),
                ("class", &["\n"]),
                ("enumeration", &["\n"]),
            ]),
            ..Default::default()
        },
        LanguageProfile {
            name: "text".to_string(),
            extensions: strings(&["txt", "text"]),
            support: ProfileSupport::TextOnly,
            ..Default::default()
        },
        LanguageProfile {
            name: "container".to_string(),
            extensions: strings(&["cgi"]),
            support: ProfileSupport::Container,
            ..Default::default()
        },
    ];

    for profile in &mut profiles {
        if profile.support == ProfileSupport::Basic {
            profile.derive_comment_symbols();
        }
    }
    profiles
}
