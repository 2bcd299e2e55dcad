//! # Schema Markdown Parser — Line Classification State Machine
//!
//! Consumes source lines, classifies each against the line grammar, and
//! mutates a growing [`Types`] model. Errors accumulate as positioned
//! diagnostics; a bad line never aborts the scan.
//!
//! ## Sessions
//!
//! All mutable parse state (the model, diagnostics, recorded source
//! positions) is owned by one [`SchemaMarkdownParser`] session, so
//! multiple sessions never interfere. Parsing is re-entrant: each
//! `parse()` call accumulates into the same model, which is how
//! multi-file schemas are compiled. `finalize()` runs the static
//! validator and fails with every diagnostic at once, sorted by
//! (filename, line, message).
//!
//! ## Line grammar
//!
//! Classification priority: doc comment, `group`, `action`, struct/union/
//! enum definition, action section header (inside an action), enum value
//! (inside an enum), struct member (inside a struct), URL line (inside a
//! `urls` section), top-level `typedef`. A trailing backslash joins the
//! next physical line.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use smd_core::{
    Action, ActionUrl, Enum, EnumValue, Struct, StructMember, Typedef, Types, UserType,
};

use crate::check::validate_types;
use crate::diag::{Diagnostic, Diagnostics, ParserError};
use crate::grammar::{parse_type_expression, RE_ID};

static RE_DOC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#(?: (?P<doc>.*))?$").expect("doc grammar"));
static RE_GROUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^group(?:\s+"(?P<group>.+?)")?$"#).expect("group grammar"));
static RE_ACTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^action\s+(?P<id>{RE_ID})$")).expect("action grammar")
});
static RE_DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<kind>struct|union|enum)\s+(?P<id>{RE_ID})\s*(?:\(\s*(?P<bases>{RE_ID}(?:\s*,\s*{RE_ID})*)\s*\))?$"
    ))
    .expect("definition grammar")
});
static RE_SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?P<section>path|query|input|output|errors)\s*(?:\(\s*(?P<bases>{RE_ID}(?:\s*,\s*{RE_ID})*)\s*\))?$"
    ))
    .expect("section grammar")
});
static RE_URLS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^urls$").expect("urls grammar"));
static RE_ENUM_VALUE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"^(?P<id>{RE_ID})$")).expect("value grammar"));
static RE_ENUM_VALUE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^"(?P<id>.*?)"$"#).expect("quoted value grammar"));
static RE_MEMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^(?:(?P<optional>optional)\s+)?(?P<expr>.+?)\s+(?P<id>{RE_ID})$"
    ))
    .expect("member grammar")
});
static RE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<method>[A-Z]+|\*)(?:\s+(?P<path>/\S*))?$").expect("url grammar")
});
static RE_TYPEDEF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^typedef\s+(?P<expr>.+?)\s+(?P<id>{RE_ID})$")).expect("typedef grammar")
});

/// Per-call line state: the construct currently being extended.
#[derive(Default)]
struct ParseState {
    filename: String,
    /// Name of the action whose sections are being defined.
    action: Option<String>,
    /// Whether subsequent lines are URL bindings.
    in_urls: bool,
    /// Name of the struct/enum whose members/values are being defined.
    current: Option<String>,
    /// Buffered doc-comment lines, flushed onto the next construct.
    doc: Vec<String>,
    /// Current documentation group.
    doc_group: Option<String>,
}

/// A Schema Markdown parser session.
///
/// Owns the growing type model, the accumulated diagnostics, and the
/// recorded source position of every defined type, member, and enum
/// value (used to position static-validation issues).
#[derive(Default)]
pub struct SchemaMarkdownParser {
    types: Types,
    diagnostics: Vec<Diagnostic>,
    positions: HashMap<(String, Option<String>), (String, usize)>,
}

impl SchemaMarkdownParser {
    /// Create an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The model accumulated so far.
    pub fn types(&self) -> &Types {
        &self.types
    }

    /// Consume the session, returning the model.
    pub fn into_types(self) -> Types {
        self.types
    }

    /// Parse-time diagnostics accumulated so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Parse a schema text, accumulating into the session model.
    ///
    /// `filename` tags diagnostics (empty is fine). With `finalize` set,
    /// runs [`SchemaMarkdownParser::finalize`] after the scan.
    pub fn parse(&mut self, text: &str, filename: &str, finalize: bool) -> Result<(), ParserError> {
        self.parse_lines(text.split('\n'), filename, finalize)
    }

    /// Parse a sequence of source lines (see [`SchemaMarkdownParser::parse`]).
    pub fn parse_lines<'a, I>(
        &mut self,
        lines: I,
        filename: &str,
        finalize: bool,
    ) -> Result<(), ParserError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut state = ParseState {
            filename: filename.to_string(),
            ..Default::default()
        };

        // Line-continuation buffer: a trailing backslash joins the next
        // physical line after stripping the backslash and trailing space.
        let mut joined = String::new();
        let mut last_line = 0usize;
        for (index, raw) in lines.into_iter().enumerate() {
            last_line = index + 1;
            let trimmed_end = raw.trim_end();
            if let Some(stripped) = trimmed_end.strip_suffix('\\') {
                joined.push_str(stripped.trim_end());
                continue;
            }
            joined.push_str(raw);
            let line = std::mem::take(&mut joined);
            self.process_line(&mut state, &line, last_line);
        }
        if !joined.is_empty() {
            let line = std::mem::take(&mut joined);
            self.process_line(&mut state, &line, last_line);
        }

        if finalize {
            self.finalize()
        } else {
            Ok(())
        }
    }

    /// Run the static validator over the accumulated model, merge its
    /// issues (positioned via the recorded locations) with parse-time
    /// diagnostics, and fail with the sorted, deduplicated set if any.
    pub fn finalize(&mut self) -> Result<(), ParserError> {
        let mut diagnostics = self.diagnostics.clone();
        for issue in validate_types(&self.types) {
            let key = (issue.type_name.clone(), issue.member.clone());
            let fallback = (issue.type_name.clone(), None);
            let (filename, line) = self
                .positions
                .get(&key)
                .or_else(|| self.positions.get(&fallback))
                .cloned()
                .unwrap_or_else(|| (String::new(), 1));
            diagnostics.push(Diagnostic {
                filename,
                line,
                message: issue.message,
            });
        }
        let diagnostics = Diagnostics::from_unsorted(diagnostics);
        if diagnostics.is_empty() {
            Ok(())
        } else {
            Err(ParserError { diagnostics })
        }
    }

    // ─── Line classification ─────────────────────────────────────────

    fn process_line(&mut self, state: &mut ParseState, raw: &str, linenum: usize) {
        let line = raw.trim();

        // Blank lines and non-doc comments produce nothing.
        if line.is_empty() || line.starts_with("#-") {
            return;
        }
        if let Some(caps) = RE_DOC.captures(line) {
            state
                .doc
                .push(caps.name("doc").map(|m| m.as_str()).unwrap_or("").to_string());
            return;
        }
        if let Some(caps) = RE_GROUP.captures(line) {
            state.doc_group = caps.name("group").map(|m| m.as_str().to_string());
            return;
        }
        if let Some(caps) = RE_ACTION.captures(line) {
            self.define_action(state, &caps["id"], linenum);
            return;
        }
        if let Some(caps) = RE_DEFINITION.captures(line) {
            self.define_struct_or_enum(state, caps, linenum);
            return;
        }
        if state.action.is_some() {
            if let Some(caps) = RE_SECTION.captures(line) {
                self.define_action_section(state, caps, linenum);
                return;
            }
            if RE_URLS_HEADER.is_match(line) {
                state.in_urls = true;
                state.current = None;
                return;
            }
        }
        if self.current_enum(state).is_some() {
            let value = RE_ENUM_VALUE
                .captures(line)
                .or_else(|| RE_ENUM_VALUE_QUOTED.captures(line));
            if let Some(caps) = value {
                self.add_enum_value(state, &caps["id"], linenum);
                return;
            }
        }
        if self.current_struct(state).is_some() {
            if let Some(caps) = RE_MEMBER.captures(line) {
                if let Some((ty, attr)) = parse_type_expression(&caps["expr"]) {
                    let member = StructMember {
                        name: caps["id"].to_string(),
                        doc: std::mem::take(&mut state.doc),
                        ty,
                        attr,
                        optional: caps.name("optional").is_some(),
                    };
                    self.add_struct_member(state, member, linenum);
                    return;
                }
            }
        }
        if state.in_urls {
            if let Some(caps) = RE_URL.captures(line) {
                self.add_action_url(state, caps, linenum);
                return;
            }
        }
        if let Some(caps) = RE_TYPEDEF.captures(line) {
            if let Some((ty, attr)) = parse_type_expression(&caps["expr"]) {
                let typedef = Typedef {
                    name: caps["id"].to_string(),
                    doc: std::mem::take(&mut state.doc),
                    doc_group: state.doc_group.clone(),
                    ty,
                    attr,
                };
                self.define_type(state, UserType::Typedef(typedef), linenum);
                state.current = None;
                state.action = None;
                state.in_urls = false;
                return;
            }
        }

        self.error(state, linenum, "Syntax error".to_string());
    }

    // ─── Construct handlers ──────────────────────────────────────────

    fn define_action(&mut self, state: &mut ParseState, name: &str, linenum: usize) {
        let action = Action {
            name: name.to_string(),
            doc: std::mem::take(&mut state.doc),
            doc_group: state.doc_group.clone(),
            urls: Vec::new(),
            path: None,
            query: None,
            input: None,
            output: None,
            errors: None,
        };
        self.define_type(state, UserType::Action(action), linenum);
        state.action = Some(name.to_string());
        state.current = None;
        state.in_urls = false;
    }

    fn define_struct_or_enum(
        &mut self,
        state: &mut ParseState,
        caps: regex::Captures<'_>,
        linenum: usize,
    ) {
        let name = caps["id"].to_string();
        let bases = split_bases(caps.name("bases").map(|m| m.as_str()));
        let doc = std::mem::take(&mut state.doc);
        let user_type = match &caps["kind"] {
            "enum" => UserType::Enum(Enum {
                name: name.clone(),
                doc,
                doc_group: state.doc_group.clone(),
                bases,
                values: Vec::new(),
            }),
            kind => UserType::Struct(Struct {
                name: name.clone(),
                doc,
                doc_group: state.doc_group.clone(),
                bases,
                union: kind == "union",
                members: Vec::new(),
            }),
        };
        self.define_type(state, user_type, linenum);
        state.current = Some(name);
        state.action = None;
        state.in_urls = false;
    }

    fn define_action_section(
        &mut self,
        state: &mut ParseState,
        caps: regex::Captures<'_>,
        linenum: usize,
    ) {
        let Some(action_name) = state.action.clone() else {
            return;
        };
        let section = caps["section"].to_string();
        let backing = format!("{action_name}_{section}");
        let bases = split_bases(caps.name("bases").map(|m| m.as_str()));
        let doc = std::mem::take(&mut state.doc);

        // Bind the section on the action, reporting re-binding.
        let mut rebound = false;
        if let Some(UserType::Action(action)) = self.types.get_mut(&action_name) {
            let slot = match section.as_str() {
                "path" => &mut action.path,
                "query" => &mut action.query,
                "input" => &mut action.input,
                "output" => &mut action.output,
                _ => &mut action.errors,
            };
            rebound = slot.replace(backing.clone()).is_some();
        }
        if rebound {
            self.diagnostics.push(Diagnostic {
                filename: state.filename.clone(),
                line: linenum,
                message: format!("Redefinition of action {section}"),
            });
        }

        // The backing user type: structs for parameter/body sections, an
        // enum for error codes.
        let user_type = if section == "errors" {
            UserType::Enum(Enum {
                name: backing.clone(),
                doc,
                doc_group: None,
                bases,
                values: Vec::new(),
            })
        } else {
            UserType::Struct(Struct {
                name: backing.clone(),
                doc,
                doc_group: None,
                bases,
                union: false,
                members: Vec::new(),
            })
        };
        self.define_type(state, user_type, linenum);
        state.current = Some(backing);
        state.in_urls = false;
    }

    fn add_enum_value(&mut self, state: &mut ParseState, value: &str, linenum: usize) {
        let doc = std::mem::take(&mut state.doc);
        let Some(current) = state.current.clone() else {
            return;
        };
        if let Some(UserType::Enum(en)) = self.types.get_mut(&current) {
            en.values.push(EnumValue {
                name: value.to_string(),
                doc,
            });
            self.record_position(state, current, Some(value.to_string()), linenum);
        }
    }

    fn add_struct_member(&mut self, state: &mut ParseState, member: StructMember, linenum: usize) {
        let Some(current) = state.current.clone() else {
            return;
        };
        let member_name = member.name.clone();
        if let Some(UserType::Struct(st)) = self.types.get_mut(&current) {
            st.members.push(member);
            self.record_position(state, current, Some(member_name), linenum);
        }
    }

    fn add_action_url(&mut self, state: &mut ParseState, caps: regex::Captures<'_>, linenum: usize) {
        let Some(action_name) = state.action.clone() else {
            return;
        };
        let method = match &caps["method"] {
            "*" => None,
            m => Some(m.to_string()),
        };
        let path = caps.name("path").map(|m| m.as_str().to_string());
        let url = ActionUrl { method, path };
        if let Some(UserType::Action(action)) = self.types.get_mut(&action_name) {
            if action.urls.contains(&url) {
                let rendered = match &url.path {
                    Some(p) => format!("{} {p}", url.method.as_deref().unwrap_or("*")),
                    None => url.method.as_deref().unwrap_or("*").to_string(),
                };
                self.diagnostics.push(Diagnostic {
                    filename: state.filename.clone(),
                    line: linenum,
                    message: format!("Duplicate URL: {rendered}"),
                });
            } else {
                action.urls.push(url);
            }
        }
    }

    // ─── Helpers ─────────────────────────────────────────────────────

    fn define_type(&mut self, state: &mut ParseState, user_type: UserType, linenum: usize) {
        let name = user_type.name().to_string();
        if self.types.contains_key(&name) {
            self.error(state, linenum, format!("Redefinition of type '{name}'"));
        }
        self.record_position(state, name.clone(), None, linenum);
        self.types.insert(name, user_type);
    }

    fn record_position(
        &mut self,
        state: &ParseState,
        type_name: String,
        member: Option<String>,
        linenum: usize,
    ) {
        self.positions
            .insert((type_name, member), (state.filename.clone(), linenum));
    }

    fn error(&mut self, state: &ParseState, linenum: usize, message: String) {
        self.diagnostics.push(Diagnostic {
            filename: state.filename.clone(),
            line: linenum,
            message,
        });
    }

    fn current_enum(&self, state: &ParseState) -> Option<&Enum> {
        match state.current.as_ref().and_then(|n| self.types.get(n)) {
            Some(UserType::Enum(en)) => Some(en),
            _ => None,
        }
    }

    fn current_struct(&self, state: &ParseState) -> Option<&Struct> {
        match state.current.as_ref().and_then(|n| self.types.get(n)) {
            Some(UserType::Struct(st)) => Some(st),
            _ => None,
        }
    }
}

fn split_bases(bases: Option<&str>) -> Vec<String> {
    bases
        .map(|b| b.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or_default()
}

/// Parse and finalize a single schema text.
pub fn parse_schema_markdown(text: &str) -> Result<Types, ParserError> {
    let mut parser = SchemaMarkdownParser::new();
    parser.parse(text, "", true)?;
    Ok(parser.into_types())
}
