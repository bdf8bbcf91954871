//! Prototype token classifier.
//!
//! Tags every token of a normalized prototype with its role. Parameters are
//! delimited first, then each is read as a sequence of "words" (type or
//! variable names, comments, strings and bracket blocks) and the words are
//! assigned from the right:
//!
//! - C style: `[modifier]* [type] name`
//! - Pascal style: `[modifier]* name : [modifier]* type`
//!
//! A parameter list is Pascal style if any of its parameters has a top-level
//! colon, since `const a, b: string` only reveals itself at the second one.

use crate::profile::LanguageProfile;
use crate::syntax::Syntax;
use crate::tokens::{Cursor, FundamentalKind, PrototypeTag, PrototypeTags, TokenBuffer};
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStyle {
    C,
    Pascal,
}

/// A prototype split into tagged tokens.
#[derive(Debug, Clone)]
pub struct ParsedPrototype {
    buffer: TokenBuffer,
    tags: PrototypeTags,
    style: Option<ParameterStyle>,
    /// `[start, end)` token indexes of each parameter, whitespace trimmed.
    parameters: Vec<(usize, usize)>,
    /// Token indexes of the parameter list brackets.
    params: Option<(usize, usize)>,
}

impl ParsedPrototype {
    pub fn text(&self) -> &str {
        self.buffer.text()
    }

    pub fn style(&self) -> Option<ParameterStyle> {
        self.style
    }

    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    pub fn parameter_bounds(&self, index: usize) -> Option<(Cursor<'_>, Cursor<'_>)> {
        let &(start, end) = self.parameters.get(index)?;
        Some((self.buffer.cursor_at(start), self.buffer.cursor_at(end)))
    }

    pub fn tag(&self, at: Cursor<'_>) -> PrototypeTag {
        self.tags.get(at)
    }

    /// Every token paired with its tag, for rendering and inspection.
    pub fn tagged_tokens(&self) -> Vec<(&str, PrototypeTag)> {
        (0..self.buffer.token_count())
            .map(|i| (self.buffer.cursor_at(i).text(), self.tags.get_index(i)))
            .collect()
    }

    /// Text of each maximal run of tokens carrying `tag`.
    pub fn tokens_with_tag(&self, tag: PrototypeTag) -> Vec<String> {
        let mut runs = Vec::new();
        let mut current = String::new();
        for i in 0..self.buffer.token_count() {
            if self.tags.get_index(i) == tag {
                current.push_str(self.buffer.cursor_at(i).text());
            } else if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
        }
        if !current.is_empty() {
            runs.push(current);
        }
        runs
    }

    pub fn parameter_name(&self, index: usize) -> Option<String> {
        let (start, end) = self.parameter_bounds(index)?;
        collect(&self.tags, start, end, |t| t == PrototypeTag::Name)
    }

    /// Full type of a parameter, including modifiers, suffixes and pointer prefixes.
    pub fn parameter_type(&self, index: usize) -> Option<String> {
        let (mut start, end) = self.parameter_bounds(index)?;
        // Modifiers before a Pascal colon belong to the parameter, not the type.
        let mut cursor = start;
        while cursor < end {
            if self.tags.get(cursor) == PrototypeTag::NameTypeSeparator {
                start = cursor.next();
                break;
            }
            cursor = cursor.next();
        }
        type_text(&self.tags, start, end)
    }

    pub fn parameter_default(&self, index: usize) -> Option<String> {
        let (start, end) = self.parameter_bounds(index)?;
        collect(&self.tags, start, end, |t| t == PrototypeTag::DefaultValue)
    }

    /// Cursors around the part before the parameter list, or the whole
    /// prototype if it has none.
    fn before_parameters(&self) -> (Cursor<'_>, Cursor<'_>) {
        let end = match self.params {
            Some((open, _)) => self.buffer.cursor_at(open),
            None => self.buffer.end(),
        };
        (self.buffer.first_token(), end)
    }

    /// Name of the declared entity.
    pub fn name(&self) -> Option<String> {
        let (start, end) = self.before_parameters();
        collect(&self.tags, start, end, |t| t == PrototypeTag::Name)
    }

    /// Return or declared type: the type after a Pascal `):`, otherwise the
    /// type before the name.
    pub fn return_type(&self) -> Option<String> {
        if let Some((_, close)) = self.params {
            let after = self.buffer.cursor_at(close + 1);
            if let Some(found) = type_text(&self.tags, after, self.buffer.end()) {
                return Some(found);
            }
        }
        let (start, end) = self.before_parameters();
        type_text(&self.tags, start, end)
    }

    /// Type names worth linking: every type word that is not a built-in.
    pub fn linkable_types(&self, profile: &LanguageProfile) -> Vec<String> {
        let mut out = Vec::new();
        let mut current = String::new();
        for i in 0..=self.buffer.token_count() {
            let tag = self.tags.get_index(i);
            if i < self.buffer.token_count()
                && matches!(tag, PrototypeTag::TypeQualifier | PrototypeTag::Type)
            {
                current.push_str(self.buffer.cursor_at(i).text());
                if tag == PrototypeTag::TypeQualifier {
                    continue;
                }
                // Only finish the run once the type word itself ends.
                if self.tags.get_index(i + 1) == PrototypeTag::Type {
                    continue;
                }
            }
            if !current.is_empty() {
                if !profile.is_builtin_type(&current) && !out.contains(&current) {
                    out.push(current.clone());
                }
                current.clear();
            }
        }
        out
    }
}

impl Serialize for ParsedPrototype {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(serde::Serialize)]
        struct Parameter {
            name: Option<String>,
            #[serde(rename = "type")]
            type_text: Option<String>,
            default: Option<String>,
        }

        let parameters: Vec<Parameter> = (0..self.parameter_count())
            .map(|i| Parameter {
                name: self.parameter_name(i),
                type_text: self.parameter_type(i),
                default: self.parameter_default(i),
            })
            .collect();

        let mut state = serializer.serialize_struct("ParsedPrototype", 4)?;
        state.serialize_field("name", &self.name())?;
        state.serialize_field("return_type", &self.return_type())?;
        state.serialize_field("style", &self.style)?;
        state.serialize_field("parameters", &parameters)?;
        state.end()
    }
}

fn is_type_tag(tag: PrototypeTag) -> bool {
    matches!(
        tag,
        PrototypeTag::Modifier
            | PrototypeTag::OpeningModifier
            | PrototypeTag::ClosingModifier
            | PrototypeTag::TypeQualifier
            | PrototypeTag::Type
            | PrototypeTag::TypeSuffix
            | PrototypeTag::OpeningTypeSuffix
            | PrototypeTag::ClosingTypeSuffix
            | PrototypeTag::NamePrefix
    )
}

/// Concatenate tokens whose tag passes `keep`, with single spaces where the
/// source had whitespace between kept tokens.
fn collect(
    tags: &PrototypeTags,
    start: Cursor<'_>,
    end: Cursor<'_>,
    keep: impl Fn(PrototypeTag) -> bool,
) -> Option<String> {
    let mut out = String::new();
    let mut pending_space = false;
    let mut cursor = start;
    while cursor < end {
        if keep(tags.get(cursor)) {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push_str(cursor.text());
        } else if cursor.kind() == FundamentalKind::Whitespace {
            pending_space = true;
        } else if !out.is_empty() && !matches!(tags.get(cursor), PrototypeTag::Null) {
            // A token with some other role ends the run.
            break;
        }
        cursor = cursor.next();
    }
    (!out.is_empty()).then_some(out)
}

/// Type text between `start` and `end`, keeping everything inside suffix
/// blocks so `Dictionary<Key, List<Value>>` comes back whole.
fn type_text(tags: &PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) -> Option<String> {
    let mut out = String::new();
    let mut pending_space = false;
    let mut depth = 0usize;
    let mut cursor = start;
    while cursor < end {
        let tag = tags.get(cursor);
        match tag {
            PrototypeTag::OpeningTypeSuffix | PrototypeTag::OpeningModifier => depth += 1,
            PrototypeTag::ClosingTypeSuffix | PrototypeTag::ClosingModifier => {
                depth = depth.saturating_sub(1)
            }
            _ => {}
        }
        let is_space = cursor.kind() == FundamentalKind::Whitespace;
        let closing = matches!(tag, PrototypeTag::ClosingTypeSuffix | PrototypeTag::ClosingModifier);
        if depth > 0 || closing || is_type_tag(tag) {
            if is_space {
                pending_space = true;
            } else {
                if pending_space && !out.is_empty() {
                    out.push(' ');
                }
                pending_space = false;
                out.push_str(cursor.text());
            }
        } else if is_space {
            pending_space = true;
        }
        cursor = cursor.next();
    }
    let out = out.trim().to_string();
    (!out.is_empty()).then_some(out)
}

// -- Parsing ------------------------------------------------------------------

/// Tokenize and classify a normalized prototype.
pub fn parse_prototype(prototype: &str, profile: &LanguageProfile) -> ParsedPrototype {
    let buffer = TokenBuffer::new(prototype);
    let mut tags = PrototypeTags::new(&buffer);
    let syntax = Syntax::new(profile);
    let marker = Marker { syntax };

    let (style, parameters, params) = {
        let end = buffer.end();
        match find_parameter_list(&buffer, &mut tags, &syntax) {
            Some((open, close)) => {
                let ranges = parameter_ranges(&buffer, &tags, open, close);
                let style = if ranges.is_empty() {
                    None
                } else if ranges.iter().any(|&(s, e)| {
                    marker.detect_style(buffer.cursor_at(s), buffer.cursor_at(e)) == ParameterStyle::Pascal
                }) {
                    Some(ParameterStyle::Pascal)
                } else {
                    Some(ParameterStyle::C)
                };

                for &(s, e) in &ranges {
                    let (s, e) = (buffer.cursor_at(s), buffer.cursor_at(e));
                    match style {
                        Some(ParameterStyle::Pascal) => marker.mark_pascal_parameter(&mut tags, s, e),
                        _ => marker.mark_c_parameter(&mut tags, s, e),
                    }
                }

                // A colon right after the list means a Pascal return type.
                let close_cursor = buffer.cursor_at(close);
                let after = close_cursor.next().next_past_whitespace(end);
                if after < end && after.is_char(':') {
                    let type_start = after.next().next_past_whitespace(end);
                    if type_start < end {
                        marker.mark_type_and_modifiers(&mut tags, type_start, end);
                    }
                    let start = buffer.first_token();
                    let before = buffer.cursor_at(open).previous_past_whitespace(start);
                    if start < before {
                        marker.mark_name_and_modifiers(&mut tags, start, before);
                    }
                } else {
                    let start = buffer.first_token();
                    let before = buffer.cursor_at(open).previous_past_whitespace(start);
                    if start < before {
                        marker.mark_c_parameter(&mut tags, start, before);
                    }
                }
                (style, ranges, Some((open, close)))
            }
            // No brackets: a variable, property or class, read as one parameter.
            None => {
                let style = marker.mark_parameter(&mut tags, buffer.first_token(), end);
                (Some(style), Vec::new(), None)
            }
        }
    };

    ParsedPrototype {
        buffer,
        tags,
        style,
        parameters,
        params,
    }
}

/// Classify a single parameter or member declaration such as `const char *name`
/// or `count: integer`, without looking for a parameter list.
pub fn classify_parameter(declaration: &str, profile: &LanguageProfile) -> ParsedPrototype {
    let buffer = TokenBuffer::new(declaration);
    let mut tags = PrototypeTags::new(&buffer);
    let marker = Marker {
        syntax: Syntax::new(profile),
    };
    let start = buffer.first_token().next_past_whitespace(buffer.end());
    let end = buffer.end().previous_past_whitespace(start);
    let style = marker.mark_parameter(&mut tags, start, end);
    let range = (start.index(), end.index());
    ParsedPrototype {
        buffer,
        tags,
        style: Some(style),
        parameters: vec![range],
        params: None,
    }
}

/// Find and tag the parameter list: the first `(`, a `[` directly after
/// `this` (an indexer), or the first `{`. Returns the bracket token indexes.
fn find_parameter_list(
    buf: &TokenBuffer,
    tags: &mut PrototypeTags,
    syntax: &Syntax<'_>,
) -> Option<(usize, usize)> {
    let mut cursor = buf.first_token();
    let closing = loop {
        if !cursor.in_bounds() {
            return None;
        }
        // Comments first: Pascal comments open with `(*` and `{`.
        if let Some(after) = syntax.skip_comment(cursor).or_else(|| syntax.skip_string(cursor)) {
            cursor = after;
        } else if cursor.is_char('(') {
            break ')';
        } else if cursor.is_char('[') {
            let mut before = cursor.previous();
            while before.kind() == FundamentalKind::Whitespace {
                before = before.previous();
            }
            if before.matches_token("this") {
                break ']';
            }
            cursor = cursor.next();
        } else if cursor.is_char('{') {
            break '}';
        } else {
            cursor = cursor.next();
        }
    };

    let open = cursor.index();
    tags.set(cursor, PrototypeTag::StartOfParams);
    cursor = cursor.next();
    while cursor.in_bounds() {
        if cursor.is_char(',') || cursor.is_char(';') {
            tags.set(cursor, PrototypeTag::ParamSeparator);
            cursor = cursor.next();
        } else if cursor.is_char(closing) {
            tags.set(cursor, PrototypeTag::EndOfParams);
            return Some((open, cursor.index()));
        } else if let Some(after) = syntax.skip_opaque(cursor, true) {
            // `<` counts here so the comma in `Map<K, V>` does not split a parameter.
            cursor = after;
        } else {
            cursor = cursor.next();
        }
    }
    // Unterminated list: everything after the opener is parameters.
    Some((open, buf.token_count()))
}

fn parameter_ranges(
    buf: &TokenBuffer,
    tags: &PrototypeTags,
    open: usize,
    close: usize,
) -> Vec<(usize, usize)> {
    let mut ranges = Vec::new();
    let mut section_start = open + 1;
    for i in open + 1..=close {
        let at_end = i == close;
        if at_end || tags.get_index(i) == PrototypeTag::ParamSeparator {
            let start = buf.cursor_at(section_start);
            let end = buf.cursor_at(i);
            let trimmed_start = start.next_past_whitespace(end);
            let trimmed_end = end.previous_past_whitespace(trimmed_start);
            ranges.push((trimmed_start.index(), trimmed_end.index()));
            section_start = i + 1;
        }
    }
    // `f()` has no parameters rather than one empty one.
    if ranges.len() == 1 && ranges[0].0 == ranges[0].1 {
        ranges.clear();
    }
    ranges
}

// -- Marking ------------------------------------------------------------------

/// One recognized word within a range.
struct Word<'a> {
    start: Cursor<'a>,
    end: Cursor<'a>,
    /// A comment, string or bracket block rather than a name.
    is_block: bool,
}

struct Marker<'p> {
    syntax: Syntax<'p>,
}

impl<'p> Marker<'p> {
    /// Recognize a word at `at`, or `None` if `at` is whitespace or a stray symbol.
    fn word<'a>(&self, at: Cursor<'a>, end: Cursor<'a>) -> Option<Word<'a>> {
        if let Some(after) = self.syntax.skip_type_or_var_name(at, end) {
            return Some(Word {
                start: at,
                end: after,
                is_block: false,
            });
        }
        self.syntax.skip_opaque(at, true).map(|after| Word {
            start: at,
            end: after.min(end),
            is_block: true,
        })
    }

    /// Detect the style of one range and mark it accordingly.
    fn mark_parameter(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) -> ParameterStyle {
        let style = self.detect_style(start, end);
        match style {
            ParameterStyle::Pascal => self.mark_pascal_parameter(tags, start, end),
            ParameterStyle::C => self.mark_c_parameter(tags, start, end),
        }
        style
    }

    fn detect_style(&self, start: Cursor<'_>, end: Cursor<'_>) -> ParameterStyle {
        let mut cursor = start;
        while cursor < end {
            if cursor.is_char('=') || cursor.matches(":=") {
                break;
            } else if cursor.matches("::") {
                cursor = cursor.next_by(2);
            } else if cursor.is_char(':') {
                return ParameterStyle::Pascal;
            } else if let Some(word) = self.word(cursor, end) {
                cursor = word.end;
            } else {
                cursor = cursor.next();
            }
        }
        ParameterStyle::C
    }

    /// Tag `=` or `:=` and the default value after it, stopping before any
    /// trailing separators.
    fn mark_default_value(&self, tags: &mut PrototypeTags, at: Cursor<'_>, end: Cursor<'_>) {
        let value_start = if at.is_char('=') {
            tags.set(at, PrototypeTag::DefaultValueSeparator);
            at.next()
        } else {
            tags.set_range(at, at.next_by(2), PrototypeTag::DefaultValueSeparator);
            at.next_by(2)
        }
        .next_past_whitespace(end);

        let mut value_end = end;
        while value_end > value_start && tags.get(value_end.previous()) == PrototypeTag::ParamSeparator {
            value_end = value_end.previous();
        }
        let value_end = value_end.previous_past_whitespace(value_start);
        if value_start < value_end {
            tags.set_range(value_start, value_end, PrototypeTag::DefaultValue);
        }
    }

    fn mark_modifier_word(&self, tags: &mut PrototypeTags, word: &Word<'_>) {
        if word.is_block && word.end - word.start >= 2 {
            tags.set(word.start, PrototypeTag::OpeningModifier);
            tags.set(word.end.previous(), PrototypeTag::ClosingModifier);
        } else {
            tags.set_range(word.start, word.end, PrototypeTag::Modifier);
        }
    }

    /// `[modifier]* [type] name`, assigned right to left.
    fn mark_c_parameter(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut words = 0usize;
        let mut cursor = start;
        while cursor < end {
            if cursor.is_char('=') || cursor.matches(":=") {
                self.mark_default_value(tags, cursor, end);
                break;
            } else if tags.get(cursor) == PrototypeTag::ParamSeparator {
                break;
            } else if let Some(word) = self.word(cursor, end) {
                words += 1;
                cursor = word.end;
            } else {
                cursor = cursor.next();
            }
        }

        let mut cursor = start;
        while cursor < end && words > 0 {
            if matches!(
                tags.get(cursor),
                PrototypeTag::DefaultValueSeparator | PrototypeTag::ParamSeparator
            ) {
                break;
            }
            let Some(word) = self.word(cursor, end) else {
                cursor = cursor.next();
                continue;
            };
            match words {
                1 => self.mark_name(tags, word.start, word.end),
                2 => {
                    self.mark_type(tags, word.start, word.end);
                    // `int* x` declares the same thing as `int *x`.
                    let mut back = word.end.previous();
                    let mut moved = false;
                    loop {
                        while back > word.start && back.kind() == FundamentalKind::Whitespace {
                            back = back.previous();
                        }
                        if back < word.start || !matches!(back.character(), Some('*' | '&' | '^')) {
                            break;
                        }
                        tags.set(back, PrototypeTag::NamePrefix);
                        moved = true;
                        back = back.previous();
                    }
                    // Whitespace around the moved prefixes no longer belongs to the type.
                    if moved {
                        let mut space = back.next();
                        while space < word.end {
                            if space.kind() == FundamentalKind::Whitespace {
                                tags.set(space, PrototypeTag::Null);
                            }
                            space = space.next();
                        }
                    }
                }
                _ => self.mark_modifier_word(tags, &word),
            }
            words -= 1;
            cursor = word.end;
        }
    }

    /// `[modifier]* name : [modifier]* type`. Without a colon every word is
    /// before it, as in the `a` of `a, b: integer`.
    fn mark_pascal_parameter(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut words = 0usize;
        let mut words_before_colon = 0usize;
        let mut cursor = start;
        while cursor < end {
            if cursor.is_char('=') || cursor.matches(":=") {
                self.mark_default_value(tags, cursor, end);
                break;
            } else if cursor.matches("::") {
                cursor = cursor.next_by(2);
            } else if cursor.is_char(':') {
                words_before_colon = words;
                tags.set(cursor, PrototypeTag::NameTypeSeparator);
                cursor = cursor.next();
            } else if tags.get(cursor) == PrototypeTag::ParamSeparator {
                break;
            } else if let Some(word) = self.word(cursor, end) {
                words += 1;
                cursor = word.end;
            } else {
                cursor = cursor.next();
            }
        }

        let (mut before, mut after) = if words_before_colon == 0 {
            (words, 0)
        } else {
            (words_before_colon, words - words_before_colon)
        };

        let mut cursor = start;
        while cursor < end {
            if matches!(
                tags.get(cursor),
                PrototypeTag::DefaultValueSeparator
                    | PrototypeTag::ParamSeparator
                    | PrototypeTag::NameTypeSeparator
            ) {
                break;
            }
            let Some(word) = self.word(cursor, end) else {
                cursor = cursor.next();
                continue;
            };
            match before {
                0 => {}
                1 => self.mark_name(tags, word.start, word.end),
                _ => self.mark_modifier_word(tags, &word),
            }
            before = before.saturating_sub(1);
            cursor = word.end;
        }

        if after == 0 {
            return;
        }
        while cursor < end && tags.get(cursor) == PrototypeTag::NameTypeSeparator {
            cursor = cursor.next();
        }
        while cursor < end && after > 0 {
            if matches!(
                tags.get(cursor),
                PrototypeTag::DefaultValueSeparator | PrototypeTag::ParamSeparator
            ) {
                break;
            }
            let Some(word) = self.word(cursor, end) else {
                cursor = cursor.next();
                continue;
            };
            if after == 1 {
                self.mark_type(tags, word.start, word.end);
            } else {
                self.mark_modifier_word(tags, &word);
            }
            after -= 1;
            cursor = word.end;
        }
    }

    /// `[modifier]* type`, as in a return value.
    fn mark_type_and_modifiers(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        self.mark_modifiers_then(tags, start, end, Self::mark_type);
    }

    /// `[modifier]* name`, as in the `function F` before a Pascal parameter list.
    fn mark_name_and_modifiers(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        self.mark_modifiers_then(tags, start, end, Self::mark_name);
    }

    fn mark_modifiers_then(
        &self,
        tags: &mut PrototypeTags,
        start: Cursor<'_>,
        end: Cursor<'_>,
        last: fn(&Self, &mut PrototypeTags, Cursor<'_>, Cursor<'_>),
    ) {
        let mut words = 0usize;
        let mut cursor = start;
        while cursor < end {
            match self.word(cursor, end) {
                Some(word) => {
                    words += 1;
                    cursor = word.end;
                }
                None => cursor = cursor.next(),
            }
        }

        let mut cursor = start;
        while cursor < end && words > 0 {
            if matches!(
                tags.get(cursor),
                PrototypeTag::DefaultValueSeparator
                    | PrototypeTag::ParamSeparator
                    | PrototypeTag::NameTypeSeparator
            ) {
                break;
            }
            let Some(word) = self.word(cursor, end) else {
                cursor = cursor.next();
                continue;
            };
            if words == 1 {
                last(self, tags, word.start, word.end);
            } else {
                tags.set_range(word.start, word.end, PrototypeTag::Modifier);
            }
            words -= 1;
            cursor = word.end;
        }
    }

    /// Leading symbols, qualifiers, the type word, then any suffix.
    fn mark_type(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut start = start;
        while start < end && start.kind() != FundamentalKind::Text && !start.is_char('_') {
            tags.set(start, PrototypeTag::Modifier);
            start = start.next();
        }

        let mut cursor = start;
        let mut qualifier_end = start;
        while cursor < end {
            if cursor.is_char('.') {
                cursor = cursor.next();
                qualifier_end = cursor;
            } else if cursor.matches("::") {
                cursor = cursor.next_by(2);
                qualifier_end = cursor;
            } else if cursor.kind() == FundamentalKind::Text || cursor.is_char('_') {
                cursor = cursor.next();
            } else {
                break;
            }
        }

        if qualifier_end > start {
            tags.set_range(start, qualifier_end, PrototypeTag::TypeQualifier);
        }
        if cursor > qualifier_end {
            tags.set_range(qualifier_end, cursor, PrototypeTag::Type);
        }
        if cursor < end {
            self.mark_type_suffix(tags, cursor, end);
        }
    }

    /// Bracket blocks open and close a nested type list; anything else is plain suffix.
    fn mark_type_suffix(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut cursor = start;
        while cursor < end {
            match self.syntax.skip_block(cursor, true).filter(|after| *after <= end) {
                Some(after) => {
                    let close = after.previous();
                    tags.set(cursor, PrototypeTag::OpeningTypeSuffix);
                    if close > cursor {
                        tags.set(close, PrototypeTag::ClosingTypeSuffix);
                        self.mark_type_suffix_list(tags, cursor.next(), close);
                    }
                    cursor = after;
                }
                None => {
                    tags.set(cursor, PrototypeTag::TypeSuffix);
                    cursor = cursor.next();
                }
            }
        }
    }

    /// Split on `,` and `;` and classify each piece as `[modifier]* type`.
    fn mark_type_suffix_list(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut cursor = start;
        while cursor < end {
            let piece_start = cursor;
            while cursor < end && !cursor.is_char(',') && !cursor.is_char(';') {
                cursor = match self.word(cursor, end) {
                    Some(word) => word.end,
                    None => cursor.next(),
                };
            }
            let piece_end = cursor.previous_past_whitespace(piece_start);
            let piece_start = piece_start.next_past_whitespace(piece_end);
            if piece_start < piece_end {
                self.mark_type_and_modifiers(tags, piece_start, piece_end);
            }
            cursor = cursor.next();
        }
    }

    /// Leading symbols, the (possibly qualified) name, then any suffix.
    fn mark_name(&self, tags: &mut PrototypeTags, start: Cursor<'_>, end: Cursor<'_>) {
        let mut cursor = start;
        while cursor < end && cursor.kind() != FundamentalKind::Text && !cursor.is_char('_') {
            tags.set(cursor, PrototypeTag::NamePrefix);
            cursor = cursor.next();
        }

        while cursor < end {
            if cursor.kind() == FundamentalKind::Text || cursor.is_char('_') || cursor.is_char('.') {
                tags.set(cursor, PrototypeTag::Name);
                cursor = cursor.next();
            } else if cursor.matches("::") {
                tags.set_range(cursor, cursor.next_by(2), PrototypeTag::Name);
                cursor = cursor.next_by(2);
            } else {
                break;
            }
        }

        while cursor < end {
            match self.syntax.skip_block(cursor, true).filter(|after| *after <= end) {
                Some(after) => {
                    tags.set(cursor, PrototypeTag::OpeningNameSuffix);
                    tags.set(after.previous(), PrototypeTag::ClosingNameSuffix);
                    cursor = after;
                }
                None => {
                    if cursor.kind() != FundamentalKind::Whitespace {
                        tags.set(cursor, PrototypeTag::NameSuffix);
                    }
                    cursor = cursor.next();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::builtin_profiles;
    use PrototypeTag::*;

    fn profile(name: &str) -> LanguageProfile {
        builtin_profiles()
            .into_iter()
            .find(|p| p.name == name)
            .unwrap()
    }

    fn non_space_tags(parsed: &ParsedPrototype) -> Vec<(String, PrototypeTag)> {
        parsed
            .tagged_tokens()
            .into_iter()
            .filter(|(text, _)| !text.trim().is_empty())
            .map(|(text, tag)| (text.to_string(), tag))
            .collect()
    }

    fn tags_of(source: &str) -> Vec<(String, PrototypeTag)> {
        non_space_tags(&parse_prototype(source, &profile("c")))
    }

    fn pairs(list: &[(&str, PrototypeTag)]) -> Vec<(String, PrototypeTag)> {
        list.iter().map(|(t, tag)| (t.to_string(), *tag)).collect()
    }

    #[test]
    fn two_words_are_type_and_name() {
        assert_eq!(tags_of("int x"), pairs(&[("int", Type), ("x", Name)]));
    }

    #[test]
    fn three_words_start_with_modifiers() {
        assert_eq!(
            tags_of("unsigned long x"),
            pairs(&[("unsigned", Modifier), ("long", Type), ("x", Name)])
        );
        assert_eq!(
            tags_of("static unsigned long x"),
            pairs(&[("static", Modifier), ("unsigned", Modifier), ("long", Type), ("x", Name)])
        );
    }

    #[test]
    fn one_word_is_a_name() {
        assert_eq!(tags_of("x"), pairs(&[("x", Name)]));
        assert_eq!(tags_of("$x"), pairs(&[("$", NamePrefix), ("x", Name)]));
    }

    #[test]
    fn pointer_binds_to_the_name() {
        let glued = tags_of("int* x");
        let spaced = tags_of("int *x");
        let expected = pairs(&[("int", Type), ("*", NamePrefix), ("x", Name)]);
        assert_eq!(glued, expected);
        assert_eq!(spaced, expected);
        for source in ["int* x", "int *x", "int * x", "char ** argv"] {
            let parsed = parse_prototype(source, &profile("c"));
            let spaces: Vec<_> = parsed
                .tagged_tokens()
                .into_iter()
                .filter(|(text, _)| text.trim().is_empty())
                .map(|(_, tag)| tag)
                .collect();
            assert!(spaces.iter().all(|&tag| tag == Null), "{source}: {spaces:?}");
        }
        assert_eq!(
            tags_of("char ** argv"),
            pairs(&[("char", Type), ("*", NamePrefix), ("*", NamePrefix), ("argv", Name)])
        );
    }

    #[test]
    fn pascal_name_then_type() {
        let parsed = parse_prototype("x: integer", &profile("pascal"));
        assert_eq!(parsed.style(), Some(ParameterStyle::Pascal));
        assert_eq!(
            non_space_tags(&parsed),
            pairs(&[("x", Name), (":", NameTypeSeparator), ("integer", Type)])
        );
    }

    #[test]
    fn pascal_style_applies_to_every_parameter() {
        let parsed = parse_prototype("function F (const a, b: string): integer", &profile("pascal"));
        assert_eq!(parsed.style(), Some(ParameterStyle::Pascal));
        assert_eq!(parsed.parameter_count(), 2);
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("a"));
        assert_eq!(parsed.parameter_name(1).as_deref(), Some("b"));
        assert_eq!(parsed.parameter_type(1).as_deref(), Some("string"));
        assert_eq!(parsed.return_type().as_deref(), Some("integer"));
    }

    #[test]
    fn function_parameters_and_defaults() {
        let parsed = parse_prototype("static int Add (int a, const char *b = \"x, y\", int c = 2)", &profile("c"));
        assert_eq!(parsed.style(), Some(ParameterStyle::C));
        assert_eq!(parsed.parameter_count(), 3);
        assert_eq!(parsed.name().as_deref(), Some("Add"));
        assert_eq!(parsed.return_type().as_deref(), Some("static int"));
        assert_eq!(parsed.parameter_name(1).as_deref(), Some("b"));
        assert_eq!(parsed.parameter_type(1).as_deref(), Some("const char *"));
        assert_eq!(parsed.parameter_default(1).as_deref(), Some("\"x, y\""));
        assert_eq!(parsed.parameter_default(2).as_deref(), Some("2"));
        assert_eq!(parsed.tokens_with_tag(DefaultValueSeparator), vec!["=", "="]);
    }

    #[test]
    fn empty_parameter_list() {
        let parsed = parse_prototype("void f()", &profile("c"));
        assert_eq!(parsed.parameter_count(), 0);
        assert_eq!(parsed.style(), None);
        assert_eq!(parsed.name().as_deref(), Some("f"));
    }

    #[test]
    fn nested_generic_suffix() {
        let parsed = parse_prototype("void f(Dictionary<Key, List<Value>> map)", &profile("c"));
        assert_eq!(parsed.parameter_count(), 1);
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("map"));
        assert_eq!(
            parsed.parameter_type(0).as_deref(),
            Some("Dictionary<Key, List<Value>>")
        );
        assert_eq!(parsed.tokens_with_tag(Type), vec!["void", "Dictionary", "Key", "List", "Value"]);
        assert_eq!(parsed.tokens_with_tag(OpeningTypeSuffix), vec!["<", "<"]);
        // Adjacent closers form one run.
        assert_eq!(parsed.tokens_with_tag(ClosingTypeSuffix), vec![">>"]);
        assert_eq!(
            parsed.linkable_types(&profile("c")),
            vec!["Dictionary", "Key", "List", "Value"]
        );
    }

    #[test]
    fn array_suffix_and_qualified_type() {
        let tags = tags_of("std::string names[]");
        assert_eq!(
            tags,
            pairs(&[
                ("std", TypeQualifier),
                (":", TypeQualifier),
                (":", TypeQualifier),
                ("string", Type),
                ("names", Name),
                ("[", OpeningNameSuffix),
                ("]", ClosingNameSuffix),
            ])
        );
        assert_eq!(
            tags_of("int[] values"),
            pairs(&[("int", Type), ("[", OpeningTypeSuffix), ("]", ClosingTypeSuffix), ("values", Name)])
        );
    }

    #[test]
    fn comments_count_as_words() {
        let tags = tags_of("/*out*/ int x");
        assert_eq!(
            tags[..5],
            pairs(&[
                ("/", OpeningModifier),
                ("*", Null),
                ("out", Null),
                ("*", Null),
                ("/", ClosingModifier),
            ])
        );
        assert_eq!(tags.last().unwrap(), &("x".to_string(), Name));
        assert!(tags.contains(&("int".to_string(), Type)));
    }

    #[test]
    fn indexer_brackets_after_this() {
        let parsed = parse_prototype("int this[int index]", &profile("c"));
        assert_eq!(parsed.parameter_count(), 1);
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("index"));

        let parsed = parse_prototype("int[] values", &profile("c"));
        assert_eq!(parsed.parameter_count(), 0);
    }

    #[test]
    fn template_commas_do_not_split() {
        let parsed = parse_prototype("void f(Map<K, V> m, int n)", &profile("c"));
        assert_eq!(parsed.parameter_count(), 2);
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("m"));
    }

    #[test]
    fn variable_with_default_and_no_brackets() {
        let parsed = parse_prototype("int count = 0", &profile("c"));
        assert_eq!(parsed.parameter_count(), 0);
        assert_eq!(parsed.name().as_deref(), Some("count"));
        assert_eq!(parsed.return_type().as_deref(), Some("int"));
        assert_eq!(parsed.tokens_with_tag(DefaultValue), vec!["0"]);
    }

    #[test]
    fn single_parameter_classification() {
        let parsed = classify_parameter("  const char *name = \"x\" ", &profile("c"));
        assert_eq!(parsed.parameter_count(), 1);
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("name"));
        assert_eq!(parsed.parameter_type(0).as_deref(), Some("const char *"));
        assert_eq!(parsed.parameter_default(0).as_deref(), Some("\"x\""));

        let parsed = classify_parameter("var count: integer", &profile("pascal"));
        assert_eq!(parsed.style(), Some(ParameterStyle::Pascal));
        assert_eq!(parsed.parameter_name(0).as_deref(), Some("count"));
        assert_eq!(parsed.parameter_type(0).as_deref(), Some("integer"));
    }

    #[test]
    fn serializes_summary() {
        let parsed = parse_prototype("int Add (int a, int b)", &profile("c"));
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["name"], "Add");
        assert_eq!(json["return_type"], "int");
        assert_eq!(json["style"], "c");
        assert_eq!(json["parameters"][1]["name"], "b");
        assert_eq!(json["parameters"][1]["type"], "int");
    }
}
