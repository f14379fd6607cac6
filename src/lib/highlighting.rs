//! Syntax highlighting for fenced code blocks, using syntect.
//!
//! Highlighting is split in two halves that only meet through CSS class
//! names, the way Pygments' `codehilite` output works:
//!
//! - [`highlight_block`] parses a code block and wraps each token in a
//!   `<span class="…">` carrying a short [`TokenClass`] name (`k`, `s`, `c`…).
//! - [`stylesheet_for`] renders one CSS rule per [`TokenClass`] from the
//!   theme selected for the color mode.
//!
//! Because the stylesheet always covers the whole taxonomy, every class that
//! can appear in a code block has a matching rule.

use crate::config::ColorMode;
use crate::{escape_html, MdpError};
use lazy_static::lazy_static;
use log::{debug, warn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt::Write;
use std::io::Cursor;
use std::str::FromStr;
use syntect::easy::ScopeRangeIterator;
use syntect::highlighting::{Color, FontStyle, Highlighter, Theme, ThemeSet};
use syntect::parsing::{ParseState, Scope, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// CSS class of the element wrapping every highlighted block.
pub const CSS_CLASS: &str = "codehilite";

/// Theme used for light mode; syntect's GitHub look-alike.
pub const LIGHT_THEME: &str = "InspiredGitHub";

const GITHUB_DARK_TMTHEME: &str = include_str!("../../themes/GitHubDark.tmTheme");

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref GITHUB_DARK: Result<Theme, String> =
        ThemeSet::load_from_reader(&mut Cursor::new(GITHUB_DARK_TMTHEME.as_bytes()))
            .map_err(|e| e.to_string());
}

/// Lexical categories emitted as CSS classes, named after Pygments' short
/// token names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Keyword,
    KeywordType,
    KeywordDeclaration,
    KeywordConstant,
    String,
    StringEscape,
    StringRegex,
    Number,
    Comment,
    CommentPreproc,
    NameFunction,
    NameClass,
    NameTag,
    NameAttribute,
    NameBuiltin,
    NameVariable,
    NameBuiltinPseudo,
    NameConstant,
    Operator,
    Punctuation,
    GenericHeading,
    GenericInserted,
    GenericDeleted,
    GenericEmph,
    GenericStrong,
    Error,
}

impl TokenClass {
    pub const ALL: [TokenClass; 26] = [
        TokenClass::Keyword,
        TokenClass::KeywordType,
        TokenClass::KeywordDeclaration,
        TokenClass::KeywordConstant,
        TokenClass::String,
        TokenClass::StringEscape,
        TokenClass::StringRegex,
        TokenClass::Number,
        TokenClass::Comment,
        TokenClass::CommentPreproc,
        TokenClass::NameFunction,
        TokenClass::NameClass,
        TokenClass::NameTag,
        TokenClass::NameAttribute,
        TokenClass::NameBuiltin,
        TokenClass::NameVariable,
        TokenClass::NameBuiltinPseudo,
        TokenClass::NameConstant,
        TokenClass::Operator,
        TokenClass::Punctuation,
        TokenClass::GenericHeading,
        TokenClass::GenericInserted,
        TokenClass::GenericDeleted,
        TokenClass::GenericEmph,
        TokenClass::GenericStrong,
        TokenClass::Error,
    ];

    pub fn css_class(&self) -> &'static str {
        match self {
            TokenClass::Keyword => "k",
            TokenClass::KeywordType => "kt",
            TokenClass::KeywordDeclaration => "kd",
            TokenClass::KeywordConstant => "kc",
            TokenClass::String => "s",
            TokenClass::StringEscape => "se",
            TokenClass::StringRegex => "sr",
            TokenClass::Number => "m",
            TokenClass::Comment => "c",
            TokenClass::CommentPreproc => "cp",
            TokenClass::NameFunction => "nf",
            TokenClass::NameClass => "nc",
            TokenClass::NameTag => "nt",
            TokenClass::NameAttribute => "na",
            TokenClass::NameBuiltin => "nb",
            TokenClass::NameVariable => "nv",
            TokenClass::NameBuiltinPseudo => "bp",
            TokenClass::NameConstant => "no",
            TokenClass::Operator => "o",
            TokenClass::Punctuation => "p",
            TokenClass::GenericHeading => "gh",
            TokenClass::GenericInserted => "gi",
            TokenClass::GenericDeleted => "gd",
            TokenClass::GenericEmph => "ge",
            TokenClass::GenericStrong => "gs",
            TokenClass::Error => "err",
        }
    }

    /// A scope stack whose theme style stands for the whole class.
    fn representative_scopes(&self) -> &'static str {
        match self {
            TokenClass::Keyword => "source keyword.control",
            TokenClass::KeywordType => "source storage.type",
            TokenClass::KeywordDeclaration => "source storage.modifier",
            TokenClass::KeywordConstant => "source constant.language",
            TokenClass::String => "source string.quoted.double",
            TokenClass::StringEscape => "source string.quoted.double constant.character.escape",
            TokenClass::StringRegex => "source string.regexp",
            TokenClass::Number => "source constant.numeric",
            TokenClass::Comment => "source comment.line",
            TokenClass::CommentPreproc => "source meta.preprocessor",
            TokenClass::NameFunction => "source entity.name.function",
            TokenClass::NameClass => "source entity.name.class",
            TokenClass::NameTag => "source entity.name.tag",
            TokenClass::NameAttribute => "source entity.other.attribute-name",
            TokenClass::NameBuiltin => "source support.function",
            TokenClass::NameVariable => "source variable.other",
            TokenClass::NameBuiltinPseudo => "source variable.language",
            TokenClass::NameConstant => "source constant.other",
            TokenClass::Operator => "source keyword.operator",
            TokenClass::Punctuation => "source punctuation.separator",
            TokenClass::GenericHeading => "text markup.heading",
            TokenClass::GenericInserted => "source markup.inserted",
            TokenClass::GenericDeleted => "source markup.deleted",
            TokenClass::GenericEmph => "text markup.italic",
            TokenClass::GenericStrong => "text markup.bold",
            TokenClass::Error => "source invalid.illegal",
        }
    }

    /// Classifies the token at the top of a scope stack.
    ///
    /// Comments and strings own their delimiters, so they are checked on the
    /// whole stack before the innermost-first scan; escapes inside strings
    /// stay distinguishable.
    pub fn for_stack(stack: &[Scope]) -> Option<TokenClass> {
        [&*ESCAPE_SCOPES, &*CONTAINER_SCOPES, &*TOKEN_SCOPES]
            .into_iter()
            .find_map(|table| first_match(stack, table))
    }
}

fn first_match(stack: &[Scope], table: &[(Scope, TokenClass)]) -> Option<TokenClass> {
    stack.iter().rev().find_map(|scope| {
        table
            .iter()
            .find(|(prefix, _)| prefix.is_prefix_of(*scope))
            .map(|(_, class)| *class)
    })
}

fn scope_table(entries: &[(&str, TokenClass)]) -> Vec<(Scope, TokenClass)> {
    entries
        .iter()
        .filter_map(|(name, class)| Scope::new(name).ok().map(|scope| (scope, *class)))
        .collect()
}

static ESCAPE_SCOPES: Lazy<Vec<(Scope, TokenClass)>> =
    Lazy::new(|| scope_table(&[("constant.character.escape", TokenClass::StringEscape)]));

static CONTAINER_SCOPES: Lazy<Vec<(Scope, TokenClass)>> = Lazy::new(|| {
    scope_table(&[
        ("comment", TokenClass::Comment),
        ("string.regexp", TokenClass::StringRegex),
        ("string", TokenClass::String),
    ])
});

// Order matters: the first matching prefix wins for a given scope.
static TOKEN_SCOPES: Lazy<Vec<(Scope, TokenClass)>> = Lazy::new(|| {
    scope_table(&[
        ("keyword.operator", TokenClass::Operator),
        ("keyword", TokenClass::Keyword),
        ("storage.type", TokenClass::KeywordType),
        ("storage", TokenClass::KeywordDeclaration),
        ("constant.numeric", TokenClass::Number),
        ("constant.language", TokenClass::KeywordConstant),
        ("constant", TokenClass::NameConstant),
        ("entity.name.function", TokenClass::NameFunction),
        ("entity.name.tag", TokenClass::NameTag),
        ("entity.other.attribute-name", TokenClass::NameAttribute),
        ("entity.other.inherited-class", TokenClass::NameClass),
        ("entity.name", TokenClass::NameClass),
        ("support.function", TokenClass::NameBuiltin),
        ("support.type", TokenClass::NameClass),
        ("support.class", TokenClass::NameClass),
        ("support", TokenClass::NameBuiltin),
        ("variable.language", TokenClass::NameBuiltinPseudo),
        ("variable.function", TokenClass::NameFunction),
        ("variable", TokenClass::NameVariable),
        ("meta.preprocessor", TokenClass::CommentPreproc),
        ("punctuation", TokenClass::Punctuation),
        ("markup.heading", TokenClass::GenericHeading),
        ("markup.inserted", TokenClass::GenericInserted),
        ("markup.deleted", TokenClass::GenericDeleted),
        ("markup.italic", TokenClass::GenericEmph),
        ("markup.bold", TokenClass::GenericStrong),
        ("invalid", TokenClass::Error),
    ])
});

/// Maps common fence tags that syntect does not know by token.
fn get_syntax_mapping() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();
    map.insert("c++", "C++");
    map.insert("python3", "Python");
    map.insert("py3", "Python");
    map.insert("jsx", "JavaScript");
    map.insert("node", "JavaScript");
    map.insert("golang", "Go");
    map.insert("bash", "Bourne Again Shell (bash)");
    map.insert("sh", "Bourne Again Shell (bash)");
    map.insert("shell", "Bourne Again Shell (bash)");
    map.insert("zsh", "Bourne Again Shell (bash)");
    map.insert("console", "Bourne Again Shell (bash)");
    map.insert("patch", "Diff");
    map.insert("text", "Plain Text");
    map.insert("plain", "Plain Text");
    map.insert("plaintext", "Plain Text");
    map
}

/// Extracts the language tag from a fence info string (`rust,ignore` → `rust`).
pub fn language_from_info(info: &str) -> Option<String> {
    info.split(|c: char| c.is_whitespace() || c == ',')
        .find(|t| !t.is_empty())
        .map(|t| t.trim_start_matches(['{', '.']).trim_end_matches('}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Finds the syntax for a language tag.
pub fn find_syntax(language: &str) -> Option<&'static SyntaxReference> {
    let lower = language.to_lowercase();
    get_syntax_mapping()
        .get(lower.as_str())
        .and_then(|name| SYNTAX_SET.find_syntax_by_name(name))
        .or_else(|| SYNTAX_SET.find_syntax_by_token(&lower))
        .or_else(|| SYNTAX_SET.find_syntax_by_name(language))
}

/// Picks a syntax for an unannotated block from its first line (shebangs,
/// `<?php`, `<?xml`, editor modelines).
pub fn guess_syntax(code: &str) -> Option<&'static SyntaxReference> {
    let first_line = code.lines().next()?;
    SYNTAX_SET.find_syntax_by_first_line(first_line)
}

fn push_run(out: &mut String, class: Option<TokenClass>, text: &str) {
    if text.is_empty() {
        return;
    }
    match class {
        Some(class) => {
            let _ = write!(
                out,
                "<span class=\"{}\">{}</span>",
                class.css_class(),
                escape_html(text)
            );
        }
        None => out.push_str(&escape_html(text)),
    }
}

fn highlight_spans(code: &str, syntax: &SyntaxReference) -> Result<String, String> {
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut out = String::with_capacity(code.len() * 2);

    // Adjacent tokens of the same class share one span.
    let mut run_class: Option<TokenClass> = None;
    let mut run = String::new();

    for line in LinesWithEndings::from(code) {
        let ops = state
            .parse_line(line, &SYNTAX_SET)
            .map_err(|e| e.to_string())?;
        for (range, op) in ScopeRangeIterator::new(&ops, line) {
            stack.apply(op).map_err(|e| format!("{:?}", e))?;
            let text = &line[range];
            if text.is_empty() {
                continue;
            }
            let class = TokenClass::for_stack(stack.as_slice());
            if class != run_class {
                push_run(&mut out, run_class, &run);
                run.clear();
                run_class = class;
            }
            run.push_str(text);
        }
    }
    push_run(&mut out, run_class, &run);

    Ok(out)
}

/// Renders a code block as `<div class="codehilite"><pre><code>…</code></pre></div>`.
///
/// `info` is the fence info string, if any. Without one the language is
/// guessed from the first line; unknown languages render as escaped text.
pub fn highlight_block(code: &str, info: Option<&str>) -> String {
    let language = info.and_then(language_from_info);
    let syntax = match &language {
        Some(lang) => find_syntax(lang),
        None => guess_syntax(code),
    };

    let body = match syntax {
        Some(syntax) if syntax.name != "Plain Text" => {
            debug!("Highlighting code block as {}", syntax.name);
            highlight_spans(code, syntax).unwrap_or_else(|e| {
                warn!("Failed to highlight {} code block: {}", syntax.name, e);
                escape_html(code)
            })
        }
        _ => {
            if let Some(lang) = &language {
                debug!("No syntax for language '{}', rendering plain text", lang);
            }
            escape_html(code)
        }
    };

    let code_attr = match &language {
        Some(lang) => format!(" class=\"language-{}\"", escape_html(lang)),
        None => String::new(),
    };

    format!(
        "<div class=\"{}\"><pre><code{}>{}</code></pre></div>\n",
        CSS_CLASS, code_attr, body
    )
}

/// The syntax theme paired with a color mode.
pub fn theme_for(mode: ColorMode) -> Result<&'static Theme, MdpError> {
    match mode {
        ColorMode::Light => THEME_SET
            .themes
            .get(LIGHT_THEME)
            .ok_or_else(|| MdpError::ConfigError {
                message: format!("Syntax theme '{}' is not available", LIGHT_THEME),
                suggestion: "Build syntect with its default themes".to_string(),
            }),
        ColorMode::Dark => GITHUB_DARK.as_ref().map_err(|e| MdpError::ConfigError {
            message: format!("Bundled dark syntax theme is invalid: {}", e),
            suggestion: "Check themes/GitHubDark.tmTheme".to_string(),
        }),
    }
}

fn css_color(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

/// Renders the token-class stylesheet for a theme.
pub fn css_for_theme(theme: &Theme) -> String {
    let highlighter = Highlighter::new(theme);
    let default = highlighter.get_default();
    let background = theme.settings.background.unwrap_or(default.background);
    let foreground = theme.settings.foreground.unwrap_or(default.foreground);

    let mut css = String::new();
    let _ = writeln!(
        css,
        ".{} {{ background: {}; color: {}; }}",
        CSS_CLASS,
        css_color(background),
        css_color(foreground)
    );

    for class in TokenClass::ALL {
        let style = ScopeStack::from_str(class.representative_scopes())
            .map(|stack| highlighter.style_for_stack(stack.as_slice()))
            .unwrap_or(default);

        let mut declarations = vec![format!("color: {}", css_color(style.foreground))];
        if style.font_style.contains(FontStyle::BOLD) {
            declarations.push("font-weight: bold".to_string());
        }
        if style.font_style.contains(FontStyle::ITALIC) {
            declarations.push("font-style: italic".to_string());
        }
        if style.font_style.contains(FontStyle::UNDERLINE) {
            declarations.push("text-decoration: underline".to_string());
        }
        let _ = writeln!(
            css,
            ".{} .{} {{ {} }}",
            CSS_CLASS,
            class.css_class(),
            declarations.join("; ")
        );
    }

    css
}

/// Generates the syntax-highlight stylesheet for a color mode.
pub fn stylesheet_for(mode: ColorMode) -> Result<String, MdpError> {
    Ok(css_for_theme(theme_for(mode)?))
}
