//! # Template DDL
//!
//! SQL text used to clone a template table into a shard table on
//! MySQL-compatible catalogs.

use crate::domain::ShardError;

/// Quote an identifier with backticks, doubling embedded backticks.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// `` `schema`.`table` ``
pub fn qualified_name(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_identifier(schema), quote_identifier(table))
}

/// Point a template `CREATE TABLE` statement at `schema.target`.
///
/// Only the table identifier in the statement header is rewritten; column,
/// index and constraint definitions are left untouched. The header may use
/// backticked or bare identifiers, may already be schema-qualified and may
/// carry `IF NOT EXISTS`.
pub fn rewrite_create_statement(
    ddl: &str,
    template: &str,
    schema: &str,
    target: &str,
) -> Result<String, ShardError> {
    let unusable = |reason: String| ShardError::TemplateDdl {
        template: template.to_string(),
        reason,
    };

    let header = parse_header(ddl).map_err(&unusable)?;
    if !header.table.eq_ignore_ascii_case(template) {
        return Err(unusable(format!("statement creates {} instead", header.table)));
    }

    Ok(format!(
        "{}{}{}",
        &ddl[..header.name_start],
        qualified_name(schema, target),
        &ddl[header.name_end..]
    ))
}

/// Schema (if qualified) and table created by a `CREATE TABLE` statement.
pub fn created_table(ddl: &str) -> Option<(Option<String>, String)> {
    let header = parse_header(ddl).ok()?;
    Some((
        header.schema.map(str::to_string),
        header.table.to_string(),
    ))
}

/// Table identifier span of a `CREATE TABLE` header.
struct Header<'a> {
    schema: Option<&'a str>,
    table: &'a str,
    name_start: usize,
    name_end: usize,
}

fn parse_header(ddl: &str) -> Result<Header<'_>, String> {
    let mut pos = skip_whitespace(ddl, 0);
    for keyword in ["CREATE", "TABLE"] {
        pos = match_keyword(ddl, pos, keyword)
            .ok_or_else(|| format!("expected {} in statement header", keyword))?;
        pos = skip_whitespace(ddl, pos);
    }
    if let Some(after) = match_keywords(ddl, pos, &["IF", "NOT", "EXISTS"]) {
        pos = after;
    }

    let name_start = pos;
    let (mut table, mut name_end) =
        read_identifier(ddl, pos).ok_or_else(|| "missing table name".to_string())?;
    let mut schema = None;
    while ddl[name_end..].starts_with('.') {
        let (part, end) = read_identifier(ddl, name_end + 1)
            .ok_or_else(|| "malformed qualified table name".to_string())?;
        schema = Some(table);
        table = part;
        name_end = end;
    }

    Ok(Header {
        schema,
        table,
        name_start,
        name_end,
    })
}

fn skip_whitespace(s: &str, pos: usize) -> usize {
    let rest = &s[pos..];
    pos + (rest.len() - rest.trim_start().len())
}

fn match_keyword(s: &str, pos: usize, keyword: &str) -> Option<usize> {
    let end = pos + keyword.len();
    let word = s.get(pos..end)?;
    if !word.eq_ignore_ascii_case(keyword) {
        return None;
    }
    match s[end..].chars().next() {
        None => Some(end),
        Some(c) if c.is_whitespace() || c == '`' => Some(end),
        Some(_) => None,
    }
}

fn match_keywords(s: &str, pos: usize, keywords: &[&str]) -> Option<usize> {
    let mut pos = pos;
    for keyword in keywords {
        pos = skip_whitespace(s, match_keyword(s, pos, keyword)?);
    }
    Some(pos)
}

fn read_identifier(s: &str, pos: usize) -> Option<(&str, usize)> {
    let rest = s.get(pos..)?;
    if let Some(quoted) = rest.strip_prefix('`') {
        let close = quoted.find('`')?;
        // opening tick + name + closing tick
        return Some((&quoted[..close], pos + close + 2));
    }
    let len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    Some((&rest[..len], pos + len))
}
