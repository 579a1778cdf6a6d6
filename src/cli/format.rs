//! Output formatting for CLI listings
//!
//! Rows are JSON objects; a listing picks the requested fields out of each
//! row and renders them as an aligned table, JSON or CSV.

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

pub type Row = Map<String, Value>;

/// Requested fields, or `defaults`; unknown names are rejected
pub fn select_fields(
    requested: &[String],
    defaults: &[&str],
    available: &[&str],
) -> Result<Vec<String>> {
    if requested.is_empty() {
        return Ok(defaults.iter().map(|f| f.to_string()).collect());
    }

    for field in requested {
        if !available.contains(&field.as_str()) {
            return Err(anyhow!(
                "Invalid field: {}. Available fields: {}",
                field,
                available.join(", ")
            ));
        }
    }
    Ok(requested.to_vec())
}

/// Render a list of rows
pub fn render_items(format: OutputFormat, fields: &[String], rows: &[Row]) -> Result<String> {
    match format {
        OutputFormat::Table => Ok(table(fields, rows)),
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .iter()
                .map(|row| Value::Object(pick(fields, row)))
                .collect();
            Ok(serde_json::to_string(&items)?)
        }
        OutputFormat::Csv => Ok(csv(fields, rows)),
    }
}

/// Render a single record; tables show one `Field | Value` line per field
pub fn render_item(format: OutputFormat, fields: &[String], row: &Row) -> Result<String> {
    match format {
        OutputFormat::Table => {
            let pairs: Vec<Row> = fields
                .iter()
                .map(|field| {
                    let mut pair = Row::new();
                    pair.insert("Field".to_string(), Value::String(field.clone()));
                    pair.insert(
                        "Value".to_string(),
                        row.get(field).cloned().unwrap_or(Value::Null),
                    );
                    pair
                })
                .collect();
            Ok(table(&["Field".to_string(), "Value".to_string()], &pairs))
        }
        OutputFormat::Json => Ok(serde_json::to_string(&Value::Object(pick(fields, row)))?),
        OutputFormat::Csv => Ok(csv(fields, std::slice::from_ref(row))),
    }
}

fn pick(fields: &[String], row: &Row) -> Row {
    fields
        .iter()
        .map(|field| (field.clone(), row.get(field).cloned().unwrap_or(Value::Null)))
        .collect()
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn table(fields: &[String], rows: &[Row]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| fields.iter().map(|f| cell(row.get(f))).collect())
        .collect();

    let widths: Vec<usize> = fields
        .iter()
        .enumerate()
        .map(|(i, field)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(field.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let border = format!(
        "+{}+",
        widths
            .iter()
            .map(|w| "-".repeat(w + 2))
            .collect::<Vec<_>>()
            .join("+")
    );
    let line = |values: &[String]| {
        let padded: Vec<String> = values
            .iter()
            .zip(&widths)
            .map(|(v, w)| format!(" {}{} ", v, " ".repeat(w - v.chars().count())))
            .collect();
        format!("|{}|", padded.join("|"))
    };

    let mut out = vec![border.clone(), line(fields), border.clone()];
    out.extend(cells.iter().map(|r| line(r.as_slice())));
    out.push(border);
    out.join("\n")
}

fn csv(fields: &[String], rows: &[Row]) -> String {
    let mut out = vec![fields.iter().map(|f| csv_field(f)).collect::<Vec<_>>().join(",")];
    for row in rows {
        out.push(
            fields
                .iter()
                .map(|f| csv_field(&cell(row.get(f))))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    out.join("\n")
}

/// RFC 4180 quoting
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_select_fields() {
        let available = ["group", "path", "match", "query"];
        assert_eq!(
            select_fields(&[], &["group", "path"], &available).unwrap(),
            vec!["group", "path"]
        );
        assert_eq!(
            select_fields(&fields(&["query"]), &["group"], &available).unwrap(),
            vec!["query"]
        );
        assert!(select_fields(&fields(&["nope"]), &["group"], &available).is_err());
    }

    #[test]
    fn test_table_aligns_columns() {
        let rows = vec![
            row(json!({"group": "Tags", "path": "/tag/hello/"})),
            row(json!({"group": "Categories", "path": "/category/x/"})),
        ];
        let out = render_items(OutputFormat::Table, &fields(&["group", "path"]), &rows).unwrap();
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[1], "| group      | path         |");
        assert_eq!(lines[3], "| Tags       | /tag/hello/  |");
        assert!(lines.iter().all(|l| l.chars().count() == lines[0].chars().count()));
    }

    #[test]
    fn test_json_keeps_only_fields() {
        let rows = vec![row(json!({"group": "Tags", "path": "/tag/hello/", "match": null}))];
        let out = render_items(OutputFormat::Json, &fields(&["path", "match"]), &rows).unwrap();
        assert_eq!(out, r#"[{"path":"/tag/hello/","match":null}]"#);
    }

    #[test]
    fn test_json_follows_field_order() {
        let item = row(json!({"coverage": "42%", "errors": 0, "status": "Passing"}));
        let out = render_item(
            OutputFormat::Json,
            &fields(&["status", "errors", "coverage"]),
            &item,
        )
        .unwrap();
        assert_eq!(out, r#"{"status":"Passing","errors":0,"coverage":"42%"}"#);
    }

    #[test]
    fn test_csv_quotes() {
        let rows = vec![row(json!({"a": "x,y", "b": "say \"hi\"", "c": 3}))];
        let out = render_items(OutputFormat::Csv, &fields(&["a", "b", "c"]), &rows).unwrap();
        assert_eq!(out, "a,b,c\n\"x,y\",\"say \"\"hi\"\"\",3");
    }

    #[test]
    fn test_single_item_table() {
        let summary = row(json!({"status": "Passing", "errors": 0, "coverage": "42%"}));
        let out =
            render_item(OutputFormat::Table, &fields(&["status", "coverage"]), &summary).unwrap();
        assert!(out.contains("| status   | Passing |"));
        assert!(out.contains("| coverage | 42%     |"));
    }
}
