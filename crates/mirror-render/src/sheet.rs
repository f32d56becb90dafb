//! Spreadsheet documents to Markdown tables.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Workbook {
    #[serde(default)]
    data: Vec<Sheet>,
}

#[derive(Debug, Deserialize)]
struct Sheet {
    #[serde(default)]
    name: String,
    #[serde(default)]
    table: Vec<Vec<Value>>,
}

/// Convert a serialized workbook into Markdown.
///
/// Every sheet becomes a table whose first row is the header. With more than
/// one sheet, each table is preceded by a `## <name>` heading. Empty sheets
/// are dropped.
///
/// # Errors
///
/// Returns the parse error if `body_sheet` is not a workbook.
pub fn sheet_to_markdown(body_sheet: &str) -> Result<String, serde_json::Error> {
    let workbook: Workbook = serde_json::from_str(body_sheet)?;
    let headed = workbook.data.len() > 1;

    let sections: Vec<String> = workbook
        .data
        .iter()
        .filter(|sheet| !sheet.table.is_empty())
        .map(|sheet| render_sheet(sheet, headed))
        .collect();

    Ok(sections.join("\n\n"))
}

fn render_sheet(sheet: &Sheet, headed: bool) -> String {
    let mut lines = Vec::with_capacity(sheet.table.len() + 2);
    if headed {
        lines.push(format!("## {}\n", sheet.name));
    }

    for (index, row) in sheet.table.iter().enumerate() {
        let cells: Vec<String> = row.iter().map(cell_text).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
        if index == 0 {
            lines.push(format!("| {} |", vec!["---"; row.len()].join(" | ")));
        }
    }

    lines.join("\n")
}

fn cell_text(cell: &Value) -> String {
    let text = match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    text.replace('|', "\\|")
}
