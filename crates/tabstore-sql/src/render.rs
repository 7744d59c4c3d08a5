//! Plain-text rendering of statement outcomes.

use tabstore_core::ResultSet;

use crate::session::Outcome;

const EMPTY: &str = "(no rows)";

pub fn render(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Rows(set) => render_table(set),
        Outcome::Scalar(value) => format!("{}\n", value),
        Outcome::Affected { verb, count } => format!("{} row(s) {}.\n", count, verb),
        Outcome::Message(message) => format!("{}\n", message),
        Outcome::Names { header, names } => {
            let set = ResultSet {
                columns: vec![header.to_string()],
                rows: names
                    .iter()
                    .map(|n| std::iter::once((header.to_string(), n.clone())).collect())
                    .collect(),
            };
            render_table(&set)
        }
    }
}

/// ASCII box with one column per schema column, in schema order.
pub fn render_table(set: &ResultSet) -> String {
    if set.columns.is_empty() {
        return format!("{}\n", EMPTY);
    }

    let mut widths: Vec<usize> = set.columns.iter().map(|c| c.chars().count()).collect();
    for row in &set.rows {
        for (i, col) in set.columns.iter().enumerate() {
            let len = row.get(col).map(|v| v.chars().count()).unwrap_or(0);
            widths[i] = widths[i].max(len);
        }
    }
    if set.rows.is_empty() {
        // the placeholder cell spans every column; widen the last one to fit it
        let inner = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
        if let Some(last) = widths.last_mut() {
            *last += EMPTY.len().saturating_sub(inner);
        }
    }

    let separator = {
        let mut line = String::from("+");
        for w in &widths {
            line.push_str(&"-".repeat(w + 2));
            line.push('+');
        }
        line.push('\n');
        line
    };

    let mut out = separator.clone();
    out.push_str(&render_line(set.columns.iter().map(String::as_str), &widths));
    out.push_str(&separator);

    if set.rows.is_empty() {
        let inner = widths.iter().sum::<usize>() + 3 * (widths.len() - 1);
        out.push_str(&format!("| {:<width$} |\n", EMPTY, width = inner));
        out.push_str(&separator);
        return out;
    }

    for row in &set.rows {
        let cells = set.columns.iter().map(|c| row.get(c).map(String::as_str).unwrap_or(""));
        out.push_str(&render_line(cells, &widths));
    }
    out.push_str(&separator);
    out
}

fn render_line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.zip(widths) {
        let pad = width - cell.chars().count();
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad + 1));
        line.push('|');
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabstore_core::{AggregateValue, Row};

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_render_table() {
        let set = ResultSet {
            columns: vec!["id".into(), "name".into()],
            rows: vec![row(&[("id", "1"), ("name", "Ann")]), row(&[("id", "10"), ("name", "Bo")])],
        };
        let expected = "\
+----+------+
| id | name |
+----+------+
| 1  | Ann  |
| 10 | Bo   |
+----+------+
";
        assert_eq!(render_table(&set), expected);
    }

    #[test]
    fn test_render_empty() {
        let set = ResultSet { columns: vec!["id".into(), "name".into()], rows: vec![] };
        let expected = "\
+----+------+
| id | name |
+----+------+
| (no rows) |
+----+------+
";
        assert_eq!(render_table(&set), expected);
    }

    #[test]
    fn test_render_empty_narrow_table() {
        let set = ResultSet { columns: vec!["id".into()], rows: vec![] };
        let expected = "\
+-----------+
| id        |
+-----------+
| (no rows) |
+-----------+
";
        assert_eq!(render_table(&set), expected);

        let names = render(&Outcome::Names { header: "Table", names: vec![] });
        let widths: Vec<usize> = names.lines().map(|l| l.chars().count()).collect();
        assert!(widths.iter().all(|w| *w == widths[0]));
    }

    #[test]
    fn test_render_wide_unicode() {
        let set = ResultSet {
            columns: vec!["city".into()],
            rows: vec![row(&[("city", "Zürich")])],
        };
        assert!(render_table(&set).contains("| Zürich |"));
    }

    #[test]
    fn test_render_outcomes() {
        assert_eq!(render(&Outcome::Scalar(AggregateValue::Number(2.5))), "2.50\n");
        assert_eq!(render(&Outcome::Scalar(AggregateValue::Count(3))), "3\n");
        assert_eq!(
            render(&Outcome::Affected { verb: "deleted", count: 2 }),
            "2 row(s) deleted.\n"
        );
        let names = render(&Outcome::Names { header: "Table", names: vec!["users".into()] });
        assert!(names.contains("| Table |"));
        assert!(names.contains("| users |"));
    }
}
