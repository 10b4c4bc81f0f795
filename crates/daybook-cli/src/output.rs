use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let render = |cells: Vec<String>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.iter().map(|h| h.to_string()).collect()));
    println!("{}", render(widths.iter().map(|&w| "-".repeat(w)).collect()));
    for row in rows {
        println!("{}", render(row));
    }
}

/// `[x]` for completed, `[-]` for skipped, `[~]` for in progress.
pub fn check_mark(status: daybook_core::types::ProgressStatus) -> &'static str {
    use daybook_core::types::ProgressStatus;
    match status {
        ProgressStatus::Completed => "[x]",
        ProgressStatus::Skipped => "[-]",
        ProgressStatus::InProgress => "[~]",
        ProgressStatus::NotStarted => "[ ]",
    }
}
