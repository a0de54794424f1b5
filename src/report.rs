use crate::filter::{FilterSet, SelfTestReport};
use crate::loan::LoanRecord;
use crate::notes::{NoteSummary, OwnedNote};
use crate::planner::OrderPlan;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, Table};
use std::fmt::Write as _;

pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Format a filter self-test as text
pub fn format_self_test(report: &SelfTestReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!(
            "Tested {} filter(s) against {} loan(s)",
            report.results.len(),
            report.loans_tested
        )
        .bold()
    );

    let mut table = create_styled_table(&["#", "Filter", "Type", "Pass", "Fail", "Errors", "Status"]);
    for (index, result) in report.results.iter().enumerate() {
        let status = if result.parse_error.is_some() {
            Cell::new("INVALID").fg(Color::Red)
        } else if result.always_fails {
            Cell::new("REJECTS ALL").fg(Color::Red)
        } else if result.errors > 0 {
            Cell::new("ERRORS").fg(Color::Yellow)
        } else {
            Cell::new("OK").fg(Color::Green)
        };
        table.add_row(vec![
            Cell::new(index + 1),
            Cell::new(&result.filter),
            Cell::new(result.polarity),
            Cell::new(result.passed),
            Cell::new(result.failed),
            Cell::new(result.errors),
            status,
        ]);
    }
    let _ = writeln!(out, "{table}");

    for result in report.suspicious() {
        let reason = match &result.parse_error {
            Some(err) => format!("does not parse: {err}"),
            None => "rejected every loan".to_string(),
        };
        let _ = writeln!(
            out,
            "{}",
            format!("Warning: filter ({}) {}", result.filter, reason)
                .yellow()
                .bold()
        );
    }
    out
}

pub fn display_self_test(report: &SelfTestReport) {
    print!("{}", format_self_test(report));
}

/// Format the loans that survived filtering, with per-filter counters
pub fn format_selection(loans: &[LoanRecord], filters: &FilterSet) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}",
        format!("{} loan(s) pass filters", loans.len()).green().bold()
    );
    for loan in loans {
        let _ = writeln!(out);
        let _ = writeln!(out, "{loan}");
        let _ = writeln!(out, "Quality: {}", loan.quality());
    }

    if !filters.is_empty() {
        let _ = writeln!(out);
        let mut table = create_styled_table(&["Filter", "Type", "Pass", "Fail"]);
        for filter in filters {
            table.add_row(vec![
                Cell::new(filter),
                Cell::new(filter.polarity()),
                Cell::new(filter.pass_count()),
                Cell::new(filter.fail_count()),
            ]);
        }
        let _ = writeln!(out, "{table}");
    }
    out
}

/// Format an order plan and an optional top-up transfer
pub fn format_plan(plan: &OrderPlan, transfer: Option<f64>) -> String {
    let mut out = String::new();
    if plan.is_empty() {
        let _ = writeln!(out, "{}", "No loans to order".yellow());
    } else {
        let _ = writeln!(
            out,
            "{}",
            format!(
                "{} order(s), ${:.2} total",
                plan.orders.len(),
                plan.total_amount()
            )
            .green()
            .bold()
        );
        let mut table = create_styled_table(&["Loan", "Amount", "Portfolio"]);
        for order in &plan.orders {
            table.add_row(vec![
                Cell::new(&order.loan_id),
                Cell::new(format!("{:.2}", order.requested_amount)),
                Cell::new(order.portfolio_id.as_deref().unwrap_or("-")),
            ]);
        }
        let _ = writeln!(out, "{table}");
    }

    match transfer {
        Some(amount) => {
            let _ = writeln!(out, "Top-up transfer needed: ${amount:.2}");
        }
        None => {
            let _ = writeln!(out, "No top-up transfer needed");
        }
    }
    out
}

/// Format the owned-note status summary
pub fn format_note_summary(summary: &NoteSummary) -> String {
    let mut out = String::new();
    let rate = match summary.average_rate {
        Some(rate) => format!("{rate:.2}%"),
        None => "-".to_string(),
    };
    let _ = writeln!(
        out,
        "{}",
        format!(
            "{} note(s) owned at an average interest rate of {}",
            summary.counted, rate
        )
        .bold()
    );

    let mut table = create_styled_table(&["Status", "Notes"]);
    table.add_row(vec![Cell::new("Open"), Cell::new(summary.open)]);
    table.add_row(vec![Cell::new("Current"), Cell::new(summary.current)]);
    if summary.include_closed {
        table.add_row(vec![Cell::new("Closed"), Cell::new(summary.closed)]);
    }
    let late = if summary.late > 0 {
        Cell::new(summary.late).fg(Color::Red)
    } else {
        Cell::new(summary.late)
    };
    table.add_row(vec![Cell::new("Late"), late]);
    table.add_row(vec![Cell::new("In review"), Cell::new(summary.in_review)]);
    let _ = writeln!(out, "{table}");

    let letters: Vec<String> = summary.grades.keys().map(char::to_string).collect();
    let mut headers = vec!["Grade"];
    headers.extend(letters.iter().map(String::as_str));
    let mut table = create_styled_table(&headers);
    let mut row = vec![Cell::new("Notes")];
    row.extend(summary.grades.values().map(Cell::new));
    table.add_row(row);
    let _ = writeln!(out, "{table}");
    out
}

/// Format the notes that are no longer current
pub fn format_late_notes(notes: &[&OwnedNote]) -> String {
    let mut out = String::new();
    let header = format!("{} late note(s)", notes.len());
    if notes.is_empty() {
        let _ = writeln!(out, "{}", header.green().bold());
        return out;
    }
    let _ = writeln!(out, "{}", header.red().bold());

    let mut table = create_styled_table(&["Loan", "Note", "Status", "Grade", "Rate"]);
    for note in notes {
        table.add_row(vec![
            Cell::new(note.loan_id.as_deref().unwrap_or("-")),
            Cell::new(note.note_id.as_deref().unwrap_or("-")),
            Cell::new(note.loan_status.as_deref().unwrap_or("-")).fg(Color::Red),
            Cell::new(note.grade.as_deref().unwrap_or("-")),
            Cell::new(match note.interest_rate {
                Some(rate) => format!("{rate:.2}%"),
                None => "-".to_string(),
            }),
        ]);
    }
    let _ = writeln!(out, "{table}");
    out
}
