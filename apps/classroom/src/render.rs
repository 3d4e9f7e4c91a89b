use std::fmt::Write as _;

use session_engine::{BoardView, DisplayState, SessionRow};
use shared::protocol::{AccountSummary, ListPage};

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn color_name(display: &DisplayState) -> String {
    format!("{:?}", display.color_tag).to_lowercase()
}

pub fn display_state(display: &DisplayState) -> String {
    let mut out = String::new();
    let minutes = display
        .minutes_until_start
        .map_or_else(|| "-".to_string(), |minutes| minutes.to_string());
    let _ = writeln!(out, "phase:          {}", display.phase.as_str());
    let _ = writeln!(out, "label:          {}", display.label);
    let _ = writeln!(out, "color:          {}", color_name(display));
    let _ = writeln!(out, "can join:       {}", yes_no(display.can_join));
    let _ = writeln!(out, "can register:   {}", yes_no(display.can_register));
    let _ = writeln!(out, "meeting link:   {}", yes_no(display.show_meeting_link));
    let _ = writeln!(out, "minutes until:  {minutes}");
    out
}

fn session_line(row: &SessionRow) -> String {
    let mut line = format!(
        "{:>6}  {}  {:<20}  {}",
        row.session.id.0,
        row.session.scheduled_at.format("%Y-%m-%d %H:%M"),
        row.display.label,
        row.session.title,
    );
    if row.display.show_meeting_link {
        if let Some(url) = row.session.meeting_url() {
            let _ = write!(line, "  <{url}>");
        }
    }
    line
}

pub fn board(view: &BoardView) -> String {
    let mut out = String::new();
    let counts = &view.counts;
    let _ = writeln!(
        out,
        "upcoming {}  live {}  ended {}  cancelled {}  (as of {})",
        counts.upcoming,
        counts.live,
        counts.ended,
        counts.cancelled,
        view.evaluated_at.format("%Y-%m-%d %H:%M UTC"),
    );
    if view.rows.is_empty() {
        let _ = writeln!(out, "no sessions");
        return out;
    }
    for row in &view.rows {
        let _ = writeln!(out, "{}", session_line(row));
    }
    let _ = writeln!(
        out,
        "page {} of {} ({} sessions)",
        view.page,
        view.total_pages.max(1),
        view.total_rows
    );
    out
}

pub fn accounts(page: &ListPage<AccountSummary>) -> String {
    let mut out = String::new();
    if page.items.is_empty() {
        let _ = writeln!(out, "no accounts");
    }
    for account in &page.items {
        let name = account.display_name.as_deref().unwrap_or(&account.username);
        let _ = writeln!(
            out,
            "{:>6}  {:<10}  {:<8}  {}",
            account.id.0,
            account.role.as_str(),
            account.status.as_str(),
            name
        );
    }
    let _ = writeln!(
        out,
        "page {} of {} ({} accounts)",
        page.current_page,
        page.total_pages.max(1),
        page.total_count
    );
    out
}
