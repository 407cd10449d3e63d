//! Plain-text report of a session: document text, sentiment and chat history.

use chrono::{DateTime, Local, TimeZone};

use crate::model::{ChatRole, Sentiment};
use crate::session::ChatSession;

const RULE_WIDTH: usize = 60;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Render the downloadable report for `session` as of `now`
pub fn generate_report<Tz: TimeZone>(session: &ChatSession, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let mut report: Vec<String> = Vec::new();

    if let Some(text) = session.context_text() {
        report.push(rule());
        report.push("DOCUMENT CONTENT".to_string());
        report.push(rule());
        report.push(text.to_string());
        report.push(format!("\n{}\n", rule()));
    }

    // neutral is the default label and is left out
    if session.sentiment() != Sentiment::Neutral {
        report.push(format!(
            "Document Sentiment: {}",
            session.sentiment().title()
        ));
        report.push(String::new());
    }

    if !session.messages().is_empty() {
        report.push("CHAT HISTORY".to_string());
        report.push(rule());
        for turn in session.messages() {
            let role = match turn.role {
                ChatRole::User => "USER",
                ChatRole::Assistant => "AI ASSISTANT",
                ChatRole::System => "SYSTEM",
            };
            report.push(format!("[{}]: {}", role, turn.content));
        }
        report.push(format!("\n{}", rule()));
    }

    report.push(format!(
        "\nReport generated on: {}",
        now.format("%Y-%m-%d %H:%M:%S")
    ));
    report.push("Powered by AI Document Assistant".to_string());

    report.join("\n")
}

/// Report for `session` stamped with the local time
pub fn generate_report_now(session: &ChatSession) -> String {
    generate_report(session, &Local::now())
}

/// Suggested file name, e.g. `document_report_20240131_154500.txt`
pub fn report_file_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("document_report_{}.txt", now.format("%Y%m%d_%H%M%S"))
}
