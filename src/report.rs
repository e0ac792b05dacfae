use chrono::{DateTime, Utc};

use crate::call_models::CallRecord;

/// Rendered notification bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub text: String,
    pub html: String,
}

/// Format a millisecond duration as `"{minutes}m {seconds}s"`.
pub fn format_duration_ms(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}m {}s", total_seconds / 60, total_seconds % 60)
}

/// Format a dollar amount with two decimals.
pub fn format_cost(value: f64) -> String {
    format!("${:.2}", value)
}

fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the canonical record into plain-text and HTML summaries.
///
/// Pure: identical records produce byte-identical output. Sections render in
/// fixed order and are omitted entirely when their source data is absent.
pub fn render(record: &CallRecord) -> Report {
    Report {
        text: render_text(record),
        html: render_html(record),
    }
}

fn render_text(record: &CallRecord) -> String {
    let mut out = String::new();

    // Header
    out.push_str("Call Summary\n");
    out.push_str("============\n\n");
    out.push_str(&format!("Call ID: {}\n", record.id));
    out.push_str(&format!("Status: {}\n", record.status));
    if let Some(ref from) = record.from {
        out.push_str(&format!("From: {}\n", from));
    }
    if let Some(ref to) = record.to {
        out.push_str(&format!("To: {}\n", to));
    }
    if let Some(ms) = record.duration_ms {
        out.push_str(&format!("Duration: {}\n", format_duration_ms(ms)));
    }
    if let Some(ref start) = record.start_time {
        out.push_str(&format!("Started: {}\n", format_timestamp(start)));
    }
    if let Some(ref end) = record.end_time {
        out.push_str(&format!("Ended: {}\n", format_timestamp(end)));
    }
    if let Some(ref reason) = record.disconnection_reason {
        out.push_str(&format!("Disconnection Reason: {}\n", reason));
    }
    if let Some(ref summary) = record.summary {
        out.push_str(&format!("Summary: {}\n", summary));
    }

    if let Some(ref analysis) = record.analysis {
        out.push_str("\nAnalysis\n--------\n");
        if let Some(ref summary) = analysis.summary {
            out.push_str(&format!("Summary: {}\n", summary));
        }
        if let Some(ref sentiment) = analysis.sentiment {
            out.push_str(&format!("Sentiment: {}\n", sentiment));
        }
        if let Some(successful) = analysis.successful {
            out.push_str(&format!(
                "Successful: {}\n",
                if successful { "yes" } else { "no" }
            ));
        }
        if let Some(in_voicemail) = analysis.in_voicemail {
            out.push_str(&format!(
                "Voicemail: {}\n",
                if in_voicemail { "yes" } else { "no" }
            ));
        }
    }

    if let Some(ref cost) = record.cost {
        out.push_str("\nCost\n----\n");
        if let Some(total) = cost.combined_cost {
            out.push_str(&format!("Total: {}\n", format_cost(total)));
        }
        if let Some(unit) = cost.duration_unit_price {
            out.push_str(&format!("Duration unit price: {}\n", format_cost(unit)));
        }
        for product in &cost.product_costs {
            out.push_str(&format!(
                "- {}: {}\n",
                product.product,
                format_cost(product.cost)
            ));
        }
    }

    if !record.logs.is_empty() {
        out.push_str("\nLogs\n----\n");
        for entry in &record.logs {
            match &entry.timestamp {
                Some(ts) => out.push_str(&format!("[{}] {}\n", ts, entry.message)),
                None => out.push_str(&format!("{}\n", entry.message)),
            }
        }
    }

    if !record.metadata.is_empty() {
        out.push_str("\nMetadata\n--------\n");
        for (key, value) in &record.metadata {
            out.push_str(&format!("{}: {}\n", key, value));
        }
    }

    if let Some(ref transcript) = record.transcript {
        out.push_str("\nTranscript\n----------\n");
        out.push_str(transcript);
        out.push('\n');
    }

    if let Some(ref url) = record.recording_url {
        out.push_str(&format!("\nRecording: {}\n", url));
    }

    out
}

fn render_html(record: &CallRecord) -> String {
    let mut out = String::new();

    out.push_str("<html><body>\n");
    out.push_str("<h2>Call Summary</h2>\n<ul>\n");
    out.push_str(&format!("<li><b>Call ID:</b> {}</li>\n", escape_html(&record.id)));
    out.push_str(&format!(
        "<li><b>Status:</b> {}</li>\n",
        escape_html(&record.status)
    ));
    if let Some(ref from) = record.from {
        out.push_str(&format!("<li><b>From:</b> {}</li>\n", escape_html(from)));
    }
    if let Some(ref to) = record.to {
        out.push_str(&format!("<li><b>To:</b> {}</li>\n", escape_html(to)));
    }
    if let Some(ms) = record.duration_ms {
        out.push_str(&format!(
            "<li><b>Duration:</b> {}</li>\n",
            format_duration_ms(ms)
        ));
    }
    if let Some(ref start) = record.start_time {
        out.push_str(&format!(
            "<li><b>Started:</b> {}</li>\n",
            format_timestamp(start)
        ));
    }
    if let Some(ref end) = record.end_time {
        out.push_str(&format!(
            "<li><b>Ended:</b> {}</li>\n",
            format_timestamp(end)
        ));
    }
    if let Some(ref reason) = record.disconnection_reason {
        out.push_str(&format!(
            "<li><b>Disconnection Reason:</b> {}</li>\n",
            escape_html(reason)
        ));
    }
    if let Some(ref summary) = record.summary {
        out.push_str(&format!(
            "<li><b>Summary:</b> {}</li>\n",
            escape_html(summary)
        ));
    }
    out.push_str("</ul>\n");

    if let Some(ref analysis) = record.analysis {
        out.push_str("<h3>Analysis</h3>\n<ul>\n");
        if let Some(ref summary) = analysis.summary {
            out.push_str(&format!(
                "<li><b>Summary:</b> {}</li>\n",
                escape_html(summary)
            ));
        }
        if let Some(ref sentiment) = analysis.sentiment {
            out.push_str(&format!(
                "<li><b>Sentiment:</b> {}</li>\n",
                escape_html(sentiment)
            ));
        }
        if let Some(successful) = analysis.successful {
            out.push_str(&format!(
                "<li><b>Successful:</b> {}</li>\n",
                if successful { "yes" } else { "no" }
            ));
        }
        if let Some(in_voicemail) = analysis.in_voicemail {
            out.push_str(&format!(
                "<li><b>Voicemail:</b> {}</li>\n",
                if in_voicemail { "yes" } else { "no" }
            ));
        }
        out.push_str("</ul>\n");
    }

    if let Some(ref cost) = record.cost {
        out.push_str("<h3>Cost</h3>\n<ul>\n");
        if let Some(total) = cost.combined_cost {
            out.push_str(&format!("<li><b>Total:</b> {}</li>\n", format_cost(total)));
        }
        if let Some(unit) = cost.duration_unit_price {
            out.push_str(&format!(
                "<li><b>Duration unit price:</b> {}</li>\n",
                format_cost(unit)
            ));
        }
        for product in &cost.product_costs {
            out.push_str(&format!(
                "<li>{}: {}</li>\n",
                escape_html(&product.product),
                format_cost(product.cost)
            ));
        }
        out.push_str("</ul>\n");
    }

    if !record.logs.is_empty() {
        out.push_str("<h3>Logs</h3>\n<ul>\n");
        for entry in &record.logs {
            match &entry.timestamp {
                Some(ts) => out.push_str(&format!(
                    "<li>[{}] {}</li>\n",
                    escape_html(ts),
                    escape_html(&entry.message)
                )),
                None => out.push_str(&format!("<li>{}</li>\n", escape_html(&entry.message))),
            }
        }
        out.push_str("</ul>\n");
    }

    if !record.metadata.is_empty() {
        out.push_str("<h3>Metadata</h3>\n<ul>\n");
        for (key, value) in &record.metadata {
            out.push_str(&format!(
                "<li><b>{}:</b> {}</li>\n",
                escape_html(key),
                escape_html(value)
            ));
        }
        out.push_str("</ul>\n");
    }

    if let Some(ref transcript) = record.transcript {
        out.push_str("<h3>Transcript</h3>\n");
        out.push_str(&format!("<pre>{}</pre>\n", escape_html(transcript)));
    }

    if let Some(ref url) = record.recording_url {
        out.push_str(&format!(
            "<p><a href=\"{}\">Call recording</a></p>\n",
            escape_html(url)
        ));
    }

    out.push_str("</body></html>\n");
    out
}
