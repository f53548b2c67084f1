//! HTML fragments for the page regions
//!
//! Every value that can carry free text (AI explanations, conditions, job
//! types, backend messages) goes through [`escape_html`] before it is placed
//! into markup. Fragments use inline styles in the same palette as the
//! status badges.

use chrono::{DateTime, Utc};

use crate::api::{DangerLevel, JobStatus, MonitorJob, Preset, RelayEvent, SafetyCheckResult};

pub const HISTORY_EMPTY: &str = "No safety checks yet. Run a check to see results here.";
pub const JOBS_EMPTY: &str = "No monitoring jobs.";
pub const EVENTS_EMPTY: &str = "Waiting for webhook events...";

const CELL: &str = "padding: 0.5rem;";
const HEAD_CELL: &str = "padding: 0.5rem; text-align: left;";
const ROW: &str = "border-bottom: 1px solid #dee2e6;";
const HEAD_ROW: &str = "border-bottom: 2px solid #dee2e6;";

/// Escape text for inclusion in element content or a quoted attribute
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

fn badge(label: &str, color: &str, bg: &str) -> String {
    format!(
        r#"<span class="badge" style="display: inline-block; padding: 0.25em 0.6em; border-radius: 0.25rem; font-size: 0.85em; font-weight: 600; color: {}; background-color: {};">{}</span>"#,
        color,
        bg,
        escape_html(label)
    )
}

/// A colored badge: HIGH (red), MEDIUM (amber), SAFE (green), INFO (gray)
pub fn danger_badge(level: DangerLevel) -> String {
    let (color, bg) = match level {
        DangerLevel::High => ("#721c24", "#f8d7da"),
        DangerLevel::Medium => ("#856404", "#fff3cd"),
        DangerLevel::Safe => ("#155724", "#d4edda"),
        DangerLevel::Info => ("#383d41", "#e2e3e5"),
    };
    badge(&level.as_str().to_uppercase(), color, bg)
}

pub fn job_status_badge(status: JobStatus) -> String {
    let (color, bg) = match status {
        JobStatus::Running => ("#155724", "#d4edda"),
        JobStatus::Stopped => ("#721c24", "#f8d7da"),
        JobStatus::Other => ("#383d41", "#e2e3e5"),
    };
    badge(&status.to_string(), color, bg)
}

fn triggered_indicator(triggered: bool) -> &'static str {
    if triggered {
        r#"<span class="triggered" style="color: #dc3545; font-weight: 600;">&#9888; TRIGGERED</span>"#
    } else {
        r#"<span class="not-triggered" style="color: #28a745;">&#10003; Not triggered</span>"#
    }
}

/// Short UTC time for RFC 3339 timestamps, the escaped raw text otherwise
pub fn format_timestamp(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => ts
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => escape_html(raw),
    }
}

fn empty_state(message: &str) -> String {
    format!(
        r#"<p class="empty-state" style="color: #6c757d;">{}</p>"#,
        escape_html(message)
    )
}

/// Latest-result card shown after a one-shot check
pub fn render_check_result(result: &SafetyCheckResult) -> String {
    format!(
        r#"<div class="check-result danger-{level}">
    <div>{badge} {indicator}</div>
    <p class="condition"><strong>Condition:</strong> {condition}</p>
    <p class="explanation">{explanation}</p>
    <p class="meta" style="color: #6c757d;"><span class="latency">{latency}ms</span> &middot; {timestamp}</p>
</div>"#,
        level = result.danger_level.as_str(),
        badge = danger_badge(result.danger_level),
        indicator = triggered_indicator(result.triggered),
        condition = escape_html(&result.condition),
        explanation = escape_html(&result.explanation),
        latency = result.latency_ms,
        timestamp = format_timestamp(&result.timestamp),
    )
}

/// Alert history table, or the empty-state placeholder
pub fn render_history(records: &[SafetyCheckResult]) -> String {
    if records.is_empty() {
        return empty_state(HISTORY_EMPTY);
    }

    let rows: String = records
        .iter()
        .map(|r| {
            let source = r.source.as_deref().unwrap_or("check");
            format!(
                r#"<tr style="{ROW}">
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}ms</td>
    <td style="{CELL}">{}</td>
</tr>"#,
                format_timestamp(&r.timestamp),
                danger_badge(r.danger_level),
                if r.triggered { "Yes" } else { "No" },
                escape_html(&r.condition),
                escape_html(&r.explanation),
                r.latency_ms,
                escape_html(source),
            )
        })
        .collect();

    format!(
        r#"<table style="width: 100%; border-collapse: collapse;">
<thead><tr style="{HEAD_ROW}">
    <th style="{HEAD_CELL}">Time</th>
    <th style="{HEAD_CELL}">Level</th>
    <th style="{HEAD_CELL}">Triggered</th>
    <th style="{HEAD_CELL}">Condition</th>
    <th style="{HEAD_CELL}">Explanation</th>
    <th style="{HEAD_CELL}">Latency</th>
    <th style="{HEAD_CELL}">Source</th>
</tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

/// Monitoring jobs table, or a placeholder when there are none
pub fn render_jobs(jobs: &[MonitorJob]) -> String {
    if jobs.is_empty() {
        return empty_state(JOBS_EMPTY);
    }

    let rows: String = jobs
        .iter()
        .map(|job| {
            format!(
                r#"<tr style="{ROW}" data-job-id="{}">
    <td style="{CELL}"><code>{}</code></td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
    <td style="{CELL}">{}</td>
</tr>"#,
                escape_html(&job.job_id),
                escape_html(job.short_id()),
                job_status_badge(job.status),
                escape_html(&job.job_type),
                job.details.checks_performed,
                job.details.triggers_fired,
            )
        })
        .collect();

    format!(
        r#"<table style="width: 100%; border-collapse: collapse;">
<thead><tr style="{HEAD_ROW}">
    <th style="{HEAD_CELL}">Job</th>
    <th style="{HEAD_CELL}">Status</th>
    <th style="{HEAD_CELL}">Type</th>
    <th style="{HEAD_CELL}">Checks</th>
    <th style="{HEAD_CELL}">Triggers</th>
</tr></thead>
<tbody>{rows}</tbody>
</table>"#
    )
}

/// Banner naming the job a monitoring start created
pub fn render_job_banner(job_id: &str) -> String {
    format!(
        r#"<div class="job-banner" style="padding: 0.75rem; background-color: #d4edda; color: #155724; border-radius: 0.25rem;">Monitoring active &mdash; job <code>{}</code></div>"#,
        escape_html(job_id)
    )
}

/// One button per preset; the id travels in a data attribute
pub fn render_preset_buttons(presets: &[Preset]) -> String {
    presets
        .iter()
        .map(|preset| {
            let label = if preset.label.is_empty() {
                &preset.id
            } else {
                &preset.label
            };
            format!(
                r#"<button type="button" class="preset" data-preset="{id}" title="{condition}" style="margin: 0 0.25rem 0.25rem 0; border-left: 4px solid {color};">{icon} {label}</button>"#,
                id = escape_html(&preset.id),
                condition = escape_html(&preset.condition),
                color = escape_html(&preset.color),
                icon = escape_html(&preset.icon),
                label = escape_html(label),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_events_placeholder() -> String {
    empty_state(EVENTS_EMPTY)
}

/// Full relay event list, newest first as delivered by the relay
pub fn render_relay_events(events: &[RelayEvent]) -> String {
    if events.is_empty() {
        return render_events_placeholder();
    }

    events
        .iter()
        .map(|event| {
            let frame = match event.frame_src() {
                Some(src) => format!(
                    r#"<img class="frame" src="{}" alt="captured frame" style="max-width: 240px; border-radius: 0.25rem;">"#,
                    escape_html(&src)
                ),
                None => String::new(),
            };
            let condition = match event.condition.as_deref().filter(|c| !c.is_empty()) {
                Some(c) => format!(
                    r#"<p class="condition"><strong>Condition:</strong> {}</p>"#,
                    escape_html(c)
                ),
                None => String::new(),
            };
            let indicator = if event.triggered {
                triggered_indicator(true)
            } else {
                ""
            };
            format!(
                r#"<div class="event" data-event-id="{id}" style="{ROW} padding: 0.5rem 0;">
    <div>{badge} {indicator} <small style="color: #6c757d;">{timestamp}</small></div>
    {condition}<p class="explanation">{headline}</p>
    {frame}
</div>"#,
                id = escape_html(&event.id),
                badge = danger_badge(event.danger_level),
                timestamp = format_timestamp(&event.timestamp),
                headline = escape_html(&event.headline()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
