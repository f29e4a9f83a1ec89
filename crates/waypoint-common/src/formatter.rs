use crate::protocol::{ElementRecord, ExecutionStatus, StepRecord};

/// Field names whose typed values should never be echoed back.
const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "cvv",
    "ssn",
    "card_number",
    "credit_card",
];

/// Preview length for element labels in listings.
const LABEL_PREVIEW: usize = 100;

/// e.g. `button/button "Create Project" @ (120,40) 96x32`
pub fn format_element(el: &ElementRecord) -> String {
    let kind = match el.role.as_deref() {
        Some(role) if !role.is_empty() => format!("{}/{}", el.tag, role),
        _ => el.tag.clone(),
    };
    format!(
        "{} {:?} @ ({:.0},{:.0}) {:.0}x{:.0}",
        kind,
        preview(el.display_label(), LABEL_PREVIEW),
        el.rect.x,
        el.rect.y,
        el.rect.width,
        el.rect.height
    )
}

/// Ranked listing, best first.
pub fn format_candidates<'a>(ranked: impl IntoIterator<Item = (f64, &'a ElementRecord)>) -> String {
    let mut output = String::new();
    for (idx, (score, el)) in ranked.into_iter().enumerate() {
        output.push_str(&format!("{:>2}. {:.3} | {}\n", idx + 1, score, format_element(el)));
    }
    if output.is_empty() {
        output.push_str("no candidates\n");
    }
    output
}

pub fn format_step_record(record: &StepRecord) -> String {
    let verdict = if record.verified { "pass" } else { "fail" };
    let mut output = format!(
        "[{}] {} -> {} ({})",
        record.step_id,
        mask_sensitive_log(&record.intent),
        record.executor_status,
        verdict
    );

    if let Some(meta) = &record.executor_meta {
        output.push_str(&format!(" action={}", meta.action));
        if let Some(label) = &meta.label {
            output.push_str(&format!(" label={:?}", label));
        }
        if let Some(err) = &meta.error {
            output.push_str(&format!(" error={:?}", err));
        }
    }

    if let Some(recovery) = &record.recovery {
        let outcome = if recovery.recovered {
            "recovered"
        } else {
            "exhausted"
        };
        output.push_str(&format!(
            " [{} after {} attempt(s)]",
            outcome, recovery.attempts_used
        ));
    }

    output
}

pub fn format_run(records: &[StepRecord]) -> String {
    let mut output = String::new();
    for record in records {
        output.push_str(&format_step_record(record));
        output.push('\n');
    }

    let verified = records.iter().filter(|r| r.verified).count();
    let skipped = records
        .iter()
        .filter(|r| r.executor_status == ExecutionStatus::SkippedNoElement)
        .count();
    output.push_str(&format!(
        "\n# {} step(s): {} verified, {} skipped, {} failed\n",
        records.len(),
        verified,
        skipped,
        records.len().saturating_sub(verified + skipped)
    ));
    output
}

/// Masks the quoted part of a line that talks about a sensitive field,
/// e.g. `Fill password with 'hunter2'`.
pub fn mask_sensitive_log(log: &str) -> String {
    let lower_log = log.to_lowercase();
    if !DEFAULT_SENSITIVE_FIELDS
        .iter()
        .any(|key| lower_log.contains(key))
    {
        return log.to_string();
    }

    let mut masked = log.to_string();
    if let Some(start) = masked.find(['\'', '"'])
        && let Some(quote) = masked[start..].chars().next()
        && let Some(len) = masked[start + 1..].rfind(quote)
    {
        masked.replace_range(start + 1..start + 1 + len, "********");
    }
    masked
}

fn preview(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max).collect();
        format!("{}…", cut)
    }
}
