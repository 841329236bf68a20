use calcwatch_common::{Job, JobStatus, ServerRecord, Settings};
use calcwatch_core::{DisplayEvent, ReconcileReport};

fn status_text(status: &JobStatus) -> String {
    match status {
        JobStatus::Pending => status.label().to_string(),
        JobStatus::Completed(result) => format!("= {result}"),
        JobStatus::Failed(error) => format!("{}: {error}", status.label()),
    }
}

fn job_line(job: &Job) -> String {
    format!(
        "  {:<8} {:<30} {}",
        job.id,
        job.expression,
        status_text(&job.status)
    )
}

fn server_line(record: &ServerRecord) -> String {
    let load = record
        .load
        .map(|l| format!("{}/{}", l.current, l.max))
        .unwrap_or_default();
    format!(
        "  {:<13} {:<35} {:<7} {}",
        record.kind.label(),
        record.url,
        load,
        record.detail
    )
}

pub fn print_jobs(jobs: &[Job]) {
    println!("\n=== Jobs ===");
    if jobs.is_empty() {
        println!("  (No jobs)");
    } else {
        println!("  {:<8} {:<30} {}", "ID", "Expression", "Status");
        for job in jobs {
            println!("{}", job_line(job));
        }
    }
    println!();
}

pub fn print_servers(servers: &[ServerRecord]) {
    println!("\n=== Servers ===");
    if servers.is_empty() {
        println!("  (No servers reported)");
    } else {
        println!(
            "  {:<13} {:<35} {:<7} {}",
            "Kind", "URL", "Load", "Status"
        );
        for record in servers {
            println!("{}", server_line(record));
        }
    }
    println!();
}

pub fn print_report(report: &ReconcileReport) {
    println!(
        "polled {}: {} completed, {} failed, {} still pending, {} errors",
        report.polled, report.completed, report.failed, report.still_pending, report.errors
    );
}

pub fn print_settings(settings: &Settings) {
    let show = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
    let d = settings.durations;
    println!("\n=== Settings ===");
    println!("  {:<24} {}", "addition", show(d.add));
    println!("  {:<24} {}", "subtraction", show(d.subtract));
    println!("  {:<24} {}", "multiplication", show(d.multiply));
    println!("  {:<24} {}", "division", show(d.divide));
    println!(
        "  {:<24} {}s",
        "inactive server time", settings.inactivity_timeout_secs
    );
    println!();
}

/// One line per display event, as printed by `watch`.
pub fn event_line(event: &DisplayEvent) -> String {
    match event {
        DisplayEvent::JobAdded(job) => format!("+ job{}", job_line(job)),
        DisplayEvent::JobUpdated(job) => format!("~ job{}", job_line(job)),
        DisplayEvent::JobRejected {
            expression,
            message,
        } => format!("! {expression}: {message}"),
        DisplayEvent::JobsCleared => "- all jobs cleared".to_string(),
        DisplayEvent::JobsReplaced(jobs) => format!("= {} jobs loaded", jobs.len()),
        DisplayEvent::HealthCleared => "# refreshing server health".to_string(),
        DisplayEvent::ServerObserved(record) => format!("# server{}", server_line(record)),
        DisplayEvent::StaleServersEvicted(records) => {
            let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
            format!("- evicted {}", urls.join(", "))
        }
    }
}
