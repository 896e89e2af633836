// src/runner.rs
//! Run every task for one snapshot date and assemble the final record set.
//!
//! Tasks are claimed from a shared work index by a small pool of worker
//! threads. A task's failure (error, invalid row, panic, missed deadline) only
//! costs that task's rows and adds one [`ErrorRecord`]; the run always
//! completes. Results are put back in registration order before anything is
//! merged, so output order never depends on scheduling.

use std::{
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread,
    time::Duration,
};

use chrono::NaiveDate;

use crate::{
    aggregate::rollup,
    config::options::{today, ScrapeOptions},
    errors::TaskError,
    fetch::{DomainGate, Fetch},
    geography::{backfill, Gazetteer},
    normalize::{derive_active, normalize},
    progress::Progress,
    record::Record,
    report::{ErrorRecord, Report},
    task::{select_implementation, RawResult, Task, TaskContext},
    validate::validate_all,
};

/// Records and report of one finished run.
#[derive(Clone, Debug)]
pub struct Run {
    pub date: NaiveDate,
    pub records: Vec<Record>,
    pub report: Report,
}

type Outcome = Result<Vec<Record>, TaskError>;

pub fn run(
    tasks: Vec<Task>,
    snapshot_date: NaiveDate,
    fetch: Arc<dyn Fetch>,
    opts: &ScrapeOptions,
    mut progress: Option<&mut dyn Progress>,
) -> Run {
    let total = tasks.len();
    logf!("Scraping data for {}", snapshot_date.format("%Y-%m-%d"));
    if let Some(p) = progress.as_deref_mut() {
        p.begin(total);
    }

    let tasks = Arc::new(tasks);
    let counter = Arc::new(AtomicUsize::new(0));
    let gate = Arc::new(DomainGate::default());
    let (res_tx, res_rx) = mpsc::channel::<(usize, Outcome)>();
    let today = today();

    let workers = opts.workers.min(total).max(1);
    for _ in 0..workers {
        let tasks = Arc::clone(&tasks);
        let idx = Arc::clone(&counter);
        let gate = Arc::clone(&gate);
        let fetch = Arc::clone(&fetch);
        let tx = res_tx.clone();
        let (deadline, pause) = (opts.task_timeout, opts.request_pause);

        thread::spawn(move || loop {
            let i = idx.fetch_add(1, Ordering::Relaxed);
            if i >= tasks.len() {
                break;
            }
            let task = &tasks[i];
            let ctx = TaskContext::new(task.name(), snapshot_date, today, Arc::clone(&fetch))
                .with_gate(Arc::clone(&gate));
            let outcome = execute(task, ctx, deadline)
                .and_then(|(raw, used_url)| process(task, raw, used_url));
            if tx.send((i, outcome)).is_err() {
                break;
            }
            if !task.sources.is_empty() {
                thread::sleep(pause); // be polite
            }
        });
    }
    drop(res_tx); // main thread is sole receiver now

    let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
    for (i, outcome) in res_rx {
        let name = tasks[i].name();
        match &outcome {
            Ok(rows) => {
                logd!("{name}: {} rows", rows.len());
                if let Some(p) = progress.as_deref_mut() {
                    p.task_done(&name, rows.len());
                }
            }
            Err(e) => {
                loge!("Error processing {name}: {e}");
                if let Some(p) = progress.as_deref_mut() {
                    p.task_failed(&name, e);
                }
            }
        }
        slots[i] = Some(outcome);
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();
    for (task, slot) in tasks.iter().zip(slots) {
        let outcome = slot.unwrap_or_else(|| Err(TaskError::exec("worker exited before reporting")));
        match outcome {
            Ok(rows) => records.extend(rows),
            Err(e) => errors.push(ErrorRecord::new(task.name(), task.primary_url().map(str::to_string), &e)),
        }
    }

    derive_active(&mut records);
    let report = Report::build(&records, errors);
    report.log();
    if let Some(p) = progress.as_deref_mut() {
        p.finish();
    }
    Run { date: snapshot_date, records, report }
}

/* ---------------- One task ---------------- */

/// Run the selected implementation on its own thread so a hang or a panic
/// stays inside this task. A late result is dropped with its channel, and
/// the abandoned thread is cancelled so it issues no further fetches. A fetch
/// already in flight keeps its host permit until it returns.
fn execute(task: &Task, ctx: TaskContext, deadline: Duration) -> Result<(RawResult, Option<String>), TaskError> {
    let (key, imp) = select_implementation(task, ctx.snapshot_date);
    logd!("{}: using {key} implementation", ctx.name);
    let cancel = ctx.cancel_flag();

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let result = panic::catch_unwind(AssertUnwindSafe(|| imp.produce(&ctx)))
            .unwrap_or_else(|payload| Err(TaskError::Panicked(panic_message(payload.as_ref()))));
        let _ = tx.send(result.map(|raw| (raw, ctx.used_url())));
    });

    match rx.recv_timeout(deadline) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Release);
            Err(TaskError::Timeout(deadline))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(TaskError::Panicked(s!("task thread vanished"))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        s!("unknown panic")
    }
}

/// Validate, canonicalize, backfill, normalize and roll up one task's rows.
/// Any invalid row sinks the whole task.
pub fn process(task: &Task, raw: RawResult, used_url: Option<String>) -> Outcome {
    let rows = raw.into_rows(&task.name())?;
    validate_all(&rows)?;

    let gazetteer = Gazetteer::new(&task.known_regions);
    let rows: Vec<Record> = rows
        .into_iter()
        .map(|mut r| {
            r.county = r.county.as_ref().map(|c| gazetteer.canonicalize_county(c));
            r
        })
        .collect();
    let rows = backfill(rows, &task.known_regions);

    let url = used_url.or_else(|| task.primary_url().map(str::to_string));
    let mut rows: Vec<Record> = rows
        .into_iter()
        .map(|r| normalize(r, &task.identity, url.as_deref()))
        .collect();

    if let Some(child) = task.aggregate {
        if let Some(parent) = rollup(&rows, task.identity.level(), child) {
            rows.push(normalize(parent, &task.identity, url.as_deref()));
        }
    }
    Ok(rows)
}
