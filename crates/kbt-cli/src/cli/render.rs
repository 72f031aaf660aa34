//! Terminal output for transfer events.

use kbt_core::progress::{format_size, format_speed, format_time};
use kbt_core::{EventSink, ProgressUpdate, TransferEvent};
use std::io::Write;
use std::time::{Duration, Instant};

const PROGRESS_INTERVAL: Duration = Duration::from_millis(500);

/// One status line for a progress update.
pub fn progress_line(update: &ProgressUpdate) -> String {
    let pct = update
        .estimate
        .percentage
        .map(|p| format!("{:>3}%", p))
        .unwrap_or_else(|| "   ?".to_string());
    let size = match update.bytes_total {
        Some(total) => format!(
            "{} / {}",
            format_size(update.bytes_loaded),
            format_size(total)
        ),
        None => format_size(update.bytes_loaded),
    };
    format!(
        "  {} {}  {}  {}  ETA {}",
        update.resource_id,
        pct,
        size,
        format_speed(update.estimate.speed_bytes_per_sec),
        format_time(update.estimate.eta_secs)
    )
}

/// Prints events either as JSON lines on stdout or as a redrawn status line
/// on stderr (throttled to [`PROGRESS_INTERVAL`]).
pub struct EventPrinter {
    json: bool,
    last_draw: Option<Instant>,
    line_open: bool,
}

impl EventPrinter {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            last_draw: None,
            line_open: false,
        }
    }

    fn end_line(&mut self) {
        if self.line_open {
            eprintln!();
            self.line_open = false;
        }
    }
}

impl EventSink for EventPrinter {
    fn emit(&mut self, event: TransferEvent) {
        if self.json {
            print_json(&event);
            return;
        }
        match &event {
            TransferEvent::Started { resource_id } => eprintln!("downloading {}", resource_id),
            TransferEvent::Progress(update) => {
                let now = Instant::now();
                let due = self
                    .last_draw
                    .map_or(true, |t| now.duration_since(t) >= PROGRESS_INTERVAL);
                if due || update.estimate.percentage == Some(100) {
                    eprint!("\r{}   ", progress_line(update));
                    let _ = std::io::stderr().flush();
                    self.last_draw = Some(now);
                    self.line_open = true;
                }
            }
            TransferEvent::Retrying {
                next_attempt,
                delay_ms,
                error,
                ..
            } => {
                self.end_line();
                eprintln!(
                    "  attempt failed ({}); attempt {} in {}",
                    error,
                    next_attempt,
                    format_time(Some(*delay_ms as f64 / 1000.0))
                );
            }
            TransferEvent::Succeeded { .. }
            | TransferEvent::Failed { .. }
            | TransferEvent::Cancelled { .. } => self.end_line(),
        }
    }
}

/// Writes one event as a JSON line; events are plain data, so failure here
/// only happens on a broken stdout.
pub fn print_json(event: &TransferEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{}", line),
        Err(e) => tracing::warn!("could not encode event: {}", e),
    }
}
