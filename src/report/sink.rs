// src/report/sink.rs
// =============================================================================
// The result sink: every CrawlResult ends up here exactly once.
//
// Each append:
// 1. logs a one-line summary of the row
// 2. stores the result in memory (for the final report)
// 3. writes a CSV row and flushes it, so a crash or Ctrl+C still leaves a
//    usable file behind
//
// All three happen under one lock, so the log, the file and the in-memory
// list always agree on row order.
// =============================================================================

use parking_lot::Mutex;
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

use super::{CrawlResult, LinkType};
use crate::audit::AuditFlags;
use crate::error::SinkError;

// Written for external rows in the diagnostic columns
const NOT_APPLICABLE: &str = "N/A";

struct SinkState {
    results: Vec<CrawlResult>,
    writer: Option<csv::Writer<File>>,
}

pub struct ResultSink {
    state: Mutex<SinkState>,
    flags: AuditFlags,
}

impl ResultSink {
    // Creates the CSV file and writes its header right away
    pub fn create(path: &Path, flags: AuditFlags) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(header(flags))?;
        writer.flush()?;
        Ok(Self {
            state: Mutex::new(SinkState {
                results: Vec::new(),
                writer: Some(writer),
            }),
            flags,
        })
    }

    // A sink that only keeps results in memory
    pub fn in_memory(flags: AuditFlags) -> Self {
        Self {
            state: Mutex::new(SinkState {
                results: Vec::new(),
                writer: None,
            }),
            flags,
        }
    }

    pub fn append(&self, result: CrawlResult) {
        let mut state = self.state.lock();
        // Logged under the lock so log order matches row order
        info!("{}", self.log_line(&result));

        if let Some(writer) = state.writer.as_mut() {
            let written = writer
                .write_record(row(&result, self.flags))
                .and_then(|_| writer.flush().map_err(csv::Error::from));
            if let Err(e) = written {
                // Losing one row is better than losing the crawl
                warn!("Could not write CSV row for {}: {}", result.url, e);
            }
        }
        state.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.state.lock().results.len()
    }

    pub fn snapshot(&self) -> Vec<CrawlResult> {
        self.state.lock().results.clone()
    }

    // Flushes and closes the CSV file; later appends stay in memory only
    pub fn finish(&self) -> Result<(), SinkError> {
        let writer = self.state.lock().writer.take();
        if let Some(mut writer) = writer {
            writer.flush()?;
        }
        Ok(())
    }

    fn log_line(&self, result: &CrawlResult) -> String {
        let mut line = format!(
            "Sr: {} | URL: {} | Status: {} | Type: {}",
            result.sequence, result.url, result.status, result.link_type
        );
        if result.link_type == LinkType::Internal {
            if self.flags.console_errors && result.has_console_errors() {
                line.push_str(" | Errors: Yes");
            }
            if self.flags.broken_images && result.has_broken_images() {
                line.push_str(&format!(" | Broken Images: {}", result.broken_image_count()));
            }
        }
        line
    }
}

fn header(flags: AuditFlags) -> Vec<&'static str> {
    let mut columns = vec!["Sr No", "URL", "Status Code", "Type"];
    if flags.console_errors {
        columns.push("Console Errors");
    }
    if flags.broken_images {
        columns.push("Broken Images");
    }
    columns
}

fn row(result: &CrawlResult, flags: AuditFlags) -> Vec<String> {
    let mut fields = vec![
        result.sequence.to_string(),
        result.url.clone(),
        result.status.to_string(),
        result.link_type.to_string(),
    ];
    if flags.console_errors {
        fields.push(result.console_errors.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()));
    }
    if flags.broken_images {
        fields.push(result.broken_images.clone().unwrap_or_else(|| NOT_APPLICABLE.to_string()));
    }
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{PageAudit, NONE_FOUND};
    use std::sync::Arc;

    fn internal(sequence: u64, url: &str) -> CrawlResult {
        let audit = PageAudit {
            status: 200,
            console_errors: "console.error: \"quoted\", with comma".to_string(),
            broken_images: NONE_FOUND.to_string(),
            links: Vec::new(),
        };
        CrawlResult::internal(sequence, url, &audit)
    }

    #[test]
    fn test_csv_rows_written_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let sink = ResultSink::create(&path, AuditFlags::default()).unwrap();

        sink.append(internal(1, "https://site.test/"));
        // Flushed already, before finish()
        let partial = std::fs::read_to_string(&path).unwrap();
        assert_eq!(partial.lines().count(), 2);

        sink.append(CrawlResult::external(2, "https://ext.test/x", 404));
        sink.finish().unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["Sr No", "URL", "Status Code", "Type", "Console Errors", "Broken Images"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][4], "console.error: \"quoted\", with comma");
        assert_eq!(&rows[1][2], "404");
        assert_eq!(&rows[1][3], "External");
        assert_eq!(&rows[1][4], NOT_APPLICABLE);
    }

    #[test]
    fn test_columns_follow_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let flags = AuditFlags {
            console_errors: false,
            broken_images: true,
        };
        let sink = ResultSink::create(&path, flags).unwrap();
        sink.append(internal(1, "https://site.test/"));
        sink.finish().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next(), Some("Sr No,URL,Status Code,Type,Broken Images"));
        assert_eq!(lines.next(), Some("1,https://site.test/,200,Internal,None"));
    }

    #[test]
    fn test_concurrent_appends_keep_every_result() {
        let sink = Arc::new(ResultSink::in_memory(AuditFlags::default()));
        std::thread::scope(|scope| {
            for worker in 0..8u64 {
                let sink = sink.clone();
                scope.spawn(move || {
                    for i in 0..25u64 {
                        let n = worker * 25 + i;
                        sink.append(CrawlResult::external(n, "https://ext.test/", 200));
                    }
                });
            }
        });
        assert_eq!(sink.len(), 200);
    }

    // Collects formatted log output from any thread
    #[derive(Clone, Default)]
    struct SharedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_log_lines_follow_recorded_order() {
        let sink = Arc::new(ResultSink::in_memory(AuditFlags::default()));
        let log = SharedLog::default();
        std::thread::scope(|scope| {
            for worker in 0..8u64 {
                let sink = sink.clone();
                let log = log.clone();
                scope.spawn(move || {
                    let subscriber = tracing_subscriber::fmt()
                        .with_writer(move || log.clone())
                        .with_ansi(false)
                        .finish();
                    tracing::subscriber::with_default(subscriber, || {
                        for i in 0..25u64 {
                            let n = worker * 25 + i;
                            sink.append(CrawlResult::external(n, "https://ext.test/", 200));
                        }
                    });
                });
            }
        });

        let text = String::from_utf8(log.0.lock().clone()).unwrap();
        let logged: Vec<u64> = text
            .lines()
            .filter_map(|line| line.split("Sr: ").nth(1))
            .map(|rest| rest.split(' ').next().unwrap().parse().unwrap())
            .collect();
        let recorded: Vec<u64> = sink.snapshot().iter().map(|r| r.sequence).collect();
        assert_eq!(logged.len(), 200);
        assert_eq!(logged, recorded);
    }

    #[test]
    fn test_log_line_mentions_findings_for_internal_pages() {
        let sink = ResultSink::in_memory(AuditFlags::default());
        let audit = PageAudit {
            status: 200,
            console_errors: "JS error: x".to_string(),
            broken_images: "a.png;b.png".to_string(),
            links: Vec::new(),
        };
        let line = sink.log_line(&CrawlResult::internal(3, "https://site.test/a", &audit));
        assert_eq!(
            line,
            "Sr: 3 | URL: https://site.test/a | Status: 200 | Type: Internal \
             | Errors: Yes | Broken Images: 2"
        );
    }
}
