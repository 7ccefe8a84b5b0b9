//! Loading affordance for in-flight operations.
//!
//! While a search, upload or dataset refresh is waiting on the service, the
//! CLI shows a short status line. It goes to **stderr** so stdout remains
//! parseable for scripts, and it is off when stderr is not a terminal.

use std::io::Write;

/// An operation the user is waiting on.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Activity {
    Searching { query: String },
    Uploading { dataset_name: String },
    LoadingDatasets,
}

impl Activity {
    fn label(&self) -> String {
        match self {
            Activity::Searching { query } => format!("searching \"{}\"...", query),
            Activity::Uploading { dataset_name } => format!("uploading \"{}\"...", dataset_name),
            Activity::LoadingDatasets => "loading datasets...".to_string(),
        }
    }
}

pub trait ProgressReporter: Send + Sync {
    fn started(&self, activity: &Activity);
    fn finished(&self, activity: &Activity);
}

/// Writes "searching "apple"..." and clears it when done.
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn started(&self, activity: &Activity) {
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "{}", activity.label());
        let _ = err.flush();
    }

    fn finished(&self, activity: &Activity) {
        // Overwrite the status line with blanks, then return to column 0.
        let width = activity.label().chars().count();
        let mut err = std::io::stderr().lock();
        let _ = write!(err, "\r{}\r", " ".repeat(width));
        let _ = err.flush();
    }
}

pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn started(&self, _activity: &Activity) {}
    fn finished(&self, _activity: &Activity) {}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
}

impl ProgressMode {
    /// Human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
        }
    }
}

/// Run `fut` with `activity` shown for its duration.
pub async fn with_progress<F, T>(reporter: &dyn ProgressReporter, activity: Activity, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    reporter.started(&activity);
    let out = fut.await;
    reporter.finished(&activity);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl ProgressReporter for Recorder {
        fn started(&self, activity: &Activity) {
            self.0.lock().unwrap().push(format!("start {}", activity.label()));
        }
        fn finished(&self, activity: &Activity) {
            self.0.lock().unwrap().push(format!("end {}", activity.label()));
        }
    }

    #[test]
    fn labels() {
        assert_eq!(
            Activity::Searching {
                query: "apple".into()
            }
            .label(),
            "searching \"apple\"..."
        );
        assert_eq!(Activity::LoadingDatasets.label(), "loading datasets...");
    }

    #[tokio::test]
    async fn with_progress_brackets_future() {
        let rec = Recorder::default();
        let value = with_progress(&rec, Activity::LoadingDatasets, async { 42 }).await;
        assert_eq!(value, 42);
        assert_eq!(
            *rec.0.lock().unwrap(),
            vec!["start loading datasets...", "end loading datasets..."]
        );
    }
}
