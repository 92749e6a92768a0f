//! Bounded-concurrency driver over a module provider.

use super::error::PkgError;
use super::module::ModuleProvider;
use super::package::Package;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};

/// Default number of in-flight `generate_package` calls.
pub const MAX_CONCURRENT_FETCHES: usize = 32;

/// A package that failed to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageFailure {
    /// `name@version`
    pub package: String,
    pub error: PkgError,
}

/// Outcome of a [`generate_packages`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Packages processed without error.
    pub generated: usize,
    /// Packages never started because a fatal error stopped the run.
    pub skipped: usize,
    /// Every failure, fatal or not.
    pub failures: Vec<PackageFailure>,
}

impl GenerateReport {
    /// The first fatal failure, if any.
    #[must_use]
    pub fn fatal(&self) -> Option<&PackageFailure> {
        self.failures.iter().find(|f| f.error.is_fatal())
    }

    /// True when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Outcome {
    Generated,
    Skipped,
    Failed(PackageFailure),
}

/// Run `generate_package` for every package with at most `max_concurrent`
/// calls in flight.
///
/// Each package is passed to the provider at most once. After a fatal error
/// no new call starts; calls already in flight run to completion.
pub async fn generate_packages<M: ModuleProvider>(
    provider: &M,
    packages: Vec<Package>,
    max_concurrent: usize,
) -> GenerateReport {
    let aborted = AtomicBool::new(false);
    let aborted = &aborted;

    let outcomes: Vec<Outcome> = stream::iter(packages)
        .map(|package| async move {
            if aborted.load(Ordering::SeqCst) {
                return Outcome::Skipped;
            }
            match provider.generate_package(&package).await {
                Ok(()) => Outcome::Generated,
                Err(error) => {
                    if error.is_fatal() {
                        aborted.store(true, Ordering::SeqCst);
                    }
                    Outcome::Failed(PackageFailure {
                        package: package.key(),
                        error,
                    })
                }
            }
        })
        .buffer_unordered(max_concurrent.max(1))
        .collect()
        .await;

    let mut report = GenerateReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Generated => report.generated += 1,
            Outcome::Skipped => report.skipped += 1,
            Outcome::Failed(failure) => report.failures.push(failure),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::error::codes;
    use crate::pkg::git::parse_git_source;
    use crate::pkg::manifest::{JsonManifest, ManifestEntry, ManifestSink};
    use crate::pkg::package::PackageSource;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn git_package(n: usize) -> Package {
        let git = parse_git_source(&format!("github:owner/repo{n}#c{n}"), None).unwrap();
        Package::new(
            format!("pkg{n}"),
            "1.0.0",
            PackageSource::Git(git),
            "package-lock.json",
        )
    }

    /// Writes one entry per package after a staggered delay, and fails
    /// packages listed in `failures`.
    struct Recorder {
        sink: Arc<JsonManifest>,
        calls: Mutex<HashMap<String, usize>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        failures: HashMap<String, PkgError>,
    }

    impl Recorder {
        fn new(failures: &[(&str, PkgError)]) -> Self {
            Self {
                sink: Arc::new(JsonManifest::new()),
                calls: Mutex::new(HashMap::new()),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                failures: failures
                    .iter()
                    .map(|(name, err)| ((*name).to_string(), err.clone()))
                    .collect(),
            }
        }

        fn calls(&self) -> HashMap<String, usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ModuleProvider for Recorder {
        async fn generate_package(&self, package: &Package) -> Result<(), PkgError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(package.name.clone())
                .or_default() += 1;

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            let delay = package.name.len() as u64 % 4;
            tokio::time::sleep(Duration::from_millis(delay * 3)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if let Some(err) = self.failures.get(&package.name) {
                return Err(err.clone());
            }
            self.sink.add_entry(ManifestEntry::Inline {
                contents: package.key(),
                dest: "d".to_string(),
                dest_filename: package.name.clone(),
            })
        }
    }

    #[tokio::test]
    async fn test_every_package_written_once() {
        let provider = Recorder::new(&[]);
        let packages: Vec<Package> = (0..50).map(git_package).collect();

        let report = generate_packages(&provider, packages, 8).await;

        assert_eq!(report.generated, 50);
        assert!(report.is_success());
        assert_eq!(provider.sink.entries().unwrap().len(), 50);
        let calls = provider.calls();
        assert_eq!(calls.len(), 50);
        assert!(calls.values().all(|&n| n == 1));
    }

    #[tokio::test]
    async fn test_concurrency_bounded() {
        let provider = Recorder::new(&[]);
        let packages: Vec<Package> = (0..40).map(git_package).collect();

        generate_packages(&provider, packages, 4).await;

        let peak = provider.peak.load(Ordering::SeqCst);
        assert!(peak <= 4, "peak concurrency {peak}");
    }

    #[tokio::test]
    async fn test_fatal_error_stops_new_calls() {
        let provider = Recorder::new(&[("pkg2", PkgError::integrity("no digest"))]);
        let packages: Vec<Package> = (0..10).map(git_package).collect();

        let report = generate_packages(&provider, packages, 1).await;

        assert_eq!(report.generated, 2);
        assert_eq!(report.skipped, 7);
        let fatal = report.fatal().unwrap();
        assert_eq!(fatal.package, "pkg2@1.0.0");
        assert_eq!(fatal.error.code(), codes::INTEGRITY_ERROR);
        assert_eq!(provider.calls().len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_error_does_not_stop_run() {
        let provider = Recorder::new(&[("pkg1", PkgError::fetch("timeout"))]);
        let packages: Vec<Package> = (0..5).map(git_package).collect();

        let report = generate_packages(&provider, packages, 2).await;

        assert_eq!(report.generated, 4);
        assert_eq!(report.skipped, 0);
        assert_eq!(report.failures.len(), 1);
        assert!(report.fatal().is_none());
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_empty_input() {
        let provider = Recorder::new(&[]);
        let report = generate_packages(&provider, Vec::new(), 0).await;
        assert_eq!(report, GenerateReport::default());
    }
}
