/// `"<run_id>/<object-name>"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlobName(String);

impl BlobName {
    #[must_use]
    pub fn new(run_id: &str, object_name: &str) -> Self {
        Self(format!("{run_id}/{object_name}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn summary(run_id: &str, worker_index: usize) -> Self {
        Self::new(run_id, &format!("summary_{worker_index}.json"))
    }

    #[must_use]
    pub fn completion_marker(run_id: &str, worker_index: usize) -> Self {
        Self::new(run_id, &format!("completion_{worker_index}.txt"))
    }

    #[must_use]
    pub fn worker_log(run_id: &str, worker_index: usize) -> Self {
        Self::new(run_id, &format!("worker_{worker_index}.log"))
    }

    #[must_use]
    pub fn aggregated_summary(run_id: &str) -> Self {
        Self::new(run_id, "aggregated_summary.json")
    }

    #[must_use]
    pub fn manifest(run_id: &str) -> Self {
        Self::new(run_id, "manifest.json")
    }

    #[must_use]
    pub fn performance_report(run_id: &str) -> Self {
        Self::new(run_id, "performance_report.json")
    }
}

impl std::fmt::Display for BlobName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_run_id_slash_object_name() {
        let name = BlobName::summary("run-abc123", 2);
        assert_eq!(name.as_str(), "run-abc123/summary_2.json");
    }

    #[test]
    fn completion_marker_matches_spec_naming() {
        assert_eq!(
            BlobName::completion_marker("run-x", 0).as_str(),
            "run-x/completion_0.txt"
        );
    }
}
