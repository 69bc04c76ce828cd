//! Process identity attached to firehose label sets.

/// Fixed per-process label values. Taken verbatim from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessIdentity {
    pub pod: String,
    pub instance: String,
    pub container: String,
    pub build_id: String,
}

impl ProcessIdentity {
    /// `pod` and `instance` both come from the hostname.
    pub fn new(hostname: &str, container: &str, build_id: &str) -> Self {
        Self {
            pod: hostname.to_string(),
            instance: hostname.to_string(),
            container: container.to_string(),
            build_id: build_id.to_string(),
        }
    }

    /// Label pairs in emission order.
    pub fn pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("pod", &self.pod),
            ("instance", &self.instance),
            ("container", &self.container),
            ("build_id", &self.build_id),
        ]
    }
}
