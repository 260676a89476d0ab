//! Test data builders
//!
//! Builder patterns for creating test data with sensible defaults and easy
//! customization.

use analyzer_core::{
    Artifact, ExistingTestCase, JobData, JobRequest, SignalDefinition, TestCaseDataset, Tool,
};

/// Builder for creating test Artifact values
pub struct ArtifactBuilder {
    artifact: Artifact,
}

impl ArtifactBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            artifact: Artifact::new(id, format!("Requirement {id} text.")),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.artifact.primary_text = text.to_string();
        self
    }

    pub fn with_type(mut self, artifact_type: &str) -> Self {
        self.artifact.artifact_type = Some(artifact_type.to_string());
        self
    }

    pub fn with_test_level(mut self, test_level: &str) -> Self {
        self.artifact.test_level = Some(test_level.to_string());
        self
    }

    pub fn build(self) -> Artifact {
        self.artifact
    }
}

/// Builder for creating test JobRequest values
pub struct JobRequestBuilder {
    request: JobRequest,
}

impl JobRequestBuilder {
    pub fn new(tool: Tool) -> Self {
        Self {
            request: JobRequest {
                client_id: "test-client".to_string(),
                tool,
                data: JobData {
                    artifacts: Vec::new(),
                    prompt: "Analyze the following requirement:\n".to_string(),
                    role: "You are a requirements engineer.".to_string(),
                    data_for_test_cases: None,
                    similarity_groups: None,
                },
            },
        }
    }

    pub fn with_client(mut self, client_id: &str) -> Self {
        self.request.client_id = client_id.to_string();
        self
    }

    pub fn with_prompt(mut self, prompt: &str) -> Self {
        self.request.data.prompt = prompt.to_string();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.request.data.role = role.to_string();
        self
    }

    pub fn with_artifact(mut self, artifact: Artifact) -> Self {
        self.request.data.artifacts.push(artifact);
        self
    }

    /// Add `count` artifacts with ids `1..=count`
    pub fn with_artifacts(mut self, count: usize) -> Self {
        for id in 1..=count {
            self.request
                .data
                .artifacts
                .push(ArtifactBuilder::new(&id.to_string()).build());
        }
        self
    }

    pub fn with_dataset(mut self, dataset: TestCaseDataset) -> Self {
        self.request.data.data_for_test_cases = Some(dataset);
        self
    }

    pub fn with_similarity_groups(mut self, groups: Vec<Vec<&str>>) -> Self {
        self.request.data.similarity_groups = Some(
            groups
                .into_iter()
                .map(|group| group.into_iter().map(str::to_string).collect())
                .collect(),
        );
        self
    }

    pub fn build(self) -> JobRequest {
        self.request
    }
}

/// Builder for creating test ExistingTestCase values
pub struct ExistingTestCaseBuilder {
    test_case: ExistingTestCase,
}

impl ExistingTestCaseBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            test_case: ExistingTestCase {
                id: id.to_string(),
                title: format!("Test case {id}"),
                description: String::new(),
                test_level: None,
            },
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.test_case.title = title.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.test_case.description = description.to_string();
        self
    }

    pub fn with_test_level(mut self, test_level: &str) -> Self {
        self.test_case.test_level = Some(test_level.to_string());
        self
    }

    pub fn build(self) -> ExistingTestCase {
        self.test_case
    }
}

/// Build a signal definition; an empty `values` slice means a continuous range
pub fn signal(name: &str, values: &[&str]) -> SignalDefinition {
    SignalDefinition {
        name: name.to_string(),
        values: values.iter().map(|v| v.to_string()).collect(),
        min: if values.is_empty() { Some(0.0) } else { None },
        max: if values.is_empty() { Some(255.0) } else { None },
        unit: None,
    }
}
