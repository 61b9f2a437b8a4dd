use anyhow::Context;
use log::info;
use std::path::Path;

use super::types::TestTemplate;

/// Static practice-test layouts, loaded once at start-up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestTemplates {
    templates: Vec<TestTemplate>,
}

impl TestTemplates {
    pub fn new(templates: Vec<TestTemplate>) -> Self {
        Self { templates }
    }

    /// Reads a JSON array of `{name, modules}` objects.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read test templates from {}", path.display()))?;
        let templates: Vec<TestTemplate> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid test templates in {}", path.display()))?;
        info!("Loaded {} test templates from {}", templates.len(), path.display());
        Ok(Self::new(templates))
    }

    pub fn get(&self, name: &str) -> Option<&TestTemplate> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestTemplate> {
        self.templates.iter()
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_parses_both_key_styles() {
        let q = Uuid::new_v4();
        let raw = format!(
            r#"[{{"Name": "Practice Test 1", "QuestionLists": [["{q}"], []]}},
                {{"name": "Practice Test 2", "modules": []}}]"#
        );
        let templates: Vec<TestTemplate> = serde_json::from_str(&raw).unwrap();
        let templates = TestTemplates::new(templates);

        assert_eq!(templates.len(), 2);
        let first = templates.get("Practice Test 1").unwrap();
        assert_eq!(first.modules, vec![vec![q], vec![]]);
        assert!(templates.get("Practice Test 3").is_none());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = TestTemplates::load_from_file(Path::new("/nonexistent/templates.json"));
        assert!(err.is_err());
    }
}
