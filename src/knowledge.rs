use std::path::Path;

const PREAMBLE: &str = "Below is some information from the knowledge base:";

const INSTRUCTION: &str =
    "Based solely on the above information, answer the following question concisely.";

/// The static reference text every answer is grounded in.
///
/// Loaded once during cold start and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    text: String,
}

impl KnowledgeBase {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Reads the document from disk.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        std::fs::read_to_string(path).map(Self::new)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Builds the completion prompt.
    ///
    /// The whole document is embedded verbatim, followed by the question in
    /// the two-turn `Human:` / `Assistant:` template.
    pub fn build_prompt(&self, question: &str) -> String {
        format!(
            "{PREAMBLE}\n\n{}\n\n{INSTRUCTION}\n\nHuman: {question}\n\nAssistant:",
            self.text
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn prompt_contains_document_then_question() {
        let kb = KnowledgeBase::new("The office opens at 9am.\n\nIt closes at 5pm.");
        let prompt = kb.build_prompt("When does it open?");

        let doc_at = prompt.find("The office opens at 9am.\n\nIt closes at 5pm.").unwrap();
        let instruction_at = prompt.find(INSTRUCTION).unwrap();
        let human_at = prompt.find("Human: When does it open?").unwrap();

        assert!(prompt.starts_with(PREAMBLE));
        assert!(doc_at < instruction_at);
        assert!(instruction_at < human_at);
        assert!(prompt.ends_with("\n\nHuman: When does it open?\n\nAssistant:"));
    }

    #[test]
    fn load_reads_file_verbatim() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# Title\n\nbody  text\n").unwrap();

        let kb = KnowledgeBase::load(file.path()).unwrap();
        assert_eq!(kb.text(), "# Title\n\nbody  text\n");
    }

    #[test]
    fn load_missing_file_fails() {
        assert!(KnowledgeBase::load("/nonexistent/knowledgebase.md").is_err());
    }
}
