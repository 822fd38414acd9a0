use serde::Serialize;

/// One line of `help` output contributed by a command.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HelpEntry {
    pub command: String,
    pub description: String,
    pub examples: Vec<String>,
}

impl HelpEntry {
    pub fn new(command: impl Into<String>, description: impl Into<String>) -> Self {
        Self { command: command.into(), description: description.into(), examples: Vec::new() }
    }

    pub fn example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }
}
