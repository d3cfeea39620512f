use std::sync::Mutex;

/// Output message captured by MockOutput for testing
#[derive(Debug, Clone, PartialEq)]
#[allow(dead_code)]
pub enum OutputMessage {
    Success(String),
    Error(String),
    Warning(String),
    Info(String),
    Section(String),
    Subsection(String),
    KeyValue(String, String),
    Dimmed(String),
    Blank,
}

/// Trait for terminal output operations to enable testing with mocks
pub trait Output: Send + Sync {
    /// Print a success message
    fn success(&self, message: &str);

    /// Print an error message
    fn error(&self, message: &str);

    /// Print a warning message
    fn warning(&self, message: &str);

    /// Print an info message
    fn info(&self, message: &str);

    /// Print a section header
    fn section(&self, title: &str);

    /// Print a subsection header
    fn subsection(&self, title: &str);

    /// Print a key-value pair
    fn key_value(&self, key: &str, value: &str);

    /// Print a dimmed/muted message
    fn dimmed(&self, message: &str);

    /// Print a blank line
    fn blank(&self);
}

/// Real terminal output implementation using the output module
pub struct TerminalOutput;

impl Output for TerminalOutput {
    fn success(&self, message: &str) {
        crate::output::success(message);
    }

    fn error(&self, message: &str) {
        crate::output::error(message);
    }

    fn warning(&self, message: &str) {
        crate::output::warning(message);
    }

    fn info(&self, message: &str) {
        crate::output::info(message);
    }

    fn section(&self, title: &str) {
        crate::output::section(title);
    }

    fn subsection(&self, title: &str) {
        crate::output::subsection(title);
    }

    fn key_value(&self, key: &str, value: &str) {
        crate::output::key_value(key, value);
    }

    fn dimmed(&self, message: &str) {
        crate::output::dimmed(message);
    }

    fn blank(&self) {
        crate::output::blank();
    }
}

/// Mock output implementation for testing (captures output)
#[allow(dead_code)]
pub struct MockOutput {
    messages: Mutex<Vec<OutputMessage>>,
}

#[allow(dead_code)]
impl MockOutput {
    /// Create new mock output
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Get all captured messages
    pub fn get_messages(&self) -> Vec<OutputMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Check if a specific message was output
    pub fn contains_message(&self, message: &OutputMessage) -> bool {
        self.messages.lock().unwrap().contains(message)
    }

    /// Check if any error message was output
    pub fn has_error(&self) -> bool {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .any(|m| matches!(m, OutputMessage::Error(_)))
    }

    /// Get all warning messages
    pub fn get_warnings(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| {
                if let OutputMessage::Warning(msg) = m {
                    Some(msg.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Get all success messages
    pub fn get_successes(&self) -> Vec<String> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| {
                if let OutputMessage::Success(msg) = m {
                    Some(msg.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    fn push(&self, message: OutputMessage) {
        self.messages.lock().unwrap().push(message);
    }
}

impl Default for MockOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for MockOutput {
    fn success(&self, message: &str) {
        self.push(OutputMessage::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(OutputMessage::Error(message.to_string()));
    }

    fn warning(&self, message: &str) {
        self.push(OutputMessage::Warning(message.to_string()));
    }

    fn info(&self, message: &str) {
        self.push(OutputMessage::Info(message.to_string()));
    }

    fn section(&self, title: &str) {
        self.push(OutputMessage::Section(title.to_string()));
    }

    fn subsection(&self, title: &str) {
        self.push(OutputMessage::Subsection(title.to_string()));
    }

    fn key_value(&self, key: &str, value: &str) {
        self.push(OutputMessage::KeyValue(key.to_string(), value.to_string()));
    }

    fn dimmed(&self, message: &str) {
        self.push(OutputMessage::Dimmed(message.to_string()));
    }

    fn blank(&self) {
        self.push(OutputMessage::Blank);
    }
}
