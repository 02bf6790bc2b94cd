//! Diagnostic Report
//!
//! Append-only, categorised message sink shared by every check of a run.
//!
//! - Status: what was checked and found in order
//! - Warning: recoverable anomalies that deserve a look
//! - Error: structural violations to fix before release
//! - Data: quantitative diagnostics (global means, residual statistics)

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, error, warn};

use crate::error::{QcError, QcResult};

const SECTION_RULE: &str = "======================";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Status,
    Warning,
    Error,
    Data,
}

impl Category {
    /// Rendering order
    pub const ALL: [Category; 4] = [
        Category::Status,
        Category::Warning,
        Category::Error,
        Category::Data,
    ];
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Status => "Status",
            Category::Warning => "Warning",
            Category::Error => "Error",
            Category::Data => "Data",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticMessage {
    pub category: Category,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct DiagnosticReport {
    sections: HashMap<Category, Vec<String>>,
}

impl DiagnosticReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, category: Category, text: impl Into<String>) {
        let text = text.into();
        match category {
            Category::Error => error!("{}", text),
            Category::Warning => warn!("{}", text),
            Category::Status | Category::Data => debug!("{}", text),
        }
        self.sections.entry(category).or_default().push(text);
    }

    pub fn status(&mut self, text: impl Into<String>) {
        self.push(Category::Status, text);
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.push(Category::Warning, text);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.push(Category::Error, text);
    }

    pub fn data(&mut self, text: impl Into<String>) {
        self.push(Category::Data, text);
    }

    pub fn messages(&self, category: Category) -> &[String] {
        self.sections
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn count(&self, category: Category) -> usize {
        self.messages(category).len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    /// All messages, category by category
    pub fn iter(&self) -> impl Iterator<Item = DiagnosticMessage> + '_ {
        Category::ALL.into_iter().flat_map(move |category| {
            self.messages(category).iter().map(move |text| DiagnosticMessage {
                category,
                text: text.clone(),
            })
        })
    }

    /// Append another report's messages after ours, keeping their order.
    /// Messages are moved without being logged a second time.
    pub fn extend(&mut self, other: DiagnosticReport) {
        for (category, mut texts) in other.sections {
            self.sections.entry(category).or_default().append(&mut texts);
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for category in Category::ALL {
            let messages = self.messages(category);
            out.push_str(SECTION_RULE);
            out.push('\n');
            out.push_str(&format!("{}:{}\n", category, messages.len()));
            for msg in messages {
                out.push_str(msg);
                out.push('\n');
            }
        }
        out
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> QcResult<()> {
        let path = path.as_ref();
        let io_err = |source| QcError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        std::fs::write(path, self.render()).map_err(io_err)
    }
}
