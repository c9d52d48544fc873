use serde::{Deserialize, Serialize};

/// What the host shows for a block
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Content {
    #[default]
    None,
    Text(String),
    Pages(Vec<String>),
    Html(String),
}

impl Content {
    pub fn text(s: impl Into<String>) -> Self {
        Content::Text(s.into())
    }

    pub fn html(s: impl Into<String>) -> Self {
        Content::Html(s.into())
    }

    pub fn pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Content::Pages(pages.into_iter().map(Into::into).collect())
    }

    /// Number of screens the host has to step through.
    pub fn page_count(&self) -> usize {
        match self {
            Content::None => 0,
            Content::Text(_) | Content::Html(_) => 1,
            Content::Pages(pages) => pages.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.page_count() == 0
    }

    /// Short label used in log output.
    pub fn describe(&self) -> String {
        match self {
            Content::None => "none".to_string(),
            Content::Text(s) | Content::Html(s) => {
                let mut label: String = s.chars().take(32).collect();
                if s.chars().count() > 32 {
                    label.push_str("...");
                }
                label
            }
            Content::Pages(pages) => format!("{} page(s)", pages.len()),
        }
    }
}
