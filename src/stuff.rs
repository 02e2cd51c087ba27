// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Stuff: named, typed runtime values
//!
//! A [`Stuff`] pairs a concept string with its content. A list stuff keeps
//! the concept of its items.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Content of a stuff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StuffContent {
    Text {
        text: String,
    },
    Number {
        number: f64,
    },
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    Pdf {
        url: String,
    },
    Html {
        html: String,
    },
    TextAndImages {
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        images: Vec<String>,
    },
    Page {
        text: String,
        #[serde(default)]
        images: Vec<String>,
        #[serde(default)]
        page_view: Option<String>,
    },
    Structured {
        class_name: String,
        fields: IndexMap<String, serde_json::Value>,
    },
    List {
        items: Vec<StuffContent>,
    },
    Dynamic {
        value: serde_json::Value,
    },
}

impl StuffContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn list(items: Vec<StuffContent>) -> Self {
        Self::List { items }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    pub fn as_list(&self) -> Option<&[StuffContent]> {
        match self {
            Self::List { items } => Some(items),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Value exposed to templates and condition expressions
    pub fn to_template_value(&self) -> serde_json::Value {
        use serde_json::{json, Value};

        match self {
            Self::Text { text } => Value::String(text.clone()),
            Self::Number { number } => json!(number),
            Self::Image { url, caption } => json!({ "url": url, "caption": caption }),
            Self::Pdf { url } => json!({ "url": url }),
            Self::Html { html } => Value::String(html.clone()),
            Self::TextAndImages { text, images } => json!({ "text": text, "images": images }),
            Self::Page {
                text,
                images,
                page_view,
            } => json!({ "text": text, "images": images, "page_view": page_view }),
            Self::Structured { fields, .. } => {
                Value::Object(fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            }
            Self::List { items } => {
                Value::Array(items.iter().map(StuffContent::to_template_value).collect())
            }
            Self::Dynamic { value } => value.clone(),
        }
    }

    /// Plain-text rendering used when interpolating into prompts
    pub fn rendered_text(&self) -> String {
        match self {
            Self::Text { text } => text.clone(),
            Self::Number { number } => number.to_string(),
            Self::Image { url, .. } | Self::Pdf { url } => url.clone(),
            Self::Html { html } => html.clone(),
            Self::TextAndImages { text, .. } => text.clone().unwrap_or_default(),
            Self::Page { text, .. } => text.clone(),
            Self::Structured { .. } | Self::Dynamic { .. } => {
                serde_json::to_string_pretty(&self.to_template_value()).unwrap_or_default()
            }
            Self::List { items } => items
                .iter()
                .map(StuffContent::rendered_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// A named runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stuff {
    pub name: String,
    pub concept: String,
    pub content: StuffContent,
}

impl Stuff {
    pub fn new(name: impl Into<String>, concept: impl Into<String>, content: StuffContent) -> Self {
        Self {
            name: name.into(),
            concept: concept.into(),
            content,
        }
    }

    /// A text stuff of concept `native.Text`
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, "native.Text", StuffContent::text(text))
    }

    /// Copy of this stuff under another name
    pub fn renamed(&self, name: &str) -> Self {
        Self {
            name: name.to_string(),
            concept: self.concept.clone(),
            content: self.content.clone(),
        }
    }

    pub fn is_list(&self) -> bool {
        self.content.is_list()
    }

    /// Number of items for list stuff, 1 otherwise
    pub fn item_count(&self) -> usize {
        self.content.as_list().map_or(1, <[StuffContent]>::len)
    }
}
