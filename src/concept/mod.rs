// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 pipeworks contributors

//! Concept type system
//!
//! Concepts are the named, domain-qualified data types flowing between
//! pipes. A concept string is `domain.Code`; native concepts live in the
//! reserved `native` domain and may be written with their bare code.

mod library;
mod structure;

pub use library::ConceptLibrary;
pub use structure::{FieldKind, FieldSpec, StructureRegistry, StructureShape};

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use crate::errors::{PipeworksError, PipeworksResult};

/// Domain reserved for built-in concepts
pub const NATIVE_DOMAIN: &str = "native";

/// Structure class used when a concept declares no shape
pub const TEXT_CONTENT_CLASS: &str = "TextContent";

/// A registered concept
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Concept {
    /// Domain code (snake_case)
    pub domain: String,

    /// Concept code (PascalCase)
    pub code: String,

    /// Human-readable definition
    pub definition: String,

    /// Fully qualified parent concept
    pub refines: Option<String>,

    /// Shape of the concept's values; `None` inherits through `refines`,
    /// then falls back to [`TEXT_CONTENT_CLASS`]
    pub structure_class_name: Option<String>,
}

impl Concept {
    /// Create a concept with no parent and no explicit structure
    pub fn new(domain: &str, code: &str, definition: &str) -> Self {
        Self {
            domain: domain.to_string(),
            code: code.to_string(),
            definition: definition.to_string(),
            refines: None,
            structure_class_name: None,
        }
    }

    /// Set the parent concept
    pub fn with_refines(mut self, parent: &str) -> Self {
        self.refines = Some(parent.to_string());
        self
    }

    /// Set the structure class
    pub fn with_structure(mut self, class_name: &str) -> Self {
        self.structure_class_name = Some(class_name.to_string());
        self
    }

    /// `domain.Code`
    pub fn concept_string(&self) -> String {
        format!("{}.{}", self.domain, self.code)
    }

    pub fn is_native(&self) -> bool {
        self.domain == NATIVE_DOMAIN
    }
}

/// Built-in concepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeConcept {
    Text,
    Image,
    Pdf,
    TextAndImages,
    Number,
    LlmPrompt,
    Page,
    Html,
    Dynamic,
    Anything,
}

impl NativeConcept {
    pub const ALL: [NativeConcept; 10] = [
        Self::Text,
        Self::Image,
        Self::Pdf,
        Self::TextAndImages,
        Self::Number,
        Self::LlmPrompt,
        Self::Page,
        Self::Html,
        Self::Dynamic,
        Self::Anything,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Image => "Image",
            Self::Pdf => "PDF",
            Self::TextAndImages => "TextAndImages",
            Self::Number => "Number",
            Self::LlmPrompt => "LLMPrompt",
            Self::Page => "Page",
            Self::Html => "Html",
            Self::Dynamic => "Dynamic",
            Self::Anything => "Anything",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.code() == code)
    }

    /// Parse a bare code or a `native.Code` string
    pub fn from_concept_string(concept: &str) -> Option<Self> {
        match concept.split_once('.') {
            Some((NATIVE_DOMAIN, code)) => Self::from_code(code),
            Some(_) => None,
            None => Self::from_code(concept),
        }
    }

    pub fn concept_string(&self) -> String {
        format!("{}.{}", NATIVE_DOMAIN, self.code())
    }

    pub fn structure_class_name(&self) -> &'static str {
        match self {
            Self::Text => TEXT_CONTENT_CLASS,
            Self::Image => "ImageContent",
            Self::Pdf => "PDFContent",
            Self::TextAndImages => "TextAndImagesContent",
            Self::Number => "NumberContent",
            Self::LlmPrompt => "LLMPromptContent",
            Self::Page => "PageContent",
            Self::Html => "HtmlContent",
            Self::Dynamic => "DynamicContent",
            Self::Anything => "AnythingContent",
        }
    }

    fn definition(&self) -> &'static str {
        match self {
            Self::Text => "A text",
            Self::Image => "An image",
            Self::Pdf => "A PDF document",
            Self::TextAndImages => "Text together with images",
            Self::Number => "A number",
            Self::LlmPrompt => "A prompt for a language model",
            Self::Page => "A page of a document, with its text and images",
            Self::Html => "An HTML fragment",
            Self::Dynamic => "A value whose shape is only known at run time",
            Self::Anything => "Anything at all",
        }
    }

    pub fn concept(&self) -> Concept {
        Concept::new(NATIVE_DOMAIN, self.code(), self.definition())
            .with_structure(self.structure_class_name())
    }
}

fn snake_case_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("valid snake_case regex"))
}

fn pascal_case_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").expect("valid PascalCase regex"))
}

pub fn is_snake_case(s: &str) -> bool {
    snake_case_regex().is_match(s)
}

pub fn is_pascal_case(s: &str) -> bool {
    pascal_case_regex().is_match(s)
}

/// Check a domain code
pub fn validate_domain_code(domain: &str) -> PipeworksResult<()> {
    if is_snake_case(domain) {
        Ok(())
    } else {
        Err(PipeworksError::ConceptDomain {
            domain: domain.to_string(),
            reason: "Domain must be snake_case".into(),
        })
    }
}

/// Check a bare concept code
pub fn validate_concept_code(code: &str) -> PipeworksResult<()> {
    if is_pascal_case(code) {
        Ok(())
    } else {
        Err(PipeworksError::ConceptCode {
            code: code.to_string(),
            reason: "Code must be PascalCase".into(),
        })
    }
}

/// Check a concept string, bare or qualified
pub fn validate_concept_string(concept: &str) -> PipeworksResult<()> {
    match concept.matches('.').count() {
        0 => validate_concept_code(concept),
        1 => {
            let (domain, code) = split_concept_string(concept);
            let domain = domain.unwrap_or_default();
            if !is_snake_case(domain) {
                return Err(PipeworksError::ConceptString {
                    concept: concept.to_string(),
                    reason: "Domain must be snake_case".into(),
                });
            }
            if !is_pascal_case(code) {
                return Err(PipeworksError::ConceptString {
                    concept: concept.to_string(),
                    reason: "Code must be PascalCase".into(),
                });
            }
            Ok(())
        }
        _ => Err(PipeworksError::ConceptString {
            concept: concept.to_string(),
            reason: "A concept string contains at most one dot".into(),
        }),
    }
}

/// Split `domain.Code` into its parts
pub fn split_concept_string(concept: &str) -> (Option<&str>, &str) {
    match concept.split_once('.') {
        Some((domain, code)) => (Some(domain), code),
        None => (None, concept),
    }
}
