//! Dynamic-SQL tag tree
//!
//! One enum variant per tag kind. Evaluation lives in `crate::evaluator`.

use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::parser::{parse_test, Expr};

/// Test expression, parsed on first use and shared afterwards
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "String")]
pub struct TestExpr {
    source: String,
    parsed: OnceCell<Result<Expr, String>>,
}

impl TestExpr {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parsed: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parsed expression, or the parse error message
    pub fn parsed(&self) -> Result<&Expr, &str> {
        self.parsed
            .get_or_init(|| parse_test(&self.source))
            .as_ref()
            .map_err(String::as_str)
    }
}

impl From<String> for TestExpr {
    fn from(source: String) -> Self {
        Self::new(source)
    }
}

/// Condition of a conditional tag
#[derive(Debug, Clone, Deserialize)]
pub enum Test {
    Expression(TestExpr),
    IsNull(String),
    IsNotNull(String),
    IsEmpty(String),
    IsNotEmpty(String),
    IsTrue(String),
    IsFalse(String),
    /// Property is present in the request, whatever its value
    IsProperty(String),
    IsEqual { property: String, compare_value: String },
    IsNotEqual { property: String, compare_value: String },
    IsGreaterThan { property: String, compare_value: String },
    IsLessThan { property: String, compare_value: String },
}

/// Trimming applied by a dynamic container
#[derive(Debug, Clone, Default, Deserialize)]
pub enum TrimMode {
    #[default]
    Plain,
    /// Prepends `WHERE` and always strips a leading connector
    Where,
    /// Prepends `SET` and strips a trailing comma
    Set,
    Trim {
        #[serde(default)]
        prefix_overrides: Vec<String>,
        #[serde(default)]
        suffix_overrides: Vec<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct When {
    pub test: Test,
    pub children: Vec<Tag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "tag")]
pub enum Tag {
    Text {
        text: String,
    },
    Dynamic {
        #[serde(default)]
        prepend: Option<String>,
        /// Strip a single leading AND/OR from the rendered body
        #[serde(default)]
        required: bool,
        #[serde(default)]
        trim: TrimMode,
        children: Vec<Tag>,
    },
    Condition {
        test: Test,
        #[serde(default)]
        prepend: Option<String>,
        children: Vec<Tag>,
    },
    Foreach {
        collection: String,
        item: String,
        #[serde(default)]
        index: Option<String>,
        #[serde(default)]
        open: String,
        #[serde(default)]
        close: String,
        #[serde(default = "default_separator")]
        separator: String,
        children: Vec<Tag>,
    },
    Include {
        #[serde(default)]
        scope: Option<String>,
        ref_id: String,
    },
    Choose {
        whens: Vec<When>,
        #[serde(default)]
        otherwise: Option<Vec<Tag>>,
    },
    /// Inlines a parameter's text without binding it
    Placeholder {
        property: String,
        #[serde(default)]
        prepend: Option<String>,
    },
}

fn default_separator() -> String {
    ",".to_string()
}

impl Tag {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    #[must_use]
    pub fn where_clause(children: Vec<Self>) -> Self {
        Self::Dynamic {
            prepend: None,
            required: true,
            trim: TrimMode::Where,
            children,
        }
    }

    #[must_use]
    pub fn set_clause(children: Vec<Self>) -> Self {
        Self::Dynamic {
            prepend: None,
            required: false,
            trim: TrimMode::Set,
            children,
        }
    }

    pub fn dynamic(prepend: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Dynamic {
            prepend: Some(prepend.into()),
            required: true,
            trim: TrimMode::Plain,
            children,
        }
    }

    pub fn if_test(test: impl Into<String>, children: Vec<Self>) -> Self {
        Self::Condition {
            test: Test::Expression(TestExpr::new(test)),
            prepend: None,
            children,
        }
    }

    #[must_use]
    pub fn condition(test: Test, prepend: Option<&str>, children: Vec<Self>) -> Self {
        Self::Condition {
            test,
            prepend: prepend.map(str::to_string),
            children,
        }
    }

    pub fn foreach(
        collection: impl Into<String>,
        item: impl Into<String>,
        open: impl Into<String>,
        close: impl Into<String>,
        separator: impl Into<String>,
        children: Vec<Self>,
    ) -> Self {
        Self::Foreach {
            collection: collection.into(),
            item: item.into(),
            index: None,
            open: open.into(),
            close: close.into(),
            separator: separator.into(),
            children,
        }
    }

    pub fn include(ref_id: impl Into<String>) -> Self {
        Self::Include {
            scope: None,
            ref_id: ref_id.into(),
        }
    }

    /// Visit every plain-text fragment in document order
    pub fn for_each_text<'a>(&'a self, f: &mut dyn FnMut(&'a str)) {
        match self {
            Self::Text { text } => f(text),
            Self::Dynamic { children, .. }
            | Self::Condition { children, .. }
            | Self::Foreach { children, .. } => {
                for child in children {
                    child.for_each_text(f);
                }
            }
            Self::Choose { whens, otherwise } => {
                for child in whens.iter().flat_map(|w| &w.children) {
                    child.for_each_text(f);
                }
                for child in otherwise.iter().flatten() {
                    child.for_each_text(f);
                }
            }
            Self::Include { .. } | Self::Placeholder { .. } => {}
        }
    }
}
