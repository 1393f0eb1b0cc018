//! Built-in engines.

mod command;
mod copy;
mod extract;
mod lint;
mod markup;
mod script;
mod style;
mod url;

use std::sync::Arc;

use super::Transform;

pub use markup::reference_spans;
pub use style::{browser_targets, compile_css};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Copy,
    Style,
    Extract,
    Script,
    Lint,
    Url,
    Markup,
    Command,
}

impl Builtin {
    pub const ALL: [Builtin; 8] = [
        Builtin::Copy,
        Builtin::Style,
        Builtin::Extract,
        Builtin::Script,
        Builtin::Lint,
        Builtin::Url,
        Builtin::Markup,
        Builtin::Command,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Style => "style",
            Self::Extract => "extract",
            Self::Script => "script",
            Self::Lint => "lint",
            Self::Url => "url",
            Self::Markup => "markup",
            Self::Command => "command",
        }
    }

    pub fn engine(self) -> Arc<dyn Transform> {
        match self {
            Self::Copy => Arc::new(copy::Copy),
            Self::Style => Arc::new(style::Style),
            Self::Extract => Arc::new(extract::Extract),
            Self::Script => Arc::new(script::Script),
            Self::Lint => Arc::new(lint::Lint),
            Self::Url => Arc::new(url::Url),
            Self::Markup => Arc::new(markup::Markup),
            Self::Command => Arc::new(command::Command),
        }
    }
}
