//! Error handling for Braid
//!
//! This module provides the error types and user-friendly error reporting for the
//! Braid recipe compiler. The error system follows two principles:
//! 1. **Strongly-typed errors** for precise error handling in code
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! Two main types make up the system:
//! - [`BraidError`] - Enumerated error types for all failure cases in Braid
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! # Error Categories
//!
//! - **Recipes**: [`BraidError::RecipeNotFound`], [`BraidError::RecipeParseError`]
//! - **Source resolution**: [`BraidError::SourceNotFound`], [`BraidError::FetchFailure`]
//! - **Structural invariants**: [`BraidError::StructuralViolation`],
//!   [`BraidError::MissingRegistration`]
//! - **Configuration**: [`BraidError::ConfigError`]
//!
//! Source-resolution failures are recoverable: callers warn and drop the offending
//! reference, so a partial compile remains useful. Structural failures always
//! propagate, since they indicate a broken invariant the caller must correct
//! before trusting the output.
//!
//! # Examples
//!
//! ```rust,no_run
//! use braid_cli::core::{BraidError, user_friendly_error};
//!
//! fn load_recipe(name: &str) -> Result<(), BraidError> {
//!     Err(BraidError::RecipeNotFound { name: name.to_string() })
//! }
//!
//! if let Err(e) = load_recipe("demo") {
//!     let ctx = user_friendly_error(anyhow::Error::from(e));
//!     ctx.display();
//! }
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for Braid operations.
///
/// Each variant represents a specific failure mode and carries enough context
/// (file paths, reference strings, offending names) for the message to be
/// actionable on its own.
#[derive(Error, Debug, Clone)]
pub enum BraidError {
    /// Recipe file not found in any configured layer
    ///
    /// Braid searches the project `recipes/` directory and the user override
    /// directory for `<name>.toml`. This error means neither layer had it.
    #[error("Recipe '{name}' not found in any recipe layer")]
    RecipeNotFound {
        /// Name of the recipe that could not be found
        name: String,
    },

    /// Recipe parsing error
    #[error("Invalid recipe file syntax in {file}")]
    RecipeParseError {
        /// Path to the recipe file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Source reference unresolvable in any provider
    ///
    /// Raised when a reference matches nothing in the local search path and
    /// no remote provider claims it. Callers treat this as recoverable: the
    /// reference is dropped from the output with a warning.
    #[error("Source '{reference}' not found in any provider")]
    SourceNotFound {
        /// The reference that could not be resolved
        reference: String,
    },

    /// Remote fetch failed
    ///
    /// Covers both the grouped archive fetch and the per-file fallback. The
    /// batch path retries once as individual fetches; individual failures
    /// drop the file with a warning and no further retries.
    #[error("Failed to fetch from {repo}@{branch}: {reason}")]
    FetchFailure {
        /// Repository the fetch targeted
        repo: String,
        /// Branch the fetch targeted
        branch: String,
        /// Reason for the failure
        reason: String,
    },

    /// A subagent broke a structural invariant
    ///
    /// Raised when a subagent recipe declares its own subagents, or when a
    /// compiled subagent body contains a file declaring outbound dispatch
    /// targets. Subagents must be leaves in the dispatch graph.
    #[error("Structural violation in subagent '{subagent}': {reason}")]
    StructuralViolation {
        /// Name of the offending subagent
        subagent: String,
        /// What the subagent did that it must not do
        reason: String,
    },

    /// A dispatch target is used but not registered as a subagent
    #[error("'{file}' dispatches to '{target}', which is not a registered subagent")]
    MissingRegistration {
        /// File whose metadata declares the unregistered target
        file: String,
        /// The undeclared dispatch target
        target: String,
        /// The exact configuration addition that fixes the problem
        fix: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper providing user-friendly error display.
///
/// Combines a [`BraidError`] with an optional suggestion and details,
/// rendered with color at the CLI boundary.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying Braid error
    pub error: BraidError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context from a Braid error.
    pub const fn new(error: BraidError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Attach a suggestion for resolving the error.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach additional details about the error.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{} {}", "Error:".red().bold(), self.error);
        if let Some(details) = &self.details {
            eprintln!("  {details}");
        }
        if let Some(suggestion) = &self.suggestion {
            eprintln!("{} {}", "Hint:".yellow().bold(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        if let Some(details) = &self.details {
            write!(f, "\n  {details}")?;
        }
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nHint: {suggestion}")?;
        }
        Ok(())
    }
}

/// Convert any error into a user-friendly [`ErrorContext`] with suggestions.
///
/// Typed [`BraidError`]s get a suggestion tailored to the variant; everything
/// else is wrapped in [`BraidError::Other`] with the full context chain
/// preserved in the message.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(braid_error) = error.downcast_ref::<BraidError>() {
        return create_error_context(braid_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(BraidError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check file ownership, or re-run with elevated permissions");
    }

    ErrorContext::new(BraidError::Other {
        message: format!("{error:#}"),
    })
}

fn create_error_context(error: BraidError) -> ErrorContext {
    match &error {
        BraidError::RecipeNotFound {
            name,
        } => {
            let suggestion = format!(
                "Create recipes/{name}.toml in the compile root, or check the name with 'braid list'"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        BraidError::RecipeParseError {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check the TOML syntax in the recipe file. Verify quotes, brackets, and table headers",
        ),
        BraidError::StructuralViolation {
            ..
        } => ErrorContext::new(error).with_details(
            "Subagents must be leaves in the dispatch graph: a subagent recipe may not \
             declare further subagents, and its files may not declare dispatch targets",
        ),
        BraidError::MissingRegistration {
            fix, ..
        } => {
            let suggestion = fix.clone();
            ErrorContext::new(error).with_suggestion(suggestion)
        }
        BraidError::FetchFailure {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check network connectivity and that the repository and branch exist"),
        _ => ErrorContext::new(error),
    }
}
