use std::error::Error;
use std::fmt::{Display, Formatter};

pub type GlqResult<T> = Result<T, GlqError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GlqErrorCategory {
    Configuration,
    Precondition,
    Computation,
    IoSystem,
    Internal,
}

impl GlqErrorCategory {
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::Configuration => 2,
            Self::Precondition => 3,
            Self::Computation => 4,
            Self::IoSystem => 5,
            Self::Internal => 6,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "ConfigurationError",
            Self::Precondition => "PreconditionError",
            Self::Computation => "ComputationError",
            Self::IoSystem => "IoSystemError",
            Self::Internal => "InternalError",
        }
    }
}

/// Pipeline error carrying a stable dotted code (`CONFIG.SPAN`) next to the
/// human-readable message. Operations abort on the first error without
/// leaving partial state or partial output behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlqError {
    category: GlqErrorCategory,
    placeholder: &'static str,
    message: String,
}

impl GlqError {
    pub fn new(
        category: GlqErrorCategory,
        placeholder: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            category,
            placeholder,
            message: message.into(),
        }
    }

    pub fn configuration(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GlqErrorCategory::Configuration, placeholder, message)
    }

    pub fn precondition(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GlqErrorCategory::Precondition, placeholder, message)
    }

    pub fn computation(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GlqErrorCategory::Computation, placeholder, message)
    }

    pub fn io_system(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GlqErrorCategory::IoSystem, placeholder, message)
    }

    pub fn internal(placeholder: &'static str, message: impl Into<String>) -> Self {
        Self::new(GlqErrorCategory::Internal, placeholder, message)
    }

    pub const fn category(&self) -> GlqErrorCategory {
        self.category
    }

    pub const fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn exit_code(&self) -> i32 {
        self.category.exit_code()
    }

    pub fn diagnostic_line(&self) -> String {
        format!("ERROR: [{}] {}", self.placeholder, self.message)
    }
}

impl Display for GlqError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} [{}] {}",
            self.category.as_str(),
            self.placeholder,
            self.message
        )
    }
}

impl Error for GlqError {}
