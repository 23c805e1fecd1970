use thiserror::Error;

/// A misconfigured set of option declarations.
///
/// These are programmer errors and are raised before any argument is looked at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("option spec #{index} has no id (set a long option or an explicit id)")]
    MissingId { index: usize },

    #[error("multiple option specs with id '{id}' provide a default")]
    DuplicateDefault { id: String },

    #[error("multiple option specs with id '{id}' provide a default function")]
    DuplicateDefaultFn { id: String },

    #[error("short option {opt} is declared more than once")]
    DuplicateShortOpt { opt: String },

    #[error("long option {opt} is declared more than once")]
    DuplicateLongOpt { opt: String },

    #[error("option spec '{id}' sets both an assoc function and an update function")]
    ConflictingMergeFns { id: String },

    #[error("option spec '{id}': multi must be paired with an accumulating update function")]
    MultiArity { id: String },
}

/// A user-facing problem found while resolving the command line.
///
/// The display form is the message reported to the user. None of these stop
/// processing of the remaining tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptionError {
    #[error("Unknown option: {switch}")]
    UnknownOption { switch: String },

    #[error("Missing required argument for {switch} {required}")]
    MissingRequiredArgument { switch: String, required: String },

    #[error("Error while parsing option {occurrence}: {message}")]
    ParseFailure { occurrence: String, message: String },

    #[error("Failed to validate {occurrence}{}", message_suffix(.message))]
    ValidationFailure {
        occurrence: String,
        message: Option<String>,
    },

    #[error("{message}")]
    MissingOption { id: String, message: String },
}

fn message_suffix(message: &Option<String>) -> String {
    match message {
        Some(m) => format!(": {m}"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failure_message_is_optional() {
        let with = OptionError::ValidationFailure {
            occurrence: "-p 0".to_string(),
            message: Some("must be positive".to_string()),
        };
        assert_eq!(with.to_string(), "Failed to validate -p 0: must be positive");

        let without = OptionError::ValidationFailure {
            occurrence: "-p 0".to_string(),
            message: None,
        };
        assert_eq!(without.to_string(), "Failed to validate -p 0");
    }

    #[test]
    fn missing_option_renders_literal_message() {
        let err = OptionError::MissingOption {
            id: "host".to_string(),
            message: "--host is required".to_string(),
        };
        assert_eq!(err.to_string(), "--host is required");
    }
}
