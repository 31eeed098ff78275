// Tool argument validation

use serde::de::DeserializeOwned;

/// Arguments did not match a tool's input schema
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid arguments for {tool}: {source}")]
    Malformed {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid arguments for {tool}: {message}")]
    Invalid { tool: &'static str, message: String },
}

/// Checks beyond what deserialization enforces
pub trait Validate {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Deserialize and validate raw tool arguments
pub fn parse_arguments<T>(tool: &'static str, arguments: serde_json::Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let args: T = serde_json::from_value(arguments)
        .map_err(|source| ValidationError::Malformed { tool, source })?;
    args.validate()
        .map_err(|message| ValidationError::Invalid { tool, message })?;
    Ok(args)
}
