//! Tools the model can call, and the registry that dispatches them.

mod error;
mod registry;

use std::pin::Pin;

use roomscout_model::ModelTool;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub use error::{Error, ErrorKind};
pub use registry::ToolRegistry;

/// What a tool hands back to the model. Errors are reported to the model
/// too, as `Error: {reason}`.
pub type ToolResult = Result<String, Error>;

pub(crate) type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;

/// A tool that can be called by the model.
///
/// Implementations should be stateless. Context a tool needs (an API
/// client, a data table) is set up when the tool is created and shared
/// with the futures it returns.
pub trait Tool: Send + Sync + 'static {
    /// Arguments of a call, decoded from the JSON the model produced.
    type Input: DeserializeOwned;

    /// Returns the name the model calls this tool by.
    fn name(&self) -> &str;

    /// Returns the description shown to the model.
    fn description(&self) -> &str;

    /// Returns the JSON schema of [`Tool::Input`].
    fn parameter_schema(&self) -> &Value;

    /// Runs the tool.
    ///
    /// The future must not borrow `self`, and it may be dropped before
    /// completion.
    fn execute(
        &self,
        input: Self::Input,
    ) -> impl Future<Output = ToolResult> + Send + 'static;

    /// Returns the definition bound to model requests.
    fn definition(&self) -> ModelTool {
        ModelTool {
            name: self.name().to_owned(),
            description: self.description().trim().to_owned(),
            parameters: self.parameter_schema().clone(),
        }
    }
}

/// Object-safe view of a [`Tool`] taking raw JSON arguments.
pub(crate) trait ErasedTool: Send + Sync + 'static {
    fn definition(&self) -> ModelTool;

    fn invoke(&self, arguments: Value) -> ToolFuture;
}

impl<T: Tool> ErasedTool for T {
    #[inline]
    fn definition(&self) -> ModelTool {
        Tool::definition(self)
    }

    fn invoke(&self, arguments: Value) -> ToolFuture {
        match serde_json::from_value::<T::Input>(arguments) {
            Ok(input) => Box::pin(self.execute(input)),
            Err(err) => {
                let err = Error::invalid_input()
                    .with_reason(format!("invalid arguments: {err}"));
                Box::pin(std::future::ready(Err(err)))
            }
        }
    }
}
