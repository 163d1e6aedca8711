//! CLI route: single route table and run context.

use crate::binding::QueryStatus;
use crate::cache::derive_key;
use crate::config::{ConfigLoader, LiveQueryConfig};
use crate::error::QueryError;
use crate::executor::ExecutionContext;
use crate::function::{FunctionKind, FunctionReference, QueryArgs};
use crate::session::LiveQuerySession;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::cli::parse::Commands;

/// Runtime context for CLI execution: the loaded configuration.
pub struct RunContext {
    config: LiveQueryConfig,
    workspace_root: PathBuf,
}

impl RunContext {
    /// Create run context from workspace root and optional config path.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, QueryError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        Ok(Self {
            config,
            workspace_root,
        })
    }

    pub fn from_config(config: LiveQueryConfig) -> Self {
        Self {
            config,
            workspace_root: PathBuf::from("."),
        }
    }

    pub fn config(&self) -> &LiveQueryConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    pub fn execute(&self, command: &Commands) -> Result<String, QueryError> {
        debug!(workspace = %self.workspace_root.display(), "executing command");
        match command {
            Commands::Key {
                function,
                args,
                skip,
            } => {
                let function = FunctionReference::parse(function, FunctionKind::Query)?;
                let args = if *skip {
                    QueryArgs::Skip
                } else {
                    parse_args(args.as_deref())?
                };
                Ok(derive_key(&function, &args).to_string())
            }
            Commands::Query {
                function,
                args,
                public,
            } => {
                let function = FunctionReference::parse(function, FunctionKind::Query)?;
                let args = parse_args(args.as_deref())?;
                self.run_query(function, args, *public)
            }
            Commands::Config => toml::to_string_pretty(&self.config)
                .map_err(|e| QueryError::Serialization(format!("Failed to render config: {}", e))),
        }
    }

    fn run_query(
        &self,
        function: FunctionReference,
        args: QueryArgs,
        public: bool,
    ) -> Result<String, QueryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| QueryError::Configuration(format!("Failed to start runtime: {}", e)))?;

        let session = LiveQuerySession::builder(self.config.clone())
            .context(ExecutionContext::Render)
            .build()?;
        let mut options = session.default_options();
        options.server = true;
        if public {
            options = options.public();
        }

        let state = runtime.block_on(session.query(function, args, options))?.state();
        match (state.status, state.error) {
            (_, Some(err)) => Err(err),
            (QueryStatus::Success, None) => render_value(state.data.unwrap_or(Value::Null)),
            (status, None) => Err(QueryError::InvalidResponse(format!(
                "query finished in state {:?}",
                status
            ))),
        }
    }
}

fn parse_args(raw: Option<&str>) -> Result<QueryArgs, QueryError> {
    match raw {
        None => Ok(QueryArgs::empty()),
        Some(raw) => {
            let value: Value = serde_json::from_str(raw)?;
            QueryArgs::from_serialize(&value)
        }
    }
}

fn render_value(value: Value) -> Result<String, QueryError> {
    Ok(serde_json::to_string_pretty(&value)?)
}
