//! Command domains exposed to an editor host.
//!
//! A host talks to the compiler through named domains, each carrying a
//! version, and commands within them. Requests arrive as JSON with positional
//! arguments; each produces exactly one response carrying either a result or
//! an error.

use std::collections::BTreeMap;
use std::rc::Rc;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::service::CompileService;
use crate::Compiler;

/// Domain name the compiler registers under.
pub const DOMAIN_NAME: &str = "LessCompiler";

/// Version of a registered domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainVersion {
    pub major: u32,
    pub minor: u32,
}

/// A command handler: positional JSON arguments in, JSON result or error message out.
pub type Handler = Rc<dyn Fn(Vec<Value>) -> LocalBoxFuture<'static, Result<Value, String>>>;

/// A registered command.
#[derive(Clone)]
pub struct CommandSpec {
    pub description: String,
    pub params: Vec<String>,
    pub is_async: bool,
    handler: Handler,
}

impl std::fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSpec")
            .field("description", &self.description)
            .field("params", &self.params)
            .field("is_async", &self.is_async)
            .finish_non_exhaustive()
    }
}

/// An incoming command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub domain: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The outcome of one request. Exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self { id, result: Some(result), error: None }
    }

    pub fn err(id: Value, message: impl Into<String>) -> Self {
        Self { id, result: None, error: Some(message.into()) }
    }
}

/// Description of a domain for `describe`.
#[derive(Debug, Clone, Serialize)]
pub struct DomainDescription {
    pub name: String,
    pub version: DomainVersion,
    pub commands: Vec<CommandDescription>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommandDescription {
    pub name: String,
    pub description: String,
    pub params: Vec<String>,
    #[serde(rename = "async")]
    pub is_async: bool,
}

/// Registry of domains and their commands.
#[derive(Debug, Default)]
pub struct DomainManager {
    domains: BTreeMap<String, DomainVersion>,
    commands: BTreeMap<(String, String), CommandSpec>,
}

impl DomainManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_domain(&self, name: &str) -> bool {
        self.domains.contains_key(name)
    }

    pub fn register_domain(&mut self, name: impl Into<String>, version: DomainVersion) {
        self.domains.insert(name.into(), version);
    }

    /// Registers a command. Returns `false` if the domain is unknown.
    pub fn register_command(
        &mut self,
        domain: &str,
        command: impl Into<String>,
        handler: Handler,
        is_async: bool,
        description: impl Into<String>,
        params: &[&str],
    ) -> bool {
        if !self.has_domain(domain) {
            return false;
        }
        self.commands.insert(
            (domain.to_string(), command.into()),
            CommandSpec {
                description: description.into(),
                params: params.iter().map(|p| p.to_string()).collect(),
                is_async,
                handler,
            },
        );
        true
    }

    pub fn describe(&self) -> Vec<DomainDescription> {
        self.domains
            .iter()
            .map(|(name, version)| DomainDescription {
                name: name.clone(),
                version: *version,
                commands: self
                    .commands
                    .iter()
                    .filter(|((domain, _), _)| domain == name)
                    .map(|((_, command), spec)| CommandDescription {
                        name: command.clone(),
                        description: spec.description.clone(),
                        params: spec.params.clone(),
                        is_async: spec.is_async,
                    })
                    .collect(),
            })
            .collect()
    }

    /// Runs the command named by `request` and wraps its outcome.
    pub async fn dispatch(&self, request: Request) -> Response {
        if !self.has_domain(&request.domain) {
            return Response::err(request.id, format!("unknown domain '{}'", request.domain));
        }

        let key = (request.domain.clone(), request.command.clone());
        let Some(spec) = self.commands.get(&key) else {
            return Response::err(
                request.id,
                format!("unknown command '{}.{}'", request.domain, request.command),
            );
        };

        if request.args.len() != spec.params.len() {
            return Response::err(
                request.id,
                format!(
                    "'{}.{}' expects {} argument(s) ({}), got {}",
                    request.domain,
                    request.command,
                    spec.params.len(),
                    spec.params.join(", "),
                    request.args.len()
                ),
            );
        }

        match (spec.handler)(request.args).await {
            Ok(result) => Response::ok(request.id, result),
            Err(message) => Response::err(request.id, message),
        }
    }
}

/// Registers the `LessCompiler` domain and its `compile` command.
///
/// `compile` takes the path of a Less file and returns
/// `{ "filepath": ..., "output": ... }`, or `null` when output is suppressed.
pub fn init<S: CompileService + 'static>(manager: &mut DomainManager, compiler: Rc<Compiler<S>>) {
    if !manager.has_domain(DOMAIN_NAME) {
        manager.register_domain(DOMAIN_NAME, DomainVersion { major: 1, minor: 0 });
    }

    let handler: Handler = Rc::new(move |args: Vec<Value>| {
        let compiler = Rc::clone(&compiler);
        async move {
            let path = args
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| "lessPath must be a string".to_string())?
                .to_string();

            match compiler.compile(&path).await {
                Ok(result) => serde_json::to_value(result).map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            }
        }
        .boxed_local()
    });

    manager.register_command(
        DOMAIN_NAME,
        "compile",
        handler,
        true,
        "Compiles a less file",
        &["lessPath"],
    );
}
