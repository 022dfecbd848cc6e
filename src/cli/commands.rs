use crate::generator::EndpointGenerator;
use crate::middleware::Middleware;
use crate::openapi::{registry_document, ApiInfo};
use crate::rbac::derive_permissions;
use crate::registry::{EndpointRegistry, RegistryConfig};
use crate::resolve::{
    FsAccessResolver, FsSchemaResolver, MiddlewareResolver, NamedHandlerRegistry,
};
use crate::scanner::{Scanner, ScannerConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "trailhead-gen")]
#[command(about = "Trailhead CLI", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a routes tree and print the generated endpoint table
    Routes {
        /// Routes directory to scan
        #[arg(short, long)]
        root: PathBuf,

        /// URL prefix prepended to every generated path
        #[arg(long, default_value = "")]
        base_path: String,
    },
    /// Emit the OpenAPI document generated from a routes tree
    Openapi {
        #[arg(short, long)]
        root: PathBuf,

        #[arg(long, default_value = "")]
        base_path: String,

        /// Document title
        #[arg(long, default_value = "Trailhead API")]
        title: String,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Resolve one path and method against a routes tree
    Check {
        #[arg(short, long)]
        root: PathBuf,

        #[arg(long, default_value = "")]
        base_path: String,

        /// Request path to resolve
        #[arg(short, long)]
        path: String,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,
    },
}

/// Introspection-only middleware resolver: binds declared names to no-op
/// middleware so trees with `_middleware` markers can be inspected without
/// registering real implementations.
struct PermissiveMiddlewareResolver;

struct NoopMiddleware;
impl Middleware for NoopMiddleware {}

impl MiddlewareResolver for PermissiveMiddlewareResolver {
    fn resolve(
        &self,
        middleware_file: &Path,
    ) -> anyhow::Result<Vec<(String, Arc<dyn Middleware>)>> {
        let content = std::fs::read_to_string(middleware_file)?;
        let names: Vec<String> = if middleware_file
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(names
            .into_iter()
            .map(|name| (name, Arc::new(NoopMiddleware) as Arc<dyn Middleware>))
            .collect())
    }
}

fn build_registry(root: &Path, base_path: &str) -> anyhow::Result<EndpointRegistry> {
    let mut config = ScannerConfig::new(root);
    config.base_path = base_path.to_string();
    let routes = Scanner::new(config).scan()?;

    let generator = EndpointGenerator::new(Arc::new(NamedHandlerRegistry::new()))
        .with_schema_resolver(Arc::new(FsSchemaResolver))
        .with_access_resolver(Arc::new(FsAccessResolver))
        .with_middleware_resolver(Arc::new(PermissiveMiddlewareResolver));
    let endpoints = generator.generate_all(&routes)?;

    let registry = EndpointRegistry::new(RegistryConfig::default());
    registry.register_batch(endpoints)?;
    Ok(registry)
}

/// Parse command-line arguments and execute the selected command.
///
/// # Errors
///
/// Propagates scan, generation, and I/O failures to the binary, which
/// reports them and exits nonzero.
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Commands::Routes { root, base_path } => {
            let registry = build_registry(root, base_path)?;
            let endpoints = registry.list();
            println!("[endpoints] root={} count={}", root.display(), endpoints.len());
            for endpoint in &endpoints {
                let auth = if endpoint.access.is_public {
                    "public".to_string()
                } else if !endpoint.access.required_roles.is_empty() {
                    format!("roles={}", endpoint.access.required_roles.join(","))
                } else if endpoint.access.requires_auth {
                    "auth".to_string()
                } else {
                    "open".to_string()
                };
                println!(
                    "[endpoint] {:<7} {:<40} {:<30} {}",
                    endpoint.method, endpoint.path, endpoint.id, auth
                );
            }
            Ok(())
        }
        Commands::Openapi {
            root,
            base_path,
            title,
            out,
        } => {
            let registry = build_registry(root, base_path)?;
            let info = ApiInfo {
                title: title.clone(),
                ..ApiInfo::default()
            };
            let document = serde_json::to_string_pretty(&registry_document(&registry, &info))?;
            match out {
                Some(path) => {
                    std::fs::write(path, document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("wrote {}", path.display());
                }
                None => println!("{document}"),
            }
            Ok(())
        }
        Commands::Check {
            root,
            base_path,
            path,
            method,
        } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("invalid HTTP method {method:?}"))?;
            let registry = build_registry(root, base_path)?;
            match registry.get_by_path(path, &method) {
                Some(found) => {
                    println!("matched: {} (score {})", found.endpoint.id, found.score);
                    for (name, value) in &found.params {
                        println!("  param {name} = {value}");
                    }
                    println!("  access: {:?}", found.endpoint.access);
                    let permissions: Vec<String> =
                        if found.endpoint.access.required_permissions.is_empty() {
                            derive_permissions(&found.endpoint.path, &method)
                                .into_iter()
                                .map(|p| p.permission)
                                .collect()
                        } else {
                            found.endpoint.access.required_permissions.clone()
                        };
                    println!("  permissions: {}", permissions.join(", "));
                }
                None => {
                    println!("no endpoint matched {method} {path}");
                }
            }
            Ok(())
        }
    }
}
