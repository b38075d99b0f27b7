//! Tool Router - builds the rmcp ToolRouter from the registry.
//!
//! The catalog is only known at runtime, so every route is a dynamic route
//! bound to one tool name. All routes delegate to the shared registry.

use std::sync::Arc;

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, ToolRouter},
    model::Tool,
};
use tracing::warn;

use super::error::ToolError;
use super::handlers::to_call_result;
use super::registry::ToolRegistry;

/// Build the tool router with one route per exposed tool.
pub fn build_tool_router<S>(registry: Arc<ToolRegistry>) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    registry
        .get_all_tools()
        .into_iter()
        .fold(ToolRouter::new(), |router, tool| {
            router.with_route(create_route(registry.clone(), tool))
        })
}

/// Create a route for one tool.
///
/// The invocation races the client's cancellation token; whichever finishes
/// first wins and the other future is dropped, aborting in-flight I/O.
fn create_route<S>(registry: Arc<ToolRegistry>, tool: Tool) -> ToolRoute<S>
where
    S: Send + Sync + 'static,
{
    let name = tool.name.to_string();
    ToolRoute::new_dyn(tool, move |ctx: ToolCallContext<'_, S>| {
        let arguments = ctx.arguments.clone().unwrap_or_default();
        let cancelled = ctx.request_context.ct.clone();
        let registry = registry.clone();
        let name = name.clone();
        async move {
            let outcome = tokio::select! {
                outcome = registry.invoke_with_deadline(&name, &arguments) => outcome,
                _ = cancelled.cancelled() => {
                    warn!("Invocation of '{}' cancelled by the client", name);
                    Err(ToolError::Cancelled)
                }
            };
            Ok::<_, McpError>(to_call_result(&outcome))
        }
        .boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ExecutionConfig;
    use crate::domains::catalog::fixtures;
    use crate::domains::store::CollectionRef;
    use crate::domains::store::testing::RecordingStore;
    use crate::domains::tools::Executor;

    struct TestServer {}

    fn registry(allow_raw: bool) -> Arc<ToolRegistry> {
        let schema = Arc::new(fixtures::sample_schema());
        let executor = Executor::new(
            Arc::new(RecordingStore::new()),
            CollectionRef::from(schema.module()),
            100,
        );
        let options = ExecutionConfig {
            allow_raw_aggregation: allow_raw,
            ..Default::default()
        };
        Arc::new(ToolRegistry::new(schema, executor, None, &options))
    }

    #[test]
    fn test_build_router() {
        let router: ToolRouter<TestServer> = build_tool_router(registry(true));
        let tools = router.list_all();
        assert_eq!(tools.len(), 5);

        let names: Vec<_> = tools.iter().map(|t| t.name.as_ref()).collect();
        assert!(names.contains(&"vector_search"));
        assert!(names.contains(&"text_search"));
        assert!(names.contains(&"get_unique_values"));
        assert!(names.contains(&"aggregate_query"));
        assert!(names.contains(&"collection_info"));
    }

    #[test]
    fn test_registry_matches_router() {
        let registry = registry(false);
        let registry_names = registry.tool_names();

        let router: ToolRouter<TestServer> = build_tool_router(registry.clone());
        let router_tools = router.list_all();
        let router_names: Vec<_> = router_tools.iter().map(|t| t.name.as_ref()).collect();

        assert_eq!(registry_names.len(), router_names.len());
        for name in registry_names {
            assert!(router_names.contains(&name));
        }
    }
}
