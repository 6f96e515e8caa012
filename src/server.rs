use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

use reledit::Page;
use reledit::config::Config;
use reledit::models::{
    CancelEditRequest, EditFormArgs, LoadRegionRequest, OpenEditFormRequest, Region,
    RegisterRegionRequest, Reload, ShowRegionRequest, SubmitEditRequest, SwapOutcome,
};
use reledit::render::MemoryDocument;
use reledit::session::SubmitOutcome;
use reledit::transport::HttpTransport;

/// Tool surface over one headless page backed by the application server.
#[derive(Clone)]
pub struct RelEditServer {
    tool_router: ToolRouter<Self>,
    page: Arc<Page>,
    document: Arc<MemoryDocument>,
}

impl RelEditServer {
    pub fn new(config: Config) -> reledit::Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        let document = Arc::new(MemoryDocument::new());
        let page = Page::new(config, transport, document.clone());
        Ok(Self {
            tool_router: Self::tool_router(),
            page: Arc::new(page),
            document,
        })
    }
}

fn text(message: impl Into<String>) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(message.into())]))
}

fn describe(outcome: SwapOutcome) -> &'static str {
    match outcome {
        SwapOutcome::Applied => "loaded",
        SwapOutcome::Superseded => "superseded by a newer load",
    }
}

#[tool_router]
impl RelEditServer {
    #[tool(description = "Declares a page region, optionally lazy with a load url")]
    async fn register_region(
        &self,
        Parameters(request): Parameters<RegisterRegionRequest>,
    ) -> Result<CallToolResult, McpError> {
        let region = Region {
            id: request.id.clone(),
            load_url: request.load_url,
            has_placeholder: request.placeholder.unwrap_or(true),
            is_reloadable: request.reloadable.unwrap_or(false),
        };
        self.page.engine.register(region).await;
        text(format!("Registered {}", request.id))
    }

    #[tool(description = "Loads a region from its load url unless it is already filled")]
    async fn load_region(
        &self,
        Parameters(request): Parameters<LoadRegionRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.page.lazy.load_now(&request.id, request.reloadable).await {
            Ok(Some(outcome)) => text(format!("{}: {}", request.id, describe(outcome))),
            Ok(None) => text(format!("{}: already loaded", request.id)),
            Err(e) => text(format!("Error: {}", e)),
        }
    }

    #[tool(description = "Shows a region's current content as markdown")]
    async fn show_region(
        &self,
        Parameters(request): Parameters<ShowRegionRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.document.content(&request.id) {
            Some(markup) => {
                let visibility = if self.document.is_visible(&request.id) {
                    "visible"
                } else {
                    "hidden"
                };
                text(format!(
                    "[{}]\n{}",
                    visibility,
                    html2md::parse_html(&markup)
                ))
            }
            None => text(format!("{}: no content", request.id)),
        }
    }

    #[tool(description = "Opens the inline edition form of an entity attribute or relation")]
    async fn open_edit_form(
        &self,
        Parameters(request): Parameters<OpenEditFormRequest>,
    ) -> Result<CallToolResult, McpError> {
        let args = EditFormArgs {
            form_id: request.form_id,
            eid: request.eid,
            rtype: request.rtype,
            role: request.role,
            div_id: request.div_id.clone(),
            reload: request
                .reload
                .as_deref()
                .map(Reload::from_field)
                .unwrap_or_default(),
            vid: request.vid.unwrap_or_else(|| "reledit".to_string()),
            action: request.action.unwrap_or_else(|| "edit_rtype".to_string()),
        };
        match self.page.sessions.load_inline_edition_form(args).await {
            Ok(outcome) => text(format!("{}: form {}", request.div_id, describe(outcome))),
            Err(e) => text(format!("Error: {}", e)),
        }
    }

    #[tool(description = "Submits the open inline edition form with the given fields")]
    async fn submit_edit(
        &self,
        Parameters(request): Parameters<SubmitEditRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.page.sessions.submit(&request.div_id, &request.fields).await {
            Ok(SubmitOutcome::Navigated(url)) => text(format!("Navigated to {}", url)),
            Ok(SubmitOutcome::PageReloaded) => text("Page reloaded"),
            Ok(SubmitOutcome::Refreshed(params)) => text(format!("Reloaded {}", params.div_id)),
            Ok(SubmitOutcome::Superseded) => text(format!("{}: superseded", request.div_id)),
            Err(e) => text(format!("Error: {}", e)),
        }
    }

    #[tool(description = "Cancels an inline edition and shows the value again")]
    async fn cancel_edit(
        &self,
        Parameters(request): Parameters<CancelEditRequest>,
    ) -> Result<CallToolResult, McpError> {
        match self.page.sessions.cancel(&request.div_id).await {
            Ok(true) => text(format!("{}: cancelled", request.div_id)),
            Ok(false) => text(format!("{}: nothing to cancel", request.div_id)),
            Err(e) => text(format!("Error: {}", e)),
        }
    }
}

#[tool_handler]
impl ServerHandler for RelEditServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
