//! The tower-lsp front-end: translates protocol traffic into workspace
//! operations and reference lookups back into protocol responses.

use log::{debug, warn};
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use tclscope_index::{Reference, ReferenceKind};
use tclscope_syntax::LinePos;

use crate::config::WorkspaceOptions;
use crate::workspace::{DocumentChange, DocumentItem, Workspace};

pub struct Backend {
    pub client: Client,
    pub workspace: Workspace,
    pub options: RwLock<WorkspaceOptions>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self { client, workspace: Workspace::new(), options: RwLock::new(WorkspaceOptions::default()) }
    }
}

/// Widen a reference to the identifier extent at its location, so editors
/// highlight the whole (possibly qualified) name.
fn reference_location(reference: &Reference) -> Option<Location> {
    let file = &reference.location.file;
    let uri = Url::parse(file.name()).ok()?;

    let bytes = file.contents().as_bytes();
    let mut end = reference.location.offset;
    while end < bytes.len()
        && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_' || bytes[end] == b':')
    {
        end += 1;
    }
    let end_pos = file.line_pos(end);

    Some(Location {
        uri,
        range: Range::new(
            Position::new(reference.location.line, reference.location.column),
            Position::new(end_pos.line, end_pos.column),
        ),
    })
}

fn line_pos(position: Position) -> LinePos {
    LinePos::new(position.line, position.character)
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "tclscope-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        ..Default::default()
                    },
                )),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                ..ServerCapabilities::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let options = self.options.read().await;
        debug!("ready with {} auto_path entries", options.auto_path.len());
        self.client.log_message(MessageType::INFO, "tclscope ready").await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        match serde_json::from_value::<WorkspaceOptions>(params.settings) {
            Ok(options) => {
                debug!("workspace options updated: {} auto_path entries", options.auto_path.len());
                *self.options.write().await = options;
            }
            Err(err) => warn!("ignoring malformed workspace options: {err}"),
        }
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        debug!("didOpen {}", doc.uri);
        self.workspace
            .open(DocumentItem {
                uri: doc.uri.to_string(),
                language_id: doc.language_id,
                version: doc.version,
                text: doc.text,
            })
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let changes: Vec<DocumentChange> = params
            .content_changes
            .into_iter()
            .map(|change| DocumentChange {
                text: change.text,
                whole_document: change.range.is_none(),
            })
            .collect();
        self.workspace.change(&uri, params.text_document.version, changes).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        debug!("didClose {}", params.text_document.uri);
        self.workspace.close(params.text_document.uri.as_str()).await;
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let position = params.text_document_position_params;
        let definitions = self
            .workspace
            .definitions(position.text_document.uri.as_str(), line_pos(position.position))
            .await;

        let locations: Vec<Location> =
            definitions.iter().filter_map(reference_location).collect();
        Ok(Some(GotoDefinitionResponse::Array(locations)))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let position = params.text_document_position;
        let include_declaration = params.context.include_declaration;

        let references = self
            .workspace
            .references(position.text_document.uri.as_str(), line_pos(position.position))
            .await;

        let locations: Vec<Location> = references
            .iter()
            .filter(|r| include_declaration || r.kind == ReferenceKind::Usage)
            .filter_map(reference_location)
            .collect();
        Ok(Some(locations))
    }
}
