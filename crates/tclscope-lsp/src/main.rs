//! tclscope language server binary.
//!
//! Speaks the Language Server Protocol over stdio. Heavy work (parsing and
//! indexing) runs on the blocking pool; the runtime is pinned to four worker
//! threads.

mod backend;
mod config;
mod workspace;

use tower_lsp::{LspService, Server};

use backend::Backend;

#[tokio::main(flavor = "multi_thread", worker_threads = 4)]
async fn main() {
    env_logger::init();

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();
    Server::new(stdin, stdout, socket).serve(service).await;
}
