use anyhow::Context;
use impact_core::config::Config;
use std::path::Path;

pub fn run(root: &Path, port: Option<u16>, bind: Option<String>) -> anyhow::Result<()> {
    let config = Config::load_or_default(root).context("failed to load config")?;
    let port = port.unwrap_or(config.server.port);
    let bind = bind.unwrap_or(config.server.bind);
    let root_buf = root.to_path_buf();

    super::runtime()?.block_on(async move {
        let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
            .await
            .with_context(|| format!("failed to bind {bind}:{port}"))?;
        let addr = listener.local_addr()?;
        println!("Impact assessment API -> http://{addr}/api");

        tokio::select! {
            res = impact_server::serve_on(root_buf, listener) => res,
            _ = tokio::signal::ctrl_c() => Ok(()),
        }
    })
}
