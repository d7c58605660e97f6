//! Server command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
    cors_origins: Vec<String>,
) -> Result<()> {
    println!("🚀 Starting Sift web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    if cors_origins.is_empty() {
        println!("   CORS: same-origin only");
    } else {
        println!("   CORS: {}", cors_origins.join(", "));
    }

    let db = open_db(db_path, no_encrypt)?;
    let config = sift_server::ServerConfig {
        allowed_origins: cors_origins,
    };

    sift_server::serve_with_config(
        db,
        host,
        port,
        static_dir.and_then(|d| d.to_str()),
        config,
    )
    .await
}
