//! Status command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use sift_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Sift Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    let has_key = std::env::var(DB_KEY_ENV).is_ok();

    // Open the database and show encryption state and queue sizes
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                // Ask the live handle rather than trusting the flags
                match db.is_encrypted() {
                    Ok(true) => println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV),
                    Ok(false) => println!("   ⚠️  Encryption: DISABLED"),
                    Err(e) => println!("   ❌ Encryption: unknown ({})", e),
                }
                println!();
                println!("   Accounts: {}", db.list_accounts()?.len());
                println!("   Transactions: {}", db.count_transactions()?);
                println!("   Triage queue: {}", db.count_pending()?);
                println!("   Training queue: {}", db.count_unparsed()?);
                println!("   Rules: {}", db.list_rules()?.len());
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    } else if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    println!();
    Ok(())
}
